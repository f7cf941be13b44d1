//! Template-variable binding against run/example data.
//!
//! Two checkpoints:
//! - [`validate_and_bind`] runs once at evaluator construction and rejects
//!   templates whose variables cannot be satisfied.
//! - [`render_context`] runs per evaluation and produces the string value of
//!   every bound variable.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigurationError, MappingError};

/// Variables every evaluation context supplies without a mapper.
pub const DEFAULT_CONTEXT_VARS: [&str; 3] = ["input", "output", "expected"];

/// Accepted alias for `expected`.
pub const REFERENCE_ALIAS: &str = "reference";

const EXPECTED: &str = DEFAULT_CONTEXT_VARS[2];

/// One execution being evaluated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub outputs: Option<Map<String, Value>>,
}

/// Reference dataset record a run is compared against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub outputs: Option<Map<String, Value>>,
}

/// Supplies template variables the default context does not provide.
///
/// The mapper is trusted: construction only checks that one exists; its
/// output keys are looked up lazily by [`render_context`].
pub trait VariableMapper: Send + Sync {
    fn map(&self, run: &Run, example: Option<&Example>) -> HashMap<String, String>;
}

impl<F> VariableMapper for F
where
    F: Fn(&Run, Option<&Example>) -> HashMap<String, String> + Send + Sync,
{
    fn map(&self, run: &Run, example: Option<&Example>) -> HashMap<String, String> {
        self(run, example)
    }
}

/// A mapper returning the same fixed values for every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticVariables(pub HashMap<String, String>);

impl VariableMapper for StaticVariables {
    fn map(&self, _run: &Run, _example: Option<&Example>) -> HashMap<String, String> {
        self.0.clone()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        StaticVariables(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Where a bound variable's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSource {
    RunInputs,
    RunOutputs,
    ExampleOutputs,
    Mapper,
}

impl fmt::Display for VariableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableSource::RunInputs => "run.inputs",
            VariableSource::RunOutputs => "run.outputs",
            VariableSource::ExampleOutputs => "example.outputs",
            VariableSource::Mapper => "mapper",
        };
        f.write_str(name)
    }
}

/// Source of each entry of [`DEFAULT_CONTEXT_VARS`], by position.
const DEFAULT_SOURCES: [VariableSource; 3] = [
    VariableSource::RunInputs,
    VariableSource::RunOutputs,
    VariableSource::ExampleOutputs,
];

fn default_source(variable: &str) -> Option<VariableSource> {
    let canonical = if variable == REFERENCE_ALIAS {
        EXPECTED
    } else {
        variable
    };
    DEFAULT_CONTEXT_VARS
        .iter()
        .zip(DEFAULT_SOURCES)
        .find_map(|(name, source)| (*name == canonical).then_some(source))
}

/// Validated template variables, in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundVariables {
    variables: Vec<(String, VariableSource)>,
}

impl BoundVariables {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, VariableSource)> {
        self.variables.iter().map(|(name, source)| (name.as_str(), *source))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Whether rendering needs to call the mapper.
    pub fn requires_mapper(&self) -> bool {
        self.variables
            .iter()
            .any(|(_, source)| *source == VariableSource::Mapper)
    }
}

/// Check that every template variable can be satisfied.
///
/// A variable is satisfiable when it belongs to the default context
/// (`input`, `output`, `expected` or its alias `reference`) or when a mapper
/// is present. Fails with [`ConfigurationError::UnsatisfiableVariables`]
/// listing every unsatisfiable variable otherwise.
pub fn validate_and_bind(
    input_variables: &[String],
    has_mapper: bool,
) -> Result<BoundVariables, ConfigurationError> {
    let mut variables = Vec::with_capacity(input_variables.len());
    let mut unsatisfiable = Vec::new();

    for name in input_variables {
        match default_source(name) {
            Some(source) => variables.push((name.clone(), source)),
            None if has_mapper => variables.push((name.clone(), VariableSource::Mapper)),
            None => unsatisfiable.push(name.clone()),
        }
    }

    if !unsatisfiable.is_empty() {
        return Err(ConfigurationError::UnsatisfiableVariables {
            variables: unsatisfiable,
        });
    }

    tracing::debug!(
        variables = ?input_variables,
        mapper = has_mapper,
        "bound template variables"
    );
    Ok(BoundVariables { variables })
}

/// Render a JSON value as prompt text: strings verbatim, everything else as
/// compact JSON.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Read one default variable out of a run/example field.
///
/// Prefers the entry named after the variable, then the sole entry of a
/// single-key map, then the whole map as JSON. Absent data reads as `""`.
fn read_field(fields: Option<&Map<String, Value>>, variable: &str) -> String {
    let Some(fields) = fields else {
        return String::new();
    };
    if let Some(value) = fields.get(variable) {
        return value_to_text(value);
    }
    match fields.len() {
        0 => String::new(),
        1 => fields.values().next().map(value_to_text).unwrap_or_default(),
        _ => Value::Object(fields.clone()).to_string(),
    }
}

/// Produce the value of every bound variable for one run.
///
/// Default variables never fail: missing run or example data degrades to an
/// empty string. When a mapper is supplied it is called once; its keys take
/// precedence over default values, and a non-default variable missing from
/// its output fails with [`MappingError::MissingVariable`].
pub fn render_context(
    bound: &BoundVariables,
    run: &Run,
    example: Option<&Example>,
    mapper: Option<&dyn VariableMapper>,
) -> Result<HashMap<String, String>, MappingError> {
    let mut mapped = mapper.map(|m| m.map(run, example)).unwrap_or_default();
    let mut context = HashMap::with_capacity(bound.len());

    for (name, source) in bound.iter() {
        let from_mapper = mapped.remove(name);
        tracing::debug!(
            variable = name,
            source = %source,
            mapped = from_mapper.is_some(),
            "resolving template variable"
        );
        let value = match from_mapper {
            Some(value) => value,
            None => match source {
                VariableSource::RunInputs => read_field(Some(&run.inputs), name),
                VariableSource::RunOutputs => read_field(run.outputs.as_ref(), name),
                VariableSource::ExampleOutputs => {
                    let lookup = if name == REFERENCE_ALIAS { EXPECTED } else { name };
                    read_field(example.and_then(|e| e.outputs.as_ref()), lookup)
                }
                VariableSource::Mapper => {
                    return Err(MappingError::MissingVariable {
                        variable: name.to_string(),
                    })
                }
            },
        };
        context.insert(name.to_string(), value);
    }

    tracing::debug!(
        variables = context.len(),
        mapper = mapper.is_some(),
        "rendered evaluation context"
    );
    Ok(context)
}
