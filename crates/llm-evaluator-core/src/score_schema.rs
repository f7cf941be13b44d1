//! Structured-output schema derivation for score configs.
//!
//! [`build_score_schema`] turns a [`ScoreConfig`] into the JSON Schema
//! document the judging model is asked to fill in:
//!
//! ```json
//! {
//!   "title": "<key>",
//!   "description": "<description>",
//!   "type": "object",
//!   "properties": {
//!     "score": { ... },
//!     "explanation": { "type": "string", "description": "..." }
//!   },
//!   "required": ["score", "explanation"]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::config::ScoreConfig;

pub const SCORE_PROPERTY: &str = "score";
pub const EXPLANATION_PROPERTY: &str = "explanation";
const EXPLANATION_DESCRIPTION: &str = "The explanation for the score.";

/// JSON-Schema-shaped description of the expected model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSchema {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: ScoreProperties,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreProperties {
    pub score: ScoreProperty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<ExplanationProperty>,
}

/// The `score` property, typed per score variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScoreProperty {
    String {
        #[serde(rename = "enum")]
        choices: Vec<String>,
        description: String,
    },
    Number {
        minimum: Number,
        maximum: Number,
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationProperty {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl ScoreSchema {
    /// The schema as a `serde_json::Value`.
    pub fn to_value(&self) -> Value {
        // Every field is a string, number or sequence; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn has_explanation(&self) -> bool {
        self.properties.explanation.is_some()
    }
}

/// Convert a bound to a JSON number, keeping whole values integral so that
/// the default range renders as `0`/`1` rather than `0.0`/`1.0`.
pub(crate) fn bound_to_number(value: f64) -> Number {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Number::from(value as i64)
    } else {
        Number::from_f64(value).unwrap_or_else(|| Number::from(0))
    }
}

/// Derive the structured-output schema for a score config.
///
/// Pure and deterministic: the same config always yields an equal schema.
/// The config is assumed to have passed [`ScoreConfig::validate`].
pub fn build_score_schema(config: &ScoreConfig) -> ScoreSchema {
    let score = match config {
        ScoreConfig::Categorical(c) => ScoreProperty::String {
            choices: c.choices.clone(),
            description: format!(
                "The score for the evaluation, one of {}.",
                c.choices.join(", ")
            ),
        },
        ScoreConfig::Continuous(c) => {
            let minimum = bound_to_number(c.min);
            let maximum = bound_to_number(c.max);
            let description = format!(
                "The score for the evaluation, between {minimum} and {maximum}, inclusive."
            );
            ScoreProperty::Number {
                minimum,
                maximum,
                description,
            }
        }
    };

    let mut required = vec![SCORE_PROPERTY.to_string()];
    let explanation = if config.include_explanation() {
        required.push(EXPLANATION_PROPERTY.to_string());
        Some(ExplanationProperty {
            kind: "string".to_string(),
            description: EXPLANATION_DESCRIPTION.to_string(),
        })
    } else {
        None
    };

    tracing::debug!(key = %config.key(), explanation = explanation.is_some(), "built score schema");

    ScoreSchema {
        title: config.key().to_string(),
        description: config.description().to_string(),
        kind: "object".to_string(),
        properties: ScoreProperties { score, explanation },
        required,
    }
}
