//! LLM-as-judge evaluator: fail-fast construction, request preparation and
//! structured score parsing.
//!
//! Model invocation is delegated to a [`ScoreModel`] supplied by the caller.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{EvaluatorConfig, ModelProvider, ModelSpec, ScoreConfig};
use crate::context::{
    render_context, validate_and_bind, BoundVariables, Example, Run, VariableMapper,
};
use crate::error::EvaluatorError;
use crate::score_schema::{
    build_score_schema, ScoreSchema, EXPLANATION_PROPERTY, SCORE_PROPERTY,
};
use crate::template::{CompiledTemplate, Message, PromptTemplate};

/// Everything a model client needs to produce one structured score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRequest {
    pub messages: Vec<Message>,
    pub schema: ScoreSchema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSpec>,
}

/// Score returned to the evaluation platform.
///
/// Categorical scores populate `value`; continuous scores populate `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A model client able to answer an [`EvaluationRequest`] with a JSON
/// document matching the request schema.
///
/// Errors produced by the client are returned to the caller of
/// [`LlmEvaluator::evaluate`] as-is.
pub trait ScoreModel {
    type Error: From<EvaluatorError>;

    fn invoke(&self, request: &EvaluationRequest) -> Result<Value, Self::Error>;
}

/// An evaluator built from a prompt template and a score config.
///
/// All validation happens in the constructors; a constructed evaluator can
/// be shared across threads and run against any number of examples.
#[derive(Clone)]
pub struct LlmEvaluator {
    template: CompiledTemplate,
    score_config: ScoreConfig,
    score_schema: ScoreSchema,
    bound: BoundVariables,
    mapper: Option<Arc<dyn VariableMapper>>,
    model: Option<ModelSpec>,
}

impl fmt::Debug for LlmEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmEvaluator")
            .field("key", &self.score_config.key())
            .field("input_variables", &self.template.input_variables())
            .field("mapper", &self.mapper.is_some())
            .field("model", &self.model)
            .finish()
    }
}

impl LlmEvaluator {
    /// Build an evaluator without a variable mapper.
    ///
    /// Fails with a configuration error when the provider is not supported,
    /// the score config is invalid, the template is malformed, or the
    /// template uses variables outside the default context.
    pub fn new(config: EvaluatorConfig) -> Result<Self, EvaluatorError> {
        Self::build(config, None)
    }

    /// Build an evaluator whose extra template variables come from `mapper`.
    pub fn with_mapper(
        config: EvaluatorConfig,
        mapper: impl VariableMapper + 'static,
    ) -> Result<Self, EvaluatorError> {
        Self::build(config, Some(Arc::new(mapper)))
    }

    /// Build an evaluator for a caller-supplied model client.
    ///
    /// No provider is recorded, so no provider validation takes place; every
    /// other check of [`LlmEvaluator::new`] applies.
    pub fn from_model(
        prompt_template: impl Into<PromptTemplate>,
        score_config: impl Into<ScoreConfig>,
        mapper: Option<Arc<dyn VariableMapper>>,
    ) -> Result<Self, EvaluatorError> {
        Self::assemble(prompt_template.into(), score_config.into(), mapper, None)
    }

    fn build(
        config: EvaluatorConfig,
        mapper: Option<Arc<dyn VariableMapper>>,
    ) -> Result<Self, EvaluatorError> {
        // Provider first: an unknown provider fails regardless of the rest.
        let provider: ModelProvider = config.model_provider.parse()?;
        let model = ModelSpec {
            provider,
            name: config.model_name,
        };
        Self::assemble(config.prompt_template, config.score_config, mapper, Some(model))
    }

    fn assemble(
        prompt_template: PromptTemplate,
        score_config: ScoreConfig,
        mapper: Option<Arc<dyn VariableMapper>>,
        model: Option<ModelSpec>,
    ) -> Result<Self, EvaluatorError> {
        score_config.validate()?;
        let template = CompiledTemplate::parse(prompt_template)?;
        let bound = validate_and_bind(template.input_variables(), mapper.is_some())?;
        let score_schema = build_score_schema(&score_config);

        tracing::debug!(
            key = %score_config.key(),
            provider = ?model.as_ref().map(|m| m.provider),
            variables = ?template.input_variables(),
            "constructed evaluator"
        );

        Ok(Self {
            template,
            score_config,
            score_schema,
            bound,
            mapper,
            model,
        })
    }

    pub fn prompt(&self) -> &CompiledTemplate {
        &self.template
    }

    /// Template variables, in order of first appearance.
    pub fn input_variables(&self) -> &[String] {
        self.template.input_variables()
    }

    pub fn score_schema(&self) -> &ScoreSchema {
        &self.score_schema
    }

    pub fn score_config(&self) -> &ScoreConfig {
        &self.score_config
    }

    pub fn bound_variables(&self) -> &BoundVariables {
        &self.bound
    }

    /// The configured model, or `None` for evaluators built with
    /// [`LlmEvaluator::from_model`].
    pub fn model(&self) -> Option<&ModelSpec> {
        self.model.as_ref()
    }

    /// Render the prompt for one run and pair it with the score schema.
    pub fn prepare(
        &self,
        run: &Run,
        example: Option<&Example>,
    ) -> Result<EvaluationRequest, EvaluatorError> {
        let context = render_context(&self.bound, run, example, self.mapper.as_deref())?;
        Ok(EvaluationRequest {
            messages: self.template.format(&context),
            schema: self.score_schema.clone(),
            model: self.model.clone(),
        })
    }

    /// Parse a model response into an [`EvaluationResult`].
    ///
    /// Categorical scores must be one of the configured choices; continuous
    /// scores must be numbers within the configured bounds. When the schema
    /// requires an explanation it must be present as a string.
    pub fn parse_response(&self, response: &Value) -> Result<EvaluationResult, EvaluatorError> {
        let obj = response
            .as_object()
            .ok_or_else(|| EvaluatorError::response("", "expected a JSON object"))?;
        let score_path = format!("/{SCORE_PROPERTY}");
        let raw_score = obj
            .get(SCORE_PROPERTY)
            .ok_or_else(|| EvaluatorError::response(&score_path, "missing required property"))?;

        let explanation_path = format!("/{EXPLANATION_PROPERTY}");
        let comment = match obj.get(EXPLANATION_PROPERTY) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None if !self.score_config.include_explanation() => None,
            Some(Value::Null) | None => {
                return Err(EvaluatorError::response(
                    &explanation_path,
                    "missing required property",
                ))
            }
            Some(other) => {
                return Err(EvaluatorError::response(
                    &explanation_path,
                    format!("expected a string, found {other}"),
                ))
            }
        };

        let key = self.score_config.key().to_string();
        match &self.score_config {
            ScoreConfig::Categorical(c) => {
                let label = raw_score.as_str().ok_or_else(|| {
                    EvaluatorError::response(
                        &score_path,
                        format!("expected a string, found {raw_score}"),
                    )
                })?;
                if !c.choices.iter().any(|choice| choice == label) {
                    return Err(EvaluatorError::response(
                        &score_path,
                        format!("'{label}' is not one of {}", c.choices.join(", ")),
                    ));
                }
                Ok(EvaluationResult {
                    key,
                    score: None,
                    value: Some(label.to_string()),
                    comment,
                })
            }
            ScoreConfig::Continuous(c) => {
                let score = raw_score.as_f64().ok_or_else(|| {
                    EvaluatorError::response(
                        &score_path,
                        format!("expected a number, found {raw_score}"),
                    )
                })?;
                if score < c.min || score > c.max {
                    return Err(EvaluatorError::response(
                        &score_path,
                        format!("{score} is outside [{}, {}]", c.min, c.max),
                    ));
                }
                Ok(EvaluationResult {
                    key,
                    score: Some(score),
                    value: None,
                    comment,
                })
            }
        }
    }

    /// Prepare, invoke `model`, then parse its response.
    pub fn evaluate<M: ScoreModel>(
        &self,
        model: &M,
        run: &Run,
        example: Option<&Example>,
    ) -> Result<EvaluationResult, M::Error> {
        let request = self.prepare(run, example)?;
        let response = model.invoke(&request)?;
        Ok(self.parse_response(&response)?)
    }
}
