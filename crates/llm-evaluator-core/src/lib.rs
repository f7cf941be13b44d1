//! Score-schema derivation and prompt-variable binding for LLM-as-judge
//! evaluators.
//!
//! An [`LlmEvaluator`] is built from a prompt template and a [`ScoreConfig`].
//! Construction validates everything up front (model provider, score
//! declaration, template syntax, template variables) so that a broken
//! evaluator never reaches a dataset. Per run, the evaluator renders the
//! prompt from run/example data and parses the judge's structured reply.
//!
//! ```
//! use llm_evaluator_core::{CategoricalScoreConfig, EvaluatorConfig, LlmEvaluator};
//!
//! let evaluator = LlmEvaluator::new(EvaluatorConfig::new(
//!     "Is the response vague? Y/N\n{input}",
//!     CategoricalScoreConfig {
//!         key: "vagueness".to_string(),
//!         choices: vec!["Y".to_string(), "N".to_string()],
//!         description: "Whether the response is vague.".to_string(),
//!         include_explanation: true,
//!     },
//! ))
//! .unwrap();
//!
//! assert_eq!(evaluator.input_variables(), ["input"]);
//! assert_eq!(evaluator.score_schema().required, ["score", "explanation"]);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod score_schema;
pub mod template;

pub use config::{
    CategoricalScoreConfig, ContinuousScoreConfig, EvaluatorConfig, ModelProvider, ModelSpec,
    ScoreConfig,
};
pub use context::{
    render_context, validate_and_bind, BoundVariables, Example, Run, StaticVariables,
    VariableMapper, VariableSource,
};
pub use error::{ConfigurationError, ErrorCode, EvaluatorError, MappingError};
pub use evaluator::{EvaluationRequest, EvaluationResult, LlmEvaluator, ScoreModel};
pub use score_schema::{build_score_schema, ScoreSchema};
pub use template::{CompiledTemplate, Message, PromptTemplate, Role};
