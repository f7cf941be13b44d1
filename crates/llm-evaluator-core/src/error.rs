//! Error types for evaluator construction, rendering and response parsing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::DEFAULT_CONTEXT_VARS;

/// Stable, machine-readable error codes.
///
/// Variant names and their serialized `snake_case` strings are part of the
/// public contract: the CLI prints them and callers may match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// JSON (de)serialization error.
    JsonParseError,
    /// Invalid evaluator configuration, detected at construction time.
    ConfigurationError,
    /// A mapper did not supply a variable the template requires.
    MappingError,
    /// Model output does not match the score schema.
    ResponseError,
}

/// Construction-time configuration failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error(
        "Unsupported model provider '{provider}'. Supported providers: {}",
        .supported.join(", ")
    )]
    UnsupportedProvider {
        provider: String,
        supported: Vec<String>,
    },

    #[error(
        "Prompt template references {} not available by default ({}); \
         provide a variable mapper to supply them",
        format_variables(.variables),
        DEFAULT_CONTEXT_VARS.join(", ")
    )]
    UnsatisfiableVariables { variables: Vec<String> },

    #[error("Score config '{key}' must declare at least one choice")]
    EmptyChoices { key: String },

    #[error("Score config '{key}' declares choice '{choice}' more than once")]
    DuplicateChoice { key: String, choice: String },

    #[error("Score config '{key}' has invalid bounds: min {min}, max {max}")]
    InvalidBounds { key: String, min: f64, max: f64 },

    #[error("Score config key must not be empty")]
    EmptyKey,

    #[error("Malformed prompt template at byte {position}: {message}")]
    MalformedTemplate { position: usize, message: String },
}

fn format_variables(variables: &[String]) -> String {
    let quoted: Vec<String> = variables.iter().map(|v| format!("'{v}'")).collect();
    match quoted.len() {
        1 => format!("variable {}", quoted[0]),
        _ => format!("variables {}", quoted.join(", ")),
    }
}

/// Render-time failures of a variable mapper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Variable mapper did not return a value for '{variable}'")]
    MissingVariable { variable: String },
}

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Invalid model response at {path}: {message}")]
    ResponseError { path: String, message: String },

    #[error("JSON (de)serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl EvaluatorError {
    pub(crate) fn response(path: &str, message: impl Into<String>) -> Self {
        EvaluatorError::ResponseError {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            EvaluatorError::Configuration(_) => ErrorCode::ConfigurationError,
            EvaluatorError::Mapping(_) => ErrorCode::MappingError,
            EvaluatorError::ResponseError { .. } => ErrorCode::ResponseError,
            EvaluatorError::JsonError(_) => ErrorCode::JsonParseError,
        }
    }

    /// Returns the response path context, if available.
    pub fn path(&self) -> Option<&str> {
        match self {
            EvaluatorError::ResponseError { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether this error was raised while constructing an evaluator.
    pub fn is_configuration(&self) -> bool {
        matches!(self, EvaluatorError::Configuration(_))
    }

    /// Produces a structured JSON error.
    ///
    /// Format: `{"code": "...", "message": "...", "path": "..." | null}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "path": self.path(),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
