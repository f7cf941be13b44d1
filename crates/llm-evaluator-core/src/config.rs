//! Configuration for evaluator construction.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::template::PromptTemplate;

/// Model backend an evaluator is allowed to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    Openai,
    Anthropic,
    AzureOpenai,
    GoogleVertexai,
    GoogleGenai,
    Bedrock,
    Cohere,
    Fireworks,
    Together,
    Mistralai,
    Huggingface,
    Groq,
    Ollama,
}

impl ModelProvider {
    /// Every supported provider, in allow-list order.
    pub const ALL: [ModelProvider; 13] = [
        ModelProvider::Openai,
        ModelProvider::Anthropic,
        ModelProvider::AzureOpenai,
        ModelProvider::GoogleVertexai,
        ModelProvider::GoogleGenai,
        ModelProvider::Bedrock,
        ModelProvider::Cohere,
        ModelProvider::Fireworks,
        ModelProvider::Together,
        ModelProvider::Mistralai,
        ModelProvider::Huggingface,
        ModelProvider::Groq,
        ModelProvider::Ollama,
    ];

    /// The provider identifier as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::Openai => "openai",
            ModelProvider::Anthropic => "anthropic",
            ModelProvider::AzureOpenai => "azure_openai",
            ModelProvider::GoogleVertexai => "google_vertexai",
            ModelProvider::GoogleGenai => "google_genai",
            ModelProvider::Bedrock => "bedrock",
            ModelProvider::Cohere => "cohere",
            ModelProvider::Fireworks => "fireworks",
            ModelProvider::Together => "together",
            ModelProvider::Mistralai => "mistralai",
            ModelProvider::Huggingface => "huggingface",
            ModelProvider::Groq => "groq",
            ModelProvider::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelProvider {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelProvider::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnsupportedProvider {
                provider: s.to_string(),
                supported: ModelProvider::ALL
                    .iter()
                    .map(|p| p.as_str().to_string())
                    .collect(),
            })
    }
}

pub const DEFAULT_MODEL_NAME: &str = "gpt-4o";

/// Provider plus model name an evaluator was configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModelSpec {
    pub provider: ModelProvider,
    pub name: String,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Openai,
            name: DEFAULT_MODEL_NAME.to_string(),
        }
    }
}

/// Score with a fixed set of labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CategoricalScoreConfig {
    pub key: String,
    pub choices: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub include_explanation: bool,
}

/// Numeric score within inclusive bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContinuousScoreConfig {
    pub key: String,
    pub description: String,
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default)]
    pub include_explanation: bool,
}

fn default_min() -> f64 {
    0.0
}

fn default_max() -> f64 {
    1.0
}

impl ContinuousScoreConfig {
    /// A continuous score over the default `[0, 1]` range.
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            min: default_min(),
            max: default_max(),
            include_explanation: false,
        }
    }
}

/// Declarative shape of the score an evaluator must produce.
///
/// Serialized with an internal `type` tag: `"categorical"` or `"continuous"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreConfig {
    Categorical(CategoricalScoreConfig),
    Continuous(ContinuousScoreConfig),
}

impl ScoreConfig {
    pub fn key(&self) -> &str {
        match self {
            ScoreConfig::Categorical(c) => &c.key,
            ScoreConfig::Continuous(c) => &c.key,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ScoreConfig::Categorical(c) => &c.description,
            ScoreConfig::Continuous(c) => &c.description,
        }
    }

    pub fn include_explanation(&self) -> bool {
        match self {
            ScoreConfig::Categorical(c) => c.include_explanation,
            ScoreConfig::Continuous(c) => c.include_explanation,
        }
    }

    /// Check the invariants of the score declaration.
    ///
    /// Categorical choices must be non-empty and distinct; continuous bounds
    /// must be finite with `min <= max`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.key().is_empty() {
            return Err(ConfigurationError::EmptyKey);
        }
        match self {
            ScoreConfig::Categorical(c) => {
                if c.choices.is_empty() {
                    return Err(ConfigurationError::EmptyChoices { key: c.key.clone() });
                }
                let mut seen = HashSet::with_capacity(c.choices.len());
                for choice in &c.choices {
                    if !seen.insert(choice.as_str()) {
                        return Err(ConfigurationError::DuplicateChoice {
                            key: c.key.clone(),
                            choice: choice.clone(),
                        });
                    }
                }
            }
            ScoreConfig::Continuous(c) => {
                if !c.min.is_finite() || !c.max.is_finite() || c.min > c.max {
                    return Err(ConfigurationError::InvalidBounds {
                        key: c.key.clone(),
                        min: c.min,
                        max: c.max,
                    });
                }
            }
        }
        Ok(())
    }
}

impl From<CategoricalScoreConfig> for ScoreConfig {
    fn from(config: CategoricalScoreConfig) -> Self {
        ScoreConfig::Categorical(config)
    }
}

impl From<ContinuousScoreConfig> for ScoreConfig {
    fn from(config: ContinuousScoreConfig) -> Self {
        ScoreConfig::Continuous(config)
    }
}

/// Construction surface for [`crate::LlmEvaluator`].
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (`prompt-template`,
/// `score-config`, `model-provider`, `model-name`). The provider is kept as
/// a raw string so that an unknown identifier surfaces as a
/// [`ConfigurationError::UnsupportedProvider`] at construction rather than
/// as a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EvaluatorConfig {
    pub prompt_template: PromptTemplate,
    pub score_config: ScoreConfig,
    #[serde(default = "default_provider")]
    pub model_provider: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
}

fn default_provider() -> String {
    ModelProvider::Openai.as_str().to_string()
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

impl EvaluatorConfig {
    pub fn new(
        prompt_template: impl Into<PromptTemplate>,
        score_config: impl Into<ScoreConfig>,
    ) -> Self {
        Self {
            prompt_template: prompt_template.into(),
            score_config: score_config.into(),
            model_provider: default_provider(),
            model_name: default_model_name(),
        }
    }

    pub fn with_model(mut self, provider: impl Into<String>, name: impl Into<String>) -> Self {
        self.model_provider = provider.into();
        self.model_name = name.into();
        self
    }
}
