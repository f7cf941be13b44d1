//! Prompt templates with `{placeholder}` variables.
//!
//! Templates use f-string style substitution: `{name}` is a variable,
//! `{{` and `}}` are literal braces. A `!conversion` or `:format_spec`
//! suffix is accepted and ignored. A template is either a single text
//! block or an ordered list of `(role, text)` chat messages.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    #[serde(alias = "user")]
    Human,
    #[serde(alias = "assistant")]
    Ai,
}

/// A prompt template as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptTemplate {
    Text(String),
    Messages(Vec<(Role, String)>),
}

impl From<&str> for PromptTemplate {
    fn from(text: &str) -> Self {
        PromptTemplate::Text(text.to_string())
    }
}

impl From<String> for PromptTemplate {
    fn from(text: String) -> Self {
        PromptTemplate::Text(text)
    }
}

impl From<Vec<(Role, String)>> for PromptTemplate {
    fn from(messages: Vec<(Role, String)>) -> Self {
        PromptTemplate::Messages(messages)
    }
}

impl<'a> From<Vec<(Role, &'a str)>> for PromptTemplate {
    fn from(messages: Vec<(Role, &'a str)>) -> Self {
        PromptTemplate::Messages(
            messages
                .into_iter()
                .map(|(role, text)| (role, text.to_string()))
                .collect(),
        )
    }
}

/// A rendered chat message, ready for model invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").expect("token pattern is valid")
    })
}

fn identifier_regex() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    })
}

/// Split one text block into literal and variable segments.
///
/// `offset` is added to reported error positions so that errors in message
/// templates point into the concatenated template text.
fn parse_segments(text: &str, offset: usize) -> Result<Vec<Segment>, ConfigurationError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut last = 0;

    for caps in token_regex().captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always matches");
        literal.push_str(&text[last..whole.start()]);
        last = whole.end();

        match whole.as_str() {
            "{{" => literal.push('{'),
            "}}" => literal.push('}'),
            "{" => {
                return Err(ConfigurationError::MalformedTemplate {
                    position: offset + whole.start(),
                    message: "unclosed '{' (use '{{' for a literal brace)".to_string(),
                })
            }
            "}" => {
                return Err(ConfigurationError::MalformedTemplate {
                    position: offset + whole.start(),
                    message: "single '}' encountered (use '}}' for a literal brace)".to_string(),
                })
            }
            _ => {
                let field = caps.get(1).map_or("", |m| m.as_str());
                // `{name!conv:spec}`: only the name is bound, the value renders as-is.
                let name = field.split(['!', ':']).next().unwrap_or_default().trim();
                if !identifier_regex().is_match(name) {
                    return Err(ConfigurationError::MalformedTemplate {
                        position: offset + whole.start(),
                        message: format!("invalid variable name '{name}'"),
                    });
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Variable(name.to_string()));
            }
        }
    }

    literal.push_str(&text[last..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

// ---------------------------------------------------------------------------
// CompiledTemplate
// ---------------------------------------------------------------------------

/// A validated prompt template with its derived `input_variables`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    messages: Vec<(Role, Vec<Segment>)>,
    input_variables: Vec<String>,
}

impl CompiledTemplate {
    /// Parse a template, rejecting unbalanced braces and invalid names.
    pub fn parse(source: PromptTemplate) -> Result<Self, ConfigurationError> {
        let mut messages = Vec::new();
        match &source {
            PromptTemplate::Text(text) => {
                messages.push((Role::Human, parse_segments(text, 0)?));
            }
            PromptTemplate::Messages(list) => {
                let mut offset = 0;
                for (role, text) in list {
                    messages.push((*role, parse_segments(text, offset)?));
                    offset += text.len();
                }
            }
        }

        let mut input_variables: Vec<String> = Vec::new();
        for (_, segments) in &messages {
            for segment in segments {
                if let Segment::Variable(name) = segment {
                    if !input_variables.contains(name) {
                        input_variables.push(name.clone());
                    }
                }
            }
        }

        Ok(Self {
            messages,
            input_variables,
        })
    }

    /// Distinct placeholder names, in order of first appearance.
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Substitute every variable and return the chat messages.
    ///
    /// Variables absent from `values` render as the empty string; callers
    /// are expected to have bound every variable beforehand.
    pub fn format(&self, values: &HashMap<String, String>) -> Vec<Message> {
        self.messages
            .iter()
            .map(|(role, segments)| {
                let mut content = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(text) => content.push_str(text),
                        Segment::Variable(name) => {
                            if let Some(value) = values.get(name) {
                                content.push_str(value);
                            }
                        }
                    }
                }
                Message {
                    role: *role,
                    content,
                }
            })
            .collect()
    }
}
