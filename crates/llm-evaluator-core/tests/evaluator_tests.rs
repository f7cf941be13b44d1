//! Integration tests for evaluator construction, schema derivation and
//! context rendering, driven by the shared fixture configs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use llm_evaluator_core::{
    build_score_schema, CategoricalScoreConfig, ConfigurationError, ContinuousScoreConfig,
    EvaluatorConfig, EvaluatorError, Example, LlmEvaluator, ModelProvider, Run, ScoreConfig,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// ── Helpers ─────────────────────────────────────────────────────────────────

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/configs");

fn load_fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
    let path = Path::new(FIXTURES_DIR).join(format!("{name}.json"));
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {name}.json: {e}"));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {name}.json: {e}"))
}

fn rating() -> ContinuousScoreConfig {
    ContinuousScoreConfig::new("rating", "The rating of the response, from 0 to 1.")
}

fn rating_schema() -> Value {
    json!({
        "title": "rating",
        "description": "The rating of the response, from 0 to 1.",
        "type": "object",
        "properties": {
            "score": {
                "type": "number",
                "minimum": 0,
                "maximum": 1,
                "description": "The score for the evaluation, between 0 and 1, inclusive."
            }
        },
        "required": ["score"]
    })
}

fn hello_mapper(_run: &Run, _example: Option<&Example>) -> HashMap<String, String> {
    HashMap::from([("hello".to_string(), "world".to_string())])
}

// ── Construction ────────────────────────────────────────────────────────────

#[test]
fn test_vagueness_end_to_end() {
    let evaluator = LlmEvaluator::new(load_fixture("vagueness")).unwrap();
    assert_eq!(evaluator.input_variables(), ["input"]);
    assert_eq!(
        evaluator.score_schema().to_value(),
        json!({
            "title": "vagueness",
            "description": "Whether the response is vague. Y for yes, N for no.",
            "type": "object",
            "properties": {
                "score": {
                    "type": "string",
                    "enum": ["Y", "N"],
                    "description": "The score for the evaluation, one of Y, N."
                },
                "explanation": {
                    "type": "string",
                    "description": "The explanation for the score."
                }
            },
            "required": ["score", "explanation"]
        })
    );
}

#[test]
fn test_continuous_without_explanation() {
    let evaluator =
        LlmEvaluator::new(EvaluatorConfig::new("Rate the response from 0 to 1.\n{input}", rating()))
            .unwrap();
    assert_eq!(evaluator.input_variables(), ["input"]);
    assert_eq!(evaluator.score_schema().to_value(), rating_schema());
}

#[test]
fn test_from_model_matches_new() {
    let from_model =
        LlmEvaluator::from_model("Rate the response from 0 to 1.\n{input}", rating(), None)
            .unwrap();
    assert_eq!(from_model.input_variables(), ["input"]);
    assert_eq!(from_model.score_schema().to_value(), rating_schema());
}

#[test]
fn test_invalid_provider_fails() {
    let err = LlmEvaluator::new(load_fixture("invalid_provider")).unwrap_err();
    assert!(matches!(
        err,
        EvaluatorError::Configuration(ConfigurationError::UnsupportedProvider { ref provider, .. })
            if provider == "invalid"
    ));
}

#[test]
fn test_invalid_provider_fails_even_with_broken_config() {
    let config = CategoricalScoreConfig {
        key: "k".to_string(),
        choices: vec![],
        description: String::new(),
        include_explanation: false,
    };
    let err = LlmEvaluator::new(
        EvaluatorConfig::new("{nope} {", config).with_model("invalid", "model"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        EvaluatorError::Configuration(ConfigurationError::UnsupportedProvider { .. })
    ));
}

#[test]
fn test_every_supported_provider_constructs() {
    for provider in ModelProvider::ALL {
        let config = EvaluatorConfig::new("{input}", rating()).with_model(provider.as_str(), "m");
        let evaluator = LlmEvaluator::new(config).unwrap();
        assert_eq!(evaluator.model().unwrap().provider, provider);
    }
}

#[test]
fn test_default_variables_construct() {
    let evaluator = LlmEvaluator::new(load_fixture("rating")).unwrap();
    let mut vars = evaluator.input_variables().to_vec();
    vars.sort();
    assert_eq!(vars, vec!["expected", "input", "output"]);
}

#[test]
fn test_custom_variable_requires_mapper() {
    let err = LlmEvaluator::new(load_fixture("custom_variable")).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("'hello'"), "{err}");

    let evaluator = LlmEvaluator::with_mapper(load_fixture("custom_variable"), hello_mapper)
        .unwrap();
    assert_eq!(evaluator.input_variables(), ["input", "output", "hello"]);

    let request = evaluator.prepare(&load_fixture("run"), None).unwrap();
    assert_eq!(
        request.messages[0].content,
        "Rate the response from 0 to 1.\nWhat is the capital of France? Paris world"
    );
}

// ── Rendering ───────────────────────────────────────────────────────────────

#[test]
fn test_reference_accuracy_renders_expected() {
    let config = EvaluatorConfig::new(
        "Is the output accurate with respect to the expected output? Y/N\n\
         Output: {output}\nExpected: {expected}",
        CategoricalScoreConfig {
            key: "reference_accuracy".to_string(),
            choices: vec!["Y".to_string(), "N".to_string()],
            description: "Whether the output is accurate with respect to the expected output."
                .to_string(),
            include_explanation: false,
        },
    );
    let evaluator = LlmEvaluator::new(config).unwrap();

    let run: Run = serde_json::from_value(json!({
        "inputs": {"question": "q"},
        "outputs": {"answer": "Yes"}
    }))
    .unwrap();
    let example: Example = load_fixture("example");

    let request = evaluator.prepare(&run, Some(&example)).unwrap();
    assert!(request.messages[0].content.ends_with("Output: Yes\nExpected: Paris"));

    // Missing example degrades to an empty value instead of failing.
    let request = evaluator.prepare(&run, None).unwrap();
    assert!(request.messages[0].content.ends_with("Expected: "));
}

#[test]
fn test_accuracy_fixture_with_mapper() {
    let mapper = |run: &Run, example: Option<&Example>| {
        let text = |v: Option<&Value>| v.and_then(Value::as_str).unwrap_or("").to_string();
        HashMap::from([
            (
                "context".to_string(),
                text(example.and_then(|e| e.inputs.get("context"))),
            ),
            (
                "question".to_string(),
                text(example.and_then(|e| e.inputs.get("question"))),
            ),
            (
                "output".to_string(),
                text(run.outputs.as_ref().and_then(|o| o.get("output"))),
            ),
        ])
    };
    let evaluator = LlmEvaluator::with_mapper(load_fixture("accuracy"), mapper).unwrap();
    assert_eq!(
        evaluator.model().map(|m| (m.provider, m.name.as_str())),
        Some((ModelProvider::Anthropic, "claude-3-haiku-20240307"))
    );

    let request = evaluator
        .prepare(&load_fixture("run"), Some(&load_fixture("example")))
        .unwrap();
    assert_eq!(request.messages.len(), 2);
    assert_eq!(
        request.messages[1].content,
        "Context: France is a country in Europe. Its capital is Paris.\n\
         Question: What is the capital of France?\n\
         Output: "
    );
}

#[test]
fn test_schema_is_idempotent() {
    let config = ScoreConfig::Continuous(rating());
    assert_eq!(build_score_schema(&config), build_score_schema(&config));
}

#[test]
fn test_evaluator_shared_across_threads() {
    let evaluator = std::sync::Arc::new(
        LlmEvaluator::with_mapper(load_fixture("custom_variable"), hello_mapper).unwrap(),
    );
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let evaluator = evaluator.clone();
            std::thread::spawn(move || {
                let run: Run = serde_json::from_value(json!({
                    "inputs": {"input": format!("q{i}")},
                    "outputs": {"output": format!("a{i}")}
                }))
                .unwrap();
                evaluator.prepare(&run, None).unwrap().messages[0].content.clone()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.join().unwrap(),
            format!("Rate the response from 0 to 1.\nq{i} a{i} world")
        );
    }
}
