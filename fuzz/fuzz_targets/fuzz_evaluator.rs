#![no_main]

use libfuzzer_sys::fuzz_target;
use llm_evaluator_core::{ContinuousScoreConfig, EvaluatorConfig, LlmEvaluator, Run};

// Arbitrary bytes as a prompt template: construction may fail, but must
// never panic, and a constructed evaluator must render an empty run.
fuzz_target!(|data: &[u8]| {
    if let Ok(template) = std::str::from_utf8(data) {
        let config = EvaluatorConfig::new(template, ContinuousScoreConfig::new("rating", "d"));
        if let Ok(evaluator) = LlmEvaluator::new(config) {
            let _ = evaluator.prepare(&Run::default(), None);
        }
    }
});
