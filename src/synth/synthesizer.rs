use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::synth::policy::{HeuristicPolicy, SelectorPolicy};

/// Length and count thresholds used while synthesizing selectors and snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Attribute values must be shorter than this to be used in a selector.
    pub max_attribute_len: usize,
    /// Visible text must be shorter than this for a content selector.
    pub max_text_len: usize,
    /// Input values must be shorter than this for a content selector.
    pub max_value_len: usize,
    pub max_positional_siblings: usize,
    pub max_fallback_siblings: usize,
    pub text_snippet_len: usize,
    pub signature_len: usize,
    pub text_preview_len: usize,
    pub html_preview_len: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_attribute_len: 50,
            max_text_len: 50,
            max_value_len: 30,
            max_positional_siblings: 3,
            max_fallback_siblings: 5,
            text_snippet_len: 50,
            signature_len: 100,
            text_preview_len: 200,
            html_preview_len: 500,
        }
    }
}

/// Stateless selector and snapshot generator.
///
/// Holds only the heuristic policy and thresholds; every call reads the page
/// it is given and nothing else.
#[derive(Clone)]
pub struct Synthesizer {
    pub(crate) policy: Arc<dyn SelectorPolicy>,
    pub(crate) config: SynthesisConfig,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(SynthesisConfig::default())
    }
}

impl Synthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self::with_policy(Arc::new(HeuristicPolicy), config)
    }

    pub fn with_policy(policy: Arc<dyn SelectorPolicy>, config: SynthesisConfig) -> Self {
        Self { policy, config }
    }

    pub fn policy(&self) -> &dyn SelectorPolicy {
        self.policy.as_ref()
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
