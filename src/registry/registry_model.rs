use serde::{Deserialize, Serialize};

use crate::dom::mutation::MutationSummary;
use crate::picker::picker_model::PickerEvent;
use crate::synth::fingerprint::ContentFingerprint;
use crate::synth::snapshot::ElementSnapshot;

pub const DEFAULT_NAME_PREFIX: &str = "element";

/// Immutable identity of a record: the counter value behind its default name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    pub fn default_name(&self) -> String {
        format!("{DEFAULT_NAME_PREFIX}{}", self.0)
    }

    /// Parses `element<N>`.
    pub fn from_default_name(name: &str) -> Option<Self> {
        let digits = name.strip_prefix(DEFAULT_NAME_PREFIX)?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(RecordId)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedElement {
    /// Current key: the custom name when one is set, else `default_id`.
    pub name: String,
    pub default_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    pub primary_selector: String,
    #[serde(default)]
    pub fallback_selectors: Vec<String>,
    #[serde(default)]
    pub absolute_path: String,
    pub snapshot: ElementSnapshot,
    pub content_fingerprint: ContentFingerprint,
    pub captured_at: u64,
    pub last_verified: u64,
    /// Absent until the first verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(default)]
    pub track_changes: bool,
    #[serde(default)]
    pub mutations: Vec<MutationSummary>,
}

/// Stored value under the registry namespace key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRegistry {
    pub elements: Vec<(String, CapturedElement)>,
    pub counter: u64,
    pub timestamp: u64,
}

/// Input to `add_element`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementCapture {
    pub snapshot: ElementSnapshot,
    pub track_changes: bool,
}

impl ElementCapture {
    pub fn new(snapshot: ElementSnapshot) -> Self {
        Self {
            snapshot,
            track_changes: false,
        }
    }

    pub fn tracked(mut self, track_changes: bool) -> Self {
        self.track_changes = track_changes;
        self
    }
}

impl From<ElementSnapshot> for ElementCapture {
    fn from(snapshot: ElementSnapshot) -> Self {
        Self::new(snapshot)
    }
}

impl From<PickerEvent> for ElementCapture {
    fn from(event: PickerEvent) -> Self {
        Self::new(event.data)
    }
}

/// Result of `add_element`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub name: String,
    pub data: CapturedElement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VerifyOutcome {
    /// Primary selector still resolves.
    Primary,
    /// A fallback resolved and was promoted to primary.
    Fallback { selector: String },
    /// Every selector missed; exactly one fingerprint candidate was found and
    /// selectors were regenerated from it.
    Reanchored { selector: String },
    /// Every selector missed and no fingerprint candidate exists.
    SelectorMiss,
    /// Every selector missed and the fingerprint matched several elements.
    AmbiguousFingerprint { candidates: usize },
}

impl VerifyOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            VerifyOutcome::Primary | VerifyOutcome::Fallback { .. } | VerifyOutcome::Reanchored { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub name: String,
    pub outcome: VerifyOutcome,
    pub primary_selector: String,
    pub is_valid: bool,
}
