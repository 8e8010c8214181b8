use serde::{Deserialize, Serialize};

use crate::synth::snapshot::ElementSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerOptions {
    pub show_info_box: bool,
    /// Right-click widens the target to its parent element.
    pub allow_broaden: bool,
    /// Install the key-down listener (Escape cancels, Enter picks).
    pub keyboard_shortcuts: bool,
    pub cursor: String,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            show_info_box: true,
            allow_broaden: true,
            keyboard_shortcuts: true,
            cursor: "wait".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKey {
    Escape,
    Enter,
    Other,
}

impl PickerKey {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_key(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => PickerKey::Escape,
            "Enter" => PickerKey::Enter,
            _ => PickerKey::Other,
        }
    }
}

/// Message handed to the host once an element is picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickerEvent {
    pub action: String,
    pub data: ElementSnapshot,
}

impl PickerEvent {
    pub const ELEMENT_SELECTED: &'static str = "elementSelected";

    pub fn element_selected(data: ElementSnapshot) -> Self {
        Self {
            action: Self::ELEMENT_SELECTED.to_string(),
            data,
        }
    }
}
