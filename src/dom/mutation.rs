use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::dom::dom_model::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    Attributes,
    CharacterData,
    ChildList,
}

/// Compact description of one observed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSummary {
    #[serde(rename = "type")]
    pub kind: MutationKind,
    #[serde(default)]
    pub attribute_name: Option<String>,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub observed_at: u64,
}

impl MutationSummary {
    pub fn attributes(name: &str, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            attribute_name: Some(name.to_string()),
            old_value,
            observed_at: 0,
        }
    }

    pub fn character_data(old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            attribute_name: None,
            old_value,
            observed_at: 0,
        }
    }

    pub fn child_list() -> Self {
        Self {
            kind: MutationKind::ChildList,
            attribute_name: None,
            old_value: None,
            observed_at: 0,
        }
    }

    /// Same change ignoring when it was seen.
    pub fn same_change(&self, other: &MutationSummary) -> bool {
        self.kind == other.kind
            && self.attribute_name == other.attribute_name
            && self.old_value == other.old_value
    }
}

pub type MutationCallback = Arc<dyn Fn(MutationSummary) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(pub u64);

/// Observes attribute, character-data and subtree child changes on the
/// element a selector resolves to.
pub trait MutationWatcher: Send + Sync {
    fn watch(&self, selector: &str, callback: MutationCallback) -> WatchHandle;
    fn unwatch(&self, handle: WatchHandle);
}

struct Watch {
    selector: String,
    bound: Option<NodeId>,
    callback: MutationCallback,
}

/// Watch table shared between a page and whoever observes it.
///
/// A watch binds to its element the first time the page is about to mutate
/// after the watch was registered; from then on it follows that element like
/// a `MutationObserver` would, even if the selector stops matching.
#[derive(Default)]
pub struct MutationHub {
    watches: Mutex<HashMap<WatchHandle, Watch>>,
    next_handle: AtomicU64,
}

impl MutationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch_count(&self) -> usize {
        self.watches.lock().len()
    }

    pub fn is_watching(&self, handle: WatchHandle) -> bool {
        self.watches.lock().contains_key(&handle)
    }

    pub(crate) fn bind_pending(&self, resolve: impl Fn(&str) -> Option<NodeId>) {
        let mut watches = self.watches.lock();
        for watch in watches.values_mut().filter(|w| w.bound.is_none()) {
            watch.bound = resolve(&watch.selector);
        }
    }

    pub(crate) fn bound_observers(&self) -> Vec<(NodeId, MutationCallback)> {
        self.watches
            .lock()
            .values()
            .filter_map(|w| w.bound.map(|node| (node, Arc::clone(&w.callback))))
            .collect()
    }
}

impl MutationWatcher for MutationHub {
    fn watch(&self, selector: &str, callback: MutationCallback) -> WatchHandle {
        let handle = WatchHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.watches.lock().insert(
            handle,
            Watch {
                selector: selector.to_string(),
                bound: None,
                callback,
            },
        );
        handle
    }

    fn unwatch(&self, handle: WatchHandle) {
        self.watches.lock().remove(&handle);
    }
}
