use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dom::dom_model::PageDom;
use crate::dom::mutation::{MutationWatcher, WatchHandle};
use crate::registry::error::{RegistryError, StoreError};
use crate::registry::references::{is_valid_name, scan_references};
use crate::registry::registry_model::{
    Assignment, CapturedElement, ElementCapture, PersistedRegistry, RecordId, VerifyOutcome,
    VerifyReport,
};
use crate::registry::store::KeyValueStore;
use crate::registry::tracking::{
    DEFAULT_QUEUE_CAPACITY, MutationNotice, MutationQueue, coalesce, now_millis,
};
use crate::synth::synthesizer::Synthesizer;

pub const DEFAULT_NAMESPACE: &str = "elementAnchor.registry";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Storage key holding the whole registry.
    pub namespace: String,
    pub queue_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    records: BTreeMap<RecordId, CapturedElement>,
    names: HashMap<String, RecordId>,
    watches: HashMap<RecordId, WatchHandle>,
    counter: u64,
}

impl RegistryState {
    fn empty() -> Self {
        Self {
            counter: 1,
            ..Self::default()
        }
    }

    /// Direct key first, then a custom-name scan.
    fn resolve(&self, name: &str) -> Option<RecordId> {
        self.names.get(name).copied().or_else(|| {
            self.records
                .iter()
                .find(|(_, r)| r.custom_name.as_deref() == Some(name))
                .map(|(id, _)| *id)
        })
    }

    fn to_persisted(&self) -> PersistedRegistry {
        PersistedRegistry {
            elements: self
                .records
                .values()
                .map(|r| (r.name.clone(), r.clone()))
                .collect(),
            counter: self.counter,
            timestamp: now_millis(),
        }
    }
}

/// Named, persisted table of captured elements.
///
/// All state lives behind one lock that is released before any storage I/O.
/// Every mutating operation ends by writing the complete registry; storage
/// failures are logged and the in-memory result is returned regardless.
pub struct ElementRegistry {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    synthesizer: Synthesizer,
    watcher: Option<Arc<dyn MutationWatcher>>,
    queue: MutationQueue,
    state: Mutex<RegistryState>,
    /// Held from snapshot to store write so saves land in snapshot order.
    persist_lock: tokio::sync::Mutex<()>,
}

impl ElementRegistry {
    /// Builds a registry and hydrates it from `store`.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        watcher: Option<Arc<dyn MutationWatcher>>,
        synthesizer: Synthesizer,
        config: RegistryConfig,
    ) -> Self {
        let registry = Self {
            store,
            namespace: config.namespace,
            synthesizer,
            watcher,
            queue: MutationQueue::new(config.queue_capacity),
            state: Mutex::new(RegistryState::empty()),
            persist_lock: tokio::sync::Mutex::new(()),
        };
        registry.hydrate().await;
        registry
    }

    async fn hydrate(&self) {
        let raw = match self.store.get(&self.namespace).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(namespace = %self.namespace, "no stored registry");
                return;
            }
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "failed to read registry, starting empty");
                return;
            }
        };
        let persisted: PersistedRegistry = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "stored registry is unreadable, starting empty");
                return;
            }
        };

        let mut state = self.state.lock();
        let mut next_id = persisted.counter.max(1);
        for (name, mut record) in persisted.elements {
            let id = match RecordId::from_default_name(&record.default_id) {
                Some(id) if !state.records.contains_key(&id) => id,
                _ => {
                    // Corrupt default id: give the record a fresh identity.
                    let id = RecordId(next_id);
                    next_id += 1;
                    record.default_id = id.default_name();
                    id
                }
            };
            if state.names.contains_key(&name) {
                warn!(name = %name, "duplicate name in stored registry, keeping the first");
                continue;
            }
            record.name = name.clone();
            next_id = next_id.max(id.0 + 1);
            state.names.insert(name, id);
            state.records.insert(id, record);
        }
        state.counter = next_id;

        let tracked: Vec<(RecordId, String)> = state
            .records
            .iter()
            .filter(|(_, r)| r.track_changes)
            .map(|(id, r)| (*id, r.primary_selector.clone()))
            .collect();
        for (id, selector) in tracked {
            self.attach_watch(&mut state, id, &selector);
        }

        info!(
            namespace = %self.namespace,
            elements = state.records.len(),
            counter = state.counter,
            "registry hydrated"
        );
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Next counter value that will be considered for a default name.
    pub fn counter(&self) -> u64 {
        self.state.lock().counter
    }

    /// Mutation notices lost to a full queue since construction.
    pub fn dropped_mutations(&self) -> u64 {
        self.queue.dropped()
    }

    pub fn is_tracking(&self, name: &str) -> bool {
        let state = self.state.lock();
        state
            .resolve(name)
            .is_some_and(|id| state.watches.contains_key(&id))
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    pub async fn add_element(&self, capture: ElementCapture) -> Assignment {
        let assignment = {
            let mut state = self.state.lock();
            let id = loop {
                let candidate = RecordId(state.counter);
                state.counter += 1;
                if !state.names.contains_key(&candidate.default_name()) {
                    break candidate;
                }
                debug!(name = %candidate.default_name(), "default name taken by a custom name, skipping");
            };

            let digest = capture.snapshot.fingerprint.digest();
            if let Some(existing) = state
                .records
                .values()
                .find(|r| r.content_fingerprint.digest() == digest)
            {
                warn!(existing = %existing.name, "capture duplicates an already registered element");
            }

            let now = now_millis();
            let snapshot = capture.snapshot;
            let name = id.default_name();
            let record = CapturedElement {
                name: name.clone(),
                default_id: name.clone(),
                custom_name: None,
                primary_selector: snapshot.selector.clone(),
                fallback_selectors: snapshot.fallback_selectors.clone(),
                absolute_path: snapshot.absolute_path.clone(),
                content_fingerprint: snapshot.fingerprint.clone(),
                snapshot,
                captured_at: now,
                last_verified: now,
                is_valid: None,
                track_changes: capture.track_changes,
                mutations: Vec::new(),
            };

            if record.track_changes {
                self.attach_watch(&mut state, id, &record.primary_selector);
            }
            state.names.insert(name.clone(), id);
            state.records.insert(id, record.clone());

            info!(name = %name, selector = %record.primary_selector, "element added");
            Assignment { name, data: record }
        };

        self.persist().await;
        assignment
    }

    /// Re-keys a record. Returns the record's key after the call.
    pub async fn rename_element(&self, old_name: &str, new_name: &str) -> Result<String, RegistryError> {
        if !is_valid_name(new_name) {
            return Err(RegistryError::InvalidName(new_name.to_string()));
        }

        {
            let mut state = self.state.lock();
            let id = state
                .resolve(old_name)
                .ok_or_else(|| RegistryError::NotFound(old_name.to_string()))?;
            let Some(record) = state.records.get(&id) else {
                return Err(RegistryError::NotFound(old_name.to_string()));
            };
            if record.name == new_name {
                return Ok(new_name.to_string());
            }
            let current = record.name.clone();

            let keyed_elsewhere = state.names.get(new_name).is_some_and(|other| *other != id);
            let default_elsewhere = state
                .records
                .iter()
                .any(|(other, r)| *other != id && r.default_id == new_name);
            if keyed_elsewhere || default_elsewhere {
                return Err(RegistryError::NameInUse(new_name.to_string()));
            }

            state.names.remove(&current);
            state.names.insert(new_name.to_string(), id);
            if let Some(record) = state.records.get_mut(&id) {
                record.name = new_name.to_string();
                record.custom_name = (record.default_id != new_name).then(|| new_name.to_string());
            }
            info!(from = %current, to = new_name, "element renamed");
        }

        self.persist().await;
        Ok(new_name.to_string())
    }

    /// Key of the record `name` refers to.
    pub fn find_by_name(&self, name: &str) -> Option<String> {
        let state = self.state.lock();
        let id = state.resolve(name)?;
        state.records.get(&id).map(|r| r.name.clone())
    }

    pub fn get_element(&self, name: &str) -> Option<CapturedElement> {
        let state = self.state.lock();
        let id = state.resolve(name)?;
        state.records.get(&id).cloned()
    }

    pub async fn delete_element(&self, name: &str) -> Result<CapturedElement, RegistryError> {
        let removed = {
            let mut state = self.state.lock();
            let id = state
                .resolve(name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            self.detach_watch(&mut state, id);
            let record = state
                .records
                .remove(&id)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            state.names.remove(&record.name);
            info!(name = %record.name, "element deleted");
            record
        };

        self.persist().await;
        Ok(removed)
    }

    /// Checks the record against `page`: primary, then fallbacks, then the
    /// content fingerprint.
    pub async fn verify_element<D: PageDom + ?Sized>(
        &self,
        name: &str,
        page: &D,
    ) -> Result<VerifyReport, RegistryError> {
        let report = {
            let mut state = self.state.lock();
            let id = state
                .resolve(name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            let Some(record) = state.records.get_mut(&id) else {
                return Err(RegistryError::NotFound(name.to_string()));
            };

            let previous_primary = record.primary_selector.clone();
            let outcome = self.check_record(record, page);
            let valid = outcome.is_valid();
            record.is_valid = Some(valid);
            record.last_verified = now_millis();

            let report = VerifyReport {
                name: record.name.clone(),
                outcome,
                primary_selector: record.primary_selector.clone(),
                is_valid: valid,
            };

            if report.primary_selector != previous_primary && state.watches.contains_key(&id) {
                self.detach_watch(&mut state, id);
                self.attach_watch(&mut state, id, &report.primary_selector);
            }

            info!(name = %report.name, outcome = ?report.outcome, "element verified");
            report
        };

        self.persist().await;
        Ok(report)
    }

    fn check_record<D: PageDom + ?Sized>(&self, record: &mut CapturedElement, page: &D) -> VerifyOutcome {
        if page.query_selector(&record.primary_selector).is_some() {
            return VerifyOutcome::Primary;
        }

        let hit = record
            .fallback_selectors
            .iter()
            .position(|s| page.query_selector(s).is_some());
        if let Some(index) = hit {
            let promoted = record.fallback_selectors.remove(index);
            let demoted = std::mem::replace(&mut record.primary_selector, promoted.clone());
            record.fallback_selectors.push(demoted);
            debug!(name = %record.name, selector = %promoted, "fallback promoted");
            return VerifyOutcome::Fallback { selector: promoted };
        }

        let candidates = self
            .synthesizer
            .reanchor_candidates(page, &record.content_fingerprint);
        match candidates.as_slice() {
            [] => VerifyOutcome::SelectorMiss,
            [only] => match self.synthesizer.generate_selectors(page, *only) {
                Some(set) => {
                    record.primary_selector = set.primary.clone();
                    record.fallback_selectors = set.fallbacks;
                    record.absolute_path = self.synthesizer.absolute_path(page, *only);
                    VerifyOutcome::Reanchored { selector: set.primary }
                }
                None => VerifyOutcome::SelectorMiss,
            },
            many => VerifyOutcome::AmbiguousFingerprint {
                candidates: many.len(),
            },
        }
    }

    /// Removes every record and returns how many there were. The counter
    /// keeps its value.
    pub async fn clear(&self) -> usize {
        let count = {
            let mut state = self.state.lock();
            let ids: Vec<RecordId> = state.watches.keys().copied().collect();
            for id in ids {
                self.detach_watch(&mut state, id);
            }
            let count = state.records.len();
            state.records.clear();
            state.names.clear();
            info!(count, "registry cleared");
            count
        };

        self.persist().await;
        count
    }

    /// Records in creation order.
    pub fn get_all_elements(&self) -> Vec<CapturedElement> {
        self.state.lock().records.values().cloned().collect()
    }

    pub async fn set_track_changes(&self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        {
            let mut state = self.state.lock();
            let id = state
                .resolve(name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            let Some(record) = state.records.get_mut(&id) else {
                return Err(RegistryError::NotFound(name.to_string()));
            };
            record.track_changes = enabled;
            let selector = record.primary_selector.clone();

            self.detach_watch(&mut state, id);
            if enabled {
                self.attach_watch(&mut state, id, &selector);
            }
            info!(name, enabled, "change tracking toggled");
        }

        self.persist().await;
        Ok(())
    }

    /// Records referenced as `@name` in `text`, first appearance first.
    pub fn process_references(&self, text: &str) -> Vec<CapturedElement> {
        let state = self.state.lock();
        let mut seen: Vec<RecordId> = Vec::new();
        let mut matched = Vec::new();

        for name in scan_references(text) {
            let Some(id) = state.resolve(&name) else { continue };
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            if let Some(record) = state.records.get(&id) {
                matched.push(record.clone());
            }
        }
        matched
    }

    // ------------------------------------------------------------------
    // Mutation tracking
    // ------------------------------------------------------------------

    /// Applies every queued mutation notice. Returns how many were recorded
    /// after coalescing.
    pub async fn flush_mutations(&self) -> usize {
        let notices = self.queue.drain();
        self.apply_mutations(notices).await
    }

    /// Drains the queue in the background until the registry is dropped or
    /// every watch is gone. `None` when a pump is already running.
    pub fn spawn_mutation_pump(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut rx = self.queue.take_receiver()?;
        let registry: Weak<Self> = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut batch = vec![first];
                while let Ok(next) = rx.try_recv() {
                    batch.push(next);
                }
                let Some(registry) = registry.upgrade() else { break };
                registry.apply_mutations(batch).await;
            }
            debug!("mutation pump stopped");
        }))
    }

    async fn apply_mutations(&self, notices: Vec<MutationNotice>) -> usize {
        if notices.is_empty() {
            return 0;
        }
        let received = notices.len();

        let applied = {
            let mut state = self.state.lock();
            let mut applied = 0;
            for notice in coalesce(notices) {
                // Records deleted after the notice was queued are skipped.
                if let Some(record) = state.records.get_mut(&notice.record) {
                    if record.track_changes {
                        record.mutations.push(notice.summary);
                        applied += 1;
                    }
                }
            }
            applied
        };

        debug!(received, applied, "mutation batch applied");
        if applied > 0 {
            self.persist().await;
        }
        applied
    }

    fn attach_watch(&self, state: &mut RegistryState, id: RecordId, selector: &str) {
        let Some(watcher) = &self.watcher else {
            debug!(record = id.0, "no mutation watcher configured");
            return;
        };
        let handle = watcher.watch(selector, self.queue.callback(id));
        if let Some(previous) = state.watches.insert(id, handle) {
            watcher.unwatch(previous);
        }
    }

    fn detach_watch(&self, state: &mut RegistryState, id: RecordId) {
        if let (Some(handle), Some(watcher)) = (state.watches.remove(&id), &self.watcher) {
            watcher.unwatch(handle);
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Serialized form of the current state.
    pub fn to_persisted(&self) -> PersistedRegistry {
        self.state.lock().to_persisted()
    }

    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let persisted = self.to_persisted();
        let elements = persisted.elements.len();
        match self.save(persisted).await {
            Ok(()) => debug!(namespace = %self.namespace, elements, "registry persisted"),
            Err(e) => warn!(namespace = %self.namespace, error = %e, "failed to persist registry"),
        }
    }

    async fn save(&self, persisted: PersistedRegistry) -> Result<(), StoreError> {
        let json = serde_json::to_string(&persisted)?;
        self.store.set(&self.namespace, json).await
    }
}

impl Drop for ElementRegistry {
    /// Unregisters every watch so the page stops calling into a dead queue.
    /// Once the callbacks are gone the pump sees a closed channel and exits.
    fn drop(&mut self) {
        let Some(watcher) = &self.watcher else { return };
        for (_, handle) in self.state.get_mut().watches.drain() {
            watcher.unwatch(handle);
        }
    }
}
