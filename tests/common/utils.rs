use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use element_anchor::{
    dom::{
        document::Document,
        dom_model::{ElementLocator, NodeId, Rect},
        mutation::MutationWatcher,
    },
    registry::{
        error::StoreError,
        registry::{ElementRegistry, RegistryConfig},
        registry_model::ElementCapture,
        store::{KeyValueStore, MemoryStore},
    },
    synth::synthesizer::Synthesizer,
};

pub fn fixture_path(name: &str) -> PathBuf {
    let base = std::env::current_dir().unwrap();
    base.join("tests").join("fixtures").join(name)
}

pub fn fixture(name: &str) -> Document {
    Document::load(fixture_path(name)).unwrap()
}

pub fn login_page() -> Document {
    fixture("login_page.json")
}

pub fn find(doc: &Document, selector: &str) -> NodeId {
    doc.query_selector(selector)
        .unwrap_or_else(|| panic!("fixture has no element for {selector:?}"))
}

/// Appends `<tag attrs>text</tag>` under `parent`.
pub fn add(doc: &mut Document, parent: NodeId, tag: &str, attrs: &[(&str, &str)], text: &str) -> NodeId {
    let el = doc.append_element(parent, tag, attrs);
    if !text.is_empty() {
        doc.append_text(el, text);
    }
    el
}

pub fn add_boxed(
    doc: &mut Document,
    parent: NodeId,
    tag: &str,
    attrs: &[(&str, &str)],
    text: &str,
    rect: Rect,
) -> NodeId {
    let el = add(doc, parent, tag, attrs, text);
    doc.set_rect(el, rect);
    el
}

/// `main#content` holding the welcome note and three plain divs.
pub fn welcome_page() -> (Document, NodeId) {
    let mut doc = Document::new();
    let body = doc.body().unwrap();
    let main = add(&mut doc, body, "main", &[("id", "content")], "");
    let note = add(&mut doc, main, "div", &[("id", "welcome-note")], "Welcome back, Ada");
    for label in ["A", "B", "C"] {
        add(&mut doc, main, "div", &[], label);
    }
    (doc, note)
}

pub fn capture(doc: &Document, el: NodeId) -> ElementCapture {
    let snapshot = Synthesizer::default().extract_element_data(doc, el).unwrap();
    ElementCapture::from(snapshot)
}

pub async fn registry_on(store: Arc<dyn KeyValueStore>) -> ElementRegistry {
    ElementRegistry::load(store, None, Synthesizer::default(), RegistryConfig::default()).await
}

pub async fn memory_registry() -> ElementRegistry {
    registry_on(Arc::new(MemoryStore::new())).await
}

pub async fn watched_registry(doc: &Document, config: RegistryConfig) -> ElementRegistry {
    let watcher: Arc<dyn MutationWatcher> = doc.mutation_watcher();
    ElementRegistry::load(
        Arc::new(MemoryStore::new()),
        Some(watcher),
        Synthesizer::default(),
        config,
    )
    .await
}

/// Store whose every call fails.
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(std::io::Error::other("disk on fire").into())
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(std::io::Error::other("disk on fire").into())
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(std::io::Error::other("disk on fire").into())
    }
}

/// Memory store counting writes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}
