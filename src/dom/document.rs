use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::dom::dom_model::{
    ElementLocator, ListenerKind, NodeId, OverlayHost, OverlayLayer, PageDom, Rect,
    ScrollOffset, Viewport,
};
use crate::dom::mutation::{MutationHub, MutationSummary};
use crate::dom::selector::Selector;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "button", "code", "em", "i", "img", "input", "label", "select", "small",
    "span", "strong", "sub", "sup", "textarea",
];

const HIDDEN_TAGS: &[&str] = &["head", "link", "meta", "script", "style", "template", "title"];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read page dump {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid page dump: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// Page dump format
// ============================================================================

/// Serialized page as produced by a DOM extraction script.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDump {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub scroll: ScrollOffset,
    #[serde(default)]
    pub frame_depth: u32,
    pub root: NodeDump,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeDump {
    Element(ElementDump),
    Text { text: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDump {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default)]
    pub rect: Option<Rect>,
    #[serde(default)]
    pub children: Vec<NodeDump>,
    #[serde(default)]
    pub shadow_root: Option<Vec<NodeDump>>,
}

// ============================================================================
// Arena
// ============================================================================

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    ShadowRoot,
}

#[derive(Debug, Clone, Default)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    properties: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    rect: Rect,
    shadow_root: Option<NodeId>,
}

#[derive(Debug, Clone)]
struct Node {
    // For a shadow root this is its host; hosts do not list it as a child.
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// In-memory page implementing every host capability the crate consumes.
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    url: String,
    title: String,
    viewport: Viewport,
    scroll: ScrollOffset,
    frame_depth: u32,
    listeners: Vec<ListenerKind>,
    cursor: Option<String>,
    revision: u64,
    hub: Arc<MutationHub>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty `<html><head></head><body></body></html>` page.
    pub fn new() -> Self {
        let mut doc = Self::bare();
        let html = doc.alloc(Some(doc.root), NodeKind::Element(element_data("html", &[])));
        doc.alloc(Some(html), NodeKind::Element(element_data("head", &[])));
        doc.alloc(Some(html), NodeKind::Element(element_data("body", &[])));
        doc
    }

    fn bare() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
            url: String::new(),
            title: String::new(),
            viewport: Viewport::default(),
            scroll: ScrollOffset::default(),
            frame_depth: 0,
            listeners: Vec::new(),
            cursor: None,
            revision: 0,
            hub: Arc::new(MutationHub::new()),
        }
    }

    pub fn from_dump(dump: PageDump) -> Self {
        let mut doc = Self::bare();
        doc.url = dump.url;
        doc.title = dump.title;
        doc.viewport = dump.viewport;
        doc.scroll = dump.scroll;
        doc.frame_depth = dump.frame_depth;
        let root = doc.root;
        doc.build(root, dump.root);
        doc
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let dump: PageDump = serde_json::from_str(json)?;
        Ok(Self::from_dump(dump))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    fn build(&mut self, parent: NodeId, dump: NodeDump) {
        match dump {
            NodeDump::Text { text } => {
                self.alloc(Some(parent), NodeKind::Text(text));
            }
            NodeDump::Element(el) => {
                let data = ElementData {
                    tag: el.tag.to_ascii_lowercase(),
                    attrs: el.attributes.into_iter().collect(),
                    properties: el.properties,
                    style: el.style,
                    rect: el.rect.unwrap_or_default(),
                    shadow_root: None,
                };
                let id = self.alloc(Some(parent), NodeKind::Element(data));
                for child in el.children {
                    self.build(id, child);
                }
                if let Some(shadow_children) = el.shadow_root {
                    let shadow = self.attach_shadow(id);
                    for child in shadow_children {
                        self.build(shadow, child);
                    }
                }
            }
        }
    }

    fn alloc(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_scroll(&mut self, scroll: ScrollOffset) {
        self.scroll = scroll;
    }

    pub fn set_frame_depth(&mut self, depth: u32) {
        self.frame_depth = depth;
    }

    /// Bumped by every change to the tree, styles, listeners or cursor.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn listeners(&self) -> &[ListenerKind] {
        &self.listeners
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn mutation_watcher(&self) -> Arc<MutationHub> {
        Arc::clone(&self.hub)
    }

    pub fn root_element(&self) -> Option<NodeId> {
        self.nodes[self.root.0]
            .children
            .iter()
            .copied()
            .find(|c| self.element(*c).is_some())
    }

    pub fn body(&self) -> Option<NodeId> {
        self.elements_by_tag("body")
            .into_iter()
            .next()
            .or_else(|| self.root_element())
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.element(host).and_then(|e| e.shadow_root)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn subtree_elements(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.node(start) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if matches!(node.kind, NodeKind::Element(_)) {
                out.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    fn light_elements(&self) -> Vec<NodeId> {
        self.subtree_elements(self.root)
    }

    /// `el` and every node above it, crossing shadow boundaries into hosts.
    fn ancestors_inclusive(&self, el: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = Some(el);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.node(id).and_then(|n| n.parent);
        }
        out
    }

    fn inherited_style(&self, el: NodeId, property: &str) -> Option<String> {
        self.ancestors_inclusive(el)
            .into_iter()
            .find_map(|id| self.element(id).and_then(|e| e.style.get(property).cloned()))
    }

    fn is_display_none(&self, el: NodeId) -> bool {
        self.ancestors_inclusive(el)
            .into_iter()
            .filter(|id| self.element(*id).is_some())
            .any(|id| self.computed_style(id, "display").as_deref() == Some("none"))
    }

    fn is_hit_testable(&self, el: NodeId) -> bool {
        !self.is_display_none(el)
            && self.computed_style(el, "visibility").as_deref() != Some("hidden")
            && self.computed_style(el, "pointer-events").as_deref() != Some("none")
    }

    fn stacking_z(&self, el: NodeId) -> i64 {
        self.ancestors_inclusive(el)
            .into_iter()
            .find_map(|id| {
                self.element(id)
                    .and_then(|e| e.style.get("z-index"))
                    .and_then(|z| z.trim().parse::<i64>().ok())
            })
            .unwrap_or(0)
    }

    fn hit_test(&self, scope: NodeId, x: f64, y: f64) -> Option<NodeId> {
        let mut best: Option<(i64, NodeId)> = None;
        for el in self.subtree_elements(scope) {
            let Some(data) = self.element(el) else { continue };
            if !data.rect.contains(x, y) || !self.is_hit_testable(el) {
                continue;
            }
            let z = self.stacking_z(el);
            // Later in document order paints on top at equal z.
            if best.is_none_or(|(best_z, _)| z >= best_z) {
                best = Some((z, el));
            }
        }
        best.map(|(_, el)| el)
    }

    fn is_observed_by(&self, node: NodeId, observed: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == observed {
                return true;
            }
            let Some(n) = self.node(id) else { return false };
            if matches!(n.kind, NodeKind::ShadowRoot) {
                return false;
            }
            cursor = n.parent;
        }
        false
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&escape_html(text)),
            NodeKind::Element(data) => {
                out.push('<');
                out.push_str(&data.tag);
                for (name, value) in &data.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_html(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&data.tag.as_str()) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
            NodeKind::Document | NodeKind::ShadowRoot => {
                for child in &node.children {
                    self.write_html(*child, out);
                }
            }
        }
    }

    fn selected_option_index(&self, select: NodeId) -> Option<usize> {
        let options: Vec<NodeId> = self
            .subtree_elements(select)
            .into_iter()
            .filter(|o| self.tag_name(*o).as_deref() == Some("option"))
            .collect();
        if options.is_empty() {
            return None;
        }
        Some(
            options
                .iter()
                .position(|o| self.attribute(*o, "selected").is_some())
                .unwrap_or(0),
        )
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    fn before_mutation(&self) {
        self.hub.bind_pending(|selector| self.query_selector(selector));
    }

    fn dispatch(&self, target: NodeId, summary: MutationSummary) {
        for (observed, callback) in self.hub.bound_observers() {
            if self.is_observed_by(target, observed) {
                callback(summary.clone());
            }
        }
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.before_mutation();
        let id = self.alloc(Some(parent), NodeKind::Element(element_data(tag, attrs)));
        self.revision += 1;
        self.dispatch(parent, MutationSummary::child_list());
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.before_mutation();
        let id = self.alloc(Some(parent), NodeKind::Text(text.to_string()));
        self.revision += 1;
        self.dispatch(parent, MutationSummary::child_list());
        id
    }

    /// Attaches an open shadow root to `host` and returns it.
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        if let Some(existing) = self.shadow_root(host) {
            return existing;
        }
        let shadow = self.alloc(None, NodeKind::ShadowRoot);
        self.nodes[shadow.0].parent = Some(host);
        if let Some(data) = self.element_mut(host) {
            data.shadow_root = Some(shadow);
        }
        self.revision += 1;
        shadow
    }

    pub fn set_attribute(&mut self, el: NodeId, name: &str, value: &str) {
        self.before_mutation();
        let Some(data) = self.element_mut(el) else { return };
        let name = name.to_ascii_lowercase();
        let old = match data.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => Some(std::mem::replace(v, value.to_string())),
            None => {
                data.attrs.push((name.clone(), value.to_string()));
                None
            }
        };
        self.revision += 1;
        self.dispatch(el, MutationSummary::attributes(&name, old));
    }

    pub fn remove_attribute(&mut self, el: NodeId, name: &str) {
        self.before_mutation();
        let Some(data) = self.element_mut(el) else { return };
        let Some(pos) = data.attrs.iter().position(|(k, _)| k == name) else {
            return;
        };
        let (_, old) = data.attrs.remove(pos);
        self.revision += 1;
        self.dispatch(el, MutationSummary::attributes(name, Some(old)));
    }

    /// Replaces the text of `el`. A lone text child is edited in place
    /// (character data); anything else is replaced (child list).
    pub fn set_text(&mut self, el: NodeId, text: &str) {
        self.before_mutation();
        let Some(node) = self.node(el) else { return };
        let lone_text = match node.children.as_slice() {
            [only] if matches!(self.nodes[only.0].kind, NodeKind::Text(_)) => Some(*only),
            _ => None,
        };

        match lone_text {
            Some(text_node) => {
                let old = match &mut self.nodes[text_node.0].kind {
                    NodeKind::Text(current) => std::mem::replace(current, text.to_string()),
                    _ => String::new(),
                };
                self.revision += 1;
                self.dispatch(text_node, MutationSummary::character_data(Some(old)));
            }
            None => {
                let removed = std::mem::take(&mut self.nodes[el.0].children);
                for child in removed {
                    self.nodes[child.0].parent = None;
                }
                self.alloc(Some(el), NodeKind::Text(text.to_string()));
                self.revision += 1;
                self.dispatch(el, MutationSummary::child_list());
            }
        }
    }

    pub fn remove(&mut self, el: NodeId) {
        self.before_mutation();
        let Some(parent) = self.node(el).and_then(|n| n.parent) else {
            return;
        };
        if matches!(self.nodes[el.0].kind, NodeKind::ShadowRoot) {
            return;
        }
        self.nodes[parent.0].children.retain(|c| *c != el);
        self.nodes[el.0].parent = None;
        self.revision += 1;
        self.dispatch(parent, MutationSummary::child_list());
    }

    pub fn set_style(&mut self, el: NodeId, property: &str, value: Option<&str>) {
        self.before_mutation();
        let Some(data) = self.element_mut(el) else { return };
        match value {
            Some(v) => {
                data.style.insert(property.to_string(), v.to_string());
            }
            None => {
                data.style.remove(property);
            }
        }
        self.revision += 1;
        self.dispatch(el, MutationSummary::attributes("style", None));
    }

    /// Layout change; not observable as a DOM mutation.
    pub fn set_rect(&mut self, el: NodeId, rect: Rect) {
        if let Some(data) = self.element_mut(el) {
            data.rect = rect;
            self.revision += 1;
        }
    }

    /// Live property change (user input); not observable as a DOM mutation.
    pub fn set_property(&mut self, el: NodeId, name: &str, value: &str) {
        if let Some(data) = self.element_mut(el) {
            data.properties.insert(name.to_string(), value.to_string());
        }
    }
}

fn element_data(tag: &str, attrs: &[(&str, &str)]) -> ElementData {
    ElementData {
        tag: tag.to_ascii_lowercase(),
        attrs: attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect(),
        ..ElementData::default()
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// Capabilities
// ============================================================================

impl ElementLocator for Document {
    fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(selector, error = %e, "selector does not parse, treating as no match");
                return Vec::new();
            }
        };
        self.light_elements()
            .into_iter()
            .filter(|el| parsed.matches(self, *el))
            .collect()
    }
}

impl PageDom for Document {
    fn tag_name(&self, el: NodeId) -> Option<String> {
        self.element(el).map(|e| e.tag.clone())
    }

    fn attribute(&self, el: NodeId, name: &str) -> Option<String> {
        self.element(el)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn attributes(&self, el: NodeId) -> Vec<(String, String)> {
        self.element(el).map(|e| e.attrs.clone()).unwrap_or_default()
    }

    fn property(&self, el: NodeId, name: &str) -> Option<String> {
        let data = self.element(el)?;
        if let Some(value) = data.properties.get(name) {
            return Some(value.clone());
        }
        match name {
            "checked" | "disabled" | "required" | "selected" => {
                Some(self.attribute(el, name).is_some().to_string())
            }
            "readOnly" => Some(self.attribute(el, "readonly").is_some().to_string()),
            "selectedIndex" if data.tag == "select" => Some(
                self.selected_option_index(el)
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "-1".to_string()),
            ),
            "value" if data.tag == "textarea" => Some(self.text_content(el)),
            "value" if data.tag == "select" => {
                let idx = self.selected_option_index(el)?;
                let option = self
                    .subtree_elements(el)
                    .into_iter()
                    .filter(|o| self.tag_name(*o).as_deref() == Some("option"))
                    .nth(idx)?;
                self.attribute(option, "value")
                    .or_else(|| Some(self.visible_text(option)))
            }
            _ => self.attribute(el, name),
        }
    }

    fn parent_element(&self, el: NodeId) -> Option<NodeId> {
        let parent = self.node(el)?.parent?;
        self.element(parent).map(|_| parent)
    }

    fn element_children(&self, el: NodeId) -> Vec<NodeId> {
        self.node(el)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|c| self.element(*c).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn sibling_elements(&self, el: NodeId) -> Vec<NodeId> {
        if self.element(el).is_none() {
            return Vec::new();
        }
        match self.node(el).and_then(|n| n.parent) {
            Some(parent) => self.element_children(parent),
            None => vec![el],
        }
    }

    fn text_content(&self, el: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![el];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if let NodeKind::Text(text) = &node.kind {
                out.push_str(text);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    fn outer_html(&self, el: NodeId) -> String {
        let mut out = String::new();
        self.write_html(el, &mut out);
        out
    }

    fn computed_style(&self, el: NodeId, property: &str) -> Option<String> {
        let data = self.element(el)?;
        if let Some(value) = data.style.get(property) {
            return Some(value.clone());
        }
        let value = match property {
            "display" if HIDDEN_TAGS.contains(&data.tag.as_str()) => "none".to_string(),
            "display" if INLINE_TAGS.contains(&data.tag.as_str()) => "inline".to_string(),
            "display" => "block".to_string(),
            "opacity" => "1".to_string(),
            "position" => "static".to_string(),
            "z-index" => "auto".to_string(),
            "background-color" => "rgba(0, 0, 0, 0)".to_string(),
            "visibility" => self
                .inherited_style(el, property)
                .unwrap_or_else(|| "visible".to_string()),
            "cursor" | "pointer-events" => self
                .inherited_style(el, property)
                .unwrap_or_else(|| "auto".to_string()),
            "color" => self
                .inherited_style(el, property)
                .unwrap_or_else(|| "rgb(0, 0, 0)".to_string()),
            "font-size" => self
                .inherited_style(el, property)
                .unwrap_or_else(|| "16px".to_string()),
            _ => return None,
        };
        Some(value)
    }

    fn bounding_rect(&self, el: NodeId) -> Rect {
        self.element(el).map(|e| e.rect).unwrap_or_default()
    }

    fn has_offset_parent(&self, el: NodeId) -> bool {
        let Some(data) = self.element(el) else {
            return false;
        };
        self.is_connected(el)
            && data.tag != "body"
            && data.tag != "html"
            && self.computed_style(el, "position").as_deref() != Some("fixed")
            && !self.is_display_none(el)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn scroll_offset(&self) -> ScrollOffset {
        self.scroll
    }

    fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        self.light_elements()
            .into_iter()
            .filter(|el| self.element(*el).is_some_and(|e| e.tag == tag))
            .collect()
    }

    fn is_connected(&self, el: NodeId) -> bool {
        self.ancestors_inclusive(el).last() == Some(&self.root)
    }

    fn is_in_shadow_tree(&self, el: NodeId) -> bool {
        self.ancestors_inclusive(el)
            .into_iter()
            .any(|id| self.node(id).is_some_and(|n| matches!(n.kind, NodeKind::ShadowRoot)))
    }

    fn frame_depth(&self) -> u32 {
        self.frame_depth
    }

    fn shadow_hosts(&self) -> Vec<NodeId> {
        let mut hosts = Vec::new();
        let mut scopes = vec![self.root];
        while let Some(scope) = scopes.pop() {
            for el in self.subtree_elements(scope) {
                if let Some(shadow) = self.shadow_root(el) {
                    hosts.push(el);
                    scopes.push(shadow);
                }
            }
        }
        hosts
    }

    fn element_from_point(&self, x: f64, y: f64) -> Option<NodeId> {
        self.hit_test(self.root, x, y)
    }

    fn shadow_element_from_point(&self, host: NodeId, x: f64, y: f64) -> Option<NodeId> {
        let shadow = self.shadow_root(host)?;
        self.hit_test(shadow, x, y)
    }
}

impl OverlayHost for Document {
    fn mount_layer(&mut self, layer: OverlayLayer) -> NodeId {
        let (name, z_index) = match layer {
            OverlayLayer::Capture => ("capture", "2147483646"),
            OverlayLayer::Highlight => ("highlight", "2147483647"),
            OverlayLayer::InfoBox => ("info", "2147483647"),
        };
        let parent = self.body().unwrap_or(self.root);
        let id = self.append_element(parent, "div", &[("data-anchor-layer", name)]);

        let viewport = self.viewport;
        if let Some(data) = self.element_mut(id) {
            data.style.insert("position".into(), "fixed".into());
            data.style.insert("z-index".into(), z_index.into());
            match layer {
                OverlayLayer::Capture => {
                    data.rect = Rect::new(0.0, 0.0, viewport.width, viewport.height);
                }
                OverlayLayer::Highlight | OverlayLayer::InfoBox => {
                    data.style.insert("pointer-events".into(), "none".into());
                }
            }
        }
        id
    }

    fn position_layer(&mut self, layer: NodeId, rect: Rect) {
        self.set_rect(layer, rect);
    }

    fn set_layer_label(&mut self, layer: NodeId, label: &str) {
        self.set_text(layer, label);
    }

    fn set_layer_hidden(&mut self, layer: NodeId, hidden: bool) {
        self.set_style(layer, "display", hidden.then_some("none"));
    }

    fn unmount_layer(&mut self, layer: NodeId) {
        self.remove(layer);
    }

    fn add_capture_listener(&mut self, kind: ListenerKind) {
        if !self.listeners.contains(&kind) {
            self.listeners.push(kind);
            self.revision += 1;
        }
    }

    fn remove_capture_listener(&mut self, kind: ListenerKind) {
        let before = self.listeners.len();
        self.listeners.retain(|k| *k != kind);
        if self.listeners.len() != before {
            self.revision += 1;
        }
    }

    fn set_cursor(&mut self, cursor: Option<&str>) {
        self.cursor = cursor.map(str::to_string);
        self.revision += 1;
    }
}
