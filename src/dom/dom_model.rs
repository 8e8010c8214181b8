use serde::{Deserialize, Serialize};

/// Handle to a node inside a page. Only meaningful for the page that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        !self.is_empty() && x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

// ============================================================================
// Host capabilities
// ============================================================================

/// Resolves selector strings against the current page.
///
/// Implementations must understand the `/* text: "..." */` annotation emitted
/// by the synthesizer: it filters the preceding compound selector to elements
/// whose whitespace-normalized text equals the quoted JSON string. A selector
/// that cannot be parsed matches nothing.
pub trait ElementLocator {
    fn query_selector_all(&self, selector: &str) -> Vec<NodeId>;

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.query_selector_all(selector).into_iter().next()
    }
}

/// Read access to one page: structure, attributes, layout and hit testing.
///
/// Every accessor tolerates stale or foreign handles by returning `None`,
/// an empty collection or a zero value.
pub trait PageDom: ElementLocator {
    /// Lowercased tag name, `None` for non-element nodes.
    fn tag_name(&self, el: NodeId) -> Option<String>;
    fn attribute(&self, el: NodeId, name: &str) -> Option<String>;
    fn attributes(&self, el: NodeId) -> Vec<(String, String)>;
    /// Live DOM property (`value`, `checked`, `selectedIndex`, ...), falling
    /// back to the reflected attribute.
    fn property(&self, el: NodeId, name: &str) -> Option<String>;
    fn parent_element(&self, el: NodeId) -> Option<NodeId>;
    fn element_children(&self, el: NodeId) -> Vec<NodeId>;
    /// Element children of `el`'s parent node (document, element or shadow
    /// root), `el` included.
    fn sibling_elements(&self, el: NodeId) -> Vec<NodeId>;
    fn text_content(&self, el: NodeId) -> String;
    fn outer_html(&self, el: NodeId) -> String;
    fn computed_style(&self, el: NodeId, property: &str) -> Option<String>;
    /// Viewport-relative border box.
    fn bounding_rect(&self, el: NodeId) -> Rect;
    fn has_offset_parent(&self, el: NodeId) -> bool;
    fn viewport(&self) -> Viewport;
    fn scroll_offset(&self) -> ScrollOffset;
    /// Document-order elements with the given tag, light tree only.
    fn elements_by_tag(&self, tag: &str) -> Vec<NodeId>;
    fn is_connected(&self, el: NodeId) -> bool;
    fn is_in_shadow_tree(&self, el: NodeId) -> bool;
    /// Nesting depth of the frame this page lives in (0 = top level).
    fn frame_depth(&self) -> u32;
    fn shadow_hosts(&self) -> Vec<NodeId>;
    fn element_from_point(&self, x: f64, y: f64) -> Option<NodeId>;
    fn shadow_element_from_point(&self, host: NodeId, x: f64, y: f64) -> Option<NodeId>;

    fn element_id(&self, el: NodeId) -> Option<String> {
        self.attribute(el, "id").filter(|id| !id.is_empty())
    }

    fn class_list(&self, el: NodeId) -> Vec<String> {
        self.attribute(el, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Text content with whitespace runs collapsed and trimmed.
    fn visible_text(&self, el: NodeId) -> String {
        normalize_whitespace(&self.text_content(el))
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Picker chrome
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayLayer {
    /// Transparent full-viewport layer that swallows page input.
    Capture,
    Highlight,
    InfoBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    PointerMove,
    Click,
    ContextMenu,
    KeyDown,
}

/// Page-side surface the picker draws on and listens through.
pub trait OverlayHost {
    fn mount_layer(&mut self, layer: OverlayLayer) -> NodeId;
    fn position_layer(&mut self, layer: NodeId, rect: Rect);
    fn set_layer_label(&mut self, layer: NodeId, label: &str);
    fn set_layer_hidden(&mut self, layer: NodeId, hidden: bool);
    fn unmount_layer(&mut self, layer: NodeId);
    fn add_capture_listener(&mut self, kind: ListenerKind);
    fn remove_capture_listener(&mut self, kind: ListenerKind);
    fn set_cursor(&mut self, cursor: Option<&str>);
}
