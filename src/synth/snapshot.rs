use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::dom_model::{NodeId, PageDom, Rect};
use crate::synth::fingerprint::ContentFingerprint;
use crate::synth::selectors::SelectorStrategy;
use crate::synth::synthesizer::{Synthesizer, truncate_chars};

const STYLE_PROPERTIES: &[&str] = &[
    "display",
    "visibility",
    "opacity",
    "position",
    "z-index",
    "cursor",
    "color",
    "background-color",
    "font-size",
    "pointer-events",
];

const CLICKABLE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "summary", "label", "option"];
const CLICKABLE_ROLES: &[&str] = &[
    "button", "link", "menuitem", "tab", "checkbox", "radio", "switch", "option", "treeitem",
];
const CLICKABLE_CLASS_MARKERS: &[&str] = &["btn", "button", "clickable", "link"];
const FORM_CONTROL_TAGS: &[&str] = &["input", "select", "textarea", "button"];
const DRAG_ATTRIBUTES: &[&str] = &["draggable", "ondrag", "ondragstart", "ondrop", "ondragover"];

/// Manipulation an element plausibly supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Affordance {
    Click,
    Focus,
    SetValue,
    Check,
    Uncheck,
    SelectOption,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    pub tag_name: String,
    pub id: Option<String>,
    pub class_list: Vec<String>,
    pub selector: String,
    pub fallback_selectors: Vec<String>,
    pub strategy: Option<SelectorStrategy>,
    pub absolute_path: String,
    pub policy_version: u32,
    pub text: String,
    pub html: String,
    pub styles: BTreeMap<String, String>,
    pub rect: Rect,
    pub document_rect: Rect,
    pub is_visible: bool,
    pub is_clickable: bool,
    pub is_interactive: bool,
    pub in_viewport: bool,
    pub attributes: BTreeMap<String, String>,
    /// `data-*` attributes keyed without the prefix.
    pub data_attributes: BTreeMap<String, String>,
    /// Inline `on*` handlers, e.g. `click` for `onclick`.
    pub event_handlers: Vec<String>,
    pub form: Option<FormProperties>,
    pub context: ElementContext,
    pub accessibility: AccessibilityInfo,
    pub fingerprint: ContentFingerprint,
    pub in_shadow_dom: bool,
    pub is_connected: bool,
    pub frame_depth: u32,
    pub examples: BTreeMap<Affordance, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormProperties {
    pub value: Option<String>,
    pub checked: bool,
    pub disabled: bool,
    pub required: bool,
    pub read_only: bool,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub placeholder: Option<String>,
    pub options: Vec<SelectOption>,
    pub selected_index: Option<i64>,
    /// Id or name of the owning form.
    pub form: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOption {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub tag_name: String,
    pub id: Option<String>,
    pub class_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementContext {
    pub parent: Option<NodeSummary>,
    pub previous_sibling: Option<NodeSummary>,
    pub next_sibling: Option<NodeSummary>,
    pub sibling_count: usize,
    pub index_in_parent: usize,
    pub child_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityInfo {
    pub role: Option<String>,
    pub label: Option<String>,
    pub tab_index: Option<i64>,
    /// Every `aria-*` attribute, keyed without the prefix.
    pub aria: BTreeMap<String, String>,
}

impl Synthesizer {
    /// Full capture record for `el`: selectors, geometry, style, affordances
    /// and example statements. `None` when `el` is not an element.
    pub fn extract_element_data<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId) -> Option<ElementSnapshot> {
        let tag_name = dom.tag_name(el)?;
        let selectors = self.generate_selectors(dom, el)?;
        let fingerprint = self.fingerprint(dom, el)?;

        let attributes: BTreeMap<String, String> = dom.attributes(el).into_iter().collect();
        let data_attributes = prefixed(&attributes, "data-");
        let event_handlers = attributes
            .keys()
            .filter_map(|name| name.strip_prefix("on"))
            .filter(|event| !event.is_empty())
            .map(str::to_string)
            .collect();

        let styles: BTreeMap<String, String> = STYLE_PROPERTIES
            .iter()
            .filter_map(|p| dom.computed_style(el, p).map(|v| (p.to_string(), v)))
            .collect();

        let rect = dom.bounding_rect(el);
        let scroll = dom.scroll_offset();
        let text = dom.visible_text(el);

        let mut snapshot = ElementSnapshot {
            id: dom.element_id(el),
            class_list: dom.class_list(el),
            selector: selectors.primary,
            fallback_selectors: selectors.fallbacks,
            strategy: Some(selectors.strategy),
            absolute_path: self.absolute_path(dom, el),
            policy_version: self.policy.version(),
            text: truncate_chars(&text, self.config.text_preview_len),
            html: truncate_chars(&dom.outer_html(el), self.config.html_preview_len),
            rect,
            document_rect: rect.translate(scroll.x, scroll.y),
            is_visible: is_visible(dom, el, &styles),
            is_clickable: is_clickable(dom, el, &tag_name, &styles),
            is_interactive: is_interactive(dom, el, &tag_name),
            in_viewport: in_viewport(dom, rect),
            styles,
            attributes,
            data_attributes,
            event_handlers,
            form: form_properties(dom, el, &tag_name),
            context: element_context(dom, el),
            accessibility: accessibility_info(dom, el),
            fingerprint,
            in_shadow_dom: dom.is_in_shadow_tree(el),
            is_connected: dom.is_connected(el),
            frame_depth: dom.frame_depth(),
            tag_name,
            examples: BTreeMap::new(),
        };
        snapshot.examples = example_statements(&snapshot, &text);

        debug!(
            tag = %snapshot.tag_name,
            selector = %snapshot.selector,
            examples = snapshot.examples.len(),
            "element data extracted"
        );
        Some(snapshot)
    }
}

fn prefixed(attributes: &BTreeMap<String, String>, prefix: &str) -> BTreeMap<String, String> {
    attributes
        .iter()
        .filter_map(|(k, v)| k.strip_prefix(prefix).map(|rest| (rest.to_string(), v.clone())))
        .collect()
}

fn style_is(styles: &BTreeMap<String, String>, property: &str, value: &str) -> bool {
    styles.get(property).is_some_and(|v| v == value)
}

fn is_visible<D: PageDom + ?Sized>(dom: &D, el: NodeId, styles: &BTreeMap<String, String>) -> bool {
    let opacity_zero = styles
        .get("opacity")
        .and_then(|o| o.parse::<f64>().ok())
        .is_some_and(|o| o == 0.0);

    !dom.bounding_rect(el).is_empty()
        && !opacity_zero
        && !style_is(styles, "visibility", "hidden")
        && !style_is(styles, "display", "none")
        && dom.has_offset_parent(el)
}

fn is_clickable<D: PageDom + ?Sized>(
    dom: &D,
    el: NodeId,
    tag: &str,
    styles: &BTreeMap<String, String>,
) -> bool {
    if CLICKABLE_TAGS.contains(&tag) || dom.attribute(el, "onclick").is_some() {
        return true;
    }
    if dom
        .attribute(el, "role")
        .is_some_and(|r| CLICKABLE_ROLES.contains(&r.as_str()))
    {
        return true;
    }
    if style_is(styles, "cursor", "pointer") {
        return true;
    }
    dom.class_list(el).iter().any(|class| {
        let class = class.to_ascii_lowercase();
        CLICKABLE_CLASS_MARKERS.iter().any(|marker| class.contains(marker))
    })
}

fn is_interactive<D: PageDom + ?Sized>(dom: &D, el: NodeId, tag: &str) -> bool {
    let editable = dom
        .attribute(el, "contenteditable")
        .is_some_and(|v| !v.eq_ignore_ascii_case("false"));
    let positive_tab_index = dom
        .attribute(el, "tabindex")
        .and_then(|t| t.trim().parse::<i64>().ok())
        .is_some_and(|t| t > 0);
    let draggable = DRAG_ATTRIBUTES.iter().any(|attr| match dom.attribute(el, attr) {
        Some(value) if *attr == "draggable" => value == "true",
        Some(_) => true,
        None => false,
    });

    editable || FORM_CONTROL_TAGS.contains(&tag) || positive_tab_index || draggable
}

fn in_viewport<D: PageDom + ?Sized>(dom: &D, rect: Rect) -> bool {
    let viewport = dom.viewport();
    rect.top() >= 0.0
        && rect.left() >= 0.0
        && rect.bottom() <= viewport.height
        && rect.right() <= viewport.width
}

fn form_properties<D: PageDom + ?Sized>(dom: &D, el: NodeId, tag: &str) -> Option<FormProperties> {
    if !matches!(tag, "input" | "select" | "textarea" | "button") {
        return None;
    }
    let flag = |name: &str| dom.property(el, name).is_some_and(|v| v == "true");

    let options = if tag == "select" {
        select_options(dom, el)
    } else {
        Vec::new()
    };
    let selected_index = (tag == "select")
        .then(|| dom.property(el, "selectedIndex"))
        .flatten()
        .and_then(|i| i.parse().ok());

    Some(FormProperties {
        value: dom.property(el, "value"),
        checked: flag("checked"),
        disabled: flag("disabled"),
        required: flag("required"),
        read_only: flag("readOnly"),
        input_type: dom.attribute(el, "type"),
        name: dom.attribute(el, "name"),
        placeholder: dom.attribute(el, "placeholder"),
        options,
        selected_index,
        form: owning_form(dom, el),
    })
}

fn select_options<D: PageDom + ?Sized>(dom: &D, select: NodeId) -> Vec<SelectOption> {
    let selected_index = dom
        .property(select, "selectedIndex")
        .and_then(|i| i.parse::<i64>().ok());

    descendants(dom, select)
        .into_iter()
        .filter(|o| dom.tag_name(*o).as_deref() == Some("option"))
        .enumerate()
        .map(|(i, option)| {
            let text = dom.visible_text(option);
            SelectOption {
                value: dom.attribute(option, "value").unwrap_or_else(|| text.clone()),
                text,
                selected: selected_index == Some(i as i64),
            }
        })
        .collect()
}

fn descendants<D: PageDom + ?Sized>(dom: &D, el: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = dom.element_children(el).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(dom.element_children(node).into_iter().rev());
    }
    out
}

fn owning_form<D: PageDom + ?Sized>(dom: &D, el: NodeId) -> Option<String> {
    let mut cursor = dom.parent_element(el);
    while let Some(node) = cursor {
        if dom.tag_name(node).as_deref() == Some("form") {
            return dom
                .element_id(node)
                .or_else(|| dom.attribute(node, "name").filter(|n| !n.is_empty()));
        }
        cursor = dom.parent_element(node);
    }
    None
}

fn summarize<D: PageDom + ?Sized>(dom: &D, el: NodeId) -> Option<NodeSummary> {
    Some(NodeSummary {
        tag_name: dom.tag_name(el)?,
        id: dom.element_id(el),
        class_list: dom.class_list(el),
    })
}

fn element_context<D: PageDom + ?Sized>(dom: &D, el: NodeId) -> ElementContext {
    let siblings = dom.sibling_elements(el);
    let index = siblings.iter().position(|s| *s == el).unwrap_or(0);

    ElementContext {
        parent: dom.parent_element(el).and_then(|p| summarize(dom, p)),
        previous_sibling: index
            .checked_sub(1)
            .and_then(|i| siblings.get(i))
            .and_then(|s| summarize(dom, *s)),
        next_sibling: siblings.get(index + 1).and_then(|s| summarize(dom, *s)),
        sibling_count: siblings.len().saturating_sub(1),
        index_in_parent: index,
        child_count: dom.element_children(el).len(),
    }
}

fn accessibility_info<D: PageDom + ?Sized>(dom: &D, el: NodeId) -> AccessibilityInfo {
    let attributes: BTreeMap<String, String> = dom.attributes(el).into_iter().collect();
    AccessibilityInfo {
        role: dom.attribute(el, "role"),
        label: dom
            .attribute(el, "aria-label")
            .or_else(|| dom.attribute(el, "title"))
            .or_else(|| dom.attribute(el, "alt")),
        tab_index: dom
            .attribute(el, "tabindex")
            .and_then(|t| t.trim().parse().ok()),
        aria: prefixed(&attributes, "aria-"),
    }
}

/// JS expression resolving the captured element in a real page. The text
/// annotation is a comment to a browser, so content selectors become a
/// text search.
fn locator_expression(snapshot: &ElementSnapshot, text: &str) -> String {
    if snapshot.selector.contains("/* text:") {
        format!(
            "[...document.querySelectorAll({})].find(el => el.textContent.trim() === {})",
            js_string(&snapshot.tag_name),
            js_string(text)
        )
    } else {
        format!("document.querySelector({})", js_string(&snapshot.selector))
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn example_statements(snapshot: &ElementSnapshot, text: &str) -> BTreeMap<Affordance, String> {
    let target = locator_expression(snapshot, text);
    let tag = snapshot.tag_name.as_str();
    let input_type = snapshot
        .attributes
        .get("type")
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_default();
    let mut examples = BTreeMap::new();

    if snapshot.is_clickable {
        examples.insert(Affordance::Click, format!("{target}.click();"));
    }
    if snapshot.is_interactive || matches!(tag, "a" | "button") {
        examples.insert(Affordance::Focus, format!("{target}.focus();"));
    }

    let editable_input = tag == "input"
        && !matches!(
            input_type.as_str(),
            "checkbox" | "radio" | "submit" | "button" | "reset" | "image" | "file"
        );
    if editable_input || tag == "textarea" {
        examples.insert(
            Affordance::SetValue,
            format!(
                "const el = {target}; el.value = \"new value\"; el.dispatchEvent(new Event(\"input\", {{ bubbles: true }}));"
            ),
        );
    }

    if tag == "input" && matches!(input_type.as_str(), "checkbox" | "radio") {
        examples.insert(
            Affordance::Check,
            format!("const el = {target}; el.checked = true; el.dispatchEvent(new Event(\"change\", {{ bubbles: true }}));"),
        );
        examples.insert(
            Affordance::Uncheck,
            format!("const el = {target}; el.checked = false; el.dispatchEvent(new Event(\"change\", {{ bubbles: true }}));"),
        );
    }

    if tag == "select" {
        let value = snapshot
            .form
            .as_ref()
            .and_then(|f| f.options.first())
            .map(|o| o.value.as_str())
            .unwrap_or("");
        examples.insert(
            Affordance::SelectOption,
            format!(
                "const el = {target}; el.value = {}; el.dispatchEvent(new Event(\"change\", {{ bubbles: true }}));",
                js_string(value)
            ),
        );
    }

    examples
}
