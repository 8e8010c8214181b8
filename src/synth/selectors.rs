use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::dom_model::{NodeId, PageDom};
use crate::dom::selector::{css_escape, quote_attr_value, text_annotation};
use crate::synth::synthesizer::Synthesizer;

const SEMANTIC_ATTRIBUTES: &[&str] = &[
    "name",
    "type",
    "placeholder",
    "value",
    "title",
    "alt",
    "aria-label",
    "role",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorStrategy {
    StableId,
    Attribute,
    Class,
    Content,
    Positional,
    AbsolutePath,
}

/// Result of [`Synthesizer::generate_selectors`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSet {
    pub primary: String,
    pub strategy: SelectorStrategy,
    /// Runner-up candidates from strategies not chosen as primary.
    pub fallbacks: Vec<String>,
}

impl Synthesizer {
    /// Derives a primary locator plus fallbacks for `el`, or `None` when `el`
    /// is not an element of `dom`.
    pub fn generate_selectors<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId) -> Option<SelectorSet> {
        let tag = dom.tag_name(el)?;

        let candidates = [
            (SelectorStrategy::StableId, self.id_selector(dom, el)),
            (SelectorStrategy::Attribute, self.attribute_selector(dom, el, &tag)),
            (SelectorStrategy::Class, self.class_selector(dom, el, &tag)),
            (SelectorStrategy::Content, self.content_selector(dom, el, &tag)),
        ];

        let mut found: Vec<(SelectorStrategy, String)> = candidates
            .into_iter()
            .filter_map(|(strategy, selector)| selector.map(|s| (strategy, s)))
            .collect();
        found.push(self.positional_selector(dom, el, &tag));

        let (strategy, primary) = found.remove(0);
        let mut fallbacks: Vec<String> = Vec::new();
        for (_, selector) in found {
            if selector != primary && !fallbacks.contains(&selector) {
                fallbacks.push(selector);
            }
        }

        debug!(tag = %tag, primary = %primary, ?strategy, fallbacks = fallbacks.len(), "selectors generated");
        Some(SelectorSet {
            primary,
            strategy,
            fallbacks,
        })
    }

    /// Tag chain from `el` up to the root, stopping early at a stable id that
    /// only its own element carries.
    pub fn absolute_path<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(el);

        while let Some(node) = cursor {
            let Some(tag) = dom.tag_name(node) else { break };

            let anchor = dom
                .element_id(node)
                .filter(|id| !self.policy.is_dynamic_id(id))
                .map(|id| format!("#{}", css_escape(&id)))
                .filter(|anchor| is_unique(dom, anchor, node));
            if let Some(anchor) = anchor {
                segments.push(anchor);
                break;
            }

            let same_tag = same_tag_siblings(dom, node, &tag);
            if same_tag.len() > 1 {
                let k = same_tag.iter().position(|s| *s == node).unwrap_or(0) + 1;
                segments.push(format!("{tag}:nth-of-type({k})"));
            } else {
                segments.push(tag);
            }
            cursor = dom.parent_element(node);
        }

        segments.reverse();
        segments.join(" > ")
    }

    fn id_selector<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId) -> Option<String> {
        let id = dom.element_id(el)?;
        if self.policy.is_dynamic_id(&id) {
            debug!(id = %id, "id rejected as generated");
            return None;
        }
        let selector = format!("#{}", css_escape(&id));
        is_unique(dom, &selector, el).then_some(selector)
    }

    fn attribute_selector<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId, tag: &str) -> Option<String> {
        let bare_allowed = matches!(tag, "button" | "input");

        for attr in SEMANTIC_ATTRIBUTES {
            let Some(value) = dom.attribute(el, attr) else { continue };
            if value.is_empty() || value.chars().count() >= self.config.max_attribute_len {
                continue;
            }

            let condition = format!("[{attr}={}]", quote_attr_value(&value));
            let qualified = format!("{tag}{condition}");
            if is_unique(dom, &qualified, el) {
                return Some(qualified);
            }
            if bare_allowed && is_unique(dom, &condition, el) {
                return Some(condition);
            }
        }
        None
    }

    fn class_selector<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId, tag: &str) -> Option<String> {
        for class in dom.class_list(el) {
            if self.policy.is_utility_class(&class) {
                continue;
            }
            let bare = format!(".{}", css_escape(&class));
            if is_unique(dom, &bare, el) {
                return Some(bare);
            }
            let qualified = format!("{tag}{bare}");
            if is_unique(dom, &qualified, el) {
                return Some(qualified);
            }
        }
        None
    }

    fn content_selector<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId, tag: &str) -> Option<String> {
        let input_type = dom
            .attribute(el, "type")
            .map(|t| t.to_ascii_lowercase())
            .unwrap_or_default();
        let is_input_button = tag == "input" && matches!(input_type.as_str(), "submit" | "button");
        if !matches!(tag, "button" | "a") && !is_input_button {
            return None;
        }

        let text = dom.visible_text(el);
        if !text.is_empty() && text.chars().count() < self.config.max_text_len {
            let sharing = dom
                .elements_by_tag(tag)
                .into_iter()
                .filter(|other| dom.visible_text(*other) == text)
                .count();
            let selector = format!("{tag} {}", text_annotation(&text));
            if sharing == 1 && is_unique(dom, &selector, el) {
                return Some(selector);
            }
        }

        if tag == "input" {
            if let Some(value) = dom.attribute(el, "value") {
                if !value.is_empty() && value.chars().count() < self.config.max_value_len {
                    let selector = format!("input[value={}]", quote_attr_value(&value));
                    if is_unique(dom, &selector, el) {
                        return Some(selector);
                    }
                }
            }
        }

        if is_input_button && input_type == "submit" {
            let form = closest_tag(dom, el, "form")?;
            let form_selector = match (dom.element_id(form), dom.attribute(form, "name")) {
                (Some(id), _) => format!("form#{}", css_escape(&id)),
                (None, Some(name)) if !name.is_empty() => {
                    format!("form[name={}]", quote_attr_value(&name))
                }
                _ => return None,
            };
            let selector = format!("{form_selector} input[type=\"submit\"]");
            if is_unique(dom, &selector, el) {
                return Some(selector);
            }
        }

        None
    }

    fn positional_selector<D: PageDom + ?Sized>(
        &self,
        dom: &D,
        el: NodeId,
        tag: &str,
    ) -> (SelectorStrategy, String) {
        let same_tag = same_tag_siblings(dom, el, tag);
        let k = same_tag.iter().position(|s| *s == el).unwrap_or(0) + 1;
        let nth = format!("{tag}:nth-of-type({k})");

        let mut attempts = vec![tag.to_string()];
        if same_tag.len() <= self.config.max_positional_siblings {
            attempts.push(nth.clone());
        }

        if let Some(parent) = dom.parent_element(el) {
            let mut prefixes = Vec::new();
            if let Some(id) = dom.element_id(parent).filter(|id| !self.policy.is_dynamic_id(id)) {
                prefixes.push(format!("#{}", css_escape(&id)));
            }
            prefixes.extend(
                dom.class_list(parent)
                    .into_iter()
                    .filter(|c| !self.policy.is_utility_class(c))
                    .map(|c| format!(".{}", css_escape(&c))),
            );
            for prefix in prefixes {
                attempts.push(format!("{prefix} > {tag}"));
                attempts.push(format!("{prefix} > {nth}"));
            }
        }

        if same_tag.len() <= self.config.max_fallback_siblings {
            attempts.push(nth.clone());
        }

        if let Some(selector) = attempts.into_iter().find(|s| is_unique(dom, s, el)) {
            return (SelectorStrategy::Positional, selector);
        }

        let path = self.absolute_path(dom, el);
        if is_unique(dom, &path, el) {
            return (SelectorStrategy::AbsolutePath, path);
        }

        // Nothing resolves uniquely (e.g. inside a shadow tree); keep the
        // least surprising positional form.
        let last_resort = if same_tag.len() <= self.config.max_fallback_siblings {
            nth
        } else {
            tag.to_string()
        };
        (SelectorStrategy::Positional, last_resort)
    }
}

/// True when `selector` matches exactly one element and it is `el`.
pub fn is_unique<D: PageDom + ?Sized>(dom: &D, selector: &str, el: NodeId) -> bool {
    let matches = dom.query_selector_all(selector);
    matches.len() == 1 && matches[0] == el
}

fn same_tag_siblings<D: PageDom + ?Sized>(dom: &D, el: NodeId, tag: &str) -> Vec<NodeId> {
    dom.sibling_elements(el)
        .into_iter()
        .filter(|s| dom.tag_name(*s).as_deref() == Some(tag))
        .collect()
}

fn closest_tag<D: PageDom + ?Sized>(dom: &D, el: NodeId, tag: &str) -> Option<NodeId> {
    let mut cursor = dom.parent_element(el);
    while let Some(node) = cursor {
        if dom.tag_name(node).as_deref() == Some(tag) {
            return Some(node);
        }
        cursor = dom.parent_element(node);
    }
    None
}
