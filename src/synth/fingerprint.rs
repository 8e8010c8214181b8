use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::dom::dom_model::{NodeId, PageDom};
use crate::synth::synthesizer::{Synthesizer, truncate_chars};

/// Similarity key used to relocate an element once every stored selector
/// has stopped matching. Not a selector and not unique.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFingerprint {
    pub tag_name: String,
    pub text_snippet: String,
    pub attribute_signature: String,
    pub class_count: usize,
    pub child_count: usize,
}

impl ContentFingerprint {
    /// Hex sha1 over every component, used to spot duplicate captures.
    pub fn digest(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.tag_name.as_bytes());
        hasher.update([0]);
        hasher.update(self.text_snippet.as_bytes());
        hasher.update([0]);
        hasher.update(self.attribute_signature.as_bytes());
        hasher.update([0]);
        hasher.update(self.class_count.to_le_bytes());
        hasher.update(self.child_count.to_le_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl Synthesizer {
    pub fn fingerprint<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId) -> Option<ContentFingerprint> {
        let tag_name = dom.tag_name(el)?;
        Some(ContentFingerprint {
            tag_name,
            text_snippet: truncate_chars(&dom.visible_text(el), self.config.text_snippet_len),
            attribute_signature: self.attribute_signature(dom, el),
            class_count: dom.class_list(el).len(),
            child_count: dom.element_children(el).len(),
        })
    }

    /// `name=value` pairs sorted by name and joined with `|`, inline style
    /// excluded.
    pub fn attribute_signature<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId) -> String {
        let mut attrs: Vec<(String, String)> = dom
            .attributes(el)
            .into_iter()
            .filter(|(name, _)| name != "style")
            .collect();
        attrs.sort();

        let joined = attrs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("|");
        truncate_chars(&joined, self.config.signature_len)
    }

    /// Same-tag elements whose text contains the stored snippet or whose
    /// attribute signature contains the stored signature, in document order.
    pub fn reanchor_candidates<D: PageDom + ?Sized>(
        &self,
        dom: &D,
        fingerprint: &ContentFingerprint,
    ) -> Vec<NodeId> {
        let snippet = fingerprint.text_snippet.as_str();
        let signature = fingerprint.attribute_signature.as_str();
        if snippet.is_empty() && signature.is_empty() {
            return Vec::new();
        }

        let candidates: Vec<NodeId> = dom
            .elements_by_tag(&fingerprint.tag_name)
            .into_iter()
            .filter(|el| {
                (!snippet.is_empty() && dom.visible_text(*el).contains(snippet))
                    || (!signature.is_empty() && self.attribute_signature(dom, *el).contains(signature))
            })
            .collect();

        debug!(
            tag = %fingerprint.tag_name,
            candidates = candidates.len(),
            "fingerprint scan"
        );
        candidates
    }
}
