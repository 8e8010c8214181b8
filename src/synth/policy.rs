//! Heuristics deciding which ids and classes are too volatile to anchor on.

use std::sync::LazyLock;

use regex::Regex;

/// Swappable heuristic set used by the synthesizer.
///
/// Bump `version()` whenever a pattern list changes so stored records can be
/// traced back to the rules that produced their selectors.
pub trait SelectorPolicy: Send + Sync {
    fn version(&self) -> u32;

    /// True when an id looks machine-generated and unlikely to survive a reload.
    fn is_dynamic_id(&self, id: &str) -> bool;

    /// True when a class is a styling utility rather than a semantic name.
    fn is_utility_class(&self, class: &str) -> bool;
}

static DYNAMIC_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // long digit run
        r"\d{4,}",
        // long hex run
        r"(?i)[0-9a-f]{8,}",
        // uuid
        r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        // framework-generated prefixes
        r"^(ember|ext-gen|ext-comp|yui_|gwt-uid-|ui-id-|jQuery)\d*",
        r"^(react-select-|mui-|radix-|headlessui-|rc-tabs-|downshift-|cdk-|mat-)",
        r"^:r[0-9a-z]*:$",
        r"^__next",
        r"^ng-",
        r"^v-[0-9a-f]+",
        // generic placeholders
        r"(?i)^(id|el|element|elem|item|node|temp|tmp|undefined|null|default|auto)[-_]?\d*$",
        // trailing counter
        r"_\d+$",
    ])
});

static UTILITY_CLASS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // spacing
        r"^-?[mp][trblxyse]?-(\d+(\.\d+)?|px|auto|\[.+\])$",
        // sizing
        r"^(w|h|min-w|max-w|min-h|max-h|size)-",
        // color and typography
        r"^(text|bg|border|fill|stroke|ring|from|to|via|font|leading|tracking|shadow|rounded|opacity)-",
        // display and layout
        r"^(flex|grid|block|inline|inline-block|inline-flex|hidden|table|contents|static|fixed|absolute|relative|sticky|container|clearfix|visible|invisible)$",
        r"^(flex|grid|gap|space|items|justify|content|self|place|order|col|row|basis|grow|shrink|overflow|z|top|right|bottom|left|inset|float|align|d|position)-",
        // responsive and state prefixes
        r"^(sm|md|lg|xl|2xl|xs|xxl):",
        r"^(hover|focus|focus-within|focus-visible|active|disabled|visited|group-hover|peer-focus|dark|first|last|odd|even):",
        r"^(is|has)-(active|open|selected|hidden|visible|focused|disabled|loading)$",
        r"^(active|selected|open|focused|disabled|loading|show|fade|in|collapsed|collapse)$",
        // framework variants (bootstrap style)
        r"^(btn|col|row|card|badge|alert|nav|navbar|form|input-group|list-group|dropdown|modal|table|text|m|p|mt|mb|ml|mr|mx|my|pt|pb|pl|pr|px|py)(-[a-z0-9]+)*$",
        // css-in-js hashes
        r"^(css|sc|jsx|emotion|makeStyles|jss)-[a-zA-Z0-9]+",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(pattern = p, error = %e, "invalid selector heuristic pattern");
                None
            }
        })
        .collect()
}

/// Default heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPolicy;

impl SelectorPolicy for HeuristicPolicy {
    fn version(&self) -> u32 {
        1
    }

    fn is_dynamic_id(&self, id: &str) -> bool {
        DYNAMIC_ID_PATTERNS.iter().any(|re| re.is_match(id))
    }

    fn is_utility_class(&self, class: &str) -> bool {
        if class.chars().count() < 3 || class.starts_with(|c: char| c.is_ascii_digit()) {
            return true;
        }
        UTILITY_CLASS_PATTERNS.iter().any(|re| re.is_match(class))
    }
}
