use std::sync::LazyLock;

use regex::Regex;

static REFERENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z][A-Za-z0-9_]*)").ok());

static NAME: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").ok());

/// Names referenced as `@name` in `text`, in order of first appearance.
pub fn scan_references(text: &str) -> Vec<String> {
    let Some(re) = REFERENCE.as_ref() else {
        return Vec::new();
    };
    let mut names: Vec<String> = Vec::new();
    for caps in re.captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

pub fn is_valid_name(name: &str) -> bool {
    NAME.as_ref().is_some_and(|re| re.is_match(name))
}
