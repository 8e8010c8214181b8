//! Selector grammar understood by the in-memory page.
//!
//! Supports the subset the synthesizer emits plus a little headroom: type,
//! universal, `#id`, `.class`, `[attr]`, `[attr="value"]`, `:nth-of-type(n)`,
//! `:first-of-type`, `:last-of-type`, descendant and child combinators,
//! selector lists, and the `/* text: "..." */` annotation. Plain comments are
//! ignored.

use thiserror::Error;

use crate::dom::dom_model::{NodeId, PageDom};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("unsupported selector: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, SelectorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    nth_of_type: Option<usize>,
    last_of_type: bool,
    text: Option<String>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && !self.universal
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.nth_of_type.is_none()
            && !self.last_of_type
    }

    fn matches<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId) -> bool {
        let Some(tag) = dom.tag_name(el) else {
            return false;
        };

        if self.tag.as_deref().is_some_and(|expected| expected != tag) {
            return false;
        }

        if let Some(id) = &self.id {
            if dom.attribute(el, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let list = dom.class_list(el);
            if !self.classes.iter().all(|c| list.contains(c)) {
                return false;
            }
        }

        for attr in &self.attrs {
            match (&attr.value, dom.attribute(el, &attr.name)) {
                (_, None) => return false,
                (Some(expected), Some(actual)) if *expected != actual => return false,
                _ => {}
            }
        }

        if self.nth_of_type.is_some() || self.last_of_type {
            let same_tag: Vec<NodeId> = dom
                .sibling_elements(el)
                .into_iter()
                .filter(|s| dom.tag_name(*s).as_deref() == Some(tag.as_str()))
                .collect();
            let Some(pos) = same_tag.iter().position(|s| *s == el) else {
                return false;
            };
            if self.nth_of_type.is_some_and(|n| pos + 1 != n) {
                return false;
            }
            if self.last_of_type && pos + 1 != same_tag.len() {
                return false;
            }
        }

        if let Some(text) = &self.text {
            if dom.visible_text(el) != *text {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    // Relation to the part on the left.
    combinator: Option<Combinator>,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Vec<Part>>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let mut parser = Parser::new(source);
        let groups = parser.parse_list()?;
        Ok(Self { groups })
    }

    pub fn matches<D: PageDom + ?Sized>(&self, dom: &D, el: NodeId) -> bool {
        self.groups.iter().any(|parts| matches_chain(dom, parts, el))
    }
}

fn matches_chain<D: PageDom + ?Sized>(dom: &D, parts: &[Part], el: NodeId) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };
    if !last.compound.matches(dom, el) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match last.combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => dom
            .parent_element(el)
            .is_some_and(|parent| matches_chain(dom, rest, parent)),
        Combinator::Descendant => {
            let mut cursor = dom.parent_element(el);
            while let Some(ancestor) = cursor {
                if matches_chain(dom, rest, ancestor) {
                    return true;
                }
                cursor = dom.parent_element(ancestor);
            }
            false
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn err(&self) -> SelectorError {
        SelectorError::Unsupported(self.source.to_string())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn at_comment(&self) -> bool {
        self.peek() == Some('/') && self.peek_at(1) == Some('*')
    }

    fn parse_list(&mut self) -> Result<Vec<Vec<Part>>> {
        let mut groups = Vec::new();
        loop {
            self.skip_ws();
            groups.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.pos += 1;
                }
                Some(_) => return Err(self.err()),
            }
        }
        Ok(groups)
    }

    fn parse_complex(&mut self) -> Result<Vec<Part>> {
        let mut parts = vec![Part {
            compound: self.parse_compound()?,
            combinator: None,
        }];

        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('/') if self.at_comment() => {
                    if let Some(text) = self.parse_comment()? {
                        let Some(last) = parts.last_mut() else {
                            return Err(self.err());
                        };
                        if last.compound.text.replace(text).is_some() {
                            return Err(self.err());
                        }
                    }
                }
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    parts.push(Part {
                        compound: self.parse_compound()?,
                        combinator: Some(Combinator::Child),
                    });
                }
                Some(_) if had_ws => parts.push(Part {
                    compound: self.parse_compound()?,
                    combinator: Some(Combinator::Descendant),
                }),
                Some(_) => return Err(self.err()),
            }
        }

        Ok(parts)
    }

    /// Consumes a `/* ... */` comment; returns the text filter if it is one.
    fn parse_comment(&mut self) -> Result<Option<String>> {
        self.pos += 2;
        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.err()),
                Some('*') if self.peek_at(1) == Some('/') => break,
                Some(_) => self.pos += 1,
            }
        }
        let body: String = self.chars[start..self.pos].iter().collect();
        self.pos += 2;

        match body.trim().strip_prefix("text:") {
            Some(rest) => serde_json::from_str::<String>(rest.trim())
                .map(Some)
                .map_err(|_| self.err()),
            None => Ok(None),
        }
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();

        loop {
            match self.peek() {
                Some('*') => {
                    if !compound.is_empty() {
                        return Err(self.err());
                    }
                    compound.universal = true;
                    self.pos += 1;
                }
                Some('#') => {
                    self.pos += 1;
                    let id = self.parse_ident()?;
                    if compound.id.replace(id).is_some() {
                        return Err(self.err());
                    }
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.parse_ident()?;
                    compound.classes.push(class);
                }
                Some('[') => {
                    let attr = self.parse_attr()?;
                    compound.attrs.push(attr);
                }
                Some(':') => self.parse_pseudo(&mut compound)?,
                Some(ch) if is_ident_start(ch) && compound.is_empty() => {
                    compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(self.err());
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                out.push(self.parse_escape()?);
            } else if is_ident_char(ch) {
                out.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.err());
        }
        Ok(out)
    }

    // Called after the backslash.
    fn parse_escape(&mut self) -> Result<char> {
        let mut hex = String::new();
        while hex.len() < 6 {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.pos += 1;
                }
                _ => break,
            }
        }

        if hex.is_empty() {
            return self.bump().ok_or_else(|| self.err());
        }

        if self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        let code = u32::from_str_radix(&hex, 16).map_err(|_| self.err())?;
        Ok(char::from_u32(code)
            .filter(|c| *c != '\0')
            .unwrap_or('\u{FFFD}'))
    }

    fn parse_attr(&mut self) -> Result<AttrCondition> {
        self.pos += 1;
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let value = if self.eat('=') {
            self.skip_ws();
            let value = match self.peek() {
                Some('"') | Some('\'') => self.parse_string()?,
                _ => self.parse_ident()?,
            };
            Some(value)
        } else {
            None
        };

        self.skip_ws();
        if !self.eat(']') {
            return Err(self.err());
        }
        Ok(AttrCondition { name, value })
    }

    fn parse_string(&mut self) -> Result<String> {
        let quote = self.bump().ok_or_else(|| self.err())?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err()),
                Some('\\') => out.push(self.parse_escape()?),
                Some(c) if c == quote => break,
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    fn parse_pseudo(&mut self, compound: &mut Compound) -> Result<()> {
        self.pos += 1;
        let name = self.parse_ident()?.to_ascii_lowercase();
        match name.as_str() {
            "nth-of-type" => {
                if !self.eat('(') {
                    return Err(self.err());
                }
                self.skip_ws();
                let mut digits = String::new();
                while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                    digits.push(c);
                    self.pos += 1;
                }
                self.skip_ws();
                if !self.eat(')') {
                    return Err(self.err());
                }
                let n: usize = digits.parse().map_err(|_| self.err())?;
                if n == 0 {
                    return Err(self.err());
                }
                compound.nth_of_type = Some(n);
            }
            "first-of-type" => compound.nth_of_type = Some(1),
            "last-of-type" => compound.last_of_type = true,
            _ => return Err(self.err()),
        }
        Ok(())
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || ch == '\\' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

// ============================================================================
// Serialization helpers
// ============================================================================

/// Escapes an identifier for use after `#` or `.`, following `CSS.escape`.
pub fn css_escape(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len());

    for (i, &ch) in chars.iter().enumerate() {
        let leading_digit =
            ch.is_ascii_digit() && (i == 0 || (i == 1 && chars[0] == '-'));
        match ch {
            '\0' => out.push('\u{FFFD}'),
            c if c.is_control() || leading_digit => {
                out.push_str(&format!("\\{:x} ", c as u32));
            }
            '-' if i == 0 && chars.len() == 1 => out.push_str("\\-"),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() => out.push(c),
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

/// Double-quoted attribute value with `"` and `\` escaped.
pub fn quote_attr_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// `/* text: "..." */` annotation for an exact-text filter.
pub fn text_annotation(text: &str) -> String {
    let quoted = serde_json::to_string(text).unwrap_or_else(|_| String::from("\"\""));
    format!("/* text: {} */", quoted.replace("*/", "*\\/"))
}
