#![forbid(unsafe_code)]

//! Markup parsing and serialization.
//!
//! The parser accepts the HTML subset widget render functions produce:
//! elements with quoted, unquoted or boolean attributes, text with character
//! references, void and self-closing elements, and raw-text `script`/`style`
//! bodies. Comments, doctypes and processing instructions are skipped.
//!
//! It is hand-written and iterative (an explicit open-element stack), so
//! nesting depth never grows the call stack.
//!
//! # Failure Modes
//!
//! - A close tag with no matching open element is an error.
//! - A tag or quoted attribute value cut off by end of input is an error.
//! - Elements still open at end of input are closed implicitly.

use std::collections::BTreeMap;
use std::fmt;

use crate::vnode::VNode;

/// Elements that never have children or a close tag.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose body is raw text.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Whether `tag` is a void element.
#[must_use]
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupErrorKind {
    /// `</tag>` with no matching open element.
    UnexpectedClose(String),
    /// End of input inside a tag.
    UnterminatedTag,
    /// End of input inside a quoted attribute value.
    UnterminatedAttribute(String),
}

/// A markup parse failure with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupError {
    pub kind: MarkupErrorKind,
    pub offset: usize,
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MarkupErrorKind::UnexpectedClose(tag) => {
                write!(f, "unexpected </{tag}> at byte {}", self.offset)
            }
            MarkupErrorKind::UnterminatedTag => {
                write!(f, "unterminated tag at byte {}", self.offset)
            }
            MarkupErrorKind::UnterminatedAttribute(name) => {
                write!(f, "unterminated value for attribute `{name}` at byte {}", self.offset)
            }
        }
    }
}

impl std::error::Error for MarkupError {}

type Result<T> = std::result::Result<T, MarkupError>;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a markup string into an ordered list of top-level nodes.
pub fn parse(input: &str) -> Result<Vec<VNode>> {
    Parser::new(input).parse()
}

struct OpenElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    children: Vec<VNode>,
}

impl OpenElement {
    fn close(self) -> VNode {
        VNode::element(self.tag, self.attributes, self.children)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    stack: Vec<OpenElement>,
    roots: Vec<VNode>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<VNode>> {
        while self.pos < self.input.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.skip_comment();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_declaration()?;
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else if starts_tag(rest) {
                self.open_tag()?;
            } else {
                self.text();
            }
        }
        while let Some(open) = self.stack.pop() {
            let node = open.close();
            self.push(node);
        }
        Ok(self.roots)
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn error(&self, kind: MarkupErrorKind) -> MarkupError {
        MarkupError {
            kind,
            offset: self.pos,
        }
    }

    fn push(&mut self, node: VNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn skip_comment(&mut self) {
        match self.input[self.pos + 4..].find("-->") {
            Some(end) => self.pos += 4 + end + 3,
            None => self.pos = self.input.len(),
        }
    }

    fn skip_declaration(&mut self) -> Result<()> {
        match self.rest().find('>') {
            Some(end) => {
                self.pos += end + 1;
                Ok(())
            }
            None => Err(self.error(MarkupErrorKind::UnterminatedTag)),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        &rest[..end]
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn close_tag(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 2;
        let name = self.take_while(is_name_char).to_ascii_lowercase();
        match self.rest().find('>') {
            Some(end) => self.pos += end + 1,
            None => {
                self.pos = start;
                return Err(self.error(MarkupErrorKind::UnterminatedTag));
            }
        }
        let Some(depth) = self.stack.iter().rposition(|open| open.tag == name) else {
            self.pos = start;
            return Err(self.error(MarkupErrorKind::UnexpectedClose(name)));
        };
        while self.stack.len() > depth {
            if let Some(open) = self.stack.pop() {
                let node = open.close();
                self.push(node);
            }
        }
        Ok(())
    }

    fn open_tag(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        let tag = self.take_while(is_name_char).to_ascii_lowercase();
        let mut attributes = BTreeMap::new();
        let self_closing = loop {
            self.skip_whitespace();
            if self.eat("/>") {
                break true;
            }
            if self.eat(">") {
                break false;
            }
            if self.pos >= self.input.len() {
                self.pos = start;
                return Err(self.error(MarkupErrorKind::UnterminatedTag));
            }
            if self.eat("/") {
                continue;
            }
            if let Some((name, value)) = self.attribute()? {
                attributes.entry(name).or_insert(value);
            }
        };

        if self_closing || is_void(&tag) {
            self.push(VNode::element(tag, attributes, Vec::new()));
            return Ok(());
        }
        if is_raw_text(&tag) {
            let body = self.raw_text(&tag);
            let children = if body.is_empty() {
                Vec::new()
            } else {
                vec![VNode::text(body)]
            };
            self.push(VNode::element(tag, attributes, children));
            return Ok(());
        }
        self.stack.push(OpenElement {
            tag,
            attributes,
            children: Vec::new(),
        });
        Ok(())
    }

    fn attribute(&mut self) -> Result<Option<(String, String)>> {
        let name = self
            .take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'))
            .to_ascii_lowercase();
        if name.is_empty() {
            // Stray '=' with no name; skip it.
            let skip = self.rest().chars().next().map_or(0, char::len_utf8);
            self.pos += skip;
            return Ok(None);
        }
        self.skip_whitespace();
        if !self.eat("=") {
            return Ok(Some((name, String::new())));
        }
        self.skip_whitespace();
        let value_start = self.pos;
        let quote = self.rest().chars().next().filter(|c| matches!(c, '"' | '\''));
        let raw = if let Some(quote) = quote {
            self.pos += 1;
            match self.rest().find(quote) {
                Some(end) => {
                    let value = &self.rest()[..end];
                    self.pos += end + 1;
                    value
                }
                None => {
                    self.pos = value_start;
                    return Err(self.error(MarkupErrorKind::UnterminatedAttribute(name)));
                }
            }
        } else {
            self.take_while(|c| !c.is_whitespace() && c != '>')
        };
        Ok(Some((name, decode_entities(raw))))
    }

    fn raw_text(&mut self, tag: &str) -> String {
        let rest = self.rest();
        let lower = rest.to_ascii_lowercase();
        let close = format!("</{tag}");
        match lower.find(&close) {
            Some(end) => {
                let body = rest[..end].to_owned();
                self.pos += end;
                if let Some(gt) = self.rest().find('>') {
                    self.pos += gt + 1;
                } else {
                    self.pos = self.input.len();
                }
                body
            }
            None => {
                self.pos = self.input.len();
                rest.to_owned()
            }
        }
    }

    fn text(&mut self) {
        let rest = self.rest();
        // A '<' that does not open markup is literal text.
        let mut end = rest.len();
        let mut search = if rest.starts_with('<') { 1 } else { 0 };
        while let Some(i) = rest[search..].find('<') {
            let at = search + i;
            let tail = &rest[at..];
            if tail.starts_with("</") || tail.starts_with("<!") || tail.starts_with("<?") || starts_tag(tail)
            {
                end = at;
                break;
            }
            search = at + 1;
        }
        let raw = &rest[..end];
        self.pos += end;
        self.push(VNode::text(decode_entities(raw)));
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn starts_tag(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

// ---------------------------------------------------------------------------
// Character references
// ---------------------------------------------------------------------------

/// Decode the character references markup commonly carries. Unknown or
/// malformed references are kept verbatim.
#[must_use]
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize nodes back to markup.
#[must_use]
pub fn to_markup(nodes: &[VNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, false);
    }
    out
}

fn write_node(out: &mut String, node: &VNode, raw_text: bool) {
    match node {
        VNode::Text { raw, .. } => {
            if raw_text {
                out.push_str(raw);
            } else {
                escape_into(out, raw, false);
            }
        }
        VNode::Element(el) => {
            write_open_tag(out, &el.tag, &el.attributes);
            if is_void(&el.tag) {
                return;
            }
            let raw_body = is_raw_text(&el.tag);
            for child in &el.children {
                write_node(out, child, raw_body);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

pub(crate) fn write_open_tag(out: &mut String, tag: &str, attributes: &BTreeMap<String, String>) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            out.push_str("=\"");
            escape_into(out, value, true);
            out.push('"');
        }
    }
    out.push('>');
}

/// Escape `text` for use as element content.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text, false);
    out
}

pub(crate) fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
