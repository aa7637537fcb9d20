#![forbid(unsafe_code)]

//! Virtual nodes: the parsed, transient form of a markup string.

use std::collections::BTreeMap;

/// Attributes that carry node identity, in lookup order.
pub const KEY_ATTRIBUTES: [&str; 3] = ["data-key", "data-id", "id"];

/// A parsed markup node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VNode {
    /// A text run.
    Text {
        /// Trimmed copy, used only for comparison.
        content: String,
        /// Text as written (entities decoded), used for updates.
        raw: String,
    },
    /// An element with ordered children.
    Element(VElement),
}

/// Element payload of a [`VNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VElement {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes by lowercase name.
    pub attributes: BTreeMap<String, String>,
    /// Ordered children.
    pub children: Vec<VNode>,
    /// Identity key from the first present key attribute.
    ///
    /// Extracted for future keyed matching; diffing is positional.
    pub key: Option<String>,
}

impl VNode {
    /// Create a text node from its raw content.
    #[must_use]
    pub fn text(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self::Text {
            content: raw.trim().to_owned(),
            raw,
        }
    }

    /// Create an element, deriving its key from the attributes.
    #[must_use]
    pub fn element(
        tag: impl Into<String>,
        attributes: BTreeMap<String, String>,
        children: Vec<VNode>,
    ) -> Self {
        let key = KEY_ATTRIBUTES
            .iter()
            .find_map(|name| attributes.get(*name).cloned());
        Self::Element(VElement {
            tag: tag.into(),
            attributes,
            children,
            key,
        })
    }

    /// Tag name, or `#text` for text nodes.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Text { .. } => "#text",
            Self::Element(el) => &el.tag,
        }
    }

    /// Identity key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Text { .. } => None,
            Self::Element(el) => el.key.as_deref(),
        }
    }

    /// Whether this is a text node.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// Equality as the differ sees it: text compared by trimmed content.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text { content: a, .. }, Self::Text { content: b, .. }) => a == b,
            (Self::Element(a), Self::Element(b)) => {
                a.tag == b.tag
                    && a.attributes == b.attributes
                    && nodes_structurally_eq(&a.children, &b.children)
            }
            _ => false,
        }
    }
}

/// [`VNode::structurally_eq`] over ordered lists.
#[must_use]
pub fn nodes_structurally_eq(a: &[VNode], b: &[VNode]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structurally_eq(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn text_keeps_raw_and_trims_content() {
        let node = VNode::text("  A*\n");
        assert_eq!(
            node,
            VNode::Text {
                content: "A*".into(),
                raw: "  A*\n".into(),
            }
        );
    }

    #[test]
    fn key_prefers_data_key() {
        let node = VNode::element(
            "li",
            attrs(&[("id", "x"), ("data-id", "7"), ("data-key", "k")]),
            vec![],
        );
        assert_eq!(node.key(), Some("k"));
        let node = VNode::element("li", attrs(&[("id", "x"), ("data-id", "7")]), vec![]);
        assert_eq!(node.key(), Some("7"));
    }

    #[test]
    fn structural_eq_ignores_surrounding_whitespace() {
        assert!(VNode::text(" a ").structurally_eq(&VNode::text("a")));
        assert!(!VNode::text("a").structurally_eq(&VNode::text("b")));
    }

    #[test]
    fn text_tag_is_reserved() {
        assert_eq!(VNode::text("x").tag(), "#text");
    }
}
