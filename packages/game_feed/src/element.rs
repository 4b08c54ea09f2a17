//! Decoded protocol units.
//!
//! The decoder (external to this crate) turns one network transmission into
//! a [`Document`]: two roots of [`Node`]s mirroring the body/head split of the
//! markup tree. Routing consumes every node exactly once.

use serde::{Deserialize, Serialize};

/// A node in the decoded tree: either a tagged element or a bare text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// True for text nodes that carry nothing but whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// One decoded protocol unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    /// Category marker (e.g. `prompt` on prompts that reached the feed).
    pub class: Option<String>,
    /// Channel id for `stream` elements, component id for metadata tags.
    pub id: Option<String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            class: None,
            id: None,
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class
            .as_deref()
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Concatenated text content of this element and all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// An ordered batch of top-level nodes decoded from a single transmission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub body: Vec<Node>,
    pub head: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, node: impl Into<Node>) -> Self {
        self.body.push(node.into());
        self
    }

    pub fn with_head(mut self, node: impl Into<Node>) -> Self {
        self.head.push(node.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.head.is_empty()
    }

    /// Tag names of the top-level elements, body first.
    pub fn top_level_tags(&self) -> impl Iterator<Item = &str> {
        self.body
            .iter()
            .chain(self.head.iter())
            .filter_map(Node::as_element)
            .map(|e| e.tag.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_collected_depth_first() {
        let el = Element::new("pre")
            .with_text("You see ")
            .with_child(Element::new("a").with_text("a sword"))
            .with_text(".");
        assert_eq!(el.text(), "You see a sword.");
    }

    #[test]
    fn has_class_matches_any_listed_marker() {
        let el = Element::new("span").with_class("cli sent");
        assert!(el.has_class("sent"));
        assert!(el.has_class("cli"));
        assert!(!el.has_class("prompt"));
        assert!(!Element::new("span").has_class("cli"));
    }

    #[test]
    fn top_level_tags_skip_text() {
        let doc = Document::new()
            .with_body(Node::text("hello"))
            .with_body(Element::new("pre"))
            .with_head(Element::new("compass"));
        let tags: Vec<_> = doc.top_level_tags().collect();
        assert_eq!(tags, vec!["pre", "compass"]);
    }
}
