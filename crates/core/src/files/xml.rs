//! Generic XML element tree used by the XML-backed file wrappers.
//!
//! Parsing goes through `roxmltree`; serialization is a small writer that
//! preserves attribute and child order so optional fields round-trip.

use crate::files::FileError;

/// One element of an XML document, with attributes and children kept in
/// document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Text content; only meaningful for leaf elements.
    pub text: Option<String>,
}

impl XmlElement {
    /// A fresh element with the given tag name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Leaf element wrapping a text value.
    pub fn text_node(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Parse a document and return its root element.
    pub fn parse(text: &str) -> Result<XmlElement, FileError> {
        let doc = roxmltree::Document::parse(text)
            .map_err(|err| FileError::Xml(err.to_string()))?;
        Ok(convert(doc.root_element()))
    }

    /// First attribute value with the given name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set or append an attribute.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    /// Child elements with the given tag name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First child with the given tag name. Searches directly so the
    /// result borrows only `self`, not `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Text of the first child with the given tag name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|child| child.text.as_deref())
    }

    /// Serialize the tree to a document string with an XML declaration.
    pub fn serialize(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
        self.write_into(&mut out, 0);
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("    ");
        }
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value, true));
            out.push('"');
        }

        if self.children.is_empty() {
            match self.text.as_deref() {
                Some(text) if !text.is_empty() => {
                    out.push('>');
                    out.push_str(&escape(text, false));
                    out.push_str("</");
                    out.push_str(&self.name);
                    out.push_str(">\n");
                }
                _ => out.push_str("/>\n"),
            }
            return;
        }

        out.push_str(">\n");
        for child in &self.children {
            child.write_into(out, depth + 1);
        }
        for _ in 0..depth {
            out.push_str("    ");
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

fn convert(node: roxmltree::Node<'_, '_>) -> XmlElement {
    let mut element = XmlElement::new(node.tag_name().name());
    for attr in node.attributes() {
        element
            .attrs
            .push((attr.name().to_string(), attr.value().to_string()));
    }

    for child in node.children() {
        if child.is_element() {
            element.children.push(convert(child));
        }
    }

    if element.children.is_empty() {
        let text: String = node
            .children()
            .filter(|child| child.is_text())
            .filter_map(|child| child.text())
            .collect();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            element.text = Some(trimmed.to_string());
        }
    }

    element
}

fn escape(value: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
