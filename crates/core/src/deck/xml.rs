//! Owned XML tree used for slide parts.
//!
//! Everything the parser sees is kept: declarations, comments and whitespace
//! text nodes round-trip as-is.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct XmlError(pub String);

#[derive(Clone, Debug, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    /// Declarations, comments, CDATA and processing instructions, written back untouched.
    Markup(Event<'static>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlDocument {
    pub nodes: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(&key.into(), value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Element name without its namespace prefix (`a:r` -> `r`).
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Namespace prefix including the colon (`a:r` -> `a:`), empty when unprefixed.
    pub fn prefix(&self) -> &str {
        match self.name.find(':') {
            Some(index) => &self.name[..=index],
            None => "",
        }
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(name, _)| name == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) {
        self.attributes.retain(|(name, _)| name != key);
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|element| element.is(local))
    }

    /// Position of the first element child with one of the given local names.
    pub fn position_of_any(&self, locals: &[&str]) -> Option<usize> {
        self.children.iter().position(|node| match node {
            XmlNode::Element(element) => locals.contains(&element.local_name()),
            _ => false,
        })
    }

    pub fn insert_child(&mut self, index: usize, child: XmlElement) {
        let index = index.min(self.children.len());
        self.children.insert(index, XmlNode::Element(child));
    }

    /// All descendants with the given local name, outermost first. Matches are not
    /// descended into.
    pub fn find_all(&self, local: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        collect(self, local, &mut found);
        found
    }

    pub fn find_all_mut(&mut self, local: &str) -> Vec<&mut XmlElement> {
        let mut found = Vec::new();
        collect_mut(self, local, &mut found);
        found
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        append_text(self, &mut out);
        out
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }
}

impl XmlDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut nodes = Vec::new();

        loop {
            let event = reader.read_event().map_err(|error| {
                XmlError(format!("at byte {}: {error}", reader.buffer_position()))
            })?;

            match event {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut nodes, XmlNode::Element(element));
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError("closing tag without an open element".into()))?;
                    attach(&mut stack, &mut nodes, XmlNode::Element(element));
                }
                Event::Text(text) => {
                    let value =
                        text.unescape().map_err(|error| XmlError(error.to_string()))?.into_owned();
                    attach(&mut stack, &mut nodes, XmlNode::Text(value));
                }
                Event::Eof => break,
                other => attach(&mut stack, &mut nodes, XmlNode::Markup(other.into_owned())),
            }
        }

        if let Some(open) = stack.last() {
            return Err(XmlError(format!("element `{}` is never closed", open.name)));
        }

        Ok(Self { nodes })
    }

    pub fn from_root(root: XmlElement) -> Self {
        let declaration = quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), Some("yes"));
        Self {
            nodes: vec![
                XmlNode::Markup(Event::Decl(declaration).into_owned()),
                XmlNode::Text("\n".to_string()),
                XmlNode::Element(root),
            ],
        }
    }

    pub fn root(&self) -> Option<&XmlElement> {
        self.nodes.iter().find_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn root_mut(&mut self) -> Option<&mut XmlElement> {
        self.nodes.iter_mut().find_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        Ok(writer.into_inner())
    }
}

pub(crate) fn local_part(name: &str) -> &str {
    match name.rfind(':') {
        Some(index) => &name[index + 1..],
        None => name,
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|error| XmlError(error.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value =
            attribute.unescape_value().map_err(|error| XmlError(error.to_string()))?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement { name, attributes, children: Vec::new() })
}

fn attach(stack: &mut [XmlElement], nodes: &mut Vec<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => nodes.push(node),
    }
}

fn collect<'a>(element: &'a XmlElement, local: &str, found: &mut Vec<&'a XmlElement>) {
    for child in element.elements() {
        if child.is(local) {
            found.push(child);
        } else {
            collect(child, local, found);
        }
    }
}

fn collect_mut<'a>(element: &'a mut XmlElement, local: &str, found: &mut Vec<&'a mut XmlElement>) {
    for child in element.elements_mut() {
        if child.is(local) {
            found.push(child);
        } else {
            collect_mut(child, local, found);
        }
    }
}

fn append_text(element: &XmlElement, out: &mut String) {
    for node in &element.children {
        match node {
            XmlNode::Element(child) => append_text(child, out),
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Markup(_) => {}
        }
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), XmlError> {
    match node {
        XmlNode::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for (key, value) in &element.attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            if element.children.is_empty() {
                return emit(writer, Event::Empty(start));
            }
            emit(writer, Event::Start(start))?;
            for child in &element.children {
                write_node(writer, child)?;
            }
            emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
        }
        XmlNode::Text(text) => emit(writer, Event::Text(BytesText::new(text))),
        XmlNode::Markup(event) => emit(writer, event.clone()),
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer.write_event(event).map_err(|error| XmlError(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{XmlDocument, XmlElement};

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="urn:a" xmlns:p="urn:p"><!-- note --><p:cSld><a:p><a:r><a:rPr lang="ru-RU" sz="1200"/><a:t>Цена &amp; сроки</a:t></a:r></a:p></p:cSld></p:sld>"#;

    #[test]
    fn parse_then_write_preserves_markup_and_entities() {
        let document = XmlDocument::parse(SAMPLE.as_bytes()).expect("parse");
        let written = String::from_utf8(document.to_bytes().expect("write")).expect("utf8");

        assert!(written.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(written.contains("<!-- note -->"));
        assert!(written.contains("<a:t>Цена &amp; сроки</a:t>"));
        assert!(written.contains(r#"<a:rPr lang="ru-RU" sz="1200"/>"#));
    }

    #[test]
    fn find_all_matches_by_local_name_and_reads_text() {
        let document = XmlDocument::parse(SAMPLE.as_bytes()).expect("parse");
        let root = document.root().expect("root");

        let runs = root.find_all("r");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text(), "Цена & сроки");
        assert_eq!(runs[0].prefix(), "a:");
    }

    #[test]
    fn unclosed_element_is_rejected() {
        assert!(XmlDocument::parse(b"<a:p><a:r>").is_err());
    }

    #[test]
    fn set_attr_replaces_in_place_and_keeps_order() {
        let mut element = XmlElement::new("a:rPr").with_attr("lang", "ru-RU").with_attr("sz", "1200");
        element.set_attr("lang", "en-US");
        element.set_attr("b", "1");

        let keys: Vec<&str> = element.attributes.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["lang", "sz", "b"]);
        assert_eq!(element.attr("lang"), Some("en-US"));

        element.remove_attr("sz");
        assert_eq!(element.attr("sz"), None);
    }
}
