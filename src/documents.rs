//! XML document handling
//!
//! Documents are parsed with quick-xml into an owned element tree. Every
//! element remembers the source line of its start tag, and element and
//! attribute names are resolved against the namespace declarations in scope
//! at the point they appear.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use crate::namespaces::{NamespaceContext, QName};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};

/// XML Element in the document tree
#[derive(Debug, Clone)]
pub struct Element {
    /// Element qualified name
    pub qname: QName,
    /// Prefix used in the source, if any
    pub prefix: Option<String>,
    /// Element attributes, in source order
    pub attributes: IndexMap<QName, String>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace declarations made on this element
    pub namespaces: NamespaceContext,
    /// 1-based line of the start tag
    pub line: usize,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            prefix: None,
            attributes: IndexMap::new(),
            text: None,
            children: Vec::new(),
            namespaces: NamespaceContext::new(),
            line: 0,
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Get an attribute value by local name, in any namespace
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(qname, _)| qname.local_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Get an attribute value by namespace and local name
    pub fn get_attribute_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(qname, _)| qname.is(namespace, local_name))
            .map(|(_, value)| value.as_str())
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append text content
    pub fn push_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// This element and all of its descendants in document order
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order iterator over an element subtree
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// XML Document representation
#[derive(Debug, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
    /// Where the document came from, used in diagnostics
    pub uri: Option<String>,
    /// Directory relative schema references are resolved against
    pub base_dir: Option<PathBuf>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Load and parse a document from disk
    pub fn from_file(path: impl AsRef<Path>, limits: &Limits) -> Result<Self> {
        let path = path.as_ref();
        let loader = Loader::new().with_limits(limits.clone());
        let content = loader.load(&Location::Path(path.to_path_buf()))?;

        let mut doc = Self::parse_with_limits(&content, limits)?;
        doc.uri = Some(path.display().to_string());
        doc.base_dir = path.parent().map(Path::to_path_buf);
        Ok(doc)
    }

    /// Set the URI reported in diagnostics
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the directory relative references resolve against
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Parse an XML document, enforcing `limits`
    pub fn parse_with_limits(xml: &str, limits: &Limits) -> Result<Self> {
        limits.check_document_size(xml.len())?;

        let bytes = xml.as_bytes();
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut doc = Document::new();
        let mut element_stack: Vec<(Element, NamespaceContext)> = Vec::new();
        let mut lines = LineCounter::default();
        let mut buf = Vec::new();

        loop {
            let before = reader.buffer_position();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    limits.check_depth(element_stack.len() + 1)?;
                    let line = lines.line_of_tag(bytes, before);
                    let parent_scope = element_stack.last().map(|(_, scope)| scope);
                    let (element, scope) = Self::parse_element(&e, parent_scope, line, limits)?;
                    element_stack.push((element, scope));
                }
                Ok(Event::End(_)) => {
                    if let Some((current, _)) = element_stack.pop() {
                        if let Some((parent, _)) = element_stack.last_mut() {
                            parent.add_child(current);
                        } else {
                            doc.set_root(current)?;
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    limits.check_depth(element_stack.len() + 1)?;
                    let line = lines.line_of_tag(bytes, before);
                    let parent_scope = element_stack.last().map(|(_, scope)| scope);
                    let (element, _) = Self::parse_element(&e, parent_scope, line, limits)?;
                    if let Some((parent, _)) = element_stack.last_mut() {
                        parent.add_child(element);
                    } else {
                        doc.set_root(element)?;
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some((current, _)) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                        if !text.trim().is_empty() {
                            current.push_text(&text);
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some((current, _)) = element_stack.last_mut() {
                        current.push_text(&String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // Ignore other events (comments, processing instructions, etc.)
            }
            buf.clear();
        }

        if let Some((open, _)) = element_stack.last() {
            return Err(Error::Xml(format!(
                "Unexpected end of document: <{}> opened at line {} is never closed",
                open.local_name(),
                open.line
            )));
        }

        Ok(doc)
    }

    fn set_root(&mut self, element: Element) -> Result<()> {
        if let Some(existing) = &self.root {
            return Err(Error::Xml(format!(
                "Second root element <{}> at line {} (document root is <{}>)",
                element.local_name(),
                element.line,
                existing.local_name()
            )));
        }
        self.root = Some(element);
        Ok(())
    }

    /// Parse element from BytesStart event, returning it with its in-scope namespaces
    fn parse_element(
        start: &BytesStart,
        parent_scope: Option<&NamespaceContext>,
        line: usize,
        limits: &Limits,
    ) -> Result<(Element, NamespaceContext)> {
        let name_bytes = start.name();
        let name = std::str::from_utf8(name_bytes.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut declared = NamespaceContext::new();
        let mut raw_attributes: Vec<(String, String)> = Vec::new();

        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
                .to_string();

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            // Handle namespace declarations
            if attr_name == "xmlns" {
                declared.set_default_namespace(attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                declared.add_prefix(prefix, attr_value);
            } else {
                raw_attributes.push((attr_name, attr_value));
            }
        }
        limits.check_attributes(raw_attributes.len())?;

        let scope = match parent_scope {
            Some(parent) => parent.extended(&declared),
            None => declared.clone(),
        };

        let qname = scope
            .resolve(&name)
            .map_err(|e| Error::Xml(format!("line {}: {}", line, e)))?;

        let mut element = Element::new(qname);
        element.prefix = name.split_once(':').map(|(prefix, _)| prefix.to_string());
        element.namespaces = declared;
        element.line = line;

        for (attr_name, attr_value) in raw_attributes {
            let attr_qname = scope
                .resolve_attribute(&attr_name)
                .map_err(|e| Error::Xml(format!("line {}: {}", line, e)))?;
            if element.attributes.insert(attr_qname, attr_value).is_some() {
                return Err(Error::Xml(format!(
                    "line {}: duplicate attribute '{}' on <{}>",
                    line, attr_name, name
                )));
            }
        }

        Ok((element, scope))
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Every element in document order
    pub fn descendants(&self) -> impl Iterator<Item = &Element> {
        self.root.iter().flat_map(|root| root.descendants())
    }

    /// Every element matching `predicate`, in document order
    pub fn select<P>(&self, predicate: P) -> Vec<&Element>
    where
        P: Fn(&Element) -> bool,
    {
        self.descendants().filter(|e| predicate(e)).collect()
    }

    /// Name used for this document in diagnostics
    pub fn display_uri(&self) -> &str {
        self.uri.as_deref().unwrap_or("<memory>")
    }
}

/// Incremental byte offset to line number conversion
#[derive(Debug)]
struct LineCounter {
    offset: usize,
    line: usize,
}

impl Default for LineCounter {
    fn default() -> Self {
        Self { offset: 0, line: 1 }
    }
}

impl LineCounter {
    /// Line of the first `<` at or after `from`
    fn line_of_tag(&mut self, input: &[u8], from: usize) -> usize {
        let start = input[from..]
            .iter()
            .position(|&b| b == b'<')
            .map_or(from, |p| from + p);
        self.line_at(input, start)
    }

    fn line_at(&mut self, input: &[u8], offset: usize) -> usize {
        if offset > self.offset {
            self.line += input[self.offset..offset]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.offset = offset;
        }
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::XSI_NAMESPACE;

    #[test]
    fn test_document_creation() {
        let doc = Document::new();
        assert!(doc.root.is_none());
        assert_eq!(doc.display_uri(), "<memory>");
    }

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].local_name(), "child");
        assert_eq!(root.children[0].text.as_deref(), Some("text"));
    }

    #[test]
    fn test_parse_with_attributes() {
        let xml = r#"<root attr1="value1" attr2="value2"><child/></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.get_attribute("attr1"), Some("value1"));
        assert_eq!(root.get_attribute("attr2"), Some("value2"));
        let names: Vec<_> = root.attributes.keys().map(|q| q.local_name.as_str()).collect();
        assert_eq!(names, ["attr1", "attr2"]);
    }

    #[test]
    fn test_namespaces_resolved_in_scope() {
        let xml = r#"<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <extra xsi:schemaLocation="urn:a a.xsd" id="x">
    <ext:thing xmlns:ext="urn:ext"/>
  </extra>
</COLLADA>"#;
        let doc = Document::from_string(xml).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.namespace(), Some("http://www.collada.org/2005/11/COLLADASchema"));

        let extra = &root.children[0];
        assert_eq!(extra.namespace(), root.namespace());
        assert_eq!(
            extra.get_attribute_ns(Some(XSI_NAMESPACE), "schemaLocation"),
            Some("urn:a a.xsd")
        );
        assert_eq!(extra.get_attribute_ns(None, "id"), Some("x"));

        let thing = &extra.children[0];
        assert_eq!(thing.namespace(), Some("urn:ext"));
        assert_eq!(thing.prefix.as_deref(), Some("ext"));
    }

    #[test]
    fn test_unknown_prefix_is_error() {
        let result = Document::from_string("<a:root/>");
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_line_numbers() {
        let xml = "<?xml version=\"1.0\"?>\n<root>\n  <a/>\n\n  <b>\n    <c>text</c>\n  </b>\n</root>\n";
        let doc = Document::from_string(xml).unwrap();
        let lines: Vec<(String, usize)> = doc
            .descendants()
            .map(|e| (e.local_name().to_string(), e.line))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("root".to_string(), 2),
                ("a".to_string(), 3),
                ("b".to_string(), 5),
                ("c".to_string(), 6),
            ]
        );
    }

    #[test]
    fn test_select_in_document_order() {
        let xml = r#"<root id="r"><a id="1"><b id="2"/></a><c/><d id="3"/></root>"#;
        let doc = Document::from_string(xml).unwrap();
        let ids: Vec<_> = doc
            .select(|e| e.get_attribute_ns(None, "id").is_some())
            .iter()
            .map(|e| e.get_attribute("id").unwrap())
            .collect();
        assert_eq!(ids, ["r", "1", "2", "3"]);
    }

    #[test]
    fn test_attribute_lookup_by_namespace() {
        let xml = r#"<root xmlns:x="urn:x" id="plain" x:id="qualified"/>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.get_attribute_ns(None, "id"), Some("plain"));
        assert_eq!(root.get_attribute_ns(Some("urn:x"), "id"), Some("qualified"));
        assert_eq!(root.get_attribute("id"), Some("plain"));
    }

    #[test]
    fn test_unclosed_document_is_error() {
        assert!(Document::from_string("<root><child>").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_depth: 2,
            ..Limits::default()
        };
        let result = Document::parse_with_limits("<a><b><c/></b></a>", &limits);
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_empty_input_has_no_root() {
        let doc = Document::from_string("").unwrap();
        assert!(doc.root().is_none());
    }
}
