//! XML namespace handling
//!
//! Qualified names and the prefix scopes used to resolve them while a
//! document is being parsed.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace (`xsi:schemaLocation`, `xsi:type`, ...)
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// The implicit `xml:` prefix namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// True if this name is `local_name` in namespace `namespace`
    pub fn is(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == namespace
    }
}

impl fmt::Display for QName {
    /// Clark notation: `{namespace}local`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Namespace declarations in scope at one element
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self {
            prefixes: HashMap::new(),
            default_namespace: None,
        }
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace. An empty URI undeclares it.
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        self.default_namespace = Some(namespace.into());
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Number of declarations made in this context
    pub fn len(&self) -> usize {
        self.prefixes.len() + usize::from(self.default_namespace.is_some())
    }

    /// True if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over prefixed declarations
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.prefixes.iter()
    }

    /// Overlay `inner` declarations on top of this scope
    pub fn extended(&self, inner: &NamespaceContext) -> NamespaceContext {
        let mut scope = self.clone();
        for (prefix, uri) in &inner.prefixes {
            scope.prefixes.insert(prefix.clone(), uri.clone());
        }
        if inner.default_namespace.is_some() {
            scope.default_namespace = inner.default_namespace.clone();
        }
        scope
    }

    /// Resolve an element name; unprefixed names take the default namespace
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            let namespace = self
                .get_namespace(prefix)
                .ok_or_else(|| Error::Namespace(format!("Unknown prefix: {}", prefix)))?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::new(self.get_default_namespace(), prefixed_name))
        }
    }

    /// Resolve an attribute name; unprefixed attributes are in no namespace
    pub fn resolve_attribute(&self, prefixed_name: &str) -> Result<QName> {
        if prefixed_name.contains(':') {
            self.resolve(prefixed_name)
        } else {
            Ok(QName::local(prefixed_name))
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_qname_is() {
        let qname = QName::namespaced(XSI_NAMESPACE, "schemaLocation");
        assert!(qname.is(Some(XSI_NAMESPACE), "schemaLocation"));
        assert!(!qname.is(None, "schemaLocation"));
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);

        let qname = ctx.resolve("xs:element").unwrap();
        assert_eq!(qname.namespace.as_deref(), Some(XSD_NAMESPACE));
        assert_eq!(qname.local_name, "element");
        assert!(ctx.resolve("zz:element").is_err());
    }

    #[test]
    fn test_attributes_ignore_default_namespace() {
        let mut ctx = NamespaceContext::new();
        ctx.set_default_namespace("http://example.com");

        assert_eq!(ctx.resolve_attribute("id").unwrap(), QName::local("id"));
        assert_eq!(
            ctx.resolve("node").unwrap(),
            QName::namespaced("http://example.com", "node")
        );
    }

    #[test]
    fn test_extended_scope_shadows_outer() {
        let mut outer = NamespaceContext::new();
        outer.set_default_namespace("urn:outer");
        outer.add_prefix("a", "urn:a");

        let mut inner = NamespaceContext::new();
        inner.add_prefix("a", "urn:a2");

        let scope = outer.extended(&inner);
        assert_eq!(scope.get_default_namespace(), Some("urn:outer"));
        assert_eq!(scope.get_namespace("a"), Some("urn:a2"));

        let mut undeclare = NamespaceContext::new();
        undeclare.set_default_namespace("");
        let scope = scope.extended(&undeclare);
        assert!(scope.get_default_namespace().is_none());
        assert_eq!(scope.resolve("node").unwrap(), QName::local("node"));
    }
}
