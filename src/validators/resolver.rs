//! COLLADA schema version resolution
//!
//! The schema a document is checked against is chosen from the namespace
//! declared on its `<COLLADA>` root. Extension schemas referenced through
//! `xsi:schemaLocation` are discovered separately.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::documents::Document;
use crate::error::{Error, Result};
use crate::namespaces::XSI_NAMESPACE;

/// Expected local name of the document root
pub const ROOT_ELEMENT: &str = "COLLADA";

/// COLLADA 1.4.1 namespace
pub const COLLADA_1_4_1_NAMESPACE: &str = "http://www.collada.org/2005/11/COLLADASchema";

/// COLLADA 1.5 namespace
pub const COLLADA_1_5_NAMESPACE: &str = "http://www.collada.org/2008/03/COLLADASchema";

/// A supported COLLADA schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    /// COLLADA 1.4.1
    V1_4_1,
    /// COLLADA 1.5.0
    V1_5,
}

impl SchemaVersion {
    /// All supported versions
    pub const ALL: [SchemaVersion; 2] = [SchemaVersion::V1_4_1, SchemaVersion::V1_5];

    /// Root namespace URI identifying this version
    pub fn namespace(&self) -> &'static str {
        match self {
            SchemaVersion::V1_4_1 => COLLADA_1_4_1_NAMESPACE,
            SchemaVersion::V1_5 => COLLADA_1_5_NAMESPACE,
        }
    }

    /// File name of the bundled schema
    pub fn schema_file_name(&self) -> &'static str {
        match self {
            SchemaVersion::V1_4_1 => "collada_schema_1_4_1.xsd",
            SchemaVersion::V1_5 => "collada_schema_1_5.xsd",
        }
    }

    /// Path of the bundled schema inside `schema_dir`
    pub fn schema_path(&self, schema_dir: &Path) -> PathBuf {
        schema_dir.join(self.schema_file_name())
    }

    /// Get the version as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V1_4_1 => "1.4.1",
            SchemaVersion::V1_5 => "1.5",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Namespace to version table, built once and never mutated
static VERSIONS: Lazy<IndexMap<&'static str, SchemaVersion>> = Lazy::new(|| {
    SchemaVersion::ALL
        .iter()
        .map(|version| (version.namespace(), *version))
        .collect()
});

/// Map a root namespace URI to the schema version it identifies
pub fn resolve_namespace(uri: &str) -> Result<SchemaVersion> {
    VERSIONS
        .get(uri)
        .copied()
        .ok_or_else(|| Error::UnrecognizedVersion(uri.to_string()))
}

/// Every schema URL named by an `xsi:schemaLocation` attribute.
///
/// Attribute values are whitespace separated (namespace, location) pairs;
/// only the locations are kept. A trailing unpaired token is ignored.
pub fn supplementary_schema_urls(doc: &Document) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();

    let values = doc
        .descendants()
        .filter_map(|e| e.get_attribute_ns(Some(XSI_NAMESPACE), "schemaLocation"));

    for value in values {
        let tokens: Vec<&str> = value.split_whitespace().collect();
        for pair in tokens.chunks_exact(2) {
            urls.insert(pair[1].to_string());
        }
    }

    urls
}

/// Directory containing the running executable.
///
/// Bundled schemas ship next to the binary, so this never consults the
/// current working directory.
pub fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::Resource(format!("executable path '{}' has no parent", exe.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_namespaces() {
        assert_eq!(
            resolve_namespace(COLLADA_1_4_1_NAMESPACE).unwrap(),
            SchemaVersion::V1_4_1
        );
        assert_eq!(
            resolve_namespace(COLLADA_1_5_NAMESPACE).unwrap(),
            SchemaVersion::V1_5
        );
        assert_eq!(
            SchemaVersion::V1_4_1.schema_path(Path::new("/opt/dae")),
            PathBuf::from("/opt/dae/collada_schema_1_4_1.xsd")
        );
    }

    #[test]
    fn test_unknown_namespace() {
        let err = resolve_namespace("http://www.collada.org/2004/COLLADASchema").unwrap_err();
        assert!(matches!(err, Error::UnrecognizedVersion(ref uri) if uri.contains("2004")));
    }

    #[test]
    fn test_schema_locations_are_deduplicated() {
        let xml = format!(
            r#"<COLLADA xmlns="{}" xmlns:xsi="{}">
  <a xsi:schemaLocation="urn:fx fx.xsd urn:phys phys.xsd"/>
  <b xsi:schemaLocation="urn:fx2   fx.xsd
      urn:dangling"/>
  <c schemaLocation="urn:not-xsi nope.xsd"/>
</COLLADA>"#,
            COLLADA_1_4_1_NAMESPACE, XSI_NAMESPACE
        );
        let doc = Document::from_string(&xml).unwrap();
        let urls: Vec<String> = supplementary_schema_urls(&doc).into_iter().collect();
        assert_eq!(urls, vec!["fx.xsd".to_string(), "phys.xsd".to_string()]);
    }

    #[test]
    fn test_executable_dir_exists() {
        let dir = executable_dir().unwrap();
        assert!(dir.is_dir());
    }
}
