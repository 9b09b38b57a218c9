//! Document-wide identifier uniqueness
//!
//! Every `id` attribute in a COLLADA document must be unique across the
//! whole document, not just within one element type. The index keeps the
//! first declaration of each identifier; later declarations are rejected
//! and reported against it.

use std::collections::BTreeMap;

use crate::documents::Document;

/// Attribute carrying element identifiers
pub const ID_ATTRIBUTE: &str = "id";

/// A rejected identifier declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateId {
    /// The repeated identifier
    pub id: String,
    /// Line of the rejected declaration
    pub line: usize,
    /// Line of the declaration that stays canonical
    pub first_line: usize,
}

/// Ordered index of (identifier, first line) pairs
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    entries: BTreeMap<String, usize>,
}

impl IdentifierIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from every element carrying an `id` attribute.
    ///
    /// Elements are visited in document order and every duplicate is
    /// returned, not only the first one.
    pub fn scan(doc: &Document) -> (Self, Vec<DuplicateId>) {
        let mut index = Self::new();
        let mut duplicates = Vec::new();

        for element in doc.descendants() {
            let Some(id) = element.get_attribute_ns(None, ID_ATTRIBUTE) else {
                continue;
            };
            log::trace!("id \"{}\" at line {}", id, element.line);

            if let Err(first_line) = index.insert(id, element.line) {
                duplicates.push(DuplicateId {
                    id: id.to_string(),
                    line: element.line,
                    first_line,
                });
            }
        }

        (index, duplicates)
    }

    /// Record `id` as declared at `line`.
    ///
    /// A duplicate is rejected with the line of the original declaration,
    /// which is left untouched.
    pub fn insert(&mut self, id: &str, line: usize) -> Result<(), usize> {
        if let Some(&first_line) = self.entries.get(id) {
            return Err(first_line);
        }
        self.entries.insert(id.to_string(), line);
        Ok(())
    }

    /// Line of the first declaration of `id`
    pub fn first_line(&self, id: &str) -> Option<usize> {
        self.entries.get(id).copied()
    }

    /// Check if an identifier is declared
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Iterate over (identifier, first line) in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(id, line)| (id.as_str(), *line))
    }

    /// Get the number of distinct identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_declaration() {
        let mut index = IdentifierIndex::new();

        assert!(index.insert("mesh1", 10).is_ok());
        assert!(index.insert("mesh2", 12).is_ok());
        assert_eq!(index.insert("mesh1", 40), Err(10));
        assert_eq!(index.insert("mesh1", 55), Err(10));

        assert_eq!(index.first_line("mesh1"), Some(10));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_scan_reports_every_duplicate() {
        let xml = "<COLLADA>\n<a id=\"x\"/>\n<b id=\"y\"/>\n<c id=\"x\"/>\n<d id=\"x\"/>\n<e id=\"y\"/>\n</COLLADA>";
        let doc = Document::from_string(xml).unwrap();
        let (index, duplicates) = IdentifierIndex::scan(&doc);

        assert_eq!(index.len(), 2);
        let cited: Vec<(usize, usize)> = duplicates.iter().map(|d| (d.line, d.first_line)).collect();
        assert_eq!(cited, vec![(4, 2), (5, 2), (6, 3)]);
    }

    #[test]
    fn test_scan_ignores_namespaced_id_attributes() {
        let xml = r#"<COLLADA xmlns:x="urn:x"><a id="n"/><b x:id="n"/></COLLADA>"#;
        let doc = Document::from_string(xml).unwrap();
        let (index, duplicates) = IdentifierIndex::scan(&doc);

        assert_eq!(index.len(), 1);
        assert!(duplicates.is_empty());
    }

    #[test]
    fn test_iter_is_ordered_by_identifier() {
        let mut index = IdentifierIndex::new();
        index.insert("b", 1).unwrap();
        index.insert("a", 2).unwrap();

        let ids: Vec<_> = index.iter().collect();
        assert_eq!(ids, vec![("a", 2), ("b", 1)]);
    }
}
