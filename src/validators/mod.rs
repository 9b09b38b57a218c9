//! COLLADA validators
//!
//! This module contains the document checks and the pieces they are built
//! from: schema version resolution, the schema backend seam with its content
//! model matcher, the identifier index and the result types.

pub mod identities;
pub mod particles;
pub mod report;
pub mod resolver;
pub mod schemas;
pub mod validation;

// Re-exports
pub use identities::{DuplicateId, IdentifierIndex, ID_ATTRIBUTE};
pub use report::{Finding, FindingKind, Report, ResultCode, Severity};
pub use resolver::{
    executable_dir, resolve_namespace, supplementary_schema_urls, SchemaVersion,
    COLLADA_1_4_1_NAMESPACE, COLLADA_1_5_NAMESPACE, ROOT_ELEMENT,
};
pub use schemas::{SchemaBackend, XsdBackend, XsdSchema};
pub use validation::{DaeValidator, ValidatorOptions};
