//! # dae
//!
//! COLLADA (`.dae`) document validation and a typed animation model.
//!
//! ## Features
//!
//! - Schema validation against the bundled COLLADA 1.4.1 / 1.5 schema,
//!   selected from the root namespace
//! - Validation against extension schemas named by `xsi:schemaLocation`
//! - Document-wide `id` uniqueness checking
//! - Typed animation curves with single or double precision key data
//! - Protection against oversized or deeply nested input
//!
//! ## Example
//!
//! ```rust,ignore
//! use dae::{DaeValidator, Document, Limits};
//!
//! let doc = Document::from_file("scene.dae", &Limits::default())?;
//! let report = DaeValidator::new(&doc).check_all();
//! std::process::exit(report.exit_status());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and resource locations
pub mod namespaces;
pub mod locations;

// Resource loading
pub mod loaders;
pub mod documents;

// Validation
pub mod validators;

// Typed model
pub mod model;

// Re-exports for convenience
pub use documents::{Document, Element};
pub use error::{Error, Result, ValidationError};
pub use limits::Limits;
pub use locations::Location;
pub use model::{AnimationCurve, Entity, EntityId, InterpolationType, NumericArray, TypedArray};
pub use validators::{DaeValidator, Finding, FindingKind, Report, ResultCode, ValidatorOptions};

/// Version of the dae library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
