//! COLLADA document validation
//!
//! [`DaeValidator`] runs two independent checks over a parsed document:
//!
//! - **schema**: pick the COLLADA schema from the root namespace, validate
//!   against it, then validate against every extension schema named by an
//!   `xsi:schemaLocation` attribute;
//! - **unique ids**: every `id` attribute in the document is distinct.
//!
//! Both checks always run to completion so one invocation reports every
//! defect. Findings are logged as they are detected and returned in a
//! [`Report`].

use std::path::PathBuf;

use crate::documents::Document;
use crate::error::{Error, Result, ValidationError};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;

use super::identities::IdentifierIndex;
use super::report::{Finding, FindingKind, Report, ResultCode};
use super::resolver::{executable_dir, resolve_namespace, supplementary_schema_urls, ROOT_ELEMENT};
use super::schemas::{SchemaBackend, XsdBackend};

/// Validator configuration
#[derive(Debug, Clone, Default)]
pub struct ValidatorOptions {
    /// Directory holding the bundled COLLADA schemas (None = executable directory)
    pub schema_dir: Option<PathBuf>,
    /// Limits applied to every loaded schema
    pub limits: Limits,
    /// Whether remote schema URLs may be fetched
    pub allow_remote: bool,
}

impl ValidatorOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for bundled schemas in `dir`
    pub fn with_schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = Some(dir.into());
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether remote schemas may be fetched
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Loader configured from these options
    pub fn loader(&self) -> Loader {
        Loader::new()
            .with_limits(self.limits.clone())
            .with_allow_remote(self.allow_remote)
    }

    /// Directory the bundled schemas are read from
    pub fn resolve_schema_dir(&self) -> Result<PathBuf> {
        match &self.schema_dir {
            Some(dir) => Ok(dir.clone()),
            None => executable_dir(),
        }
    }
}

/// Result of checking a document against one schema
#[derive(Debug)]
enum SchemaOutcome {
    Valid,
    Invalid(Vec<ValidationError>),
    Unavailable(Error),
}

/// Validates one COLLADA document
#[derive(Debug)]
pub struct DaeValidator<'d, B = XsdBackend> {
    doc: &'d Document,
    backend: B,
    options: ValidatorOptions,
}

impl<'d> DaeValidator<'d, XsdBackend> {
    /// Create a validator with default options
    pub fn new(doc: &'d Document) -> Self {
        Self::with_options(doc, ValidatorOptions::default())
    }

    /// Create a validator using the built-in XSD backend
    pub fn with_options(doc: &'d Document, options: ValidatorOptions) -> Self {
        let backend = XsdBackend::new(options.loader(), options.limits.clone());
        Self::with_backend(doc, backend, options)
    }
}

impl<'d, B: SchemaBackend> DaeValidator<'d, B> {
    /// Create a validator using a custom schema backend
    pub fn with_backend(doc: &'d Document, backend: B, options: ValidatorOptions) -> Self {
        Self {
            doc,
            backend,
            options,
        }
    }

    /// The document being validated
    pub fn document(&self) -> &Document {
        self.doc
    }

    /// The schema backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The options in effect
    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Run the schema check and the identifier check
    pub fn check_all(&self) -> Report {
        let mut report = self.check_schema(None);
        report.merge(self.check_unique_ids());
        report
    }

    /// Validate against the schema selected by the root namespace and any
    /// extension schemas, or against `explicit` only when it is given.
    pub fn check_schema(&self, explicit: Option<&Location>) -> Report {
        let mut report = Report::new();

        if let Some(location) = explicit {
            match self.validate_against(location) {
                SchemaOutcome::Valid => {}
                SchemaOutcome::Invalid(errors) => self.record_violations(&mut report, location, errors),
                SchemaOutcome::Unavailable(err) => self.record_unloadable(&mut report, location, &err),
            }
            return report;
        }

        let Some(root) = self.doc.root() else {
            log::error!("Can't find document root");
            report.push(
                Finding::error(FindingKind::MissingRoot, "Can't find document root"),
                ResultCode::FAILURE,
            );
            return report;
        };

        if root.local_name() != ROOT_ELEMENT {
            log::error!("Root element is not <{}>", ROOT_ELEMENT);
            report.push(
                Finding::error(
                    FindingKind::UnexpectedRoot {
                        found: root.local_name().to_string(),
                    },
                    format!("Root element is not <{}>", ROOT_ELEMENT),
                )
                .with_line(root.line),
                ResultCode::FAILURE,
            );
            return report;
        }

        let Some(namespace) = root.namespace() else {
            log::error!("{} element has no namespace", ROOT_ELEMENT);
            report.push(
                Finding::error(
                    FindingKind::MissingNamespace,
                    format!("{} element has no namespace", ROOT_ELEMENT),
                )
                .with_line(root.line),
                ResultCode::FAILURE,
            );
            return report;
        };

        let version = match resolve_namespace(namespace) {
            Ok(version) => version,
            Err(_) => {
                log::error!("Can't determine COLLADA version used by input file");
                report.push(
                    Finding::error(
                        FindingKind::UnrecognizedVersion {
                            namespace: namespace.to_string(),
                        },
                        format!(
                            "Can't determine COLLADA version used by input file (namespace \"{}\")",
                            namespace
                        ),
                    )
                    .with_line(root.line),
                    ResultCode::FAILURE,
                );
                return report;
            }
        };
        log::debug!("{}: COLLADA {}", self.doc.display_uri(), version);

        match self.options.resolve_schema_dir() {
            Ok(dir) => {
                let primary = Location::Path(version.schema_path(&dir));
                match self.validate_against(&primary) {
                    SchemaOutcome::Valid => {}
                    SchemaOutcome::Invalid(errors) => self.record_violations(&mut report, &primary, errors),
                    SchemaOutcome::Unavailable(err) => self.record_unloadable(&mut report, &primary, &err),
                }
            }
            Err(err) => {
                let schema = version.schema_file_name();
                log::error!("Error loading {}: {}", schema, err);
                report.push(
                    Finding::error(
                        FindingKind::SchemaUnavailable {
                            schema: schema.to_string(),
                        },
                        format!("Error loading {}: {}", schema, err),
                    ),
                    ResultCode::FAILURE | ResultCode::SCHEMA_UNAVAILABLE,
                );
            }
        }

        for url in supplementary_schema_urls(self.doc) {
            let outcome = Location::resolve(&url, self.doc.base_dir.as_deref())
                .map(|location| (self.validate_against(&location), location));

            match outcome {
                Ok((SchemaOutcome::Valid, _)) => {}
                Ok((SchemaOutcome::Invalid(errors), location)) => {
                    self.record_violations(&mut report, &location, errors)
                }
                Ok((SchemaOutcome::Unavailable(err), _)) => self.record_advisory(&mut report, &url, &err),
                Err(err) => self.record_advisory(&mut report, &url, &err),
            }
        }

        report
    }

    /// Check that every `id` attribute in the document is unique
    pub fn check_unique_ids(&self) -> Report {
        let mut report = Report::new();
        let (index, duplicates) = IdentifierIndex::scan(self.doc);
        log::debug!("{}: {} distinct ids", self.doc.display_uri(), index.len());

        for duplicate in duplicates {
            let message = format!(
                "{}:{}: Duplicated id \"{}\". See first declaration at line {}.",
                self.doc.display_uri(),
                duplicate.line,
                duplicate.id,
                duplicate.first_line
            );
            log::error!("{}", message);
            report.push(
                Finding::error(
                    FindingKind::DuplicateId {
                        id: duplicate.id,
                        first_line: duplicate.first_line,
                    },
                    message,
                )
                .with_line(duplicate.line),
                ResultCode::FAILURE,
            );
        }

        report
    }

    fn validate_against(&self, location: &Location) -> SchemaOutcome {
        log::info!("Validating against {}", location);

        let schema = match self.backend.load_schema(location) {
            Ok(schema) => schema,
            Err(err) => return SchemaOutcome::Unavailable(err),
        };

        let errors = self.backend.validate(self.doc, &schema);
        if errors.is_empty() {
            SchemaOutcome::Valid
        } else {
            SchemaOutcome::Invalid(errors)
        }
    }

    fn record_violations(&self, report: &mut Report, location: &Location, errors: Vec<ValidationError>) {
        for error in errors {
            let message = match error.line {
                Some(line) => format!("{}:{}: {}", self.doc.display_uri(), line, error.message),
                None => format!("{}: {}", self.doc.display_uri(), error.message),
            };
            log::error!("{}", message);

            let mut finding = Finding::error(
                FindingKind::SchemaViolation {
                    schema: location.to_string(),
                },
                message,
            );
            if let Some(line) = error.line {
                finding = finding.with_line(line);
            }
            if let Some(path) = error.path {
                finding = finding.with_path(path);
            }
            report.push(finding, ResultCode::FAILURE);
        }
    }

    /// A schema the caller depends on could not be loaded
    fn record_unloadable(&self, report: &mut Report, location: &Location, err: &Error) {
        log::error!("Error loading {}: {}", location, err);
        report.push(
            Finding::error(
                FindingKind::SchemaUnavailable {
                    schema: location.to_string(),
                },
                format!("Error loading {}: {}", location, err),
            ),
            ResultCode::FAILURE | ResultCode::SCHEMA_UNAVAILABLE,
        );
    }

    /// An extension schema could not be loaded; the rest still counts
    fn record_advisory(&self, report: &mut Report, url: &str, err: &Error) {
        log::warn!(
            "Warning: can't load \"{}\" ({}). Some parts of the document will not be validated.",
            url,
            err
        );
        report.push(
            Finding::warning(
                FindingKind::SchemaUnavailable {
                    schema: url.to_string(),
                },
                format!(
                    "can't load \"{}\". Some parts of the document will not be validated.",
                    url
                ),
            ),
            ResultCode::SCHEMA_UNAVAILABLE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::resolver::{COLLADA_1_4_1_NAMESPACE, COLLADA_1_5_NAMESPACE};
    use std::cell::RefCell;

    /// Backend that serves every schema from memory and records what was asked for
    #[derive(Default)]
    struct RecordingBackend {
        missing: Vec<String>,
        failing: Vec<String>,
        loaded: RefCell<Vec<String>>,
    }

    impl SchemaBackend for RecordingBackend {
        type Schema = String;

        fn load_schema(&self, location: &Location) -> Result<String> {
            let name = location.to_string();
            self.loaded.borrow_mut().push(name.clone());
            if self.missing.iter().any(|m| name.ends_with(m.as_str())) {
                return Err(Error::Resource(format!("no such schema {}", name)));
            }
            Ok(name)
        }

        fn validate(&self, _doc: &Document, schema: &String) -> Vec<ValidationError> {
            if self.failing.iter().any(|f| schema.ends_with(f.as_str())) {
                vec![ValidationError::new("not valid").with_line(1)]
            } else {
                Vec::new()
            }
        }
    }

    fn options() -> ValidatorOptions {
        ValidatorOptions::new().with_schema_dir("/schemas")
    }

    fn doc(xml: &str) -> Document {
        Document::from_string(xml).unwrap()
    }

    #[test]
    fn test_primary_schema_selected_by_namespace() {
        let backend = RecordingBackend::default();
        let d = doc(&format!(r#"<COLLADA xmlns="{}"/>"#, COLLADA_1_5_NAMESPACE));
        let validator = DaeValidator::with_backend(&d, backend, options());

        let report = validator.check_schema(None);
        assert!(report.is_success());
        assert_eq!(
            *validator.backend.loaded.borrow(),
            vec!["/schemas/collada_schema_1_5.xsd".to_string()]
        );
    }

    #[test]
    fn test_structural_failures_stop_schema_check() {
        let cases = [
            ("", "missing root"),
            ("<scene/>", "wrong root"),
            ("<COLLADA/>", "no namespace"),
            (r#"<COLLADA xmlns="urn:collada:2020"/>"#, "unknown version"),
        ];

        for (xml, label) in cases {
            let d = doc(xml);
            let validator = DaeValidator::with_backend(&d, RecordingBackend::default(), options());
            let report = validator.check_schema(None);
            assert_eq!(report.code(), ResultCode::FAILURE, "{}", label);
            assert!(validator.backend.loaded.borrow().is_empty(), "{}", label);
        }
    }

    #[test]
    fn test_unrecognized_version_is_distinct() {
        let d = doc(r#"<COLLADA xmlns="urn:collada:2020"/>"#);
        let validator = DaeValidator::with_backend(&d, RecordingBackend::default(), options());
        let report = validator.check_schema(None);

        assert!(matches!(
            report.findings()[0].kind,
            FindingKind::UnrecognizedVersion { ref namespace } if namespace == "urn:collada:2020"
        ));
    }

    #[test]
    fn test_explicit_schema_only() {
        let d = doc(&format!(
            r#"<COLLADA xmlns="{}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                xsi:schemaLocation="urn:fx /ext/fx.xsd"/>"#,
            COLLADA_1_4_1_NAMESPACE
        ));
        let validator = DaeValidator::with_backend(&d, RecordingBackend::default(), options());
        let explicit = Location::Path("/custom/my.xsd".into());

        let report = validator.check_schema(Some(&explicit));
        assert!(report.is_success());
        assert_eq!(*validator.backend.loaded.borrow(), vec!["/custom/my.xsd".to_string()]);
    }

    #[test]
    fn test_explicit_schema_unloadable_is_failure() {
        let backend = RecordingBackend {
            missing: vec!["my.xsd".into()],
            ..Default::default()
        };
        let d = doc("<anything/>");
        let validator = DaeValidator::with_backend(&d, backend, options());
        let report = validator.check_schema(Some(&Location::Path("/custom/my.xsd".into())));

        assert!(!report.is_success());
        assert!(report.code().contains(ResultCode::SCHEMA_UNAVAILABLE));
    }

    #[test]
    fn test_supplementary_unavailable_is_advisory() {
        let backend = RecordingBackend {
            missing: vec!["fx.xsd".into()],
            ..Default::default()
        };
        let d = doc(&format!(
            r#"<COLLADA xmlns="{}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <a xsi:schemaLocation="urn:fx /ext/fx.xsd"/>
  <b xsi:schemaLocation="urn:fx /ext/fx.xsd"/>
</COLLADA>"#,
            COLLADA_1_4_1_NAMESPACE
        ));
        let validator = DaeValidator::with_backend(&d, backend, options());
        let report = validator.check_schema(None);

        assert!(report.is_success());
        assert_eq!(report.code(), ResultCode::SCHEMA_UNAVAILABLE);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(validator.backend.loaded.borrow().len(), 2);
    }

    #[test]
    fn test_supplementary_violation_fails() {
        let backend = RecordingBackend {
            failing: vec!["fx.xsd".into()],
            ..Default::default()
        };
        let d = doc(&format!(
            r#"<COLLADA xmlns="{}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="urn:fx /ext/fx.xsd"/>"#,
            COLLADA_1_4_1_NAMESPACE
        ));
        let validator = DaeValidator::with_backend(&d, backend, options());
        let report = validator.check_schema(None);

        assert_eq!(report.code(), ResultCode::FAILURE);
        assert!(matches!(
            report.findings()[0].kind,
            FindingKind::SchemaViolation { ref schema } if schema == "/ext/fx.xsd"
        ));
    }

    #[test]
    fn test_check_all_runs_both_checks() {
        let backend = RecordingBackend {
            failing: vec!["collada_schema_1_4_1.xsd".into()],
            ..Default::default()
        };
        let d = doc(&format!(
            "<COLLADA xmlns=\"{}\">\n<a id=\"x\"/>\n<b id=\"x\"/>\n</COLLADA>",
            COLLADA_1_4_1_NAMESPACE
        ));
        let validator = DaeValidator::with_backend(&d, backend, options());
        let report = validator.check_all();

        assert_eq!(report.code(), ResultCode::FAILURE);
        let kinds: Vec<_> = report.findings().iter().map(|f| &f.kind).collect();
        assert!(matches!(kinds[0], FindingKind::SchemaViolation { .. }));
        assert!(matches!(kinds[1], FindingKind::DuplicateId { first_line: 2, .. }));
    }
}
