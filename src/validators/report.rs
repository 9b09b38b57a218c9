//! Validation results
//!
//! A check produces a [`ResultCode`] bitmask for callers that only need a
//! verdict, plus the individual [`Finding`]s for callers that want to know
//! what went wrong and where.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;

/// Pass/fail/warn bitmask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResultCode(u8);

impl ResultCode {
    /// Nothing to report
    pub const SUCCESS: ResultCode = ResultCode(0);
    /// Schema or identifier failure; both checks share this bit
    pub const FAILURE: ResultCode = ResultCode(1);
    /// A schema could not be loaded
    pub const SCHEMA_UNAVAILABLE: ResultCode = ResultCode(2);

    /// Raw bits
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Check if every bit of `other` is set
    pub fn contains(self, other: ResultCode) -> bool {
        self.0 & other.0 == other.0
    }

    /// True unless the failure bit is set
    pub fn is_success(self) -> bool {
        !self.contains(ResultCode::FAILURE)
    }

    /// Process exit status: 0 unless the failure bit is set, otherwise the raw bits
    pub fn exit_status(self) -> i32 {
        if self.is_success() {
            0
        } else {
            i32::from(self.0)
        }
    }
}

impl BitOr for ResultCode {
    type Output = ResultCode;

    fn bitor(self, rhs: ResultCode) -> ResultCode {
        ResultCode(self.0 | rhs.0)
    }
}

impl BitOrAssign for ResultCode {
    fn bitor_assign(&mut self, rhs: ResultCode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails the document
    Error,
    /// Advisory only; does not change the verdict
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// What a finding is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FindingKind {
    /// The document has no root element
    MissingRoot,
    /// The root element is not `<COLLADA>`
    UnexpectedRoot {
        /// Name actually found
        found: String,
    },
    /// The root element declares no namespace
    MissingNamespace,
    /// The root namespace names no known COLLADA version
    UnrecognizedVersion {
        /// Namespace found on the root
        namespace: String,
    },
    /// A schema could not be loaded
    SchemaUnavailable {
        /// Schema location
        schema: String,
    },
    /// The document does not conform to a schema
    SchemaViolation {
        /// Schema location
        schema: String,
    },
    /// An identifier is declared more than once
    DuplicateId {
        /// The repeated identifier
        id: String,
        /// Line of the first declaration
        first_line: usize,
    },
}

/// One diagnostic produced by a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// What the finding is about
    pub kind: FindingKind,
    /// Error or warning
    pub severity: Severity,
    /// Source line, when the finding points at an element
    pub line: Option<usize>,
    /// Element path, when the finding points at an element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl Finding {
    /// Create an error finding
    pub fn error(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            line: None,
            path: None,
            message: message.into(),
        }
    }

    /// Create a warning finding
    pub fn warning(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            line: None,
            path: None,
            message: message.into(),
        }
    }

    /// Set the source line
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the element path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Outcome of one or more checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    code: ResultCode,
    findings: Vec<Finding>,
}

impl Report {
    /// Create an empty, passing report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding and the bits it contributes
    pub fn push(&mut self, finding: Finding, code: ResultCode) {
        self.code |= code;
        self.findings.push(finding);
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: Report) {
        self.code |= other.code;
        self.findings.extend(other.findings);
    }

    /// Combined bitmask
    pub fn code(&self) -> ResultCode {
        self.code
    }

    /// All findings in detection order
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// True unless the failure bit is set
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Findings with error severity
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    /// Findings with warning severity
    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    /// Check if any advisory was raised
    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// Process exit status for this report
    pub fn exit_status(&self) -> i32 {
        self.code.exit_status()
    }
}
