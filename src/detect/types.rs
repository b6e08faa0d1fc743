//! Core types for detection results.

use serde::{Deserialize, Serialize};

use crate::analysis::Location;

/// Severity levels for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Kinds of policy violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ImmutableClassViolation,
    MissingNullityAnnotation,
    UnnecessaryNullityAnnotation,
    NonFinalParameter,
    BlacklistedMethod,
    BlacklistedConstructor,
    BlacklistedAnnotation,
    BlacklistedBaseClass,
    ConfigError,
}

impl IssueKind {
    pub const ALL: [IssueKind; 9] = [
        IssueKind::ImmutableClassViolation,
        IssueKind::MissingNullityAnnotation,
        IssueKind::UnnecessaryNullityAnnotation,
        IssueKind::NonFinalParameter,
        IssueKind::BlacklistedMethod,
        IssueKind::BlacklistedConstructor,
        IssueKind::BlacklistedAnnotation,
        IssueKind::BlacklistedBaseClass,
        IssueKind::ConfigError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::ImmutableClassViolation => "immutable_class_violation",
            IssueKind::MissingNullityAnnotation => "missing_nullity_annotation",
            IssueKind::UnnecessaryNullityAnnotation => "unnecessary_nullity_annotation",
            IssueKind::NonFinalParameter => "non_final_parameter",
            IssueKind::BlacklistedMethod => "blacklisted_method",
            IssueKind::BlacklistedConstructor => "blacklisted_constructor",
            IssueKind::BlacklistedAnnotation => "blacklisted_annotation",
            IssueKind::BlacklistedBaseClass => "blacklisted_base_class",
            IssueKind::ConfigError => "config_error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        IssueKind::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Severity a diagnostic of this kind is reported with.
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::UnnecessaryNullityAnnotation => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// One-line description, used for SARIF rule metadata.
    pub fn description(&self) -> &'static str {
        match self {
            IssueKind::ImmutableClassViolation => {
                "Fields of @Immutable classes must be final or transient"
            }
            IssueKind::MissingNullityAnnotation => {
                "Reference-typed declarations must carry @Nullable or @Nonnull"
            }
            IssueKind::UnnecessaryNullityAnnotation => {
                "Nullity annotations on primitives, void or final fields have no effect"
            }
            IssueKind::NonFinalParameter => "Method parameters must be final",
            IssueKind::BlacklistedMethod => "Call to a blacklisted method",
            IssueKind::BlacklistedConstructor => "Call to a blacklisted constructor",
            IssueKind::BlacklistedAnnotation => "Use of a blacklisted annotation",
            IssueKind::BlacklistedBaseClass => "Extension of a blacklisted base class",
            IssueKind::ConfigError => "The rule file could not be loaded",
        }
    }

    /// Whether inline comments may suppress this kind.
    pub fn is_suppressible(&self) -> bool {
        !matches!(self, IssueKind::ConfigError)
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single policy violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: IssueKind,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(kind: IssueKind, location: &Location, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file: location.file.clone(),
            line: location.line,
            column: location.column,
            severity: kind.severity(),
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.file.clone(), self.line, self.column)
    }

    /// Sort key: file, line, column, kind.
    fn sort_key(&self) -> (&str, usize, usize, IssueKind) {
        (&self.file, self.line, self.column, self.kind)
    }
}

/// Receives diagnostics from the evaluators, zero or more per fact.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Results of running detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Diagnostics that were suppressed by inline comments
    #[serde(default)]
    pub suppressed: Vec<super::SuppressedDiagnostic>,
    /// Number of files scanned
    pub scanned: usize,
    /// Calls the class index could not resolve; never evaluated
    #[serde(default)]
    pub unresolved_calls: usize,
}

impl DetectionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of suppressed diagnostics.
    pub fn suppressed_count(&self) -> usize {
        self.suppressed.len()
    }

    /// Check if there are any error-severity diagnostics.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Number of diagnostics with the given severity.
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Deterministic output order: (file, line, column, kind).
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.suppressed
            .sort_by(|a, b| a.diagnostic.sort_key().cmp(&b.diagnostic.sort_key()));
    }
}
