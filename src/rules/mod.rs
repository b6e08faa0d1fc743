//! Blacklist policy: rule entities, the rule-file loader and the frozen store.
//!
//! The rule file is an XML document rooted at `<blacklist>`:
//!
//! ```xml
//! <blacklist>
//!   <method class="com.x.Foo" name="bar" params="int" message="Use Foo.baz instead"/>
//!   <constructor class="java.util.Date" params=""/>
//!   <annotation class="lombok.Data"/>
//!   <base-class class="java.util.Observable"/>
//!   <javadoc name="@deprecated"/>
//! </blacklist>
//! ```
//!
//! A store is loaded at most once per [`RuleStoreCell`]; every evaluator of a
//! run reads the same frozen snapshot.

mod loader;
mod store;

pub use loader::{load, parse_rules};
pub use store::{RuleStore, RuleStoreBuilder, RuleStoreCell};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Environment variable overriding the rule file location.
pub const RULES_ENV_VAR: &str = "POLICYCHECK_RULES";

/// Rule file used when nothing else is configured.
pub const DEFAULT_RULES_PATH: &str = "config/blacklist.xml";

/// Fatal problems with the rule file. Any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed rule file {path} at line {line}: {message}")]
    Xml {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("rule file {path} has no root element")]
    EmptyDocument { path: PathBuf },
    #[error("rule file {path}: root element must be <blacklist>, found <{found}>")]
    UnexpectedRoot { path: PathBuf, found: String },
    #[error("rule file {path} line {line}: unknown element <{element}>")]
    UnknownElement {
        path: PathBuf,
        element: String,
        line: usize,
    },
    #[error("rule file {path} line {line}: <{element}> must not contain <{child}>")]
    NestedElement {
        path: PathBuf,
        element: String,
        child: String,
        line: usize,
    },
    #[error("rule file {path} line {line}: unexpected text {text:?} under <blacklist>")]
    UnexpectedText {
        path: PathBuf,
        text: String,
        line: usize,
    },
    #[error("rule file {path} line {line}: <{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        path: PathBuf,
        element: String,
        attribute: String,
        line: usize,
    },
    #[error("rule file {path} line {line}: <{element}> has invalid {attribute}={value:?}")]
    InvalidAttribute {
        path: PathBuf,
        element: String,
        attribute: String,
        value: String,
        line: usize,
    },
}

impl ConfigError {
    /// The rule file the error is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ConfigError::Io { path, .. }
            | ConfigError::Xml { path, .. }
            | ConfigError::EmptyDocument { path }
            | ConfigError::UnexpectedRoot { path, .. }
            | ConfigError::UnknownElement { path, .. }
            | ConfigError::NestedElement { path, .. }
            | ConfigError::UnexpectedText { path, .. }
            | ConfigError::MissingAttribute { path, .. }
            | ConfigError::InvalidAttribute { path, .. } => path,
        }
    }

    /// Line of the offending construct; 0 when the whole file is at fault.
    pub fn line(&self) -> usize {
        match self {
            ConfigError::Xml { line, .. }
            | ConfigError::UnknownElement { line, .. }
            | ConfigError::NestedElement { line, .. }
            | ConfigError::UnexpectedText { line, .. }
            | ConfigError::MissingAttribute { line, .. }
            | ConfigError::InvalidAttribute { line, .. } => *line,
            ConfigError::Io { .. }
            | ConfigError::EmptyDocument { .. }
            | ConfigError::UnexpectedRoot { .. } => 0,
        }
    }
}

/// A blacklisted method or constructor.
///
/// `declaring_class` is kept for people reading the rule file and for
/// `policycheck rules`; matching only uses the simple name and the
/// parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRule {
    pub simple_name: String,
    pub declaring_class: String,
    /// `None` matches any signature.
    pub params: Option<Vec<String>>,
    pub message: String,
}

impl MethodRule {
    /// Whether this rule applies to a target with the given formal parameter types.
    pub fn accepts(&self, formal_params: &[String]) -> bool {
        match &self.params {
            None => true,
            Some(expected) => expected.as_slice() == formal_params,
        }
    }

    /// The signature as written in the rule file, for display.
    pub fn signature(&self) -> String {
        match &self.params {
            None => format!("{}.{}(..)", self.declaring_class, self.simple_name),
            Some(params) => format!(
                "{}.{}({})",
                self.declaring_class,
                self.simple_name,
                params.join(", ")
            ),
        }
    }
}

/// A blacklisted annotation, keyed by its qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRule {
    pub qualified_name: String,
    pub message: String,
}

/// A blacklisted supertype, keyed by its qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseClassRule {
    pub qualified_name: String,
    pub message: String,
}

/// A blacklisted javadoc tag (stored without the leading `@`).
///
/// Nothing feeds comment tags to the engine yet, so these are only loaded and
/// listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavadocTagRule {
    pub tag_name: String,
    pub message: String,
}

/// The message to show for a rule: its own text, or the generic one.
pub fn message_or_default(message: &str, name: &str) -> String {
    if message.is_empty() {
        format!("Use of `{}` is not allowed.", name)
    } else {
        message.to_string()
    }
}

/// Which index a rule element feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Method,
    Constructor,
    Annotation,
    BaseClass,
    Javadoc,
}

impl RuleKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            RuleKind::Method => "method",
            RuleKind::Constructor => "constructor",
            RuleKind::Annotation => "annotation",
            RuleKind::BaseClass => "base-class",
            RuleKind::Javadoc => "javadoc",
        }
    }

    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "method" => Some(RuleKind::Method),
            "constructor" => Some(RuleKind::Constructor),
            "annotation" => Some(RuleKind::Annotation),
            "base-class" => Some(RuleKind::BaseClass),
            "javadoc" => Some(RuleKind::Javadoc),
            _ => None,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.element_name())
    }
}
