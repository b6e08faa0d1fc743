//! Policycheck - structural coding-policy gate for Java sources.
//!
//! Policycheck evaluates declarations and call sites against a team's
//! conventions: `@Immutable` classes must only hold final or transient
//! fields, reference-typed declarations must state their nullity, method
//! parameters must be final, and blacklisted methods, constructors,
//! annotations and base classes must not be used.
//!
//! # Architecture
//!
//! - `analysis`: tree-sitter front end turning Java sources into facts
//! - `rules`: blacklist rule entities, the XML loader and the frozen store
//! - `detect`: policy evaluators, the engine dispatching facts to them,
//!   suppression comments and the runner
//! - `config`: YAML settings
//! - `report`: Output formatting (pretty, JSON, SARIF)
//!
//! The evaluators only see facts and never depend on tree-sitter; another
//! front end can feed [`detect::Engine`] directly.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod detect;
pub mod report;
pub mod rules;

pub use analysis::{
    register_analyzers, AnalysisContext, CallSite, ClassIndex, Declaration, DeclarationKind,
    FileFacts, JavaAnalyzer, LanguageAnalyzer, TypeHierarchy,
};
pub use config::{Checks, RulesSource, Settings};
pub use detect::{DetectionResult, Diagnostic, DiagnosticSink, Engine, IssueKind, Runner};
pub use rules::{ConfigError, RuleStore, RuleStoreBuilder, RuleStoreCell};
