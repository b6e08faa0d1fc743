//! Policy evaluation over analysis facts.
//!
//! Each evaluator is a plain function from one fact to zero or more
//! diagnostics. [`Engine`] dispatches facts to the enabled evaluators and
//! owns the rule store; [`Runner`] drives a whole source tree through it.

mod blacklist;
mod engine;
mod immutable;
mod nullity;
mod params;
mod runner;
mod suppress;
mod symbols;
mod types;

pub use blacklist::check_call;
pub use engine::Engine;
pub use immutable::{check_immutable_class, is_immutable_annotation};
pub use nullity::{check_nullity, is_checkable, NONNULL, NULLABLE, NULLITY_ANNOTATIONS};
pub use params::check_final_parameter;
pub use runner::Runner;
pub use suppress::{
    collect_suppressions, filter_suppressed, matches_suppression, parse_suppressions,
    SuppressedDiagnostic, Suppression, SuppressionType,
};
pub use symbols::{check_blacklisted_annotations, check_blacklisted_base_classes};
pub use types::{DetectionResult, Diagnostic, DiagnosticSink, IssueKind, Severity};
