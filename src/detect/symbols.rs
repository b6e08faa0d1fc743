//! Blacklisted annotations and base classes.
//!
//! Both checks emit at most one diagnostic per declaration; when several
//! rules match, their messages are joined with `"; "` in source order.

use crate::analysis::{ClassDecl, Declaration};
use crate::rules::{message_or_default, RuleStore};

use super::{Diagnostic, DiagnosticSink, IssueKind};

/// Join rule messages for `names` that have a rule, keeping the order of
/// `names` and skipping repeats.
fn joined_messages<'a, I, F>(names: I, lookup: F) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
    F: Fn(&str) -> Option<&'a str>,
{
    let mut seen: Vec<&str> = Vec::new();
    let mut messages = Vec::new();

    for name in names {
        if seen.contains(&name.as_str()) {
            continue;
        }
        seen.push(name);
        if let Some(message) = lookup(name) {
            messages.push(message_or_default(message, name));
        }
    }

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

/// Report blacklisted annotations on any declaration.
pub fn check_blacklisted_annotations(
    decl: &Declaration,
    rules: &RuleStore,
    sink: &mut dyn DiagnosticSink,
) {
    let message = joined_messages(decl.annotations(), |name| {
        rules.annotation_rule(name).map(|r| r.message.as_str())
    });
    if let Some(message) = message {
        sink.report(Diagnostic::new(
            IssueKind::BlacklistedAnnotation,
            decl.location(),
            message,
        ));
    }
}

/// Report blacklisted direct supertypes of a class.
pub fn check_blacklisted_base_classes(
    class: &ClassDecl,
    rules: &RuleStore,
    sink: &mut dyn DiagnosticSink,
) {
    let message = joined_messages(&class.supertypes, |name| {
        rules.base_class_rule(name).map(|r| r.message.as_str())
    });
    if let Some(message) = message {
        sink.report(Diagnostic::new(
            IssueKind::BlacklistedBaseClass,
            &class.location,
            message,
        ));
    }
}
