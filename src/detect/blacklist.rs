//! Blacklisted method and constructor usage.

use crate::analysis::{CallSite, TypeHierarchy};
use crate::rules::{message_or_default, RuleStore};

use super::{Diagnostic, DiagnosticSink, IssueKind};

/// Report a call to a blacklisted method or constructor.
///
/// Unresolved calls are skipped. Calls made from the declaring class or any
/// of its subtypes are exempt, so a wrapper may use what it wraps.
pub fn check_call(
    call: &CallSite,
    rules: &RuleStore,
    hierarchy: &dyn TypeHierarchy,
    sink: &mut dyn DiagnosticSink,
) {
    let target_class = match &call.target_class {
        Some(class) => class,
        None => return,
    };

    if hierarchy.is_subtype(&call.calling_class, target_class) {
        return;
    }

    let rule = match rules.match_invocation(&call.target_name, &call.formal_params, call.is_constructor)
    {
        Some(rule) => rule,
        None => return,
    };

    let (kind, target) = if call.is_constructor {
        (IssueKind::BlacklistedConstructor, target_class.clone())
    } else {
        (
            IssueKind::BlacklistedMethod,
            format!("{}.{}", target_class, call.target_name),
        )
    };
    log::debug!(
        "{}: {} matches rule {}",
        call.location,
        target,
        rule.signature()
    );

    sink.report(Diagnostic::new(
        kind,
        &call.location,
        message_or_default(&rule.message, &target),
    ));
}
