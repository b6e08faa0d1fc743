//! Immutability check for classes annotated `@Immutable`.

use crate::analysis::{ClassDecl, Modifier};

use super::{Diagnostic, DiagnosticSink, IssueKind};

/// Whether an annotation name marks a class immutable.
///
/// Any annotation whose qualified name ends in `.Immutable` counts, so the
/// Error Prone, JSR-305 and in-house variants are all recognized.
pub fn is_immutable_annotation(qualified_name: &str) -> bool {
    qualified_name.ends_with(".Immutable")
}

/// Report every field of an `@Immutable` class that is neither `final` nor
/// `transient`.
pub fn check_immutable_class(class: &ClassDecl, sink: &mut dyn DiagnosticSink) {
    if !class.annotations.iter().any(|a| is_immutable_annotation(a)) {
        return;
    }

    for field in &class.fields {
        if field.modifiers.contains(&Modifier::Final) || field.modifiers.contains(&Modifier::Transient)
        {
            continue;
        }
        sink.report(Diagnostic::new(
            IssueKind::ImmutableClassViolation,
            &field.location,
            format!(
                "Field `{}` of @Immutable class `{}` must be final or transient",
                field.name,
                class.simple_name()
            ),
        ));
    }
}
