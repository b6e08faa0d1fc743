//! Nullity annotation check for fields, method returns and parameters.

use crate::analysis::{Declaration, TypeRef};

use super::{Diagnostic, DiagnosticSink, IssueKind};

pub const NULLABLE: &str = "javax.annotation.Nullable";
pub const NONNULL: &str = "javax.annotation.Nonnull";

/// Annotations that state nullity.
pub const NULLITY_ANNOTATIONS: [&str; 2] = [NULLABLE, NONNULL];

/// Why a declaration cannot carry a nullity annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotCheckable {
    Primitive,
    Void,
    FinalField,
}

impl NotCheckable {
    fn describe(&self) -> &'static str {
        match self {
            NotCheckable::Primitive => "has a primitive type",
            NotCheckable::Void => "has no value",
            NotCheckable::FinalField => "is a final field",
        }
    }
}

fn type_reason(declared_type: &TypeRef) -> Option<NotCheckable> {
    match declared_type {
        TypeRef::Reference(_) => None,
        TypeRef::Primitive(_) => Some(NotCheckable::Primitive),
        TypeRef::Void => Some(NotCheckable::Void),
    }
}

/// `Ok(type)` when the declaration must be annotated, `Err(reason)` when it
/// must not be. `None` for classes.
fn checkability(decl: &Declaration) -> Option<Result<&TypeRef, NotCheckable>> {
    let (declared_type, is_final_field) = match decl {
        Declaration::Class(_) => return None,
        Declaration::Field(f) => (&f.declared_type, f.is_final()),
        Declaration::Method(m) => (&m.return_type, false),
        Declaration::Parameter(p) => (&p.declared_type, false),
    };

    Some(match type_reason(declared_type) {
        Some(reason) => Err(reason),
        None if is_final_field => Err(NotCheckable::FinalField),
        None => Ok(declared_type),
    })
}

/// Whether a declaration must carry `@Nullable` or `@Nonnull`.
pub fn is_checkable(decl: &Declaration) -> bool {
    matches!(checkability(decl), Some(Ok(_)))
}

fn describe(decl: &Declaration) -> String {
    match decl {
        Declaration::Class(c) => format!("Class `{}`", c.simple_name()),
        Declaration::Field(f) => format!("Field `{}`", f.name),
        Declaration::Method(m) if m.is_constructor => format!("Constructor `{}`", m.name),
        Declaration::Method(m) => format!("Return type of `{}`", m.name),
        Declaration::Parameter(p) => format!("Parameter `{}` of `{}`", p.name, p.method),
    }
}

/// Report a checkable declaration without a nullity annotation, or a
/// non-checkable one that has one. Never both.
pub fn check_nullity(decl: &Declaration, sink: &mut dyn DiagnosticSink) {
    let checkability = match checkability(decl) {
        Some(c) => c,
        None => return,
    };
    let annotated = decl
        .annotations()
        .iter()
        .any(|a| NULLITY_ANNOTATIONS.contains(&a.as_str()));

    match checkability {
        Ok(declared_type) if !annotated => sink.report(Diagnostic::new(
            IssueKind::MissingNullityAnnotation,
            decl.location(),
            format!(
                "{} has reference type `{}` but no @Nullable or @Nonnull annotation",
                describe(decl),
                declared_type
            ),
        )),
        Err(reason) if annotated => sink.report(Diagnostic::new(
            IssueKind::UnnecessaryNullityAnnotation,
            decl.location(),
            format!(
                "{} {}; its nullity annotation has no effect",
                describe(decl),
                reason.describe()
            ),
        )),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        ClassRef, FieldDecl, Location, MethodDecl, Modifier, Modifiers, ParameterDecl,
    };

    fn owner() -> ClassRef {
        ClassRef {
            qualified_name: "com.x.Foo".to_string(),
            is_interface: false,
        }
    }

    fn field(declared_type: TypeRef, is_final: bool, annotations: &[&str]) -> Declaration {
        let mut modifiers = Modifiers::new();
        if is_final {
            modifiers.insert(Modifier::Final);
        }
        Declaration::Field(FieldDecl {
            name: "name".to_string(),
            declared_type,
            modifiers,
            annotations: annotations.iter().map(|s| s.to_string()).collect(),
            enclosing_class: owner(),
            location: Location::new("Foo.java", 4, 5),
        })
    }

    fn method(return_type: TypeRef, is_constructor: bool, annotations: &[&str]) -> Declaration {
        Declaration::Method(MethodDecl {
            name: if is_constructor { "Foo" } else { "get" }.to_string(),
            return_type,
            is_constructor,
            parameter_types: Vec::new(),
            is_varargs: false,
            modifiers: Modifiers::new(),
            annotations: annotations.iter().map(|s| s.to_string()).collect(),
            enclosing_class: owner(),
            location: Location::new("Foo.java", 6, 5),
        })
    }

    fn param(declared_type: TypeRef, annotations: &[&str]) -> Declaration {
        Declaration::Parameter(ParameterDecl {
            name: "arg".to_string(),
            declared_type,
            modifiers: Modifiers::new(),
            annotations: annotations.iter().map(|s| s.to_string()).collect(),
            method: "set".to_string(),
            enclosing_class: owner(),
            location: Location::new("Foo.java", 8, 14),
        })
    }

    fn string() -> TypeRef {
        TypeRef::Reference("java.lang.String".to_string())
    }

    fn int() -> TypeRef {
        TypeRef::Primitive("int".to_string())
    }

    fn run(decl: &Declaration) -> Vec<Diagnostic> {
        let mut sink = Vec::new();
        check_nullity(decl, &mut sink);
        sink
    }

    #[test]
    fn test_missing_annotation_on_reference_field() {
        let diags = run(&field(string(), false, &[]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, IssueKind::MissingNullityAnnotation);
        assert_eq!(
            diags[0].message,
            "Field `name` has reference type `java.lang.String` but no @Nullable or @Nonnull annotation"
        );
    }

    #[test]
    fn test_annotated_reference_declarations_pass() {
        assert!(run(&field(string(), false, &[NULLABLE])).is_empty());
        assert!(run(&method(string(), false, &[NONNULL])).is_empty());
        assert!(run(&param(string(), &[NULLABLE])).is_empty());
    }

    #[test]
    fn test_unnecessary_annotations() {
        let diags = run(&field(string(), true, &[NONNULL]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, IssueKind::UnnecessaryNullityAnnotation);
        assert!(diags[0].message.contains("final field"));

        let diags = run(&param(int(), &[NULLABLE]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, IssueKind::UnnecessaryNullityAnnotation);

        let diags = run(&method(TypeRef::Void, false, &[NULLABLE]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, IssueKind::UnnecessaryNullityAnnotation);
    }

    #[test]
    fn test_non_checkable_without_annotation_is_silent() {
        assert!(run(&field(string(), true, &[])).is_empty());
        assert!(run(&field(int(), false, &[])).is_empty());
        assert!(run(&method(TypeRef::Void, true, &[])).is_empty());
    }

    #[test]
    fn test_other_annotations_do_not_count() {
        let diags = run(&param(string(), &["java.lang.Deprecated"]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, IssueKind::MissingNullityAnnotation);
    }

    #[test]
    fn test_never_both_kinds() {
        for decl in [
            field(string(), false, &[NULLABLE]),
            field(string(), true, &[NULLABLE]),
            field(int(), false, &[]),
            method(string(), false, &[]),
            param(int(), &[NONNULL, NULLABLE]),
        ] {
            assert!(run(&decl).len() <= 1);
        }
    }

    #[test]
    fn test_checkable() {
        assert!(is_checkable(&field(string(), false, &[])));
        assert!(!is_checkable(&field(string(), true, &[])));
        assert!(is_checkable(&method(string(), false, &[])));
        assert!(!is_checkable(&method(TypeRef::Void, true, &[])));
    }
}
