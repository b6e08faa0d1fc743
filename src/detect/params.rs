//! Parameter finality check.

use crate::analysis::ParameterDecl;

use super::{Diagnostic, DiagnosticSink, IssueKind};

/// Report a parameter that is not `final`. Parameters of interface methods
/// are exempt.
pub fn check_final_parameter(param: &ParameterDecl, sink: &mut dyn DiagnosticSink) {
    if param.enclosing_class.is_interface || param.is_final() {
        return;
    }
    sink.report(Diagnostic::new(
        IssueKind::NonFinalParameter,
        &param.location,
        format!("Parameter `{}` of `{}` should be final", param.name, param.method),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ClassRef, Location, Modifier, TypeRef};

    fn param(is_interface: bool, modifiers: &[Modifier]) -> ParameterDecl {
        ParameterDecl {
            name: "value".to_string(),
            declared_type: TypeRef::Primitive("int".to_string()),
            modifiers: modifiers.iter().copied().collect(),
            annotations: Vec::new(),
            method: "apply".to_string(),
            enclosing_class: ClassRef {
                qualified_name: "com.x.Shape".to_string(),
                is_interface,
            },
            location: Location::new("Shape.java", 8, 16),
        }
    }

    #[test]
    fn test_non_final_parameter_reported_once() {
        let mut sink = Vec::new();
        check_final_parameter(&param(false, &[]), &mut sink);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].kind, IssueKind::NonFinalParameter);
        assert_eq!(sink[0].message, "Parameter `value` of `apply` should be final");
        assert_eq!((sink[0].line, sink[0].column), (8, 16));
    }

    #[test]
    fn test_final_parameter_passes() {
        let mut sink = Vec::new();
        check_final_parameter(&param(false, &[Modifier::Final]), &mut sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_interface_parameters_exempt() {
        let mut sink = Vec::new();
        check_final_parameter(&param(true, &[]), &mut sink);
        assert!(sink.is_empty());
    }
}
