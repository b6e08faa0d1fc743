//! AST-backed code analysis module.
//!
//! Front ends turn source files into "facts" the policy engine evaluates:
//! - Declarations (classes, fields, methods, parameters)
//! - Call expressions, resolved to call sites through the class index
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Source Files    │────▶│ Analyzers    │────▶│ FileFacts     │
//! └─────────────────┘     │ (Java)       │     │ (Declarations,│
//!                         └──────────────┘     │  Calls)       │
//!                                              └───────────────┘
//!                                                      │
//!                                                      ▼
//!                         ┌──────────────┐     ┌───────────────┐
//!                         │ Policy       │◀────│ ClassIndex    │
//!                         │ Engine       │     │ (CallSites,   │
//!                         └──────────────┘     │  Hierarchy)   │
//!                                              └───────────────┘
//! ```

mod context;
mod facts;
mod index;
mod languages;
mod traits;

pub use context::{relative_path, AnalysisContext};
pub use facts::{
    simple_name, CallExpr, CallSite, ClassDecl, ClassKind, ClassRef, Declaration,
    DeclarationKind, FieldDecl, FileFacts, Location, MethodDecl, Modifier, Modifiers,
    ParameterDecl, Receiver, TypeRef,
};
pub use index::ClassIndex;
pub use languages::{get_analyzer, register_analyzers, registered_extensions, JavaAnalyzer};
pub use traits::{FlatHierarchy, LanguageAnalyzer, ParsedFile, TypeHierarchy};
