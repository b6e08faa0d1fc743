//! Fact structures handed from a front end to the policy engine.

use std::collections::BTreeSet;
use std::fmt;

/// Source position of a declaration or call, passed through to diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Location {
    /// File path (relative to the scan root when produced by the runner).
    pub file: String,
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Position of a tree-sitter node in `file`.
    pub fn from_node(file: &str, node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        Self {
            file: file.to_string(),
            line: start.row + 1, // tree-sitter is 0-indexed
            column: start.column + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Declaration modifiers the checks care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Transient,
    Volatile,
    Abstract,
    Synchronized,
    Native,
    Default,
    Sealed,
}

impl Modifier {
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "public" => Some(Modifier::Public),
            "protected" => Some(Modifier::Protected),
            "private" => Some(Modifier::Private),
            "static" => Some(Modifier::Static),
            "final" => Some(Modifier::Final),
            "transient" => Some(Modifier::Transient),
            "volatile" => Some(Modifier::Volatile),
            "abstract" => Some(Modifier::Abstract),
            "synchronized" => Some(Modifier::Synchronized),
            "native" => Some(Modifier::Native),
            "default" => Some(Modifier::Default),
            "sealed" => Some(Modifier::Sealed),
            _ => None,
        }
    }
}

pub type Modifiers = BTreeSet<Modifier>;

/// The declared type of a field, method return or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A class, interface or array type, by qualified name.
    Reference(String),
    /// `int`, `boolean`, ...
    Primitive(String),
    /// `void`, or no type at all (constructors).
    Void,
}

impl TypeRef {
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeRef::Reference(_))
    }

    /// The name used when matching formal parameter lists.
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Reference(name) | TypeRef::Primitive(name) => name,
            TypeRef::Void => "void",
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which flavour of type declaration a class fact describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl ClassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Enum => "enum",
            ClassKind::Record => "record",
            ClassKind::Annotation => "annotation",
        }
    }

    /// Interfaces and annotation types have no method bodies of their own
    /// (default methods aside).
    pub fn is_interface(&self) -> bool {
        matches!(self, ClassKind::Interface | ClassKind::Annotation)
    }
}

/// Back-reference from a member to the class that contains it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassRef {
    pub qualified_name: String,
    pub is_interface: bool,
}

/// A class, interface, enum, record or annotation type.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub qualified_name: String,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub annotations: Vec<String>,
    /// Directly declared supertypes: the extended class first, then interfaces.
    pub supertypes: Vec<String>,
    /// Field members, in declaration order.
    pub fields: Vec<FieldDecl>,
    pub location: Location,
}

impl ClassDecl {
    /// The simple (unqualified) name of the class.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.qualified_name)
    }

    pub fn class_ref(&self) -> ClassRef {
        ClassRef {
            qualified_name: self.qualified_name.clone(),
            is_interface: self.kind.is_interface(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub declared_type: TypeRef,
    pub modifiers: Modifiers,
    pub annotations: Vec<String>,
    pub enclosing_class: ClassRef,
    pub location: Location,
}

impl FieldDecl {
    pub fn is_final(&self) -> bool {
        self.modifiers.contains(&Modifier::Final)
    }
}

/// A method or constructor. Constructors have a `Void` return type.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub return_type: TypeRef,
    pub is_constructor: bool,
    /// Formal parameter types, for the class index.
    pub parameter_types: Vec<String>,
    pub is_varargs: bool,
    pub modifiers: Modifiers,
    pub annotations: Vec<String>,
    pub enclosing_class: ClassRef,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ParameterDecl {
    pub name: String,
    pub declared_type: TypeRef,
    pub modifiers: Modifiers,
    pub annotations: Vec<String>,
    /// Name of the method or constructor declaring the parameter.
    pub method: String,
    /// Class of the enclosing method.
    pub enclosing_class: ClassRef,
    pub location: Location,
}

impl ParameterDecl {
    pub fn is_final(&self) -> bool {
        self.modifiers.contains(&Modifier::Final)
    }
}

/// Kind of declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Class,
    Field,
    Method,
    Parameter,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Field => "field",
            DeclarationKind::Method => "method",
            DeclarationKind::Parameter => "parameter",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One declaration fact.
#[derive(Debug, Clone)]
pub enum Declaration {
    Class(ClassDecl),
    Field(FieldDecl),
    Method(MethodDecl),
    Parameter(ParameterDecl),
}

impl Declaration {
    pub fn kind(&self) -> DeclarationKind {
        match self {
            Declaration::Class(_) => DeclarationKind::Class,
            Declaration::Field(_) => DeclarationKind::Field,
            Declaration::Method(_) => DeclarationKind::Method,
            Declaration::Parameter(_) => DeclarationKind::Parameter,
        }
    }

    /// Display name: the qualified name for classes, the simple name otherwise.
    pub fn name(&self) -> &str {
        match self {
            Declaration::Class(c) => &c.qualified_name,
            Declaration::Field(f) => &f.name,
            Declaration::Method(m) => &m.name,
            Declaration::Parameter(p) => &p.name,
        }
    }

    pub fn annotations(&self) -> &[String] {
        match self {
            Declaration::Class(c) => &c.annotations,
            Declaration::Field(f) => &f.annotations,
            Declaration::Method(m) => &m.annotations,
            Declaration::Parameter(p) => &p.annotations,
        }
    }

    pub fn modifiers(&self) -> &Modifiers {
        match self {
            Declaration::Class(c) => &c.modifiers,
            Declaration::Field(f) => &f.modifiers,
            Declaration::Method(m) => &m.modifiers,
            Declaration::Parameter(p) => &p.modifiers,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Declaration::Class(c) => &c.location,
            Declaration::Field(f) => &f.location,
            Declaration::Method(m) => &m.location,
            Declaration::Parameter(p) => &p.location,
        }
    }

    /// The class containing this declaration; `None` for top-level classes.
    pub fn enclosing_class(&self) -> Option<&ClassRef> {
        match self {
            Declaration::Class(_) => None,
            Declaration::Field(f) => Some(&f.enclosing_class),
            Declaration::Method(m) => Some(&m.enclosing_class),
            Declaration::Parameter(p) => Some(&p.enclosing_class),
        }
    }
}

/// A resolved method or constructor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Method name, or the class simple name for constructors.
    pub target_name: String,
    /// Qualified name of the class declaring the target; `None` when the
    /// front end could not resolve the call.
    pub target_class: Option<String>,
    pub is_constructor: bool,
    /// Formal parameter types of the resolved target (not the argument types).
    pub formal_params: Vec<String>,
    /// Innermost class containing the call.
    pub calling_class: String,
    pub location: Location,
}

/// How the receiver of a call expression was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// `foo()`
    Implicit,
    /// `this.foo()`
    This,
    /// `super.foo()`
    Super,
    /// `Foo.bar()` or `new Foo()`: a type, by qualified name.
    Type(String),
    /// `x.bar()` where `x` has this declared (qualified) type.
    Typed(String),
    /// Anything the front end could not type.
    Unknown,
}

/// A call expression as seen in source, before resolution.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub name: String,
    pub receiver: Receiver,
    pub arg_count: usize,
    pub is_constructor: bool,
    pub calling_class: String,
    pub location: Location,
}

/// All facts extracted from a single file.
#[derive(Debug, Clone)]
pub struct FileFacts {
    /// File path.
    pub path: String,
    /// Language identifier.
    pub language: String,
    /// Package name (if any).
    pub package: Option<String>,
    /// Every declaration in the file, parents before their members.
    pub declarations: Vec<Declaration>,
    /// Unresolved call expressions.
    pub calls: Vec<CallExpr>,
    /// Whether the file had parse errors.
    pub has_parse_errors: bool,
}

impl FileFacts {
    /// Create empty facts for a file.
    pub fn empty(path: &str, language: &str) -> Self {
        Self {
            path: path.to_string(),
            language: language.to_string(),
            package: None,
            declarations: Vec::new(),
            calls: Vec::new(),
            has_parse_errors: false,
        }
    }

    /// Class declarations in the file.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Class(c) => Some(c),
            _ => None,
        })
    }

    /// Method and constructor declarations in the file.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Method(m) => Some(m),
            _ => None,
        })
    }

    /// Find a declaration by kind and name.
    pub fn find_declaration(&self, kind: DeclarationKind, name: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|d| d.kind() == kind && d.name() == name)
    }
}

/// Last dot-separated segment of a qualified name.
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}
