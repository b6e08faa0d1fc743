//! Java language analyzer using tree-sitter.
//!
//! Produces declaration facts (classes, fields, methods, parameters) and raw
//! call expressions. Type names are qualified from the file alone: imports,
//! types declared in the file, `java.lang`, then the file's own package.

use std::collections::HashMap;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::{
    simple_name, CallExpr, ClassDecl, ClassKind, ClassRef, Declaration, FieldDecl, FileFacts,
    LanguageAnalyzer, Location, MethodDecl, Modifier, Modifiers, ParameterDecl, ParsedFile,
    Receiver, TypeRef,
};

/// Tree-sitter query for package declaration.
const PACKAGE_QUERY: &str = r#"
(package_declaration (scoped_identifier) @package_name)
(package_declaration (identifier) @package_name)
"#;

/// Tree-sitter query for import declarations.
const IMPORT_QUERY: &str = "(import_declaration) @import";

/// Types visible in every compilation unit without an import.
const JAVA_LANG_TYPES: &[&str] = &[
    "AutoCloseable",
    "Boolean",
    "Byte",
    "CharSequence",
    "Character",
    "Class",
    "ClassCastException",
    "Cloneable",
    "Comparable",
    "Deprecated",
    "Double",
    "Enum",
    "Error",
    "Exception",
    "Float",
    "FunctionalInterface",
    "IllegalArgumentException",
    "IllegalStateException",
    "IndexOutOfBoundsException",
    "Integer",
    "InterruptedException",
    "Iterable",
    "Long",
    "Math",
    "NullPointerException",
    "Number",
    "Object",
    "Override",
    "Process",
    "Record",
    "Runnable",
    "Runtime",
    "RuntimeException",
    "SafeVarargs",
    "Short",
    "String",
    "StringBuffer",
    "StringBuilder",
    "SuppressWarnings",
    "System",
    "Thread",
    "ThreadLocal",
    "Throwable",
    "UnsupportedOperationException",
    "Void",
];

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

fn is_type_declaration(kind: &str) -> bool {
    TYPE_DECLARATIONS.contains(&kind)
}

fn class_kind(kind: &str) -> Option<ClassKind> {
    match kind {
        "class_declaration" => Some(ClassKind::Class),
        "interface_declaration" => Some(ClassKind::Interface),
        "enum_declaration" => Some(ClassKind::Enum),
        "record_declaration" => Some(ClassKind::Record),
        "annotation_type_declaration" => Some(ClassKind::Annotation),
        _ => None,
    }
}

pub struct JavaAnalyzer {
    language: Language,
}

impl JavaAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    fn extract_package(&self, parsed: &ParsedFile) -> anyhow::Result<Option<String>> {
        let query = Query::new(&self.language, PACKAGE_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        if let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                if name == "package_name" {
                    return Ok(Some(parsed.node_text(capture.node).to_string()));
                }
            }
        }
        Ok(None)
    }

    /// Single-type imports as simple name -> qualified name.
    ///
    /// Static and on-demand (`.*`) imports cannot name a type by itself and
    /// are skipped.
    fn extract_imports(&self, parsed: &ParsedFile) -> anyhow::Result<HashMap<String, String>> {
        let query = Query::new(&self.language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = HashMap::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let text = parsed.node_text(capture.node);
                let path = text
                    .trim()
                    .trim_start_matches("import")
                    .trim_end_matches(';')
                    .trim();
                if path.starts_with("static ") || path.ends_with('*') {
                    continue;
                }
                let path: String = path.chars().filter(|c| !c.is_whitespace()).collect();
                imports.insert(simple_name(&path).to_string(), path);
            }
        }
        Ok(imports)
    }
}

impl Default for JavaAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for JavaAnalyzer {
    fn language_id(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Java source: {}", path.display()))?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    fn extract_facts(&self, parsed: &ParsedFile) -> anyhow::Result<FileFacts> {
        let package = self.extract_package(parsed)?;
        let imports = self.extract_imports(parsed)?;

        let mut declared = HashMap::new();
        collect_declared_types(
            parsed,
            parsed.tree.root_node(),
            package.as_deref(),
            None,
            &mut declared,
        );

        let mut walker = FactWalker {
            parsed,
            scope: TypeScope {
                package: package.clone(),
                imports,
                declared,
            },
            declarations: Vec::new(),
            calls: Vec::new(),
            anonymous_classes: 0,
        };
        let root = parsed.tree.root_node();
        let top_level: Vec<Node> = root.named_children(&mut root.walk()).collect();
        for node in top_level {
            if is_type_declaration(node.kind()) {
                walker.visit_type(node, None);
            }
        }

        Ok(FileFacts {
            path: parsed.path.clone(),
            language: self.language_id().to_string(),
            package,
            declarations: walker.declarations,
            calls: walker.calls,
            has_parse_errors: root.has_error(),
        })
    }
}

/// Record every type declared in the file under its simple name and its
/// dotted path from the top-level type (`Outer.Inner`).
fn collect_declared_types(
    parsed: &ParsedFile,
    node: Node,
    package: Option<&str>,
    outer: Option<(&str, &str)>,
    declared: &mut HashMap<String, String>,
) {
    let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
    for child in children {
        if is_type_declaration(child.kind()) {
            if let Some(name_node) = child.child_by_field_name("name") {
                let name = parsed.node_text(name_node);
                let (qualified, relative) = match outer {
                    Some((outer_qualified, outer_relative)) => (
                        format!("{}.{}", outer_qualified, name),
                        format!("{}.{}", outer_relative, name),
                    ),
                    None => (
                        package
                            .map(|p| format!("{}.{}", p, name))
                            .unwrap_or_else(|| name.to_string()),
                        name.to_string(),
                    ),
                };
                declared
                    .entry(name.to_string())
                    .or_insert_with(|| qualified.clone());
                declared.insert(relative.clone(), qualified.clone());
                collect_declared_types(
                    parsed,
                    child,
                    package,
                    Some((qualified.as_str(), relative.as_str())),
                    declared,
                );
                continue;
            }
        }
        collect_declared_types(parsed, child, package, outer, declared);
    }
}

/// Name resolution context for one compilation unit.
struct TypeScope {
    package: Option<String>,
    imports: HashMap<String, String>,
    declared: HashMap<String, String>,
}

impl TypeScope {
    fn package_qualified(&self, name: &str) -> String {
        match &self.package {
            Some(p) => format!("{}.{}", p, name),
            None => name.to_string(),
        }
    }

    /// Qualify a type name as written in source. Generic arguments are
    /// erased; array suffixes are kept.
    fn qualify(&self, raw: &str) -> String {
        let erased = erase_generics(raw);
        let base = erased.trim_end_matches("[]");
        let dims = &erased[base.len()..];
        format!("{}{}", self.qualify_base(base), dims)
    }

    fn qualify_base(&self, name: &str) -> String {
        if let Some(q) = self.declared.get(name) {
            return q.clone();
        }
        let (head, rest) = match name.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (name, None),
        };
        let head_qualified = if let Some(q) = self.declared.get(head) {
            Some(q.clone())
        } else if let Some(q) = self.imports.get(head) {
            Some(q.clone())
        } else if JAVA_LANG_TYPES.contains(&head) {
            Some(format!("java.lang.{}", head))
        } else {
            None
        };

        match (head_qualified, rest) {
            (Some(q), Some(rest)) => format!("{}.{}", q, rest),
            (Some(q), None) => q,
            // `java.util.List` and friends are already qualified
            (None, Some(_)) => name.to_string(),
            (None, None) => self.package_qualified(name),
        }
    }
}

/// Drop `<...>` sections and whitespace from a type name.
fn erase_generics(raw: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() => {}
            c if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

/// `a.b.C` style paths that can only name a type.
fn is_type_path(text: &str) -> bool {
    let segments: Vec<&str> = text.split('.').collect();
    segments
        .iter()
        .all(|s| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'))
        && segments.last().map(|s| starts_uppercase(s)).unwrap_or(false)
}

/// One formal parameter before it becomes a fact.
struct ParamInfo<'a> {
    name: String,
    declared_type: TypeRef,
    modifiers: Modifiers,
    annotations: Vec<String>,
    is_varargs: bool,
    node: Node<'a>,
}

struct FactWalker<'a> {
    parsed: &'a ParsedFile,
    scope: TypeScope,
    declarations: Vec<Declaration>,
    calls: Vec<CallExpr>,
    anonymous_classes: usize,
}

impl<'a> FactWalker<'a> {
    fn text(&self, node: Node) -> &'a str {
        self.parsed.node_text(node)
    }

    fn location(&self, node: Node) -> Location {
        Location::from_node(&self.parsed.path, node)
    }

    fn visit_type(&mut self, node: Node<'a>, outer: Option<&str>) {
        let kind = match class_kind(node.kind()) {
            Some(kind) => kind,
            None => return,
        };
        let name = match node.child_by_field_name("name") {
            Some(n) => self.text(n).to_string(),
            None => return,
        };
        let qualified = match outer {
            Some(o) => format!("{}.{}", o, name),
            None => self.scope.package_qualified(&name),
        };

        let (mut modifiers, annotations) = self.modifiers(node);
        if matches!(kind, ClassKind::Enum | ClassKind::Record) {
            modifiers.insert(Modifier::Final);
        }
        let class_ref = ClassRef {
            qualified_name: qualified.clone(),
            is_interface: kind.is_interface(),
        };

        let supertypes = self.supertypes(node);
        let location = self.location(node);
        let index = self.declarations.len();
        self.declarations.push(Declaration::Class(ClassDecl {
            qualified_name: qualified.clone(),
            kind,
            modifiers,
            annotations,
            supertypes,
            fields: Vec::new(),
            location,
        }));

        let members = match node.child_by_field_name("body") {
            Some(body) => class_members(body),
            None => Vec::new(),
        };

        // Field types first, so methods declared above a field can still
        // type receivers that use it.
        let mut field_types = HashMap::new();
        let mut member_fields = Vec::with_capacity(members.len());
        for member in &members {
            let decls = match member.kind() {
                "field_declaration" => self.field_decls(*member, &class_ref, kind.is_interface()),
                "constant_declaration" => self.field_decls(*member, &class_ref, true),
                _ => Vec::new(),
            };
            for (field, _) in &decls {
                if let TypeRef::Reference(t) = &field.declared_type {
                    field_types.insert(field.name.clone(), t.clone());
                }
            }
            member_fields.push(decls);
        }

        let mut fields = Vec::new();
        for (member, decls) in members.iter().zip(member_fields) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    for (field, initializer) in decls {
                        fields.push(field.clone());
                        self.declarations.push(Declaration::Field(field));
                        if let Some(init) = initializer {
                            let mut locals = field_types.clone();
                            self.walk_calls(init, &qualified, &mut locals);
                        }
                    }
                }
                "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                    self.visit_method(*member, &class_ref, &qualified, &field_types);
                }
                "static_initializer" | "block" | "enum_constant" => {
                    let mut locals = field_types.clone();
                    self.walk_calls(*member, &qualified, &mut locals);
                }
                k if is_type_declaration(k) => self.visit_type(*member, Some(qualified.as_str())),
                _ => {}
            }
        }

        if let Some(Declaration::Class(class)) = self.declarations.get_mut(index) {
            class.fields = fields;
        }
    }

    /// Read the `modifiers` child: keywords and qualified annotation names.
    fn modifiers(&self, node: Node) -> (Modifiers, Vec<String>) {
        let mut modifiers = Modifiers::new();
        let mut annotations = Vec::new();

        let mods = node
            .children(&mut node.walk())
            .find(|c| c.kind() == "modifiers");
        let mods = match mods {
            Some(m) => m,
            None => return (modifiers, annotations),
        };

        let children: Vec<Node> = mods.children(&mut mods.walk()).collect();
        for child in children {
            match child.kind() {
                "marker_annotation" | "annotation" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        let qualified = self.scope.qualify(self.text(name));
                        if !annotations.contains(&qualified) {
                            annotations.push(qualified);
                        }
                    }
                }
                keyword => {
                    if let Some(m) = Modifier::parse(keyword) {
                        modifiers.insert(m);
                    }
                }
            }
        }
        (modifiers, annotations)
    }

    /// Extended class first, then implemented or extended interfaces.
    fn supertypes(&self, node: Node) -> Vec<String> {
        let mut supertypes = Vec::new();
        let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
        for child in children {
            match child.kind() {
                "superclass" => {
                    let types: Vec<Node> = child.named_children(&mut child.walk()).collect();
                    for t in types {
                        supertypes.push(self.type_ref(t).name().to_string());
                    }
                }
                "super_interfaces" | "extends_interfaces" => {
                    let lists: Vec<Node> = child.named_children(&mut child.walk()).collect();
                    for list in lists.into_iter().filter(|n| n.kind() == "type_list") {
                        let types: Vec<Node> = list.named_children(&mut list.walk()).collect();
                        for t in types {
                            supertypes.push(self.type_ref(t).name().to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        supertypes
    }

    fn type_ref(&self, node: Node) -> TypeRef {
        match node.kind() {
            "void_type" => TypeRef::Void,
            "integral_type" | "floating_point_type" | "boolean_type" => {
                TypeRef::Primitive(self.text(node).to_string())
            }
            "array_type" => {
                let base = node
                    .child_by_field_name("element")
                    .map(|e| self.type_ref(e).name().to_string())
                    .unwrap_or_else(|| self.scope.qualify(self.text(node)));
                let dims = node
                    .child_by_field_name("dimensions")
                    .map(|d| self.text(d).matches('[').count())
                    .unwrap_or(1);
                TypeRef::Reference(format!("{}{}", base, "[]".repeat(dims)))
            }
            "generic_type" => match node.named_child(0) {
                Some(raw) => self.type_ref(raw),
                None => TypeRef::Reference(self.scope.qualify(self.text(node))),
            },
            "annotated_type" => match node.named_children(&mut node.walk()).last() {
                Some(inner) => self.type_ref(inner),
                None => TypeRef::Reference(self.scope.qualify(self.text(node))),
            },
            _ => TypeRef::Reference(self.scope.qualify(self.text(node))),
        }
    }

    /// One fact per declarator. Interface constants are implicitly
    /// `public static final`.
    fn field_decls(
        &self,
        node: Node<'a>,
        class_ref: &ClassRef,
        implicit_constant: bool,
    ) -> Vec<(FieldDecl, Option<Node<'a>>)> {
        let (mut modifiers, annotations) = self.modifiers(node);
        if implicit_constant {
            modifiers.extend([Modifier::Public, Modifier::Static, Modifier::Final]);
        }
        let base_type = match node.child_by_field_name("type") {
            Some(t) => self.type_ref(t),
            None => return Vec::new(),
        };

        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut node.walk())
            .collect();
        declarators
            .into_iter()
            .enumerate()
            .filter_map(|(i, declarator)| {
                let name = self.text(declarator.child_by_field_name("name")?).to_string();
                let declared_type = match declarator.child_by_field_name("dimensions") {
                    Some(d) => TypeRef::Reference(format!(
                        "{}{}",
                        base_type.name(),
                        "[]".repeat(self.text(d).matches('[').count())
                    )),
                    None => base_type.clone(),
                };
                let field = FieldDecl {
                    name,
                    declared_type,
                    modifiers: modifiers.clone(),
                    annotations: annotations.clone(),
                    enclosing_class: class_ref.clone(),
                    // The first declarator carries the annotations; later
                    // ones point at their own name.
                    location: if i == 0 {
                        self.location(node)
                    } else {
                        self.location(declarator)
                    },
                };
                Some((field, declarator.child_by_field_name("value")))
            })
            .collect()
    }

    fn visit_method(
        &mut self,
        node: Node<'a>,
        class_ref: &ClassRef,
        calling_class: &str,
        field_types: &HashMap<String, String>,
    ) {
        let is_constructor = node.kind() != "method_declaration";
        let name = match node.child_by_field_name("name") {
            Some(n) => self.text(n).to_string(),
            None => return,
        };
        let return_type = if is_constructor {
            TypeRef::Void
        } else {
            node.child_by_field_name("type")
                .map(|t| self.type_ref(t))
                .unwrap_or(TypeRef::Void)
        };
        let (modifiers, annotations) = self.modifiers(node);
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.parameters(p))
            .unwrap_or_default();

        let location = self.location(node);
        self.declarations.push(Declaration::Method(MethodDecl {
            name: name.clone(),
            return_type,
            is_constructor,
            parameter_types: params
                .iter()
                .map(|p| p.declared_type.name().to_string())
                .collect(),
            is_varargs: params.last().map(|p| p.is_varargs).unwrap_or(false),
            modifiers,
            annotations,
            enclosing_class: class_ref.clone(),
            location,
        }));

        let mut locals = field_types.clone();
        for param in params {
            if let TypeRef::Reference(t) = &param.declared_type {
                locals.insert(param.name.clone(), t.clone());
            }
            let location = self.location(param.node);
            self.declarations.push(Declaration::Parameter(ParameterDecl {
                name: param.name,
                declared_type: param.declared_type,
                modifiers: param.modifiers,
                annotations: param.annotations,
                method: name.clone(),
                enclosing_class: class_ref.clone(),
                location,
            }));
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.walk_calls(body, calling_class, &mut locals);
        }
    }

    /// Members of an anonymous class or enum constant body. Methods are
    /// recorded on a synthetic `Outer$N` class; calls keep the enclosing
    /// class as caller.
    fn visit_anonymous_body(
        &mut self,
        body: Node<'a>,
        calling_class: &str,
        locals: &mut HashMap<String, String>,
    ) {
        self.anonymous_classes += 1;
        let class_ref = ClassRef {
            qualified_name: format!("{}${}", calling_class, self.anonymous_classes),
            is_interface: false,
        };
        let members: Vec<Node> = body.named_children(&mut body.walk()).collect();
        for member in members {
            if member.kind() == "method_declaration" {
                self.visit_method(member, &class_ref, calling_class, locals);
            } else {
                self.walk_calls(member, calling_class, locals);
            }
        }
    }

    fn parameters(&self, node: Node<'a>) -> Vec<ParamInfo<'a>> {
        let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
        let mut params = Vec::new();

        for child in children {
            match child.kind() {
                "formal_parameter" => {
                    let (modifiers, annotations) = self.modifiers(child);
                    let name = match child.child_by_field_name("name") {
                        Some(n) => self.text(n).to_string(),
                        None => continue,
                    };
                    let mut declared_type = child
                        .child_by_field_name("type")
                        .map(|t| self.type_ref(t))
                        .unwrap_or(TypeRef::Void);
                    // `String args[]`
                    if let Some(d) = child.child_by_field_name("dimensions") {
                        declared_type = TypeRef::Reference(format!(
                            "{}{}",
                            declared_type.name(),
                            "[]".repeat(self.text(d).matches('[').count())
                        ));
                    }
                    params.push(ParamInfo {
                        name,
                        declared_type,
                        modifiers,
                        annotations,
                        is_varargs: false,
                        node: child,
                    });
                }
                "spread_parameter" => {
                    let (modifiers, annotations) = self.modifiers(child);
                    let parts: Vec<Node> = child.named_children(&mut child.walk()).collect();
                    let element = parts.iter().find(|n| {
                        !matches!(n.kind(), "modifiers" | "variable_declarator" | "identifier")
                    });
                    let name = parts
                        .iter()
                        .find(|n| n.kind() == "variable_declarator")
                        .and_then(|d| d.child_by_field_name("name"))
                        .or_else(|| parts.iter().rev().find(|n| n.kind() == "identifier").copied());
                    let (element, name) = match (element, name) {
                        (Some(e), Some(n)) => (*e, n),
                        _ => continue,
                    };
                    params.push(ParamInfo {
                        name: self.text(name).to_string(),
                        declared_type: TypeRef::Reference(format!(
                            "{}[]",
                            self.type_ref(element).name()
                        )),
                        modifiers,
                        annotations,
                        is_varargs: true,
                        node: child,
                    });
                }
                // receiver_parameter and comments
                _ => {}
            }
        }
        params
    }

    /// Record call expressions below `node`. Named types declared inside
    /// (local classes) get their own facts.
    fn walk_calls(
        &mut self,
        node: Node<'a>,
        calling_class: &str,
        locals: &mut HashMap<String, String>,
    ) {
        match node.kind() {
            k if is_type_declaration(k) => {
                self.visit_type(node, Some(calling_class));
                return;
            }
            "local_variable_declaration" => {
                if let Some(TypeRef::Reference(t)) = self.local_type(node) {
                    let declarators: Vec<Node> = node
                        .children_by_field_name("declarator", &mut node.walk())
                        .collect();
                    for d in declarators {
                        if let Some(name) = d.child_by_field_name("name") {
                            locals.insert(self.text(name).to_string(), t.clone());
                        }
                    }
                }
            }
            "enhanced_for_statement" => {
                if let (Some(TypeRef::Reference(t)), Some(name)) =
                    (self.local_type(node), node.child_by_field_name("name"))
                {
                    locals.insert(self.text(name).to_string(), t);
                }
            }
            "method_invocation" => self.record_method_call(node, calling_class, locals),
            "object_creation_expression" => self.record_constructor_call(node, calling_class),
            "class_body" => {
                let anonymous = node.parent().map_or(false, |p| {
                    matches!(p.kind(), "object_creation_expression" | "enum_constant")
                });
                if anonymous {
                    self.visit_anonymous_body(node, calling_class, locals);
                    return;
                }
            }
            _ => {}
        }

        let children: Vec<Node> = node.named_children(&mut node.walk()).collect();
        for child in children {
            self.walk_calls(child, calling_class, locals);
        }
    }

    /// Declared type of a local; `var` gives nothing.
    fn local_type(&self, node: Node) -> Option<TypeRef> {
        let t = node.child_by_field_name("type")?;
        if self.text(t) == "var" {
            return None;
        }
        Some(self.type_ref(t))
    }

    fn record_method_call(
        &mut self,
        node: Node<'a>,
        calling_class: &str,
        locals: &HashMap<String, String>,
    ) {
        let name = match node.child_by_field_name("name") {
            Some(n) => self.text(n).to_string(),
            None => return,
        };
        let receiver = match node.child_by_field_name("object") {
            None => Receiver::Implicit,
            Some(object) => self.receiver(object, locals),
        };
        let arg_count = node
            .child_by_field_name("arguments")
            .map(count_arguments)
            .unwrap_or(0);
        let location = self.location(node);

        self.calls.push(CallExpr {
            name,
            receiver,
            arg_count,
            is_constructor: false,
            calling_class: calling_class.to_string(),
            location,
        });
    }

    fn record_constructor_call(&mut self, node: Node<'a>, calling_class: &str) {
        let qualified = match node.child_by_field_name("type").map(|t| self.type_ref(t)) {
            Some(TypeRef::Reference(q)) => q,
            _ => return,
        };
        let arg_count = node
            .child_by_field_name("arguments")
            .map(count_arguments)
            .unwrap_or(0);
        let location = self.location(node);

        self.calls.push(CallExpr {
            name: simple_name(&qualified).to_string(),
            receiver: Receiver::Type(qualified),
            arg_count,
            is_constructor: true,
            calling_class: calling_class.to_string(),
            location,
        });
    }

    fn receiver(&self, object: Node, locals: &HashMap<String, String>) -> Receiver {
        match object.kind() {
            "this" => Receiver::This,
            "super" => Receiver::Super,
            "identifier" => {
                let name = self.text(object);
                if let Some(t) = locals.get(name) {
                    Receiver::Typed(t.clone())
                } else if starts_uppercase(name) {
                    Receiver::Type(self.scope.qualify(name))
                } else {
                    Receiver::Unknown
                }
            }
            "field_access" => {
                let target = object.child_by_field_name("object");
                let field = object.child_by_field_name("field");
                match (target, field) {
                    (Some(t), Some(f)) if t.kind() == "this" => locals
                        .get(self.text(f))
                        .map(|ty| Receiver::Typed(ty.clone()))
                        .unwrap_or(Receiver::Unknown),
                    _ => {
                        let text = self.text(object);
                        if is_type_path(text) {
                            Receiver::Type(self.scope.qualify(text))
                        } else {
                            Receiver::Unknown
                        }
                    }
                }
            }
            "object_creation_expression" | "cast_expression" => {
                match object.child_by_field_name("type").map(|t| self.type_ref(t)) {
                    Some(TypeRef::Reference(q)) => Receiver::Typed(q),
                    _ => Receiver::Unknown,
                }
            }
            "parenthesized_expression" => match object.named_child(0) {
                Some(inner) => self.receiver(inner, locals),
                None => Receiver::Unknown,
            },
            _ => Receiver::Unknown,
        }
    }
}

/// Members of a class body; enum bodies nest theirs one level deeper.
fn class_members(body: Node) -> Vec<Node> {
    let mut members = Vec::new();
    let children: Vec<Node> = body.named_children(&mut body.walk()).collect();
    for child in children {
        if child.kind() == "enum_body_declarations" {
            members.extend(child.named_children(&mut child.walk()));
        } else {
            members.push(child);
        }
    }
    members
}

fn count_arguments(arguments: Node) -> usize {
    arguments
        .named_children(&mut arguments.walk())
        .filter(|n| !matches!(n.kind(), "line_comment" | "block_comment"))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DeclarationKind;

    fn facts(source: &str) -> FileFacts {
        let analyzer = JavaAnalyzer::new();
        let parsed = analyzer
            .parse(Path::new("Test.java"), source.as_bytes())
            .unwrap();
        analyzer.extract_facts(&parsed).unwrap()
    }

    fn field<'f>(facts: &'f FileFacts, name: &str) -> &'f FieldDecl {
        match facts.find_declaration(DeclarationKind::Field, name) {
            Some(Declaration::Field(f)) => f,
            _ => panic!("no field {name}"),
        }
    }

    fn param<'f>(facts: &'f FileFacts, name: &str) -> &'f ParameterDecl {
        match facts.find_declaration(DeclarationKind::Parameter, name) {
            Some(Declaration::Parameter(p)) => p,
            _ => panic!("no parameter {name}"),
        }
    }

    #[test]
    fn test_class_annotations_and_supertypes() {
        let f = facts(
            r#"
package com.example;

import com.google.errorprone.annotations.Immutable;
import java.util.Observable;

@Immutable
public final class Point extends Observable implements Comparable<Point>, java.io.Serializable {
    private final int x;
    private transient String cache;
}
"#,
        );

        assert_eq!(f.package.as_deref(), Some("com.example"));
        let class = f.classes().next().unwrap();
        assert_eq!(class.qualified_name, "com.example.Point");
        assert_eq!(
            class.annotations,
            vec!["com.google.errorprone.annotations.Immutable".to_string()]
        );
        assert_eq!(
            class.supertypes,
            vec![
                "java.util.Observable".to_string(),
                "java.lang.Comparable".to_string(),
                "java.io.Serializable".to_string()
            ]
        );
        assert!(class.modifiers.contains(&Modifier::Final));
        assert_eq!(class.fields.len(), 2);
    }

    #[test]
    fn test_field_types_and_modifiers() {
        let f = facts(
            r#"
package p;

import java.util.List;
import javax.annotation.Nullable;

class A {
    private int count;
    @Nullable private List<String> names, aliases;
    private final String id = "x";
    private long[] stamps;
}
"#,
        );

        assert_eq!(field(&f, "count").declared_type, TypeRef::Primitive("int".to_string()));
        let names = field(&f, "names");
        assert_eq!(names.declared_type, TypeRef::Reference("java.util.List".to_string()));
        assert_eq!(names.annotations, vec!["javax.annotation.Nullable".to_string()]);
        assert_eq!(field(&f, "aliases").annotations.len(), 1);
        assert!(field(&f, "id").is_final());
        assert_eq!(field(&f, "stamps").declared_type, TypeRef::Reference("long[]".to_string()));
        assert_eq!(field(&f, "count").enclosing_class.qualified_name, "p.A");
    }

    #[test]
    fn test_methods_and_parameters() {
        let f = facts(
            r#"
package p;

interface Shape {
    double area(String unit);
}

class Box {
    Box(final int size) {}
    void resize(int w, final String... labels) {}
}
"#,
        );

        let unit = param(&f, "unit");
        assert!(unit.enclosing_class.is_interface);
        assert_eq!(unit.method, "area");

        let size = param(&f, "size");
        assert!(size.is_final());
        assert!(!size.enclosing_class.is_interface);

        let labels = param(&f, "labels");
        assert_eq!(labels.declared_type, TypeRef::Reference("java.lang.String[]".to_string()));

        let ctor = f.methods().find(|m| m.is_constructor).unwrap();
        assert_eq!(ctor.name, "Box");
        assert_eq!(ctor.return_type, TypeRef::Void);
        assert_eq!(ctor.parameter_types, vec!["int".to_string()]);

        let resize = f.methods().find(|m| m.name == "resize").unwrap();
        assert!(resize.is_varargs);
        assert_eq!(
            resize.parameter_types,
            vec!["int".to_string(), "java.lang.String[]".to_string()]
        );
        assert_eq!(resize.return_type, TypeRef::Void);
    }

    #[test]
    fn test_interface_constants_are_final() {
        let f = facts("interface Limits { String NAME = \"x\"; }");
        assert!(field(&f, "NAME").is_final());
    }

    #[test]
    fn test_nested_types_are_qualified() {
        let f = facts(
            r#"
package p;
class Outer {
    static class Inner extends Outer {}
    Inner make() { return new Inner(); }
}
"#,
        );
        let names: Vec<_> = f.classes().map(|c| c.qualified_name.clone()).collect();
        assert_eq!(names, vec!["p.Outer".to_string(), "p.Outer.Inner".to_string()]);

        let inner = f.classes().nth(1).unwrap();
        assert_eq!(inner.supertypes, vec!["p.Outer".to_string()]);

        let make = f.methods().find(|m| m.name == "make").unwrap();
        assert_eq!(make.return_type, TypeRef::Reference("p.Outer.Inner".to_string()));
    }

    #[test]
    fn test_call_receivers() {
        let f = facts(
            r#"
package p;

import java.util.Date;
import java.util.List;

class Caller {
    private List<String> items;

    void run(Helper helper) {
        helper.bar(1);
        this.items.clear();
        local();
        super.toString();
        System.exit(0);
        Date d = new Date();
        d.getTime();
        compute().value();
    }
}
"#,
        );

        let receivers: Vec<(String, Receiver)> = f
            .calls
            .iter()
            .map(|c| (c.name.clone(), c.receiver.clone()))
            .collect();

        assert!(receivers.contains(&("bar".to_string(), Receiver::Typed("p.Helper".to_string()))));
        assert!(receivers.contains(&(
            "clear".to_string(),
            Receiver::Typed("java.util.List".to_string())
        )));
        assert!(receivers.contains(&("local".to_string(), Receiver::Implicit)));
        assert!(receivers.contains(&("toString".to_string(), Receiver::Super)));
        assert!(receivers.contains(&(
            "exit".to_string(),
            Receiver::Type("java.lang.System".to_string())
        )));
        assert!(receivers.contains(&(
            "Date".to_string(),
            Receiver::Type("java.util.Date".to_string())
        )));
        assert!(receivers.contains(&(
            "getTime".to_string(),
            Receiver::Typed("java.util.Date".to_string())
        )));
        assert!(receivers.contains(&("value".to_string(), Receiver::Unknown)));

        let date = f.calls.iter().find(|c| c.name == "Date").unwrap();
        assert!(date.is_constructor);
        assert_eq!(date.arg_count, 0);
        assert_eq!(date.calling_class, "p.Caller");

        let bar = f.calls.iter().find(|c| c.name == "bar").unwrap();
        assert_eq!(bar.arg_count, 1);
    }

    #[test]
    fn test_anonymous_class_methods_are_declarations() {
        let f = facts(
            r#"
package p;

class Scheduler {
    void start(final String name) {
        Runnable task = new Runnable() {
            public void handle(String event) {
                log(event);
            }
        };
    }
}
"#,
        );

        let event = param(&f, "event");
        assert_eq!(event.method, "handle");
        assert_eq!(event.enclosing_class.qualified_name, "p.Scheduler$1");
        assert!(!event.enclosing_class.is_interface);
        assert!(!event.is_final());

        let handle = f.methods().find(|m| m.name == "handle").unwrap();
        assert_eq!(handle.parameter_types, vec!["java.lang.String".to_string()]);

        let log = f.calls.iter().find(|c| c.name == "log").unwrap();
        assert_eq!(log.calling_class, "p.Scheduler");
    }

    #[test]
    fn test_enum_constant_body_methods_are_declarations() {
        let f = facts(
            r#"
package p;

enum Op {
    PLUS {
        int apply(int a, final int b) { return a + b; }
    };

    abstract int apply(final int a, final int b);
}
"#,
        );

        let body_params: Vec<_> = f
            .declarations
            .iter()
            .filter_map(|d| match d {
                Declaration::Parameter(p) if p.enclosing_class.qualified_name == "p.Op$1" => {
                    Some((p.name.clone(), p.is_final()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            body_params,
            vec![("a".to_string(), false), ("b".to_string(), true)]
        );
    }

    #[test]
    fn test_multiple_declarators_have_distinct_locations() {
        let f = facts("class Pair {\n    private int left, right;\n}\n");
        let left = field(&f, "left");
        let right = field(&f, "right");
        assert_eq!(left.location.line, 2);
        assert_eq!(right.location.line, 2);
        assert_eq!(left.location.column, 5);
        assert_eq!(right.location.column, 23);
    }

    #[test]
    fn test_erase_generics() {
        assert_eq!(erase_generics("Map<String, List<Integer>>"), "Map");
        assert_eq!(erase_generics("java.util.List<T>[]"), "java.util.List[]");
    }
}
