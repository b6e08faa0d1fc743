//! Cross-file class index: supertypes and member signatures.
//!
//! The index resolves raw call expressions to the method or constructor they
//! invoke and answers subtype questions for the blacklist exemption.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{CallExpr, CallSite, Declaration, FileFacts, Receiver, TypeHierarchy};

/// Formal signature of one method or constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature {
    name: String,
    params: Vec<String>,
    is_varargs: bool,
}

impl Signature {
    fn accepts_arity(&self, arg_count: usize) -> bool {
        if self.is_varargs {
            arg_count + 1 >= self.params.len()
        } else {
            self.params.len() == arg_count
        }
    }
}

#[derive(Debug, Default)]
struct ClassEntry {
    supertypes: Vec<String>,
    methods: Vec<Signature>,
    constructors: Vec<Signature>,
}

/// Outcome of looking a call up in one class.
enum Lookup<'a> {
    Found(&'a str, &'a Signature),
    Ambiguous,
    Missing,
}

/// Index of every class declared in the analyzed sources.
#[derive(Debug, Default)]
pub struct ClassIndex {
    classes: HashMap<String, ClassEntry>,
}

impl ClassIndex {
    pub fn build<'a, I>(facts: I) -> Self
    where
        I: IntoIterator<Item = &'a FileFacts>,
    {
        let mut classes: HashMap<String, ClassEntry> = HashMap::new();

        for file in facts {
            for decl in &file.declarations {
                match decl {
                    Declaration::Class(class) => {
                        classes
                            .entry(class.qualified_name.clone())
                            .or_default()
                            .supertypes = class.supertypes.clone();
                    }
                    Declaration::Method(method) => {
                        let entry = classes
                            .entry(method.enclosing_class.qualified_name.clone())
                            .or_default();
                        let signature = Signature {
                            name: method.name.clone(),
                            params: method.parameter_types.clone(),
                            is_varargs: method.is_varargs,
                        };
                        if method.is_constructor {
                            entry.constructors.push(signature);
                        } else {
                            entry.methods.push(signature);
                        }
                    }
                    Declaration::Field(_) | Declaration::Parameter(_) => {}
                }
            }
        }

        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Whether `qualified_name` was declared in the analyzed sources.
    pub fn contains(&self, qualified_name: &str) -> bool {
        self.classes.contains_key(qualified_name)
    }

    /// Directly declared supertypes; empty for unknown classes.
    pub fn supertypes(&self, qualified_name: &str) -> &[String] {
        self.classes
            .get(qualified_name)
            .map(|c| c.supertypes.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve a call expression to a call site.
    ///
    /// Unresolvable calls come back with `target_class: None`; they can never
    /// match a rule.
    pub fn resolve(&self, call: &CallExpr) -> CallSite {
        let resolved = if call.is_constructor {
            self.resolve_constructor(call)
        } else {
            self.resolve_method(call)
        };

        let (target_class, formal_params) = match resolved {
            Some((class, params)) => (Some(class), params),
            None => (None, Vec::new()),
        };

        CallSite {
            target_name: call.name.clone(),
            target_class,
            is_constructor: call.is_constructor,
            formal_params,
            calling_class: call.calling_class.clone(),
            location: call.location.clone(),
        }
    }

    fn resolve_constructor(&self, call: &CallExpr) -> Option<(String, Vec<String>)> {
        let class = match &call.receiver {
            Receiver::Type(class) => class,
            _ => return None,
        };

        match self.classes.get(class) {
            Some(entry) if entry.constructors.is_empty() => {
                // Only the implicit no-argument constructor exists.
                (call.arg_count == 0).then(|| (class.clone(), Vec::new()))
            }
            Some(entry) => {
                let mut applicable = entry
                    .constructors
                    .iter()
                    .filter(|c| c.accepts_arity(call.arg_count));
                match (applicable.next(), applicable.next()) {
                    (Some(sig), None) => Some((class.clone(), sig.params.clone())),
                    _ => None,
                }
            }
            None => (call.arg_count == 0).then(|| (class.clone(), Vec::new())),
        }
    }

    fn resolve_method(&self, call: &CallExpr) -> Option<(String, Vec<String>)> {
        let starts: Vec<String> = match &call.receiver {
            Receiver::Implicit => self.enclosing_chain(&call.calling_class),
            Receiver::This => vec![call.calling_class.clone()],
            Receiver::Super => {
                let supertypes = self.supertypes(&call.calling_class).to_vec();
                if supertypes.is_empty() {
                    vec!["java.lang.Object".to_string()]
                } else {
                    supertypes
                }
            }
            Receiver::Type(class) | Receiver::Typed(class) => vec![class.clone()],
            Receiver::Unknown => return None,
        };

        for start in &starts {
            match self.lookup(start, &call.name, call.arg_count) {
                Lookup::Found(class, sig) => return Some((class.to_string(), sig.params.clone())),
                Lookup::Ambiguous => return None,
                Lookup::Missing => {}
            }
        }

        // A receiver outside the sources: only a no-argument call has a
        // signature we know without its declaration.
        match starts.first() {
            Some(class) if !self.contains(class) && call.arg_count == 0 => {
                Some((class.clone(), Vec::new()))
            }
            _ => None,
        }
    }

    /// The calling class followed by its indexed enclosing classes.
    fn enclosing_chain(&self, calling_class: &str) -> Vec<String> {
        let mut chain = vec![calling_class.to_string()];
        let mut current = calling_class;
        while let Some((outer, _)) = current.rsplit_once('.') {
            if !self.contains(outer) {
                break;
            }
            chain.push(outer.to_string());
            current = outer;
        }
        chain
    }

    /// Breadth-first search from `start` through its supertypes. The first
    /// class declaring matching overloads decides the outcome.
    fn lookup<'a>(&'a self, start: &str, name: &str, arg_count: usize) -> Lookup<'a> {
        let mut queue = VecDeque::from([start.to_string()]);
        let mut seen = HashSet::new();

        while let Some(class) = queue.pop_front() {
            if !seen.insert(class.clone()) {
                continue;
            }
            let (key, entry) = match self.classes.get_key_value(&class) {
                Some(found) => found,
                None => continue,
            };

            let mut applicable = entry
                .methods
                .iter()
                .filter(|m| m.name == name && m.accepts_arity(arg_count));
            match (applicable.next(), applicable.next()) {
                (Some(sig), None) => return Lookup::Found(key, sig),
                (Some(_), Some(_)) => return Lookup::Ambiguous,
                _ => {}
            }
            queue.extend(entry.supertypes.iter().cloned());
        }
        Lookup::Missing
    }
}

impl TypeHierarchy for ClassIndex {
    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let mut queue = VecDeque::from([sub]);
        let mut seen = HashSet::new();

        while let Some(class) = queue.pop_front() {
            if class == sup {
                return true;
            }
            if !seen.insert(class) {
                continue;
            }
            queue.extend(self.supertypes(class).iter().map(String::as_str));
        }
        false
    }
}
