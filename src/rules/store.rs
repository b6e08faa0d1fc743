//! Indexed, frozen rule tables and the publish-once cell that owns them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;

use super::{AnnotationRule, BaseClassRule, ConfigError, JavadocTagRule, MethodRule};

/// Mutable indices filled while a rule file is parsed.
///
/// Only the loader holds one; [`RuleStoreBuilder::build`] freezes it.
#[derive(Debug, Default)]
pub struct RuleStoreBuilder {
    methods: HashMap<String, Vec<MethodRule>>,
    constructors: HashMap<String, Vec<MethodRule>>,
    annotations: HashMap<String, AnnotationRule>,
    base_classes: HashMap<String, BaseClassRule>,
    javadoc_tags: HashMap<String, JavadocTagRule>,
}

impl RuleStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method rule. Identical rules are kept once.
    pub fn add_method(&mut self, rule: MethodRule) -> &mut Self {
        push_unique(&mut self.methods, rule);
        self
    }

    /// Register a constructor rule. Identical rules are kept once.
    pub fn add_constructor(&mut self, rule: MethodRule) -> &mut Self {
        push_unique(&mut self.constructors, rule);
        self
    }

    /// Register an annotation rule; replaces any earlier rule for the same name.
    pub fn add_annotation(&mut self, rule: AnnotationRule) -> &mut Self {
        self.annotations.insert(rule.qualified_name.clone(), rule);
        self
    }

    /// Register a base-class rule; replaces any earlier rule for the same name.
    pub fn add_base_class(&mut self, rule: BaseClassRule) -> &mut Self {
        self.base_classes.insert(rule.qualified_name.clone(), rule);
        self
    }

    /// Register a javadoc tag rule; replaces any earlier rule for the same tag.
    pub fn add_javadoc_tag(&mut self, rule: JavadocTagRule) -> &mut Self {
        self.javadoc_tags.insert(rule.tag_name.clone(), rule);
        self
    }

    pub fn build(self) -> RuleStore {
        RuleStore {
            methods: self.methods,
            constructors: self.constructors,
            annotations: self.annotations,
            base_classes: self.base_classes,
            javadoc_tags: self.javadoc_tags,
        }
    }
}

fn push_unique(index: &mut HashMap<String, Vec<MethodRule>>, rule: MethodRule) {
    let bucket = index.entry(rule.simple_name.clone()).or_default();
    if !bucket.contains(&rule) {
        bucket.push(rule);
    }
}

/// Read-only rule tables.
///
/// There are no mutating methods; a store is only ever produced by
/// [`RuleStoreBuilder::build`].
#[derive(Debug, Default)]
pub struct RuleStore {
    methods: HashMap<String, Vec<MethodRule>>,
    constructors: HashMap<String, Vec<MethodRule>>,
    annotations: HashMap<String, AnnotationRule>,
    base_classes: HashMap<String, BaseClassRule>,
    javadoc_tags: HashMap<String, JavadocTagRule>,
}

impl RuleStore {
    /// An empty store, for hosts that run without a blacklist.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Find the rule blocking an invocation.
    ///
    /// Picks the constructor or method index, then returns the first rule
    /// registered under `simple_name` whose parameter list is a wildcard or
    /// equals `formal_params` position by position. The rule's declaring class
    /// plays no part in the match.
    pub fn match_invocation(
        &self,
        simple_name: &str,
        formal_params: &[String],
        is_constructor: bool,
    ) -> Option<&MethodRule> {
        let index = if is_constructor {
            &self.constructors
        } else {
            &self.methods
        };
        index
            .get(simple_name)?
            .iter()
            .find(|rule| rule.accepts(formal_params))
    }

    pub fn annotation_rule(&self, qualified_name: &str) -> Option<&AnnotationRule> {
        self.annotations.get(qualified_name)
    }

    pub fn base_class_rule(&self, qualified_name: &str) -> Option<&BaseClassRule> {
        self.base_classes.get(qualified_name)
    }

    /// Look up a javadoc tag rule; a leading `@` on `tag` is ignored.
    pub fn javadoc_tag_rule(&self, tag: &str) -> Option<&JavadocTagRule> {
        self.javadoc_tags.get(tag.trim_start_matches('@'))
    }

    /// All method rules, sorted by simple name (registration order within a name).
    pub fn method_rules(&self) -> Vec<&MethodRule> {
        sorted_multi(&self.methods)
    }

    /// All constructor rules, sorted by simple name (registration order within a name).
    pub fn constructor_rules(&self) -> Vec<&MethodRule> {
        sorted_multi(&self.constructors)
    }

    pub fn annotation_rules(&self) -> Vec<&AnnotationRule> {
        let mut rules: Vec<_> = self.annotations.values().collect();
        rules.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        rules
    }

    pub fn base_class_rules(&self) -> Vec<&BaseClassRule> {
        let mut rules: Vec<_> = self.base_classes.values().collect();
        rules.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        rules
    }

    pub fn javadoc_tag_rules(&self) -> Vec<&JavadocTagRule> {
        let mut rules: Vec<_> = self.javadoc_tags.values().collect();
        rules.sort_by(|a, b| a.tag_name.cmp(&b.tag_name));
        rules
    }

    /// Total number of rules across every index.
    pub fn len(&self) -> usize {
        self.methods.values().map(Vec::len).sum::<usize>()
            + self.constructors.values().map(Vec::len).sum::<usize>()
            + self.annotations.len()
            + self.base_classes.len()
            + self.javadoc_tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One-line count summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} method, {} constructor, {} annotation, {} base-class, {} javadoc rules",
            self.methods.values().map(Vec::len).sum::<usize>(),
            self.constructors.values().map(Vec::len).sum::<usize>(),
            self.annotations.len(),
            self.base_classes.len(),
            self.javadoc_tags.len()
        )
    }
}

fn sorted_multi(index: &HashMap<String, Vec<MethodRule>>) -> Vec<&MethodRule> {
    let mut names: Vec<_> = index.keys().collect();
    names.sort();
    names
        .into_iter()
        .flat_map(|name| index[name].iter())
        .collect()
}

/// Holds the rule store of a run and loads it exactly once.
///
/// The first successful load wins; later calls return the published store
/// and never look at their path argument. A failed load publishes nothing.
/// Concurrent first callers block until the single initializer finishes.
#[derive(Debug, Default)]
pub struct RuleStoreCell {
    store: OnceCell<RuleStore>,
}

impl RuleStoreCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cell that is already published, for hosts that build rules in code.
    pub fn with_store(store: RuleStore) -> Self {
        Self {
            store: OnceCell::with_value(store),
        }
    }

    /// Load `path` unless a store has already been published.
    pub fn load(&self, path: &Path) -> Result<&RuleStore, ConfigError> {
        self.get_or_load_with(|| path.to_path_buf())
    }

    /// Like [`RuleStoreCell::load`], but the path is only computed when a load
    /// actually happens.
    pub fn get_or_load_with<F>(&self, resolve: F) -> Result<&RuleStore, ConfigError>
    where
        F: FnOnce() -> PathBuf,
    {
        self.store.get_or_try_init(|| {
            let path = resolve();
            let store = super::load(&path)?;
            log::info!("loaded {} from {}", store.summary(), path.display());
            Ok(store)
        })
    }

    /// The published store, if any.
    pub fn get(&self) -> Option<&RuleStore> {
        self.store.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.store.get().is_some()
    }
}
