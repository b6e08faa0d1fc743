//! Dispatch of facts to the policy evaluators.

use crate::analysis::{CallSite, Declaration, FileFacts, TypeHierarchy};
use crate::config::{Checks, RulesSource};
use crate::rules::{ConfigError, RuleStore, RuleStoreCell};

use super::{blacklist, immutable, nullity, params, symbols, DiagnosticSink};

/// Evaluates declaration and call facts against the enabled checks.
///
/// The engine owns the run's [`RuleStoreCell`]. The rule file is resolved
/// and loaded the first time a blacklist check needs it and is shared by
/// reference afterwards, so one engine can be used from many threads.
#[derive(Debug)]
pub struct Engine {
    checks: Checks,
    source: RulesSource,
    store: RuleStoreCell,
}

impl Engine {
    pub fn new(checks: Checks, source: RulesSource) -> Self {
        Self {
            checks,
            source,
            store: RuleStoreCell::new(),
        }
    }

    /// An engine whose rules were built in code; nothing is read from disk.
    pub fn with_rules(checks: Checks, rules: RuleStore) -> Self {
        Self {
            checks,
            source: RulesSource::default(),
            store: RuleStoreCell::with_store(rules),
        }
    }

    pub fn checks(&self) -> Checks {
        self.checks
    }

    /// The rule store, loading it on first use.
    pub fn rules(&self) -> Result<&RuleStore, ConfigError> {
        self.store.get_or_load_with(|| {
            let path = self.source.resolve();
            log::debug!("resolved rule file {}", path.display());
            path
        })
    }

    /// Run every enabled declaration check on one declaration.
    pub fn check_declaration(
        &self,
        decl: &Declaration,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), ConfigError> {
        match decl {
            Declaration::Class(class) => {
                if self.checks.immutable {
                    immutable::check_immutable_class(class, sink);
                }
                if self.checks.blacklist && !class.supertypes.is_empty() {
                    symbols::check_blacklisted_base_classes(class, self.rules()?, sink);
                }
            }
            Declaration::Parameter(param) => {
                if self.checks.final_parameters {
                    params::check_final_parameter(param, sink);
                }
            }
            Declaration::Field(_) | Declaration::Method(_) => {}
        }

        if self.checks.nullity {
            nullity::check_nullity(decl, sink);
        }
        if self.checks.blacklist && !decl.annotations().is_empty() {
            symbols::check_blacklisted_annotations(decl, self.rules()?, sink);
        }
        Ok(())
    }

    /// Run the usage check on one resolved call.
    pub fn check_call(
        &self,
        call: &CallSite,
        hierarchy: &dyn TypeHierarchy,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), ConfigError> {
        if !self.checks.blacklist || call.target_class.is_none() {
            return Ok(());
        }
        blacklist::check_call(call, self.rules()?, hierarchy, sink);
        Ok(())
    }

    /// Evaluate every declaration of a file, then its resolved calls.
    pub fn check_file(
        &self,
        facts: &FileFacts,
        calls: &[CallSite],
        hierarchy: &dyn TypeHierarchy,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), ConfigError> {
        for decl in &facts.declarations {
            self.check_declaration(decl, sink)?;
        }
        for call in calls {
            self.check_call(call, hierarchy, sink)?;
        }
        Ok(())
    }
}
