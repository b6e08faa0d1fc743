//! Detection runner that orchestrates a policy check.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::analysis::{AnalysisContext, CallSite};
use crate::rules::ConfigError;

use super::{collect_suppressions, filter_suppressed, Diagnostic, DetectionResult, Engine};

/// Executes the policy checks against a set of files.
pub struct Runner {
    base_dir: PathBuf,
    engine: Engine,
}

impl Runner {
    /// Create a new detection runner.
    pub fn new<P: AsRef<Path>>(base_dir: P, engine: Engine) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            engine,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Analyze `files` and evaluate every fact.
    ///
    /// A rule file problem aborts the run with a [`ConfigError`] (reachable
    /// through `anyhow::Error::downcast_ref`) and no diagnostics at all.
    pub fn run(&self, files: &[PathBuf]) -> anyhow::Result<DetectionResult> {
        // Load up front so a broken rule file fails the run even when no
        // fact would have consulted it.
        if self.engine.checks().blacklist {
            self.engine.rules()?;
        }

        let ctx = AnalysisContext::new(&self.base_dir);
        let all_facts = ctx.analyze_files_parallel(files)?;
        let index = ctx.class_index();
        log::debug!(
            "indexed {} classes from {} files",
            index.len(),
            all_facts.len()
        );

        let per_file: Vec<Result<(Vec<Diagnostic>, usize), ConfigError>> = all_facts
            .par_iter()
            .map(|facts| {
                let calls: Vec<CallSite> = facts.calls.iter().map(|c| index.resolve(c)).collect();
                let unresolved = calls.iter().filter(|c| c.target_class.is_none()).count();

                let mut diagnostics = Vec::new();
                self.engine
                    .check_file(facts, &calls, &index, &mut diagnostics)?;
                Ok((diagnostics, unresolved))
            })
            .collect();

        let mut result = DetectionResult::new();
        result.scanned = all_facts.len();
        for outcome in per_file {
            let (diagnostics, unresolved) = outcome?;
            result.diagnostics.extend(diagnostics);
            result.unresolved_calls += unresolved;
        }
        if result.unresolved_calls > 0 {
            log::debug!(
                "{} calls could not be resolved and were not checked",
                result.unresolved_calls
            );
        }

        let suppressions = collect_suppressions(&self.base_dir, files);
        if !suppressions.is_empty() {
            let (active, suppressed) = filter_suppressed(result.diagnostics, &suppressions);
            result.diagnostics = active;
            result.suppressed = suppressed;
        }

        result.sort();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Checks, RulesSource};
    use crate::detect::IssueKind;
    use std::fs;
    use tempfile::TempDir;

    const RULES: &str = r#"<blacklist>
  <method class="com.x.Foo" name="bar" params="int" message="Use Foo.baz instead"/>
</blacklist>
"#;

    fn checks_blacklist_only() -> Checks {
        Checks {
            immutable: false,
            nullity: false,
            final_parameters: false,
            blacklist: true,
        }
    }

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_runner_reports_blacklisted_call() {
        let temp = TempDir::new().unwrap();
        let rules = write(temp.path(), "blacklist.xml", RULES);
        let foo = write(
            temp.path(),
            "com/x/Foo.java",
            "package com.x;\npublic class Foo {\n    public void bar(int n) {}\n}\n",
        );
        let other = write(
            temp.path(),
            "com/y/Other.java",
            "package com.y;\nimport com.x.Foo;\nclass Other {\n    void run(Foo foo) {\n        foo.bar(1);\n    }\n}\n",
        );

        let engine = Engine::new(checks_blacklist_only(), RulesSource::fixed(rules));
        let runner = Runner::new(temp.path(), engine);
        let result = runner.run(&[foo, other]).unwrap();

        assert_eq!(result.scanned, 2);
        assert_eq!(result.diagnostics.len(), 1);
        let diag = &result.diagnostics[0];
        assert_eq!(diag.kind, IssueKind::BlacklistedMethod);
        assert_eq!(diag.message, "Use Foo.baz instead");
        assert_eq!(diag.line, 5);
        assert!(diag.file.ends_with("Other.java"));
    }

    #[test]
    fn test_runner_with_suppression() {
        let temp = TempDir::new().unwrap();
        let rules = write(temp.path(), "blacklist.xml", RULES);
        let foo = write(
            temp.path(),
            "com/x/Foo.java",
            "package com.x;\npublic class Foo {\n    public void bar(int n) {}\n}\n",
        );
        let other = write(
            temp.path(),
            "com/y/Other.java",
            "package com.y;\nimport com.x.Foo;\nclass Other {\n    void run(Foo foo) {\n        // policycheck:ignore blacklisted_method - migration pending\n        foo.bar(1);\n    }\n}\n",
        );

        let engine = Engine::new(checks_blacklist_only(), RulesSource::fixed(rules));
        let result = Runner::new(temp.path(), engine).run(&[foo, other]).unwrap();

        assert!(result.diagnostics.is_empty());
        assert_eq!(result.suppressed_count(), 1);
        assert_eq!(result.suppressed[0].suppression.reason, "migration pending");
    }

    #[test]
    fn test_bad_rule_file_aborts_run() {
        let temp = TempDir::new().unwrap();
        let rules = write(temp.path(), "blacklist.xml", "<rules><method class=\"a.B\" name=\"c\"/></rules>");
        let source = write(temp.path(), "A.java", "class A { void f(String s) {} }\n");

        let engine = Engine::new(Checks::default(), RulesSource::fixed(rules));
        let err = Runner::new(temp.path(), engine).run(&[source]).unwrap_err();

        let config_error = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(config_error, ConfigError::UnexpectedRoot { .. }));
    }

    #[test]
    fn test_output_is_sorted() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "A.java", "class A {\n    void f(int x, int y) {}\n}\n");
        let b = write(temp.path(), "B.java", "class B {\n    void g(int z) {}\n}\n");

        let checks = Checks {
            blacklist: false,
            ..Checks::default()
        };
        let engine = Engine::new(checks, RulesSource::default());
        let result = Runner::new(temp.path(), engine).run(&[b, a]).unwrap();

        let positions: Vec<_> = result
            .diagnostics
            .iter()
            .map(|d| (d.file.as_str(), d.line, d.column))
            .collect();
        assert_eq!(positions, vec![("A.java", 2, 12), ("A.java", 2, 19), ("B.java", 2, 12)]);
    }
}
