//! Policy behavior observed through the Java front end, one small source
//! tree per property.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use policycheck::config::{Checks, RulesSource};
use policycheck::detect::{DetectionResult, Diagnostic, Engine, IssueKind, Runner};
use policycheck::rules::{ConfigError, RuleStoreCell};

struct Tree {
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl Tree {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            files: Vec::new(),
        }
    }

    fn source(mut self, rel: &str, content: &str) -> Self {
        let path = self.write(rel, content);
        self.files.push(path);
        self
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, checks: Checks, rules: &str) -> anyhow::Result<DetectionResult> {
        let rules_path = self.write("blacklist.xml", rules);
        let engine = Engine::new(checks, RulesSource::fixed(rules_path));
        Runner::new(self.dir.path(), engine).run(&self.files)
    }
}

fn only(kind: &str) -> Checks {
    Checks {
        immutable: kind == "immutable",
        nullity: kind == "nullity",
        final_parameters: kind == "final_parameters",
        blacklist: kind == "blacklist",
    }
}

fn of_kind(result: &DetectionResult, kind: IssueKind) -> Vec<&Diagnostic> {
    result.diagnostics.iter().filter(|d| d.kind == kind).collect()
}

const EMPTY_RULES: &str = "<blacklist/>";

const FOO_RULES: &str = r#"<blacklist>
  <method class="com.x.Foo" name="bar" params="int" message="Use Foo.baz instead"/>
</blacklist>"#;

const FOO: &str = "package com.x;\n\npublic class Foo {\n    public void bar(int n) {\n    }\n\n    public void twice() {\n        bar(1);\n    }\n}\n";

#[test]
fn test_immutable_class_reports_each_mutable_field() {
    let tree = Tree::new().source(
        "com/x/Point.java",
        "package com.x;\n\n@com.google.errorprone.annotations.Immutable\npublic class Point {\n    private int x;\n    private final int y;\n    private transient int cache;\n    private int z;\n}\n",
    );
    let result = tree.run(only("immutable"), EMPTY_RULES).unwrap();

    let lines: Vec<usize> = result.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![5, 8]);
    assert!(result
        .diagnostics
        .iter()
        .all(|d| d.kind == IssueKind::ImmutableClassViolation));
}

#[test]
fn test_immutable_class_with_final_fields_is_clean() {
    let tree = Tree::new().source(
        "com/x/Point.java",
        "package com.x;\n\n@Immutable\npublic class Point {\n    private final int x;\n    private transient int cache;\n}\n",
    );
    let result = tree.run(only("immutable"), EMPTY_RULES).unwrap();
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_nullity_missing_and_unnecessary_never_both() {
    let tree = Tree::new().source(
        "com/x/Holder.java",
        "package com.x;\n\nimport javax.annotation.Nonnull;\nimport javax.annotation.Nullable;\n\npublic class Holder {\n    private String name;\n    @Nullable\n    private int count;\n    @Nonnull\n    private String id;\n}\n",
    );
    let result = tree.run(only("nullity"), EMPTY_RULES).unwrap();

    let missing = of_kind(&result, IssueKind::MissingNullityAnnotation);
    let unnecessary = of_kind(&result, IssueKind::UnnecessaryNullityAnnotation);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].line, 7);
    assert_eq!(unnecessary.len(), 1);
    assert_eq!(unnecessary[0].line, 8);
    assert_eq!(result.diagnostics.len(), 2);
}

#[test]
fn test_interface_parameters_are_exempt() {
    let tree = Tree::new()
        .source(
            "com/x/Shape.java",
            "package com.x;\n\npublic interface Shape {\n    double scale(double factor);\n}\n",
        )
        .source(
            "com/x/Circle.java",
            "package com.x;\n\npublic class Circle implements Shape {\n    public double scale(double factor) {\n        return factor;\n    }\n}\n",
        );
    let result = tree.run(only("final_parameters"), EMPTY_RULES).unwrap();

    assert_eq!(result.diagnostics.len(), 1);
    let diag = &result.diagnostics[0];
    assert_eq!(diag.kind, IssueKind::NonFinalParameter);
    assert_eq!(diag.file, "com/x/Circle.java");
    assert_eq!(diag.line, 4);
}

#[test]
fn test_anonymous_class_parameters_are_checked() {
    let tree = Tree::new().source(
        "com/x/Scheduler.java",
        "package com.x;\n\npublic class Scheduler {\n    public void start(final int delay) {\n        Object task = new Object() {\n            public int shift(int by) {\n                return by + delay;\n            }\n        };\n    }\n}\n",
    );
    let result = tree.run(only("final_parameters"), EMPTY_RULES).unwrap();

    assert_eq!(result.diagnostics.len(), 1);
    let diag = &result.diagnostics[0];
    assert_eq!(diag.kind, IssueKind::NonFinalParameter);
    assert_eq!(diag.line, 6);
    assert_eq!(diag.message, "Parameter `by` of `shift` should be final");
}

#[test]
fn test_blacklisted_call_from_unrelated_class() {
    let tree = Tree::new().source("com/x/Foo.java", FOO).source(
        "com/y/Other.java",
        "package com.y;\n\nimport com.x.Foo;\n\nclass Other {\n    void run(Foo foo) {\n        foo.bar(1);\n    }\n}\n",
    );
    let result = tree.run(only("blacklist"), FOO_RULES).unwrap();

    assert_eq!(result.diagnostics.len(), 1);
    let diag = &result.diagnostics[0];
    assert_eq!(diag.kind, IssueKind::BlacklistedMethod);
    assert_eq!(diag.file, "com/y/Other.java");
    assert_eq!(diag.line, 7);
    assert_eq!(diag.message, "Use Foo.baz instead");
}

#[test]
fn test_blacklisted_call_from_subclass_or_self_is_exempt() {
    let tree = Tree::new().source("com/x/Foo.java", FOO).source(
        "com/y/Sub.java",
        "package com.y;\n\nimport com.x.Foo;\n\nclass Sub extends Foo {\n    void run() {\n        bar(2);\n        this.bar(3);\n        super.bar(4);\n    }\n}\n",
    );
    let result = tree.run(only("blacklist"), FOO_RULES).unwrap();
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.unresolved_calls, 0);
}

#[test]
fn test_rule_without_params_matches_every_overload() {
    let tree = Tree::new()
        .source(
            "com/x/Foo.java",
            "package com.x;\n\npublic class Foo {\n    public static void bar(int n) {\n    }\n\n    public static void bar(String a, String b) {\n    }\n}\n",
        )
        .source(
            "com/y/Other.java",
            "package com.y;\n\nimport com.x.Foo;\n\nclass Other {\n    void run() {\n        Foo.bar(1);\n        Foo.bar(\"a\", \"b\");\n    }\n}\n",
        );
    let rules = r#"<blacklist><method class="com.x.Foo" name="bar"/></blacklist>"#;
    let result = tree.run(only("blacklist"), rules).unwrap();

    let lines: Vec<usize> = result.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![7, 8]);
    assert!(result
        .diagnostics
        .iter()
        .all(|d| d.message == "Use of `com.x.Foo.bar` is not allowed."));
}

#[test]
fn test_two_blacklisted_annotations_give_one_diagnostic() {
    let tree = Tree::new().source(
        "com/x/Bean.java",
        "package com.x;\n\nimport lombok.Getter;\nimport lombok.Setter;\n\npublic class Bean {\n    @Setter\n    @Getter\n    private String name;\n}\n",
    );
    let rules = r#"<blacklist>
  <annotation class="lombok.Getter" message="No generated getters"/>
  <annotation class="lombok.Setter" message="No generated setters"/>
</blacklist>"#;
    let result = tree.run(only("blacklist"), rules).unwrap();

    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, IssueKind::BlacklistedAnnotation);
    assert_eq!(
        result.diagnostics[0].message,
        "No generated setters; No generated getters"
    );
}

#[test]
fn test_first_loaded_rule_set_wins() {
    let tree = Tree::new();
    let first = tree.write("first.xml", FOO_RULES);
    let second = tree.write(
        "second.xml",
        r#"<blacklist><method class="com.x.Foo" name="qux"/></blacklist>"#,
    );

    let cell = RuleStoreCell::new();
    cell.load(&first).unwrap();
    let store = cell.load(&second).unwrap();
    assert!(store.match_invocation("bar", &["int".to_string()], false).is_some());
    assert!(store.match_invocation("qux", &[], false).is_none());
}

#[test]
fn test_bad_rule_files_abort_without_diagnostics() {
    let tree = Tree::new().source("com/x/Foo.java", FOO);

    for rules in [
        r#"<rules><method class="com.x.Foo" name="bar"/></rules>"#,
        r#"<blacklist><unknown-tag class="com.x.Foo"/></blacklist>"#,
    ] {
        let err = tree.run(Checks::default(), rules).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some(), "got {}", err);
    }
}

#[test]
fn test_diagnostic_paths_are_relative() {
    let tree = Tree::new().source("com/x/Foo.java", FOO);
    let result = tree.run(only("final_parameters"), EMPTY_RULES).unwrap();
    assert!(result
        .diagnostics
        .iter()
        .all(|d| !Path::new(&d.file).is_absolute()));
}
