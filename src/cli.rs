//! Command-line interface for policycheck.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::analysis::{register_analyzers, registered_extensions};
use crate::config::{self, RulesSource, Settings};
use crate::detect::{Engine, Runner};
use crate::report;
use crate::rules::{self, ConfigError};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Java coding-policy checker.
///
/// Policycheck enforces a team's Java conventions: @Immutable classes hold
/// only final fields, reference-typed declarations state their nullity,
/// parameters are final, and nothing calls, extends or is annotated with
/// anything on the blacklist rule file.
#[derive(Parser)]
#[command(name = "policycheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check Java sources against the coding policy
    #[command(visible_alias = "lint")]
    Check(CheckArgs),
    /// Create a rule file or settings file from a template
    Init(InitArgs),
    /// Load the rule file and print every rule
    Rules(RulesArgs),
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Path to check (file or directory)
    pub path: PathBuf,

    /// Blacklist rule file (overrides POLICYCHECK_RULES and settings)
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Settings YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Show suppressed diagnostics in output
    #[arg(long)]
    pub show_suppressed: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path (default depends on the template)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Template to use
    #[arg(short, long, default_value = "blacklist")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Arguments for the rules command.
#[derive(Parser)]
pub struct RulesArgs {
    /// Blacklist rule file (default: POLICYCHECK_RULES, then config/blacklist.xml)
    #[arg(short, long)]
    pub rules: Option<PathBuf>,
}

/// Available templates.
struct Template {
    name: &'static str,
    description: &'static str,
    default_output: &'static str,
    content: &'static str,
}

static TEMPLATES: &[Template] = &[
    Template {
        name: "blacklist",
        description: "Commented blacklist rule file",
        default_output: rules::DEFAULT_RULES_PATH,
        content: include_str!("templates/blacklist.xml"),
    },
    Template {
        name: "settings",
        description: "Settings file selecting checks and excluded paths",
        default_output: "policycheck.yaml",
        content: include_str!("templates/policycheck.yaml"),
    },
];

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["build", "target", "out", "node_modules"];

/// Directories holding test sources, skipped unless `include_test_files`.
const TEST_DIRS: &[&str] = &["test", "tests", "testdata", "test_data"];

/// Collect source files under `root` that some analyzer handles.
pub fn collect_files(root: &Path, settings: &Settings) -> anyhow::Result<Vec<PathBuf>> {
    register_analyzers();
    let extensions = registered_extensions();
    let include_test_files = settings.should_include_test_files();

    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if name.starts_with('.') || SKIPPED_DIRS.iter().any(|d| *d == name) {
                return false;
            }
            include_test_files || !TEST_DIRS.iter().any(|d| *d == name)
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !extensions.iter().any(|e| *e == ext) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if settings.is_path_excluded(relative) {
            log::debug!("excluded {}", relative.display());
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Find and parse the settings file for a check of `root`.
///
/// Returns the settings together with the directory relative paths inside
/// them are resolved against.
fn load_settings(explicit: Option<&Path>, root: &Path) -> anyhow::Result<(Settings, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let dir = if root.is_dir() {
                root
            } else {
                root.parent().unwrap_or(Path::new("."))
            };
            config::discover_settings(dir).or_else(|| config::discover_settings(Path::new(".")))
        }
    };

    let path = match path {
        Some(p) => p,
        None => return Ok((Settings::default(), None)),
    };

    log::debug!("using settings {}", path.display());
    let settings = Settings::parse_file(&path)
        .map_err(|e| anyhow::anyhow!("cannot parse settings {}: {}", path.display(), e))?;
    config::validate(&settings)?;
    Ok((settings, path.parent().map(Path::to_path_buf)))
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" && args.format != "sarif" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    // Resolve path
    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let (settings, settings_dir) = match load_settings(args.config.as_deref(), &abs_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    // Collect files to scan
    let files = if abs_path.is_dir() {
        collect_files(&abs_path, &settings)?
    } else {
        vec![abs_path.clone()]
    };

    if files.is_empty() {
        log::warn!("no files to scan under {}", abs_path.display());
    }

    // Settings-relative rule paths are anchored at the settings file
    let configured = settings.rules.clone().map(|p| match &settings_dir {
        Some(dir) if p.is_relative() => dir.join(p),
        _ => p,
    });
    let source = RulesSource::new(args.rules.clone(), configured);

    let base_dir = if abs_path.is_dir() {
        abs_path.clone()
    } else {
        abs_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| abs_path.clone())
    };
    let runner = Runner::new(&base_dir, Engine::new(settings.checks, source));

    let path_str = args.path.to_string_lossy().to_string();
    let result = match runner.run(&files) {
        Ok(result) => result,
        Err(e) => match e.downcast_ref::<ConfigError>() {
            Some(config_error) => {
                log::error!("{}", config_error);
                let failed = report::config_error_result(config_error);
                write_report(&args.format, &path_str, &base_dir, &failed, args.show_suppressed)?;
                return Ok(EXIT_ERROR);
            }
            None => return Err(e),
        },
    };

    write_report(&args.format, &path_str, &base_dir, &result, args.show_suppressed)?;

    if result.has_errors() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

fn write_report(
    format: &str,
    path: &str,
    base_dir: &Path,
    result: &crate::detect::DetectionResult,
    show_suppressed: bool,
) -> anyhow::Result<()> {
    match format {
        "json" => report::write_json(path, result),
        "sarif" => report::write_sarif(base_dir, result),
        _ => {
            report::write_pretty(path, result, show_suppressed);
            Ok(())
        }
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        return list_templates();
    }

    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'policycheck init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(template.default_output));

    if output.exists() {
        eprintln!("Error: file already exists: {}", output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&output, template.content) {
        eprintln!("Error: failed to write {}: {}", output.display(), e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your project's policy", output.display());
    if template.name == "blacklist" {
        println!("  2. Run: policycheck check . --rules {}", output.display());
    } else {
        println!("  2. Run: policycheck check .");
    }

    Ok(EXIT_SUCCESS)
}

fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "blacklist" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<14} {:<22} {}", name, template.default_output, template.description);
    }

    println!();
    println!("Usage:");
    println!("  policycheck init --template <name>");

    Ok(EXIT_SUCCESS)
}

/// Run the rules command.
pub fn run_rules(args: &RulesArgs) -> anyhow::Result<i32> {
    let path = RulesSource::new(args.rules.clone(), None).resolve();
    let store = match rules::load(&path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    println!("{}: {}", path.display(), store.summary());

    let methods = store.method_rules();
    if !methods.is_empty() {
        println!();
        println!("Methods:");
        for rule in methods {
            println!("  {:<40} {}", rule.signature(), rule.message);
        }
    }

    let constructors = store.constructor_rules();
    if !constructors.is_empty() {
        println!();
        println!("Constructors:");
        for rule in constructors {
            println!("  {:<40} {}", rule.signature(), rule.message);
        }
    }

    let annotations = store.annotation_rules();
    if !annotations.is_empty() {
        println!();
        println!("Annotations:");
        for rule in annotations {
            println!("  {:<40} {}", format!("@{}", rule.qualified_name), rule.message);
        }
    }

    let base_classes = store.base_class_rules();
    if !base_classes.is_empty() {
        println!();
        println!("Base classes:");
        for rule in base_classes {
            println!("  {:<40} {}", rule.qualified_name, rule.message);
        }
    }

    let tags = store.javadoc_tag_rules();
    if !tags.is_empty() {
        println!();
        println!("Javadoc tags:");
        for rule in tags {
            println!("  {:<40} {}", format!("@{}", rule.tag_name), rule.message);
        }
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Checks;
    use crate::detect::IssueKind;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class A {}\n").unwrap();
    }

    #[test]
    fn test_collect_files_skips_build_and_tests() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/main/java/com/x/Foo.java");
        touch(temp.path(), "src/test/java/com/x/FooTest.java");
        touch(temp.path(), "build/generated/Gen.java");
        touch(temp.path(), ".git/Hidden.java");
        touch(temp.path(), "src/main/resources/notes.txt");

        let files = collect_files(temp.path(), &Settings::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["Foo.java"]);

        let settings = Settings {
            include_test_files: Some(true),
            ..Default::default()
        };
        assert_eq!(collect_files(temp.path(), &settings).unwrap().len(), 2);
    }

    #[test]
    fn test_collect_files_applies_excluded_paths() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/com/x/Foo.java");
        touch(temp.path(), "src/generated/com/x/Gen.java");

        let settings = Settings {
            excluded_paths: vec!["**/generated/**".to_string()],
            ..Default::default()
        };
        let files = collect_files(temp.path(), &settings).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/com/x/Foo.java"));
    }

    #[test]
    fn test_templates_are_well_formed() {
        let blacklist = TEMPLATES.iter().find(|t| t.name == "blacklist").unwrap();
        let store = rules::parse_rules(blacklist.content, Path::new("blacklist.xml")).unwrap();
        assert!(!store.is_empty());

        let settings = TEMPLATES.iter().find(|t| t.name == "settings").unwrap();
        let parsed: Settings = serde_yaml::from_str(settings.content).unwrap();
        assert!(config::validate(&parsed).is_ok());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("config/blacklist.xml");
        let args = InitArgs {
            output: Some(output.clone()),
            template: "blacklist".to_string(),
            list: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert!(output.is_file());
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_check_exit_codes() {
        let temp = TempDir::new().unwrap();
        let rules_path = temp.path().join("blacklist.xml");
        fs::write(&rules_path, "<blacklist/>").unwrap();
        fs::write(temp.path().join("A.java"), "class A {\n    void f(int x) {}\n}\n").unwrap();

        let mut args = CheckArgs {
            path: temp.path().to_path_buf(),
            rules: Some(rules_path.clone()),
            config: None,
            format: "json".to_string(),
            show_suppressed: false,
        };
        assert_eq!(run_check(&args).unwrap(), EXIT_FAILED);

        fs::write(&rules_path, "<rules/>").unwrap();
        assert_eq!(run_check(&args).unwrap(), EXIT_ERROR);

        args.format = "xml".to_string();
        assert_eq!(run_check(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_broken_rules_fail_even_without_sources() {
        let temp = TempDir::new().unwrap();
        let rules_path = temp.path().join("blacklist.xml");
        fs::write(&rules_path, "<rules/>").unwrap();
        let sources = temp.path().join("src");
        fs::create_dir_all(&sources).unwrap();

        let mut args = CheckArgs {
            path: sources,
            rules: Some(rules_path.clone()),
            config: None,
            format: "json".to_string(),
            show_suppressed: false,
        };
        assert_eq!(run_check(&args).unwrap(), EXIT_ERROR);

        fs::write(&rules_path, "<blacklist/>").unwrap();
        args.rules = Some(rules_path);
        assert_eq!(run_check(&args).unwrap(), EXIT_SUCCESS);
    }

    #[test]
    fn test_blacklist_template_rules_fire() {
        let temp = TempDir::new().unwrap();
        let blacklist = TEMPLATES.iter().find(|t| t.name == "blacklist").unwrap();
        let rules_path = temp.path().join("blacklist.xml");
        fs::write(&rules_path, blacklist.content).unwrap();

        let sources = temp.path().join("src");
        fs::create_dir_all(sources.join("com/x")).unwrap();
        fs::write(
            sources.join("com/x/Legacy.java"),
            "package com.x;\n\nimport java.util.Date;\nimport java.util.Observable;\nimport lombok.Data;\n\n@Data\npublic class Legacy extends Observable {\n    private final String name = \"x\";\n\n    public void reset(final Thread worker) {\n        System.gc();\n        worker.stop();\n        Date now = new Date();\n    }\n}\n",
        )
        .unwrap();

        let settings = Settings {
            checks: Checks {
                immutable: false,
                nullity: false,
                final_parameters: false,
                blacklist: true,
            },
            ..Default::default()
        };
        let files = collect_files(&sources, &settings).unwrap();
        let engine = Engine::new(settings.checks, RulesSource::fixed(&rules_path));
        let result = Runner::new(&sources, engine).run(&files).unwrap();

        let mut found: Vec<(usize, IssueKind)> =
            result.diagnostics.iter().map(|d| (d.line, d.kind)).collect();
        found.sort();
        let mut expected = vec![
            (7, IssueKind::BlacklistedAnnotation),
            (7, IssueKind::BlacklistedBaseClass),
            (12, IssueKind::BlacklistedMethod),
            (13, IssueKind::BlacklistedMethod),
            (14, IssueKind::BlacklistedConstructor),
        ];
        expected.sort();
        assert_eq!(found, expected);
        assert_eq!(result.unresolved_calls, 0);
    }
}
