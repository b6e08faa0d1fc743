//! Output formatting for policycheck results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::analysis::Location;
use crate::detect::{
    DetectionResult, Diagnostic, IssueKind, Severity, SuppressedDiagnostic, SuppressionType,
};
use crate::rules::ConfigError;

/// A result holding the single `config_error` diagnostic for a rule file
/// that could not be loaded.
pub fn config_error_result(error: &ConfigError) -> DetectionResult {
    let location = Location::new(error.path().to_string_lossy(), error.line(), 0);
    let mut result = DetectionResult::new();
    result
        .diagnostics
        .push(Diagnostic::new(IssueKind::ConfigError, &location, error.to_string()));
    result
}

/// Per-kind diagnostic counts, in kind order.
fn counts_by_kind(diagnostics: &[Diagnostic]) -> BTreeMap<IssueKind, usize> {
    let mut counts = BTreeMap::new();
    for d in diagnostics {
        *counts.entry(d.kind).or_insert(0) += 1;
    }
    counts
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub passed: bool,
    pub files_scanned: usize,
    pub unresolved_calls: usize,
    pub diagnostics: Vec<JsonDiagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<JsonSuppressedDiagnostic>,
    pub suppressed_count: usize,
    pub summary: Vec<SummaryEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct JsonDiagnostic {
    pub kind: String,
    pub severity: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct SummaryEntry {
    pub kind: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct JsonSuppressedDiagnostic {
    pub diagnostic: JsonDiagnostic,
    pub suppression: JsonSuppression,
}

#[derive(Serialize, Deserialize)]
pub struct JsonSuppression {
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub file: String,
    pub line: usize,
    #[serde(rename = "type")]
    pub suppression_type: String,
}

/// Build the JSON report for `result`.
pub fn json_report(path: &str, result: &DetectionResult) -> JsonReport {
    let suppressed = result
        .suppressed
        .iter()
        .map(|sd| JsonSuppressedDiagnostic {
            diagnostic: diagnostic_to_json(&sd.diagnostic),
            suppression: JsonSuppression {
                kind: sd.suppression.kind.clone(),
                reason: sd.suppression.reason.clone(),
                file: sd.suppression.file.clone(),
                line: sd.suppression.line,
                suppression_type: format!("{:?}", sd.suppression.suppression_type).to_lowercase(),
            },
        })
        .collect();

    let summary = counts_by_kind(&result.diagnostics)
        .into_iter()
        .map(|(kind, count)| SummaryEntry {
            kind: kind.as_str().to_string(),
            count,
        })
        .collect();

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        passed: !result.has_errors(),
        files_scanned: result.scanned,
        unresolved_calls: result.unresolved_calls,
        diagnostics: result.diagnostics.iter().map(diagnostic_to_json).collect(),
        suppressed,
        suppressed_count: result.suppressed_count(),
        summary,
    }
}

/// Write results in JSON format.
pub fn write_json(path: &str, result: &DetectionResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&json_report(path, result))?;
    println!("{}", json);
    Ok(())
}

fn diagnostic_to_json(d: &Diagnostic) -> JsonDiagnostic {
    JsonDiagnostic {
        kind: d.kind.as_str().to_string(),
        severity: d.severity.to_string(),
        file: d.file.clone(),
        line: d.line,
        column: d.column,
        message: d.message.clone(),
    }
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "policycheck";

#[derive(Serialize, Deserialize)]
pub struct SarifReport {
    pub version: String,
    #[serde(rename = "$schema")]
    pub schema: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Serialize, Deserialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Serialize, Deserialize)]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    pub rules: Vec<SarifRule>,
}

#[derive(Serialize, Deserialize)]
pub struct SarifRule {
    pub id: String,
    pub name: String,
    #[serde(rename = "shortDescription")]
    pub short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    pub default_config: SarifRuleConfig,
}

#[derive(Serialize, Deserialize)]
pub struct SarifRuleConfig {
    pub level: String,
}

#[derive(Serialize, Deserialize)]
pub struct SarifResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
}

#[derive(Serialize, Deserialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Serialize, Deserialize)]
pub struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Serialize, Deserialize)]
pub struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    pub artifact_location: SarifArtifact,
    pub region: SarifRegion,
}

#[derive(Serialize, Deserialize)]
pub struct SarifArtifact {
    pub uri: String,
}

#[derive(Serialize, Deserialize)]
pub struct SarifRegion {
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "startColumn", skip_serializing_if = "Option::is_none")]
    pub start_column: Option<usize>,
}

fn map_severity_to_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

/// `missing_nullity_annotation` -> `MissingNullityAnnotation`
fn rule_name(kind: IssueKind) -> String {
    kind.as_str()
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

fn make_relative_path(file_path: &str, base_path: &Path) -> String {
    if base_path.as_os_str().is_empty() {
        return file_path.to_string();
    }
    Path::new(file_path)
        .strip_prefix(base_path)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| file_path.replace('\\', "/"))
}

/// Build the SARIF log for `result`.
pub fn sarif_report(base_path: &Path, result: &DetectionResult) -> SarifReport {
    let kinds: BTreeSet<IssueKind> = result.diagnostics.iter().map(|d| d.kind).collect();

    let rules = kinds
        .into_iter()
        .map(|kind| SarifRule {
            id: kind.as_str().to_string(),
            name: rule_name(kind),
            short_description: SarifMessage {
                text: kind.description().to_string(),
            },
            default_config: SarifRuleConfig {
                level: map_severity_to_level(kind.severity()).to_string(),
            },
        })
        .collect();

    let results = result
        .diagnostics
        .iter()
        .map(|d| SarifResult {
            rule_id: d.kind.as_str().to_string(),
            level: map_severity_to_level(d.severity).to_string(),
            message: SarifMessage {
                text: d.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: make_relative_path(&d.file, base_path),
                    },
                    region: SarifRegion {
                        start_line: d.line.max(1),
                        start_column: (d.column > 0).then_some(d.column),
                    },
                },
            }],
        })
        .collect();

    SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results,
        }],
    }
}

/// Write results in SARIF format.
pub fn write_sarif(base_path: &Path, result: &DetectionResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&sarif_report(base_path, result))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(path: &str, result: &DetectionResult, show_suppressed: bool) {
    println!();
    print!("  ");
    print!("{}", "policycheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Checking: ".dimmed());
    println!("{} ({} files)", path, result.scanned);
    println!();

    write_result_summary(result);
    println!();

    if !result.diagnostics.is_empty() {
        write_diagnostics(&result.diagnostics);
        println!();
    }

    if !result.suppressed.is_empty() {
        write_suppressed_summary(&result.suppressed, show_suppressed);
        println!();
    }

    let counts = counts_by_kind(&result.diagnostics);
    if !counts.is_empty() {
        println!("  {}", "Breakdown:".bold());
        for (kind, count) in counts {
            println!("    {:<32} {}", kind.as_str(), count);
        }
        println!();
    }
}

fn write_result_summary(result: &DetectionResult) {
    if result.has_errors() {
        print!("  {}", "✗ FAIL".red());
    } else {
        print!("  {}", "✓ PASS".green());
    }

    let errors = result.count_severity(Severity::Error);
    let warnings = result.count_severity(Severity::Warning);
    print!("  {} errors, {} warnings", errors, warnings);

    if result.suppressed_count() > 0 {
        print!(
            "  {}",
            format!("({} suppressed)", result.suppressed_count()).dimmed()
        );
    }
    if result.unresolved_calls > 0 {
        print!(
            "  {}",
            format!("({} unresolved calls)", result.unresolved_calls).dimmed()
        );
    }
    println!();
}

fn write_diagnostics(diagnostics: &[Diagnostic]) {
    println!("  {} ({}):", "Diagnostics".bold(), diagnostics.len());
    println!();

    for d in diagnostics {
        write_severity_tag(d.severity);
        print!("   ");
        print!("{:<32}", d.kind.as_str().dimmed());
        print!("{}", d.file.blue());
        if d.line > 0 {
            print!("{}", format!(":{}:{}", d.line, d.column).dimmed());
        }
        println!();

        println!("            {}", d.message);
        println!();
    }
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

fn write_suppressed_summary(suppressed: &[SuppressedDiagnostic], show_details: bool) {
    println!("  {} ({}):", "Suppressed".dimmed(), suppressed.len());

    if !show_details {
        println!("    {}", "(use --show-suppressed to see details)".dimmed());
        return;
    }

    println!();
    for sd in suppressed {
        let d = &sd.diagnostic;
        let s = &sd.suppression;

        print!("    {:<32}", d.kind.as_str().dimmed());
        print!("{}", d.file.blue());
        if s.suppression_type == SuppressionType::File {
            print!("{}", ":* (file)".dimmed());
        } else if d.line > 0 {
            print!("{}", format!(":{}", d.line).dimmed());
        }
        println!();

        if !s.reason.is_empty() {
            println!("            {}", format!("reason: {:?}", s.reason).dimmed());
        }
    }
}
