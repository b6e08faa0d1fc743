//! Inline suppression of diagnostics via comments.
//!
//! Supports suppression comments like:
//! - `// policycheck:ignore <issue_kind> - <reason>`
//! - `// policycheck:ignore-next-line <issue_kind> - <reason>`
//! - `// policycheck:ignore-file <issue_kind> - <reason>`
//!
//! `*` suppresses every kind. Configuration errors are never suppressed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::{Diagnostic, IssueKind};
use crate::analysis::relative_path;

/// How a suppression applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionType {
    /// Applies to the same line
    Line,
    /// Applies to the next line
    NextLine,
    /// Applies to the entire file
    File,
}

/// An inline suppression directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suppression {
    /// Issue kind to suppress (e.g., "non_final_parameter") or "*" for all
    pub kind: String,
    /// Human-readable reason
    pub reason: String,
    /// File containing the suppression
    pub file: String,
    /// Line number (0 for file-level)
    pub line: usize,
    /// How the suppression applies
    pub suppression_type: SuppressionType,
}

/// A diagnostic that was suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressedDiagnostic {
    pub diagnostic: Diagnostic,
    pub suppression: Suppression,
}

/// Lines of leading comments a file-level directive may appear in.
const FILE_HEADER_LINES: usize = 10;

lazy_static::lazy_static! {
    /// Patterns for matching suppression comments.
    static ref SUPPRESSION_PATTERNS: Vec<Regex> = vec![
        // Line comment: // policycheck:...
        Regex::new(r"//\s*policycheck:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*))?").unwrap(),
        // Block comment: /* policycheck:... */
        Regex::new(r"/\*\s*policycheck:(ignore(?:-file|-next-line)?)\s+(\S+?)\s*(?:-\s*(.*?))?\s*\*/").unwrap(),
    ];
}

/// Parse suppression directives from file content.
pub fn parse_suppressions(file_path: &str, content: &str) -> Vec<Suppression> {
    let mut suppressions = Vec::new();
    let mut in_header = true;

    for (line_num, line) in content.lines().enumerate() {
        let line_number = line_num + 1;
        let trimmed = line.trim();

        if in_header && !is_comment_or_empty(trimmed) {
            in_header = false;
        }

        for pattern in SUPPRESSION_PATTERNS.iter() {
            let caps = match pattern.captures(line) {
                Some(caps) => caps,
                None => continue,
            };
            let directive = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let kind = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let reason = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();

            let suppression_type = match directive {
                "ignore-file" => {
                    if !in_header && line_number > FILE_HEADER_LINES {
                        continue;
                    }
                    SuppressionType::File
                }
                "ignore-next-line" => SuppressionType::NextLine,
                "ignore" => {
                    // Alone on its line it covers the next line; after code it
                    // covers its own.
                    let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
                    if line[..start].trim().is_empty() {
                        SuppressionType::NextLine
                    } else {
                        SuppressionType::Line
                    }
                }
                _ => continue,
            };

            if kind != "*" && IssueKind::parse(kind).is_none() {
                log::warn!(
                    "{}:{}: suppression names unknown issue kind `{}`",
                    file_path,
                    line_number,
                    kind
                );
            }

            suppressions.push(Suppression {
                kind: kind.to_string(),
                reason,
                file: file_path.to_string(),
                line: if suppression_type == SuppressionType::File {
                    0
                } else {
                    line_number
                },
                suppression_type,
            });
            break; // Only one suppression per line
        }
    }

    suppressions
}

fn is_comment_or_empty(line: &str) -> bool {
    line.is_empty() || line.starts_with("//") || line.starts_with("/*") || line.starts_with('*')
}

/// Check if a diagnostic matches a suppression.
pub fn matches_suppression(diagnostic: &Diagnostic, suppression: &Suppression) -> bool {
    if !diagnostic.kind.is_suppressible() {
        return false;
    }

    if diagnostic.file != suppression.file {
        return false;
    }

    if suppression.kind != "*" && suppression.kind != diagnostic.kind.as_str() {
        return false;
    }

    match suppression.suppression_type {
        SuppressionType::File => true,
        SuppressionType::Line => diagnostic.line == suppression.line,
        SuppressionType::NextLine => diagnostic.line == suppression.line + 1,
    }
}

/// Separate diagnostics into active and suppressed based on suppressions.
pub fn filter_suppressed(
    diagnostics: Vec<Diagnostic>,
    suppressions: &HashMap<String, Vec<Suppression>>,
) -> (Vec<Diagnostic>, Vec<SuppressedDiagnostic>) {
    let mut active = Vec::new();
    let mut suppressed = Vec::new();

    for diagnostic in diagnostics {
        let matched = suppressions
            .get(&diagnostic.file)
            .and_then(|list| list.iter().find(|s| matches_suppression(&diagnostic, s)));

        match matched {
            Some(suppression) => suppressed.push(SuppressedDiagnostic {
                suppression: suppression.clone(),
                diagnostic,
            }),
            None => active.push(diagnostic),
        }
    }

    (active, suppressed)
}

/// Collect suppressions from all files, keyed by path relative to
/// `base_dir` (the same form diagnostics use).
pub fn collect_suppressions<P: AsRef<Path>>(
    base_dir: &Path,
    files: &[P],
) -> HashMap<String, Vec<Suppression>> {
    let mut result = HashMap::new();

    for file in files {
        let path = file.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("skipping suppressions in {}: {}", path.display(), e);
                continue;
            }
        };

        let file_str = relative_path(base_dir, path);
        let suppressions = parse_suppressions(&file_str, &content);
        if !suppressions.is_empty() {
            result.insert(file_str, suppressions);
        }
    }

    result
}
