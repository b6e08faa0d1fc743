//! Analysis context for caching extracted facts.
//!
//! The AnalysisContext provides:
//! - Caching of extracted facts, keyed by absolute path
//! - Paths relative to the scan root, used in every fact location
//! - A class index over everything analyzed so far

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::analysis::{get_analyzer, ClassIndex, FileFacts};

/// Analysis context for a set of files.
pub struct AnalysisContext {
    /// Base directory for relative path resolution.
    base_dir: PathBuf,
    /// Cached file facts, keyed by absolute path.
    facts_cache: RwLock<HashMap<PathBuf, FileFacts>>,
}

/// Path of `path` relative to `base_dir`, or `path` itself when it lies
/// outside.
pub fn relative_path(base_dir: &Path, path: &Path) -> String {
    path.strip_prefix(base_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

impl AnalysisContext {
    /// Create a new analysis context.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            facts_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    // A panicking worker cannot leave the map half-written, so a poisoned
    // lock is still usable.
    fn cache(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, FileFacts>> {
        self.facts_cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn cache_mut(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, FileFacts>> {
        self.facts_cache.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Analyze a file and cache the results.
    ///
    /// Returns cached facts if already analyzed. Files without an analyzer
    /// produce empty facts.
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<FileFacts> {
        let abs_path = self.absolute(path.as_ref());

        if let Some(facts) = self.cache().get(&abs_path) {
            return Ok(facts.clone());
        }

        let rel_path = relative_path(&self.base_dir, &abs_path);
        let ext = abs_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let analyzer = match get_analyzer(ext) {
            Some(analyzer) => analyzer,
            None => return Ok(FileFacts::empty(&rel_path, "unknown")),
        };

        let source = fs::read(&abs_path)?;
        // Parse under the relative path so every location is relative too.
        let parsed = analyzer.parse(Path::new(&rel_path), &source)?;
        let facts = analyzer.extract_facts(&parsed)?;

        if facts.has_parse_errors {
            log::debug!("{}: source has syntax errors, facts may be partial", rel_path);
        }

        self.cache_mut().insert(abs_path, facts.clone());
        Ok(facts)
    }

    /// Analyze multiple files in parallel.
    ///
    /// Uses rayon for parallel processing. Files that cannot be read or
    /// parsed are logged and skipped. Results are sorted by path.
    pub fn analyze_files_parallel(&self, paths: &[PathBuf]) -> anyhow::Result<Vec<FileFacts>> {
        use rayon::prelude::*;

        let results: Vec<_> = paths
            .par_iter()
            .map(|p| (p, self.analyze_file(p)))
            .collect();

        let mut all_facts = Vec::new();
        for (path, result) in results {
            match result {
                Ok(facts) => all_facts.push(facts),
                Err(e) => {
                    log::warn!("failed to analyze {}: {}", path.display(), e);
                }
            }
        }

        all_facts.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(all_facts)
    }

    /// Get all analyzed file paths, relative to the base directory.
    pub fn analyzed_files(&self) -> Vec<String> {
        let mut files: Vec<_> = self.cache().values().map(|f| f.path.clone()).collect();
        files.sort();
        files
    }

    /// Build a class index over every analyzed file.
    pub fn class_index(&self) -> ClassIndex {
        let cache = self.cache();
        let mut facts: Vec<&FileFacts> = cache.values().collect();
        facts.sort_by(|a, b| a.path.cmp(&b.path));
        ClassIndex::build(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_analyze_java_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("com/x");
        fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("Foo.java");
        fs::write(
            &file_path,
            "package com.x;\n\npublic class Foo {\n    private String name;\n}\n",
        )
        .unwrap();

        let ctx = AnalysisContext::new(temp.path());
        let facts = ctx.analyze_file(&file_path).unwrap();

        assert_eq!(facts.language, "java");
        assert_eq!(facts.package.as_deref(), Some("com.x"));
        assert_eq!(facts.path, Path::new("com/x/Foo.java").to_string_lossy());
        assert_eq!(facts.declarations.len(), 2);
        assert_eq!(facts.declarations[1].location().file, facts.path);
        assert_eq!(facts.declarations[1].location().line, 4);
    }

    #[test]
    fn test_caching() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("A.java");
        fs::write(&file_path, "class A {}").unwrap();

        let ctx = AnalysisContext::new(temp.path());
        let first = ctx.analyze_file(&file_path).unwrap();

        // The cached copy survives the file going away.
        fs::remove_file(&file_path).unwrap();
        let second = ctx.analyze_file(&file_path).unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(first.declarations.len(), second.declarations.len());
        assert_eq!(ctx.analyzed_files(), vec!["A.java".to_string()]);
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("A.java");
        fs::write(&good, "class A {}").unwrap();
        let missing = temp.path().join("Missing.java");

        let ctx = AnalysisContext::new(temp.path());
        let facts = ctx.analyze_files_parallel(&[good, missing]).unwrap();

        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].path, "A.java");
    }

    #[test]
    fn test_unsupported_extension_gives_empty_facts() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("notes.txt");
        fs::write(&file_path, "class A {}").unwrap();

        let ctx = AnalysisContext::new(temp.path());
        let facts = ctx.analyze_file(&file_path).unwrap();
        assert_eq!(facts.language, "unknown");
        assert!(facts.declarations.is_empty());
    }

    #[test]
    fn test_class_index_spans_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Base.java"), "package p; class Base {}").unwrap();
        fs::write(temp.path().join("Sub.java"), "package p; class Sub extends Base {}").unwrap();

        let ctx = AnalysisContext::new(temp.path());
        ctx.analyze_files_parallel(&[temp.path().join("Base.java"), temp.path().join("Sub.java")])
            .unwrap();

        let index = ctx.class_index();
        assert!(index.contains("p.Base"));
        assert_eq!(index.supertypes("p.Sub"), ["p.Base".to_string()]);
    }
}
