//! Language-specific analyzer implementations.

mod java;

pub use java::JavaAnalyzer;

use super::LanguageAnalyzer;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};

/// Static storage for Java analyzer.
static JAVA_ANALYZER: OnceCell<JavaAnalyzer> = OnceCell::new();

/// Whether analyzers have been registered.
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Register all available language analyzers.
///
/// Idempotent; `get_analyzer` calls it on demand.
pub fn register_analyzers() {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }

    JAVA_ANALYZER.get_or_init(JavaAnalyzer::new);
}

/// Get an analyzer for the given file extension.
///
/// Returns None if no analyzer is registered for the extension.
pub fn get_analyzer(ext: &str) -> Option<&'static dyn LanguageAnalyzer> {
    register_analyzers();

    let java = JAVA_ANALYZER.get_or_init(JavaAnalyzer::new);
    if java.handles_extension(ext) {
        return Some(java as &'static dyn LanguageAnalyzer);
    }
    None
}

/// Get all registered file extensions.
pub fn registered_extensions() -> Vec<&'static str> {
    register_analyzers();

    let mut extensions = Vec::new();
    if let Some(java) = JAVA_ANALYZER.get() {
        extensions.extend_from_slice(java.file_extensions());
    }
    extensions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_extension_is_registered() {
        let analyzer = get_analyzer("java").unwrap();
        assert_eq!(analyzer.language_id(), "java");
        assert!(get_analyzer("rs").is_none());
        assert_eq!(registered_extensions(), vec!["java"]);
    }
}
