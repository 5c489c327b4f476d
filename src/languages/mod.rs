pub mod java;
pub mod kotlin;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tree_sitter::Query;

/// The two interoperable source dialects sharing one JVM symbol space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Java,
    Kotlin,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Java, Dialect::Kotlin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Java => "java",
            Dialect::Kotlin => "kotlin",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait LanguageGrammar: Send + Sync {
    fn name(&self) -> &'static str;
    fn dialect(&self) -> Dialect;
    fn file_extensions(&self) -> &[&'static str];
    fn language(&self) -> tree_sitter::Language;

    /// Query capturing every call expression as `@call`
    fn calls_query(&self) -> &str;

    /// Get cached calls query (compiled once)
    fn cached_calls_query(&self) -> Option<&'static Query> {
        None
    }
}

pub struct LanguageRegistry {
    languages: HashMap<Dialect, Arc<dyn LanguageGrammar>>,
    extension_map: HashMap<String, Dialect>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            languages: HashMap::new(),
            extension_map: HashMap::new(),
        };

        registry.register(Arc::new(java::JavaGrammar));
        registry.register(Arc::new(kotlin::KotlinGrammar));

        registry
    }

    pub fn register(&mut self, grammar: Arc<dyn LanguageGrammar>) {
        let dialect = grammar.dialect();
        for ext in grammar.file_extensions() {
            self.extension_map.insert(ext.to_string(), dialect);
        }
        self.languages.insert(dialect, grammar);
    }

    pub fn get(&self, dialect: Dialect) -> Option<Arc<dyn LanguageGrammar>> {
        self.languages.get(&dialect).cloned()
    }

    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn LanguageGrammar>> {
        self.extension_map
            .get(ext)
            .and_then(|dialect| self.languages.get(dialect))
            .cloned()
    }

    pub fn get_for_file(&self, path: &Path) -> Option<Arc<dyn LanguageGrammar>> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.get_by_extension(ext))
    }

    pub fn dialect_of(&self, path: &Path) -> Option<Dialect> {
        self.get_for_file(path).map(|g| g.dialect())
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new() {
        let registry = LanguageRegistry::new();
        assert!(registry.get(Dialect::Java).is_some());
        assert!(registry.get(Dialect::Kotlin).is_some());
    }

    #[test]
    fn test_get_by_extension_java() {
        let registry = LanguageRegistry::new();
        let grammar = registry.get_by_extension("java").unwrap();
        assert_eq!(grammar.name(), "java");
        assert_eq!(grammar.dialect(), Dialect::Java);
    }

    #[test]
    fn test_get_by_extension_kotlin() {
        let registry = LanguageRegistry::new();
        assert_eq!(registry.get_by_extension("kt").unwrap().dialect(), Dialect::Kotlin);
        assert_eq!(registry.get_by_extension("kts").unwrap().dialect(), Dialect::Kotlin);
    }

    #[test]
    fn test_get_by_extension_unknown() {
        let registry = LanguageRegistry::new();
        assert!(registry.get_by_extension("rs").is_none());
        assert!(registry.get_by_extension("").is_none());
    }

    #[test]
    fn test_dialect_of_file() {
        let registry = LanguageRegistry::new();
        assert_eq!(registry.dialect_of(Path::new("src/Main.java")), Some(Dialect::Java));
        assert_eq!(registry.dialect_of(Path::new("src/Bus.kt")), Some(Dialect::Kotlin));
        assert_eq!(registry.dialect_of(Path::new("build.gradle")), None);
        assert_eq!(registry.dialect_of(Path::new("Makefile")), None);
    }

    #[test]
    fn test_calls_queries_compile() {
        let registry = LanguageRegistry::new();
        for dialect in Dialect::ALL {
            let grammar = registry.get(dialect).unwrap();
            let query = grammar.cached_calls_query().expect("calls query should compile");
            assert_eq!(query.capture_names(), &["call"]);
        }
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::Java.to_string(), "java");
        assert_eq!(Dialect::Kotlin.to_string(), "kotlin");
    }
}
