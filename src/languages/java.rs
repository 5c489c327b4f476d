use once_cell::sync::OnceCell;
use tree_sitter::Query;

use super::{Dialect, LanguageGrammar};

pub struct JavaGrammar;

static JAVA_CALLS_QUERY: OnceCell<Query> = OnceCell::new();

impl LanguageGrammar for JavaGrammar {
    fn name(&self) -> &'static str {
        "java"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Java
    }

    fn file_extensions(&self) -> &[&'static str] {
        &["java"]
    }

    fn language(&self) -> tree_sitter::Language {
        tree_sitter_java::LANGUAGE.into()
    }

    fn calls_query(&self) -> &str {
        r#"
        (method_invocation) @call
        "#
    }

    fn cached_calls_query(&self) -> Option<&'static Query> {
        JAVA_CALLS_QUERY
            .get_or_try_init(|| Query::new(&self.language(), self.calls_query()))
            .ok()
    }
}
