use once_cell::sync::OnceCell;
use tree_sitter::Query;

use super::{Dialect, LanguageGrammar};

pub struct KotlinGrammar;

static KOTLIN_CALLS_QUERY: OnceCell<Query> = OnceCell::new();

impl LanguageGrammar for KotlinGrammar {
    fn name(&self) -> &'static str {
        "kotlin"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Kotlin
    }

    fn file_extensions(&self) -> &[&'static str] {
        &["kt", "kts"]
    }

    fn language(&self) -> tree_sitter::Language {
        tree_sitter_kotlin_ng::LANGUAGE.into()
    }

    fn calls_query(&self) -> &str {
        r#"
        (call_expression) @call

        (binary_expression
          left: (binary_expression)
          right: (lambda_literal)) @call
        "#
    }

    fn cached_calls_query(&self) -> Option<&'static Query> {
        KOTLIN_CALLS_QUERY
            .get_or_try_init(|| Query::new(&self.language(), self.calls_query()))
            .ok()
    }
}
