use tree_sitter::{Node, QueryCursor, StreamingIterator};

use crate::index::DeclId;
use crate::indexer::syntax::is_trailing_lambda_callee;
use crate::indexer::ParsedFile;
use crate::resolve::{resolver_for, FileContext};

/// A call expression with its statically resolved target, if any.
#[derive(Debug, Clone, Copy)]
pub struct CallExpression<'a> {
    pub node: Node<'a>,
    pub target: Option<DeclId>,
}

/// Every call expression node of a file, in document order. The inner
/// `f(x)` of a Kotlin `f(x) { }` is folded into the outer call.
pub fn call_nodes(file: &ParsedFile) -> Vec<Node<'_>> {
    let Some(query) = file.grammar.cached_calls_query() else {
        tracing::warn!("No calls query for {}", file.grammar.name());
        return Vec::new();
    };

    let mut nodes = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, file.root_node(), file.source_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            if !is_trailing_lambda_callee(capture.node) {
                nodes.push(capture.node);
            }
        }
    }
    nodes
}

/// Lazily resolves the target of every call in the file. Calls whose
/// target cannot be resolved are yielded with `target: None`.
pub fn extract_calls<'a>(ctx: FileContext<'a>) -> impl Iterator<Item = CallExpression<'a>> + 'a {
    let resolver = resolver_for(ctx.file.dialect);
    call_nodes(ctx.file)
        .into_iter()
        .map(move |node| CallExpression {
            node,
            target: resolver.resolve_callee(&ctx, node),
        })
}

/// Like [`extract_calls`], but only resolves calls whose callee name
/// passes `accept`; the others are skipped entirely.
pub fn extract_calls_matching<'a, F>(
    ctx: FileContext<'a>,
    accept: F,
) -> impl Iterator<Item = CallExpression<'a>> + 'a
where
    F: Fn(&str) -> bool + 'a,
{
    let resolver = resolver_for(ctx.file.dialect);
    call_nodes(ctx.file).into_iter().filter_map(move |node| {
        let parts = resolver.call_parts(&ctx, node)?;
        if !accept(ctx.text(&parts.name)) {
            return None;
        }
        Some(CallExpression {
            node,
            target: resolver.resolve_callee(&ctx, node),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FileId;
    use crate::indexer::Project;

    #[test]
    fn test_java_calls_are_all_visited() {
        let project = Project::from_sources([(
            "A.java",
            r#"
class A {
    void a() { b(); }
    void b() { c(1); }
    void c(int x) { unknown(); }
}
"#,
        )])
        .unwrap();
        let ctx = project.context(FileId(0));
        let calls: Vec<_> = extract_calls(ctx).collect();
        assert_eq!(calls.len(), 3);

        let resolved: Vec<&str> = calls
            .iter()
            .filter_map(|c| c.target)
            .map(|t| project.table().get(t).name.as_str())
            .collect();
        assert_eq!(resolved, vec!["b", "c"]);
    }

    #[test]
    fn test_kotlin_calls_include_nested() {
        let project = Project::from_sources([(
            "A.kt",
            r#"
fun outer(x: Int): Int = x

fun use() {
    outer(outer(1))
}
"#,
        )])
        .unwrap();
        let ctx = project.context(FileId(0));
        let calls: Vec<_> = extract_calls(ctx).collect();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.target.is_some()));
    }

    #[test]
    fn test_trailing_lambda_call_is_one_call() {
        let project = Project::from_sources([(
            "A.kt",
            r#"
fun run(x: Int, block: () -> Unit) {}

fun use() {
    run(1) { }
}
"#,
        )])
        .unwrap();
        let ctx = project.context(FileId(0));
        let calls: Vec<_> = extract_calls(ctx).collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(ctx.text(&calls[0].node), "run(1) { }");
        let target = calls[0].target.unwrap();
        assert_eq!(project.table().get(target).name, "run");
    }

    #[test]
    fn test_extraction_is_restartable() {
        let project = Project::from_sources([("A.java", "class A { void a() { a(); a(); } }")])
            .unwrap();
        let ctx = project.context(FileId(0));
        let first: Vec<_> = extract_calls(ctx).map(|c| c.node.id()).collect();
        let second: Vec<_> = extract_calls(ctx).map(|c| c.node.id()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_matching_skips_other_names() {
        let project = Project::from_sources([(
            "A.java",
            "class A { void post(Object o) {} void a() { post(1); other(); } }",
        )])
        .unwrap();
        let ctx = project.context(FileId(0));
        let calls: Vec<_> = extract_calls_matching(ctx, |name| name == "post").collect();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].target.is_some());
    }

    #[test]
    fn test_empty_file_has_no_calls() {
        let project = Project::from_sources([("A.kt", "")]).unwrap();
        assert_eq!(extract_calls(project.context(FileId(0))).count(), 0);
    }
}
