use std::path::{Path, PathBuf};
use std::sync::Arc;

use tree_sitter::Node;

use crate::error::{BusError, Result};
use crate::index::SyntaxAnchor;
use crate::languages::{Dialect, LanguageGrammar, LanguageRegistry};

pub struct Parser {
    registry: LanguageRegistry,
}

impl Parser {
    pub fn new(registry: LanguageRegistry) -> Self {
        Self { registry }
    }

    pub fn parse_file(&self, path: &Path) -> Result<ParsedFile> {
        let grammar = self
            .registry
            .get_for_file(path)
            .ok_or_else(|| BusError::UnsupportedLanguage(path.display().to_string()))?;

        let source = std::fs::read_to_string(path)?;
        self.parse_source(path, source, grammar)
    }

    pub fn parse_source(
        &self,
        path: &Path,
        source: String,
        grammar: Arc<dyn LanguageGrammar>,
    ) -> Result<ParsedFile> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&grammar.language())
            .map_err(|e| BusError::Parse(e.to_string()))?;

        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| BusError::Parse(format!("Failed to parse {}", path.display())))?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            dialect: grammar.dialect(),
            tree,
            source,
            grammar,
        })
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }
}

pub struct ParsedFile {
    pub path: PathBuf,
    pub dialect: Dialect,
    pub tree: tree_sitter::Tree,
    pub source: String,
    pub grammar: Arc<dyn LanguageGrammar>,
}

impl ParsedFile {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    pub fn node_text(&self, node: &Node) -> &str {
        node.utf8_text(self.source_bytes()).unwrap_or("")
    }

    /// Owned navigation anchor for a node of this file.
    pub fn anchor(&self, node: &Node) -> SyntaxAnchor {
        let start = node.start_position();
        SyntaxAnchor {
            file: self.path.clone(),
            dialect: self.dialect,
            byte_range: node.byte_range(),
            line: start.row as u32 + 1,
            column: start.column as u32,
            text: self.node_text(node).to_string(),
        }
    }

    /// Byte offset of a 1-based line and 0-based column, if inside the file.
    pub fn offset_of(&self, line: u32, column: u32) -> Option<usize> {
        let line_index = line.checked_sub(1)? as usize;
        let mut offset = 0;
        for (i, text) in self.source.split_inclusive('\n').enumerate() {
            if i == line_index {
                let col = (column as usize).min(text.trim_end_matches('\n').len());
                return Some(offset + col);
            }
            offset += text.len();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_parser() -> Parser {
        Parser::new(LanguageRegistry::new())
    }

    fn parse(path: &str, source: &str) -> ParsedFile {
        let parser = create_parser();
        let grammar = parser.registry().get_for_file(Path::new(path)).unwrap();
        parser
            .parse_source(Path::new(path), source.to_string(), grammar)
            .unwrap()
    }

    #[test]
    fn test_parse_source_java() {
        let parsed = parse(
            "Main.java",
            r#"
public class Main {
    public static void main(String[] args) {
        System.out.println("Hello");
    }
}
"#,
        );
        assert_eq!(parsed.dialect, Dialect::Java);
        assert_eq!(parsed.root_node().kind(), "program");
        assert!(parsed.root_node().child_count() > 0);
    }

    #[test]
    fn test_parse_source_kotlin() {
        let parsed = parse(
            "Main.kt",
            r#"
package demo

object Bus {
    fun ping() = 1
}
"#,
        );
        assert_eq!(parsed.dialect, Dialect::Kotlin);
        assert_eq!(parsed.root_node().kind(), "source_file");
    }

    #[test]
    fn test_parse_source_empty() {
        let parsed = parse("Empty.java", "");
        assert_eq!(parsed.source, "");
    }

    #[test]
    fn test_parse_file_unsupported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();

        let err = create_parser().parse_file(&path).err().unwrap();
        assert!(matches!(err, BusError::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_parse_file_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("A.kt");
        fs::write(&path, "class A").unwrap();

        let parsed = create_parser().parse_file(&path).unwrap();
        assert_eq!(parsed.path, path);
        assert_eq!(parsed.source, "class A");
    }

    #[test]
    fn test_anchor_positions() {
        let parsed = parse("A.java", "class A {\n  int x;\n}\n");
        let root = parsed.root_node();
        let anchor = parsed.anchor(&root);
        assert_eq!(anchor.line, 1);
        assert_eq!(anchor.column, 0);
        assert_eq!(anchor.dialect, Dialect::Java);
        assert!(anchor.text.starts_with("class A"));
    }

    #[test]
    fn test_offset_of() {
        let parsed = parse("A.java", "class A {\n  int x;\n}\n");
        assert_eq!(parsed.offset_of(1, 0), Some(0));
        assert_eq!(parsed.offset_of(2, 2), Some(12));
        assert_eq!(parsed.offset_of(2, 100), Some(18));
        assert_eq!(parsed.offset_of(0, 0), None);
        assert_eq!(parsed.offset_of(10, 0), None);
    }
}
