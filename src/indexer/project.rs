use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::{BusError, Result};
use crate::index::{FileId, SymbolTable};
use crate::indexer::extractor::DeclarationExtractor;
use crate::indexer::parser::{ParsedFile, Parser};
use crate::indexer::walker::FileWalker;
use crate::languages::{Dialect, LanguageRegistry};
use crate::resolve::FileContext;

/// Every parsed source file of a project plus the symbol table built over
/// them. Immutable once loaded.
pub struct Project {
    root: PathBuf,
    files: Vec<ParsedFile>,
    table: SymbolTable,
}

impl Project {
    /// Walks and parses all Java and Kotlin files under `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let walker = FileWalker::new(LanguageRegistry::new());
        let mut paths = Vec::new();
        for dialect in Dialect::ALL {
            paths.extend(walker.walk_dialect(root, dialect)?);
        }
        tracing::info!("Parsing {} source files under {}", paths.len(), root.display());

        let parser = Parser::new(LanguageRegistry::new());
        let files: Vec<ParsedFile> = paths
            .par_iter()
            .filter_map(|path| match parser.parse_file(path) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        Ok(Self::from_parsed(root, files))
    }

    /// Builds a project from in-memory sources; paths pick the dialect.
    pub fn from_sources<P, S>(sources: impl IntoIterator<Item = (P, S)>) -> Result<Self>
    where
        P: AsRef<Path>,
        S: Into<String>,
    {
        let parser = Parser::new(LanguageRegistry::new());
        let mut files = Vec::new();
        for (path, source) in sources {
            let path = path.as_ref();
            let grammar = parser
                .registry()
                .get_for_file(path)
                .ok_or_else(|| BusError::UnsupportedLanguage(path.display().to_string()))?;
            files.push(parser.parse_source(path, source.into(), grammar)?);
        }
        Ok(Self::from_parsed(Path::new(""), files))
    }

    pub fn from_parsed(root: &Path, files: Vec<ParsedFile>) -> Self {
        let extractor = DeclarationExtractor::new();
        let results: Vec<_> = files
            .par_iter()
            .enumerate()
            .map(|(index, file)| extractor.extract(file, FileId(index)))
            .collect();

        Self {
            root: root.to_path_buf(),
            table: SymbolTable::build(results),
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn files(&self) -> &[ParsedFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> &ParsedFile {
        &self.files[id.0]
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Ids of the files of one dialect, in path order.
    pub fn file_ids_of(&self, dialect: Dialect) -> Vec<FileId> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.dialect == dialect)
            .map(|(i, _)| FileId(i))
            .collect()
    }

    /// Finds a file by exact path, then by path relative to the root, then
    /// by path suffix.
    pub fn find_file(&self, path: &Path) -> Option<FileId> {
        let position = |pred: &dyn Fn(&ParsedFile) -> bool| {
            self.files.iter().position(|f| pred(f)).map(FileId)
        };

        position(&|f| f.path == path)
            .or_else(|| {
                let joined = self.root.join(path);
                position(&|f| f.path == joined)
            })
            .or_else(|| position(&|f| f.path.ends_with(path)))
    }

    pub fn context(&self, id: FileId) -> FileContext<'_> {
        FileContext {
            file: self.file(id),
            file_id: id,
            table: &self.table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_sources_builds_table() {
        let project = Project::from_sources([
            ("src/A.java", "package demo; class A {}"),
            ("src/B.kt", "package demo\nobject B"),
        ])
        .unwrap();
        assert_eq!(project.len(), 2);
        assert!(project.table().find_unique_class("demo.A").is_some());
        assert!(project.table().find_unique_class("demo.B").is_some());
        assert_eq!(project.file_ids_of(Dialect::Kotlin), vec![FileId(1)]);
    }

    #[test]
    fn test_from_sources_rejects_unknown_extension() {
        let err = Project::from_sources([("notes.txt", "hi")]).err().unwrap();
        assert!(matches!(err, BusError::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src/demo");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("A.java"), "package demo; class A {}").unwrap();
        fs::write(src.join("B.kt"), "package demo\nclass B : A()").unwrap();

        let project = Project::load(temp_dir.path()).unwrap();
        assert_eq!(project.len(), 2);
        let b = project.table().find_unique_class("demo.B").unwrap();
        let a = project.table().find_unique_class("demo.A").unwrap();
        assert!(project.table().is_subtype(b, a));
    }

    #[test]
    fn test_find_file() {
        let project = Project::from_sources([
            ("src/demo/A.java", "class A {}"),
            ("src/demo/B.kt", "class B"),
        ])
        .unwrap();
        assert_eq!(project.find_file(Path::new("src/demo/B.kt")), Some(FileId(1)));
        assert_eq!(project.find_file(Path::new("A.java")), Some(FileId(0)));
        assert_eq!(project.find_file(Path::new("C.java")), None);
    }
}
