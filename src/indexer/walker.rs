use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{BusError, Result};
use crate::languages::{Dialect, LanguageRegistry};

/// Enumerates the source files of a project, honouring ignore files.
pub struct FileWalker {
    registry: LanguageRegistry,
}

impl FileWalker {
    pub fn new(registry: LanguageRegistry) -> Self {
        Self { registry }
    }

    /// All supported source files below `root`.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        self.collect(root, |_| true)
    }

    /// Source files of a single dialect below `root`.
    pub fn walk_dialect(&self, root: &Path, dialect: Dialect) -> Result<Vec<PathBuf>> {
        self.collect(root, |d| d == dialect)
    }

    fn collect(&self, root: &Path, keep: impl Fn(Dialect) -> bool) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(BusError::FileNotFound(root.display().to_string()));
        }

        let mut files = Vec::new();

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(dialect) = self.registry.dialect_of(path) {
                if keep(dialect) {
                    files.push(path.to_path_buf());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.registry.dialect_of(path).is_some()
    }
}
