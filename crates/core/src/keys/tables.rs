//! Lookup table enumeration.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::error::TableError;

/// One rainbow-table file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupTable {
    path: PathBuf,
}

impl LookupTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name, for logs.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// Lists the regular files in `dir` whose extension matches `extension`
/// (case-insensitive, leading dot optional), sorted by file name.
pub fn discover_tables(dir: &Path, extension: &str) -> Result<Vec<LookupTable>, TableError> {
    let wanted = extension.trim_start_matches('.');
    let entries = std::fs::read_dir(dir).map_err(|source| TableError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut tables: Vec<LookupTable> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(wanted))
        })
        .map(LookupTable::new)
        .collect();

    tables.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "c.rt");
        touch(&dir, "a.RT");
        touch(&dir, "b.rt");
        touch(&dir, "readme.txt");
        touch(&dir, "rt");
        std::fs::create_dir(dir.path().join("nested.rt")).unwrap();

        let tables = discover_tables(dir.path(), "rt").unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["a.RT", "b.rt", "c.rt"]);
    }

    #[test]
    fn test_discover_accepts_dotted_extension() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "x.rt");
        assert_eq!(discover_tables(dir.path(), ".rt").unwrap().len(), 1);
    }

    #[test]
    fn test_discover_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(discover_tables(dir.path(), "rt").unwrap().is_empty());
    }

    #[test]
    fn test_discover_missing_dir() {
        let result = discover_tables(Path::new("/nonexistent/aax2m4b/tables"), "rt");
        assert!(matches!(result, Err(TableError::ReadDir { .. })));
    }
}
