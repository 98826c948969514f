//! Source discovery.
//!
//! Walks the source directory recursively and returns every regular file whose
//! extension matches the configured source extension exactly (case-sensitive,
//! so `png` does not pick up `PNG`). Results are sorted by path so reports and
//! logs are stable between runs; processing order is not.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (or config-relative) path used for reading.
    pub path: PathBuf,
    /// Path relative to the source root, mirrored under the destination.
    pub relative: PathBuf,
}

/// Find all files under `root` with extension `ext` (no leading dot).
pub fn discover(root: &Path, ext: &str) -> Result<Vec<SourceFile>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        files.push(SourceFile {
            path: path.to_path_buf(),
            relative,
        });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn relatives(files: &[SourceFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.relative.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn discovers_nested_files_sorted() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.png");
        touch(tmp.path(), "a/z.png");
        touch(tmp.path(), "a/b/c.png");

        let files = discover(tmp.path(), "png").unwrap();
        assert_eq!(relatives(&files), vec!["a/b/c.png", "a/z.png", "b.png"]);
        assert_eq!(files[2].path, tmp.path().join("b.png"));
    }

    #[test]
    fn filters_by_exact_extension() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "keep.png");
        touch(tmp.path(), "upper.PNG");
        touch(tmp.path(), "photo.jpg");
        touch(tmp.path(), "notes.png.txt");
        touch(tmp.path(), "noext");

        let files = discover(tmp.path(), "png").unwrap();
        assert_eq!(relatives(&files), vec!["keep.png"]);
    }

    #[test]
    fn directory_named_like_source_is_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("folder.png")).unwrap();
        touch(tmp.path(), "folder.png/inner.png");

        let files = discover(tmp.path(), "png").unwrap();
        assert_eq!(relatives(&files), vec!["folder.png/inner.png"]);
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(tmp.path(), "png").unwrap().is_empty());
    }

    #[test]
    fn missing_root_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(&tmp.path().join("missing"), "png").is_err());
    }
}
