// Utilities Module
//
// Filesystem helpers shared by the file selector.

use anyhow::{Context, Result};
use std::path::Path;

/// File utilities
pub mod file_utils {
    use super::*;
    use filetime::FileTime;
    use std::fs;
    use std::time::SystemTime;

    /// Check if a file decodes as UTF-8 text
    ///
    /// Unreadable files count as non-text.
    pub fn is_text_file(path: &Path) -> bool {
        match fs::read(path) {
            Ok(bytes) => std::str::from_utf8(&bytes).is_ok(),
            Err(_) => false,
        }
    }

    /// Last modification time of `path`
    pub fn modified_time(path: &Path) -> Result<SystemTime> {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to read modification time of {}", path.display()))
    }

    /// Whether `source` was modified after `destination`
    ///
    /// A missing destination counts as stale.
    pub fn is_newer(source: &Path, destination: &Path) -> std::io::Result<bool> {
        if !destination.exists() {
            return Ok(true);
        }
        let source_time = fs::metadata(source)?.modified()?;
        Ok(source_time > fs::metadata(destination)?.modified()?)
    }

    /// Copy `from` to `to`, creating parent directories and keeping the mtime
    ///
    /// An existing destination is replaced.
    pub fn copy_preserving_mtime(from: &Path, to: &Path) -> std::io::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        if to.exists() {
            fs::remove_file(to)?;
        }
        fs::copy(from, to)?;
        let metadata = fs::metadata(from)?;
        filetime::set_file_mtime(to, FileTime::from_last_modification_time(&metadata))
    }
}

/// Path conversion utilities (normalization, relative Unix-style, hidden checks)
pub mod paths;

/// File ignore pattern utilities (.mkdocsignore support)
pub mod ignore;

#[cfg(test)]
mod tests {
    use super::file_utils::*;
    use filetime::{set_file_mtime, FileTime};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_text_file() {
        let temp_dir = TempDir::new().unwrap();
        let text = temp_dir.path().join("notes.txt");
        let binary = temp_dir.path().join("image.bin");
        fs::write(&text, "plain text ✓").unwrap();
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        assert!(is_text_file(&text));
        assert!(!is_text_file(&binary));
        assert!(!is_text_file(&temp_dir.path().join("missing.txt")));
    }

    #[test]
    fn test_copy_preserves_mtime_and_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("docs/index.md");
        let destination = temp_dir.path().join("build/nested/index.md");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "# Index").unwrap();
        set_file_mtime(&source, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

        fs::create_dir_all(destination.parent().unwrap()).unwrap();
        fs::write(&destination, "stale").unwrap();

        copy_preserving_mtime(&source, &destination).unwrap();

        assert_eq!(fs::read_to_string(&destination).unwrap(), "# Index");
        let copied = FileTime::from_last_modification_time(&fs::metadata(&destination).unwrap());
        assert_eq!(copied.unix_seconds(), 1_600_000_000);
    }

    #[test]
    fn test_is_newer() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.md");
        let destination = temp_dir.path().join("b.md");
        fs::write(&source, "a").unwrap();

        assert!(is_newer(&source, &destination).unwrap(), "missing destination is stale");

        fs::write(&destination, "b").unwrap();
        set_file_mtime(&source, FileTime::from_unix_time(1_000, 0)).unwrap();
        set_file_mtime(&destination, FileTime::from_unix_time(2_000, 0)).unwrap();
        assert!(!is_newer(&source, &destination).unwrap());

        set_file_mtime(&source, FileTime::from_unix_time(3_000, 0)).unwrap();
        assert!(is_newer(&source, &destination).unwrap());
    }
}
