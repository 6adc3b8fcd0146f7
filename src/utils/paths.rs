// Path helpers for the file selector
//
// Relative paths are handed to glob matching and to the manifest with `/`
// separators on every platform, so ignore files and configured globs behave
// the same on Windows and Unix.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Name prefixes that mark a path component as hidden
pub const HIDDEN_PREFIXES: &[&str] = &[".", "__"];

/// Convert a path inside `root` to a relative Unix-style path (with `/` separators)
///
/// Both paths are canonicalized when they exist so symlinked roots (e.g.
/// `/var` -> `/private/var` on macOS) still share a prefix; otherwise the
/// lexical paths are compared.
///
/// # Examples
/// ```text
/// to_relative_unix_style("/home/me/project/src/main.rs", "/home/me/project")
/// // => "src/main.rs"
/// ```
pub fn to_relative_unix_style(absolute: &Path, root: &Path) -> Result<String> {
    let (path_to_use, root_to_use) = match (absolute.canonicalize(), root.canonicalize()) {
        (Ok(canonical_abs), Ok(canonical_root)) => (canonical_abs, canonical_root),
        _ => (normalize(absolute), normalize(root)),
    };

    // Canonicalized Windows paths carry a \\?\ prefix that plain paths lack
    #[cfg(windows)]
    fn strip_unc_prefix(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        match path_str.strip_prefix(r"\\?\") {
            Some(stripped) => PathBuf::from(stripped),
            None => path.to_path_buf(),
        }
    }

    #[cfg(not(windows))]
    fn strip_unc_prefix(path: &Path) -> PathBuf {
        path.to_path_buf()
    }

    let normalized_path = strip_unc_prefix(&path_to_use);
    let normalized_root = strip_unc_prefix(&root_to_use);

    let relative = normalized_path
        .strip_prefix(&normalized_root)
        .with_context(|| {
            format!(
                "Path '{}' is not within '{}'",
                normalized_path.display(),
                normalized_root.display()
            )
        })?;

    let path_str = relative.to_str().context("Path contains invalid UTF-8")?;
    Ok(to_unix_separators(path_str))
}

/// Render a relative path with `/` separators, lossily for non-UTF-8 names
pub fn to_unix_string(path: &Path) -> String {
    to_unix_separators(&path.to_string_lossy())
}

fn to_unix_separators(path: &str) -> String {
    if MAIN_SEPARATOR == '\\' {
        path.replace('\\', "/")
    } else {
        path.to_string()
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
///
/// `..` at the start of a relative path is kept, since there is nothing to
/// pop.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(name) => normalized.push(name),
        }
    }
    normalized
}

/// Absolute form of `path` with symlinks resolved as far as the path exists
///
/// Works for paths that do not exist yet (e.g. a build directory before the
/// first build): the nearest existing ancestor is canonicalized and the rest
/// is appended lexically.
pub fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    let normalized = normalize(&joined);

    let mut existing = normalized.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// Whether any component of `relative` starts with a hidden prefix
///
/// A lone `.` component is not hidden.
pub fn has_hidden_prefix(relative: &Path) -> bool {
    relative.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            HIDDEN_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
        }
        _ => false,
    })
}

/// Whether the filesystem marks `path` as hidden (Windows only)
#[cfg(windows)]
pub fn has_hidden_attribute(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    std::fs::metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
pub fn has_hidden_attribute(_path: &Path) -> bool {
    false
}
