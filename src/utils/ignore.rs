//! Utilities for handling .mkdocsignore file patterns
//!
//! An ignore file holds one glob per line, relative to the directory that
//! contains it. Patterns from every ignore file met during a walk are added to
//! one shared `IgnoreSet`, which only ever grows.
//!
use crate::error::ConfigError;
use crate::utils::paths::to_unix_string;
use anyhow::{Context, Result};
use glob::{Pattern, PatternError};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const IGNORE_FILE: &str = ".mkdocsignore";

/// Load the patterns of `directory/.mkdocsignore`
///
/// Returns `None` when there is no ignore file. Empty lines and comments
/// (lines starting with #) are skipped, so a file holding only comments
/// yields `Some(vec![])`.
///
/// # Examples
///
/// ```text
/// # .mkdocsignore file content
/// generated/*
/// *.min.js
/// ```
pub fn load_ignore_file(directory: &Path) -> Result<Option<Vec<String>>> {
    let ignore_file = directory.join(IGNORE_FILE);

    if !ignore_file.is_file() {
        return Ok(None);
    }

    let content = fs::read_to_string(&ignore_file)
        .with_context(|| format!("Failed to read {}", ignore_file.display()))?;

    let patterns: Vec<String> = content
        .lines()
        .map(|line| line.trim_end())
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect();

    debug!(
        "Loaded {} ignore patterns from {}",
        patterns.len(),
        ignore_file.display()
    );

    Ok(Some(patterns))
}

/// Compile an fnmatch-style glob
///
/// A run of `*` that is not a whole path component becomes a single `*`,
/// which matches the same paths since `*` already crosses `/` here.
pub fn compile_fnmatch(pattern: &str) -> Result<Pattern, PatternError> {
    let mut glob = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find('*') {
        let run = rest[start..].len() - rest[start..].trim_start_matches('*').len();
        let whole = ((start == 0 && glob.is_empty()) || rest[..start].ends_with('/'))
            && (start + run == rest.len() || rest[start + run..].starts_with('/'));
        glob.push_str(&rest[..start]);
        glob.push_str(if whole && run > 1 { "**" } else { "*" });
        rest = &rest[start + run..];
    }
    glob.push_str(rest);
    Pattern::new(&glob)
}

/// Accumulated ignore globs, matched against root-relative `/` paths
#[derive(Debug, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
    seen: HashSet<String>,
    loaded_dirs: HashSet<PathBuf>,
}

impl IgnoreSet {
    /// Seed the set from configured globs; an invalid glob is a config error
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for pattern in patterns {
            set.insert(pattern.as_ref())?;
        }
        Ok(set)
    }

    /// Add one glob; duplicates are ignored
    pub fn insert(&mut self, pattern: &str) -> Result<(), ConfigError> {
        if self.seen.contains(pattern) {
            return Ok(());
        }
        let compiled = compile_fnmatch(pattern).map_err(|source| ConfigError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?;
        self.seen.insert(pattern.to_string());
        self.patterns.push(compiled);
        Ok(())
    }

    /// Read the ignore file of `relative_dir` (below `root`) once
    ///
    /// Patterns are joined to the directory. A file without patterns ignores
    /// the whole directory. Unreadable files and invalid globs are logged and
    /// skipped.
    pub fn load_dir(&mut self, root: &Path, relative_dir: &Path) {
        if !self.loaded_dirs.insert(relative_dir.to_path_buf()) {
            return;
        }

        let patterns = match load_ignore_file(&root.join(relative_dir)) {
            Ok(Some(patterns)) => patterns,
            Ok(None) => return,
            Err(e) => {
                warn!("Ignoring unreadable {}: {:#}", IGNORE_FILE, e);
                return;
            }
        };

        let prefix = to_unix_string(relative_dir);
        let scoped = |pattern: &str| {
            let pattern = pattern.trim_start_matches('/');
            if prefix.is_empty() {
                pattern.to_string()
            } else {
                format!("{}/{}", prefix, pattern)
            }
        };

        let patterns = if patterns.is_empty() {
            vec![scoped("**")]
        } else {
            patterns.iter().map(|p| scoped(p.as_str())).collect()
        };

        for pattern in patterns {
            if let Err(e) = self.insert(&pattern) {
                warn!("Skipping pattern from {}: {}", IGNORE_FILE, e);
            }
        }
    }

    /// Load the ignore files of every directory above `relative`, root first
    pub fn load_ancestors(&mut self, root: &Path, relative: &Path) {
        let mut dirs: Vec<&Path> = relative.ancestors().skip(1).collect();
        dirs.reverse();
        for dir in dirs {
            self.load_dir(root, dir);
        }
    }

    /// fnmatch-style match: `*` also crosses `/`
    pub fn is_match(&self, relative: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(relative))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }
}
