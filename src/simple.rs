//! Simple - select documentation inputs from a source tree and build them
//!
//! Every file below the configured folders is either copied (doc files such
//! as markdown and images), offered to the semiliterate settings for
//! extraction, or skipped. The resulting [`Manifest`] lists what was produced.
//!
//! Ignore rules, in order:
//! 1. absolute `ignore_paths` (the build and site directories);
//! 2. `ignore` globs plus the contents of every `.mkdocsignore` met on the way
//!    down from the root.

use crate::config::SimpleConfig;
use crate::error::{ConfigError, SimpleError};
use crate::extractors::Semiliterate;
use crate::manifest::{FileRecord, Manifest};
use crate::utils::file_utils::{copy_preserving_mtime, is_newer, is_text_file, modified_time};
use crate::utils::ignore::{compile_fnmatch, IgnoreSet};
use crate::utils::paths::{
    absolute, has_hidden_attribute, has_hidden_prefix, normalize, to_relative_unix_style,
    to_unix_string,
};
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Options for one build pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Only rebuild files modified after `last_build_time`
    pub dirty: bool,
    pub last_build_time: Option<SystemTime>,
    /// Copy doc files into the build directory instead of using them in place
    pub do_copy: bool,
}

/// A copy-glob; matches as fnmatch pattern or as plain substring
#[derive(Debug, Clone)]
struct DocPattern {
    text: String,
    glob: Pattern,
}

impl DocPattern {
    fn matches(&self, path: &str) -> bool {
        self.glob.matches(path) || path.contains(&self.text)
    }
}

/// File selector for one source tree
#[derive(Debug)]
pub struct Simple {
    root: PathBuf,
    build_dir: PathBuf,
    folders: Vec<String>,
    doc_patterns: Vec<DocPattern>,
    ignore: IgnoreSet,
    ignore_hidden: bool,
    ignore_paths: Vec<PathBuf>,
    semiliterate: Vec<Semiliterate>,
}

impl Simple {
    /// Compile the configuration for the tree at `root`
    ///
    /// A relative `build_dir` is taken relative to `root`. The build
    /// directory is always excluded from the walk.
    pub fn new(root: impl AsRef<Path>, config: &SimpleConfig) -> Result<Self, ConfigError> {
        if config.build_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingBuildDir);
        }
        let root = absolute(root.as_ref());
        let build_dir = absolute(&root.join(&config.build_dir));

        let mut folders = Vec::new();
        for folder in &config.folders {
            Pattern::new(folder).map_err(|source| ConfigError::InvalidGlob {
                pattern: folder.clone(),
                source,
            })?;
            if !folders.contains(folder) {
                folders.push(folder.clone());
            }
        }

        let doc_patterns = config
            .include
            .iter()
            .map(|text| {
                compile_fnmatch(text)
                    .map(|glob| DocPattern {
                        text: text.clone(),
                        glob,
                    })
                    .map_err(|source| ConfigError::InvalidGlob {
                        pattern: text.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut ignore_paths: Vec<PathBuf> = Vec::new();
        for path in config.ignore_paths.iter().chain(std::iter::once(&build_dir)) {
            let path = absolute(&root.join(path));
            if !ignore_paths.contains(&path) {
                ignore_paths.push(path);
            }
        }

        let semiliterate = config
            .semiliterate
            .iter()
            .map(Semiliterate::compile)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Selecting from {} into {} ({} semiliterate entries)",
            root.display(),
            build_dir.display(),
            semiliterate.len()
        );

        Ok(Self {
            root,
            build_dir,
            folders,
            doc_patterns,
            ignore: IgnoreSet::new(&config.ignore)?,
            ignore_hidden: config.ignore_hidden,
            ignore_paths,
            semiliterate,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn ignore_paths(&self) -> &[PathBuf] {
        &self.ignore_paths
    }

    pub fn ignore_set(&self) -> &IgnoreSet {
        &self.ignore
    }

    /// Add an absolute path that is excluded from now on
    pub fn add_ignore_path(&mut self, path: &Path) {
        let path = absolute(&self.root.join(path));
        if !self.ignore_paths.contains(&path) {
            self.ignore_paths.push(path);
        }
    }

    /// Every file to process, excluding ignored files
    ///
    /// Folder globs are expanded in configuration order; matched files are
    /// kept as is and matched directories are walked in file-name order.
    /// Ignored directories are not descended into.
    pub fn get_files(&mut self) -> Vec<PathBuf> {
        let mut entries = Vec::new();
        for pattern in self.folders.clone() {
            entries.extend(self.expand_folder(&pattern));
        }
        let mut seen = HashSet::new();
        entries.retain(|entry| seen.insert(entry.clone()));
        entries.retain(|entry| !self.is_ignored(entry));

        let mut files: Vec<PathBuf> = entries.iter().filter(|e| e.is_file()).cloned().collect();
        for directory in entries.iter().filter(|e| e.is_dir()) {
            let walker = WalkDir::new(directory)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !self.is_ignored(entry.path()));

            for entry in walker {
                match entry {
                    Ok(entry) if !entry.file_type().is_dir() => files.push(entry.into_path()),
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable entry: {}", e),
                }
            }
        }

        let mut seen = HashSet::new();
        files.retain(|file| seen.insert(file.clone()));
        files
    }

    /// Entries below the root whose root-relative path matches `pattern`
    ///
    /// `*` stays within one component and `**` spans any number of them.
    /// Ignored directories are pruned from the search.
    fn expand_folder(&mut self, pattern: &str) -> Vec<PathBuf> {
        let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
        if pattern.is_empty() || pattern == "." {
            return vec![self.root.clone()];
        }

        let glob = match Pattern::new(pattern) {
            Ok(glob) => glob,
            Err(e) => {
                warn!("Invalid folder glob {:?}: {}", pattern, e);
                return Vec::new();
            }
        };
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        let max_depth = if pattern.contains("**") {
            usize::MAX
        } else {
            pattern.split('/').count()
        };

        let root = self.root.clone();
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry.path()));

        let mut matched = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    let Ok(relative) = entry.path().strip_prefix(&root) else {
                        continue;
                    };
                    if glob.matches_with(&to_unix_string(relative), options) {
                        matched.push(entry.into_path());
                    }
                }
                Err(e) => warn!("Skipping unreadable folder entry: {}", e),
            }
        }
        matched
    }

    /// Check if a path (absolute or relative to the root) should be ignored
    ///
    /// Loads the `.mkdocsignore` of every directory above the path, so the
    /// ignore set grows as the walk goes deeper.
    pub fn is_ignored(&mut self, path: &Path) -> bool {
        let full = normalize(&self.root.join(path));

        if let Some(ignored) = self.ignore_paths.iter().find(|p| full.starts_with(p)) {
            debug!("Ignoring {} (inside {})", full.display(), ignored.display());
            return true;
        }

        let Ok(relative) = full.strip_prefix(&self.root) else {
            return false;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }

        self.ignore.load_ancestors(&self.root, relative);
        self.ignore.is_match(&to_unix_string(relative))
    }

    /// Check if the file is copied as is (markdown, images, `.pages`)
    pub fn is_doc_file(&self, path: &Path) -> bool {
        let name = to_unix_string(self.relative(path));
        self.doc_patterns.iter().any(|p| p.matches(&name))
    }

    /// Check if a file may be offered for extraction
    ///
    /// Binary files never are; hidden files (a `.` or `__` prefix on any
    /// component below the root, or the OS hidden attribute) only when
    /// `ignore_hidden` is off.
    pub fn should_extract_file(&self, path: &Path) -> bool {
        let full = self.root.join(path);
        if !is_text_file(&full) {
            debug!("Not extracting binary file {}", full.display());
            return false;
        }

        if self.ignore_hidden
            && (has_hidden_prefix(self.relative(&full)) || has_hidden_attribute(&full))
        {
            debug!("Not extracting hidden file {}", full.display());
            return false;
        }
        true
    }

    /// Extract `from_dir/name` into `to_dir` with the first entry that produces output
    pub fn try_extract(&self, from_dir: &Path, name: &str, to_dir: &Path) -> Vec<PathBuf> {
        if !self.should_extract_file(&from_dir.join(name)) {
            return Vec::new();
        }
        for item in &self.semiliterate {
            let paths = item.try_extraction(from_dir, name, to_dir);
            if !paths.is_empty() {
                return paths;
            }
        }
        Vec::new()
    }

    /// Build the docs directory from workspace files
    ///
    /// Failures are logged per file; the walk always completes.
    pub fn build(&mut self, options: &BuildOptions) -> Manifest {
        let mut manifest = Manifest::new();

        for file in self.get_files() {
            if !file.is_file() {
                continue;
            }
            if options.dirty && !self.modified_since(&file, options.last_build_time) {
                continue;
            }

            let Ok(relative) = file.strip_prefix(&self.root).map(Path::to_path_buf) else {
                continue;
            };
            let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
                warn!("Skipping {}: file name is not valid UTF-8", file.display());
                continue;
            };
            let from_dir = file.parent().unwrap_or(self.root.as_path());
            let to_dir = match relative.parent() {
                Some(parent) => self.build_dir.join(parent),
                None => self.build_dir.clone(),
            };

            if self.is_doc_file(&relative) {
                if let Some(record) = self.doc_record(&file, &relative, options.do_copy) {
                    info!("Added {}", relative.display());
                    manifest.push(record);
                }
                continue;
            }

            for path in self.try_extract(from_dir, name, &to_dir) {
                info!("Added {} -> {}", relative.display(), path.display());
                manifest.push(FileRecord {
                    input_path: file.clone(),
                    output_relpath: self.build_relpath(&path),
                    output_root: self.build_dir.clone(),
                });
            }
        }

        manifest
    }

    /// Copy a docs directory into the build directory
    ///
    /// Modification times are preserved. When `dirty`, destinations that are
    /// at least as new as their source are kept. The merged directory is
    /// excluded from later walks.
    pub fn merge_docs(&mut self, from_dir: &Path, dirty: bool) -> Result<(), SimpleError> {
        let from_dir = absolute(&self.root.join(from_dir));
        if !from_dir.is_dir() || from_dir == self.build_dir {
            return Ok(());
        }

        for entry in WalkDir::new(&from_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| SimpleError::Merge {
                path: e.path().map_or_else(|| from_dir.clone(), Path::to_path_buf),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let source = entry.path();
            let Ok(relative) = source.strip_prefix(&from_dir) else {
                continue;
            };
            let destination = self.build_dir.join(relative);

            if dirty {
                let stale = is_newer(source, &destination).map_err(|e| SimpleError::Merge {
                    path: source.to_path_buf(),
                    source: e,
                })?;
                if !stale {
                    continue;
                }
            }

            copy_preserving_mtime(source, &destination).map_err(|e| SimpleError::Merge {
                path: source.to_path_buf(),
                source: e,
            })?;
            info!("{} --> {}", source.display(), destination.display());
        }

        self.add_ignore_path(&from_dir);
        Ok(())
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    fn modified_since(&self, file: &Path, last_build_time: Option<SystemTime>) -> bool {
        let Some(last_build_time) = last_build_time else {
            return true;
        };
        match modified_time(file) {
            Ok(modified) => modified > last_build_time,
            Err(e) => {
                warn!("{:#}", e);
                false
            }
        }
    }

    fn doc_record(&self, file: &Path, relative: &Path, do_copy: bool) -> Option<FileRecord> {
        let output_relpath = to_unix_string(relative);
        if !do_copy {
            return Some(FileRecord {
                input_path: file.to_path_buf(),
                output_root: self.root.clone(),
                output_relpath,
            });
        }

        let destination = self.build_dir.join(relative);
        if let Err(e) = copy_preserving_mtime(file, &destination) {
            warn!("Could not copy {}: {}", file.display(), e);
            return None;
        }
        Some(FileRecord {
            input_path: file.to_path_buf(),
            output_root: self.build_dir.clone(),
            output_relpath,
        })
    }

    fn build_relpath(&self, path: &Path) -> String {
        match path.strip_prefix(&self.build_dir) {
            Ok(relative) => to_unix_string(relative),
            Err(_) => to_relative_unix_style(path, &self.build_dir)
                .unwrap_or_else(|_| to_unix_string(path)),
        }
    }
}
