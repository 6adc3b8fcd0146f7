//! Resolved plugin configuration
//!
//! The host decodes its own config file and hands these structs over. Field
//! names accept both the short form used internally (`folders`, `include`,
//! `ignore`) and the plugin option names (`include_folders`,
//! `include_extensions`, `ignore_folders`).

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// One `replace` entry: a bare regex, or a `[regex, template]` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplaceConfig {
    Pattern(String),
    Substitute(String, String),
}

/// Settings for one extraction mode (`start` / `stop` / `replace`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub start: Option<String>,
    pub stop: Option<String>,
    pub replace: Vec<ReplaceConfig>,
}

impl ExtractConfig {
    pub fn block(start: &str, stop: &str) -> Self {
        Self {
            start: Some(start.to_string()),
            stop: Some(stop.to_string()),
            replace: Vec::new(),
        }
    }

    pub fn with_replace(mut self, replace: Vec<ReplaceConfig>) -> Self {
        self.replace = replace;
        self
    }
}

/// One semiliterate entry: which files to scan and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemiliterateConfig {
    pub pattern: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub terminate: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub extract: Vec<ExtractConfig>,
}

impl SemiliterateConfig {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            destination: None,
            terminate: None,
            extract: Vec::new(),
        }
    }
}

/// `extract` may be a single block of settings or a list of them
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<ExtractConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(ExtractConfig),
        Many(Vec<ExtractConfig>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(single)) => vec![single],
        Some(OneOrMany::Many(list)) => list,
        None => Vec::new(),
    })
}

/// Selection and extraction settings for one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleConfig {
    /// Output directory for extracted and copied files
    pub build_dir: PathBuf,
    /// Globs of folders (relative to the root) to search
    #[serde(alias = "include_folders")]
    pub folders: Vec<String>,
    /// Globs or substrings of files copied verbatim
    #[serde(alias = "include_extensions")]
    pub include: Vec<String>,
    /// Globs of paths to exclude
    #[serde(alias = "ignore_folders")]
    pub ignore: Vec<String>,
    pub ignore_hidden: bool,
    /// Absolute paths that are always excluded (build and site dirs)
    pub ignore_paths: Vec<PathBuf>,
    pub semiliterate: Vec<SemiliterateConfig>,
    /// Existing docs directory merged into `build_dir` before the walk
    pub docs_dir: Option<PathBuf>,
}

impl Default for SimpleConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::new(),
            folders: vec!["*".to_string()],
            include: default_include(),
            ignore: Vec::new(),
            ignore_hidden: true,
            ignore_paths: Vec::new(),
            semiliterate: default_semiliterate(),
            docs_dir: None,
        }
    }
}

/// Markdown plus common image/document extensions
pub fn default_include() -> Vec<String> {
    const EXTENSIONS: &[&str] = &[
        // markdown
        ".md", ".markdown", ".mdown", ".mkdn", ".mkd",
        // images and documents
        ".bmp", ".tif", ".tiff", ".gif", ".svg", ".jpeg", ".jpg", ".jif", ".jfif", ".jp2",
        ".jpx", ".j2k", ".j2c", ".fpx", ".pcd", ".png", ".pdf",
    ];
    let mut include: Vec<String> = EXTENSIONS.iter().map(|ext| format!("*{}", ext)).collect();
    include.push(".pages".to_string());
    include
}

/// Built-in semiliterate settings used when none are configured
pub fn default_semiliterate() -> Vec<SemiliterateConfig> {
    let hash_comments = ExtractConfig::block(r"^\s*#+\W?md\b", r"^\s*#\s?/md\s*$")
        .with_replace(vec![ReplaceConfig::Substitute(
            r"^\s*# ?(.*)$".to_string(),
            r"\1".to_string(),
        )]);
    let docstrings = ExtractConfig::block(r#"^\s*"""\W?md\b"#, r#"^\s*"""\s*$"#);

    let block_comments = ExtractConfig::block(r"^\s*/\*+\W?md\b", r"^\s*\*\*/\s*$");
    let line_comments = ExtractConfig::block(r"^\s*//+\W?md\b", r"^\s*//\send\smd\s*$")
        .with_replace(vec![ReplaceConfig::Substitute(
            r"^\s*//\s?(.*)$".to_string(),
            r"\1".to_string(),
        )]);

    let batch_comments = ExtractConfig::block(r"^\s*::+\W?md\b", r"^\s*::\s?/md\s*$")
        .with_replace(vec![ReplaceConfig::Substitute(
            r"^\s*::\s?(.*)$".to_string(),
            r"\1".to_string(),
        )]);

    let html_comments = ExtractConfig::block(r"^\s*<!--\W?md\b", r"^\s*-->\s*$");

    vec![
        SemiliterateConfig::new(r"^LICENSE$"),
        SemiliterateConfig {
            extract: vec![docstrings, hash_comments],
            ..SemiliterateConfig::new(r"\.(py|sh|yaml|yml|toml|cfg|ini|conf)$")
        },
        SemiliterateConfig {
            extract: vec![block_comments, line_comments],
            ..SemiliterateConfig::new(
                r"\.(c|cc|cpp|cxx|h|hpp|hxx|js|jsx|ts|tsx|css|scss|go|java|kt|rs|swift|cs)$",
            )
        },
        SemiliterateConfig {
            extract: vec![batch_comments],
            ..SemiliterateConfig::new(r"\.(bat|cmd)$")
        },
        SemiliterateConfig {
            extract: vec![html_comments],
            ..SemiliterateConfig::new(r"\.(xml|html|htm)$")
        },
    ]
}
