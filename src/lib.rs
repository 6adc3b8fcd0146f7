// Simple Core - documentation extraction and file selection
//
// Finds documentation in a source tree (markdown files, images, and doc
// blocks embedded in source comments) and builds it into a docs directory.
// The host site builder hands over a resolved configuration and consumes the
// returned manifest.

use std::path::Path;

pub mod config;
pub mod error;
pub mod extractors;
pub mod manifest;
pub mod simple;
pub mod utils;

pub use config::{ExtractConfig, ReplaceConfig, SemiliterateConfig, SimpleConfig};
pub use error::{ConfigError, ExtractError, SimpleError};
pub use extractors::{Semiliterate, StreamExtract};
pub use manifest::{FileRecord, Manifest};
pub use simple::{BuildOptions, Simple};

/// Build the docs for the tree at `root`
///
/// Merges `config.docs_dir` into the build directory first when it exists,
/// then copies and extracts every selected file. Only configuration errors
/// and failures while merging abort the build; per-file problems are logged
/// and skipped.
pub fn build(
    root: impl AsRef<Path>,
    config: &SimpleConfig,
    options: BuildOptions,
) -> Result<Manifest, SimpleError> {
    let mut simple = Simple::new(root, config)?;
    if let Some(docs_dir) = &config.docs_dir {
        simple.merge_docs(docs_dir, options.dirty)?;
    }
    Ok(simple.build(&options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn samples() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("test_samples")
    }

    #[test]
    fn test_default_settings_on_samples() {
        let build_dir = TempDir::new().unwrap();
        let config = SimpleConfig {
            build_dir: build_dir.path().to_path_buf(),
            ..SimpleConfig::default()
        };

        let manifest = build(samples(), &config, BuildOptions::default()).unwrap();
        let outputs: Vec<&str> = manifest.iter().map(|r| r.output_relpath.as_str()).collect();

        assert_eq!(
            outputs,
            vec!["LICENSE.md", "README.md", "module.md", "extractor.snippet", "parser.md"]
        );

        let module = fs::read_to_string(build_dir.path().join("module.md")).unwrap();
        assert_eq!(
            module,
            "# Sample module\n\nTurns greetings into shouts.\n\n## shout\n\nUppercase `text`.\n"
        );

        let parser = fs::read_to_string(build_dir.path().join("parser.md")).unwrap();
        assert_eq!(parser, "# Parser\n\nReads one line at a time.\n\n## Limits\n\nNo nesting.\n");

        let snippet = fs::read_to_string(build_dir.path().join("extractor.snippet")).unwrap();
        assert_eq!(snippet, "Extracted into its own file.\n");

        let license = fs::read_to_string(build_dir.path().join("LICENSE.md")).unwrap();
        assert!(license.starts_with("MIT License\n"));
    }

    #[test]
    fn test_docs_dir_is_merged_not_walked() {
        let root = TempDir::new().unwrap();
        let build_dir = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("docs")).unwrap();
        fs::write(root.path().join("docs/index.md"), "# Home\n").unwrap();
        fs::write(root.path().join("tool.sh"), "# md\n# Tool\n# /md\n").unwrap();

        let config = SimpleConfig {
            build_dir: build_dir.path().to_path_buf(),
            docs_dir: Some(PathBuf::from("docs")),
            ..SimpleConfig::default()
        };
        let manifest = build(root.path(), &config, BuildOptions::default()).unwrap();

        let outputs: Vec<&str> = manifest.iter().map(|r| r.output_relpath.as_str()).collect();
        assert_eq!(outputs, vec!["tool.md"]);
        assert_eq!(fs::read_to_string(build_dir.path().join("index.md")).unwrap(), "# Home\n");
        assert_eq!(fs::read_to_string(build_dir.path().join("tool.md")).unwrap(), "Tool\n");
    }

    #[test]
    fn test_invalid_config_aborts_build() {
        let root = TempDir::new().unwrap();
        let config = SimpleConfig {
            build_dir: root.path().join("site"),
            ignore: vec!["[".to_string()],
            ..SimpleConfig::default()
        };
        assert!(matches!(
            build(root.path(), &config, BuildOptions::default()),
            Err(SimpleError::Config(ConfigError::InvalidGlob { .. }))
        ));
    }
}
