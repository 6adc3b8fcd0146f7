//! Semiliterate - extract documentation from source files using regex settings
//!
//! `pattern`: any file whose name contains a match is scanned.
//!
//! `destination`: by default the extracted text goes to the file name with
//! its last extension replaced by `.md`. When set, the template is expanded
//! with the match of `pattern` against the file name instead.
//!
//! `terminate`: all extraction from the file ends on a line matching this
//! regex, whether or not a block is open. Its last captured group, if any, is
//! written when a block is open (start and stop behave the same way).
//!
//! `extract`: the extraction modes, tried in order.

use super::base::{compile_optional, compile_regex, Template};
use super::rule::ExtractionPattern;
use super::stream::StreamExtract;
use crate::config::SemiliterateConfig;
use crate::error::{ConfigError, ExtractError};
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Semiliterate {
    file_filter: Regex,
    destination: Option<Template>,
    terminate: Option<Regex>,
    extractions: Vec<ExtractionPattern>,
}

impl Semiliterate {
    /// Compile every regex and template up front
    pub fn compile(config: &SemiliterateConfig) -> Result<Self, ConfigError> {
        let file_filter = compile_regex("pattern", &config.pattern)?;
        let destination = config
            .destination
            .as_deref()
            .map(|template| Template::compile("destination", template, &file_filter))
            .transpose()?;
        let terminate = compile_optional("terminate", config.terminate.as_deref())?;
        let extractions = config
            .extract
            .iter()
            .map(ExtractionPattern::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            file_filter,
            destination,
            terminate,
            extractions,
        })
    }

    /// Output file name for `name`, or `None` if this entry does not apply
    pub fn filename_match(&self, name: &str) -> Option<String> {
        let caps = self.file_filter.captures(name)?;
        if let Some(template) = &self.destination {
            return Some(template.expand(&caps));
        }
        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        Some(format!("{}.md", stem))
    }

    /// Extract `from_directory/from_file` into `destination_directory`
    ///
    /// Returns the files written, empty when the name does not match or
    /// nothing was extracted.
    pub fn extract_file(
        &self,
        from_directory: &Path,
        from_file: &str,
        destination_directory: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let Some(to_file) = self.filename_match(from_file) else {
            return Ok(Vec::new());
        };
        let from_path = from_directory.join(from_file);
        let file = File::open(&from_path).map_err(|e| ExtractError::io(&from_path, e))?;

        debug!("Scanning {}...", from_path.display());
        StreamExtract::new(
            &self.extractions,
            self.terminate.as_ref(),
            destination_directory,
            &to_file,
        )
        .extract(BufReader::new(file), &from_path)
    }

    /// Like `extract_file`, but failures are logged and yield no files
    pub fn try_extraction(
        &self,
        from_directory: &Path,
        from_file: &str,
        destination_directory: &Path,
    ) -> Vec<PathBuf> {
        match self.extract_file(from_directory, from_file, destination_directory) {
            Ok(paths) => paths,
            Err(e @ ExtractError::Decode { .. }) => {
                debug!("Skipped {}: {}", from_directory.join(from_file).display(), e);
                Vec::new()
            }
            Err(e) => {
                warn!("Could not build {}: {}", from_directory.join(from_file).display(), e);
                Vec::new()
            }
        }
    }
}
