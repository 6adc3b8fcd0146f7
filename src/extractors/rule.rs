//! ExtractionPattern - one start/stop/replace extraction mode
//!
//! Only the first pattern whose `start` matches is activated, so at most one
//! mode is active at a time. A pattern without `start` is active from the
//! first line of the scanned file and cannot be reactivated once it stops,
//! which is how front-matter extraction is expressed.

use super::base::{compile_optional, compile_regex, last_group, Template};
use super::directive::InlineDirective;
use crate::config::{ExtractConfig, ReplaceConfig};
use crate::error::ConfigError;
use regex::Regex;

/// One entry of a `replace` list
#[derive(Debug, Clone)]
pub enum Replacement {
    /// Emit the last captured group of a match, or nothing when there is none
    Capture(Regex),
    /// Emit the template expanded with the match
    Substitute(Regex, Template),
}

impl Replacement {
    fn compile(config: &ReplaceConfig) -> Result<Self, ConfigError> {
        match config {
            ReplaceConfig::Pattern(pattern) => {
                Ok(Replacement::Capture(compile_regex("replace", pattern)?))
            }
            ReplaceConfig::Substitute(pattern, template) => {
                let regex = compile_regex("replace", pattern)?;
                let template = Template::compile("replace", template, &regex)?;
                Ok(Replacement::Substitute(regex, template))
            }
        }
    }

    fn regex(&self) -> &Regex {
        match self {
            Replacement::Capture(regex) | Replacement::Substitute(regex, _) => regex,
        }
    }
}

/// Compiled extraction mode
#[derive(Debug, Clone, Default)]
pub struct ExtractionPattern {
    pub start: Option<Regex>,
    pub stop: Option<Regex>,
    pub replace: Vec<Replacement>,
}

impl ExtractionPattern {
    pub fn compile(config: &ExtractConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            start: compile_optional("start", config.start.as_deref())?,
            stop: compile_optional("stop", config.stop.as_deref())?,
            replace: config
                .replace
                .iter()
                .map(Replacement::compile)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Stop regex for the current activation; the inline override wins
    pub fn effective_stop<'a>(&'a self, directive: &'a InlineDirective) -> Option<&'a Regex> {
        directive.stop.as_ref().or(self.stop.as_ref())
    }

    /// Transform an extracted line, `None` meaning "emit nothing"
    ///
    /// Exactly one transform applies, in order: inline trim, inline content
    /// capture, then the first matching `replace` entry. Lines no entry
    /// matches pass through unchanged.
    pub fn replace_line(&self, line: &str, directive: &InlineDirective) -> Option<String> {
        if directive.trim > 0 {
            return Some(line.chars().skip(directive.trim).collect());
        }

        if let Some(content) = &directive.content {
            return content
                .captures(line)
                .and_then(|caps| last_group(content, &caps).map(str::to_string));
        }

        for item in &self.replace {
            let Some(caps) = item.regex().captures(line) else {
                continue;
            };
            return match item {
                Replacement::Substitute(_, template) => Some(template.expand(&caps)),
                Replacement::Capture(regex) => last_group(regex, &caps).map(str::to_string),
            };
        }

        Some(line.to_string())
    }
}
