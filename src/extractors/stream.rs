//! StreamExtract - line-by-line extraction state machine
//!
//! `ScanState` is the pure part: it consumes one line at a time and reports
//! what should happen (`Action`s) without doing any I/O. `StreamExtract`
//! drives a `ScanState` over an input stream and applies the actions to an
//! `OutputRegistry`.

use super::base::last_group;
use super::directive::InlineDirective;
use super::output::{OutputRegistry, StreamId};
use super::rule::ExtractionPattern;
use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Used when a file is scanned without any extraction patterns
static WHOLE_FILE: Lazy<ExtractionPattern> = Lazy::new(ExtractionPattern::default);

/// Effect of one scanned line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write a line to the active output stream
    Emit(String),
    /// Redirect output to the named file next to the default destination
    SwitchTo(String),
    /// Return to the default output stream
    Reset,
    /// Stop scanning this file
    Terminate,
}

#[derive(Debug)]
struct Active<'p> {
    pattern: &'p ExtractionPattern,
    directive: InlineDirective,
}

/// Searching / Extracting state for one scanned file
#[derive(Debug)]
pub struct ScanState<'p> {
    patterns: &'p [ExtractionPattern],
    terminate: Option<&'p Regex>,
    active: Option<Active<'p>>,
    terminated: bool,
}

impl<'p> ScanState<'p> {
    pub fn new(patterns: &'p [ExtractionPattern], terminate: Option<&'p Regex>) -> Self {
        // The last pattern without `start` is active from the first line
        let initial: Option<&'p ExtractionPattern> = if patterns.is_empty() {
            Some(&*WHOLE_FILE)
        } else {
            patterns.iter().rev().find(|p| p.start.is_none())
        };

        Self {
            patterns,
            terminate,
            active: initial.map(|pattern| Active {
                pattern,
                directive: InlineDirective::default(),
            }),
            terminated: false,
        }
    }

    pub fn is_extracting(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Advance by one line (without its line terminator)
    pub fn step(&mut self, line: &str) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.terminated {
            return actions;
        }

        if let Some((re, caps)) = self
            .terminate
            .and_then(|re| re.captures(line).map(|caps| (re, caps)))
        {
            if self.active.is_some() {
                if let Some(text) = last_group(re, &caps) {
                    actions.push(Action::Emit(text.to_string()));
                }
            }
            self.active = None;
            self.terminated = true;
            actions.push(Action::Terminate);
            return actions;
        }

        match self.active.take() {
            None => self.try_start(line, &mut actions),
            Some(active) => {
                let stop = active
                    .pattern
                    .effective_stop(&active.directive)
                    .and_then(|re| {
                        re.captures(line)
                            .map(|caps| last_group(re, &caps).map(str::to_string))
                    });

                match stop {
                    Some(captured) => {
                        if let Some(text) = captured {
                            actions.push(Action::Emit(text));
                        }
                        actions.push(Action::Reset);
                    }
                    None => {
                        if let Some(text) = active.pattern.replace_line(line, &active.directive) {
                            actions.push(Action::Emit(text));
                        }
                        self.active = Some(active);
                    }
                }
            }
        }
        actions
    }

    fn try_start(&mut self, line: &str, actions: &mut Vec<Action>) {
        for pattern in self.patterns {
            let Some(start) = pattern.start.as_ref() else {
                continue;
            };
            let Some(caps) = start.captures(line) else {
                continue;
            };

            let directive = InlineDirective::parse(line);
            if let Some(name) = &directive.filename {
                actions.push(Action::SwitchTo(name.clone()));
            }
            if let Some(text) = last_group(start, &caps) {
                actions.push(Action::Emit(text.to_string()));
            }
            self.active = Some(Active { pattern, directive });
            return;
        }
    }
}

/// Runs one scan of an input stream into lazily created output files
pub struct StreamExtract<'p> {
    state: ScanState<'p>,
    registry: OutputRegistry,
    directory: PathBuf,
    default_stream: StreamId,
    current: StreamId,
}

impl<'p> StreamExtract<'p> {
    /// `directory`/`name` is the default destination; inline `file=` names
    /// land in the same directory
    pub fn new(
        patterns: &'p [ExtractionPattern],
        terminate: Option<&'p Regex>,
        directory: &Path,
        name: &str,
    ) -> Self {
        let mut registry = OutputRegistry::new();
        let default_stream = registry.get_or_create(directory, name);
        Self {
            state: ScanState::new(patterns, terminate),
            registry,
            directory: directory.to_path_buf(),
            default_stream,
            current: default_stream,
        }
    }

    /// Consume `input` and return the files that received content
    ///
    /// On failure every file written during this scan is removed again.
    /// `source` only labels errors.
    pub fn extract<R: BufRead>(
        mut self,
        input: R,
        source: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        match self.run(input, source) {
            Ok(()) => self
                .registry
                .finish()
                .map_err(|e| ExtractError::io(&self.directory, e)),
            Err(e) => {
                self.registry.abandon();
                Err(e)
            }
        }
    }

    fn run<R: BufRead>(&mut self, input: R, source: &Path) -> Result<(), ExtractError> {
        for line in input.lines() {
            let line = line.map_err(|e| ExtractError::io(source, e))?;
            for action in self.state.step(&line) {
                match action {
                    Action::Emit(text) => self.write(&text)?,
                    Action::SwitchTo(name) => {
                        let id = self.registry.get_or_create(&self.directory, &name);
                        self.switch(id)?;
                    }
                    Action::Reset => self.switch(self.default_stream)?,
                    Action::Terminate => return Ok(()),
                }
            }
        }
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), ExtractError> {
        let path = self.registry.stream(self.current).path();
        self.registry
            .write(self.current, Some(text))
            .map_err(|e| ExtractError::io(path, e))
    }

    fn switch(&mut self, id: StreamId) -> Result<(), ExtractError> {
        if id == self.current {
            return Ok(());
        }
        let path = self.registry.stream(self.current).path();
        self.registry
            .close(self.current)
            .map_err(|e| ExtractError::io(path, e))?;
        self.current = id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractConfig, ReplaceConfig};
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn patterns(configs: &[ExtractConfig]) -> Vec<ExtractionPattern> {
        configs
            .iter()
            .map(|c| ExtractionPattern::compile(c).unwrap())
            .collect()
    }

    fn emit(text: &str) -> Action {
        Action::Emit(text.to_string())
    }

    fn run(
        patterns: &[ExtractionPattern],
        terminate: Option<&Regex>,
        lines: &[&str],
        dir: &Path,
    ) -> Vec<PathBuf> {
        let input = Cursor::new(lines.join("\n"));
        StreamExtract::new(patterns, terminate, dir, "output.md")
            .extract(input, Path::new("input.txt"))
            .unwrap()
    }

    fn contents(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_state_start_content_stop() {
        let patterns = patterns(&[ExtractConfig::block("START", "STOP")]);
        let mut state = ScanState::new(&patterns, None);

        assert!(!state.is_extracting());
        assert!(state.step("Line1").is_empty());
        assert!(state.step("START").is_empty());
        assert!(state.is_extracting());
        assert_eq!(state.step("Content"), vec![emit("Content")]);
        assert_eq!(state.step("STOP"), vec![Action::Reset]);
        assert!(!state.is_extracting());
        assert!(state.step("Line2").is_empty());
    }

    #[test]
    fn test_state_stop_line_does_not_restart() {
        let patterns = patterns(&[ExtractConfig::block("MARK", "MARK")]);
        let mut state = ScanState::new(&patterns, None);

        state.step("MARK");
        assert_eq!(state.step("MARK"), vec![Action::Reset]);
        assert!(!state.is_extracting());
        assert!(state.step("MARK").is_empty());
        assert!(state.is_extracting());
    }

    #[test]
    fn test_state_terminate_emits_only_while_extracting() {
        let patterns = patterns(&[ExtractConfig::block("START", "STOP")]);
        let terminate = Regex::new("^END(.*)$").unwrap();

        let mut searching = ScanState::new(&patterns, Some(&terminate));
        assert_eq!(searching.step("END: ignored"), vec![Action::Terminate]);
        assert!(searching.is_terminated());
        assert!(searching.step("START").is_empty());

        let mut extracting = ScanState::new(&patterns, Some(&terminate));
        extracting.step("START");
        assert_eq!(
            extracting.step("END: kept"),
            vec![emit(": kept"), Action::Terminate]
        );
    }

    #[test]
    fn test_state_inline_file_switch() {
        let patterns = patterns(&[ExtractConfig::block(r"^//md(.*)$", r"^//end")]);
        let mut state = ScanState::new(&patterns, None);
        assert_eq!(
            state.step("//md file=part.snippet"),
            vec![
                Action::SwitchTo("part.snippet".to_string()),
                emit(" file=part.snippet")
            ]
        );
    }

    #[test]
    fn test_state_front_matter_pattern_never_reactivates() {
        let patterns = patterns(&[
            ExtractConfig::block("START", "STOP"),
            ExtractConfig {
                stop: Some("^---$".to_string()),
                ..Default::default()
            },
        ]);
        let mut state = ScanState::new(&patterns, None);
        assert!(state.is_extracting());
        assert_eq!(state.step("title: Hello"), vec![emit("title: Hello")]);
        assert_eq!(state.step("---"), vec![Action::Reset]);
        assert!(state.step("title: again").is_empty());
        assert!(!state.is_extracting());
    }

    #[test]
    fn test_state_last_startless_pattern_wins() {
        let patterns = patterns(&[
            ExtractConfig::default()
                .with_replace(vec![ReplaceConfig::Substitute("^(.*)$".into(), r"first \1".into())]),
            ExtractConfig::default()
                .with_replace(vec![ReplaceConfig::Substitute("^(.*)$".into(), r"last \1".into())]),
        ]);
        let mut state = ScanState::new(&patterns, None);
        assert_eq!(state.step("x"), vec![emit("last x")]);
    }

    #[test]
    fn test_extract_between_markers() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = patterns(&[ExtractConfig::block("START", "STOP")]);
        let files = run(
            &patterns,
            None,
            &["Line1", "START", "Content", "STOP", "Line2"],
            temp_dir.path(),
        );
        assert_eq!(files, vec![temp_dir.path().join("output.md")]);
        assert_eq!(contents(&files[0]), vec!["Content"]);
    }

    #[test]
    fn test_extract_without_patterns_copies_everything() {
        let temp_dir = TempDir::new().unwrap();
        let files = run(&[], None, &["Line 1", "Line 2", "Line 3"], temp_dir.path());
        assert_eq!(contents(&files[0]), vec!["Line 1", "Line 2", "Line 3"]);
    }

    #[test]
    fn test_extract_single_open_pattern_copies_everything() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = patterns(&[ExtractConfig::default()]);
        let files = run(&patterns, None, &["a", "", "b"], temp_dir.path());
        assert_eq!(contents(&files[0]), vec!["a", "", "b"]);
    }

    #[test]
    fn test_extract_pattern_without_start_runs_until_stop() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = patterns(&[ExtractConfig {
            stop: Some("STOP".to_string()),
            ..Default::default()
        }]);
        let files = run(&patterns, None, &["Line 1", "START", "STOP", "Line 2"], temp_dir.path());
        assert_eq!(contents(&files[0]), vec!["Line 1", "START"]);
    }

    #[test]
    fn test_extract_multiple_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = patterns(&[
            ExtractConfig::block("START1", "STOP1"),
            ExtractConfig::block("START2", "STOP2"),
        ]);
        let files = run(
            &patterns,
            None,
            &["Line 1", "START1", "Content 1", "STOP1", "START2", "Content 2", "STOP2", "Line 2"],
            temp_dir.path(),
        );
        assert_eq!(files.len(), 1);
        assert_eq!(contents(&files[0]), vec!["Content 1", "Content 2"]);
    }

    #[test]
    fn test_extract_keeps_empty_lines() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = patterns(&[ExtractConfig::block("START", "STOP")]);
        let files = run(
            &patterns,
            None,
            &["Line 1", "", "START", "", "Content", "STOP", "Line 2"],
            temp_dir.path(),
        );
        assert_eq!(contents(&files[0]), vec!["", "Content"]);
    }

    #[test]
    fn test_extract_captures_from_start_and_stop_lines() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = patterns(&[ExtractConfig::block("START(.*)$", "STOP(.*)$")]);
        let files = run(
            &patterns,
            None,
            &["Line 1", "START:Capture start", "Content", "STOP:Capture end"],
            temp_dir.path(),
        );
        assert_eq!(
            contents(&files[0]),
            vec![":Capture start", "Content", ":Capture end"]
        );
    }

    #[test]
    fn test_terminate_before_start_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = patterns(&[ExtractConfig::block("START", "STOP")]);
        let terminate = Regex::new("^END").unwrap();
        let files = run(
            &patterns,
            Some(&terminate),
            &["END", "START", "Content", "STOP"],
            temp_dir.path(),
        );
        assert!(files.is_empty());
        assert!(!temp_dir.path().join("output.md").exists());
    }

    #[test]
    fn test_terminate_whole_file_capture() {
        let temp_dir = TempDir::new().unwrap();
        let terminate = Regex::new("^END").unwrap();
        let files = run(
            &[],
            Some(&terminate),
            &["Content before END", "END", "Content after END"],
            temp_dir.path(),
        );
        assert_eq!(contents(&files[0]), vec!["Content before END"]);
    }

    #[test]
    fn test_inline_file_redirect_appends_on_reuse() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = patterns(&[ExtractConfig::block(r"^#\s?md\b", r"^#\s?/md")
            .with_replace(vec![ReplaceConfig::Pattern(r"^#\s?(.*)$".to_string())])]);
        let files = run(
            &patterns,
            None,
            &[
                "# md",
                "# main one",
                "# /md",
                "# md file=part.snippet",
                "# snippet one",
                "# /md",
                "# md",
                "# main two",
                "# /md",
                "# md file=part.snippet",
                "# snippet two",
                "# /md",
            ],
            temp_dir.path(),
        );

        let main = temp_dir.path().join("output.md");
        let snippet = temp_dir.path().join("part.snippet");
        assert_eq!(files, vec![main.clone(), snippet.clone()]);
        assert_eq!(contents(&main), vec!["main one", "main two"]);
        assert_eq!(contents(&snippet), vec!["snippet one", "snippet two"]);
    }

    #[test]
    fn test_inline_file_naming_default_destination() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = patterns(&[ExtractConfig::block("START", "STOP")]);
        let files = run(
            &patterns,
            None,
            &["START file=output.md", "same file", "STOP"],
            temp_dir.path(),
        );
        assert_eq!(files, vec![temp_dir.path().join("output.md")]);
    }

    #[test]
    fn test_decode_error_removes_partial_output() {
        let temp_dir = TempDir::new().unwrap();
        let mut bytes = b"first line\n".to_vec();
        bytes.extend_from_slice(&[0x80, 0xff, b'\n']);

        let result = StreamExtract::new(&[], None, temp_dir.path(), "output.md")
            .extract(Cursor::new(bytes), Path::new("blob.bin"));

        assert!(matches!(result, Err(ExtractError::Decode { .. })));
        assert!(!temp_dir.path().join("output.md").exists());
    }
}
