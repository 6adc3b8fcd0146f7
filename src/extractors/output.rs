//! Deferred-creation output files
//!
//! A `LazyFile` only touches the filesystem on its first write, so a scan that
//! never extracts anything leaves no file behind. The `OutputRegistry` owns all
//! streams of one scan, keyed by (directory, name): asking for the same
//! destination twice hands back the same stream, and a stream that was closed
//! on a switch is reopened in append mode instead of being truncated.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output file created on first write
#[derive(Debug)]
pub struct LazyFile {
    directory: PathBuf,
    name: String,
    writer: Option<BufWriter<File>>,
    created: bool,
}

impl PartialEq for LazyFile {
    fn eq(&self, other: &Self) -> bool {
        self.directory == other.directory && self.name == other.name
    }
}

impl LazyFile {
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            writer: None,
            created: false,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.name)
    }

    /// Whether anything has been written to disk for this file
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Write one line; `None` writes nothing and never creates the file
    ///
    /// The line is terminated with exactly one newline.
    pub fn write(&mut self, text: Option<&str>) -> io::Result<()> {
        let Some(text) = text else {
            return Ok(());
        };

        if self.writer.is_none() {
            fs::create_dir_all(&self.directory)?;
            let path = self.path();
            let file = if self.created {
                OpenOptions::new().append(true).open(&path)?
            } else {
                File::create(&path)?
            };
            self.created = true;
            self.writer = Some(BufWriter::new(file));
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(text.trim_end_matches(['\r', '\n']).as_bytes())?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Flush and release the handle; returns the path if the file exists
    pub fn close(&mut self) -> io::Result<Option<PathBuf>> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!("        ... extracted {}", self.path().display());
        }
        Ok(self.created.then(|| self.path()))
    }
}

/// Handle to a stream owned by an `OutputRegistry`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(usize);

/// All output streams opened while scanning one source file
#[derive(Debug, Default)]
pub struct OutputRegistry {
    streams: Vec<LazyFile>,
    index: HashMap<(PathBuf, String), StreamId>,
    /// Streams in the order they were first created on disk
    created: Vec<StreamId>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream for (directory, name), reusing one opened earlier in this scan
    pub fn get_or_create(&mut self, directory: &Path, name: &str) -> StreamId {
        let key = (directory.to_path_buf(), name.to_string());
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = StreamId(self.streams.len());
        self.streams.push(LazyFile::new(directory, name));
        self.index.insert(key, id);
        id
    }

    pub fn stream(&self, id: StreamId) -> &LazyFile {
        &self.streams[id.0]
    }

    pub fn write(&mut self, id: StreamId, text: Option<&str>) -> io::Result<()> {
        let stream = &mut self.streams[id.0];
        let was_created = stream.is_created();
        stream.write(text)?;
        if !was_created && stream.is_created() {
            self.created.push(id);
        }
        Ok(())
    }

    pub fn close(&mut self, id: StreamId) -> io::Result<Option<PathBuf>> {
        self.streams[id.0].close()
    }

    /// Close every stream and list the files that received content
    pub fn finish(mut self) -> io::Result<Vec<PathBuf>> {
        for stream in &mut self.streams {
            stream.close()?;
        }
        Ok(self
            .created
            .iter()
            .map(|id| self.streams[id.0].path())
            .collect())
    }

    /// Drop everything written during this scan after a failure
    pub fn abandon(mut self) {
        for id in &self.created {
            let stream = &mut self.streams[id.0];
            let _ = stream.close();
            let _ = fs::remove_file(stream.path());
        }
    }
}
