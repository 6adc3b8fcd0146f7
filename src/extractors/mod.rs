//! Documentation extractors
//!
//! Regex-driven extraction of documentation blocks embedded in source files.
//!
//! # Architecture
//!
//! The module is organized into several sub-modules:
//! - `base.rs` - regex compilation, last-group selection, replacement templates
//! - `directive.rs` - inline `file=` / `trim=` / `content=` / `stop=` settings
//! - `rule.rs` - one start/stop/replace extraction mode (`ExtractionPattern`)
//! - `output.rs` - lazily created output files and the per-scan registry
//! - `stream.rs` - the line state machine and its I/O driver (`StreamExtract`)
//! - `semiliterate.rs` - filename-scoped extraction settings (`Semiliterate`)

pub mod base;
pub mod directive;
pub mod output;
pub mod rule;
pub mod semiliterate;
pub mod stream;

// Re-export the public API
pub use base::Template;
pub use directive::InlineDirective;
pub use output::{LazyFile, OutputRegistry, StreamId};
pub use rule::{ExtractionPattern, Replacement};
pub use semiliterate::Semiliterate;
pub use stream::{Action, ScanState, StreamExtract};
