//! Language definitions for cardinality-marker learning.
//!
//! A definition source is a sequence of paragraphs, one per language. Each
//! paragraph names the language, lists its markers with the cardinalities
//! they mark, and designates exactly one marker (with `*`) as the default
//! for every cardinality left unassigned:
//!
//! ```text
//! english singular 1 plural *
//! ```
//!
//! [`LanguageCatalog::parse`] runs the character-level scanner in
//! [`scanner`] and yields immutable [`Language`] records; simulation runs
//! clone the record they need so later parses can never touch a live run.

mod catalog;
mod scanner;

pub use catalog::{Language, LanguageCatalog, MarkerIndex, ParseLimits};
