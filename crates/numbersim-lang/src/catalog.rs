//! Catalog types: languages, marker identities, and parse limits.

use std::fmt;

use numbersim_error::{NumbersimError, Result};
use tracing::info;

use crate::scanner::Scanner;

/// Index of a marker within its language's marker list.
///
/// The index is the marker's identity everywhere outside the parser; the
/// string form only reappears in rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MarkerIndex(u32);

impl MarkerIndex {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The index as a container offset.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MarkerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m#{}", self.0)
    }
}

/// Soft validation ceilings applied while parsing a definition source.
///
/// These bound what a source is allowed to declare; they do not dictate any
/// storage layout. Containers are sized from the parsed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum number of languages in one source.
    pub max_languages: usize,
    /// Maximum length of a language name, in characters.
    pub max_name_len: usize,
    /// Maximum length of a marker token, in characters.
    pub max_marker_len: usize,
    /// Largest cardinality a source may assign; every language's resolved
    /// table covers `1..=cardinality_ceiling`.
    pub cardinality_ceiling: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_languages: 64,
            max_name_len: 64,
            max_marker_len: 64,
            cardinality_ceiling: 32,
        }
    }
}

/// One parsed language: its markers and the total cardinality-to-marker
/// mapping.
///
/// Immutable after parsing. Runs take a clone, never a shared reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    name: String,
    markers: Vec<String>,
    /// Resolved mapping; entry `c - 1` holds the marker for cardinality `c`.
    cardinality_to_marker: Vec<MarkerIndex>,
    default_marker: MarkerIndex,
}

impl Language {
    pub(crate) fn new(
        name: String,
        markers: Vec<String>,
        cardinality_to_marker: Vec<MarkerIndex>,
        default_marker: MarkerIndex,
    ) -> Self {
        Self {
            name,
            markers,
            cardinality_to_marker,
            default_marker,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    #[must_use]
    pub fn num_markers(&self) -> usize {
        self.markers.len()
    }

    /// The marker string for an index.
    ///
    /// # Panics
    ///
    /// Panics if `index` did not come from this language.
    #[must_use]
    pub fn marker_name(&self, index: MarkerIndex) -> &str {
        &self.markers[index.as_usize()]
    }

    #[must_use]
    pub fn default_marker(&self) -> MarkerIndex {
        self.default_marker
    }

    /// Largest cardinality the resolved table covers.
    #[must_use]
    pub fn cardinality_ceiling(&self) -> usize {
        self.cardinality_to_marker.len()
    }

    /// The marker for a 1-based cardinality, if within the table.
    #[must_use]
    pub fn marker_for(&self, cardinality: usize) -> Option<MarkerIndex> {
        if cardinality == 0 {
            return None;
        }
        self.cardinality_to_marker.get(cardinality - 1).copied()
    }
}

impl fmt::Display for Language {
    /// Catalog-dump rendering: name, marker count, default, marker list,
    /// then the resolved marker for every cardinality.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] (def = {})",
            self.name,
            self.markers.len(),
            self.marker_name(self.default_marker)
        )?;
        for marker in &self.markers {
            write!(f, " {marker}")?;
        }
        write!(f, " >")?;
        for index in &self.cardinality_to_marker {
            write!(f, " {}", self.marker_name(*index))?;
        }
        Ok(())
    }
}

/// An ordered collection of parsed languages.
///
/// Lookup is exact-match and case-sensitive. When a source defines the same
/// name twice, the first definition wins; later ones are parsed and
/// validated, then discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageCatalog {
    languages: Vec<Language>,
}

impl LanguageCatalog {
    /// Parse a definition source.
    pub fn parse(source: &str, limits: &ParseLimits) -> Result<Self> {
        let languages = Scanner::new(source, limits).scan()?;
        info!(languages = languages.len(), "parsed language definitions");
        Ok(Self { languages })
    }

    /// Read and parse a definition file.
    pub fn from_file(path: &std::path::Path, limits: &ParseLimits) -> Result<Self> {
        let source =
            std::fs::read_to_string(path).map_err(|source| NumbersimError::SourceRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&source, limits)
    }

    pub(crate) fn insert(languages: &mut Vec<Language>, language: Language) {
        // First definition of a name wins.
        if !languages.iter().any(|l| l.name() == language.name()) {
            languages.push(language);
        }
    }

    /// Look up a language by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.name() == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.languages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.languages.iter()
    }
}
