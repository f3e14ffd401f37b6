use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for numbersim operations.
///
/// Two taxonomies share this enum: configuration errors, which are fatal
/// only to the run they describe, and source-data errors, which poison the
/// shared language catalog and therefore the whole process. The split is
/// queryable via [`NumbersimError::is_source_error`].
#[derive(Error, Debug)]
pub enum NumbersimError {
    // === I/O Errors ===
    /// Generic I/O error (broken output stream, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The language-definition source could not be read.
    #[error("cannot read language definitions: '{path}': {source}")]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Wrong argument shape: bad token count, unknown option, missing
    /// option value, or an invalid literal where a keyword was expected.
    #[error("{detail}")]
    Usage { detail: String },

    /// A configuration value parsed but is out of its accepted range.
    #[error("invalid value for {what}: {detail}")]
    ConfigValue { what: String, detail: String },

    /// A numeric field did not parse.
    #[error("unparseable {field}: `{value}`")]
    NumberFormat { field: String, value: String },

    /// Explicit probability list has the wrong number of entries.
    #[error(
        "probability list has {got} entries; expected {expected} or {}",
        .expected.saturating_sub(1)
    )]
    DistributionLength { expected: usize, got: usize },

    /// A probability value lies outside `[0, 1]`.
    #[error("probability #{index} is {value}, outside [0, 1]")]
    ProbabilityOutOfRange { index: usize, value: f64 },

    /// A full probability list does not sum to 1.
    #[error("probabilities sum to {sum}, not 1.0 (tolerance 0.01)")]
    DistributionSum { sum: f64 },

    /// The requested language is not in the catalog.
    #[error("unknown language: {name}")]
    UnknownLanguage { name: String },

    // === Source Data Errors ===
    /// Malformed language-definition source.
    #[error("syntax error at line {line}, column {col}: {detail}")]
    Syntax { line: u32, col: u32, detail: String },

    /// A finished language paragraph never designated a default marker.
    #[error("no default marker set for language {language}")]
    NoDefaultMarker { language: String },

    /// The source defines more languages than the configured capacity.
    #[error("too many languages (max {max})")]
    TooManyLanguages { max: usize },

    /// The source ended mid-token or mid-record.
    #[error("unexpected end of input at line {line}, column {col}")]
    UnexpectedEof { line: u32, col: u32 },

    // === Internal Errors ===
    /// Internal consistency failure (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Process exit codes, one per failure category.
///
/// Consumers distinguish configuration failures from data failures by code
/// alone, so these values are part of the external interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Successful run.
    Ok = 0,
    /// I/O failure.
    Io = 1,
    /// Bad argument shape, count, or configuration value.
    Usage = 2,
    /// Unparseable numeric field.
    NumberFormat = 3,
    /// Probability distribution rejected.
    Distribution = 4,
    /// Unknown language name.
    UnknownLanguage = 5,
    /// Language-definition syntax error.
    Syntax = 6,
    /// Internal consistency error.
    Internal = 70,
}

impl NumbersimError {
    /// Map this error to its exit-code category.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Io(_) | Self::SourceRead { .. } => ErrorCode::Io,
            Self::Usage { .. } | Self::ConfigValue { .. } => ErrorCode::Usage,
            Self::NumberFormat { .. } => ErrorCode::NumberFormat,
            Self::DistributionLength { .. }
            | Self::ProbabilityOutOfRange { .. }
            | Self::DistributionSum { .. } => ErrorCode::Distribution,
            Self::UnknownLanguage { .. } => ErrorCode::UnknownLanguage,
            Self::Syntax { .. }
            | Self::NoDefaultMarker { .. }
            | Self::TooManyLanguages { .. }
            | Self::UnexpectedEof { .. } => ErrorCode::Syntax,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether this error poisons shared state (the catalog or the process
    /// streams) rather than a single run's configuration.
    ///
    /// In batch mode, source errors abort the process; configuration errors
    /// only skip the offending line.
    #[must_use]
    pub const fn is_source_error(&self) -> bool {
        matches!(
            self.error_code(),
            ErrorCode::Io | ErrorCode::Syntax | ErrorCode::Internal
        )
    }

    /// Get the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.error_code() as i32
    }

    /// Create a usage error.
    pub fn usage(detail: impl Into<String>) -> Self {
        Self::Usage {
            detail: detail.into(),
        }
    }

    /// Create an out-of-range configuration-value error.
    pub fn config_value(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ConfigValue {
            what: what.into(),
            detail: detail.into(),
        }
    }

    /// Create an unparseable-number error.
    pub fn number(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NumberFormat {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a source syntax error at a position.
    pub fn syntax(line: u32, col: u32, detail: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            col,
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `NumbersimError`.
pub type Result<T> = std::result::Result<T, NumbersimError>;
