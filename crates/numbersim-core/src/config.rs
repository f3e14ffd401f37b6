//! Run configuration: the flat ordered token grammar and the validated
//! per-run configuration.
//!
//! One run is described by a single token list — the process arguments, or
//! one whitespace-separated line in batch mode:
//!
//! ```text
//! <source> <seed1> <seed2> <language>
//!     ( ztnbd <beta> <r> | <p1> … <pK> )
//!     <learning_rate> <max_cardinality> <trials>
//!     ( full | summary <threshold> | range_summary <threshold> )
//! ```
//!
//! The distribution segment has variable length, so parsing anchors on the
//! output-mode keyword and reads the three numeric fields just before it.

use std::path::PathBuf;

use numbersim_error::{NumbersimError, Result};
use numbersim_lang::Language;

use crate::assoc::WeightInit;
use crate::distribution::DistributionSpec;

/// Keyword introducing the closed-form distribution segment.
const ZTNBD_KEYWORD: &str = "ztnbd";

/// What a run emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Header plus one row per trial.
    Full,
    /// One convergence-index row; quits early at the aggregate threshold.
    Summary,
    /// One row of per-cardinality correct-trial ranges.
    RangeSummary,
}

impl OutputMode {
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "full" => Some(Self::Full),
            "summary" => Some(Self::Summary),
            "range_summary" => Some(Self::RangeSummary),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Summary => "summary",
            Self::RangeSummary => "range_summary",
        }
    }

    /// Whether the mode takes a convergence-threshold token.
    #[must_use]
    pub const fn takes_threshold(self) -> bool {
        matches!(self, Self::Summary | Self::RangeSummary)
    }
}

/// A parsed-but-unresolved run description: the language is still a name,
/// not a catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub source: PathBuf,
    pub seed1: u64,
    pub seed2: u64,
    pub language: String,
    pub distribution: DistributionSpec,
    pub learning_rate: f64,
    pub max_cardinality: usize,
    pub trials: u64,
    pub mode: OutputMode,
    /// Aggregate-streak length that ends a summary run early; 0 never quits.
    pub threshold: u64,
}

impl RunRequest {
    /// Parse one flat token list.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();

        let mode_pos = tokens
            .iter()
            .position(|t| OutputMode::from_token(t).is_some())
            .ok_or_else(|| {
                NumbersimError::usage(
                    "missing output mode (expected `full`, `summary`, or `range_summary`)",
                )
            })?;
        let mode = OutputMode::from_token(tokens[mode_pos]).unwrap_or(OutputMode::Full);

        // source seed1 seed2 language … rate max_cardinality trials
        if mode_pos < 7 {
            return Err(NumbersimError::usage(format!(
                "too few arguments before `{}`",
                mode.as_str()
            )));
        }

        let threshold = if mode.takes_threshold() {
            match tokens.get(mode_pos + 1..) {
                Some([value]) => parse_u64("convergence threshold", value)?,
                _ => {
                    return Err(NumbersimError::usage(format!(
                        "`{}` takes exactly one convergence-threshold argument",
                        mode.as_str()
                    )));
                }
            }
        } else {
            if tokens.len() > mode_pos + 1 {
                return Err(NumbersimError::usage(format!(
                    "unexpected arguments after `{}`",
                    mode.as_str()
                )));
            }
            0
        };

        let source = PathBuf::from(tokens[0]);
        let seed1 = parse_u64("seed1", tokens[1])?;
        let seed2 = parse_u64("seed2", tokens[2])?;
        let language = tokens[3].to_owned();

        let learning_rate = parse_f64("learning rate", tokens[mode_pos - 3])?;
        let max_cardinality = parse_usize("max cardinality", tokens[mode_pos - 2])?;
        let trials = parse_u64("trial count", tokens[mode_pos - 1])?;

        let distribution = parse_distribution(&tokens[4..mode_pos - 3])?;

        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return Err(NumbersimError::config_value(
                "learning rate",
                format!("{learning_rate} is not a positive finite number"),
            ));
        }
        if max_cardinality == 0 {
            return Err(NumbersimError::config_value(
                "max cardinality",
                "must be at least 1",
            ));
        }
        if trials == 0 {
            return Err(NumbersimError::config_value("trial count", "must be at least 1"));
        }

        Ok(Self {
            source,
            seed1,
            seed2,
            language,
            distribution,
            learning_rate,
            max_cardinality,
            trials,
            mode,
            threshold,
        })
    }

    /// Resolve against a catalog language into a runnable configuration.
    #[must_use]
    pub fn into_config(self, language: Language, weight_init: WeightInit) -> RunConfig {
        RunConfig {
            language,
            seed1: self.seed1,
            seed2: self.seed2,
            distribution: self.distribution,
            learning_rate: self.learning_rate,
            max_cardinality: self.max_cardinality,
            trials: self.trials,
            mode: self.mode,
            threshold: self.threshold,
            weight_init,
        }
    }
}

fn parse_distribution(tokens: &[&str]) -> Result<DistributionSpec> {
    if tokens.first() == Some(&ZTNBD_KEYWORD) {
        let [_, beta, r] = tokens else {
            return Err(NumbersimError::usage(
                "`ztnbd` takes exactly two parameters (beta, r)",
            ));
        };
        return Ok(DistributionSpec::Ztnbd {
            beta: parse_f64("beta", beta)?,
            r: parse_f64("r", r)?,
        });
    }

    let mut values = Vec::with_capacity(tokens.len());
    for token in tokens {
        values.push(parse_f64("probability", token)?);
    }
    Ok(DistributionSpec::Explicit(values))
}

fn parse_u64(field: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|_| NumbersimError::number(field, value))
}

fn parse_usize(field: &str, value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .map_err(|_| NumbersimError::number(field, value))
}

fn parse_f64(field: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| NumbersimError::number(field, value))
}

/// A fully resolved run: the language record is owned by value so later
/// catalog parses can never reach into a live run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub language: Language,
    pub seed1: u64,
    pub seed2: u64,
    pub distribution: DistributionSpec,
    pub learning_rate: f64,
    pub max_cardinality: usize,
    pub trials: u64,
    pub mode: OutputMode,
    pub threshold: u64,
    pub weight_init: WeightInit,
}

impl RunConfig {
    /// Cross-field validation against the resolved language.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(NumbersimError::config_value(
                "learning rate",
                format!("{} is not a positive finite number", self.learning_rate),
            ));
        }
        if self.max_cardinality == 0 {
            return Err(NumbersimError::config_value(
                "max cardinality",
                "must be at least 1",
            ));
        }
        let ceiling = self.language.cardinality_ceiling();
        if self.max_cardinality > ceiling {
            return Err(NumbersimError::config_value(
                "max cardinality",
                format!(
                    "{} exceeds the ceiling {ceiling} of language {}",
                    self.max_cardinality,
                    self.language.name()
                ),
            ));
        }
        if self.trials == 0 {
            return Err(NumbersimError::config_value("trial count", "must be at least 1"));
        }
        Ok(())
    }
}
