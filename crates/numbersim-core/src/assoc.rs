//! The cue×marker association matrix and its delta-rule update.
//!
//! A cue of cardinality `c` activates every nested sub-cue `1..=c`, so both
//! the activation read and the weight update range over the whole prefix.
//! The update is competitive: exactly one marker is reinforced per trial
//! and every other marker is driven toward a zero target.

use numbersim_lang::MarkerIndex;
use rand::RngCore;

/// Starting condition for the weight matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightInit {
    /// All associations start at zero.
    #[default]
    Zero,
    /// Independent uniform `[0, 1)` draws from the run's generator.
    Random,
}

impl WeightInit {
    /// Parse the CLI token form.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "zero" => Some(Self::Zero),
            "random" => Some(Self::Random),
            _ => None,
        }
    }
}

/// Learned associations between nested cues and markers.
///
/// Row `cue` holds the weights for "there are at least `cue + 1` items";
/// mutation happens only through [`AssociationEngine::reinforce`], one trial
/// at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationEngine {
    /// Flat `[cue * num_markers + marker]` weight matrix.
    weights: Vec<f64>,
    num_markers: usize,
    max_cardinality: usize,
    learning_rate: f64,
}

impl AssociationEngine {
    /// Zero-initialized matrix.
    #[must_use]
    pub fn new(max_cardinality: usize, num_markers: usize, learning_rate: f64) -> Self {
        Self {
            weights: vec![0.0; max_cardinality * num_markers],
            num_markers,
            max_cardinality,
            learning_rate,
        }
    }

    /// Matrix seeded with uniform `[0, 1)` draws from `rng`.
    pub fn with_random_weights(
        max_cardinality: usize,
        num_markers: usize,
        learning_rate: f64,
        rng: &mut impl RngCore,
    ) -> Self {
        let weights = (0..max_cardinality * num_markers)
            .map(|_| f64::from(rng.next_u32()) / (f64::from(u32::MAX) + 1.0))
            .collect();
        Self {
            weights,
            num_markers,
            max_cardinality,
            learning_rate,
        }
    }

    #[must_use]
    pub fn num_markers(&self) -> usize {
        self.num_markers
    }

    #[must_use]
    pub fn max_cardinality(&self) -> usize {
        self.max_cardinality
    }

    #[must_use]
    pub fn weight(&self, cue: usize, marker: usize) -> f64 {
        self.weights[cue * self.num_markers + marker]
    }

    /// Apply one trial: the drawn `cardinality` (1-based) was marked by
    /// `target`.
    ///
    /// For every marker, the compound activation over cues `0..cardinality`
    /// is compared against the teaching signal (1 for `target`, 0
    /// otherwise) and the scaled difference is added to each nested cue.
    pub fn reinforce(&mut self, cardinality: usize, target: MarkerIndex) {
        debug_assert!(cardinality >= 1 && cardinality <= self.max_cardinality);
        let cues = cardinality;
        for marker in 0..self.num_markers {
            let activation: f64 = (0..cues).map(|cue| self.weight(cue, marker)).sum();
            let signal = if marker == target.as_usize() { 1.0 } else { 0.0 };
            let delta = self.learning_rate * (signal - activation);
            for cue in 0..cues {
                self.weights[cue * self.num_markers + marker] += delta;
            }
        }
    }

    /// Compound sums and predicted markers for every cardinality.
    #[must_use]
    pub fn predictions(&self) -> PredictionTable {
        let mut sums = Vec::with_capacity(self.max_cardinality * self.num_markers);
        let mut best = Vec::with_capacity(self.max_cardinality);
        let mut acc = vec![0.0; self.num_markers];

        for cue in 0..self.max_cardinality {
            for marker in 0..self.num_markers {
                acc[marker] += self.weight(cue, marker);
            }
            let mut winner = 0usize;
            for marker in 1..self.num_markers {
                // Ties break toward the lowest marker index.
                if acc[marker] > acc[winner] {
                    winner = marker;
                }
            }
            sums.extend_from_slice(&acc);
            best.push(MarkerIndex::new(u32::try_from(winner).unwrap_or(0)));
        }

        PredictionTable {
            num_markers: self.num_markers,
            sums,
            best,
        }
    }
}

/// Per-cardinality compound activations and the winning marker, recomputed
/// after each trial.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    num_markers: usize,
    /// Flat `[cue * num_markers + marker]` compound sums.
    sums: Vec<f64>,
    best: Vec<MarkerIndex>,
}

impl PredictionTable {
    /// Compound activation of `marker` at 0-based cue `cue`.
    #[must_use]
    pub fn sum(&self, cue: usize, marker: usize) -> f64 {
        self.sums[cue * self.num_markers + marker]
    }

    /// Predicted marker at 0-based cue `cue`.
    #[must_use]
    pub fn best(&self, cue: usize) -> MarkerIndex {
        self.best[cue]
    }

    #[must_use]
    pub fn sums(&self) -> &[f64] {
        &self.sums
    }
}
