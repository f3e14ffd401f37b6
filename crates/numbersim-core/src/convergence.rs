//! Correctness streaks, the early-quit decision, and per-trial correctness
//! logs for range reporting.

/// Append-only bitset of per-trial correctness flags.
///
/// Sized up front to the planned trial count; range reporting compresses it
/// into inclusive `(start, end)` trial spans at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialBitset {
    blocks: Vec<u64>,
    len: u64,
}

impl TrialBitset {
    #[must_use]
    pub fn with_capacity(trials: u64) -> Self {
        let blocks = usize::try_from(trials.div_ceil(64)).unwrap_or(0);
        Self {
            blocks: Vec::with_capacity(blocks),
            len: 0,
        }
    }

    /// Append the flag for the next trial.
    pub fn push(&mut self, bit: bool) {
        let offset = (self.len % 64) as u32;
        if offset == 0 {
            self.blocks.push(0);
        }
        if bit {
            let last = self.blocks.len() - 1;
            self.blocks[last] |= 1 << offset;
        }
        self.len += 1;
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn get(&self, trial: u64) -> bool {
        if trial >= self.len {
            return false;
        }
        let block = usize::try_from(trial / 64).unwrap_or(usize::MAX);
        (self.blocks[block] >> (trial % 64)) & 1 == 1
    }

    /// Inclusive spans of consecutive set bits, in trial order.
    #[must_use]
    pub fn ranges(&self) -> Vec<(u64, u64)> {
        let mut spans = Vec::new();
        let mut start: Option<u64> = None;
        for trial in 0..self.len {
            if self.get(trial) {
                if start.is_none() {
                    start = Some(trial);
                }
            } else if let Some(s) = start.take() {
                spans.push((s, trial - 1));
            }
        }
        if let Some(s) = start {
            spans.push((s, self.len - 1));
        }
        spans
    }
}

/// Per-trial correctness bitsets kept only in range-summary mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectnessLog {
    pub per_cardinality: Vec<TrialBitset>,
    pub aggregate: TrialBitset,
}

/// Final convergence indices for a run.
///
/// Each value is the 0-based index of the first trial of the streak still
/// unbroken at run end, or the executed trial count where the latest
/// prediction was wrong. The aggregate can only converge at or after every
/// component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceSummary {
    pub per_cardinality: Vec<u64>,
    pub aggregate: u64,
}

/// Tracks consecutive-correct streaks per cardinality and in aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceTracker {
    streaks: Vec<u64>,
    starts: Vec<u64>,
    aggregate_streak: u64,
    aggregate_start: u64,
    trials: u64,
    log: Option<CorrectnessLog>,
}

impl ConvergenceTracker {
    /// `record_bits` carries the planned trial count when per-trial flags
    /// must be retained (range-summary mode).
    #[must_use]
    pub fn new(max_cardinality: usize, record_bits: Option<u64>) -> Self {
        let log = record_bits.map(|planned| CorrectnessLog {
            per_cardinality: (0..max_cardinality)
                .map(|_| TrialBitset::with_capacity(planned))
                .collect(),
            aggregate: TrialBitset::with_capacity(planned),
        });
        Self {
            streaks: vec![0; max_cardinality],
            starts: vec![0; max_cardinality],
            aggregate_streak: 0,
            aggregate_start: 0,
            trials: 0,
            log,
        }
    }

    /// Record one trial's correctness flags, one per cardinality.
    pub fn observe(&mut self, correct: &[bool]) {
        debug_assert_eq!(correct.len(), self.streaks.len());
        let trial = self.trials;

        for (index, flag) in correct.iter().enumerate() {
            if *flag {
                if self.streaks[index] == 0 {
                    self.starts[index] = trial;
                }
                self.streaks[index] += 1;
            } else {
                self.streaks[index] = 0;
            }
        }

        // The aggregate advances only when every cardinality is correct in
        // the same trial; a single miss resets it.
        let all_correct = correct.iter().all(|flag| *flag);
        if all_correct {
            if self.aggregate_streak == 0 {
                self.aggregate_start = trial;
            }
            self.aggregate_streak += 1;
        } else {
            self.aggregate_streak = 0;
        }

        if let Some(log) = &mut self.log {
            for (bits, flag) in log.per_cardinality.iter_mut().zip(correct) {
                bits.push(*flag);
            }
            log.aggregate.push(all_correct);
        }

        self.trials += 1;
    }

    #[must_use]
    pub fn aggregate_streak(&self) -> u64 {
        self.aggregate_streak
    }

    #[must_use]
    pub fn trials_observed(&self) -> u64 {
        self.trials
    }

    /// Convergence indices as of the last observed trial.
    #[must_use]
    pub fn summary(&self) -> ConvergenceSummary {
        let per_cardinality = self
            .streaks
            .iter()
            .zip(&self.starts)
            .map(|(streak, start)| if *streak > 0 { *start } else { self.trials })
            .collect();
        let aggregate = if self.aggregate_streak > 0 {
            self.aggregate_start
        } else {
            self.trials
        };
        ConvergenceSummary {
            per_cardinality,
            aggregate,
        }
    }

    /// The per-trial correctness log, when one was kept.
    #[must_use]
    pub fn log(&self) -> Option<&CorrectnessLog> {
        self.log.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitset_roundtrip_across_block_boundary() {
        let mut bits = TrialBitset::with_capacity(130);
        for trial in 0..130_u64 {
            bits.push(trial % 3 == 0);
        }
        assert_eq!(bits.len(), 130);
        for trial in 0..130_u64 {
            assert_eq!(bits.get(trial), trial % 3 == 0, "trial {trial}");
        }
        assert!(!bits.get(130));
    }

    #[test]
    fn bitset_ranges_are_inclusive() {
        let mut bits = TrialBitset::with_capacity(8);
        for flag in [true, true, true, false, false, true, false, true] {
            bits.push(flag);
        }
        assert_eq!(bits.ranges(), vec![(0, 2), (5, 5), (7, 7)]);
    }

    #[test]
    fn bitset_open_tail_range_closes_at_len() {
        let mut bits = TrialBitset::with_capacity(4);
        for flag in [false, true, true, true] {
            bits.push(flag);
        }
        assert_eq!(bits.ranges(), vec![(1, 3)]);
    }

    #[test]
    fn streak_resets_on_miss() {
        let mut tracker = ConvergenceTracker::new(1, None);
        tracker.observe(&[true]);
        tracker.observe(&[true]);
        tracker.observe(&[false]);
        tracker.observe(&[true]);
        let summary = tracker.summary();
        // The unbroken streak began at trial 3.
        assert_eq!(summary.per_cardinality, vec![3]);
    }

    #[test]
    fn aggregate_resets_when_any_cardinality_misses() {
        let mut tracker = ConvergenceTracker::new(3, None);
        tracker.observe(&[true, true, true]);
        assert_eq!(tracker.aggregate_streak(), 1);
        // One miss resets the aggregate even though the others stay correct.
        tracker.observe(&[true, false, true]);
        assert_eq!(tracker.aggregate_streak(), 0);
        tracker.observe(&[true, true, true]);
        let summary = tracker.summary();
        assert_eq!(summary.per_cardinality, vec![0, 2, 0]);
        assert_eq!(summary.aggregate, 2);
    }

    #[test]
    fn never_correct_reports_trial_count() {
        let mut tracker = ConvergenceTracker::new(2, None);
        tracker.observe(&[false, true]);
        tracker.observe(&[false, true]);
        let summary = tracker.summary();
        assert_eq!(summary.per_cardinality, vec![2, 0]);
        assert_eq!(summary.aggregate, 2);
    }

    #[test]
    fn aggregate_never_precedes_components() {
        let mut tracker = ConvergenceTracker::new(2, None);
        let flags = [
            [true, false],
            [true, true],
            [true, true],
            [false, true],
            [true, true],
        ];
        for row in &flags {
            tracker.observe(row);
        }
        let summary = tracker.summary();
        let max_component = summary.per_cardinality.iter().copied().max().unwrap();
        assert!(summary.aggregate >= max_component);
    }

    #[test]
    fn log_records_per_trial_flags() {
        let mut tracker = ConvergenceTracker::new(2, Some(3));
        tracker.observe(&[true, false]);
        tracker.observe(&[true, true]);
        tracker.observe(&[false, true]);
        let log = tracker.log().expect("range mode keeps the log");
        assert_eq!(log.per_cardinality[0].ranges(), vec![(0, 1)]);
        assert_eq!(log.per_cardinality[1].ranges(), vec![(1, 2)]);
        assert_eq!(log.aggregate.ranges(), vec![(1, 1)]);
    }
}
