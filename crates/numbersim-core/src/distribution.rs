//! Cardinality distributions and the per-trial draw.
//!
//! Probabilities over `1..=max_cardinality` are flattened into a cumulative
//! threshold table on the generator's `u32` output scale, built once per run
//! and immutable during trials.

use numbersim_error::{NumbersimError, Result};
use tracing::debug;

/// Tolerance when checking that a full explicit probability list sums to 1.
const SUM_TOLERANCE: f64 = 0.01;

/// Zero-truncated negative binomial probability mass at bucket `k >= 1`.
///
/// ```text
/// p(k) = [ r·(r+1)·…·(r+k-1) / k! ] · (β/(1+β))^k / ((1+β)^r − 1)
/// ```
#[must_use]
pub fn ztnbd_mass(k: u32, beta: f64, r: f64) -> f64 {
    let mut top = r;
    for i in 1..k {
        top *= r + f64::from(i);
    }
    top /= factorial(k) * ((1.0 + beta).powf(r) - 1.0);
    #[allow(clippy::cast_possible_wrap)]
    let exponent = k as i32;
    top * (beta / (1.0 + beta)).powi(exponent)
}

fn factorial(k: u32) -> f64 {
    (2..=k).fold(1.0, |acc, i| acc * f64::from(i))
}

/// How the per-trial cardinality distribution is specified.
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionSpec {
    /// Closed-form zero-truncated negative binomial with parameters
    /// `beta > 0`, `r > 0`.
    Ztnbd { beta: f64, r: f64 },
    /// Raw probabilities for buckets `1..=max_cardinality`, or for
    /// `1..=max_cardinality-1` with the residual mass implicitly assigned
    /// to the final bucket.
    Explicit(Vec<f64>),
}

impl DistributionSpec {
    /// Validate against a run's `max_cardinality` and build the threshold
    /// table.
    pub fn thresholds(&self, max_cardinality: usize) -> Result<ThresholdTable> {
        match self {
            Self::Ztnbd { beta, r } => {
                if !(*beta > 0.0 && beta.is_finite()) {
                    return Err(NumbersimError::config_value(
                        "beta",
                        format!("{beta} is not a positive finite number"),
                    ));
                }
                if !(*r > 0.0 && r.is_finite()) {
                    return Err(NumbersimError::config_value(
                        "r",
                        format!("{r} is not a positive finite number"),
                    ));
                }
                let mut masses = Vec::with_capacity(max_cardinality);
                for k in 1..=max_cardinality {
                    let k = u32::try_from(k)
                        .map_err(|_| NumbersimError::internal("cardinality exceeds u32"))?;
                    let p = ztnbd_mass(k, *beta, *r);
                    // Not user input: the closed form over valid (beta, r)
                    // stays in [0, 1], so a violation is a computation bug.
                    if !(0.0..=1.0).contains(&p) {
                        return Err(NumbersimError::internal(format!(
                            "ztnbd mass p({k}) = {p} outside [0, 1]"
                        )));
                    }
                    masses.push(p);
                }
                Ok(ThresholdTable::from_masses(&masses))
            }
            Self::Explicit(values) => {
                let reduced = max_cardinality.saturating_sub(1);
                if values.len() != max_cardinality && values.len() != reduced {
                    return Err(NumbersimError::DistributionLength {
                        expected: max_cardinality,
                        got: values.len(),
                    });
                }
                for (index, value) in values.iter().enumerate() {
                    if !(0.0..=1.0).contains(value) {
                        return Err(NumbersimError::ProbabilityOutOfRange {
                            index: index + 1,
                            value: *value,
                        });
                    }
                }
                let sum: f64 = values.iter().sum();
                if values.len() == max_cardinality {
                    if (sum - 1.0).abs() > SUM_TOLERANCE {
                        return Err(NumbersimError::DistributionSum { sum });
                    }
                } else if sum > 1.0 + SUM_TOLERANCE {
                    // Reduced form: the final bucket takes whatever mass is
                    // left, which must not be negative.
                    return Err(NumbersimError::DistributionSum { sum });
                }
                Ok(ThresholdTable::from_masses(values))
            }
        }
    }
}

/// Cumulative draw thresholds on the `u32` scale.
///
/// One entry per explicit bucket; a draw that clears every threshold lands
/// in the open-ended final bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdTable {
    cumulative: Vec<u64>,
}

impl ThresholdTable {
    fn from_masses(masses: &[f64]) -> Self {
        let mut cumulative = Vec::with_capacity(masses.len());
        let mut acc: u64 = 0;
        for p in masses {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let step = (p * f64::from(u32::MAX)).floor() as u64;
            acc += step;
            cumulative.push(acc);
        }
        debug!(buckets = cumulative.len(), "built threshold table");
        Self { cumulative }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.cumulative
    }
}

/// Draws a cardinality from one uniform 32-bit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardinalitySampler {
    thresholds: ThresholdTable,
    max_cardinality: usize,
}

impl CardinalitySampler {
    /// Build the sampler for a run.
    pub fn new(spec: &DistributionSpec, max_cardinality: usize) -> Result<Self> {
        Ok(Self {
            thresholds: spec.thresholds(max_cardinality)?,
            max_cardinality,
        })
    }

    /// Map a uniform draw to a 1-based cardinality.
    ///
    /// A linear scan: `max_cardinality` is small and bounded, and the scan
    /// keeps the bucket rule obvious.
    #[must_use]
    pub fn draw(&self, uniform: u32) -> usize {
        let value = u64::from(uniform);
        for (bucket, threshold) in self.thresholds.as_slice().iter().enumerate() {
            if value < *threshold {
                return bucket + 1;
            }
        }
        self.max_cardinality
    }

    #[must_use]
    pub fn max_cardinality(&self) -> usize {
        self.max_cardinality
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn ztnbd_beta_one_r_one_is_geometric() {
        // With beta = 1, r = 1 the mass collapses to 2^-k.
        for k in 1..=10_u32 {
            let expected = 0.5_f64.powi(i32::try_from(k).unwrap());
            let got = ztnbd_mass(k, 1.0, 1.0);
            assert!(
                (got - expected).abs() < 1e-12,
                "p({k}) = {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn ztnbd_masses_decay_for_reference_parameters() {
        // A right-skewed profile over seven cardinalities.
        let masses: Vec<f64> = (1..=7).map(|k| ztnbd_mass(k, 0.6, 3.0)).collect();
        let total: f64 = masses.iter().sum();
        assert!(total > 0.9 && total <= 1.0, "total mass {total}");
        for pair in masses.windows(2).skip(1) {
            assert!(pair[0] > pair[1], "tail should decay: {pair:?}");
        }
    }

    #[test]
    fn ztnbd_thresholds_are_monotone() {
        let spec = DistributionSpec::Ztnbd { beta: 0.6, r: 3.0 };
        let table = spec.thresholds(7).expect("valid parameters");
        assert_eq!(table.len(), 7);
        for pair in table.as_slice().windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert!(*table.as_slice().last().unwrap() <= u64::from(u32::MAX));
    }

    proptest! {
        #[test]
        fn prop_ztnbd_mass_in_unit_interval(
            beta in 0.01_f64..8.0,
            r in 0.01_f64..8.0,
            k in 1_u32..=32,
        ) {
            let p = ztnbd_mass(k, beta, r);
            prop_assert!((0.0..=1.0).contains(&p), "p({k}) = {p}");
        }

        #[test]
        fn prop_thresholds_non_decreasing(
            beta in 0.01_f64..8.0,
            r in 0.01_f64..8.0,
            max_cardinality in 1_usize..=32,
        ) {
            let spec = DistributionSpec::Ztnbd { beta, r };
            let table = spec.thresholds(max_cardinality).unwrap();
            for pair in table.as_slice().windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }

    #[test]
    fn rejects_nonpositive_parameters() {
        let err = DistributionSpec::Ztnbd { beta: 0.0, r: 3.0 }
            .thresholds(4)
            .expect_err("beta = 0 should be rejected");
        assert!(matches!(err, NumbersimError::ConfigValue { .. }));

        let err = DistributionSpec::Ztnbd { beta: 0.6, r: -1.0 }
            .thresholds(4)
            .expect_err("negative r should be rejected");
        assert!(matches!(err, NumbersimError::ConfigValue { .. }));
    }

    #[test]
    fn explicit_full_list_must_sum_to_one() {
        let err = DistributionSpec::Explicit(vec![0.5, 0.1, 0.1])
            .thresholds(3)
            .expect_err("sum 0.7 should be rejected");
        assert!(matches!(err, NumbersimError::DistributionSum { .. }));

        DistributionSpec::Explicit(vec![0.5, 0.25, 0.25])
            .thresholds(3)
            .expect("exact sum should pass");
        DistributionSpec::Explicit(vec![0.5, 0.25, 0.254])
            .thresholds(3)
            .expect("sum within tolerance should pass");
    }

    #[test]
    fn explicit_rejects_out_of_range_value() {
        let err = DistributionSpec::Explicit(vec![1.5, -0.5])
            .thresholds(2)
            .expect_err("probability above 1 should be rejected");
        assert!(matches!(
            err,
            NumbersimError::ProbabilityOutOfRange { index: 1, .. }
        ));
    }

    #[test]
    fn explicit_rejects_wrong_length() {
        let err = DistributionSpec::Explicit(vec![0.5, 0.5])
            .thresholds(4)
            .expect_err("2 values for max cardinality 4 should be rejected");
        assert!(matches!(
            err,
            NumbersimError::DistributionLength {
                expected: 4,
                got: 2
            }
        ));
    }

    #[test]
    fn reduced_list_routes_residual_mass_to_final_bucket() {
        let spec = DistributionSpec::Explicit(vec![0.25, 0.25]);
        let sampler = CardinalitySampler::new(&spec, 3).expect("reduced list is valid");
        assert_eq!(sampler.thresholds.len(), 2);
        // Anything past the second threshold is the implicit tail.
        assert_eq!(sampler.draw(u32::MAX), 3);
        assert_eq!(sampler.draw(0), 1);
    }

    #[test]
    fn reduced_list_must_not_exceed_unit_mass() {
        let err = DistributionSpec::Explicit(vec![0.8, 0.8])
            .thresholds(3)
            .expect_err("reduced list summing past 1 should be rejected");
        assert!(matches!(err, NumbersimError::DistributionSum { .. }));
    }

    #[test]
    fn draw_scans_buckets_in_order() {
        let spec = DistributionSpec::Explicit(vec![0.25, 0.25, 0.25, 0.25]);
        let sampler = CardinalitySampler::new(&spec, 4).expect("uniform list is valid");
        let quarter = u64::from(u32::MAX) / 4;

        assert_eq!(sampler.draw(0), 1);
        assert_eq!(sampler.draw(u32::try_from(quarter - 1).unwrap()), 1);
        assert_eq!(sampler.draw(u32::try_from(quarter).unwrap()), 2);
        assert_eq!(sampler.draw(u32::try_from(2 * quarter).unwrap()), 3);
        assert_eq!(sampler.draw(u32::try_from(3 * quarter).unwrap()), 4);
        // Rounding slack above the last threshold falls into the last bucket.
        assert_eq!(sampler.draw(u32::MAX), 4);
    }

    #[test]
    fn single_bucket_always_draws_one() {
        let spec = DistributionSpec::Explicit(vec![1.0]);
        let sampler = CardinalitySampler::new(&spec, 1).expect("single bucket is valid");
        assert_eq!(sampler.draw(0), 1);
        assert_eq!(sampler.draw(u32::MAX), 1);

        // Reduced form with max cardinality 1 is the empty list.
        let spec = DistributionSpec::Explicit(Vec::new());
        let sampler = CardinalitySampler::new(&spec, 1).expect("empty reduced list is valid");
        assert_eq!(sampler.draw(12345), 1);
    }
}
