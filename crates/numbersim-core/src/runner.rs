//! One-run orchestration: draw, look up, update, track, decide.
//!
//! Trial `t + 1` depends on the matrix and generator state left by trial
//! `t`, so a run is inherently sequential. Runs never share mutable state;
//! callers that pipeline several runs give each its own configuration.

use numbersim_error::{NumbersimError, Result};
use numbersim_lang::MarkerIndex;
use rand::RngCore;
use rand_pcg::Pcg32;
use tracing::{debug, info};

use crate::assoc::{AssociationEngine, WeightInit};
use crate::config::{OutputMode, RunConfig};
use crate::convergence::{ConvergenceTracker, TrialBitset};
use crate::distribution::CardinalitySampler;
use crate::report::{FullReport, RangeReport, RunReport, SummaryReport, TrialRow};

/// Execute one run to completion (or early convergence) and assemble its
/// report.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    config.validate()?;

    let language = &config.language;
    let max_cardinality = config.max_cardinality;
    let num_markers = language.num_markers();

    let sampler = CardinalitySampler::new(&config.distribution, max_cardinality)?;
    // seed2 selects the stream; the generator forces its internal increment
    // odd, so any u64 is acceptable.
    let mut rng = Pcg32::new(config.seed1, config.seed2);
    let mut engine = match config.weight_init {
        WeightInit::Zero => {
            AssociationEngine::new(max_cardinality, num_markers, config.learning_rate)
        }
        WeightInit::Random => AssociationEngine::with_random_weights(
            max_cardinality,
            num_markers,
            config.learning_rate,
            &mut rng,
        ),
    };

    // Ground truth per cardinality. The parser leaves no unresolved entries,
    // so a miss here is a bug, not bad input.
    let truth: Vec<MarkerIndex> = (1..=max_cardinality)
        .map(|cardinality| {
            language.marker_for(cardinality).ok_or_else(|| {
                NumbersimError::internal(format!(
                    "cardinality {cardinality} resolved to no marker in language {}",
                    language.name()
                ))
            })
        })
        .collect::<Result<_>>()?;

    let record_bits = matches!(config.mode, OutputMode::RangeSummary).then_some(config.trials);
    let mut tracker = ConvergenceTracker::new(max_cardinality, record_bits);
    let mut rows = Vec::new();
    let mut correct = vec![false; max_cardinality];
    let mut converged = false;

    debug!(
        seed1 = config.seed1,
        seed2 = config.seed2,
        language = %language.name(),
        trials = config.trials,
        mode = config.mode.as_str(),
        "starting run"
    );

    for _ in 0..config.trials {
        let drawn = sampler.draw(rng.next_u32());
        let target = truth[drawn - 1];
        engine.reinforce(drawn, target);

        let table = engine.predictions();
        for (cue, flag) in correct.iter_mut().enumerate() {
            *flag = table.best(cue) == truth[cue];
        }
        tracker.observe(&correct);

        if config.mode == OutputMode::Full {
            rows.push(TrialRow {
                marker: target,
                sums: table.sums().to_vec(),
                correct: correct.clone(),
            });
        }

        if config.mode == OutputMode::Summary
            && config.threshold > 0
            && tracker.aggregate_streak() >= config.threshold
        {
            converged = true;
            break;
        }
    }

    info!(
        trials = tracker.trials_observed(),
        converged, "run complete"
    );

    match config.mode {
        OutputMode::Full => Ok(RunReport::Full(FullReport {
            markers: language.markers().to_vec(),
            max_cardinality,
            seed1: config.seed1,
            seed2: config.seed2,
            rows,
        })),
        OutputMode::Summary => {
            let summary = tracker.summary();
            let continuation = (rng.next_u64(), rng.next_u64());
            Ok(RunReport::Summary(SummaryReport {
                per_cardinality: summary.per_cardinality,
                aggregate: summary.aggregate,
                continuation,
            }))
        }
        OutputMode::RangeSummary => {
            let log = tracker
                .log()
                .ok_or_else(|| NumbersimError::internal("range run kept no correctness log"))?;
            let per_cardinality = log
                .per_cardinality
                .iter()
                .map(TrialBitset::ranges)
                .collect();
            let aggregate = log.aggregate.ranges();
            let continuation = (rng.next_u64(), rng.next_u64());
            Ok(RunReport::RangeSummary(RangeReport {
                per_cardinality,
                aggregate,
                continuation,
            }))
        }
    }
}
