//! Experiment tooling around the routing core.
//!
//! Samples request batches, drives an algorithm through repeated rounds and
//! aggregates the per-round results. None of this is needed to run a single
//! round; it is the outer loop callers typically write themselves.

pub mod calibrate;
pub mod config;
pub mod runner;

pub use calibrate::{calibrate_alpha, CALIBRATION_TOLERANCE};
pub use config::ExperimentConfig;
pub use runner::{ExperimentJob, ExperimentPool, ReportHandle};

use std::fmt;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::algorithm::{RoundResult, RoutingAlgorithm, RoutingRequest, RoutingStrategy};
use crate::error::SimResult;
use crate::node::NodeId;
use crate::topology::Topology;

/// Stable identifier for an experiment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(Uuid);

impl ExperimentId {
    /// Create a new random experiment ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExperimentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Aggregates of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub count_not_empty: usize,
    pub sum_by_length: usize,
}

impl From<&RoundResult> for RoundSummary {
    fn from(result: &RoundResult) -> Self {
        Self {
            count_not_empty: result.count_not_empty(),
            sum_by_length: result.sum_by_length(),
        }
    }
}

/// All rounds run with the same batch size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub pair_count: usize,
    pub rounds: Vec<RoundSummary>,
}

impl SeriesSummary {
    /// Mean number of requests served per round.
    #[must_use]
    pub fn avg_established_pairs(&self) -> f64 {
        self.mean(|r| r.count_not_empty)
    }

    /// Mean number of established chains per round.
    #[must_use]
    pub fn avg_entanglements(&self) -> f64 {
        self.mean(|r| r.sum_by_length)
    }

    fn mean(&self, f: impl Fn(&RoundSummary) -> usize) -> f64 {
        if self.rounds.is_empty() {
            return 0.0;
        }
        self.rounds.iter().map(f).sum::<usize>() as f64 / self.rounds.len() as f64
    }
}

/// Outcome of [`run_experiment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub id: ExperimentId,
    /// Strategy name.
    pub algorithm: String,
    pub started_at: DateTime<Utc>,
    /// Coefficient of the topology the experiment ran on.
    pub alpha: f64,
    /// One series per configured pair count, in config order.
    pub series: Vec<SeriesSummary>,
}

/// Draws `count` distinct unordered node pairs uniformly at random.
///
/// Returns every pair, shuffled, when fewer than `count` exist.
pub fn sample_pairs<R: Rng + ?Sized>(topology: &Topology, count: usize, rng: &mut R) -> Vec<RoutingRequest> {
    let ids: Vec<NodeId> = topology.nodes().iter().map(|n| n.id).collect();
    let mut combos: Vec<RoutingRequest> = ids
        .iter()
        .enumerate()
        .flat_map(|(i, &a)| ids[i + 1..].iter().filter_map(move |&b| RoutingRequest::new(a, b).ok()))
        .collect();
    combos.shuffle(rng);
    combos.truncate(count);
    combos
}

/// Runs `config.repeat` rounds for every entry of `config.pair_counts`.
///
/// Request batches are sampled from a stream seeded with `config.seed`, so
/// two strategies run with the same config see the same requests.
///
/// # Errors
/// Invalid config, or the first round that fails.
pub fn run_experiment<S, R>(algorithm: &mut RoutingAlgorithm<S, R>, config: &ExperimentConfig) -> SimResult<ExperimentReport>
where
    S: RoutingStrategy,
    R: Rng,
{
    config.validate()?;
    let started_at = Utc::now();
    let mut sampler = ChaCha20Rng::seed_from_u64(config.seed);

    let mut series = Vec::with_capacity(config.pair_counts.len());
    for &pair_count in &config.pair_counts {
        let mut rounds = Vec::with_capacity(config.repeat);
        for _ in 0..config.repeat {
            let pairs = sample_pairs(algorithm.topology(), pair_count, &mut sampler);
            let result = algorithm.work(&pairs)?;
            rounds.push(RoundSummary::from(&result));
        }
        let summary = SeriesSummary { pair_count, rounds };
        info!(
            algorithm = algorithm.name(),
            pair_count,
            avg_established_pairs = summary.avg_established_pairs(),
            avg_entanglements = summary.avg_entanglements(),
            "series finished"
        );
        series.push(summary);
    }

    Ok(ExperimentReport {
        id: ExperimentId::new(),
        algorithm: algorithm.name().to_string(),
        started_at,
        alpha: algorithm.topology().alpha(),
        series,
    })
}
