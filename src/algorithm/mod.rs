//! Routing algorithm protocol.
//!
//! A concrete routing policy implements [`RoutingStrategy`]. The fixed round
//! orchestration lives in [`RoutingAlgorithm::work`], which drives every
//! strategy through the same phases:
//!
//! ```text
//! Clean -> Prepared (once) -> Reserved (P2) -> Tried (sweep) -> Swapped (P4) -> Measured -> Clean
//! ```
//!
//! No phase can be skipped or reordered by a strategy.

pub mod round;

pub use round::{RequestOutcome, RoundResult, RoutingRequest};

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info, warn};

use crate::error::{InvariantViolation, SimResult};
use crate::link::Link;
use crate::topology::Topology;

/// Extension points of a routing policy.
///
/// Strategies may keep whatever state they like between phases of a round
/// (chosen paths, for instance); the topology is handed back to them at each
/// phase.
pub trait RoutingStrategy {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// One-time setup before the first round. Must not touch round state.
    fn prepare(&mut self, topology: &Topology) -> SimResult<()>;

    /// Phase P2: pick candidate paths and reserve qubits on their links with
    /// [`Topology::reserve`]. Only the chosen links may be left assigned.
    fn reserve_paths(&mut self, topology: &mut Topology, pairs: &[RoutingRequest]) -> SimResult<()>;

    /// Phase P4: record entanglement swaps with [`Topology::mark_swap`] on
    /// nodes that hold two entangled links worth merging. Trial outcomes are
    /// fixed by then; changing them aborts the round.
    fn swap_entanglements(&mut self, topology: &mut Topology, pairs: &[RoutingRequest]) -> SimResult<()>;
}

impl<S: RoutingStrategy + ?Sized> RoutingStrategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn prepare(&mut self, topology: &Topology) -> SimResult<()> {
        (**self).prepare(topology)
    }

    fn reserve_paths(&mut self, topology: &mut Topology, pairs: &[RoutingRequest]) -> SimResult<()> {
        (**self).reserve_paths(topology, pairs)
    }

    fn swap_entanglements(&mut self, topology: &mut Topology, pairs: &[RoutingRequest]) -> SimResult<()> {
        (**self).swap_entanglements(topology, pairs)
    }
}

/// Where the driver currently is within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    /// No round state held.
    Clean,
    /// Strategy prepared, no round started yet.
    Prepared,
    /// P2 finished; chosen links hold reservations.
    Reserved,
    /// Every link ran its trial.
    Tried,
    /// P4 finished; swaps recorded.
    Swapped,
    /// Established chains counted.
    Measured,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Clean => "clean",
            Self::Prepared => "prepared",
            Self::Reserved => "reserved",
            Self::Tried => "tried",
            Self::Swapped => "swapped",
            Self::Measured => "measured",
        };
        f.write_str(s)
    }
}

/// Drives a [`RoutingStrategy`] over a topology it owns.
///
/// Each driver owns its topology outright, so independent drivers can run on
/// different threads without sharing link state.
#[derive(Debug)]
pub struct RoutingAlgorithm<S, R = ChaCha20Rng> {
    topology: Topology,
    strategy: S,
    rng: R,
    settings: String,
    src_dst_pairs: Vec<RoutingRequest>,
    phase: RoundPhase,
    prepared: bool,
    rounds: u64,
}

impl<S: RoutingStrategy> RoutingAlgorithm<S, ChaCha20Rng> {
    /// Creates a driver whose trials draw from a ChaCha stream seeded with `seed`.
    pub fn new(topology: Topology, strategy: S, seed: u64) -> Self {
        Self::with_rng(topology, strategy, ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<S: RoutingStrategy, R: Rng> RoutingAlgorithm<S, R> {
    /// Creates a driver with an explicit random source.
    pub fn with_rng(topology: Topology, strategy: S, rng: R) -> Self {
        Self {
            topology,
            strategy,
            rng,
            settings: "Simple".to_string(),
            src_dst_pairs: Vec::new(),
            phase: RoundPhase::Clean,
            prepared: false,
            rounds: 0,
        }
    }

    /// Sets the label printed with each round's log line.
    #[must_use]
    pub fn with_settings(mut self, settings: impl Into<String>) -> Self {
        self.settings = settings.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    #[must_use]
    pub fn settings(&self) -> &str {
        &self.settings
    }

    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Mutable access between rounds, e.g. for tests that need to seed state.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    #[must_use]
    pub const fn strategy(&self) -> &S {
        &self.strategy
    }

    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of rounds completed.
    #[must_use]
    pub const fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Requests of the most recent round.
    #[must_use]
    pub fn pairs(&self) -> &[RoutingRequest] {
        &self.src_dst_pairs
    }

    /// Gives back the topology and strategy.
    pub fn into_parts(self) -> (Topology, S) {
        (self.topology, self.strategy)
    }

    /// Runs the strategy's one-time setup. Called by [`work`](Self::work) if
    /// the caller has not done so.
    pub fn prepare(&mut self) -> SimResult<()> {
        self.strategy.prepare(&self.topology)?;
        self.prepared = true;
        self.phase = RoundPhase::Prepared;
        debug!(algorithm = self.strategy.name(), "strategy prepared");
        Ok(())
    }

    /// Runs one full round for `pairs` and reports what was established.
    ///
    /// # Errors
    /// - `TopologyNotClean` if round state was left behind; the topology is
    ///   not touched in that case.
    /// - Any error raised by the strategy or a broken invariant detected after
    ///   a phase. The round is aborted and the topology cleared before the
    ///   error is returned.
    pub fn work(&mut self, pairs: &[RoutingRequest]) -> SimResult<RoundResult> {
        if let Err(err) = self.topology.ensure_clean() {
            warn!(algorithm = self.strategy.name(), error = %err, "refusing to start round");
            return Err(err.into());
        }
        if !self.prepared {
            self.prepare()?;
        }

        self.src_dst_pairs.clear();
        self.src_dst_pairs.extend_from_slice(pairs);

        let outcome = self.run_round();
        self.topology.clear_all_entanglements();
        self.phase = RoundPhase::Clean;

        match outcome {
            Ok(outcomes) => {
                let result = RoundResult {
                    round: self.rounds,
                    outcomes,
                };
                self.rounds += 1;
                self.log_round(&result);
                Ok(result)
            }
            Err(err) => {
                warn!(
                    algorithm = self.strategy.name(),
                    round = self.rounds,
                    error = %err,
                    "round aborted"
                );
                Err(err)
            }
        }
    }

    fn run_round(&mut self) -> SimResult<Vec<RequestOutcome>> {
        self.strategy
            .reserve_paths(&mut self.topology, &self.src_dst_pairs)?;
        self.topology.check_invariants()?;
        let status = self.topology.clean_status();
        if status.entangled > 0 || status.swapped > 0 {
            return Err(InvariantViolation::TrialsBeforeSweep {
                entangled: status.entangled,
                swapped: status.swapped,
            }
            .into());
        }
        self.enter(RoundPhase::Reserved);

        self.topology.run_entanglement_sweep(&mut self.rng);
        let tried: Vec<bool> = self.topology.links().iter().map(Link::is_entangled).collect();
        self.enter(RoundPhase::Tried);

        self.strategy
            .swap_entanglements(&mut self.topology, &self.src_dst_pairs)?;
        self.topology.check_invariants()?;
        // Swapping may only record merges; trial outcomes are fixed by the sweep.
        if let Some(link) = self
            .topology
            .links()
            .iter()
            .zip(&tried)
            .find(|(link, &was)| link.is_entangled() != was)
            .map(|(link, _)| link.id())
        {
            return Err(InvariantViolation::TrialsAfterSweep { link }.into());
        }
        self.enter(RoundPhase::Swapped);

        let mut outcomes = Vec::with_capacity(self.src_dst_pairs.len());
        for &request in &self.src_dst_pairs {
            let chains = self
                .topology
                .established_entanglements(request.source(), request.destination())?;
            outcomes.push(RequestOutcome { request, chains });
        }
        self.enter(RoundPhase::Measured);
        Ok(outcomes)
    }

    fn enter(&mut self, phase: RoundPhase) {
        debug!(algorithm = self.strategy.name(), round = self.rounds, %phase, "phase complete");
        self.phase = phase;
    }

    fn log_round(&self, result: &RoundResult) {
        let established = result
            .outcomes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("  ");
        info!(
            algorithm = self.strategy.name(),
            round = result.round,
            count_not_empty = result.count_not_empty(),
            sum_by_length = result.sum_by_length(),
            "[{}] Established: {}  - {}",
            self.settings,
            established,
            self.strategy.name()
        );
    }
}
