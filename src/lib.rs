//! # qnet-routing - Entanglement routing over quantum networks
//!
//! A simulation substrate for entanglement routing algorithms. Nodes hold a
//! limited number of qubits, links succeed probabilistically, and a routing
//! strategy tries to stitch end-to-end entanglement for a batch of
//! source-destination requests.
//!
//! ## Core Concepts
//!
//! - **Topology**: nodes, links and the attenuation coefficient `alpha`
//! - **Link**: a channel succeeding with probability `exp(-alpha * length)`
//! - **RoutingStrategy**: the pluggable policy (prepare, P2 reservation, P4 swapping)
//! - **RoutingAlgorithm**: the fixed round driver that scores a strategy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qnet_routing::{RoutingAlgorithm, RoutingRequest, Topology};
//!
//! let mut builder = Topology::builder(0.1);
//! let a = builder.add_node([0.0, 0.0], 4);
//! let b = builder.add_node([1.0, 0.0], 4);
//! builder.add_link(a, b)?;
//! let topology = builder.build()?;
//!
//! let mut algorithm = RoutingAlgorithm::new(topology, MyStrategy::default(), 42);
//! let result = algorithm.work(&[RoutingRequest::new(a, b)?])?;
//! println!("{} requests served", result.count_not_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core model
pub mod error;
pub mod link;
pub mod node;
pub mod topology;

// Round protocol
pub mod algorithm;

// Outer loop: sampling, calibration, parallel runs
pub mod experiment;

// Re-export primary types at crate root for convenience
pub use algorithm::{RequestOutcome, RoundPhase, RoundResult, RoutingAlgorithm, RoutingRequest, RoutingStrategy};
pub use error::{ExecutionError, InvalidArgument, InvariantViolation, SimError, SimResult, ValidationError};
pub use experiment::{
    calibrate_alpha, run_experiment, sample_pairs, ExperimentConfig, ExperimentId, ExperimentJob, ExperimentPool,
    ExperimentReport, ReportHandle, RoundSummary, SeriesSummary, CALIBRATION_TOLERANCE,
};
pub use link::{Link, LinkId, LinkIdSequence};
pub use node::{Location, Node, NodeId};
pub use topology::{CleanStatus, EntanglementChain, LinkSpec, NodeSpec, Topology, TopologyBuilder, TopologyConfig};
