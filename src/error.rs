//! Error types for the routing simulator.
//!
//! Errors are split by how a caller is expected to react:
//! - [`ValidationError`]: bad construction input, rejected before anything runs.
//! - [`InvalidArgument`]: a bad reference in a query; local to that query.
//! - [`InvariantViolation`]: a caller or strategy bug; aborts the current round.

use thiserror::Error;

use crate::link::LinkId;
use crate::node::NodeId;

/// Validation errors raised while building topologies, requests and configs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Link cannot connect node {node} to itself")]
    SelfLoop {
        node: NodeId,
    },

    #[error("Node {node} must have at least one qubit")]
    NoQubits {
        node: NodeId,
    },

    #[error("Link length {length} must be a finite, non-negative number")]
    InvalidLength {
        length: f64,
    },

    #[error("Attenuation coefficient {alpha} must be a finite, non-negative number")]
    InvalidCoefficient {
        alpha: f64,
    },

    #[error("Link references unknown node {node}")]
    UnknownNode {
        node: NodeId,
    },

    #[error("Routing request must connect two distinct nodes, got {node} twice")]
    DegenerateRequest {
        node: NodeId,
    },

    #[error("Invalid experiment config: {reason}")]
    InvalidExperimentConfig {
        reason: String,
    },

    #[error("Invalid topology description: {reason}")]
    InvalidTopologyDescription {
        reason: String,
    },
}

/// Errors for queries that reference something that is not there.
#[derive(Debug, Error)]
pub enum InvalidArgument {
    #[error("Node {node} is not an endpoint of link {link}")]
    NotAnEndpoint {
        link: LinkId,
        node: NodeId,
    },

    #[error("Unknown node: {node}")]
    UnknownNode {
        node: NodeId,
    },

    #[error("Unknown link: {link}")]
    UnknownLink {
        link: LinkId,
    },

    #[error("Cannot swap link {link} with itself at node {node}")]
    SwapWithSelf {
        link: LinkId,
        node: NodeId,
    },
}

/// Broken invariants. These indicate a bug in the caller or the strategy.
#[derive(Debug, Error)]
pub enum InvariantViolation {
    #[error("Node {node} has {remaining} of {capacity} qubits remaining")]
    QubitsOutOfRange {
        node: NodeId,
        remaining: u32,
        capacity: u32,
    },

    #[error("Node {node} has no free qubit left for link {link}")]
    QubitsExhausted {
        node: NodeId,
        link: LinkId,
    },

    #[error("Link {link} is already reserved")]
    AlreadyReserved {
        link: LinkId,
    },

    #[error("Topology is not clean: {assigned} assigned, {entangled} entangled, {swapped} swapped links")]
    TopologyNotClean {
        assigned: usize,
        entangled: usize,
        swapped: usize,
    },

    #[error("Link {link} is not entangled and cannot be swapped")]
    SwapOnUnentangledLink {
        link: LinkId,
    },

    #[error("Link {link} is already swapped at node {node}")]
    AlreadySwapped {
        link: LinkId,
        node: NodeId,
    },

    #[error("Link {link} is entangled without a qubit reservation")]
    EntangledWithoutReservation {
        link: LinkId,
    },

    #[error("Trial state present before the entanglement sweep: {entangled} entangled, {swapped} swapped links")]
    TrialsBeforeSweep {
        entangled: usize,
        swapped: usize,
    },

    #[error("Entanglement of link {link} changed after the sweep")]
    TrialsAfterSweep {
        link: LinkId,
    },
}

/// Errors from experiment execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Experiment queue is full (capacity: {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Experiment worker disconnected before replying")]
    Disconnected,

    #[error("Failed to spawn experiment worker: {message}")]
    SpawnFailed {
        message: String,
    },

    #[error("Calibration for target {target} did not converge within {iterations} iterations")]
    CalibrationDiverged {
        target: f64,
        iterations: usize,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),

    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SimError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an invalid-argument error.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns true if this is an invariant violation.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }

    /// Returns true if the caller can fix the input and try again.
    ///
    /// Invariant violations are never recoverable: they mean some state was
    /// driven outside the protocol.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::InvalidArgument(_) | Self::Io(_) | Self::Serialization(_) => true,
            Self::Invariant(_) | Self::Execution(_) | Self::Internal { .. } => false,
        }
    }

    /// Returns true if submitting the same work again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::QueueFull { .. }))
    }
}

/// Result type alias for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
