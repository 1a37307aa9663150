//! Requests and per-round results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::node::NodeId;
use crate::topology::EntanglementChain;

/// An ordered (source, destination) pair of distinct nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingRequest {
    source: NodeId,
    destination: NodeId,
}

impl RoutingRequest {
    /// Creates a request.
    ///
    /// # Errors
    /// `DegenerateRequest` if both ends are the same node.
    pub fn new(source: NodeId, destination: NodeId) -> Result<Self, ValidationError> {
        if source == destination {
            return Err(ValidationError::DegenerateRequest { node: source });
        }
        Ok(Self {
            source,
            destination,
        })
    }

    #[must_use]
    pub const fn source(&self) -> NodeId {
        self.source
    }

    #[must_use]
    pub const fn destination(&self) -> NodeId {
        self.destination
    }
}

impl fmt::Display for RoutingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.source, self.destination)
    }
}

/// Chains established for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub request: RoutingRequest,
    pub chains: Vec<EntanglementChain>,
}

impl RequestOutcome {
    /// Number of established chains. Zero is a normal outcome.
    #[must_use]
    pub fn established(&self) -> usize {
        self.chains.len()
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} × {}", self.request, self.established())
    }
}

/// Result of one `work` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Zero-based index of the round on its algorithm.
    pub round: u64,
    /// One entry per request, in request order.
    pub outcomes: Vec<RequestOutcome>,
}

impl RoundResult {
    /// Requests with at least one established chain.
    #[must_use]
    pub fn count_not_empty(&self) -> usize {
        self.outcomes.iter().filter(|o| o.established() > 0).count()
    }

    /// Total established chains across all requests.
    #[must_use]
    pub fn sum_by_length(&self) -> usize {
        self.outcomes.iter().map(RequestOutcome::established).sum()
    }

    /// `(count_not_empty, sum_by_length)`.
    #[must_use]
    pub fn aggregates(&self) -> (usize, usize) {
        (self.count_not_empty(), self.sum_by_length())
    }

    /// Established-chain count for `request`, summed over duplicates.
    #[must_use]
    pub fn established_for(&self, request: &RoutingRequest) -> usize {
        self.outcomes
            .iter()
            .filter(|o| &o.request == request)
            .map(RequestOutcome::established)
            .sum()
    }
}
