//! Network nodes and their quantum memory.
//!
//! A node is a passive resource holder. Its free-qubit count only moves
//! through link reservation on the owning [`Topology`](crate::Topology).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::link::LinkId;

/// Stable node identifier. Doubles as the node's index in its topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a node ID from its raw index.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Planar position of a node, used to derive link lengths.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Location {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// A quantum network node.
#[derive(Debug, Clone)]
pub struct Node {
    /// Stable identity.
    pub id: NodeId,
    /// Position used for distance computation.
    pub location: Location,
    n_qubits: u32,
    remaining_qubits: u32,
    links: Vec<LinkId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, location: Location, n_qubits: u32) -> Self {
        Self {
            id,
            location,
            n_qubits,
            remaining_qubits: n_qubits,
            links: Vec::new(),
        }
    }

    /// Total qubit capacity.
    #[must_use]
    pub const fn n_qubits(&self) -> u32 {
        self.n_qubits
    }

    /// Qubits not currently reserved by any link.
    #[must_use]
    pub const fn remaining_qubits(&self) -> u32 {
        self.remaining_qubits
    }

    /// Links incident to this node, in construction order.
    #[must_use]
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// Returns true if at least one qubit is free.
    #[must_use]
    pub const fn has_free_qubit(&self) -> bool {
        self.remaining_qubits > 0
    }

    /// Checks `0 <= remaining_qubits <= n_qubits`.
    pub fn check_invariant(&self) -> Result<(), InvariantViolation> {
        if self.remaining_qubits > self.n_qubits {
            return Err(InvariantViolation::QubitsOutOfRange {
                node: self.id,
                remaining: self.remaining_qubits,
                capacity: self.n_qubits,
            });
        }
        Ok(())
    }

    pub(crate) fn attach(&mut self, link: LinkId) {
        self.links.push(link);
    }

    pub(crate) fn take_qubit(&mut self, link: LinkId) -> Result<(), InvariantViolation> {
        self.remaining_qubits = self
            .remaining_qubits
            .checked_sub(1)
            .ok_or(InvariantViolation::QubitsExhausted { node: self.id, link })?;
        Ok(())
    }

    pub(crate) fn reset_qubits(&mut self) {
        self.remaining_qubits = self.n_qubits;
    }

    pub(crate) fn return_qubit(&mut self) -> Result<(), InvariantViolation> {
        if self.remaining_qubits >= self.n_qubits {
            return Err(InvariantViolation::QubitsOutOfRange {
                node: self.id,
                remaining: self.remaining_qubits.saturating_add(1),
                capacity: self.n_qubits,
            });
        }
        self.remaining_qubits += 1;
        Ok(())
    }
}
