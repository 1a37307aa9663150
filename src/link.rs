//! Probabilistic quantum channels between two nodes.
//!
//! A [`Link`] holds only its own state. Anything that touches endpoint qubits
//! (reserve, release, reservability) goes through the owning
//! [`Topology`](crate::Topology), which can borrow both endpoints at once.

use std::fmt;
use std::hash::{Hash, Hasher};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidArgument, InvariantViolation};
use crate::node::NodeId;

/// Link identity, allocated in increasing order by the owning topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(u64);

impl LinkId {
    /// Creates a link ID from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out link identities for one topology.
///
/// Owned by the topology under construction, so two topologies never share
/// a counter.
#[derive(Debug, Clone)]
pub struct LinkIdSequence {
    next: u64,
}

impl LinkIdSequence {
    /// Starts a sequence whose first identity is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next identity.
    pub fn allocate(&mut self) -> LinkId {
        let id = LinkId(self.next);
        self.next += 1;
        id
    }
}

impl Default for LinkIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// An undirected probabilistic channel between two distinct nodes.
///
/// Equality and hashing use the identity only: two links with the same
/// endpoints and length are still different links.
#[derive(Debug, Clone)]
pub struct Link {
    id: LinkId,
    n1: NodeId,
    n2: NodeId,
    length: f64,
    assigned: bool,
    entangled: bool,
    utilized: bool,
    // Swap at an endpoint records the partner link it was merged with.
    swap1: Option<LinkId>,
    swap2: Option<LinkId>,
}

impl Link {
    pub(crate) fn new(id: LinkId, n1: NodeId, n2: NodeId, length: f64) -> Self {
        Self {
            id,
            n1,
            n2,
            length,
            assigned: false,
            entangled: false,
            utilized: false,
            swap1: None,
            swap2: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> LinkId {
        self.id
    }

    /// Both endpoints, in construction order.
    #[must_use]
    pub const fn endpoints(&self) -> (NodeId, NodeId) {
        (self.n1, self.n2)
    }

    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    /// Both endpoints hold a reserved qubit for this link.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.assigned
    }

    /// Outcome of the most recent trial.
    #[must_use]
    pub const fn is_entangled(&self) -> bool {
        self.entangled
    }

    /// Marked by a strategy as part of a candidate path.
    #[must_use]
    pub const fn is_utilized(&self) -> bool {
        self.utilized
    }

    /// Returns true if `node` is one of the two endpoints.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.n1 == node || self.n2 == node
    }

    /// Returns the endpoint that is not `node`.
    ///
    /// # Errors
    /// `NotAnEndpoint` if `node` is neither endpoint.
    pub fn other_than(&self, node: NodeId) -> Result<NodeId, InvalidArgument> {
        if self.n1 == node {
            Ok(self.n2)
        } else if self.n2 == node {
            Ok(self.n1)
        } else {
            Err(InvalidArgument::NotAnEndpoint { link: self.id, node })
        }
    }

    /// Partner link this link was swapped with at `node`, if any.
    #[must_use]
    pub fn swap_partner_at(&self, node: NodeId) -> Option<LinkId> {
        if self.n1 == node {
            self.swap1
        } else if self.n2 == node {
            self.swap2
        } else {
            None
        }
    }

    /// A swap was recorded at the endpoint `node`.
    #[must_use]
    pub fn swapped_at(&self, node: NodeId) -> bool {
        self.swap_partner_at(node).is_some()
    }

    /// A swap was recorded at the endpoint opposite to `node`.
    #[must_use]
    pub fn swapped_at_other_end_of(&self, node: NodeId) -> bool {
        (self.n1 == node && self.swap2.is_some()) || (self.n2 == node && self.swap1.is_some())
    }

    /// A swap was recorded at either endpoint.
    #[must_use]
    pub const fn swapped(&self) -> bool {
        self.swap1.is_some() || self.swap2.is_some()
    }

    #[must_use]
    pub const fn not_swapped(&self) -> bool {
        !self.swapped()
    }

    /// Marks the link as used by a candidate path.
    pub(crate) fn utilize(&mut self) {
        self.utilized = true;
    }

    /// Success probability `exp(-alpha * length)`.
    #[must_use]
    pub fn probability_of_success(&self, alpha: f64) -> f64 {
        (-alpha * self.length).exp()
    }

    /// Runs one entanglement trial.
    ///
    /// A sample is drawn even when the link is not assigned, so the position
    /// of every link in the random stream is fixed per sweep.
    pub(crate) fn attempt_entanglement<R: Rng + ?Sized>(&mut self, alpha: f64, rng: &mut R) -> bool {
        let sample: f64 = rng.gen();
        self.entangled = self.assigned && self.probability_of_success(alpha) >= sample;
        self.entangled
    }

    /// No reservation, entanglement or swap is held.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.assigned && !self.entangled && self.not_swapped()
    }

    pub(crate) fn set_assigned(&mut self, value: bool) {
        self.assigned = value;
    }

    pub(crate) fn record_swap(&mut self, node: NodeId, partner: LinkId) -> Result<(), InvariantViolation> {
        if !self.entangled {
            return Err(InvariantViolation::SwapOnUnentangledLink { link: self.id });
        }
        let slot = if self.n1 == node {
            &mut self.swap1
        } else {
            &mut self.swap2
        };
        if slot.is_some() {
            return Err(InvariantViolation::AlreadySwapped { link: self.id, node });
        }
        *slot = Some(partner);
        Ok(())
    }

    /// Resets entanglement, swap and utilization state. Reservation is
    /// released separately by the topology.
    pub(crate) fn reset_round_state(&mut self) {
        self.entangled = false;
        self.utilized = false;
        self.swap1 = None;
        self.swap2 = None;
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Link {}

impl Hash for Link {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({}, {}, {})", self.n1, self.n2, self.entangled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn link(length: f64) -> Link {
        Link::new(LinkId::new(1), NodeId::new(0), NodeId::new(1), length)
    }

    #[test]
    fn id_sequence_is_monotonic() {
        let mut seq = LinkIdSequence::new();
        let a = seq.allocate();
        let b = seq.allocate();
        assert_eq!(a.get(), 1);
        assert!(b > a);
    }

    #[test]
    fn other_than_rejects_foreign_node() {
        let l = link(1.0);
        assert_eq!(l.other_than(NodeId::new(0)).unwrap(), NodeId::new(1));
        assert_eq!(l.other_than(NodeId::new(1)).unwrap(), NodeId::new(0));
        let err = l.other_than(NodeId::new(5)).unwrap_err();
        assert!(matches!(err, InvalidArgument::NotAnEndpoint { .. }));
    }

    #[test]
    fn equality_is_by_identity() {
        let a = Link::new(LinkId::new(1), NodeId::new(0), NodeId::new(1), 2.0);
        let b = Link::new(LinkId::new(2), NodeId::new(0), NodeId::new(1), 2.0);
        let a_again = Link::new(LinkId::new(1), NodeId::new(4), NodeId::new(5), 9.0);
        assert_ne!(a, b);
        assert_eq!(a, a_again);
    }

    #[test]
    fn probability_is_one_at_zero_length_and_decreasing() {
        let alpha = 0.3;
        assert!((link(0.0).probability_of_success(alpha) - 1.0).abs() < f64::EPSILON);
        let mut last = 1.0;
        for len in [0.5, 1.0, 2.0, 10.0] {
            let p = link(len).probability_of_success(alpha);
            assert!(p < last);
            last = p;
        }
    }

    #[test]
    fn unassigned_link_never_entangles() {
        let mut l = link(0.0);
        // Zero samples would pass any probability check.
        let mut rng = StepRng::new(0, 0);
        for _ in 0..10 {
            assert!(!l.attempt_entanglement(0.0, &mut rng));
        }
        assert!(!l.is_entangled());
    }

    #[test]
    fn assigned_link_with_certain_success_entangles() {
        let mut l = link(0.0);
        l.set_assigned(true);
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(l.attempt_entanglement(0.0, &mut rng));
        }
    }

    #[test]
    fn swap_requires_entanglement_and_is_recorded_once() {
        let mut l = link(1.0);
        let node = NodeId::new(1);
        let err = l.record_swap(node, LinkId::new(9)).unwrap_err();
        assert!(matches!(err, InvariantViolation::SwapOnUnentangledLink { .. }));

        l.set_assigned(true);
        l.entangled = true;
        l.record_swap(node, LinkId::new(9)).unwrap();
        assert!(l.swapped_at(node));
        assert!(l.swapped_at_other_end_of(NodeId::new(0)));
        assert!(!l.swapped_at(NodeId::new(0)));
        assert_eq!(l.swap_partner_at(node), Some(LinkId::new(9)));

        let err = l.record_swap(node, LinkId::new(10)).unwrap_err();
        assert!(matches!(err, InvariantViolation::AlreadySwapped { .. }));

        l.reset_round_state();
        assert!(l.not_swapped());
        assert!(!l.is_entangled());
    }

    #[test]
    fn display_shows_endpoints_and_state() {
        assert_eq!(link(1.0).to_string(), "Link(0, 1, false)");
    }
}
