//! The network graph: nodes, links and the shared attenuation coefficient.
//!
//! All mutation of link and qubit state goes through [`Topology`] so the
//! reservation bookkeeping on both endpoints stays in step with each link's
//! `assigned` flag.

pub mod config;
pub mod tracer;

pub use config::{LinkSpec, NodeSpec, TopologyConfig};
pub use tracer::EntanglementChain;

use rand::Rng;
use tracing::debug;

use crate::error::{InvalidArgument, InvariantViolation, SimResult, ValidationError};
use crate::link::{Link, LinkId, LinkIdSequence};
use crate::node::{Location, Node, NodeId};

/// Counts of links still holding round state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanStatus {
    pub assigned: usize,
    pub entangled: usize,
    pub swapped: usize,
}

impl CleanStatus {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.assigned == 0 && self.entangled == 0 && self.swapped == 0
    }
}

/// A quantum network.
#[derive(Debug, Clone)]
pub struct Topology {
    alpha: f64,
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl Topology {
    /// Starts building a topology with attenuation coefficient `alpha`.
    #[must_use]
    pub fn builder(alpha: f64) -> TopologyBuilder {
        TopologyBuilder::new(alpha)
    }

    /// The channel-attenuation coefficient shared by all links.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Result<&Node, InvalidArgument> {
        self.nodes
            .get(id.index())
            .ok_or(InvalidArgument::UnknownNode { node: id })
    }

    /// Looks up a link.
    pub fn link(&self, id: LinkId) -> Result<&Link, InvalidArgument> {
        self.link_index(id).map(|idx| &self.links[idx])
    }

    /// Marks `link` as part of a candidate path. Cleared with the round.
    pub fn utilize(&mut self, link: LinkId) -> Result<(), InvalidArgument> {
        let idx = self.link_index(link)?;
        self.links[idx].utilize();
        Ok(())
    }

    fn link_index(&self, id: LinkId) -> Result<usize, InvalidArgument> {
        // Identities are allocated densely from 1 in construction order.
        usize::try_from(id.get())
            .ok()
            .and_then(|raw| raw.checked_sub(1))
            .filter(|&idx| self.links.get(idx).is_some_and(|l| l.id() == id))
            .ok_or(InvalidArgument::UnknownLink { link: id })
    }

    /// Links connecting `a` and `b`, in either direction.
    pub fn links_between(&self, a: NodeId, b: NodeId) -> impl Iterator<Item = &Link> + '_ {
        self.links
            .iter()
            .filter(move |l| l.contains(a) && l.contains(b))
    }

    /// Success probability of `link` under this topology's coefficient.
    pub fn probability_of_success(&self, link: LinkId) -> Result<f64, InvalidArgument> {
        Ok(self.link(link)?.probability_of_success(self.alpha))
    }

    /// Mean success probability over all links, or 0 for a linkless graph.
    #[must_use]
    pub fn average_success_probability(&self) -> f64 {
        if self.links.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .links
            .iter()
            .map(|l| l.probability_of_success(self.alpha))
            .sum();
        total / self.links.len() as f64
    }

    /// Returns true if the link is free and both endpoints have a spare qubit.
    pub fn is_reservable(&self, link: LinkId) -> Result<bool, InvalidArgument> {
        let link = self.link(link)?;
        let (n1, n2) = link.endpoints();
        Ok(!link.is_assigned()
            && self.nodes[n1.index()].has_free_qubit()
            && self.nodes[n2.index()].has_free_qubit())
    }

    /// Reserves one qubit at each endpoint for `link`.
    ///
    /// # Errors
    /// - `UnknownLink` if the link is not part of this topology.
    /// - `AlreadyReserved` if the link already holds a reservation.
    /// - `QubitsExhausted` if either endpoint has no free qubit; nothing is
    ///   reserved in that case.
    pub fn reserve(&mut self, link: LinkId) -> SimResult<()> {
        let idx = self.link_index(link)?;
        if self.links[idx].is_assigned() {
            return Err(InvariantViolation::AlreadyReserved { link }.into());
        }
        let (n1, n2) = self.links[idx].endpoints();
        self.nodes[n1.index()].take_qubit(link)?;
        if let Err(err) = self.nodes[n2.index()].take_qubit(link) {
            self.nodes[n1.index()].return_qubit()?;
            return Err(err.into());
        }
        self.links[idx].set_assigned(true);
        Ok(())
    }

    /// Releases the reservation held by `link`. No-op if it holds none.
    ///
    /// Releasing also drops the link's entanglement, which cannot outlive the
    /// qubits it lives in.
    pub fn release(&mut self, link: LinkId) -> SimResult<()> {
        let idx = self.link_index(link)?;
        if !self.links[idx].is_assigned() {
            return Ok(());
        }
        let (n1, n2) = self.links[idx].endpoints();
        for node in [&self.nodes[n1.index()], &self.nodes[n2.index()]] {
            if node.remaining_qubits() >= node.n_qubits() {
                return Err(InvariantViolation::QubitsOutOfRange {
                    node: node.id,
                    remaining: node.remaining_qubits().saturating_add(1),
                    capacity: node.n_qubits(),
                }
                .into());
            }
        }
        self.nodes[n1.index()].return_qubit()?;
        self.nodes[n2.index()].return_qubit()?;
        self.links[idx].set_assigned(false);
        self.links[idx].reset_round_state();
        Ok(())
    }

    /// Counts links that still carry reservation, entanglement or swaps.
    #[must_use]
    pub fn clean_status(&self) -> CleanStatus {
        self.links.iter().fold(CleanStatus::default(), |mut acc, l| {
            acc.assigned += usize::from(l.is_assigned());
            acc.entangled += usize::from(l.is_entangled());
            acc.swapped += usize::from(l.swapped());
            acc
        })
    }

    /// True iff no link is assigned, entangled or swapped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.links.iter().all(Link::is_clean)
    }

    /// Fails with `TopologyNotClean` if any link still carries round state.
    pub fn ensure_clean(&self) -> Result<(), InvariantViolation> {
        let status = self.clean_status();
        if status.is_clean() {
            return Ok(());
        }
        Err(InvariantViolation::TopologyNotClean {
            assigned: status.assigned,
            entangled: status.entangled,
            swapped: status.swapped,
        })
    }

    /// Runs one entanglement trial on every link and returns how many
    /// succeeded.
    ///
    /// Every link consumes exactly one draw from `rng`, in link order.
    pub fn run_entanglement_sweep<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let alpha = self.alpha;
        let entangled = self
            .links
            .iter_mut()
            .map(|link| link.attempt_entanglement(alpha, rng))
            .filter(|&ok| ok)
            .count();
        debug!(links = self.links.len(), entangled, "entanglement sweep finished");
        entangled
    }

    /// Releases every reservation and resets entanglement, swap and
    /// utilization state. Idempotent.
    pub fn clear_all_entanglements(&mut self) {
        for link in &mut self.links {
            link.set_assigned(false);
            link.reset_round_state();
        }
        for node in &mut self.nodes {
            node.reset_qubits();
        }
    }

    /// Records an entanglement swap at `node` merging links `a` and `b`.
    ///
    /// Both links must be entangled, incident to `node` and not yet swapped
    /// there. On error nothing is recorded.
    pub fn mark_swap(&mut self, node: NodeId, a: LinkId, b: LinkId) -> SimResult<()> {
        self.node(node)?;
        if a == b {
            return Err(InvalidArgument::SwapWithSelf { link: a, node }.into());
        }
        let ia = self.link_index(a)?;
        let ib = self.link_index(b)?;
        for idx in [ia, ib] {
            let link = &self.links[idx];
            if !link.contains(node) {
                return Err(InvalidArgument::NotAnEndpoint { link: link.id(), node }.into());
            }
            if !link.is_entangled() {
                return Err(InvariantViolation::SwapOnUnentangledLink { link: link.id() }.into());
            }
            if link.swapped_at(node) {
                return Err(InvariantViolation::AlreadySwapped { link: link.id(), node }.into());
            }
        }
        self.links[ia].record_swap(node, b)?;
        self.links[ib].record_swap(node, a)?;
        Ok(())
    }

    /// Verifies qubit bookkeeping across the whole graph.
    ///
    /// Checks that every node's free-qubit count is in range and equals its
    /// capacity minus the assigned incident links, and that no link is
    /// entangled without a reservation.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut held = vec![0u32; self.nodes.len()];
        for link in self.links.iter().filter(|l| l.is_assigned()) {
            let (n1, n2) = link.endpoints();
            held[n1.index()] += 1;
            held[n2.index()] += 1;
        }
        for (node, held) in self.nodes.iter().zip(held) {
            node.check_invariant()?;
            if node.remaining_qubits().checked_add(held) != Some(node.n_qubits()) {
                return Err(InvariantViolation::QubitsOutOfRange {
                    node: node.id,
                    remaining: node.remaining_qubits(),
                    capacity: node.n_qubits(),
                });
            }
        }
        if let Some(link) = self.links.iter().find(|l| l.is_entangled() && !l.is_assigned()) {
            return Err(InvariantViolation::EntangledWithoutReservation { link: link.id() });
        }
        Ok(())
    }

    /// Returns a clean copy of this topology with a different coefficient.
    pub fn with_alpha(&self, alpha: f64) -> Result<Self, ValidationError> {
        Self::from_config(&self.to_config().with_alpha(alpha))
    }
}

/// Incrementally assembles a [`Topology`], validating as it goes.
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    alpha: f64,
    nodes: Vec<Node>,
    links: Vec<Link>,
    ids: LinkIdSequence,
}

impl TopologyBuilder {
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            nodes: Vec::new(),
            links: Vec::new(),
            ids: LinkIdSequence::new(),
        }
    }

    /// Adds a node and returns its identity.
    ///
    /// Capacity is checked in [`build`](Self::build).
    pub fn add_node(&mut self, location: impl Into<Location>, qubits: u32) -> NodeId {
        let raw = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        let id = NodeId::new(raw);
        self.nodes.push(Node::new(id, location.into(), qubits));
        id
    }

    /// Adds a link whose length is the distance between its endpoints.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) -> Result<LinkId, ValidationError> {
        let length = self.location(a)?.distance(&self.location(b)?);
        self.add_link_with_length(a, b, length)
    }

    /// Adds a link with an explicit length.
    pub fn add_link_with_length(&mut self, a: NodeId, b: NodeId, length: f64) -> Result<LinkId, ValidationError> {
        self.location(a)?;
        self.location(b)?;
        if a == b {
            return Err(ValidationError::SelfLoop { node: a });
        }
        if !length.is_finite() || length < 0.0 {
            return Err(ValidationError::InvalidLength { length });
        }
        let id = self.ids.allocate();
        self.links.push(Link::new(id, a, b, length));
        self.nodes[a.index()].attach(id);
        self.nodes[b.index()].attach(id);
        Ok(id)
    }

    fn location(&self, node: NodeId) -> Result<Location, ValidationError> {
        self.nodes
            .get(node.index())
            .map(|n| n.location)
            .ok_or(ValidationError::UnknownNode { node })
    }

    /// Finishes construction. The result is always clean.
    pub fn build(self) -> Result<Topology, ValidationError> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(ValidationError::InvalidCoefficient { alpha: self.alpha });
        }
        if let Some(node) = self.nodes.iter().find(|n| n.n_qubits() == 0) {
            return Err(ValidationError::NoQubits { node: node.id });
        }
        Ok(Topology {
            alpha: self.alpha,
            nodes: self.nodes,
            links: self.links,
        })
    }
}
