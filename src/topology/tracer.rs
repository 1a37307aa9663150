//! Tracing established end-to-end entanglement.
//!
//! A chain from `source` to `destination` is a sequence of entangled links
//! where:
//! - the first link is not swapped at `source`,
//! - the last link is not swapped at `destination`,
//! - every interior hop is a swap recorded on both links at the shared node,
//!   each naming the other as its partner.
//!
//! Because each endpoint of a link names at most one partner, a chain never
//! branches and a link belongs to at most one chain per query. Chains may pass
//! through the same interior node more than once on different links.

use serde::{Deserialize, Serialize};

use crate::error::InvalidArgument;
use crate::link::LinkId;
use crate::node::NodeId;

use super::Topology;

/// One end-to-end entangled span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntanglementChain {
    /// Links from source to destination.
    pub links: Vec<LinkId>,
    /// Nodes visited, starting at the source and ending at the destination.
    pub nodes: Vec<NodeId>,
}

impl EntanglementChain {
    /// Number of links in the chain.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.links.len()
    }
}

impl Topology {
    /// Returns every distinct entangled chain between `source` and
    /// `destination`, in the order of `source`'s incident links.
    ///
    /// Does not mutate state.
    ///
    /// # Errors
    /// `UnknownNode` if either node is not part of this topology.
    pub fn established_entanglements(
        &self,
        source: NodeId,
        destination: NodeId,
    ) -> Result<Vec<EntanglementChain>, InvalidArgument> {
        let src = self.node(source)?;
        self.node(destination)?;

        let mut chains = Vec::new();
        for &start in src.links() {
            let first = self.link(start)?;
            if !first.is_entangled() || first.swapped_at(source) {
                continue;
            }
            if let Some(chain) = self.follow(source, destination, start)? {
                chains.push(chain);
            }
        }
        Ok(chains)
    }

    fn follow(
        &self,
        source: NodeId,
        destination: NodeId,
        start: LinkId,
    ) -> Result<Option<EntanglementChain>, InvalidArgument> {
        let mut links = vec![start];
        let mut nodes = vec![source];
        let mut current = self.link(start)?;
        let mut at = current.other_than(source)?;

        loop {
            nodes.push(at);
            let Some(partner_id) = current.swap_partner_at(at) else {
                return Ok((at == destination).then_some(EntanglementChain { links, nodes }));
            };
            // The span continues past an endpoint of the request, so it does
            // not terminate there.
            if at == source || at == destination {
                return Ok(None);
            }
            let partner = self.link(partner_id)?;
            if !partner.is_entangled()
                || partner.swap_partner_at(at) != Some(current.id())
                || links.contains(&partner_id)
            {
                return Ok(None);
            }
            links.push(partner_id);
            at = partner.other_than(at)?;
            current = partner;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::mock::StepRng;

    /// Builds a zero-attenuation graph, reserves and entangles every link.
    fn entangled(nodes: usize, edges: &[(u32, u32)]) -> (Topology, Vec<NodeId>, Vec<LinkId>) {
        let mut b = Topology::builder(0.0);
        let ids: Vec<NodeId> = (0..nodes).map(|i| b.add_node([i as f64, 0.0], 4)).collect();
        let links: Vec<LinkId> = edges
            .iter()
            .map(|&(x, y)| b.add_link(NodeId::new(x), NodeId::new(y)).unwrap())
            .collect();
        let mut topo = b.build().unwrap();
        for &l in &links {
            topo.reserve(l).unwrap();
        }
        topo.run_entanglement_sweep(&mut StepRng::new(0, 0));
        (topo, ids, links)
    }

    #[test]
    fn single_entangled_link_is_one_chain() {
        let (topo, n, l) = entangled(2, &[(0, 1)]);
        let chains = topo.established_entanglements(n[0], n[1]).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].links, vec![l[0]]);
        assert_eq!(chains[0].nodes, vec![n[0], n[1]]);

        // Direction does not matter.
        assert_eq!(topo.established_entanglements(n[1], n[0]).unwrap().len(), 1);
    }

    #[test]
    fn swapped_line_connects_ends_only() {
        let (mut topo, n, l) = entangled(3, &[(0, 1), (1, 2)]);
        topo.mark_swap(n[1], l[0], l[1]).unwrap();

        let chains = topo.established_entanglements(n[0], n[2]).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].hops(), 2);
        assert_eq!(chains[0].nodes, vec![n[0], n[1], n[2]]);

        assert!(topo.established_entanglements(n[0], n[1]).unwrap().is_empty());
        assert!(topo.established_entanglements(n[1], n[2]).unwrap().is_empty());
    }

    #[test]
    fn unswapped_line_does_not_connect_ends() {
        let (topo, n, _) = entangled(3, &[(0, 1), (1, 2)]);
        assert!(topo.established_entanglements(n[0], n[2]).unwrap().is_empty());
        assert_eq!(topo.established_entanglements(n[0], n[1]).unwrap().len(), 1);
    }

    #[test]
    fn parallel_chains_count_separately() {
        // Two disjoint two-hop routes 0-1-3 and 0-2-3.
        let (mut topo, n, l) = entangled(4, &[(0, 1), (1, 3), (0, 2), (2, 3)]);
        topo.mark_swap(n[1], l[0], l[1]).unwrap();
        topo.mark_swap(n[2], l[2], l[3]).unwrap();

        let chains = topo.established_entanglements(n[0], n[3]).unwrap();
        assert_eq!(chains.len(), 2);
        assert_ne!(chains[0].links, chains[1].links);
    }

    #[test]
    fn chain_through_destination_is_not_counted() {
        // 0-1-2 swapped at 1 and again at 2 onto 2-3.
        let (mut topo, n, l) = entangled(4, &[(0, 1), (1, 2), (2, 3)]);
        topo.mark_swap(n[1], l[0], l[1]).unwrap();
        topo.mark_swap(n[2], l[1], l[2]).unwrap();

        assert!(topo.established_entanglements(n[0], n[2]).unwrap().is_empty());
        assert_eq!(topo.established_entanglements(n[0], n[3]).unwrap().len(), 1);
    }

    #[test]
    fn isolated_node_has_no_chains() {
        let (topo, n, _) = entangled(3, &[(0, 1)]);
        assert!(topo.established_entanglements(n[2], n[0]).unwrap().is_empty());
        assert!(topo.established_entanglements(n[0], n[2]).unwrap().is_empty());
    }

    #[test]
    fn unknown_node_is_rejected() {
        let (topo, n, _) = entangled(2, &[(0, 1)]);
        let err = topo
            .established_entanglements(n[0], NodeId::new(17))
            .unwrap_err();
        assert!(matches!(err, InvalidArgument::UnknownNode { .. }));
    }

    #[test]
    fn query_is_read_only() {
        let (mut topo, n, l) = entangled(3, &[(0, 1), (1, 2)]);
        topo.mark_swap(n[1], l[0], l[1]).unwrap();
        let before = topo.clean_status();
        let _ = topo.established_entanglements(n[0], n[2]).unwrap();
        assert_eq!(topo.clean_status(), before);
    }
}
