#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use qnet_routing::{LinkId, NodeId, RoutingRequest, RoutingStrategy, SimResult, Topology};

/// Shortest-path strategy used by the integration tests.
///
/// P2 reserves one breadth-first path per request over links that are still
/// reservable. P4 swaps along every path whose links all came up entangled.
#[derive(Debug, Default)]
pub struct GreedyShortestPath {
    pub prepared: usize,
    paths: Vec<Path>,
}

#[derive(Debug, Clone)]
struct Path {
    nodes: Vec<NodeId>,
    links: Vec<LinkId>,
}

impl GreedyShortestPath {
    fn find_path(topology: &Topology, request: &RoutingRequest) -> Option<Path> {
        let source = request.source();
        let destination = request.destination();
        let mut prev: HashMap<NodeId, (NodeId, LinkId)> = HashMap::new();
        let mut queue = VecDeque::from([source]);

        while let Some(at) = queue.pop_front() {
            if at == destination {
                break;
            }
            for &link_id in topology.node(at).ok()?.links() {
                if !topology.is_reservable(link_id).ok()? {
                    continue;
                }
                let next = topology.link(link_id).ok()?.other_than(at).ok()?;
                if next == source || prev.contains_key(&next) {
                    continue;
                }
                prev.insert(next, (at, link_id));
                queue.push_back(next);
            }
        }

        let mut nodes = vec![destination];
        let mut links = Vec::new();
        let mut at = destination;
        while at != source {
            let &(from, link) = prev.get(&at)?;
            links.push(link);
            nodes.push(from);
            at = from;
        }
        nodes.reverse();
        links.reverse();
        Some(Path { nodes, links })
    }
}

impl RoutingStrategy for GreedyShortestPath {
    fn name(&self) -> &str {
        "greedy-shortest-path"
    }

    fn prepare(&mut self, _topology: &Topology) -> SimResult<()> {
        self.prepared += 1;
        Ok(())
    }

    fn reserve_paths(&mut self, topology: &mut Topology, pairs: &[RoutingRequest]) -> SimResult<()> {
        self.paths.clear();
        for request in pairs {
            let Some(path) = Self::find_path(topology, request) else {
                continue;
            };
            let mut reserved = Vec::new();
            for &link in &path.links {
                if !topology.is_reservable(link)? {
                    break;
                }
                topology.reserve(link)?;
                topology.utilize(link)?;
                reserved.push(link);
            }
            if reserved.len() == path.links.len() {
                self.paths.push(path);
            } else {
                for link in reserved {
                    topology.release(link)?;
                }
            }
        }
        Ok(())
    }

    fn swap_entanglements(&mut self, topology: &mut Topology, _pairs: &[RoutingRequest]) -> SimResult<()> {
        for path in &self.paths {
            let all_entangled = path
                .links
                .iter()
                .all(|&l| topology.link(l).is_ok_and(|l| l.is_entangled()));
            if !all_entangled {
                continue;
            }
            for (i, pair) in path.links.windows(2).enumerate() {
                topology.mark_swap(path.nodes[i + 1], pair[0], pair[1])?;
            }
        }
        Ok(())
    }
}

/// `n` nodes on a line, one unit apart, every neighbour linked.
pub fn line(n: usize, alpha: f64, qubits: u32) -> (Topology, Vec<NodeId>) {
    let mut b = Topology::builder(alpha);
    let nodes: Vec<NodeId> = (0..n).map(|i| b.add_node([i as f64, 0.0], qubits)).collect();
    for pair in nodes.windows(2) {
        b.add_link(pair[0], pair[1]).unwrap();
    }
    (b.build().unwrap(), nodes)
}

/// `side` x `side` grid with unit spacing.
pub fn grid(side: usize, alpha: f64, qubits: u32) -> (Topology, Vec<NodeId>) {
    let mut b = Topology::builder(alpha);
    let nodes: Vec<NodeId> = (0..side * side)
        .map(|i| b.add_node([(i % side) as f64, (i / side) as f64], qubits))
        .collect();
    for row in 0..side {
        for col in 0..side {
            let here = nodes[row * side + col];
            if col + 1 < side {
                b.add_link(here, nodes[row * side + col + 1]).unwrap();
            }
            if row + 1 < side {
                b.add_link(here, nodes[(row + 1) * side + col]).unwrap();
            }
        }
    }
    (b.build().unwrap(), nodes)
}

pub fn request(a: NodeId, b: NodeId) -> RoutingRequest {
    RoutingRequest::new(a, b).unwrap()
}
