mod common;

use rand::rngs::mock::StepRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use qnet_routing::{
    InvariantViolation, RoundPhase, RoutingAlgorithm, RoutingRequest, RoutingStrategy, SimError, SimResult, Topology,
};

use common::{grid, line, request, GreedyShortestPath};

#[test]
fn three_node_line_with_swap_yields_one_end_to_end_chain() {
    let (mut topo, n) = line(3, 0.5, 2);
    let ab = topo.links()[0].id();
    let bc = topo.links()[1].id();

    topo.reserve(ab).unwrap();
    topo.reserve(bc).unwrap();
    // Zero draws force both trials to succeed.
    assert_eq!(topo.run_entanglement_sweep(&mut StepRng::new(0, 0)), 2);
    topo.mark_swap(n[1], ab, bc).unwrap();

    assert_eq!(topo.established_entanglements(n[0], n[2]).unwrap().len(), 1);
    assert_eq!(topo.established_entanglements(n[0], n[1]).unwrap().len(), 0);

    topo.clear_all_entanglements();
    assert!(topo.is_clean());
}

#[test]
fn driver_scores_swapped_line() {
    let (topo, n) = line(3, 0.0, 2);
    let mut algo = RoutingAlgorithm::new(topo, GreedyShortestPath::default(), 5);
    let ac = request(n[0], n[2]);

    let result = algo.work(&[ac]).unwrap();
    assert_eq!(result.established_for(&ac), 1);
    assert_eq!(result.outcomes[0].chains[0].nodes, vec![n[0], n[1], n[2]]);
    assert!(algo.topology().is_clean());
    assert_eq!(algo.phase(), RoundPhase::Clean);
}

#[test]
fn zero_length_link_at_zero_attenuation_always_entangles() {
    for seed in 0..50 {
        let mut b = Topology::builder(0.0);
        let a = b.add_node([0.0, 0.0], 1);
        let c = b.add_node([0.0, 0.0], 1);
        let link = b.add_link_with_length(a, c, 0.0).unwrap();
        let mut topo = b.build().unwrap();

        topo.reserve(link).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        assert_eq!(topo.run_entanglement_sweep(&mut rng), 1);
        assert!(topo.link(link).unwrap().is_entangled());
    }
}

#[test]
fn isolated_node_is_never_reached() {
    let mut b = Topology::builder(0.0);
    let a = b.add_node([0.0, 0.0], 4);
    let c = b.add_node([1.0, 0.0], 4);
    let lonely = b.add_node([9.0, 9.0], 4);
    b.add_link(a, c).unwrap();
    let topo = b.build().unwrap();

    assert!(topo.established_entanglements(lonely, a).unwrap().is_empty());

    let mut algo = RoutingAlgorithm::new(topo, GreedyShortestPath::default(), 1);
    for _ in 0..10 {
        let result = algo.work(&[request(lonely, a), request(c, lonely)]).unwrap();
        assert_eq!(result.aggregates(), (0, 0));
    }
}

#[test]
fn repeated_rounds_never_see_dirty_topology() {
    let (topo, n) = grid(4, 0.4, 3);
    let mut algo = RoutingAlgorithm::new(topo, GreedyShortestPath::default(), 99);
    let pairs = [
        request(n[0], n[15]),
        request(n[3], n[12]),
        request(n[5], n[10]),
        request(n[1], n[2]),
    ];

    for _ in 0..100 {
        let result = algo.work(&pairs).unwrap();
        let (not_empty, total) = result.aggregates();
        assert!(not_empty <= pairs.len());
        assert!(total >= not_empty);
        assert!(algo.topology().is_clean());
        algo.topology().check_invariants().unwrap();
    }
    assert_eq!(algo.rounds(), 100);
    assert_eq!(algo.strategy().prepared, 1);
}

#[test]
fn requests_compete_for_qubits() {
    // The middle node has a single qubit, so only one of the two requests
    // through it can be reserved.
    let mut b = Topology::builder(0.0);
    let left = b.add_node([0.0, 0.0], 2);
    let hub = b.add_node([1.0, 0.0], 1);
    let right = b.add_node([2.0, 0.0], 2);
    b.add_link(left, hub).unwrap();
    b.add_link(hub, right).unwrap();
    let topo = b.build().unwrap();

    let mut algo = RoutingAlgorithm::new(topo, GreedyShortestPath::default(), 0);
    let result = algo
        .work(&[request(left, hub), request(hub, right), request(left, right)])
        .unwrap();
    assert_eq!(result.aggregates(), (1, 1));
    assert_eq!(result.outcomes[0].established(), 1);
}

#[test]
fn same_seed_gives_same_results() {
    let run = || {
        let (topo, n) = grid(3, 0.8, 2);
        let mut algo = RoutingAlgorithm::new(topo, GreedyShortestPath::default(), 1234);
        (0..20)
            .map(|_| algo.work(&[request(n[0], n[8]), request(n[2], n[6])]).unwrap().aggregates())
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn lossy_links_sometimes_fail() {
    // exp(-2) per hop; over many rounds both outcomes must appear.
    let (topo, n) = line(2, 2.0, 1);
    let mut algo = RoutingAlgorithm::new(topo, GreedyShortestPath::default(), 8);
    let pair = [request(n[0], n[1])];
    let served: usize = (0..400).map(|_| algo.work(&pair).unwrap().count_not_empty()).sum();
    assert!(served > 0);
    assert!(served < 400);
}

#[test]
fn dirty_topology_is_rejected_before_any_phase() {
    let (topo, n) = line(3, 0.0, 2);
    let mut algo = RoutingAlgorithm::new(topo, GreedyShortestPath::default(), 0);
    let first = algo.topology().links()[0].id();
    algo.topology_mut().reserve(first).unwrap();

    let err = algo.work(&[request(n[0], n[2])]).unwrap_err();
    assert!(matches!(
        err,
        SimError::Invariant(InvariantViolation::TopologyNotClean { .. })
    ));
    assert_eq!(algo.strategy().prepared, 0);

    algo.topology_mut().clear_all_entanglements();
    assert!(algo.work(&[request(n[0], n[2])]).is_ok());
}

/// Reserves a shortest path, then redraws every trial with zero samples
/// before swapping.
#[derive(Default)]
struct RedrawsBeforeSwap(GreedyShortestPath);

impl RoutingStrategy for RedrawsBeforeSwap {
    fn name(&self) -> &str {
        "redraws-before-swap"
    }

    fn prepare(&mut self, topology: &Topology) -> SimResult<()> {
        self.0.prepare(topology)
    }

    fn reserve_paths(&mut self, topology: &mut Topology, pairs: &[RoutingRequest]) -> SimResult<()> {
        self.0.reserve_paths(topology, pairs)
    }

    fn swap_entanglements(&mut self, topology: &mut Topology, pairs: &[RoutingRequest]) -> SimResult<()> {
        topology.run_entanglement_sweep(&mut StepRng::new(0, 0));
        self.0.swap_entanglements(topology, pairs)
    }
}

#[test]
fn redrawn_trials_are_never_scored() {
    // p = exp(-50) per hop; draws near 1.0 fail every trial in the real sweep.
    let (topo, n) = line(3, 50.0, 2);
    let mut algo = RoutingAlgorithm::with_rng(topo, RedrawsBeforeSwap::default(), StepRng::new(u64::MAX, 0));

    let err = algo.work(&[request(n[0], n[2])]).unwrap_err();
    assert!(matches!(
        err,
        SimError::Invariant(InvariantViolation::TrialsAfterSweep { .. })
    ));
    assert!(algo.topology().is_clean());
    assert_eq!(algo.rounds(), 0);
}
