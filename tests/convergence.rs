//! End-to-end convergence over the public model layer: four nodes in a
//! line (A-B-C-D) exchange HELLOs to form symmetric links and an MPR set,
//! then B and C flood TC messages so A ends up with a route to D.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use olsrd::codec::{make_link_code, HelloBody, LinkGroup};
use olsrd::consts::{MPR_NEIGH, SYM_LINK, SYM_NEIGH, WILL_DEFAULT};
use olsrd::model::{recalculate_routing_table, LinkSet, NeighborManager, TopologyManager};

fn ip(n: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, n)
}

fn sym_hello_naming(peer: Ipv4Addr) -> HelloBody {
    HelloBody {
        htime_seconds: 2.0,
        willingness: WILL_DEFAULT,
        groups: vec![LinkGroup {
            link_code: make_link_code(SYM_LINK, SYM_NEIGH).unwrap(),
            addrs: vec![peer],
        }],
    }
}

fn mpr_hello_naming(peer: Ipv4Addr) -> HelloBody {
    HelloBody {
        htime_seconds: 2.0,
        willingness: WILL_DEFAULT,
        groups: vec![LinkGroup {
            link_code: make_link_code(SYM_LINK, MPR_NEIGH).unwrap(),
            addrs: vec![peer],
        }],
    }
}

/// A single node's view of the world, driven directly rather than through
/// a socket: the pieces that `EngineState` wires together internally.
struct Node {
    self_ip: Ipv4Addr,
    link_set: LinkSet,
    neighbor_manager: NeighborManager,
    topology_manager: TopologyManager,
}

impl Node {
    fn new(self_ip: Ipv4Addr) -> Self {
        Self {
            self_ip,
            link_set: LinkSet::new(self_ip),
            neighbor_manager: NeighborManager::new(self_ip),
            topology_manager: TopologyManager::default(),
        }
    }

    fn receive_hello(&mut self, sender_ip: Ipv4Addr, hello: &HelloBody, now: f64) {
        self.link_set.process_hello(sender_ip, hello, 6.0, now);
        let is_sym = self.link_set.is_symmetric(sender_ip, now);
        self.neighbor_manager
            .update_status(sender_ip, hello.willingness, is_sym);
        self.neighbor_manager.process_2hop(sender_ip, hello, 6.0, now);
        self.neighbor_manager
            .process_mpr_selector(sender_ip, hello, 6.0, now);
    }

    fn receive_tc(
        &mut self,
        last_addr: Ipv4Addr,
        ansn: u16,
        advertised: &[Ipv4Addr],
        validity: f64,
        now: f64,
    ) {
        self.topology_manager
            .process_tc(last_addr, ansn, advertised, validity, now);
    }

    fn route_to(&mut self, dest: Ipv4Addr) -> Option<Ipv4Addr> {
        let sym = self.neighbor_manager.symmetric_neighbors();
        let table = recalculate_routing_table(
            self.self_ip,
            &sym,
            self.neighbor_manager.two_hop_edges(),
            self.topology_manager.edges(),
        );
        table.route_to(dest).map(|entry| entry.next_hop)
    }
}

#[test]
fn linear_chain_converges_to_a_route_from_a_to_d() {
    let (a, b, c, d) = (ip(1), ip(2), ip(3), ip(4));
    let mut node_a = Node::new(a);
    let mut node_b = Node::new(b);
    let mut node_c = Node::new(c);

    // A <-> B, B <-> C, C <-> D: mutual HELLO exchange forms symmetric
    // links in both directions (D's own state isn't modeled, only what
    // B/C advertise about it).
    node_a.receive_hello(b, &sym_hello_naming(a), 0.0);
    node_b.receive_hello(a, &sym_hello_naming(b), 0.0);
    node_b.receive_hello(c, &sym_hello_naming(b), 0.0);
    node_c.receive_hello(b, &sym_hello_naming(c), 0.0);
    node_c.receive_hello(d, &sym_hello_naming(c), 0.0);

    assert!(node_a.link_set.is_symmetric(b, 0.0));
    assert!(node_b.link_set.is_symmetric(a, 0.0));
    assert!(node_b.link_set.is_symmetric(c, 0.0));
    assert!(node_c.link_set.is_symmetric(b, 0.0));

    // A's 2-hop set picks up C via B's HELLO naming C as symmetric.
    let hello_b_with_c = HelloBody {
        htime_seconds: 2.0,
        willingness: WILL_DEFAULT,
        groups: vec![LinkGroup {
            link_code: make_link_code(SYM_LINK, SYM_NEIGH).unwrap(),
            addrs: vec![a, c],
        }],
    };
    node_a.receive_hello(b, &hello_b_with_c, 1.0);
    assert_eq!(node_a.neighbor_manager.strict_2hop(), BTreeSet::from([c]));

    // A selects B as its sole MPR (only path to the 2-hop set), B and C
    // each select their own MPRs and name A/D respectively as selecting
    // them, forming the MPR-selector relationship flooding relies on.
    let (mpr_set, _) = node_a.neighbor_manager.recalculate_mpr();
    assert_eq!(mpr_set, BTreeSet::from([b]));

    node_b.receive_hello(a, &mpr_hello_naming(b), 2.0);
    node_c.receive_hello(b, &mpr_hello_naming(c), 2.0);

    // B and C flood TC messages advertising who selected them as MPR,
    // each hop accumulating the last-hop/destination edges for A.
    node_a.receive_tc(b, 1, &[a, c], 15.0, 3.0);
    node_a.receive_tc(c, 1, &[b, d], 15.0, 3.0);

    let next_hop = node_a.route_to(d).expect("A should have a route to D");
    assert_eq!(next_hop, b);
}

#[test]
fn stale_tc_does_not_override_a_fresher_topology_view() {
    let (a, b, d) = (ip(1), ip(2), ip(4));
    let mut node_a = Node::new(a);
    node_a.receive_hello(b, &sym_hello_naming(a), 0.0);

    node_a.receive_tc(b, 5, &[d], 15.0, 0.0);
    assert_eq!(node_a.route_to(d), Some(b));

    // An older ANSN arriving after (e.g. reordered on the wire) must not
    // erase the destination the fresher TC already installed.
    node_a.receive_tc(b, 3, &[], 15.0, 1.0);
    assert_eq!(node_a.route_to(d), Some(b));
}
