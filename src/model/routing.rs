//! Routing table computation (RFC 3626 Section 10): build a directed graph
//! from the link, neighbor, and topology databases, then run Dijkstra from
//! this node to get a shortest-hop-count route to every known destination.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub next_hop: Ipv4Addr,
    pub distance: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: BTreeMap<Ipv4Addr, RouteEntry>,
}

impl RoutingTable {
    pub fn route_to(&self, dest: Ipv4Addr) -> Option<&RouteEntry> {
        self.routes.get(&dest)
    }

    pub fn destinations(&self) -> impl Iterator<Item = (&Ipv4Addr, &RouteEntry)> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Assemble the directed routing graph: self -> symmetric 1-hop neighbors,
/// 1-hop -> strict 2-hop (only through symmetric neighbors), and every
/// last-hop -> destination edge reported by topology control.
fn build_graph(
    self_ip: Ipv4Addr,
    sym_neighbors: &BTreeSet<Ipv4Addr>,
    two_hop_edges: impl Iterator<Item = (Ipv4Addr, Ipv4Addr)>,
    tc_edges: impl Iterator<Item = (Ipv4Addr, Ipv4Addr)>,
) -> BTreeMap<Ipv4Addr, BTreeSet<Ipv4Addr>> {
    let mut graph: BTreeMap<Ipv4Addr, BTreeSet<Ipv4Addr>> = BTreeMap::new();

    for &neighbor in sym_neighbors {
        graph.entry(self_ip).or_default().insert(neighbor);
    }
    for (neighbor, two_hop) in two_hop_edges {
        if sym_neighbors.contains(&neighbor) {
            graph.entry(neighbor).or_default().insert(two_hop);
        }
    }
    for (last, dest) in tc_edges {
        graph.entry(last).or_default().insert(dest);
    }

    graph
}

/// Manual Dijkstra over a directed, unweighted graph: an O(V^2) linear scan
/// for the next minimum-distance node, no binary heap. Returns the distance
/// map and a predecessor map used to walk back to the first hop.
fn dijkstra(
    graph: &BTreeMap<Ipv4Addr, BTreeSet<Ipv4Addr>>,
    source: Ipv4Addr,
) -> (BTreeMap<Ipv4Addr, u32>, BTreeMap<Ipv4Addr, Ipv4Addr>) {
    let mut distance: BTreeMap<Ipv4Addr, u32> = BTreeMap::new();
    let mut predecessor: BTreeMap<Ipv4Addr, Ipv4Addr> = BTreeMap::new();
    let mut visited: BTreeSet<Ipv4Addr> = BTreeSet::new();

    distance.insert(source, 0);

    loop {
        let current = distance
            .iter()
            .filter(|(node, _)| !visited.contains(*node))
            .min_by_key(|(_, &dist)| dist)
            .map(|(&node, _)| node);

        let Some(current) = current else { break };
        visited.insert(current);

        if let Some(neighbors) = graph.get(&current) {
            let current_dist = distance[&current];
            for &neighbor in neighbors {
                let candidate = current_dist + 1;
                let better = match distance.get(&neighbor) {
                    Some(&d) => candidate < d,
                    None => true,
                };
                if better {
                    distance.insert(neighbor, candidate);
                    predecessor.insert(neighbor, current);
                }
            }
        }
    }

    (distance, predecessor)
}

/// Walk the predecessor chain from `dest` back towards `source`, returning
/// the neighbor of `source` that starts the shortest path.
fn first_hop(
    predecessor: &BTreeMap<Ipv4Addr, Ipv4Addr>,
    source: Ipv4Addr,
    dest: Ipv4Addr,
) -> Option<Ipv4Addr> {
    let mut node = dest;
    let mut prev = *predecessor.get(&node)?;
    while prev != source {
        node = prev;
        prev = *predecessor.get(&node)?;
    }
    Some(node)
}

pub fn recalculate_routing_table(
    self_ip: Ipv4Addr,
    sym_neighbors: &BTreeSet<Ipv4Addr>,
    two_hop_edges: impl Iterator<Item = (Ipv4Addr, Ipv4Addr)>,
    tc_edges: impl Iterator<Item = (Ipv4Addr, Ipv4Addr)>,
) -> RoutingTable {
    let graph = build_graph(self_ip, sym_neighbors, two_hop_edges, tc_edges);
    let (distance, predecessor) = dijkstra(&graph, self_ip);

    let mut routes = BTreeMap::new();
    for (&dest, &dist) in &distance {
        if dest == self_ip || dist == 0 {
            continue;
        }
        if let Some(next_hop) = first_hop(&predecessor, self_ip, dest) {
            routes.insert(
                dest,
                RouteEntry {
                    next_hop,
                    distance: dist,
                },
            );
        }
    }

    RoutingTable { routes }
}
