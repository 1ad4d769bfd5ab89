//! Topology set (RFC 3626 Section 10): the last-hop/destination pairs learned
//! from TC messages, used to build the multi-hop routing graph.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy)]
struct TopologyTuple {
    ansn: u16,
    expiration_time: f64,
}

/// True if `new_ansn` is more recent than `old_ansn` under 16-bit wraparound
/// (RFC 3626 Section 3.4, the same comparison used for message sequence
/// numbers).
fn ansn_is_newer(new_ansn: u16, old_ansn: u16) -> bool {
    let diff = new_ansn.wrapping_sub(old_ansn);
    diff != 0 && diff < 0x8000
}

#[derive(Debug, Default)]
pub struct TopologyManager {
    // keyed (last_addr, dest_addr): the last hop towards dest_addr, as
    // advertised by last_addr's TC message.
    entries: BTreeMap<(Ipv4Addr, Ipv4Addr), TopologyTuple>,
}

impl TopologyManager {
    /// Apply a TC message: `advertised_neighbors` are destinations reachable
    /// one hop beyond `last_addr` (the TC originator). An `ansn` no newer
    /// than what's already recorded for a given destination is ignored for
    /// that destination; an `ansn` strictly newer replaces every prior tuple
    /// for `last_addr` before inserting the fresh set. An `ansn` equal to
    /// what's on file simply refreshes the expiration time of the matching
    /// tuples and inserts any that are missing, rather than deleting stale
    /// destinations the sender dropped — a tie carries no information about
    /// removal.
    pub fn process_tc(
        &mut self,
        last_addr: Ipv4Addr,
        ansn: u16,
        advertised_neighbors: &[Ipv4Addr],
        validity: f64,
        now: f64,
    ) {
        let existing_ansn = self
            .entries
            .iter()
            .find(|((last, _), _)| *last == last_addr)
            .map(|(_, tuple)| tuple.ansn);

        if let Some(existing_ansn) = existing_ansn {
            if ansn_is_newer(ansn, existing_ansn) {
                self.entries.retain(|(last, _), _| *last != last_addr);
            } else if ansn != existing_ansn {
                // older or equal-but-different (can't happen with a u16
                // wrap-aware comparison unless ansn == existing_ansn);
                // stale TC, drop it.
                return;
            }
        }

        for &dest_addr in advertised_neighbors {
            self.entries.insert(
                (last_addr, dest_addr),
                TopologyTuple {
                    ansn,
                    expiration_time: now + validity,
                },
            );
        }
    }

    pub fn cleanup(&mut self, now: f64) {
        self.entries.retain(|_, tuple| tuple.expiration_time >= now);
    }

    /// Every `(last_addr, dest_addr)` edge currently valid.
    pub fn edges(&self) -> impl Iterator<Item = (Ipv4Addr, Ipv4Addr)> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(n: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, n)
    }

    #[test]
    fn newer_ansn_replaces_prior_destination_set() {
        let mut tm = TopologyManager::default();
        tm.process_tc(ip(1), 1, &[ip(2), ip(3)], 15.0, 0.0);
        tm.process_tc(ip(1), 2, &[ip(4)], 15.0, 1.0);
        let edges: Vec<_> = tm.edges().collect();
        assert_eq!(edges, vec![(ip(1), ip(4))]);
    }

    #[test]
    fn older_ansn_is_ignored() {
        let mut tm = TopologyManager::default();
        tm.process_tc(ip(1), 5, &[ip(2)], 15.0, 0.0);
        tm.process_tc(ip(1), 3, &[ip(9)], 15.0, 1.0);
        let edges: Vec<_> = tm.edges().collect();
        assert_eq!(edges, vec![(ip(1), ip(2))]);
    }

    #[test]
    fn equal_ansn_refreshes_and_adds_without_deleting() {
        let mut tm = TopologyManager::default();
        tm.process_tc(ip(1), 5, &[ip(2)], 15.0, 0.0);
        tm.process_tc(ip(1), 5, &[ip(3)], 15.0, 1.0);
        let edges: BTreeMap<_, _> = tm.edges().map(|e| (e, ())).collect();
        assert!(edges.contains_key(&(ip(1), ip(2))));
        assert!(edges.contains_key(&(ip(1), ip(3))));
    }

    #[test]
    fn ansn_wraps_around_16_bits() {
        let mut tm = TopologyManager::default();
        tm.process_tc(ip(1), 65534, &[ip(2)], 15.0, 0.0);
        tm.process_tc(ip(1), 2, &[ip(9)], 15.0, 1.0);
        let edges: Vec<_> = tm.edges().collect();
        assert_eq!(edges, vec![(ip(1), ip(9))]);
    }

    #[test]
    fn cleanup_drops_expired_edges() {
        let mut tm = TopologyManager::default();
        tm.process_tc(ip(1), 1, &[ip(2)], 15.0, 0.0);
        tm.cleanup(20.0);
        assert_eq!(tm.edges().count(), 0);
    }
}
