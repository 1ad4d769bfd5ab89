//! 1-hop neighbor and strict 2-hop databases (RFC 3626 Section 8), plus the
//! MPR and MPR-selector sets derived from them.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use crate::codec::HelloBody;
use crate::consts::{MPR_NEIGH, NOT_NEIGH, SYM_NEIGH, WILL_DEFAULT};
use crate::mpr::select_mpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborStatus {
    NotSym,
    Sym,
}

#[derive(Debug, Clone, Copy)]
pub struct NeighborTuple {
    pub status: NeighborStatus,
    pub willingness: u8,
}

#[derive(Debug, Default)]
pub struct NeighborManager {
    self_ip: Option<Ipv4Addr>,
    neighbors: BTreeMap<Ipv4Addr, NeighborTuple>,
    two_hop_set: BTreeMap<(Ipv4Addr, Ipv4Addr), f64>,
    current_mpr_set: BTreeSet<Ipv4Addr>,
    mpr_selectors: BTreeMap<Ipv4Addr, f64>,
}

impl NeighborManager {
    pub fn new(self_ip: Ipv4Addr) -> Self {
        Self {
            self_ip: Some(self_ip),
            ..Self::default()
        }
    }

    fn self_ip(&self) -> Ipv4Addr {
        self.self_ip.expect("NeighborManager constructed via new()")
    }

    pub fn update_status(&mut self, neighbor_ip: Ipv4Addr, willingness: u8, link_is_sym: bool) {
        let entry = self.neighbors.entry(neighbor_ip).or_insert(NeighborTuple {
            status: NeighborStatus::NotSym,
            willingness: WILL_DEFAULT,
        });
        entry.willingness = willingness;
        entry.status = if link_is_sym {
            NeighborStatus::Sym
        } else {
            NeighborStatus::NotSym
        };
    }

    pub fn neighbor(&self, ip: Ipv4Addr) -> Option<&NeighborTuple> {
        self.neighbors.get(&ip)
    }

    pub fn process_2hop(&mut self, sender_ip: Ipv4Addr, hello: &HelloBody, validity: f64, now: f64) {
        let self_ip = self.self_ip();
        for group in &hello.groups {
            let neighbor_type = (group.link_code >> 2) & 0x03;
            match neighbor_type {
                t if t == SYM_NEIGH || t == MPR_NEIGH => {
                    for &two_hop_ip in &group.addrs {
                        if two_hop_ip == self_ip {
                            continue;
                        }
                        self.two_hop_set
                            .insert((sender_ip, two_hop_ip), now + validity);
                    }
                }
                t if t == NOT_NEIGH => {
                    for &two_hop_ip in &group.addrs {
                        self.two_hop_set.remove(&(sender_ip, two_hop_ip));
                    }
                }
                _ => {}
            }
        }
    }

    pub fn process_mpr_selector(
        &mut self,
        sender_ip: Ipv4Addr,
        hello: &HelloBody,
        validity: f64,
        now: f64,
    ) {
        let self_ip = self.self_ip();
        let selected = hello.groups.iter().any(|group| {
            let neighbor_type = (group.link_code >> 2) & 0x03;
            neighbor_type == MPR_NEIGH && group.addrs.contains(&self_ip)
        });
        if selected {
            self.mpr_selectors.insert(sender_ip, now + validity);
        }
    }

    pub fn symmetric_neighbors(&self) -> BTreeSet<Ipv4Addr> {
        self.neighbors
            .iter()
            .filter(|(_, tuple)| tuple.status == NeighborStatus::Sym)
            .map(|(&ip, _)| ip)
            .collect()
    }

    pub fn two_hop_edges(&self) -> impl Iterator<Item = (Ipv4Addr, Ipv4Addr)> + '_ {
        self.two_hop_set.keys().copied()
    }

    pub fn strict_2hop(&self) -> BTreeSet<Ipv4Addr> {
        let self_ip = self.self_ip();
        let sym_neighbors = self.symmetric_neighbors();
        let mut strict = BTreeSet::new();
        for &(neighbor_ip, two_hop_ip) in self.two_hop_set.keys() {
            if sym_neighbors.contains(&neighbor_ip)
                && two_hop_ip != self_ip
                && !sym_neighbors.contains(&two_hop_ip)
            {
                strict.insert(two_hop_ip);
            }
        }
        strict
    }

    pub fn reachability_map(&self) -> BTreeMap<Ipv4Addr, BTreeSet<Ipv4Addr>> {
        let sym_neighbors = self.symmetric_neighbors();
        let strict_2hop = self.strict_2hop();
        let mut reachability: BTreeMap<Ipv4Addr, BTreeSet<Ipv4Addr>> =
            sym_neighbors.iter().map(|&ip| (ip, BTreeSet::new())).collect();
        for &(neighbor_ip, two_hop_ip) in self.two_hop_set.keys() {
            if let Some(covered) = reachability.get_mut(&neighbor_ip) {
                if strict_2hop.contains(&two_hop_ip) {
                    covered.insert(two_hop_ip);
                }
            }
        }
        reachability
    }

    /// Returns the new MPR set along with whether it changed from before.
    pub fn recalculate_mpr(&mut self) -> (BTreeSet<Ipv4Addr>, bool) {
        let candidates: BTreeMap<Ipv4Addr, u8> = self
            .neighbors
            .iter()
            .filter(|(_, tuple)| tuple.status == NeighborStatus::Sym)
            .map(|(&ip, tuple)| (ip, tuple.willingness))
            .collect();
        let coverage = self.reachability_map();

        let new_mpr_set = select_mpr(&candidates, &coverage);
        let changed = new_mpr_set != self.current_mpr_set;
        self.current_mpr_set = new_mpr_set.clone();
        (new_mpr_set, changed)
    }

    pub fn mpr_set(&self) -> &BTreeSet<Ipv4Addr> {
        &self.current_mpr_set
    }

    pub fn mpr_selectors(&self) -> Vec<Ipv4Addr> {
        self.mpr_selectors.keys().copied().collect()
    }

    pub fn is_mpr_selector(&self, ip: Ipv4Addr) -> bool {
        self.mpr_selectors.contains_key(&ip)
    }

    pub fn cleanup(&mut self, now: f64) {
        self.two_hop_set.retain(|_, &mut expiry| expiry >= now);
        self.mpr_selectors.retain(|_, &mut expiry| expiry >= now);
    }
}
