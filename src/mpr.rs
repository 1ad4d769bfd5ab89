//! Multi-Point Relay selection (RFC 3626 Section 8.3.1).
//!
//! Greedy set-cover over the strict 2-hop neighborhood: every WILL_ALWAYS
//! candidate is forced in, every 2-hop node with a single covering candidate
//! forces that candidate in, and the remainder is covered by repeatedly
//! picking the candidate that covers the most still-uncovered nodes, broken
//! by willingness and then by initial degree.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use crate::consts::{WILL_ALWAYS, WILL_NEVER};

/// `candidates` maps each symmetric 1-hop neighbor to its willingness.
/// `coverage` maps each of those neighbors to the set of strict 2-hop nodes
/// it alone provides a path to.
pub fn select_mpr(
    candidates: &BTreeMap<Ipv4Addr, u8>,
    coverage: &BTreeMap<Ipv4Addr, BTreeSet<Ipv4Addr>>,
) -> BTreeSet<Ipv4Addr> {
    let strict_2hop_set: BTreeSet<Ipv4Addr> = coverage.values().flatten().copied().collect();

    let mut mpr_set: BTreeSet<Ipv4Addr> = candidates
        .iter()
        .filter(|(_, &willingness)| willingness == WILL_ALWAYS)
        .map(|(&ip, _)| ip)
        .collect();

    if strict_2hop_set.is_empty() {
        return mpr_set;
    }

    // Initial degree: how many strict 2-hop nodes each candidate reaches,
    // snapshotted before any selection, used only as a tie-break later.
    let degree_map: BTreeMap<Ipv4Addr, usize> = candidates
        .keys()
        .map(|&ip| (ip, coverage.get(&ip).map_or(0, BTreeSet::len)))
        .collect();

    let mut covered: BTreeSet<Ipv4Addr> = mpr_set
        .iter()
        .flat_map(|ip| coverage.get(ip).into_iter().flatten().copied())
        .collect();

    // Unique-provider pass: any 2-hop node reachable through exactly one
    // candidate forces that candidate into the MPR set.
    let mut provider_count: BTreeMap<Ipv4Addr, Vec<Ipv4Addr>> = BTreeMap::new();
    for (&candidate_ip, covered_set) in coverage {
        for &two_hop_ip in covered_set {
            provider_count.entry(two_hop_ip).or_default().push(candidate_ip);
        }
    }
    for (two_hop_ip, providers) in &provider_count {
        if covered.contains(two_hop_ip) {
            continue;
        }
        if let [only_provider] = providers.as_slice() {
            if mpr_set.insert(*only_provider) {
                if let Some(newly_covered) = coverage.get(only_provider) {
                    covered.extend(newly_covered);
                }
            }
        }
    }

    // Greedy set-cover over whatever remains uncovered. Ties on
    // (gain, willingness, degree) keep the first-encountered candidate
    // (lowest IP, since `candidates` iterates in address order), matching
    // the reference implementation's stable first-wins comparison.
    while !strict_2hop_set.is_subset(&covered) {
        let mut best: Option<(Ipv4Addr, (usize, u8, usize))> = None;
        for &ip in candidates.keys().filter(|ip| !mpr_set.contains(*ip)) {
            let gain = coverage
                .get(&ip)
                .map_or(0, |set| set.difference(&covered).count());
            let willingness = candidates.get(&ip).copied().unwrap_or(0);
            let degree = degree_map.get(&ip).copied().unwrap_or(0);
            let key = (gain, willingness, degree);
            let replace = match &best {
                Some((_, best_key)) => key > *best_key,
                None => true,
            };
            if replace {
                best = Some((ip, key));
            }
        }
        let best = best.map(|(ip, _)| ip);

        match best {
            Some(ip) => {
                let gain = coverage
                    .get(&ip)
                    .map_or(0, |set| set.difference(&covered).count());
                if gain == 0 {
                    // No remaining candidate covers anything new; the
                    // uncovered nodes are unreachable through any 1-hop
                    // neighbor and can never be covered.
                    break;
                }
                mpr_set.insert(ip);
                if let Some(newly_covered) = coverage.get(&ip) {
                    covered.extend(newly_covered);
                }
            }
            None => break,
        }
    }

    mpr_set
        .into_iter()
        .filter(|ip| candidates.get(ip).copied().unwrap_or(0) != WILL_NEVER)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{WILL_DEFAULT, WILL_HIGH};

    fn ip(n: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, n)
    }

    #[test]
    fn empty_two_hop_set_yields_only_will_always() {
        let candidates = BTreeMap::from([(ip(2), WILL_ALWAYS), (ip(3), WILL_DEFAULT)]);
        let coverage = BTreeMap::from([(ip(2), BTreeSet::new()), (ip(3), BTreeSet::new())]);
        let mpr = select_mpr(&candidates, &coverage);
        assert_eq!(mpr, BTreeSet::from([ip(2)]));
    }

    #[test]
    fn will_never_is_excluded_even_if_it_would_cover() {
        let candidates = BTreeMap::from([(ip(2), WILL_NEVER)]);
        let coverage = BTreeMap::from([(ip(2), BTreeSet::from([ip(10)]))]);
        let mpr = select_mpr(&candidates, &coverage);
        assert!(mpr.is_empty());
    }

    #[test]
    fn unique_provider_is_forced_in() {
        let candidates = BTreeMap::from([
            (ip(2), WILL_DEFAULT),
            (ip(3), WILL_DEFAULT),
        ]);
        // ip(2) is the only path to ip(10); ip(3) covers nothing unique.
        let coverage = BTreeMap::from([
            (ip(2), BTreeSet::from([ip(10)])),
            (ip(3), BTreeSet::new()),
        ]);
        let mpr = select_mpr(&candidates, &coverage);
        assert!(mpr.contains(&ip(2)));
        assert!(!mpr.contains(&ip(3)));
    }

    #[test]
    fn greedy_pass_picks_maximum_coverage_first() {
        let candidates = BTreeMap::from([
            (ip(2), WILL_DEFAULT),
            (ip(3), WILL_DEFAULT),
            (ip(4), WILL_DEFAULT),
        ]);
        // ip(2) alone covers everything; ip(3)/ip(4) only overlap with it.
        let coverage = BTreeMap::from([
            (ip(2), BTreeSet::from([ip(10), ip(11), ip(12)])),
            (ip(3), BTreeSet::from([ip(10)])),
            (ip(4), BTreeSet::from([ip(11)])),
        ]);
        let mpr = select_mpr(&candidates, &coverage);
        assert_eq!(mpr, BTreeSet::from([ip(2)]));
    }

    #[test]
    fn willingness_breaks_ties_in_greedy_pass() {
        let candidates = BTreeMap::from([
            (ip(2), WILL_DEFAULT),
            (ip(3), WILL_HIGH),
        ]);
        // both cover exactly the same single node, so willingness decides.
        let coverage = BTreeMap::from([
            (ip(2), BTreeSet::from([ip(10)])),
            (ip(3), BTreeSet::from([ip(10)])),
        ]);
        let mpr = select_mpr(&candidates, &coverage);
        assert!(mpr.contains(&ip(3)));
    }
}
