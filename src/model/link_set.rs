//! 1-hop link state (RFC 3626 Section 7): tracks whether each neighbor has
//! recently heard from us, giving link symmetry.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::codec::{decode_link_code, make_link_code, HelloBody, LinkGroup};
use crate::consts::{ASYM_LINK, LOST_LINK, MPR_NEIGH, SYM_LINK, SYM_NEIGH};

#[derive(Debug, Clone, Copy)]
pub struct LinkTuple {
    pub l_asym_time: f64,
    pub l_sym_time: f64,
    pub l_time: f64,
}

impl LinkTuple {
    pub fn is_symmetric(&self, now: f64) -> bool {
        now < self.l_sym_time
    }

    pub fn is_asymmetric(&self, now: f64) -> bool {
        now < self.l_asym_time && !self.is_symmetric(now)
    }
}

#[derive(Debug)]
pub struct LinkSet {
    self_ip: Ipv4Addr,
    links: BTreeMap<Ipv4Addr, LinkTuple>,
}

impl LinkSet {
    pub fn new(self_ip: Ipv4Addr) -> Self {
        Self {
            self_ip,
            links: BTreeMap::new(),
        }
    }

    pub fn get(&self, neighbor_ip: Ipv4Addr) -> Option<&LinkTuple> {
        self.links.get(&neighbor_ip)
    }

    pub fn is_symmetric(&self, neighbor_ip: Ipv4Addr, now: f64) -> bool {
        self.links
            .get(&neighbor_ip)
            .is_some_and(|link| link.is_symmetric(now))
    }

    pub fn neighbor_ips(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.links.keys().copied()
    }

    /// Apply an incoming HELLO from `sender_ip`, per RFC 3626 Section 7.1.1.
    pub fn process_hello(&mut self, sender_ip: Ipv4Addr, hello: &HelloBody, validity: f64, now: f64) {
        let link = self.links.entry(sender_ip).or_insert(LinkTuple {
            l_asym_time: now - 1.0,
            l_sym_time: now - 1.0,
            l_time: now - 1.0,
        });

        link.l_asym_time = now + validity;

        for group in &hello.groups {
            if group.addrs.contains(&self.self_ip) {
                let (link_type, _) = decode_link_code(group.link_code);
                match link_type {
                    LOST_LINK => link.l_sym_time = now - 1.0,
                    ASYM_LINK | SYM_LINK => link.l_sym_time = now + validity,
                    _ => {}
                }
                break;
            }
        }

        link.l_time = link.l_sym_time.max(link.l_asym_time);
    }

    pub fn cleanup(&mut self, now: f64) {
        self.links.retain(|_, link| link.l_time >= now);
    }

    /// Build the neighbor groups for an outgoing HELLO: MPR, then plain
    /// symmetric, then asymmetric, omitting empty groups.
    pub fn build_hello_groups(&self, mpr_set: &std::collections::BTreeSet<Ipv4Addr>, now: f64) -> Vec<LinkGroup> {
        let mut mpr_neighbors = Vec::new();
        let mut sym_neighbors = Vec::new();
        let mut asym_neighbors = Vec::new();

        for (&ip, link) in &self.links {
            if link.l_time < now {
                continue;
            }
            if link.is_symmetric(now) {
                if mpr_set.contains(&ip) {
                    mpr_neighbors.push(ip);
                } else {
                    sym_neighbors.push(ip);
                }
            } else if link.is_asymmetric(now) {
                asym_neighbors.push(ip);
            }
        }

        let mut groups = Vec::new();
        if !mpr_neighbors.is_empty() {
            groups.push(LinkGroup {
                link_code: make_link_code(SYM_LINK, MPR_NEIGH).expect("valid link code"),
                addrs: mpr_neighbors,
            });
        }
        if !sym_neighbors.is_empty() {
            groups.push(LinkGroup {
                link_code: make_link_code(SYM_LINK, SYM_NEIGH).expect("valid link code"),
                addrs: sym_neighbors,
            });
        }
        if !asym_neighbors.is_empty() {
            groups.push(LinkGroup {
                link_code: make_link_code(ASYM_LINK, crate::consts::NOT_NEIGH)
                    .expect("valid link code"),
                addrs: asym_neighbors,
            });
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn ip(n: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, n)
    }

    #[test]
    fn first_hello_creates_asymmetric_link() {
        let mut set = LinkSet::new(ip(1));
        let hello = HelloBody {
            htime_seconds: 2.0,
            willingness: 3,
            groups: vec![],
        };
        set.process_hello(ip(2), &hello, 6.0, 0.0);
        assert!(!set.is_symmetric(ip(2), 0.0));
        assert!(set.get(ip(2)).unwrap().is_asymmetric(0.0));
    }

    #[test]
    fn hello_naming_us_as_sym_upgrades_link() {
        let mut set = LinkSet::new(ip(1));
        let hello = HelloBody {
            htime_seconds: 2.0,
            willingness: 3,
            groups: vec![LinkGroup {
                link_code: make_link_code(SYM_LINK, SYM_NEIGH).unwrap(),
                addrs: vec![ip(1)],
            }],
        };
        set.process_hello(ip(2), &hello, 6.0, 0.0);
        assert!(set.is_symmetric(ip(2), 0.0));
    }

    #[test]
    fn lost_link_demotes_back_to_asymmetric() {
        let mut set = LinkSet::new(ip(1));
        let sym_hello = HelloBody {
            htime_seconds: 2.0,
            willingness: 3,
            groups: vec![LinkGroup {
                link_code: make_link_code(SYM_LINK, SYM_NEIGH).unwrap(),
                addrs: vec![ip(1)],
            }],
        };
        set.process_hello(ip(2), &sym_hello, 6.0, 0.0);
        assert!(set.is_symmetric(ip(2), 0.0));

        let lost_hello = HelloBody {
            htime_seconds: 2.0,
            willingness: 3,
            groups: vec![LinkGroup {
                link_code: make_link_code(LOST_LINK, SYM_NEIGH).unwrap(),
                addrs: vec![ip(1)],
            }],
        };
        set.process_hello(ip(2), &lost_hello, 6.0, 1.0);
        assert!(!set.is_symmetric(ip(2), 1.0));
    }

    #[test]
    fn cleanup_drops_expired_links() {
        let mut set = LinkSet::new(ip(1));
        let hello = HelloBody {
            htime_seconds: 2.0,
            willingness: 3,
            groups: vec![],
        };
        set.process_hello(ip(2), &hello, 6.0, 0.0);
        set.cleanup(10.0);
        assert!(set.get(ip(2)).is_none());
    }

    #[test]
    fn build_hello_groups_separates_mpr_sym_asym() {
        let mut set = LinkSet::new(ip(1));
        let sym_hello = HelloBody {
            htime_seconds: 2.0,
            willingness: 3,
            groups: vec![LinkGroup {
                link_code: make_link_code(SYM_LINK, SYM_NEIGH).unwrap(),
                addrs: vec![ip(1)],
            }],
        };
        set.process_hello(ip(2), &sym_hello, 6.0, 0.0);
        set.process_hello(ip(3), &sym_hello, 6.0, 0.0);
        set.process_hello(ip(4), &HelloBody { htime_seconds: 2.0, willingness: 3, groups: vec![] }, 6.0, 0.0);

        let mut mpr_set = BTreeSet::new();
        mpr_set.insert(ip(2));
        let groups = set.build_hello_groups(&mpr_set, 0.0);
        assert_eq!(groups.len(), 3);
        assert!(groups[0].addrs.contains(&ip(2)));
        assert!(groups[1].addrs.contains(&ip(3)));
        assert!(groups[2].addrs.contains(&ip(4)));
    }
}
