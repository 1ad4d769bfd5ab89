//! The OLSR node engine: one coarse-grained mutex guarding the four
//! databases, driven by a receive loop plus HELLO/TC/cleanup timers, each
//! running on its own OS thread (RFC 3626 Section 1).

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;
use tracing::{info, warn};

use crate::codec::{
    build_hello_message, build_tc_message, encode_packet, parse_packet_messages, rewrite_ttl_hop,
    HelloBody, MessageBody, TcBody,
};
use crate::consts::{NEIGHB_HOLD_TIME, TOP_HOLD_TIME};
use crate::model::{
    recalculate_routing_table, DuplicateSet, LinkSet, NeighborManager, RoutingTable,
    TopologyManager,
};
use crate::runtime::config::DaemonConfig;
use crate::runtime::forwarding::{NullForwardingApplier, RouteInstaller};
use crate::runtime::mgmt::{
    DaemonSnapshot, MgmtServer, NeighborSnapshot, RouteSnapshot, TopologySnapshot,
};
use crate::runtime::transport::UdpTransport;

const BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 255);

/// The four OLSR databases and the sequence-number counters derived from
/// them, guarded by a single mutex in [`Engine`].
struct EngineState {
    self_ip: Ipv4Addr,
    willingness: u8,
    /// Static willingness overrides for specific neighbors, taking
    /// precedence over whatever willingness their own HELLOs advertise.
    neighbor_willingness: BTreeMap<Ipv4Addr, u8>,
    link_set: LinkSet,
    neighbor_manager: NeighborManager,
    topology_manager: TopologyManager,
    duplicate_set: DuplicateSet,
    routing_table: RoutingTable,
    msg_seq: u16,
    pkt_seq: u16,
    ansn: u16,
    last_advertised: Vec<Ipv4Addr>,
    route_installer: Box<dyn RouteInstaller>,
}

impl EngineState {
    fn new(self_ip: Ipv4Addr, willingness: u8) -> Self {
        Self::with_neighbor_willingness(self_ip, willingness, BTreeMap::new())
    }

    fn with_neighbor_willingness(
        self_ip: Ipv4Addr,
        willingness: u8,
        neighbor_willingness: BTreeMap<Ipv4Addr, u8>,
    ) -> Self {
        Self {
            self_ip,
            willingness,
            neighbor_willingness,
            link_set: LinkSet::new(self_ip),
            neighbor_manager: NeighborManager::new(self_ip),
            topology_manager: TopologyManager::default(),
            duplicate_set: DuplicateSet::default(),
            routing_table: RoutingTable::default(),
            msg_seq: 0,
            pkt_seq: 0,
            ansn: 0,
            last_advertised: Vec::new(),
            route_installer: Box::new(NullForwardingApplier),
        }
    }

    fn next_msg_seq(&mut self) -> u16 {
        self.msg_seq = next_seq(self.msg_seq);
        self.msg_seq
    }

    fn next_pkt_seq(&mut self) -> u16 {
        self.pkt_seq = next_seq(self.pkt_seq);
        self.pkt_seq
    }

    fn recompute_routes(&mut self) {
        self.neighbor_manager.recalculate_mpr();
        let sym = self.neighbor_manager.symmetric_neighbors();
        self.routing_table = recalculate_routing_table(
            self.self_ip,
            &sym,
            self.neighbor_manager.two_hop_edges(),
            self.topology_manager.edges(),
        );
        if let Err(err) = self.route_installer.install(&self.routing_table) {
            warn!("failed to install routing table: {err}");
        }
    }

    fn process_hello(&mut self, sender_ip: Ipv4Addr, hello: &HelloBody, now: f64) {
        if sender_ip == self.self_ip {
            return;
        }
        self.link_set.process_hello(sender_ip, hello, NEIGHB_HOLD_TIME, now);
        let is_sym = self.link_set.is_symmetric(sender_ip, now);
        let willingness = self
            .neighbor_willingness
            .get(&sender_ip)
            .copied()
            .unwrap_or(hello.willingness);
        self.neighbor_manager
            .update_status(sender_ip, willingness, is_sym);
        self.neighbor_manager.process_2hop(sender_ip, hello, NEIGHB_HOLD_TIME, now);
        self.neighbor_manager
            .process_mpr_selector(sender_ip, hello, NEIGHB_HOLD_TIME, now);
        self.recompute_routes();
    }

    fn process_tc(&mut self, originator: Ipv4Addr, tc: &TcBody, now: f64) {
        if originator == self.self_ip {
            return;
        }
        self.topology_manager
            .process_tc(originator, tc.ansn, &tc.advertised_neighbors, TOP_HOLD_TIME, now);
        self.recompute_routes();
    }

    /// RFC 3626 Section 3.4.1: forward only if the TTL allows another hop,
    /// we didn't originate it, we haven't already relayed this exact
    /// message, and the relaying neighbor selected us as an MPR.
    fn should_forward(&self, originator: Ipv4Addr, msg_seq: u16, ttl: u8, sender_ip: Ipv4Addr) -> bool {
        ttl > 1
            && originator != self.self_ip
            && !self.duplicate_set.is_retransmitted(originator, msg_seq)
            && self.neighbor_manager.is_mpr_selector(sender_ip)
    }

    fn build_hello_packet(&mut self) -> Vec<u8> {
        let mpr_set = self.neighbor_manager.mpr_set().clone();
        let groups = self.link_set.build_hello_groups(&mpr_set, 0.0);
        let body = HelloBody {
            htime_seconds: NEIGHB_HOLD_TIME,
            willingness: self.willingness,
            groups,
        };
        let msg_seq = self.next_msg_seq();
        let message = build_hello_message(self.self_ip, msg_seq, NEIGHB_HOLD_TIME, &body);
        let pkt_seq = self.next_pkt_seq();
        encode_packet(pkt_seq, &[message])
    }

    fn build_tc_packet(&mut self) -> Vec<u8> {
        let advertised: Vec<Ipv4Addr> = self.neighbor_manager.mpr_selectors();
        let mut sorted = advertised.clone();
        sorted.sort();
        if !sorted.is_empty() {
            self.ansn = next_seq(self.ansn);
        }
        self.last_advertised = sorted.clone();
        let body = TcBody {
            ansn: self.ansn,
            advertised_neighbors: sorted,
        };
        let msg_seq = self.next_msg_seq();
        let message = build_tc_message(self.self_ip, msg_seq, TOP_HOLD_TIME, &body);
        let pkt_seq = self.next_pkt_seq();
        encode_packet(pkt_seq, &[message])
    }

    fn cleanup(&mut self, now: f64) {
        self.link_set.cleanup(now);
        self.neighbor_manager.cleanup(now);
        self.topology_manager.cleanup(now);
        self.duplicate_set.cleanup(now);
        self.recompute_routes();
    }

    fn snapshot(&self, bind_address: &str, bind_port: u16, hello_interval: f64, tc_interval: f64, now: f64) -> DaemonSnapshot {
        let mpr_set = self.neighbor_manager.mpr_set();
        let neighbors = self
            .link_set_ips()
            .map(|ip| {
                let status = if self.link_set.is_symmetric(ip, now) {
                    "sym"
                } else {
                    "asym"
                };
                let willingness = self
                    .neighbor_manager
                    .neighbor(ip)
                    .map(|tuple| tuple.willingness)
                    .unwrap_or(0);
                NeighborSnapshot {
                    address: ip.to_string(),
                    status: status.to_string(),
                    willingness,
                    is_mpr: mpr_set.contains(&ip),
                }
            })
            .collect();

        let topology = self
            .topology_manager
            .edges()
            .map(|(last, dest)| TopologySnapshot {
                last_hop: last.to_string(),
                destination: dest.to_string(),
            })
            .collect();

        let routes = self
            .routing_table
            .destinations()
            .map(|(dest, entry)| RouteSnapshot {
                destination: dest.to_string(),
                next_hop: entry.next_hop.to_string(),
                distance: entry.distance,
            })
            .collect();

        DaemonSnapshot {
            self_ip: self.self_ip.to_string(),
            bind_address: bind_address.to_string(),
            bind_port,
            now,
            hello_interval,
            tc_interval,
            neighbors,
            mpr_set: mpr_set.iter().map(ToString::to_string).collect(),
            mpr_selectors: self.neighbor_manager.mpr_selectors().iter().map(ToString::to_string).collect(),
            topology,
            routes,
        }
    }

    fn link_set_ips(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.link_set.neighbor_ips()
    }
}

pub struct Engine {
    transport: Arc<UdpTransport>,
    state: Arc<Mutex<EngineState>>,
    running: Arc<AtomicBool>,
    mgmt: MgmtServer,
    bind_address: String,
    bind_port: u16,
    hello_interval: f64,
    tc_interval: f64,
    cleanup_interval: f64,
    epoch: Instant,
}

impl Engine {
    pub fn new(cfg: DaemonConfig) -> Result<Self> {
        let transport = Arc::new(UdpTransport::bind(
            &cfg.bind_address,
            cfg.bind_port,
            BROADCAST_ADDR,
            65_535,
        )?);
        let state = Arc::new(Mutex::new(EngineState::with_neighbor_willingness(
            cfg.self_ip,
            cfg.willingness,
            cfg.neighbor_willingness.clone(),
        )));

        let initial_snapshot = state
            .lock()
            .expect("engine state lock poisoned")
            .snapshot(&cfg.bind_address, cfg.bind_port, cfg.hello_interval, cfg.tc_interval, 0.0);
        let mgmt = MgmtServer::start(initial_snapshot, &cfg.management)?;

        Ok(Self {
            transport,
            state,
            running: Arc::new(AtomicBool::new(true)),
            mgmt,
            bind_address: cfg.bind_address,
            bind_port: cfg.bind_port,
            hello_interval: cfg.hello_interval,
            tc_interval: cfg.tc_interval,
            cleanup_interval: cfg.cleanup_interval,
            epoch: Instant::now(),
        })
    }

    pub fn run_forever(&mut self) -> Result<()> {
        self.install_signal_handlers()?;

        info!(
            "olsrd start: bind={}:{} hello_interval={} tc_interval={}",
            self.bind_address, self.bind_port, self.hello_interval, self.tc_interval
        );

        self.spawn_timer_thread(self.hello_interval, {
            let state = Arc::clone(&self.state);
            let transport = Arc::clone(&self.transport);
            move || {
                let packet = state.lock().expect("engine state lock poisoned").build_hello_packet();
                if let Err(err) = transport.broadcast(&packet) {
                    warn!("failed to broadcast HELLO: {err}");
                }
            }
        });

        self.spawn_timer_thread(self.tc_interval, {
            let state = Arc::clone(&self.state);
            let transport = Arc::clone(&self.transport);
            move || {
                let packet = state.lock().expect("engine state lock poisoned").build_tc_packet();
                if let Err(err) = transport.broadcast(&packet) {
                    warn!("failed to broadcast TC: {err}");
                }
            }
        });

        self.spawn_cleanup_thread();

        while self.running.load(Ordering::Relaxed) {
            let now = self.now_secs();
            if let Some((payload, addr)) = self.transport.recv(Duration::from_millis(500))? {
                if let std::net::SocketAddr::V4(v4) = addr {
                    self.handle_packet(&payload, *v4.ip(), now);
                    self.publish_snapshot(now);
                }
            }
        }

        info!("olsrd stopped");
        Ok(())
    }

    fn install_signal_handlers(&self) -> Result<()> {
        let running = Arc::clone(&self.running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Relaxed);
        })?;
        Ok(())
    }

    fn spawn_timer_thread(&self, interval: f64, action: impl Fn() + Send + 'static) {
        let running = Arc::clone(&self.running);
        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                action();
                thread::sleep(jittered(interval));
            }
        });
    }

    fn spawn_cleanup_thread(&self) {
        let running = Arc::clone(&self.running);
        let state = Arc::clone(&self.state);
        let epoch = self.epoch;
        let interval = self.cleanup_interval;
        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_secs_f64(interval));
                let now = epoch.elapsed().as_secs_f64();
                state.lock().expect("engine state lock poisoned").cleanup(now);
            }
        });
    }

    fn handle_packet(&self, packet: &[u8], src_ip: Ipv4Addr, now: f64) {
        let messages = parse_packet_messages(packet);
        let mut state = self.state.lock().expect("engine state lock poisoned");

        for message in messages {
            let originator = message.header.originator;
            let msg_seq = message.header.msg_seq;
            let ttl = message.header.ttl;

            if !state.duplicate_set.is_duplicate(originator, msg_seq) {
                state.duplicate_set.record(originator, msg_seq, now);
                match &message.body {
                    MessageBody::Hello(hello) => state.process_hello(originator, hello, now),
                    MessageBody::Tc(tc) => state.process_tc(originator, tc, now),
                    MessageBody::Unknown => {}
                }
            }

            if state.should_forward(originator, msg_seq, ttl, src_ip) {
                let mut raw = message.raw.clone();
                rewrite_ttl_hop(&mut raw, ttl - 1, message.header.hop_count + 1);
                state.duplicate_set.mark_retransmitted(originator, msg_seq);
                if let Err(err) = self.transport.broadcast(&raw) {
                    warn!("failed to forward message: {err}");
                }
            }
        }
    }

    fn now_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn publish_snapshot(&self, now: f64) {
        let snapshot = self
            .state
            .lock()
            .expect("engine state lock poisoned")
            .snapshot(&self.bind_address, self.bind_port, self.hello_interval, self.tc_interval, now);
        self.mgmt.publish(snapshot);
    }
}

/// Uniform jitter of `interval +/- 0.5s`, matching the reference
/// implementation's spread-out timer firing.
fn jittered(interval: f64) -> Duration {
    let offset: f64 = rand::thread_rng().gen_range(-0.5..0.5);
    Duration::from_secs_f64((interval + offset).max(0.0))
}

/// Advance a wire sequence counter modulo 65535 (RFC 3626 Section 3.4).
fn next_seq(current: u16) -> u16 {
    ((u32::from(current) + 1) % 65535) as u16
}
