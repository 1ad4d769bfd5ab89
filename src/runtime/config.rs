use std::collections::BTreeMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::consts::{
    CLEANUP_INTERVAL, DEFAULT_PORT, HELLO_INTERVAL, TC_INTERVAL, WILL_DEFAULT,
};

#[derive(Debug, Clone)]
pub struct HttpManagementConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub self_ip: Ipv4Addr,
    pub bind_address: String,
    pub bind_port: u16,
    pub willingness: u8,
    pub hello_interval: f64,
    pub tc_interval: f64,
    pub cleanup_interval: f64,
    /// Willingness overrides for specific neighbors, keyed by their address.
    /// Absent here, neighbors are tracked with whatever willingness their own
    /// HELLOs advertise.
    pub neighbor_willingness: BTreeMap<Ipv4Addr, u8>,
    pub management: ManagementConfig,
}

#[derive(Debug, Clone)]
pub struct ManagementConfig {
    pub http: HttpManagementConfig,
}

#[derive(Debug, Deserialize, Default)]
struct RawBind {
    address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
struct RawTimers {
    hello_interval: Option<f64>,
    tc_interval: Option<f64>,
    cleanup_interval: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawNeighborWillingness {
    address: String,
    willingness: u8,
}

#[derive(Debug, Deserialize, Default)]
struct RawManagementEndpoint {
    enabled: Option<bool>,
    bind: Option<String>,
    address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
struct RawManagement {
    http: Option<RawManagementEndpoint>,
}

#[derive(Debug, Deserialize)]
struct RawDaemonConfig {
    self_ip: String,
    bind: Option<RawBind>,
    willingness: Option<u8>,
    timers: Option<RawTimers>,
    #[serde(default)]
    neighbor_willingness: Vec<RawNeighborWillingness>,
    management: Option<RawManagement>,
}

pub fn load_daemon_config(path: &Path) -> Result<DaemonConfig> {
    let raw_text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let raw_cfg: RawDaemonConfig =
        serde_yaml::from_str(&raw_text).context("failed to parse daemon config yaml")?;

    let self_ip: Ipv4Addr = raw_cfg
        .self_ip
        .parse()
        .with_context(|| format!("invalid self_ip: {}", raw_cfg.self_ip))?;

    let bind = raw_cfg.bind.unwrap_or_default();
    let timers = raw_cfg.timers.unwrap_or_default();
    let management_raw = raw_cfg.management.unwrap_or_default();

    let neighbor_willingness = raw_cfg
        .neighbor_willingness
        .into_iter()
        .map(|item| {
            let addr: Ipv4Addr = item
                .address
                .parse()
                .with_context(|| format!("invalid neighbor address: {}", item.address))?;
            Ok((addr, item.willingness))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    let bind_address = bind.address.unwrap_or_else(|| "0.0.0.0".to_string());
    let bind_port = bind.port.unwrap_or(DEFAULT_PORT);

    let http_raw = management_raw.http.unwrap_or_default();
    let management = ManagementConfig {
        http: HttpManagementConfig {
            enabled: http_raw.enabled.unwrap_or(true),
            bind_address: endpoint_address(http_raw.bind.or(http_raw.address)),
            port: endpoint_port(http_raw.port, bind_port, 10_000),
        },
    };

    Ok(DaemonConfig {
        self_ip,
        bind_address,
        bind_port,
        willingness: raw_cfg.willingness.unwrap_or(WILL_DEFAULT),
        hello_interval: timers.hello_interval.unwrap_or(HELLO_INTERVAL),
        tc_interval: timers.tc_interval.unwrap_or(TC_INTERVAL),
        cleanup_interval: timers.cleanup_interval.unwrap_or(CLEANUP_INTERVAL),
        neighbor_willingness,
        management,
    })
}

fn endpoint_address(raw: Option<String>) -> String {
    raw.unwrap_or_else(|| "0.0.0.0".to_string())
}

fn endpoint_port(raw: Option<u16>, bind_port: u16, offset: u16) -> u16 {
    match raw {
        Some(port) => port,
        None => {
            let candidate = u32::from(bind_port) + u32::from(offset);
            if candidate <= u32::from(u16::MAX) {
                candidate as u16
            } else {
                bind_port
            }
        }
    }
}
