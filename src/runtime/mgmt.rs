use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::runtime::config::ManagementConfig;

#[derive(Debug, Clone, Serialize)]
pub struct NeighborSnapshot {
    pub address: String,
    pub status: String,
    pub willingness: u8,
    pub is_mpr: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSnapshot {
    pub destination: String,
    pub next_hop: String,
    pub distance: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    pub last_hop: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct DaemonSnapshot {
    pub self_ip: String,
    pub bind_address: String,
    pub bind_port: u16,
    pub now: f64,
    pub hello_interval: f64,
    pub tc_interval: f64,
    pub neighbors: Vec<NeighborSnapshot>,
    pub mpr_set: Vec<String>,
    pub mpr_selectors: Vec<String>,
    pub topology: Vec<TopologySnapshot>,
    pub routes: Vec<RouteSnapshot>,
}

pub struct MgmtServer {
    snapshot: Arc<RwLock<DaemonSnapshot>>,
}

impl MgmtServer {
    pub fn start(initial: DaemonSnapshot, cfg: &ManagementConfig) -> Result<Self> {
        let snapshot = Arc::new(RwLock::new(initial));

        if cfg.http.enabled {
            spawn_http_server(Arc::clone(&snapshot), cfg.http.bind_address.clone(), cfg.http.port)?;
            info!(
                "olsrd management HTTP started on {}:{}",
                cfg.http.bind_address, cfg.http.port
            );
        }

        Ok(Self { snapshot })
    }

    pub fn publish(&self, snapshot: DaemonSnapshot) {
        if let Ok(mut guard) = self.snapshot.write() {
            *guard = snapshot;
        }
    }
}

fn spawn_http_server(
    snapshot: Arc<RwLock<DaemonSnapshot>>,
    bind_address: String,
    port: u16,
) -> Result<()> {
    let listener = TcpListener::bind((bind_address.as_str(), port)).with_context(|| {
        format!("failed to bind management HTTP server at {bind_address}:{port}")
    })?;
    listener
        .set_nonblocking(true)
        .context("failed to set HTTP listener non-blocking")?;

    thread::spawn(move || loop {
        match listener.accept() {
            Ok((stream, _addr)) => {
                if let Err(err) = handle_http_stream(stream, &snapshot) {
                    debug!("management HTTP request failed: {err}");
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(80));
            }
            Err(err) => {
                warn!("management HTTP accept error: {err}");
                thread::sleep(Duration::from_millis(200));
            }
        }
    });

    Ok(())
}

fn handle_http_stream(mut stream: TcpStream, snapshot: &Arc<RwLock<DaemonSnapshot>>) -> Result<()> {
    let mut buf = [0_u8; 4096];
    let n = stream
        .read(&mut buf)
        .context("failed to read HTTP request from management socket")?;
    if n == 0 {
        return Ok(());
    }

    let request = String::from_utf8_lossy(&buf[..n]);
    let first_line = request.lines().next().unwrap_or_default();
    let path = first_line.split_whitespace().nth(1).unwrap_or("/");

    let found = matches!(path, "/healthz" | "/v1/status" | "/v1/routes" | "/v1/topology");
    let body = match path {
        "/healthz" => json!({"status": "ok"}),
        "/v1/status" => {
            let state = snapshot
                .read()
                .map_err(|_| anyhow::anyhow!("management state lock poisoned"))?
                .clone();
            serde_json::to_value(state).unwrap_or_else(|_| json!({"status": "encode_error"}))
        }
        "/v1/routes" => {
            let routes = snapshot
                .read()
                .map_err(|_| anyhow::anyhow!("management state lock poisoned"))?
                .routes
                .clone();
            json!({"routes": routes})
        }
        "/v1/topology" => {
            let topology = snapshot
                .read()
                .map_err(|_| anyhow::anyhow!("management state lock poisoned"))?
                .topology
                .clone();
            json!({"topology": topology})
        }
        _ => json!({"error": "not_found", "path": path}),
    };

    let status_line = if found { "HTTP/1.1 200 OK" } else { "HTTP/1.1 404 Not Found" };

    let payload = serde_json::to_vec(&body).unwrap_or_else(|_| b"{\"error\":\"encode\"}".to_vec());
    let response = format!(
        "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    );
    stream
        .write_all(response.as_bytes())
        .context("failed to write HTTP headers")?;
    stream
        .write_all(&payload)
        .context("failed to write HTTP body")?;
    Ok(())
}
