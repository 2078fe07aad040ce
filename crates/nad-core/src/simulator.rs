//! In-process NAD receiver speaking the line protocol over TCP.
//!
//! Used for development without hardware and by the integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::protocol::{Attribute, Command, Operation, Reply};
use crate::types::{
    step_brightness, validate_brightness, DeviceState, Endpoint, Mute, Power, Source, VolumeLimits,
};

pub const SIMULATOR_MODEL: &str = "NAD T 758 V3i";

/// Longest unterminated input kept between reads. Real commands are a few
/// dozen bytes.
const MAX_PENDING_BYTES: usize = 4096;

/// Factory state of a freshly started simulator.
pub fn initial_state() -> DeviceState {
    DeviceState {
        power: Power::Off,
        volume: -30.0,
        source: Source::Stream,
        mute: Mute::Off,
        brightness: 2,
        model: SIMULATOR_MODEL.to_string(),
    }
}

pub struct Simulator {
    local_addr: SocketAddr,
    state: Arc<RwLock<DeviceState>>,
    shutdown: CancellationToken,
}

impl Simulator {
    /// Bind and start accepting. `127.0.0.1:0` picks a free port.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let state = Arc::new(RwLock::new(initial_state()));
        let shutdown = CancellationToken::new();

        info!("Simulator listening at {}", local_addr);
        tokio::spawn(accept_loop(listener, state.clone(), shutdown.clone()));

        Ok(Self {
            local_addr,
            state,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.local_addr.ip().to_string(), self.local_addr.port())
    }

    pub async fn snapshot(&self) -> DeviceState {
        self.state.read().await.clone()
    }

    /// Mutate the simulated device directly (test setup).
    pub async fn update<F: FnOnce(&mut DeviceState)>(&self, f: F) {
        let mut guard = self.state.write().await;
        f(&mut guard);
    }

    /// Stop accepting and close every client connection. Safe to call twice.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Simulator at {} shutting down", self.local_addr);
        }
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolve once `shutdown` has been called.
    pub async fn stopped(&self) {
        self.shutdown.cancelled().await
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<RwLock<DeviceState>>,
    shutdown: CancellationToken,
) {
    let mut client_id = 0usize;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    client_id += 1;
                    info!("Simulator client {} connected from {}", client_id, peer);
                    tokio::spawn(handle_client(stream, client_id, state.clone(), shutdown.clone()));
                }
                Err(e) => error!("Simulator accept failed: {}", e),
            },
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    client_id: usize,
    state: Arc<RwLock<DeviceState>>,
    shutdown: CancellationToken,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let mut tmp = [0u8; 1024];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = read_half.read(&mut tmp) => match result {
                Ok(0) => {
                    debug!("Simulator client {} closed connection", client_id);
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!("Simulator read error from client {}: {}", client_id, e);
                    break;
                }
            },
        };
        pending.extend_from_slice(&tmp[..n]);

        for token in take_tokens(&mut pending) {
            let Some(reply) = handle_token(&token, &state).await else {
                continue;
            };
            let line = format!("{}\r\n", reply.encode());
            if write_half.write_all(line.as_bytes()).await.is_err() {
                return;
            }
        }
        if let Some(dropped) = cap_pending(&mut pending) {
            warn!(
                "Simulator client {} sent {} bytes without a separator, discarding",
                client_id, dropped
            );
        }
    }
}

/// Drop an unterminated tail that outgrew [`MAX_PENDING_BYTES`]. Returns the
/// number of bytes discarded.
fn cap_pending(buf: &mut Vec<u8>) -> Option<usize> {
    if buf.len() <= MAX_PENDING_BYTES {
        return None;
    }
    let dropped = buf.len();
    buf.clear();
    Some(dropped)
}

/// Split complete tokens off the front of `buf` on CR, LF, or NUL. An
/// unterminated tail stays in the buffer.
fn take_tokens(buf: &mut Vec<u8>) -> Vec<String> {
    let is_sep = |b: &u8| matches!(b, b'\r' | b'\n' | 0);
    let Some(last) = buf.iter().rposition(is_sep) else {
        return Vec::new();
    };
    let complete: Vec<u8> = buf.drain(..=last).collect();
    complete
        .split(is_sep)
        .filter(|t| !t.is_empty())
        .map(|t| String::from_utf8_lossy(t).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

async fn handle_token(token: &str, state: &RwLock<DeviceState>) -> Option<Reply> {
    let cmd = match Command::parse(token) {
        Ok(cmd) => cmd,
        Err(e) => {
            warn!("Simulator ignoring {:?}: {}", token, e);
            return None;
        }
    };
    if cmd.operation == Operation::Query {
        return Some(current(&*state.read().await, cmd.attribute));
    }
    let mut guard = state.write().await;
    let reply = apply(&mut guard, &cmd);
    if reply.is_none() {
        warn!("Simulator ignoring invalid command {}", cmd);
    }
    reply
}

fn current(state: &DeviceState, attribute: Attribute) -> Reply {
    match attribute {
        Attribute::Power => Reply::Power(state.power),
        Attribute::Volume => Reply::Volume(state.volume),
        Attribute::Source => Reply::Source(state.source),
        Attribute::Mute => Reply::Mute(state.mute),
        Attribute::Brightness => Reply::Brightness(state.brightness),
        Attribute::Model => Reply::Model(state.model.clone()),
    }
}

/// Apply a set or step to the simulated state. `None` means the command was
/// invalid and is dropped without a response.
fn apply(state: &mut DeviceState, cmd: &Command) -> Option<Reply> {
    let limits = VolumeLimits::default();
    match (&cmd.operation, cmd.attribute) {
        (Operation::Query, attr) => return Some(current(state, attr)),
        (_, Attribute::Model) => return None,

        (Operation::Set(v), Attribute::Power) => {
            state.power = match v.parse::<Power>().ok()? {
                Power::Unknown => return None,
                p => p,
            }
        }
        (Operation::Set(v), Attribute::Mute) => {
            state.mute = match v.parse::<Mute>().ok()? {
                Mute::Unknown => return None,
                m => m,
            }
        }
        (Operation::Set(v), Attribute::Volume) => {
            let db: f64 = v.parse().ok()?;
            if !db.is_finite() {
                return None;
            }
            state.volume = limits.clamp(db);
        }
        (Operation::Set(v), Attribute::Source) => state.source = Source::from_name(v)?,
        (Operation::Set(v), Attribute::Brightness) => {
            state.brightness = validate_brightness(v.parse().ok()?).ok()?
        }

        (Operation::Step(_), Attribute::Power) => state.power = state.power.toggled(),
        (Operation::Step(_), Attribute::Mute) => state.mute = state.mute.toggled(),
        (Operation::Step(dir), Attribute::Volume) => {
            state.volume = limits.clamp(state.volume + dir.sign())
        }
        (Operation::Step(dir), Attribute::Source) => state.source = state.source.step(*dir),
        (Operation::Step(dir), Attribute::Brightness) => {
            state.brightness = step_brightness(state.brightness, *dir)
        }
    }
    Some(current(state, cmd.attribute))
}
