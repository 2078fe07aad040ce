//! Device client: one TCP session to one receiver, one request in flight.
//!
//! Responses carry no request id, so a reply is matched to the command by its
//! attribute.  Every method takes `&mut self`; callers that share a client go
//! through the TUI worker queue or an async mutex.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{NadError, Result};
use crate::protocol::{decode_response_within, split_response, Attribute, Command, Reply};
use crate::types::{
    step_brightness, validate_brightness, DeviceState, Direction, Endpoint, Mute, Power, Source,
    VolumeLimits,
};

/// Lines read while waiting for the expected attribute before giving up.
pub const MAX_DRAIN_LINES: usize = 8;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub volume_limits: VolumeLimits,
    /// dB added or removed by one volume step.
    pub volume_step: f64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(2),
            volume_limits: VolumeLimits::default(),
            volume_step: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Idle,
    Dialing,
    Ready,
    Operating,
    Closed,
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

pub struct NadClient {
    endpoint: Endpoint,
    options: ClientOptions,
    conn: Option<Connection>,
    state: ConnState,
}

impl NadClient {
    /// Create an idle client; the first operation dials.
    pub fn new(endpoint: Endpoint, options: ClientOptions) -> Self {
        Self {
            endpoint,
            options,
            conn: None,
            state: ConnState::Idle,
        }
    }

    /// Create a client and dial immediately.
    pub async fn connect(endpoint: Endpoint, options: ClientOptions) -> Result<Self> {
        let mut client = Self::new(endpoint, options);
        client.ensure_connected().await?;
        Ok(client)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Close the socket. The client can still be used afterwards; the next
    /// operation dials again.
    pub fn disconnect(&mut self) {
        if self.conn.take().is_some() {
            info!("Disconnected from {}", self.endpoint);
        }
        self.state = ConnState::Closed;
    }

    // ── Power ────────────────────────────────────────────────────────────────

    pub async fn power(&mut self) -> Result<Power> {
        match self.request(&Command::query(Attribute::Power)).await? {
            Reply::Power(p) => Ok(p),
            other => Err(unexpected(Attribute::Power, &other)),
        }
    }

    pub async fn power_on(&mut self) -> Result<Power> {
        self.set_power(Power::On).await
    }

    pub async fn power_off(&mut self) -> Result<Power> {
        self.set_power(Power::Off).await
    }

    pub async fn power_toggle(&mut self) -> Result<Power> {
        let current = self.power().await?;
        self.set_power(current.toggled()).await
    }

    /// The receiver drops its TCP session when the power state changes, so a
    /// power change always ends with a fresh connection.
    pub async fn set_power(&mut self, power: Power) -> Result<Power> {
        let cmd = Command::set_power(power)?;
        self.ensure_connected().await?;
        let outcome = self.exchange_once(&cmd).await;
        self.close_connection();

        match outcome {
            Ok(Reply::Power(p)) => {
                self.redial_after_power_change().await;
                Ok(p)
            }
            Ok(other) => Err(unexpected(Attribute::Power, &other)),
            Err(Exchange::WriteFailed(e)) => {
                debug!("Power command not delivered ({}), resending", e);
                let reply = self.request(&cmd).await?;
                self.redial_after_power_change().await;
                match reply {
                    Reply::Power(p) => Ok(p),
                    other => Err(unexpected(Attribute::Power, &other)),
                }
            }
            Err(Exchange::ReadFailed(e)) => {
                debug!("Power reply lost ({}), querying after reconnect", e);
                self.power().await
            }
        }
    }

    /// Swap the session the receiver is dropping for a new one. A failed dial
    /// is only logged; the next operation dials again.
    async fn redial_after_power_change(&mut self) {
        self.close_connection();
        if let Err(e) = self.ensure_connected().await {
            warn!("Reconnect after power change failed: {}", e);
        }
    }

    // ── Volume ───────────────────────────────────────────────────────────────

    pub async fn volume(&mut self) -> Result<f64> {
        match self.request(&Command::query(Attribute::Volume)).await? {
            Reply::Volume(v) => Ok(v),
            other => Err(unexpected(Attribute::Volume, &other)),
        }
    }

    /// Clamped to the configured limits before transmission.
    pub async fn set_volume(&mut self, db: f64) -> Result<f64> {
        let cmd = Command::set_volume(db, &self.options.volume_limits)?;
        match self.request(&cmd).await? {
            Reply::Volume(v) => Ok(v),
            other => Err(unexpected(Attribute::Volume, &other)),
        }
    }

    pub async fn step_volume(&mut self, direction: Direction) -> Result<f64> {
        let current = self.volume().await?;
        let target = current + direction.sign() * self.options.volume_step;
        self.set_volume(target).await
    }

    // ── Source ───────────────────────────────────────────────────────────────

    pub async fn source(&mut self) -> Result<Source> {
        match self.request(&Command::query(Attribute::Source)).await? {
            Reply::Source(s) => Ok(s),
            other => Err(unexpected(Attribute::Source, &other)),
        }
    }

    pub async fn set_source(&mut self, source: Source) -> Result<Source> {
        match self.request(&Command::set_source(source)).await? {
            Reply::Source(s) => Ok(s),
            other => Err(unexpected(Attribute::Source, &other)),
        }
    }

    /// Accepts any casing of a canonical source name.
    pub async fn set_source_name(&mut self, name: &str) -> Result<Source> {
        let source: Source = name.parse()?;
        self.set_source(source).await
    }

    pub async fn step_source(&mut self, direction: Direction) -> Result<Source> {
        let current = self.source().await?;
        self.set_source(current.step(direction)).await
    }

    // ── Mute ─────────────────────────────────────────────────────────────────

    pub async fn mute(&mut self) -> Result<Mute> {
        match self.request(&Command::query(Attribute::Mute)).await? {
            Reply::Mute(m) => Ok(m),
            other => Err(unexpected(Attribute::Mute, &other)),
        }
    }

    pub async fn set_mute(&mut self, mute: Mute) -> Result<Mute> {
        match self.request(&Command::set_mute(mute)?).await? {
            Reply::Mute(m) => Ok(m),
            other => Err(unexpected(Attribute::Mute, &other)),
        }
    }

    pub async fn toggle_mute(&mut self) -> Result<Mute> {
        let current = self.mute().await?;
        self.set_mute(current.toggled()).await
    }

    // ── Brightness ───────────────────────────────────────────────────────────

    pub async fn brightness(&mut self) -> Result<u8> {
        match self.request(&Command::query(Attribute::Brightness)).await? {
            Reply::Brightness(b) => Ok(b),
            other => Err(unexpected(Attribute::Brightness, &other)),
        }
    }

    /// Levels outside 0..=3 are rejected with `OutOfRange`.
    pub async fn set_brightness(&mut self, level: i64) -> Result<u8> {
        let level = validate_brightness(level)?;
        match self.request(&Command::set_brightness(level)?).await? {
            Reply::Brightness(b) => Ok(b),
            other => Err(unexpected(Attribute::Brightness, &other)),
        }
    }

    pub async fn step_brightness(&mut self, direction: Direction) -> Result<u8> {
        let current = self.brightness().await?;
        self.set_brightness(step_brightness(current, direction) as i64)
            .await
    }

    // ── Model / snapshot ─────────────────────────────────────────────────────

    pub async fn model(&mut self) -> Result<String> {
        match self.request(&Command::query(Attribute::Model)).await? {
            Reply::Model(m) => Ok(m),
            other => Err(unexpected(Attribute::Model, &other)),
        }
    }

    /// Query every attribute in turn.
    pub async fn refresh(&mut self) -> Result<DeviceState> {
        Ok(DeviceState {
            power: self.power().await?,
            volume: self.volume().await?,
            source: self.source().await?,
            mute: self.mute().await?,
            brightness: self.brightness().await?,
            model: self.model().await?,
        })
    }

    // ── Transport ────────────────────────────────────────────────────────────

    async fn ensure_connected(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        self.state = ConnState::Dialing;
        let addr = (self.endpoint.host.as_str(), self.endpoint.port);
        let stream = match timeout(self.options.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.state = ConnState::Idle;
                return Err(NadError::ConnectFailed {
                    endpoint: self.endpoint.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                self.state = ConnState::Idle;
                return Err(NadError::ConnectFailed {
                    endpoint: self.endpoint.to_string(),
                    reason: format!("timed out after {:?}", self.options.connect_timeout),
                });
            }
        };
        // Commands are tiny; don't let Nagle hold them back.
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        self.conn = Some(Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
        });
        self.state = ConnState::Ready;
        debug!("Connected to {}", self.endpoint);
        Ok(())
    }

    fn close_connection(&mut self) {
        self.conn = None;
        self.state = ConnState::Idle;
    }

    /// Send one command and wait for its reply, reconnecting and retrying once
    /// on a transport failure.
    async fn request(&mut self, cmd: &Command) -> Result<Reply> {
        match self.request_once(cmd).await {
            Err(e) if e.is_transport() => {
                warn!("{} to {} failed ({}), reconnecting", cmd, self.endpoint, e);
                self.close_connection();
                match self.request_once(cmd).await {
                    Ok(reply) => Ok(reply),
                    Err(e) => {
                        self.close_connection();
                        Err(match e {
                            NadError::Io(_)
                            | NadError::ConnectFailed { .. }
                            | NadError::CommunicationFailed { .. } => {
                                NadError::CommunicationFailed {
                                    endpoint: self.endpoint.to_string(),
                                    reason: e.to_string(),
                                }
                            }
                            other => other,
                        })
                    }
                }
            }
            other => other,
        }
    }

    async fn request_once(&mut self, cmd: &Command) -> Result<Reply> {
        self.ensure_connected().await?;
        match self.exchange_once(cmd).await {
            Ok(reply) => Ok(reply),
            Err(Exchange::WriteFailed(e)) | Err(Exchange::ReadFailed(e)) => {
                if e.is_transport() {
                    self.close_connection();
                }
                Err(e)
            }
        }
    }

    async fn exchange_once(&mut self, cmd: &Command) -> std::result::Result<Reply, Exchange> {
        let endpoint = self.endpoint.to_string();
        let read_timeout = self.options.read_timeout;
        let limits = self.options.volume_limits;
        let Some(conn) = self.conn.as_mut() else {
            return Err(Exchange::WriteFailed(NadError::NotConnected));
        };
        self.state = ConnState::Operating;

        debug!("-> {}", cmd);
        if let Err(e) = conn.writer.write_all(cmd.to_wire().as_bytes()).await {
            return Err(Exchange::WriteFailed(e.into()));
        }

        let result = read_reply(conn, cmd.attribute, read_timeout, &limits, &endpoint).await;
        if result.is_ok() {
            self.state = ConnState::Ready;
        }
        result.map_err(Exchange::ReadFailed)
    }
}

enum Exchange {
    WriteFailed(NadError),
    ReadFailed(NadError),
}

async fn read_reply(
    conn: &mut Connection,
    expected: Attribute,
    read_timeout: Duration,
    limits: &VolumeLimits,
    endpoint: &str,
) -> Result<Reply> {
    let mut line = String::new();
    for _ in 0..MAX_DRAIN_LINES {
        line.clear();
        let n = match timeout(read_timeout, conn.reader.read_line(&mut line)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(NadError::CommunicationFailed {
                    endpoint: endpoint.to_string(),
                    reason: format!("no {} reply within {:?}", expected.key(), read_timeout),
                })
            }
        };
        if n == 0 {
            return Err(NadError::CommunicationFailed {
                endpoint: endpoint.to_string(),
                reason: "connection closed by device".to_string(),
            });
        }

        let trimmed = line.trim_start_matches(['\r', '\n', ' ']);
        if trimmed.trim_end().is_empty() {
            continue;
        }
        debug!("<- {}", trimmed.trim_end());

        let matches_expected = split_response(trimmed)
            .map(|(key, _)| Attribute::from_key(key.trim()) == Some(expected))
            .unwrap_or(false);

        match decode_response_within(trimmed, limits) {
            Ok(reply) if reply.attribute() == expected => return Ok(reply),
            Ok(reply) => debug!("Skipping unsolicited {}", reply.encode()),
            Err(e) if matches_expected => return Err(e),
            Err(NadError::UnknownAttribute(key)) => debug!("Skipping unknown attribute {}", key),
            Err(e) => debug!("Skipping unreadable line: {}", e),
        }
    }
    Err(NadError::MalformedResponse(format!(
        "no {} reply within {} lines",
        expected.key(),
        MAX_DRAIN_LINES
    )))
}

fn unexpected(expected: Attribute, got: &Reply) -> NadError {
    NadError::MalformedResponse(format!("expected {}, got {}", expected.key(), got.encode()))
}
