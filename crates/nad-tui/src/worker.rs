//! The device worker: one long-lived task that owns the receiver connection
//! and runs queued operations strictly one at a time.

use std::sync::Arc;
use std::time::Duration;

use nad_core::{
    discover, ClientOptions, Config, DeviceState, DiscoveryCache, Endpoint, NadClient, NadError,
    ScanOptions,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::message::{DeviceOp, QueuedOp, Severity, UiMessage};
use crate::queue::CommandQueue;

/// How long the worker sleeps when the queue is empty; a push wakes it early.
pub const IDLE_SLEEP: Duration = Duration::from_millis(75);

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Receiver dialled by `Connect(None)`. Updated on every successful connect.
    pub endpoint: Option<Endpoint>,
    pub client_options: ClientOptions,
    pub scan_options: ScanOptions,
    pub cache: DiscoveryCache,
    pub cache_ttl: Duration,
    pub use_cache: bool,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.endpoint(),
            client_options: config.client_options(),
            scan_options: config.scan_options(),
            cache: DiscoveryCache::at_default_location(),
            cache_ttl: config.cache_ttl(),
            use_cache: config.discovery.use_cache,
        }
    }
}

pub struct Worker {
    queue: Arc<CommandQueue>,
    tx: mpsc::UnboundedSender<UiMessage>,
    settings: WorkerSettings,
    client: Option<NadClient>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        queue: Arc<CommandQueue>,
        tx: mpsc::UnboundedSender<UiMessage>,
        settings: WorkerSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            tx,
            settings,
            client: None,
            cancel,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Device worker started");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let Some(entry) = self.queue.pop() else {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = self.queue.notified() => {}
                    _ = tokio::time::sleep(IDLE_SLEEP) => {}
                }
                continue;
            };
            let cancel = self.cancel.clone();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.execute(entry) => {}
            }
        }
        if let Some(mut client) = self.client.take() {
            client.disconnect();
        }
        info!("Device worker stopped");
    }

    async fn execute(&mut self, entry: QueuedOp) {
        debug!(
            "Running op #{} ({}) after {:?} in queue",
            entry.id,
            entry.op,
            entry.enqueued_at.elapsed()
        );
        match entry.op {
            DeviceOp::Connect(endpoint) => self.connect(endpoint).await,
            DeviceOp::Discover { refresh } => self.discover(refresh).await,
            op => self.device_op(op).await,
        }
    }

    async fn connect(&mut self, endpoint: Option<Endpoint>) {
        let Some(endpoint) = endpoint.or_else(|| self.settings.endpoint.clone()) else {
            self.send(UiMessage::ConnectFailed(
                "no receiver address configured (press d to discover)".into(),
            ));
            return;
        };
        self.client = None;

        let result = async {
            let mut client =
                NadClient::connect(endpoint.clone(), self.settings.client_options.clone()).await?;
            let model = client.model().await?;
            Ok::<_, NadError>((client, model))
        }
        .await;

        match result {
            Ok((client, model)) => {
                info!("Connected to {} at {}", model, endpoint);
                self.client = Some(client);
                self.settings.endpoint = Some(endpoint.clone());
                self.send(UiMessage::Connected { endpoint, model });
                self.queue.push_front(DeviceOp::Refresh);
            }
            Err(e) => {
                warn!("Connect to {} failed: {}", endpoint, e);
                self.send(UiMessage::ConnectFailed(format!("[{}] {}", e.tag(), e)));
            }
        }
    }

    async fn discover(&mut self, refresh: bool) {
        let use_cache = self.settings.use_cache && !refresh;
        let outcome = discover(
            &self.settings.cache,
            &self.settings.scan_options,
            use_cache,
            self.settings.cache_ttl,
            &self.cancel,
        )
        .await;

        match outcome {
            Ok(outcome) => {
                let first = outcome.devices.first().map(|d| d.endpoint());
                self.send(UiMessage::Discovered {
                    devices: outcome.devices,
                    from_cache: outcome.from_cache,
                });
                if self.client.is_none() {
                    if let Some(endpoint) = first {
                        self.queue.push_front(DeviceOp::Connect(Some(endpoint)));
                    }
                }
            }
            Err(NadError::Cancelled(after)) => debug!("Discovery cancelled after {:?}", after),
            Err(e) => {
                warn!("Discovery failed: {}", e);
                self.send(UiMessage::note(
                    Severity::Error,
                    format!("Discovery failed: [{}] {}", e.tag(), e),
                ));
                self.send(UiMessage::Discovered {
                    devices: Vec::new(),
                    from_cache: false,
                });
            }
        }
    }

    async fn device_op(&mut self, op: DeviceOp) {
        let Some(client) = self.client.as_mut() else {
            if op.is_refresh() {
                debug!("Not connected, skipping refresh");
            } else {
                self.send(UiMessage::note(
                    Severity::Warning,
                    format!("Cannot {}: {}", op, NadError::NotConnected),
                ));
            }
            return;
        };

        match run_op(client, &op).await {
            Ok(Some(state)) => self.send(UiMessage::Status(state)),
            Ok(None) => {
                self.queue.push_front(DeviceOp::Refresh);
            }
            Err(e) => self.fail(&op, e),
        }
    }

    fn fail(&mut self, op: &DeviceOp, err: NadError) {
        warn!("{} failed: {}", op, err);
        self.send(UiMessage::note(
            Severity::Error,
            format!("{} failed: [{}] {}", op, err.tag(), err),
        ));
        if matches!(
            err,
            NadError::CommunicationFailed { .. } | NadError::ConnectFailed { .. } | NadError::Io(_)
        ) {
            self.client = None;
            self.send(UiMessage::Disconnected(err.to_string()));
        }
    }

    fn send(&self, msg: UiMessage) {
        if self.tx.send(msg).is_err() {
            debug!("UI channel closed, dropping message");
        }
    }
}

/// Run one device operation. A refresh yields the new snapshot; everything
/// else yields `None` and is followed by a refresh.
async fn run_op(client: &mut NadClient, op: &DeviceOp) -> nad_core::Result<Option<DeviceState>> {
    match op {
        DeviceOp::Refresh => return client.refresh().await.map(Some),
        DeviceOp::PowerToggle => {
            client.power_toggle().await?;
        }
        DeviceOp::PowerOn => {
            client.power_on().await?;
        }
        DeviceOp::PowerOff => {
            client.power_off().await?;
        }
        DeviceOp::VolumeSet(db) => {
            client.set_volume(*db).await?;
        }
        DeviceOp::VolumeStep(direction) => {
            client.step_volume(*direction).await?;
        }
        DeviceOp::SourceStep(direction) => {
            client.step_source(*direction).await?;
        }
        DeviceOp::SourceSet(source) => {
            client.set_source(*source).await?;
        }
        DeviceOp::MuteToggle => {
            client.toggle_mute().await?;
        }
        DeviceOp::BrightnessSet(level) => {
            client.set_brightness(i64::from(*level)).await?;
        }
        DeviceOp::BrightnessStep(direction) => {
            client.step_brightness(*direction).await?;
        }
        DeviceOp::Connect(_) | DeviceOp::Discover { .. } => {}
    }
    Ok(None)
}
