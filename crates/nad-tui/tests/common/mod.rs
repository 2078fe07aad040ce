#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use nad_core::{ClientOptions, DiscoveryCache, Endpoint, ScanOptions, ScanTargets, Simulator};
use nad_tui::{CommandQueue, UiMessage, Worker, WorkerSettings};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub async fn start_simulator() -> Simulator {
    Simulator::bind("127.0.0.1:0")
        .await
        .expect("simulator should bind an ephemeral port")
}

pub fn settings(endpoint: Option<Endpoint>, scan_port: u16, cache_dir: &tempfile::TempDir) -> WorkerSettings {
    WorkerSettings {
        endpoint,
        client_options: ClientOptions {
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_millis(500),
            ..ClientOptions::default()
        },
        scan_options: ScanOptions {
            targets: ScanTargets::Hosts(vec!["127.0.0.1".into()]),
            port: scan_port,
            probe_timeout: Duration::from_millis(500),
            max_concurrent: 4,
            deadline: Duration::from_secs(3),
        },
        cache: DiscoveryCache::new(cache_dir.path().join("cache.json")),
        cache_ttl: Duration::from_secs(300),
        use_cache: true,
    }
}

pub struct Harness {
    pub queue: Arc<CommandQueue>,
    pub rx: mpsc::UnboundedReceiver<UiMessage>,
    pub cancel: CancellationToken,
    settings: Option<WorkerSettings>,
    tx: mpsc::UnboundedSender<UiMessage>,
}

impl Harness {
    pub fn new(settings: WorkerSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            queue: Arc::new(CommandQueue::new()),
            rx,
            cancel: CancellationToken::new(),
            settings: Some(settings),
            tx,
        }
    }

    /// Start the worker. Ops pushed before this run in their coalesced order.
    pub fn start(&mut self) -> JoinHandle<()> {
        let settings = self.settings.take().expect("worker started twice");
        Worker::new(self.queue.clone(), self.tx.clone(), settings, self.cancel.clone()).spawn()
    }

    /// Collect messages until `done` holds for the collected list.
    pub async fn collect_until<F>(&mut self, done: F) -> Vec<UiMessage>
    where
        F: Fn(&[UiMessage]) -> bool,
    {
        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !done(&seen) {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(msg)) => seen.push(msg),
                Ok(None) => panic!("worker channel closed; saw {seen:?}"),
                Err(_) => panic!("timed out; saw {seen:?}"),
            }
        }
        seen
    }
}

pub fn statuses(messages: &[UiMessage]) -> Vec<nad_core::DeviceState> {
    messages
        .iter()
        .filter_map(|m| match m {
            UiMessage::Status(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}
