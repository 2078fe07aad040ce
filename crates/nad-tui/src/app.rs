//! Terminal setup and the cooperative UI loop.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nad_core::Config;
use nad_spotify::{Credentials, SpotifyClient};

use crate::log_buffer::LogBuffer;
use crate::message::{DeviceOp, Effect, SpotifyCommand, UiMessage};
use crate::queue::CommandQueue;
use crate::spotify;
use crate::state::{UiEvent, UiSettings, UiState, View};
use crate::views;
use crate::worker::{Worker, WorkerSettings};

const TICK: Duration = Duration::from_millis(250);
const SPOTIFY_POLL: Duration = Duration::from_secs(5);
const MAX_DRAIN: usize = 64;

pub struct App {
    state: UiState,
    queue: Arc<CommandQueue>,
    spotify: Option<Arc<SpotifyClient>>,
    logs: LogBuffer,
    cancel: CancellationToken,
    should_quit: bool,
}

impl App {
    pub fn new(config: &Config, logs: LogBuffer) -> Self {
        let credentials = Credentials {
            client_id: config.spotify.client_id.clone(),
            client_secret: config.spotify.client_secret.clone(),
            refresh_token: config.spotify.refresh_token.clone(),
            access_token: config.spotify.access_token.clone(),
        };
        let spotify = credentials
            .is_configured()
            .then(|| Arc::new(SpotifyClient::new(credentials)));
        Self {
            state: UiState::new(UiSettings::from_config(config, spotify.is_some())),
            queue: Arc::new(CommandQueue::new()),
            spotify,
            logs,
            cancel: CancellationToken::new(),
            should_quit: false,
        }
    }

    pub async fn run(mut self, config: &Config) -> anyhow::Result<()> {
        let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiMessage>();
        let worker = Worker::new(
            self.queue.clone(),
            ui_tx.clone(),
            WorkerSettings::from_config(config),
            self.cancel.clone(),
        )
        .spawn();

        if config.endpoint().is_some() {
            self.queue.push(DeviceOp::Connect(None));
        } else {
            info!("No receiver configured, discovering");
            self.state.discovering = true;
            self.queue.push(DeviceOp::Discover { refresh: false });
        }

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("Terminal ready, size={:?}", terminal.size());

        let result = self.event_loop(&mut terminal, ui_tx, ui_rx).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        self.cancel.cancel();
        if tokio::time::timeout(Duration::from_secs(1), worker).await.is_err() {
            warn!("Device worker did not stop in time");
        }
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        ui_tx: mpsc::UnboundedSender<UiMessage>,
        mut ui_rx: mpsc::UnboundedReceiver<UiMessage>,
    ) -> anyhow::Result<()> {
        let (event_tx, mut event_rx) = mpsc::channel::<Event>(256);
        let reader_cancel = self.cancel.clone();
        // Polls so the thread notices shutdown instead of blocking in read().
        tokio::task::spawn_blocking(move || loop {
            if reader_cancel.is_cancelled() {
                break;
            }
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if event_tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        });

        let mut tick = tokio::time::interval(TICK);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut spotify_poll = tokio::time::interval(SPOTIFY_POLL);
        spotify_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| views::draw(f, &self.state, &self.logs))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            let deadline = self.state.adjust_deadline;
            let polling = self.spotify.is_some() && self.state.view == View::Spotify;

            tokio::select! {
                Some(ev) = event_rx.recv() => {
                    needs_redraw = self.handle_terminal_event(ev, &ui_tx);
                }

                Some(msg) = ui_rx.recv() => {
                    self.handle(UiEvent::Message(msg), &ui_tx);
                    let mut drained = 0;
                    while drained < MAX_DRAIN {
                        let Ok(next) = ui_rx.try_recv() else { break };
                        self.handle(UiEvent::Message(next), &ui_tx);
                        drained += 1;
                    }
                    needs_redraw = true;
                }

                _ = tick.tick() => {
                    self.handle(UiEvent::Message(UiMessage::Tick), &ui_tx);
                    // Also repaints the Logs view as entries arrive.
                    needs_redraw = true;
                }

                _ = spotify_poll.tick(), if polling => {
                    self.apply(vec![Effect::Spotify(SpotifyCommand::RefreshPlayback)], &ui_tx);
                }

                _ = tokio::time::sleep_until(
                    deadline
                        .map(tokio::time::Instant::from_std)
                        .unwrap_or_else(tokio::time::Instant::now)
                ), if deadline.is_some() => {
                    self.handle(UiEvent::Message(UiMessage::PendingVolumeTimeout), &ui_tx);
                    needs_redraw = true;
                }
            }
        }
        Ok(())
    }

    fn handle_terminal_event(&mut self, ev: Event, ui_tx: &mpsc::UnboundedSender<UiMessage>) -> bool {
        match ev {
            Event::Key(key) => {
                self.handle(UiEvent::Key(key), ui_tx);
                true
            }
            Event::Resize(_, _) => true,
            _ => false,
        }
    }

    fn handle(&mut self, event: UiEvent, ui_tx: &mpsc::UnboundedSender<UiMessage>) {
        let effects = self.state.update(event, Instant::now());
        self.apply(effects, ui_tx);
    }

    fn apply(&mut self, effects: Vec<Effect>, ui_tx: &mpsc::UnboundedSender<UiMessage>) {
        for effect in effects {
            match effect {
                Effect::Enqueue(op) => {
                    if self.queue.push(op.clone()).is_none() {
                        debug!("{} coalesced away", op);
                    }
                }
                Effect::Spotify(cmd) => {
                    let Some(client) = self.spotify.clone() else {
                        continue;
                    };
                    let tx = ui_tx.clone();
                    tokio::spawn(async move {
                        for msg in spotify::execute(&client, cmd).await {
                            if tx.send(msg).is_err() {
                                break;
                            }
                        }
                    });
                }
                Effect::Quit => {
                    info!("Quit requested");
                    self.should_quit = true;
                }
            }
        }
    }
}

/// Run the TUI until the user quits.
pub async fn run(config: Config, logs: LogBuffer) -> anyhow::Result<()> {
    App::new(&config, logs).run(&config).await
}
