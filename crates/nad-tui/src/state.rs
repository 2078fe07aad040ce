//! UI state and its reducer.
//!
//! [`UiState::update`] is the only place UI state changes. It takes a key press
//! or a worker message plus the current instant and returns the side effects
//! the app loop should perform, so every behavior here is testable without a
//! terminal or a receiver.

use std::time::{Duration, Instant};

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use nad_core::types::round_volume;
use nad_core::{Config, DeviceState, DiscoveredDevice, Direction, Endpoint, Source, VolumeLimits};
use nad_spotify::{Device as SpotifyDevice, Playback};

use crate::message::{DeviceOp, Effect, Severity, SpotifyCommand, UiMessage};
use crate::widgets::status_bar::InputMode;
use crate::widgets::toast::ToastManager;
use crate::widgets::volume_input::VolumeInput;

// ── Views ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Device,
    Discovery,
    Spotify,
    Logs,
}

impl View {
    pub const ALL: [View; 4] = [View::Device, View::Discovery, View::Spotify, View::Logs];

    pub fn title(self) -> &'static str {
        match self {
            View::Device => "Receiver",
            View::Discovery => "Discovery",
            View::Spotify => "Spotify",
            View::Logs => "Logs",
        }
    }

    fn index(self) -> usize {
        View::ALL.iter().position(|v| *v == self).unwrap_or(0)
    }

    pub fn next(self) -> View {
        View::ALL[(self.index() + 1) % View::ALL.len()]
    }

    pub fn prev(self) -> View {
        View::ALL[(self.index() + View::ALL.len() - 1) % View::ALL.len()]
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UiSettings {
    pub limits: VolumeLimits,
    pub volume_step: f64,
    /// Refresh the receiver when the last status is older than this.
    pub auto_refresh: Duration,
    /// Inactivity before a pending volume is committed.
    pub volume_commit: Duration,
    pub spotify_enabled: bool,
}

impl UiSettings {
    pub fn from_config(config: &Config, spotify_enabled: bool) -> Self {
        Self {
            limits: config.volume_limits(),
            volume_step: config.volume.step_db,
            auto_refresh: Duration::from_secs(config.ui.auto_refresh_secs),
            volume_commit: Duration::from_millis(config.ui.volume_commit_ms),
            spotify_enabled,
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self::from_config(&Config::default(), false)
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum UiEvent {
    Key(KeyEvent),
    Message(UiMessage),
}

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct UiState {
    pub settings: UiSettings,
    pub mode: InputMode,
    pub view: View,
    pub show_help: bool,

    pub connected: bool,
    pub endpoint: Option<Endpoint>,
    pub model: Option<String>,
    pub status: Option<DeviceState>,
    pub last_refresh: Option<Instant>,

    /// Volume shown while adjusting; not sent until committed.
    pub pending_volume: Option<f64>,
    pub adjust_deadline: Option<Instant>,
    pub volume_input: VolumeInput,

    pub devices: Vec<DiscoveredDevice>,
    pub devices_from_cache: bool,
    pub device_cursor: usize,
    pub discovering: bool,

    pub spotify_devices: Vec<SpotifyDevice>,
    pub spotify_cursor: usize,
    pub playback: Option<Playback>,

    /// Lines scrolled up from the newest log entry.
    pub log_scroll: usize,
    pub toasts: ToastManager,
}

impl UiState {
    pub fn new(settings: UiSettings) -> Self {
        Self {
            settings,
            mode: InputMode::Normal,
            view: View::Device,
            show_help: false,
            connected: false,
            endpoint: None,
            model: None,
            status: None,
            last_refresh: None,
            pending_volume: None,
            adjust_deadline: None,
            volume_input: VolumeInput::default(),
            devices: Vec::new(),
            devices_from_cache: false,
            device_cursor: 0,
            discovering: false,
            spotify_devices: Vec::new(),
            spotify_cursor: 0,
            playback: None,
            log_scroll: 0,
            toasts: ToastManager::new(),
        }
    }

    /// Volume to display: the pending value while adjusting, else the device's.
    pub fn display_volume(&self) -> Option<f64> {
        self.pending_volume
            .or_else(|| self.status.as_ref().map(|s| s.volume))
    }

    pub fn update(&mut self, event: UiEvent, now: Instant) -> Vec<Effect> {
        match event {
            UiEvent::Key(key) => self.on_key(key, now),
            UiEvent::Message(msg) => self.on_message(msg, now),
        }
    }

    fn note(&mut self, severity: Severity, text: impl Into<String>, now: Instant) {
        self.toasts.push(text, severity, now);
    }

    // ── Keys ─────────────────────────────────────────────────────────────────

    fn on_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Effect> {
        if key.kind != KeyEventKind::Press {
            return Vec::new();
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Effect::Quit];
        }
        if self.show_help {
            self.show_help = false;
            return Vec::new();
        }
        match self.mode {
            InputMode::Normal => self.on_normal_key(key, now),
            InputMode::VolumeInput => self.on_volume_input_key(key, now),
            InputMode::VolumeAdjust => self.on_adjust_key(key, now),
            InputMode::DeviceSelection => self.on_selection_key(key, now),
        }
    }

    fn on_normal_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Effect> {
        if let Some(effects) = self.on_view_key(key) {
            return effects;
        }
        let enqueue = |op| vec![Effect::Enqueue(op)];
        match key.code {
            KeyCode::Char('q') => vec![Effect::Quit],
            KeyCode::Tab => self.switch_view(self.view.next()),
            KeyCode::BackTab => self.switch_view(self.view.prev()),
            KeyCode::Char('?') => {
                self.show_help = true;
                Vec::new()
            }

            KeyCode::Char('p') => enqueue(DeviceOp::PowerToggle),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust(Direction::Up, now),
            KeyCode::Char('-') => self.adjust(Direction::Down, now),
            KeyCode::Char('v') => {
                self.volume_input.clear();
                self.mode = InputMode::VolumeInput;
                Vec::new()
            }
            KeyCode::Char('s') => enqueue(DeviceOp::SourceStep(Direction::Up)),
            KeyCode::Char('S') => enqueue(DeviceOp::SourceStep(Direction::Down)),
            KeyCode::Char(c @ '1'..='8') => {
                let idx = (c as usize) - ('1' as usize);
                enqueue(DeviceOp::SourceSet(Source::ALL[idx]))
            }
            KeyCode::Char('m') => enqueue(DeviceOp::MuteToggle),
            KeyCode::Char('b') => enqueue(DeviceOp::BrightnessStep(Direction::Up)),
            KeyCode::Char('B') => enqueue(DeviceOp::BrightnessStep(Direction::Down)),
            KeyCode::Char('r') => enqueue(DeviceOp::Refresh),
            KeyCode::Char('d') => self.start_discovery(false, now),
            KeyCode::Char('D') => self.start_discovery(true, now),
            KeyCode::Char('c') => enqueue(DeviceOp::Connect(None)),

            KeyCode::Char('t') => {
                if !self.spotify_available(now) {
                    return Vec::new();
                }
                self.view = View::Spotify;
                self.mode = InputMode::DeviceSelection;
                vec![Effect::Spotify(SpotifyCommand::RefreshDevices)]
            }
            KeyCode::Char(' ') => self.spotify(SpotifyCommand::PlayPause, now),
            KeyCode::Char('n') => self.spotify(SpotifyCommand::Next, now),
            KeyCode::Char('N') => self.spotify(SpotifyCommand::Previous, now),
            _ => Vec::new(),
        }
    }

    /// Keys that mean something only in the current view.
    fn on_view_key(&mut self, key: KeyEvent) -> Option<Vec<Effect>> {
        match (self.view, key.code) {
            (View::Discovery, KeyCode::Up | KeyCode::Char('k')) => {
                self.device_cursor = self.device_cursor.saturating_sub(1);
                Some(Vec::new())
            }
            (View::Discovery, KeyCode::Down | KeyCode::Char('j')) => {
                self.device_cursor = step_cursor(self.device_cursor, self.devices.len());
                Some(Vec::new())
            }
            (View::Discovery, KeyCode::Enter) => {
                let endpoint = self.devices.get(self.device_cursor)?.endpoint();
                Some(vec![Effect::Enqueue(DeviceOp::Connect(Some(endpoint)))])
            }
            (View::Logs, code) => {
                self.log_scroll = match code {
                    KeyCode::Up | KeyCode::Char('k') => self.log_scroll.saturating_add(1),
                    KeyCode::Down | KeyCode::Char('j') => self.log_scroll.saturating_sub(1),
                    KeyCode::PageUp => self.log_scroll.saturating_add(10),
                    KeyCode::PageDown => self.log_scroll.saturating_sub(10),
                    KeyCode::Home | KeyCode::Char('g') => usize::MAX,
                    KeyCode::End | KeyCode::Char('G') => 0,
                    _ => return None,
                };
                Some(Vec::new())
            }
            _ => None,
        }
    }

    fn on_volume_input_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Effect> {
        match key.code {
            KeyCode::Enter => match self.volume_input.parse(&self.settings.limits) {
                Ok(db) => {
                    self.mode = InputMode::Normal;
                    self.volume_input.clear();
                    vec![Effect::Enqueue(DeviceOp::VolumeSet(db))]
                }
                Err(msg) => {
                    self.note(Severity::Error, msg, now);
                    Vec::new()
                }
            },
            KeyCode::Esc => {
                self.mode = InputMode::Normal;
                self.volume_input.clear();
                Vec::new()
            }
            _ => {
                self.volume_input.handle_key(key);
                Vec::new()
            }
        }
    }

    fn on_adjust_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Effect> {
        match key.code {
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust(Direction::Up, now),
            KeyCode::Char('-') => self.adjust(Direction::Down, now),
            KeyCode::Enter => self.commit_volume(),
            KeyCode::Esc => {
                self.discard_volume();
                Vec::new()
            }
            _ => {
                let mut effects = self.commit_volume();
                effects.extend(self.on_normal_key(key, now));
                effects
            }
        }
    }

    fn on_selection_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Effect> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.spotify_cursor = self.spotify_cursor.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.spotify_cursor = step_cursor(self.spotify_cursor, self.spotify_devices.len());
                Vec::new()
            }
            KeyCode::Char('r') => vec![Effect::Spotify(SpotifyCommand::RefreshDevices)],
            KeyCode::Enter => {
                let Some(device) = self.spotify_devices.get(self.spotify_cursor) else {
                    return Vec::new();
                };
                match device.id.clone() {
                    Some(id) => {
                        let name = device.name.clone();
                        self.mode = InputMode::Normal;
                        self.note(Severity::Info, format!("Transferring playback to {name}"), now);
                        vec![Effect::Spotify(SpotifyCommand::Transfer(id))]
                    }
                    None => {
                        let name = device.name.clone();
                        self.note(Severity::Warning, format!("{name} cannot be controlled"), now);
                        Vec::new()
                    }
                }
            }
            KeyCode::Esc => {
                self.mode = InputMode::Normal;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    // ── Volume adjust ────────────────────────────────────────────────────────

    fn adjust(&mut self, direction: Direction, now: Instant) -> Vec<Effect> {
        let Some(base) = self.display_volume() else {
            // No known volume to start from; let the receiver step itself.
            return vec![Effect::Enqueue(DeviceOp::VolumeStep(direction))];
        };
        let next = round_volume(base + direction.sign() * self.settings.volume_step);
        self.pending_volume = Some(self.settings.limits.clamp(next));
        self.adjust_deadline = Some(now + self.settings.volume_commit);
        self.mode = InputMode::VolumeAdjust;
        Vec::new()
    }

    fn commit_volume(&mut self) -> Vec<Effect> {
        self.mode = InputMode::Normal;
        self.adjust_deadline = None;
        match self.pending_volume.take() {
            Some(db) => {
                if let Some(status) = self.status.as_mut() {
                    status.volume = db;
                }
                vec![Effect::Enqueue(DeviceOp::VolumeSet(db))]
            }
            None => Vec::new(),
        }
    }

    fn discard_volume(&mut self) {
        self.mode = InputMode::Normal;
        self.adjust_deadline = None;
        self.pending_volume = None;
    }

    fn adjust_expired(&self, now: Instant) -> bool {
        self.mode == InputMode::VolumeAdjust && self.adjust_deadline.is_some_and(|d| now >= d)
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn switch_view(&mut self, view: View) -> Vec<Effect> {
        self.view = view;
        if view == View::Spotify && self.settings.spotify_enabled {
            return vec![
                Effect::Spotify(SpotifyCommand::RefreshPlayback),
                Effect::Spotify(SpotifyCommand::RefreshDevices),
            ];
        }
        Vec::new()
    }

    fn start_discovery(&mut self, refresh: bool, now: Instant) -> Vec<Effect> {
        if self.discovering {
            self.note(Severity::Info, "Discovery already running", now);
            return Vec::new();
        }
        self.discovering = true;
        self.note(Severity::Info, "Scanning for receivers...", now);
        vec![Effect::Enqueue(DeviceOp::Discover { refresh })]
    }

    fn spotify_available(&mut self, now: Instant) -> bool {
        if !self.settings.spotify_enabled {
            self.note(Severity::Warning, "Spotify is not configured", now);
        }
        self.settings.spotify_enabled
    }

    fn spotify(&mut self, cmd: SpotifyCommand, now: Instant) -> Vec<Effect> {
        if self.spotify_available(now) {
            vec![Effect::Spotify(cmd)]
        } else {
            Vec::new()
        }
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    fn on_message(&mut self, msg: UiMessage, now: Instant) -> Vec<Effect> {
        match msg {
            UiMessage::Tick => {
                self.toasts.tick(now);
                let mut effects = Vec::new();
                if self.adjust_expired(now) {
                    effects.extend(self.commit_volume());
                }
                let stale = self
                    .last_refresh
                    .map_or(true, |at| now.saturating_duration_since(at) >= self.settings.auto_refresh);
                if self.connected && stale {
                    effects.push(Effect::Enqueue(DeviceOp::Refresh));
                }
                effects
            }
            UiMessage::PendingVolumeTimeout => {
                if self.adjust_expired(now) {
                    self.commit_volume()
                } else {
                    Vec::new()
                }
            }
            UiMessage::Connected { endpoint, model } => {
                self.note(Severity::Success, format!("Connected to {model} at {endpoint}"), now);
                self.connected = true;
                self.endpoint = Some(endpoint);
                self.model = Some(model).filter(|m| !m.is_empty());
                Vec::new()
            }
            UiMessage::ConnectFailed(reason) => {
                self.connected = false;
                self.note(Severity::Error, format!("Connect failed: {reason}"), now);
                Vec::new()
            }
            UiMessage::Disconnected(reason) => {
                self.connected = false;
                self.last_refresh = None;
                tracing::debug!("Disconnected: {}", reason);
                self.note(Severity::Warning, "Connection lost, press c to reconnect", now);
                Vec::new()
            }
            UiMessage::Status(state) => {
                if !state.model.is_empty() {
                    self.model = Some(state.model.clone());
                }
                self.status = Some(state);
                self.last_refresh = Some(now);
                self.connected = true;
                Vec::new()
            }
            UiMessage::Note { severity, text } => {
                self.note(severity, text, now);
                Vec::new()
            }
            UiMessage::Discovered {
                devices,
                from_cache,
            } => {
                self.discovering = false;
                let text = match devices.len() {
                    0 => "No receivers found".to_string(),
                    n => format!(
                        "Found {} receiver{}{}",
                        n,
                        if n == 1 { "" } else { "s" },
                        if from_cache { " (cached)" } else { "" }
                    ),
                };
                let severity = if devices.is_empty() {
                    Severity::Warning
                } else {
                    Severity::Info
                };
                self.note(severity, text, now);
                self.devices = devices;
                self.devices_from_cache = from_cache;
                self.device_cursor = self.device_cursor.min(self.devices.len().saturating_sub(1));
                Vec::new()
            }
            UiMessage::SpotifyDevices(devices) => {
                self.spotify_devices = devices;
                self.spotify_cursor = self
                    .spotify_cursor
                    .min(self.spotify_devices.len().saturating_sub(1));
                Vec::new()
            }
            UiMessage::SpotifyPlayback(playback) => {
                self.playback = playback;
                Vec::new()
            }
        }
    }
}

fn step_cursor(cursor: usize, len: usize) -> usize {
    (cursor + 1).min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nad_core::{Mute, Power};

    fn key(code: KeyCode) -> UiEvent {
        UiEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ch(c: char) -> UiEvent {
        key(KeyCode::Char(c))
    }

    fn status(volume: f64) -> DeviceState {
        DeviceState {
            power: Power::On,
            volume,
            source: Source::Stream,
            mute: Mute::Off,
            brightness: 2,
            model: "NAD T 758 V3i".into(),
        }
    }

    fn connected_state(now: Instant) -> UiState {
        let mut state = UiState::new(UiSettings::default());
        state.update(UiEvent::Message(UiMessage::Status(status(-30.0))), now);
        state
    }

    #[test]
    fn normal_keys_dispatch_ops() {
        let now = Instant::now();
        let mut state = UiState::new(UiSettings::default());
        assert_eq!(
            state.update(ch('p'), now),
            vec![Effect::Enqueue(DeviceOp::PowerToggle)]
        );
        assert_eq!(
            state.update(ch('3'), now),
            vec![Effect::Enqueue(DeviceOp::SourceSet(Source::Tv))]
        );
        assert_eq!(
            state.update(ch('S'), now),
            vec![Effect::Enqueue(DeviceOp::SourceStep(Direction::Down))]
        );
        assert_eq!(
            state.update(ch('B'), now),
            vec![Effect::Enqueue(DeviceOp::BrightnessStep(Direction::Down))]
        );
        assert_eq!(state.update(ch('q'), now), vec![Effect::Quit]);
        assert_eq!(
            state.update(
                UiEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
                now
            ),
            vec![Effect::Quit]
        );
    }

    #[test]
    fn tab_only_switches_view() {
        let now = Instant::now();
        let mut state = UiState::new(UiSettings::default());
        assert!(state.update(key(KeyCode::Tab), now).is_empty());
        assert_eq!(state.view, View::Discovery);
        assert!(state.update(key(KeyCode::BackTab), now).is_empty());
        assert!(state.update(key(KeyCode::BackTab), now).is_empty());
        assert_eq!(state.view, View::Logs);
    }

    #[test]
    fn adjust_commits_once_after_inactivity() {
        let t0 = Instant::now();
        let mut state = connected_state(t0);
        for _ in 0..3 {
            assert!(state.update(ch('+'), t0).is_empty());
        }
        assert_eq!(state.mode, InputMode::VolumeAdjust);
        assert_eq!(state.display_volume(), Some(-27.0));

        assert!(state
            .update(UiEvent::Message(UiMessage::Tick), t0 + Duration::from_millis(1999))
            .is_empty());
        let effects = state.update(UiEvent::Message(UiMessage::Tick), t0 + Duration::from_secs(2));
        assert_eq!(effects, vec![Effect::Enqueue(DeviceOp::VolumeSet(-27.0))]);
        assert_eq!(state.mode, InputMode::Normal);
        assert!(state
            .update(UiEvent::Message(UiMessage::PendingVolumeTimeout), t0 + Duration::from_secs(3))
            .is_empty());
    }

    #[test]
    fn each_adjust_key_resets_the_deadline() {
        let t0 = Instant::now();
        let mut state = connected_state(t0);
        state.update(ch('-'), t0);
        state.update(ch('-'), t0 + Duration::from_millis(1500));
        let effects = state.update(
            UiEvent::Message(UiMessage::PendingVolumeTimeout),
            t0 + Duration::from_millis(2500),
        );
        assert!(effects.is_empty());
        let effects = state.update(
            UiEvent::Message(UiMessage::PendingVolumeTimeout),
            t0 + Duration::from_millis(3500),
        );
        assert_eq!(effects, vec![Effect::Enqueue(DeviceOp::VolumeSet(-32.0))]);
    }

    #[test]
    fn adjust_is_clamped_to_the_ceiling() {
        let t0 = Instant::now();
        let mut state = UiState::new(UiSettings::default());
        state.update(UiEvent::Message(UiMessage::Status(status(9.5))), t0);
        state.update(ch('+'), t0);
        state.update(ch('+'), t0);
        assert_eq!(state.display_volume(), Some(10.0));
        assert_eq!(
            state.update(key(KeyCode::Enter), t0),
            vec![Effect::Enqueue(DeviceOp::VolumeSet(10.0))]
        );
    }

    #[test]
    fn escape_discards_pending_volume() {
        let t0 = Instant::now();
        let mut state = connected_state(t0);
        state.update(ch('+'), t0);
        assert!(state.update(key(KeyCode::Esc), t0).is_empty());
        assert_eq!(state.display_volume(), Some(-30.0));
        assert!(state
            .update(UiEvent::Message(UiMessage::Tick), t0 + Duration::from_secs(5))
            .iter()
            .all(|e| !matches!(e, Effect::Enqueue(DeviceOp::VolumeSet(_)))));
    }

    #[test]
    fn other_key_commits_then_runs() {
        let t0 = Instant::now();
        let mut state = connected_state(t0);
        state.update(ch('-'), t0);
        assert_eq!(
            state.update(ch('m'), t0),
            vec![
                Effect::Enqueue(DeviceOp::VolumeSet(-31.0)),
                Effect::Enqueue(DeviceOp::MuteToggle),
            ]
        );
    }

    #[test]
    fn volume_input_validates() {
        let t0 = Instant::now();
        let mut state = connected_state(t0);
        state.update(ch('v'), t0);
        assert_eq!(state.mode, InputMode::VolumeInput);
        for c in "12".chars() {
            state.update(ch(c), t0);
        }
        assert!(state.update(key(KeyCode::Enter), t0).is_empty());
        assert_eq!(state.mode, InputMode::VolumeInput);
        assert_eq!(state.toasts.latest().unwrap().severity, Severity::Error);

        state.update(key(KeyCode::Backspace), t0);
        state.update(key(KeyCode::Backspace), t0);
        for c in "-22.5".chars() {
            state.update(ch(c), t0);
        }
        assert_eq!(
            state.update(key(KeyCode::Enter), t0),
            vec![Effect::Enqueue(DeviceOp::VolumeSet(-22.5))]
        );
        assert_eq!(state.mode, InputMode::Normal);
    }

    #[test]
    fn auto_refresh_after_interval() {
        let t0 = Instant::now();
        let mut state = connected_state(t0);
        assert!(state
            .update(UiEvent::Message(UiMessage::Tick), t0 + Duration::from_secs(9))
            .is_empty());
        assert_eq!(
            state.update(UiEvent::Message(UiMessage::Tick), t0 + Duration::from_secs(10)),
            vec![Effect::Enqueue(DeviceOp::Refresh)]
        );
    }

    #[test]
    fn disconnect_stops_auto_refresh_but_keeps_input() {
        let t0 = Instant::now();
        let mut state = connected_state(t0);
        state.update(
            UiEvent::Message(UiMessage::Disconnected("reset by peer".into())),
            t0,
        );
        assert!(!state.connected);
        assert!(state
            .update(UiEvent::Message(UiMessage::Tick), t0 + Duration::from_secs(60))
            .is_empty());
        assert_eq!(
            state.update(ch('c'), t0),
            vec![Effect::Enqueue(DeviceOp::Connect(None))]
        );
    }

    #[test]
    fn spotify_keys_need_configuration() {
        let t0 = Instant::now();
        let mut state = UiState::new(UiSettings::default());
        assert!(state.update(ch(' '), t0).is_empty());
        assert!(state.update(ch('t'), t0).is_empty());
        assert_eq!(state.mode, InputMode::Normal);
        assert_eq!(state.toasts.latest().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn device_selection_transfers() {
        let t0 = Instant::now();
        let settings = UiSettings {
            spotify_enabled: true,
            ..UiSettings::default()
        };
        let mut state = UiState::new(settings);
        assert_eq!(
            state.update(ch('t'), t0),
            vec![Effect::Spotify(SpotifyCommand::RefreshDevices)]
        );
        assert_eq!(state.mode, InputMode::DeviceSelection);

        let device = |id: &str, name: &str| SpotifyDevice {
            id: Some(id.into()),
            name: name.into(),
            device_type: "Speaker".into(),
            is_active: false,
            volume_percent: None,
        };
        state.update(
            UiEvent::Message(UiMessage::SpotifyDevices(vec![
                device("a", "Kitchen"),
                device("b", "NAD"),
            ])),
            t0,
        );
        state.update(key(KeyCode::Down), t0);
        state.update(key(KeyCode::Down), t0);
        assert_eq!(state.spotify_cursor, 1);
        assert_eq!(
            state.update(key(KeyCode::Enter), t0),
            vec![Effect::Spotify(SpotifyCommand::Transfer("b".into()))]
        );
        assert_eq!(state.mode, InputMode::Normal);
    }

    #[test]
    fn discovery_view_connects_to_selected_device() {
        let t0 = Instant::now();
        let mut state = UiState::new(UiSettings::default());
        assert_eq!(
            state.update(ch('d'), t0),
            vec![Effect::Enqueue(DeviceOp::Discover { refresh: false })]
        );
        assert!(state.update(ch('d'), t0).is_empty());
        state.update(
            UiEvent::Message(UiMessage::Discovered {
                devices: vec![
                    DiscoveredDevice::new("10.0.0.2", 30001, "NAD C 338"),
                    DiscoveredDevice::new("10.0.0.9", 30001, "NAD T 758"),
                ],
                from_cache: false,
            }),
            t0,
        );
        assert!(!state.discovering);
        state.update(key(KeyCode::Tab), t0);
        state.update(ch('j'), t0);
        assert_eq!(
            state.update(key(KeyCode::Enter), t0),
            vec![Effect::Enqueue(DeviceOp::Connect(Some(Endpoint::new(
                "10.0.0.9", 30001
            ))))]
        );
    }

    #[test]
    fn help_swallows_next_key() {
        let t0 = Instant::now();
        let mut state = UiState::new(UiSettings::default());
        state.update(ch('?'), t0);
        assert!(state.show_help);
        assert!(state.update(ch('p'), t0).is_empty());
        assert!(!state.show_help);
    }
}
