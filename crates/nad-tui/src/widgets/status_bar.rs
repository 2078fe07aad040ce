//! Bottom bar: input mode, key hints, and the last note.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{
    C_MODE_ADJUST, C_MODE_INPUT, C_MODE_NORMAL, C_MODE_SELECT, C_MUTED, C_SEPARATOR,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing an absolute volume.
    VolumeInput,
    /// `+`/`-` pressed; a pending volume waits for commit.
    VolumeAdjust,
    /// Picking a Spotify Connect device.
    DeviceSelection,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::VolumeInput => "VOLUME",
            Self::VolumeAdjust => "ADJUST",
            Self::DeviceSelection => "SELECT",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::VolumeInput => C_MODE_INPUT,
            Self::VolumeAdjust => C_MODE_ADJUST,
            Self::DeviceSelection => C_MODE_SELECT,
        }
    }

    pub fn key_hints(self) -> &'static str {
        match self {
            Self::Normal => {
                "p power  +/- vol  v set vol  s/S source  1-8 input  m mute  b/B dim  r refresh  d discover  c connect  t spotify  Tab view  ? help  q quit"
            }
            Self::VolumeInput => "type dB (-80..10)  Enter set  Esc cancel",
            Self::VolumeAdjust => "+/- adjust  Enter commit  Esc discard",
            Self::DeviceSelection => "↑↓/jk select  Enter transfer  Esc back",
        }
    }
}

pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default()
                .fg(mode.color())
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(mode.key_hints(), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
