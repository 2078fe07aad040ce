use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::state::UiState;
use crate::theme::{style_border, style_default, style_muted, style_secondary, style_selected, C_SPOTIFY};
use crate::widgets::status_bar::InputMode;

pub fn draw(frame: &mut Frame, area: Rect, state: &UiState) {
    if !state.settings.spotify_enabled {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Spotify is not configured. Add a [spotify] section to the config file.",
                style_muted(),
            ))
            .block(Block::default().borders(Borders::ALL).border_style(style_border(false))),
            area,
        );
        return;
    }

    let [now_playing, devices] =
        Layout::vertical([Constraint::Length(5), Constraint::Min(3)]).areas(area);
    draw_playback(frame, now_playing, state);
    draw_devices(frame, devices, state);
}

fn draw_playback(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border(state.mode != InputMode::DeviceSelection))
        .title(" Now playing ");

    let lines = match state.playback.as_ref() {
        None => vec![Line::from(Span::styled("nothing playing", style_muted()))],
        Some(playback) => {
            let icon = if playback.is_playing { "▶" } else { "⏸" };
            let (title, artist) = playback
                .item
                .as_ref()
                .map(|t| (t.name.clone(), t.artist_line()))
                .unwrap_or_default();
            let device = playback
                .device
                .as_ref()
                .map(|d| d.name.clone())
                .unwrap_or_default();
            vec![
                Line::from(vec![
                    Span::styled(format!(" {icon} "), Style::default().fg(C_SPOTIFY)),
                    Span::styled(title, style_default().add_modifier(Modifier::BOLD)),
                ]),
                Line::from(Span::styled(format!("   {artist}"), style_secondary())),
                Line::from(Span::styled(format!("   on {device}"), style_muted())),
            ]
        }
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_devices(frame: &mut Frame, area: Rect, state: &UiState) {
    let selecting = state.mode == InputMode::DeviceSelection;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border(selecting))
        .title(" Connect devices (t select) ");

    let items: Vec<ListItem> = state
        .spotify_devices
        .iter()
        .map(|d| {
            let marker = if d.is_active { "● " } else { "  " };
            let volume = d
                .volume_percent
                .map(|v| format!(" {v}%"))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {marker}"), Style::default().fg(C_SPOTIFY)),
                Span::styled(d.name.clone(), style_default()),
                Span::styled(format!("  {}{}", d.device_type, volume), style_muted()),
            ]))
        })
        .collect();

    let mut list_state = ListState::default();
    if selecting {
        list_state.select(Some(state.spotify_cursor));
    }
    frame.render_stateful_widget(
        List::new(items).block(block).highlight_style(style_selected()),
        area,
        &mut list_state,
    );
}
