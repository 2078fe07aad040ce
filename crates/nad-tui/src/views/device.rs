use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, LineGauge, List, ListItem, Paragraph},
    Frame,
};

use nad_core::types::{format_volume, MAX_BRIGHTNESS};
use nad_core::{Mute, Power, Source};

use crate::state::UiState;
use crate::theme::{
    style_border, style_default, style_muted, style_off, style_on, style_pending, style_secondary,
    style_selected, C_GAUGE, C_MUTED,
};
use crate::widgets::status_bar::InputMode;

pub fn draw(frame: &mut Frame, area: Rect, state: &UiState) {
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(area);
    draw_status(frame, left, state);
    draw_sources(frame, right, state);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border(true))
        .title(" Receiver ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(status) = state.status.as_ref() else {
        let hint = if state.connected {
            "waiting for status..."
        } else {
            "not connected (c connect, d discover)"
        };
        frame.render_widget(Paragraph::new(Span::styled(hint, style_muted())), inner);
        return;
    };

    let adjusting = state.mode == InputMode::VolumeAdjust;
    let volume = state.display_volume().unwrap_or(status.volume);
    let volume_span = if adjusting {
        Span::styled(format!("{} dB (pending)", format_volume(volume)), style_pending())
    } else {
        Span::styled(format!("{} dB", format_volume(volume)), style_default())
    };

    let power_span = match status.power {
        Power::On => Span::styled("● on", style_on()),
        Power::Off => Span::styled("○ standby", style_off()),
        Power::Unknown => Span::styled("?", style_muted()),
    };
    let mute_span = match status.mute {
        Mute::On => Span::styled("muted", style_off()),
        Mute::Off => Span::styled("off", style_default()),
        Mute::Unknown => Span::styled("?", style_muted()),
    };
    let dots: String = (1..=MAX_BRIGHTNESS)
        .map(|level| if level <= status.brightness { '●' } else { '○' })
        .collect();

    let lines = vec![
        row("Power", power_span),
        row("Volume", volume_span),
        row("Source", Span::styled(status.source.name(), style_default())),
        row("Mute", mute_span),
        row(
            "Display",
            Span::styled(
                format!("{} {}/{}", dots, status.brightness, MAX_BRIGHTNESS),
                style_default(),
            ),
        ),
    ];

    let [text_area, _, gauge_area] = Layout::vertical([
        Constraint::Length(lines.len() as u16),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);
    frame.render_widget(Paragraph::new(lines), text_area);

    let limits = &state.settings.limits;
    let span = (limits.max_db - limits.min_db).max(f64::EPSILON);
    let ratio = ((volume - limits.min_db) / span).clamp(0.0, 1.0);
    let filled = if adjusting { style_pending() } else { Style::default().fg(C_GAUGE) };
    frame.render_widget(
        LineGauge::default()
            .ratio(ratio)
            .label("")
            .filled_style(filled)
            .unfilled_style(Style::default().fg(C_MUTED)),
        gauge_area,
    );
}

fn draw_sources(frame: &mut Frame, area: Rect, state: &UiState) {
    let current = state.status.as_ref().map(|s| s.source);
    let items: Vec<ListItem> = Source::ALL
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let line = Line::from(vec![
                Span::styled(format!(" {} ", i + 1), style_muted()),
                Span::raw(source.name()),
            ]);
            if Some(*source) == current {
                ListItem::new(line).style(style_selected())
            } else {
                ListItem::new(line).style(style_secondary())
            }
        })
        .collect();
    frame.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(style_border(false))
                .title(" Sources "),
        ),
        area,
    );
}

fn row<'a>(label: &'a str, value: Span<'a>) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {:<9}", label), style_secondary()),
        value,
    ])
}
