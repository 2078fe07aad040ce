//! Frame layout: header, active view, key bar, and overlays.

mod device;
mod discovery;
mod help;
mod logs;
mod spotify;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::log_buffer::LogBuffer;
use crate::state::{UiState, View};
use crate::theme::{style_muted, style_off, style_on, style_secondary, C_PRIMARY};
use crate::widgets::status_bar::{draw_keys_bar, draw_separator, InputMode};

pub fn draw(frame: &mut Frame, state: &UiState, logs: &LogBuffer) {
    let [header, sep_top, body, sep_bottom, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, header, state);
    draw_separator(frame, sep_top);
    match state.view {
        View::Device => device::draw(frame, body, state),
        View::Discovery => discovery::draw(frame, body, state),
        View::Spotify => spotify::draw(frame, body, state),
        View::Logs => logs::draw(frame, body, state, logs),
    }
    draw_separator(frame, sep_bottom);
    if state.mode == InputMode::VolumeInput {
        state.volume_input.draw(frame, footer);
    } else {
        draw_keys_bar(frame, footer, state.mode);
    }

    state.toasts.draw(frame, body);
    if state.show_help {
        help::draw(frame, frame.area());
    }
}

fn draw_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let mut spans = vec![Span::styled(
        " nadctl ",
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
    )];

    if state.connected {
        spans.push(Span::styled("●", style_on()));
    } else {
        spans.push(Span::styled("○", style_off()));
    }
    spans.push(Span::raw(" "));
    let target = match (&state.model, &state.endpoint) {
        (Some(model), Some(ep)) => format!("{model} @ {ep}"),
        (None, Some(ep)) => ep.to_string(),
        _ if state.discovering => "searching...".to_string(),
        _ => "no receiver".to_string(),
    };
    spans.push(Span::styled(target, style_secondary()));
    spans.push(Span::raw("   "));

    for view in View::ALL {
        let style = if view == state.view {
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            style_muted()
        };
        spans.push(Span::styled(view.title(), style));
        spans.push(Span::raw("  "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// A `width`% by `height` rows rectangle centered in `r`.
fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(height),
        Constraint::Min(0),
    ])
    .areas(r);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
