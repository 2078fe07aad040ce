use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tracing::Level;

use crate::log_buffer::LogBuffer;
use crate::state::UiState;
use crate::theme::{style_border, style_muted, C_PRIMARY, C_SECONDARY, C_TOAST_ERROR, C_TOAST_WARNING};

pub fn draw(frame: &mut Frame, area: Rect, state: &UiState, logs: &LogBuffer) {
    let entries = logs.entries();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border(true))
        .title(format!(" Logs ({}) ", entries.len()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if entries.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled("  no log entries yet", style_muted())),
            inner,
        );
        return;
    }

    // `log_scroll` counts lines up from the newest entry.
    let height = inner.height as usize;
    let max_scroll = entries.len().saturating_sub(height);
    let from_bottom = state.log_scroll.min(max_scroll);
    let start = entries.len().saturating_sub(height + from_bottom);

    let lines: Vec<Line> = entries
        .iter()
        .skip(start)
        .take(height)
        .map(|entry| {
            let color = match entry.level {
                Level::ERROR => C_TOAST_ERROR,
                Level::WARN => C_TOAST_WARNING,
                Level::INFO => C_PRIMARY,
                _ => C_SECONDARY,
            };
            Line::from(vec![
                Span::styled(format!(" {} ", entry.time), style_muted()),
                Span::styled(format!("{:<5} ", entry.level), Style::default().fg(color)),
                Span::styled(entry.message.clone(), Style::default().fg(color)),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}
