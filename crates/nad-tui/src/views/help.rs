use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::centered_rect;
use crate::theme::{style_border, C_MUTED, C_PRIMARY, C_SECONDARY};

pub fn draw(frame: &mut Frame, area: Rect) {
    let lines = vec![
        section("receiver"),
        help_row("p", "power on / standby"),
        help_row("+ / = / -", "adjust volume (commits after 2s, Enter now, Esc discard)"),
        help_row("v", "type an exact volume in dB"),
        help_row("s / S", "next / previous source"),
        help_row("1 - 8", "select source directly"),
        help_row("m", "mute"),
        help_row("b / B", "display brightness up / down"),
        help_row("r", "refresh status"),
        Line::from(""),
        section("connection"),
        help_row("c", "connect to the configured receiver"),
        help_row("d / D", "discover (D ignores the cache)"),
        help_row("enter", "connect to the selected receiver (Discovery view)"),
        Line::from(""),
        section("spotify"),
        help_row("space", "play / pause"),
        help_row("n / N", "next / previous track"),
        help_row("t", "choose a Connect device"),
        Line::from(""),
        section("general"),
        help_row("tab / shift-tab", "switch view"),
        help_row("↑ ↓ / j k", "move selection, scroll logs"),
        help_row("q / ctrl-c", "quit"),
    ];

    let popup = centered_rect(70, lines.len() as u16 + 2, area);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(style_border(true))
                .title(" keys (any key closes) "),
        ),
        popup,
    );
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        format!(" {title}"),
        Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
    ))
}

fn help_row<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{:<16}", key),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc, Style::default().fg(C_SECONDARY)),
    ])
}
