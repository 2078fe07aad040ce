//! Transient notes shown in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::message::Severity;
use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub severity: Severity,
    expires: Instant,
}

#[derive(Debug)]
pub struct ToastManager {
    toasts: VecDeque<Toast>,
    max_visible: usize,
}

impl Severity {
    /// How long a note of this severity stays on screen.
    pub fn duration(self) -> Duration {
        match self {
            Severity::Info | Severity::Success => Duration::from_secs(3),
            Severity::Warning => Duration::from_secs(4),
            Severity::Error => Duration::from_secs(5),
        }
    }

    fn color(self) -> ratatui::style::Color {
        match self {
            Severity::Info => C_TOAST_INFO,
            Severity::Success => C_TOAST_SUCCESS,
            Severity::Warning => C_TOAST_WARNING,
            Severity::Error => C_TOAST_ERROR,
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Severity::Info => "·",
            Severity::Success => "✓",
            Severity::Warning => "!",
            Severity::Error => "✗",
        }
    }
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            max_visible: 4,
        }
    }

    /// Add a note. An identical message already showing is replaced so its
    /// timer restarts.
    pub fn push(&mut self, message: impl Into<String>, severity: Severity, now: Instant) {
        let message = message.into();
        self.toasts.retain(|t| t.message != message);
        self.toasts.push_back(Toast {
            message,
            severity,
            expires: now + severity.duration(),
        });
        while self.toasts.len() > self.max_visible * 2 {
            self.toasts.pop_front();
        }
    }

    /// Drop expired notes.
    pub fn tick(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires > now);
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.back()
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let max_width = (area.width / 2).clamp(30, 60);
        let mut y = area.y + 1;

        for toast in self.toasts.iter().rev().take(self.max_visible) {
            if y >= area.y + area.height {
                break;
            }
            let text = format!(" {} {} ", toast.severity.icon(), toast.message);
            let w = (text.width() as u16).min(max_width).min(area.width);
            let toast_area = Rect {
                x: area.x + area.width.saturating_sub(w + 1),
                y,
                width: w,
                height: 1,
            };
            frame.render_widget(Clear, toast_area);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    text,
                    Style::default()
                        .fg(toast.severity.color())
                        .add_modifier(Modifier::BOLD),
                ))),
                toast_area,
            );
            y += 1;
        }
    }
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_outlive_info() {
        let now = Instant::now();
        let mut toasts = ToastManager::new();
        toasts.push("saved", Severity::Info, now);
        toasts.push("lost device", Severity::Error, now);
        toasts.tick(now + Duration::from_millis(3500));
        assert_eq!(toasts.latest().unwrap().message, "lost device");
        toasts.tick(now + Duration::from_secs(6));
        assert!(toasts.is_empty());
    }

    #[test]
    fn repeated_message_is_not_stacked() {
        let now = Instant::now();
        let mut toasts = ToastManager::new();
        toasts.push("same", Severity::Warning, now);
        toasts.push("same", Severity::Warning, now);
        assert_eq!(toasts.toasts.len(), 1);
    }
}
