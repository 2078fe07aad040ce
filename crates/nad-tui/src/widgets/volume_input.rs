//! Single-line field for typing an absolute volume, backed by tui-input.

use ratatui::crossterm::event::{Event, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use nad_core::VolumeLimits;

use crate::theme::{style_input, C_MUTED};

const PROMPT: &str = "dB ";

#[derive(Debug, Default)]
pub struct VolumeInput {
    input: Input,
}

impl VolumeInput {
    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Feed an editing key (characters, backspace, cursor movement).
    pub fn handle_key(&mut self, key: KeyEvent) {
        self.input.handle_event(&Event::Key(key));
    }

    /// Parse the field as a decimal within `limits`.
    pub fn parse(&self, limits: &VolumeLimits) -> Result<f64, String> {
        let text = self.text().trim();
        let db: f64 = text
            .trim_end_matches("dB")
            .trim_end_matches("db")
            .trim()
            .parse()
            .map_err(|_| format!("{:?} is not a number", text))?;
        if !db.is_finite() || !limits.contains(db) {
            return Err(format!(
                "volume must be between {} and {} dB",
                limits.min_db, limits.max_db
            ));
        }
        Ok(db)
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(PROMPT.len() as u16 + 1) as usize;
        let scroll = self.input.visual_scroll(width);
        let value = self.input.value();
        let body = if value.is_empty() {
            Span::styled("e.g. -25.5", Style::default().fg(C_MUTED))
        } else {
            Span::raw(value.chars().skip(scroll).collect::<String>())
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![Span::raw(PROMPT), body])).style(style_input()),
            area,
        );

        let cursor = (self.input.visual_cursor().saturating_sub(scroll)) as u16;
        let x = area.x + PROMPT.len() as u16 + cursor;
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn typed(text: &str) -> VolumeInput {
        let mut input = VolumeInput::default();
        for c in text.chars() {
            input.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        input
    }

    #[test]
    fn accepts_decimal_in_range() {
        let limits = VolumeLimits::default();
        assert_eq!(typed("-25.5").parse(&limits), Ok(-25.5));
        assert_eq!(typed("10").parse(&limits), Ok(10.0));
        assert_eq!(typed("-3 dB").parse(&limits), Ok(-3.0));
    }

    #[test]
    fn rejects_garbage_and_out_of_range() {
        let limits = VolumeLimits::default();
        assert!(typed("loud").parse(&limits).is_err());
        assert!(typed("10.5").parse(&limits).is_err());
        assert!(typed("-81").parse(&limits).is_err());
        assert!(typed("").parse(&limits).is_err());
    }

    #[test]
    fn backspace_edits() {
        let mut input = typed("-200");
        input.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(input.text(), "-20");
    }
}
