use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::state::UiState;
use crate::theme::{style_border, style_default, style_muted, style_on, style_secondary, style_selected};

pub fn draw(frame: &mut Frame, area: Rect, state: &UiState) {
    let title = if state.discovering {
        " Discovery (scanning...) ".to_string()
    } else if state.devices_from_cache {
        format!(" Discovery: {} cached ", state.devices.len())
    } else {
        format!(" Discovery: {} found ", state.devices.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border(true))
        .title(title);

    if state.devices.is_empty() {
        let hint = if state.discovering {
            "probing the local network..."
        } else {
            "no receivers yet (d discover, D rescan ignoring cache)"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(hint, style_muted())).block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = state
        .devices
        .iter()
        .map(|device| {
            let endpoint = device.endpoint();
            let active = state.connected && state.endpoint.as_ref() == Some(&endpoint);
            let marker = if active {
                Span::styled(" ● ", style_on())
            } else {
                Span::raw("   ")
            };
            ListItem::new(Line::from(vec![
                marker,
                Span::styled(format!("{:<22}", endpoint.to_string()), style_default()),
                Span::styled(device.model.clone(), style_secondary()),
            ]))
        })
        .collect();

    let mut list_state = ListState::default().with_selected(Some(state.device_cursor));
    frame.render_stateful_widget(
        List::new(items)
            .block(block)
            .highlight_style(style_selected()),
        area,
        &mut list_state,
    );
}
