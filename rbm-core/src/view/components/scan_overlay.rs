//! ``src/view/components/scan_overlay.rs``

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::model::app_state::ScanState;
use crate::view::theme;

pub struct ScanOverlay;

impl ScanOverlay {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, scan: &ScanState, area: Rect) {
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Repository scan ")
            .title_alignment(Alignment::Center)
            .border_style(theme::overlay_border_style())
            .style(theme::overlay_style());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if scan.scanning {
            frame.render_widget(
                Paragraph::new("Scanning known locations…").alignment(Alignment::Center),
                inner,
            );
            return;
        }
        if scan.found.is_empty() {
            frame.render_widget(
                Paragraph::new("nothing that looks like a restic repository")
                    .style(theme::hint_style())
                    .alignment(Alignment::Center),
                inner,
            );
            return;
        }

        let [list_area, footer_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(inner);

        let items: Vec<ListItem> = scan
            .found
            .iter()
            .map(|path| ListItem::new(path.display().to_string()))
            .collect();
        let mut list_state = ListState::default().with_selected(Some(scan.selected));
        let list = List::new(items)
            .highlight_style(theme::selection_style())
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, list_area, &mut list_state);

        frame.render_widget(
            Paragraph::new("Enter pre-fills the add form for the highlighted hit")
                .style(theme::hint_style()),
            footer_area,
        );
    }
}

impl Default for ScanOverlay {
    fn default() -> Self {
        Self::new()
    }
}
