//! ``src/view/components/file_browser_overlay.rs``
//!
//! Paged listing of one snapshot's tree. Marks survive page flips;
//! the footer names the page so large snapshots stay navigable.

use bytesize::ByteSize;
use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};

use crate::model::app_state::FileBrowserState;
use crate::view::theme;

pub struct FileBrowserOverlay;

impl FileBrowserOverlay {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, browser: &FileBrowserState, area: Rect) {
        frame.render_widget(Clear, area);

        let short: String = browser.snapshot_id.chars().take(8).collect();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Snapshot {short} "))
            .title_alignment(Alignment::Center)
            .border_style(theme::overlay_border_style())
            .style(theme::overlay_style());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if browser.loading {
            frame.render_widget(
                Paragraph::new("Loading…").alignment(Alignment::Center),
                inner,
            );
            return;
        }

        let [table_area, footer_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(inner);

        let len = browser.nodes.len();
        let bounds = browser.viewport.page_bounds(len);
        let page_start = bounds.start;

        let header = Row::new(vec!["", "Name", "Size", "Modified", "Mode"])
            .style(theme::header_style())
            .bottom_margin(1);

        let rows: Vec<Row> = browser.nodes[bounds]
            .iter()
            .enumerate()
            .map(|(row, node)| {
                let absolute = page_start + row;
                let mark = if browser.is_marked(absolute) { "x" } else { " " };
                let name_style = if node.is_dir() {
                    Style::default().fg(theme::CYAN)
                } else {
                    Style::default().fg(theme::FOREGROUND)
                };
                let name = if node.is_dir() {
                    format!("{}/", node.path)
                } else {
                    node.path.clone()
                };
                let size = if node.is_dir() {
                    String::new()
                } else {
                    ByteSize(node.size).to_string()
                };
                let mtime = node
                    .mtime
                    .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                let style = if browser.viewport.selected() == row {
                    theme::selection_style()
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(mark).style(Style::default().fg(theme::PINK)),
                    Cell::from(name).style(name_style),
                    Cell::from(size),
                    Cell::from(mtime),
                    Cell::from(node.permissions.clone()).style(Style::default().fg(theme::COMMENT)),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(10),
            Constraint::Length(17),
            Constraint::Length(11),
        ];
        frame.render_widget(Table::new(rows, widths).header(header), table_area);

        let footer = format!(
            "page {}/{}  |  {} entries  |  {} marked",
            browser.viewport.page() + 1,
            browser.viewport.total_pages(len).max(1),
            len,
            browser.marked.len(),
        );
        frame.render_widget(Paragraph::new(footer).style(theme::hint_style()), footer_area);
    }
}

impl Default for FileBrowserOverlay {
    fn default() -> Self {
        Self::new()
    }
}
