//! ``src/view/components/preview_overlay.rs``
//!
//! Dry-run previews shown before anything destructive runs. Forget
//! previews come pre-parsed per scope group; prune previews are the
//! tool's own report verbatim.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::model::app_state::{ForgetPreviewState, PrunePreviewState};
use crate::view::theme;

pub struct PreviewOverlay;

impl PreviewOverlay {
    pub fn new() -> Self {
        Self
    }

    pub fn render_forget(&self, frame: &mut Frame<'_>, preview: &ForgetPreviewState, area: Rect) {
        let mut lines = vec![
            Line::from(vec![
                Span::styled(
                    format!("{} snapshots would be removed", preview.remove_count()),
                    Style::default().fg(theme::RED).add_modifier(Modifier::BOLD),
                ),
                Span::raw(", "),
                Span::styled(
                    format!("{} kept", preview.keep_count()),
                    Style::default().fg(theme::GREEN),
                ),
            ]),
            Line::from(""),
        ];

        for group in &preview.groups {
            lines.push(Line::from(Span::styled(
                format!("{} {}", group.host, group.paths.join(" ")),
                Style::default().fg(theme::CYAN).add_modifier(Modifier::BOLD),
            )));
            for snap in &group.remove {
                lines.push(Line::from(vec![
                    Span::styled("  - ", Style::default().fg(theme::RED)),
                    Span::styled(
                        snap.display_id().to_string(),
                        Style::default().fg(theme::RED),
                    ),
                    Span::styled(
                        format!("  {}", snap.time.format("%Y-%m-%d %H:%M")),
                        Style::default().fg(theme::COMMENT),
                    ),
                ]));
            }
            for snap in &group.keep {
                lines.push(Line::from(vec![
                    Span::styled("    ", Style::default()),
                    Span::styled(
                        snap.display_id().to_string(),
                        Style::default().fg(theme::GREEN),
                    ),
                    Span::styled(" kept", theme::hint_style()),
                ]));
            }
            lines.push(Line::from(""));
        }

        self.chrome(
            frame,
            " Forget preview (dry-run) ",
            lines,
            preview.scroll,
            area,
        );
    }

    pub fn render_prune(&self, frame: &mut Frame<'_>, preview: &PrunePreviewState, area: Rect) {
        let lines: Vec<Line> = preview
            .report
            .iter()
            .map(|line| Line::from(line.clone()))
            .collect();
        self.chrome(frame, " Prune preview (dry-run) ", lines, preview.scroll, area);
    }

    fn chrome(
        &self,
        frame: &mut Frame<'_>,
        title: &str,
        mut lines: Vec<Line>,
        scroll: usize,
        area: Rect,
    ) {
        frame.render_widget(Clear, area);
        lines.push(Line::from(Span::styled(
            "nothing has been changed yet; Enter continues to confirmation, Esc aborts",
            Style::default().fg(theme::YELLOW),
        )));
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title.to_string())
                    .title_alignment(Alignment::Center)
                    .border_style(theme::overlay_border_style())
                    .style(theme::overlay_style()),
            )
            .scroll((scroll.min(u16::MAX as usize) as u16, 0));
        frame.render_widget(paragraph, area);
    }
}

impl Default for PreviewOverlay {
    fn default() -> Self {
        Self::new()
    }
}
