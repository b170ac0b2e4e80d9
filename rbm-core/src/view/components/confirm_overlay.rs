//! ``src/view/components/confirm_overlay.rs``
//!
//! Typed-word confirmation for destructive operations. The exact word
//! must be echoed back; Enter with anything else aborts.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::model::confirm::ConfirmDialog;
use crate::view::theme;

pub struct ConfirmOverlay;

impl ConfirmOverlay {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, dialog: &ConfirmDialog, area: Rect) {
        frame.render_widget(Clear, area);

        let matches = dialog.is_confirmed();
        let input_style = if matches {
            Style::default().fg(theme::GREEN).bold()
        } else {
            Style::default().fg(theme::FOREGROUND)
        };

        let lines = vec![
            Line::from(Span::raw(dialog.prompt.clone())),
            Line::from(""),
            Line::from(vec![
                Span::styled("type ", theme::hint_style()),
                Span::styled(
                    dialog.expected,
                    Style::default().fg(theme::RED).add_modifier(Modifier::BOLD),
                ),
                Span::styled(" to continue (case sensitive)", theme::hint_style()),
            ]),
            Line::from(vec![
                Span::styled("> ", Style::default().fg(theme::COMMENT)),
                Span::styled(dialog.input.to_string(), input_style),
                Span::styled("█", Style::default().fg(theme::YELLOW)),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Enter confirms, Esc aborts",
                theme::hint_style(),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", dialog.title))
                    .title_alignment(Alignment::Center)
                    .border_style(theme::danger_border_style())
                    .style(theme::overlay_style()),
            )
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, area);
    }
}

impl Default for ConfirmOverlay {
    fn default() -> Self {
        Self::new()
    }
}
