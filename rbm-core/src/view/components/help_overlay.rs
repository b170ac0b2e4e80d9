//! ``src/view/components/help_overlay.rs``

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::view::theme;

pub struct HelpOverlay;

impl HelpOverlay {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        frame.render_widget(Clear, area);

        let section = |title: &'static str| {
            Line::from(Span::styled(
                title,
                Style::default().fg(theme::CYAN).add_modifier(Modifier::BOLD),
            ))
        };

        let lines = vec![
            Line::from(Span::styled(
                "Keys",
                Style::default().fg(theme::YELLOW).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            section("Navigation"),
            Line::from("  Tab / Shift-Tab   Cycle panels"),
            Line::from("  j/k or arrows     Move selection"),
            Line::from("  Enter             Select repository / browse snapshot"),
            Line::from("  r                 Refresh the active repository"),
            Line::from("  q, Ctrl-C         Quit"),
            Line::from(""),
            section("Snapshots"),
            Line::from("  /                 Filter (free text, tag:<t>, host:<h>)"),
            Line::from("  c                 Clear the filter"),
            Line::from("  b                 Backup form"),
            Line::from("  R                 Restore the selected snapshot"),
            Line::from("  f                 Retention (forget) form"),
            Line::from(""),
            section("File browser"),
            Line::from("  h/l               Previous / next page"),
            Line::from("  space             Mark or unmark the entry"),
            Line::from("  R                 Restore the marked paths"),
            Line::from(""),
            section("Repository"),
            Line::from("  a                 Add a repository"),
            Line::from("  s                 Scan known locations for repositories"),
            Line::from("  x                 Remove the highlighted entry"),
            Line::from(""),
            section("Maintenance"),
            Line::from("  P                 Prune (dry-run first, then typed confirmation)"),
            Line::from("  C                 Cache cleanup"),
            Line::from("  u                 Unlock"),
            Line::from(""),
            section("Running operations"),
            Line::from("  Ctrl-B            Cancel the running backup"),
            Line::from("  Ctrl-R            Cancel the running restore"),
        ];

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help ")
                    .title_alignment(Alignment::Center)
                    .border_style(theme::overlay_border_style())
                    .style(theme::overlay_style()),
            )
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, area);
    }
}

impl Default for HelpOverlay {
    fn default() -> Self {
        Self::new()
    }
}
