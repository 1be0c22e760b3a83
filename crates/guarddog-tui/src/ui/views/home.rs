use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let rect = centered_rect_fixed(56, 11, area);
    let snapshot = &app.snapshot;

    let mut lines = Vec::new();
    if let Some(ref profile) = snapshot.profile {
        lines.push(
            Line::from(Span::styled(
                format!("Welcome, {}!", profile.first_name),
                styles::title_style(),
            ))
            .centered(),
        );
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Role:    ", styles::muted_style()),
            Span::styled(profile.role.display_name(), styles::list_item_style()),
        ]));
    }
    if let Some(email) = snapshot.email() {
        lines.push(Line::from(vec![
            Span::styled("  Email:   ", styles::muted_style()),
            Span::styled(email.to_string(), styles::list_item_style()),
        ]));
    }
    if let Some(ref identity) = snapshot.identity {
        lines.push(Line::from(vec![
            Span::styled("  Session: ", styles::muted_style()),
            Span::styled(
                format!("expires in {} min", identity.minutes_until_expiry()),
                styles::muted_style(),
            ),
        ]));
    }
    lines.push(Line::from(""));
    if let Some(role) = snapshot.role() {
        lines.push(
            Line::from(vec![
                Span::styled("[Enter]", styles::help_key_style()),
                Span::styled(
                    format!(" open the {}", role.landing_route().title()),
                    styles::help_desc_style(),
                ),
            ])
            .centered(),
        );
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .title(" Dashboard ");
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}
