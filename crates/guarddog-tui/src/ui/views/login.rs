use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, LoginFocus};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

use super::{button_line, error_line, field_line};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let form = &app.login;
    let height = if form.error.is_some() { 13 } else { 11 };
    let rect = centered_rect_fixed(56, height, area);
    frame.render_widget(Clear, rect);

    let focus = form.focus;
    let mut lines = vec![
        Line::from(Span::styled("Sign in to your account", styles::title_style())).centered(),
        Line::from(""),
        field_line("Email", &form.email, focus == LoginFocus::Email, false),
        field_line("Password", &form.password, focus == LoginFocus::Password, true),
        Line::from(""),
        button_line(
            if form.submitting { "Signing in..." } else { "Sign In" },
            focus == LoginFocus::Button,
        ),
        Line::from(""),
        Line::from(vec![
            Span::styled("No account yet? ", styles::muted_style()),
            Span::styled("Register", styles::field_style(focus == LoginFocus::RegisterLink)),
        ])
        .centered(),
    ];
    if let Some(error) = error_line(&form.error) {
        lines.push(Line::from(""));
        lines.push(error);
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .title(" Sign In ");
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}
