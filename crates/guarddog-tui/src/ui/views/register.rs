use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, RegisterFocus};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

use super::{button_line, choice_line, error_line, field_line};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let form = &app.register;
    let height = if form.error.is_some() { 17 } else { 15 };
    let rect = centered_rect_fixed(56, height, area);
    frame.render_widget(Clear, rect);

    let focus = form.focus;
    let mut lines = vec![
        Line::from(Span::styled("Create your account", styles::title_style())).centered(),
        Line::from(""),
        field_line("First name", &form.first_name, focus == RegisterFocus::FirstName, false),
        field_line("Last name", &form.last_name, focus == RegisterFocus::LastName, false),
        field_line("Email", &form.email, focus == RegisterFocus::Email, false),
        field_line("Password", &form.password, focus == RegisterFocus::Password, true),
        field_line(
            "Confirm password",
            &form.confirm_password,
            focus == RegisterFocus::ConfirmPassword,
            true,
        ),
        choice_line("Role", form.role.display_name(), focus == RegisterFocus::Role),
        Line::from(""),
        button_line(
            if form.submitting { "Creating account..." } else { "Register" },
            focus == RegisterFocus::Button,
        ),
        Line::from(""),
        Line::from(vec![
            Span::styled("Already registered? ", styles::muted_style()),
            Span::styled("Sign in", styles::field_style(focus == RegisterFocus::LoginLink)),
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
        .title(" Register ");
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}
