use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use guarddog_core::{Rendering, Route};

use crate::app::{App, AppState, MAX_VISIBLE_TOASTS};

use super::styles;
use super::views::{home, login, register, student, teacher};

const LOGO: [&str; 3] = [
    "   ╔═╗╦ ╦╔═╗╦═╗╔╦╗  ╔╦╗╔═╗╔═╗",
    "   ║ ╦║ ║╠═╣╠╦╝ ║║   ║║║ ║║ ╦",
    "   ╚═╝╚═╝╩ ╩╩╚══╩╝  ═╩╝╚═╝╚═╝",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);
    render_toasts(frame, app, chunks[1]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::EditingProgress => teacher::render_progress_dialog(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("  Guard Dog | {}", app.current_route().title());
    let who = match (&app.snapshot.profile, app.snapshot.email()) {
        (Some(profile), _) => format!("{} ({})", profile.full_name(), profile.role.display_name()),
        (None, Some(email)) => email.to_string(),
        (None, None) => String::new(),
    };
    let help_hint = "[?] Help";
    let right = if who.is_empty() {
        help_hint.to_string()
    } else {
        format!("{}  {}", who, help_hint)
    };

    let title_line = Line::from(vec![
        Span::styled(title.clone(), styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.chars().count() + right.chars().count() + 2),
        )),
        Span::styled(right, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

/// Public routes render directly; protected routes render whatever their
/// guard decided.
fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let route = app.current_route();
    match route {
        Route::Login => return login::render(frame, app, area),
        Route::Register => return register::render(frame, app, area),
        Route::Home | Route::Student | Route::Teacher => {}
    }

    match app.rendering() {
        Some(Rendering::Children) => match route {
            Route::Home => home::render(frame, app, area),
            Route::Student => student::render(frame, app, area),
            Route::Teacher => teacher::render(frame, app, area),
            Route::Login | Route::Register => {}
        },
        Some(Rendering::SettingUpProfile) => render_centered_message(
            frame,
            area,
            "Setting up your profile...",
            Some("This only takes a moment."),
        ),
        Some(Rendering::Redirecting) => {
            render_centered_message(frame, area, "Redirecting...", None)
        }
        Some(Rendering::Loading) | None => render_centered_message(frame, area, "Loading...", None),
        Some(Rendering::Nothing) => {}
    }
}

fn render_centered_message(frame: &mut Frame, area: Rect, message: &str, detail: Option<&str>) {
    let rect = centered_rect_fixed(40, 5, area);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), styles::title_style())).centered(),
    ];
    if let Some(detail) = detail {
        lines.push(Line::from(Span::styled(detail.to_string(), styles::muted_style())).centered());
    }
    frame.render_widget(Paragraph::new(lines), rect);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.current_route() {
        Route::Login | Route::Register => "[Tab] next field | [Esc] quit",
        Route::Home => "[Enter] open dashboard | [o] sign out | [q]uit",
        Route::Student => "[r]efresh | [o] sign out | [q]uit",
        Route::Teacher => "[a]dd | [e]dit | [r]efresh | [o] sign out | [q]uit",
    };

    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else if app.busy {
        " Working... ".to_string()
    } else {
        String::new()
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

/// Toasts stack in the top-right corner of the content area.
fn render_toasts(frame: &mut Frame, app: &App, area: Rect) {
    const TOAST_WIDTH: u16 = 44;
    const TOAST_HEIGHT: u16 = 4;

    for (i, toast) in app.toasts.iter().rev().take(MAX_VISIBLE_TOASTS).enumerate() {
        let y = area.y + (i as u16) * TOAST_HEIGHT;
        if y + TOAST_HEIGHT > area.y + area.height || area.width < TOAST_WIDTH {
            break;
        }
        let rect = Rect::new(area.x + area.width - TOAST_WIDTH, y, TOAST_WIDTH, TOAST_HEIGHT);
        frame.render_widget(Clear, rect);

        let style = styles::toast_style(toast.kind);
        let mut lines = vec![Line::from(Span::styled(toast.title.clone(), style))];
        if let Some(ref description) = toast.description {
            lines.push(Line::from(Span::styled(description.clone(), styles::help_desc_style())));
        }

        let block = Block::default().borders(Borders::ALL).border_style(style);
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
            rect,
        );
    }
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 25, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let mut help_text: Vec<Line> = LOGO
        .iter()
        .map(|l| Line::from(Span::styled(*l, styles::title_style())))
        .collect();
    help_text.extend([
        Line::from(Span::styled(
            format!("              version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("Tab", "Next field / switch panel"),
        help_line("↑/↓", "Navigate list"),
        help_line("Enter", "Select / submit"),
        help_line("Esc", "Go back"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("r", "Refresh the current view"),
        help_line("o", "Sign out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled(" Teacher Dashboard", styles::highlight_style())),
        help_line("a", "Add a progress entry"),
        help_line("e", "Edit the selected enrollment"),
        help_line("←/→", "Change status in the entry form"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(help_text).block(block);

    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 9, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = LOGO
        .iter()
        .map(|l| Line::from(Span::styled(*l, styles::title_style())))
        .collect();
    lines.extend([
        Line::from(""),
        Line::from(Span::styled("Really quit?", styles::help_desc_style())).centered(),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y]", styles::help_key_style()),
            Span::styled(" yes   ", styles::muted_style()),
            Span::styled("[n]", styles::help_key_style()),
            Span::styled(" no", styles::muted_style()),
        ])
        .centered(),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
