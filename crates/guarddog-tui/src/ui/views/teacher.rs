use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use guarddog_core::classroom::{format_last_activity, grade_tier};
use guarddog_core::utils::{progress_bar, truncate_string};

use crate::app::{App, Focus, ProgressFocus};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

use super::{button_line, choice_line, error_line, field_line};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    render_stats(frame, app, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    render_class_list(frame, app, chunks[0]);
    render_class_enrollments(frame, app, chunks[1]);
}

fn render_stats(frame: &mut Frame, app: &App, area: Rect) {
    let stats = app.class_stats();
    let line = Line::from(vec![
        Span::styled(" Students: ", styles::muted_style()),
        Span::styled(stats.total_students.to_string(), styles::list_item_style()),
        Span::styled("   Average progress: ", styles::muted_style()),
        Span::styled(
            format!("{}%", stats.average_progress),
            styles::grade_style(grade_tier(stats.average_progress as f64)),
        ),
        Span::styled("   Active today: ", styles::muted_style()),
        Span::styled(stats.active_today.to_string(), styles::success_style()),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_class_list(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .classes
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let style = if i == app.class_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(truncate_string(&class.name, 30))).style(style)
        })
        .collect();

    let focused = matches!(app.focus, Focus::List);
    let block = Block::default()
        .title(format!(" Classes ({}) ", app.classes.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    if items.is_empty() {
        let message = if app.busy { "Loading classes..." } else { "No classes found." };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(message, styles::muted_style()))).block(block),
            area,
        );
        return;
    }

    let list = List::new(items).block(block);

    let mut state = ListState::default();
    state.select(Some(app.class_selection));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_class_enrollments(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);
    let now = Utc::now();

    let items: Vec<ListItem> = app
        .class_enrollments
        .iter()
        .enumerate()
        .map(|(i, view)| {
            let enrollment = &view.enrollment;
            let progress = enrollment.progress_or_zero();
            let status = enrollment.status_or_default();
            let line = Line::from(vec![
                Span::raw(format!("{:<20} ", truncate_string(&view.student_name, 20))),
                Span::styled(progress_bar(progress, 10), styles::grade_style(grade_tier(progress))),
                Span::raw(format!(" {:>3.0}% ", progress)),
                Span::styled(format!("{:<16}", status.to_string()), styles::status_style(status)),
                Span::styled(
                    format_last_activity(enrollment.last_activity, now),
                    styles::muted_style(),
                ),
            ]);

            let style = if focused && i == app.enrollment_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };

            ListItem::new(line).style(style)
        })
        .collect();

    let title = match app.selected_class() {
        Some(class) => format!(" {} ({}) ", class.name, app.class_enrollments.len()),
        None => " Students ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    if items.is_empty() {
        let message = match app.selected_class() {
            Some(_) if app.busy => "Loading students...",
            Some(_) => "No students enrolled yet. Press [a] to add a progress entry.",
            None => "Select a class to see its students.",
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(message, styles::muted_style()))).block(block),
            area,
        );
        return;
    }

    let list = List::new(items).block(block);

    let mut state = ListState::default();
    state.select(Some(app.enrollment_selection));

    frame.render_stateful_widget(list, area, &mut state);
}

/// The add/edit progress dialog.
pub fn render_progress_dialog(frame: &mut Frame, app: &App) {
    let Some(ref form) = app.progress_form else {
        return;
    };
    let height = if form.error.is_some() { 13 } else { 11 };
    let area = centered_rect_fixed(58, height, frame.area());
    frame.render_widget(Clear, area);

    let student_label = match (&form.student_name, form.selected_student()) {
        (Some(name), _) => name.clone(),
        (None, Some(student)) => student.full_name(),
        (None, None) if form.students_loading => "Loading...".to_string(),
        (None, None) => "No students available".to_string(),
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Class: ", styles::muted_style()),
            Span::styled(form.class_name.clone(), styles::highlight_style()),
        ]),
        Line::from(""),
    ];
    if form.is_edit() {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:>16}: ", "Student"), styles::muted_style()),
            Span::styled(student_label, styles::list_item_style()),
        ]));
    } else {
        lines.push(choice_line(
            "Student",
            &student_label,
            form.focus == ProgressFocus::Student,
        ));
    }
    lines.push(field_line(
        "Progress (%)",
        &form.progress,
        form.focus == ProgressFocus::Progress,
        false,
    ));
    lines.push(choice_line(
        "Status",
        &form.status.to_string(),
        form.focus == ProgressFocus::Status,
    ));
    lines.push(Line::from(""));
    let label = match (form.submitting, form.is_edit()) {
        (true, _) => "Saving...",
        (false, true) => "Update Progress",
        (false, false) => "Add Entry",
    };
    lines.push(button_line(label, form.focus == ProgressFocus::Button));
    if let Some(error) = error_line(&form.error) {
        lines.push(Line::from(""));
        lines.push(error);
    }

    let title = if form.is_edit() {
        " Update Progress "
    } else {
        " Add Progress Entry "
    };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
