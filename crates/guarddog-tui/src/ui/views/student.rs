use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use guarddog_core::classroom::{format_last_activity, grade_tier, letter_grade};
use guarddog_core::utils::{format_date, progress_bar, truncate_string};

use crate::app::{App, Focus};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    render_summary(frame, app, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    render_enrollment_list(frame, app, chunks[0]);
    render_enrollment_detail(frame, app, chunks[1]);
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let average = app.student_average();
    let line = Line::from(vec![
        Span::styled(" Classes: ", styles::muted_style()),
        Span::styled(app.student_enrollments.len().to_string(), styles::list_item_style()),
        Span::styled("   Average progress: ", styles::muted_style()),
        Span::styled(
            format!("{}% ({})", average, letter_grade(average as f64)),
            styles::grade_style(grade_tier(average as f64)),
        ),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_enrollment_list(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .student_enrollments
        .iter()
        .enumerate()
        .map(|(i, view)| {
            let progress = view.enrollment.progress_or_zero();
            let line = Line::from(vec![
                Span::raw(format!("{:<22} ", truncate_string(&view.class_name, 22))),
                Span::styled(progress_bar(progress, 10), styles::grade_style(grade_tier(progress))),
                Span::raw(format!(" {:>3.0}%", progress)),
            ]);

            let style = if i == app.student_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };

            ListItem::new(line).style(style)
        })
        .collect();

    let focused = matches!(app.focus, Focus::List);
    let block = Block::default()
        .title(format!(" My Classes ({}) ", app.student_enrollments.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    if items.is_empty() {
        let message = if app.busy {
            "Loading your enrollments..."
        } else {
            "You are not enrolled in any classes yet."
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(message, styles::muted_style())))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let list = List::new(items).block(block);

    let mut state = ListState::default();
    state.select(Some(app.student_selection));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_enrollment_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);
    let Some(view) = app.student_enrollments.get(app.student_selection) else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_style(focused));
        frame.render_widget(block, area);
        return;
    };

    let enrollment = &view.enrollment;
    let progress = enrollment.progress_or_zero();
    let status = enrollment.status_or_default();

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Teacher:   ", styles::highlight_style()),
            Span::raw(view.teacher_name.clone()),
        ]),
        Line::from(vec![
            Span::styled("Progress:  ", styles::highlight_style()),
            Span::styled(
                format!("{} {:.0}%", progress_bar(progress, 20), progress),
                styles::grade_style(grade_tier(progress)),
            ),
        ]),
        Line::from(vec![
            Span::styled("Grade:     ", styles::highlight_style()),
            Span::styled(letter_grade(progress), styles::grade_style(grade_tier(progress))),
        ]),
        Line::from(vec![
            Span::styled("Status:    ", styles::highlight_style()),
            Span::styled(status.to_string(), styles::status_style(status)),
        ]),
        Line::from(vec![
            Span::styled("Activity:  ", styles::highlight_style()),
            Span::raw(format_last_activity(enrollment.last_activity, Utc::now())),
        ]),
    ];
    if let Some(enrolled_at) = enrollment.enrolled_at {
        lines.push(Line::from(vec![
            Span::styled("Enrolled:  ", styles::highlight_style()),
            Span::raw(format_date(enrolled_at)),
        ]));
    }
    if !view.class_description.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            view.class_description.clone(),
            styles::muted_style(),
        )));
    }

    let block = Block::default()
        .title(format!(" {} ", view.class_name))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
