//! Keyboard input handling for the TUI.
//!
//! Overlays take input first, then the current route's view. Dashboard
//! keys only act once the route's guard has rendered its content.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use guarddog_core::{Navigation, Rendering, Route};

use crate::app::{
    can_add_email_char, can_add_name_char, can_add_password_char, can_add_progress_char, App,
    AppState, Focus, LoginFocus, ProgressFocus, RegisterFocus,
};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::ConfirmingQuit => return Ok(handle_quit_input(app, key)),
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::EditingProgress => {
            handle_progress_input(app, key);
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    match app.current_route() {
        Route::Login => handle_login_input(app, key),
        Route::Register => handle_register_input(app, key),
        Route::Home | Route::Student | Route::Teacher => handle_dashboard_input(app, key),
    }
    Ok(false)
}

fn handle_quit_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Enter => {
            app.state = AppState::Quitting;
            true
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.state = AppState::Normal;
            false
        }
        _ => false,
    }
}

/// Esc on a form goes back if there is somewhere to go, otherwise asks to quit.
fn back_or_quit(app: &mut App) {
    if app.router.depth() > 1 {
        app.go_back();
    } else {
        app.state = AppState::ConfirmingQuit;
    }
}

// ============================================================================
// Sign-in and registration
// ============================================================================

fn handle_login_input(app: &mut App, key: KeyEvent) {
    let focus = app.login.focus;
    match key.code {
        KeyCode::Esc => back_or_quit(app),
        KeyCode::Tab | KeyCode::Down => {
            if focus == LoginFocus::Email {
                app.fill_saved_password();
            }
            app.login.focus = app.login.focus.next();
        }
        KeyCode::BackTab | KeyCode::Up => app.login.focus = focus.prev(),
        KeyCode::Enter => match focus {
            LoginFocus::Email => {
                app.fill_saved_password();
                if app.login.focus == LoginFocus::Email {
                    app.login.focus = LoginFocus::Password;
                }
            }
            LoginFocus::Password | LoginFocus::Button => app.submit_login(),
            LoginFocus::RegisterLink => app.navigate(Navigation::push(Route::Register)),
        },
        KeyCode::Backspace => match focus {
            LoginFocus::Email => {
                app.login.email.pop();
            }
            LoginFocus::Password => {
                app.login.password.pop();
            }
            LoginFocus::Button | LoginFocus::RegisterLink => {}
        },
        KeyCode::Char(c) => match focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login.email.chars().count(), c) {
                    app.login.email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login.password.chars().count(), c) {
                    app.login.password.push(c);
                }
            }
            LoginFocus::Button | LoginFocus::RegisterLink => match c {
                '?' => app.state = AppState::ShowingHelp,
                'q' => app.state = AppState::ConfirmingQuit,
                _ => {}
            },
        },
        _ => {}
    }
}

fn handle_register_input(app: &mut App, key: KeyEvent) {
    let focus = app.register.focus;
    match key.code {
        KeyCode::Esc => back_or_quit(app),
        KeyCode::Tab | KeyCode::Down => app.register.focus = focus.next(),
        KeyCode::BackTab | KeyCode::Up => app.register.focus = focus.prev(),
        KeyCode::Left | KeyCode::Right if focus == RegisterFocus::Role => {
            app.register.role = app.register.role.next();
        }
        KeyCode::Enter => match focus {
            RegisterFocus::Role => app.register.role = app.register.role.next(),
            RegisterFocus::Button => app.submit_register(),
            RegisterFocus::LoginLink => app.navigate(Navigation::push(Route::Login)),
            _ => app.register.focus = focus.next(),
        },
        KeyCode::Backspace => {
            if let Some(field) = register_field(app, focus) {
                field.pop();
            }
        }
        KeyCode::Char(' ') if focus == RegisterFocus::Role => {
            app.register.role = app.register.role.next();
        }
        KeyCode::Char(c) => {
            let allowed = match focus {
                RegisterFocus::FirstName => can_add_name_char(app.register.first_name.chars().count(), c),
                RegisterFocus::LastName => can_add_name_char(app.register.last_name.chars().count(), c),
                RegisterFocus::Email => can_add_email_char(app.register.email.chars().count(), c),
                RegisterFocus::Password => can_add_password_char(app.register.password.chars().count(), c),
                RegisterFocus::ConfirmPassword => {
                    can_add_password_char(app.register.confirm_password.chars().count(), c)
                }
                RegisterFocus::Role | RegisterFocus::Button | RegisterFocus::LoginLink => {
                    match c {
                        '?' => app.state = AppState::ShowingHelp,
                        'q' => app.state = AppState::ConfirmingQuit,
                        _ => {}
                    }
                    false
                }
            };
            if allowed {
                if let Some(field) = register_field(app, focus) {
                    field.push(c);
                }
            }
        }
        _ => {}
    }
}

fn register_field(app: &mut App, focus: RegisterFocus) -> Option<&mut String> {
    let form = &mut app.register;
    match focus {
        RegisterFocus::FirstName => Some(&mut form.first_name),
        RegisterFocus::LastName => Some(&mut form.last_name),
        RegisterFocus::Email => Some(&mut form.email),
        RegisterFocus::Password => Some(&mut form.password),
        RegisterFocus::ConfirmPassword => Some(&mut form.confirm_password),
        RegisterFocus::Role | RegisterFocus::Button | RegisterFocus::LoginLink => None,
    }
}

// ============================================================================
// Dashboards
// ============================================================================

fn handle_dashboard_input(app: &mut App, key: KeyEvent) {
    // Available whatever the guard decided
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return;
        }
        KeyCode::Char('o') => {
            app.sign_out();
            return;
        }
        KeyCode::Esc => {
            app.go_back();
            return;
        }
        _ => {}
    }

    if app.rendering() != Some(Rendering::Children) {
        return;
    }

    if key.code == KeyCode::Char('r') {
        app.refresh_current_view();
        return;
    }

    match app.current_route() {
        Route::Home => {
            if key.code == KeyCode::Enter {
                if let Some(role) = app.snapshot.role() {
                    app.navigate(Navigation::push(role.landing_route()));
                }
            }
        }
        Route::Student => handle_student_input(app, key),
        Route::Teacher => handle_teacher_input(app, key),
        Route::Login | Route::Register => {}
    }
}

fn handle_student_input(app: &mut App, key: KeyEvent) {
    let len = app.student_enrollments.len();
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.student_selection = app.student_selection.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if app.student_selection + 1 < len {
                app.student_selection += 1;
            }
        }
        KeyCode::Tab | KeyCode::Left | KeyCode::Right => toggle_focus(app),
        _ => {}
    }
}

fn handle_teacher_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::Left | KeyCode::Right => toggle_focus(app),
        KeyCode::Char('a') => app.open_add_progress(),
        KeyCode::Char('e') => app.open_edit_progress(),
        KeyCode::Enter => match app.focus {
            Focus::List => app.focus = Focus::Detail,
            Focus::Detail => app.open_edit_progress(),
        },
        KeyCode::Up | KeyCode::Char('k') => match app.focus {
            Focus::List => app.select_class(app.class_selection.saturating_sub(1)),
            Focus::Detail => {
                app.enrollment_selection = app.enrollment_selection.saturating_sub(1);
            }
        },
        KeyCode::Down | KeyCode::Char('j') => match app.focus {
            Focus::List => app.select_class(app.class_selection + 1),
            Focus::Detail => {
                if app.enrollment_selection + 1 < app.class_enrollments.len() {
                    app.enrollment_selection += 1;
                }
            }
        },
        _ => {}
    }
}

fn toggle_focus(app: &mut App) {
    app.focus = match app.focus {
        Focus::List => Focus::Detail,
        Focus::Detail => Focus::List,
    };
}

// ============================================================================
// Progress dialog
// ============================================================================

fn handle_progress_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.close_progress_form();
        return;
    }
    let Some(form) = app.progress_form.as_mut() else {
        app.state = AppState::Normal;
        return;
    };
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.next_focus(),
        KeyCode::BackTab | KeyCode::Up => form.prev_focus(),
        KeyCode::Left | KeyCode::Right => {
            let forward = key.code == KeyCode::Right;
            match form.focus {
                ProgressFocus::Student if !form.students.is_empty() => {
                    let len = form.students.len();
                    form.student_selection = if forward {
                        (form.student_selection + 1) % len
                    } else {
                        (form.student_selection + len - 1) % len
                    };
                }
                ProgressFocus::Status => form.status = form.status.next(),
                _ => {}
            }
        }
        KeyCode::Enter if form.focus == ProgressFocus::Button => app.submit_progress(),
        KeyCode::Enter => form.next_focus(),
        KeyCode::Backspace if form.focus == ProgressFocus::Progress => {
            form.progress.pop();
        }
        KeyCode::Char(' ') if form.focus == ProgressFocus::Status => {
            form.status = form.status.next();
        }
        KeyCode::Char(c) if form.focus == ProgressFocus::Progress => {
            if can_add_progress_char(&form.progress, c) {
                form.progress.push(c);
            }
        }
        _ => {}
    }
}
