use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::core::state::{App, View};
use crate::tui::component::Component;
use crate::tui::components::{HomePage, LibraryBrowser, LoginForm, MessageList, NavBar};
use crate::tui::{InputMode, TuiState};

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Nav bar, active view, status bar.
fn frame_areas(area: Rect) -> [Rect; 3] {
    Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area)
}

/// Header, transcript and input box inside the generator view.
fn generator_areas(main: Rect, input_height: u16) -> [Rect; 3] {
    Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_height),
    ])
    .areas(main)
}

/// Which conversation is open: a library script being edited, or a new chat.
fn generator_header(app: &App) -> Line<'static> {
    match &app.active_script {
        Some(script) => Line::from(vec![
            Span::styled(" Editing: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                script.title.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
        ]),
        None => Line::styled(
            " Water Chat IA",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
    }
}

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState, spinner_frame: usize) {
    let [nav_area, main_area, status_area] = frame_areas(frame.area());
    let username = app.user.as_ref().map(|u| u.username.as_str());

    NavBar::new(app.view, username, &app.model_name).render(frame, nav_area);

    match app.view {
        View::Home => HomePage::new(username).render(frame, main_area),
        View::Generator => {
            let input_height = tui.input_box.calculate_height(main_area.width);
            let [header_area, list_area, input_area] = generator_areas(main_area, input_height);
            frame.render_widget(Paragraph::new(generator_header(app)), header_area);
            MessageList::new(
                &mut tui.message_list,
                app.chat.messages(),
                app.chat.epoch(),
                app.chat.is_waiting(),
                tui.pulse_value,
                spinner_frame,
            )
            .render(frame, list_area);
            tui.input_box.render(frame, input_area);
        }
        View::Library => LibraryBrowser::new(
            &mut tui.library_browser,
            &app.scripts,
            app.library_loading,
            app.is_logged_in(),
        )
        .render(frame, main_area),
        View::Login => {
            LoginForm::new(&tui.login_form, username, app.login_pending).render(frame, main_area)
        }
    }

    draw_status_bar(frame, status_area, app, tui.input_mode, spinner_frame);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App, mode: InputMode, spinner_frame: usize) {
    let busy = app.chat.is_waiting() || app.library_loading || app.login_pending;
    let mut left = Vec::new();
    if busy {
        left.push(Span::styled(
            format!("{} ", SPINNER[spinner_frame % SPINNER.len()]),
            Style::default().fg(Color::Cyan),
        ));
    }
    left.push(Span::raw(app.status_message.clone()));

    let hints = Line::styled(
        key_hints(app.view, mode),
        Style::default().add_modifier(Modifier::DIM),
    )
    .right_aligned();
    let hints_width = u16::try_from(hints.width()).unwrap_or(u16::MAX);
    let [left_area, right_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(hints_width)]).areas(area);

    frame.render_widget(Paragraph::new(Line::from(left)), left_area);
    frame.render_widget(Paragraph::new(hints), right_area);
}

fn key_hints(view: View, mode: InputMode) -> &'static str {
    match (view, mode) {
        (View::Home, _) => "Enter start · F1-F4 views · Ctrl+C quit ",
        (View::Generator, InputMode::Input) => "Esc select · Ctrl+K clear · Ctrl+C quit ",
        (View::Generator, InputMode::Cursor) => "↑↓ select · s save · c copy · i type ",
        (View::Library, _) => "Enter edit · d delete · r reload ",
        (View::Login, _) => "Enter confirm · F1 home ",
    }
}

/// Index of the chat message under screen row `screen_y`, if the generator
/// view is showing and the row falls inside the transcript.
pub fn hit_test_message(screen_y: u16, frame_area: Rect, app: &App, tui: &TuiState) -> Option<usize> {
    if app.view != View::Generator {
        return None;
    }
    let [_, main_area, _] = frame_areas(frame_area);
    let input_height = tui.input_box.calculate_height(main_area.width);
    let [_, list_area, _] = generator_areas(main_area, input_height);

    if screen_y < list_area.y || screen_y >= list_area.y + list_area.height {
        return None;
    }
    tui.message_list.message_at_row(screen_y - list_area.y)
}
