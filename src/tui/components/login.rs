//! # Login Form Component
//!
//! Username-only sign in. When a user is already signed in, the panel shows
//! the account and offers to sign out instead.

use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::tui::component::Component;
use crate::tui::event::TuiEvent;

const FORM_WIDTH: u16 = 48;
const FORM_HEIGHT: u16 = 9;

#[derive(Debug, Clone, PartialEq)]
pub enum LoginEvent {
    Submit(String),
    Logout,
}

#[derive(Default)]
pub struct LoginFormState {
    pub username: String,
}

impl LoginFormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `signed_in` switches the form into its sign-out mode.
    pub fn handle_event(&mut self, event: &TuiEvent, signed_in: bool) -> Option<LoginEvent> {
        if signed_in {
            return matches!(event, TuiEvent::Submit).then_some(LoginEvent::Logout);
        }
        match event {
            TuiEvent::InputChar(c) if *c != '\n' => {
                self.username.push(*c);
                None
            }
            TuiEvent::Paste(text) => {
                self.username.push_str(text.lines().next().unwrap_or_default());
                None
            }
            TuiEvent::Backspace => {
                self.username.pop();
                None
            }
            TuiEvent::Submit => {
                let name = self.username.trim();
                if name.is_empty() {
                    return None;
                }
                let name = name.to_string();
                self.username.clear();
                Some(LoginEvent::Submit(name))
            }
            _ => None,
        }
    }
}

pub struct LoginForm<'a> {
    state: &'a LoginFormState,
    signed_in_as: Option<&'a str>,
    pending: bool,
}

impl<'a> LoginForm<'a> {
    pub fn new(state: &'a LoginFormState, signed_in_as: Option<&'a str>, pending: bool) -> Self {
        Self {
            state,
            signed_in_as,
            pending,
        }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let dim = Style::default().add_modifier(Modifier::DIM);
        if let Some(name) = self.signed_in_as {
            return vec![
                Line::raw(""),
                Line::from(vec![
                    Span::raw("Signed in as "),
                    Span::styled(name.to_string(), Style::default().fg(Color::Green)),
                ]),
                Line::raw(""),
                Line::styled("Enter sign out", dim),
            ];
        }
        let status = if self.pending {
            Line::styled("Signing in...", Style::default().fg(Color::Yellow))
        } else {
            Line::styled("Enter sign in. No password needed.", dim)
        };
        vec![
            Line::raw("Username"),
            Line::styled(
                format!("> {}", self.state.username),
                Style::default().fg(Color::Cyan),
            ),
            Line::raw(""),
            status,
        ]
    }
}

impl Component for LoginForm<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [row] = Layout::vertical([Constraint::Length(FORM_HEIGHT)])
            .flex(Flex::Center)
            .areas(area);
        let [form] = Layout::horizontal([Constraint::Length(FORM_WIDTH)])
            .flex(Flex::Center)
            .areas(row);

        let title = if self.signed_in_as.is_some() { " Account " } else { " Sign in " };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title)
            .padding(Padding::uniform(1));
        let inner = block.inner(form);
        frame.render_widget(Paragraph::new(self.lines()).block(block), form);

        if self.signed_in_as.is_none() && !self.pending {
            // after "> " on the second line
            let col = u16::try_from(self.state.username.width() + 2).unwrap_or(u16::MAX);
            let x = inner.x + col.min(inner.width.saturating_sub(1));
            frame.set_cursor_position((x, inner.y + 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn type_str(state: &mut LoginFormState, s: &str) {
        for c in s.chars() {
            state.handle_event(&TuiEvent::InputChar(c), false);
        }
    }

    fn draw(form: &mut LoginForm) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 15)).unwrap();
        terminal.draw(|f| form.render(f, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_submit_trims_and_clears() {
        let mut state = LoginFormState::new();
        type_str(&mut state, "  Bob ");
        assert_eq!(
            state.handle_event(&TuiEvent::Submit, false),
            Some(LoginEvent::Submit("Bob".to_string()))
        );
        assert!(state.username.is_empty());
    }

    #[test]
    fn test_blank_username_is_not_submitted() {
        let mut state = LoginFormState::new();
        type_str(&mut state, "   ");
        assert_eq!(state.handle_event(&TuiEvent::Submit, false), None);
    }

    #[test]
    fn test_backspace_and_newline() {
        let mut state = LoginFormState::new();
        type_str(&mut state, "Bobb\n");
        state.handle_event(&TuiEvent::Backspace, false);
        assert_eq!(state.username, "Bob");
    }

    #[test]
    fn test_signed_in_enter_logs_out() {
        let mut state = LoginFormState::new();
        assert_eq!(state.handle_event(&TuiEvent::InputChar('x'), true), None);
        assert!(state.username.is_empty());
        assert_eq!(
            state.handle_event(&TuiEvent::Submit, true),
            Some(LoginEvent::Logout)
        );
    }

    #[test]
    fn test_render_modes() {
        let mut state = LoginFormState::new();
        type_str(&mut state, "Bob");
        let text = draw(&mut LoginForm::new(&state, None, false));
        assert!(text.contains("Sign in"));
        assert!(text.contains("> Bob"));

        let text = draw(&mut LoginForm::new(&state, None, true));
        assert!(text.contains("Signing in..."));

        let text = draw(&mut LoginForm::new(&state, Some("Bob"), false));
        assert!(text.contains("Signed in as Bob"));
        assert!(text.contains("sign out"));
    }
}
