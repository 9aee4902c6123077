//! # NavBar Component
//!
//! Top line: app name, one tab per [`View`] with its function key, and the
//! signed-in user on the right.
//!
//! Stateless. Every field is a prop copied from `App` each frame.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::core::state::View;
use crate::tui::component::Component;

pub struct NavBar<'a> {
    pub current: View,
    pub username: Option<&'a str>,
    pub model_name: &'a str,
}

impl<'a> NavBar<'a> {
    pub fn new(current: View, username: Option<&'a str>, model_name: &'a str) -> Self {
        Self {
            current,
            username,
            model_name,
        }
    }

    fn tabs(&self) -> Line<'static> {
        let mut spans = vec![Span::styled(
            " Water IA ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )];
        for (i, view) in View::ALL.into_iter().enumerate() {
            let style = if view == self.current {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::raw("  "));
            spans.push(Span::styled(format!("F{} {}", i + 1, view.label()), style));
        }
        Line::from(spans)
    }

    fn account(&self) -> Line<'static> {
        let who = match self.username {
            Some(name) => Span::styled(name.to_string(), Style::default().fg(Color::Green)),
            None => Span::styled("not signed in", Style::default().add_modifier(Modifier::DIM)),
        };
        Line::from(vec![
            Span::styled(
                format!("{} │ ", self.model_name),
                Style::default().add_modifier(Modifier::DIM),
            ),
            who,
            Span::raw(" "),
        ])
        .right_aligned()
    }
}

impl Component for NavBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let account = self.account();
        let account_width = u16::try_from(account.width()).unwrap_or(u16::MAX);
        let [left, right] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(account_width)]).areas(area);
        frame.render_widget(Paragraph::new(self.tabs()), left);
        frame.render_widget(Paragraph::new(account), right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(bar: &mut NavBar) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 1)).unwrap();
        terminal.draw(|f| bar.render(f, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_shows_every_view_tab() {
        let text = draw(&mut NavBar::new(View::Library, None, "gemini-2.5-pro"));
        for view in View::ALL {
            assert!(text.contains(view.label()), "missing tab {}", view.label());
        }
        assert!(text.contains("F3 Library"));
        assert!(text.contains("not signed in"));
    }

    #[test]
    fn test_shows_signed_in_user_and_model() {
        let text = draw(&mut NavBar::new(View::Home, Some("Bob"), "test-model"));
        assert!(text.contains("Bob"));
        assert!(text.contains("test-model"));
        assert!(!text.contains("not signed in"));
    }

    #[test]
    fn test_current_tab_is_highlighted() {
        let bar = NavBar::new(View::Generator, None, "m");
        let tabs = bar.tabs();
        let current = tabs
            .spans
            .iter()
            .find(|s| s.content == "F2 Generator")
            .unwrap();
        assert!(current.style.add_modifier.contains(Modifier::UNDERLINED));
        let other = tabs.spans.iter().find(|s| s.content == "F1 Home").unwrap();
        assert!(!other.style.add_modifier.contains(Modifier::UNDERLINED));
    }
}
