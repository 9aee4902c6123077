//! # Home Page Component
//!
//! Landing panel shown at startup: what Water IA does and how to get going.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::component::Component;

const TAGLINE: &str = "Describe a game mechanic. Get a Luau script.";

pub struct HomePage<'a> {
    pub username: Option<&'a str>,
}

impl<'a> HomePage<'a> {
    pub fn new(username: Option<&'a str>) -> Self {
        Self { username }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let dim = Style::default().fg(Color::DarkGray);
        let key = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

        let mut lines = vec![
            Line::styled(
                "W A T E R   I A",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Line::styled("Roblox scripting assistant", dim),
            Line::raw(""),
            Line::raw(TAGLINE),
            Line::raw(""),
            Line::from(vec![
                Span::styled("Enter", key),
                Span::raw(" or "),
                Span::styled("F2", key),
                Span::raw(" start generating"),
            ]),
            Line::from(vec![
                Span::styled("F3", key),
                Span::raw(" your script library"),
            ]),
        ];
        match self.username {
            Some(name) => lines.push(Line::styled(
                format!("Signed in as {name}"),
                Style::default().fg(Color::Green),
            )),
            None => lines.push(Line::from(vec![
                Span::styled("F4", key),
                Span::raw(" sign in to save scripts"),
            ])),
        }
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            dim,
        ));
        lines
    }
}

impl Component for HomePage<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let lines = self.lines();
        let height = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        let [center] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), center);
    }
}
