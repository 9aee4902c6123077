//! # Library Browser Component
//!
//! The user's saved scripts: a list on the left, highlighted code of the
//! selected script on the right.
//!
//! Follows the persistent state + transient wrapper pattern:
//! - `LibraryBrowserState` (selection, delete confirmation) lives in `TuiState`
//! - `LibraryBrowser` is created each frame with the scripts from `App`

use chrono::{DateTime, Local, Utc};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, List, ListItem, ListState, Padding, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::library::ScriptItem;
use crate::tui::component::Component;
use crate::tui::event::TuiEvent;
use crate::tui::markdown::render_code;

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryEvent {
    /// Open the script in the generator.
    Edit(ScriptItem),
    /// Confirmed delete of the script with this id.
    Delete(String),
    Reload,
}

#[derive(Default)]
pub struct LibraryBrowserState {
    pub selected: usize,
    pub confirm_delete: bool,
    pub list_state: ListState,
}

impl LibraryBrowserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the selection inside a list of `len` scripts.
    pub fn sync(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            self.list_state.select(None);
        } else {
            self.selected = self.selected.min(len - 1);
            self.list_state.select(Some(self.selected));
        }
    }

    pub fn handle_event(&mut self, event: &TuiEvent, scripts: &[ScriptItem]) -> Option<LibraryEvent> {
        // Any other key cancels a pending delete
        if !matches!(event, TuiEvent::InputChar('d')) {
            self.confirm_delete = false;
        }
        self.sync(scripts.len());

        match event {
            TuiEvent::CursorUp => {
                self.selected = self.selected.saturating_sub(1);
                self.sync(scripts.len());
                None
            }
            TuiEvent::CursorDown => {
                self.selected = self.selected.saturating_add(1);
                self.sync(scripts.len());
                None
            }
            TuiEvent::Submit => scripts
                .get(self.selected)
                .map(|s| LibraryEvent::Edit(s.clone())),
            TuiEvent::InputChar('r') => Some(LibraryEvent::Reload),
            TuiEvent::InputChar('d') => {
                let script = scripts.get(self.selected)?;
                if self.confirm_delete {
                    self.confirm_delete = false;
                    Some(LibraryEvent::Delete(script.id.clone()))
                } else {
                    self.confirm_delete = true;
                    None
                }
            }
            _ => None,
        }
    }
}

pub struct LibraryBrowser<'a> {
    state: &'a mut LibraryBrowserState,
    scripts: &'a [ScriptItem],
    loading: bool,
    signed_in: bool,
}

impl<'a> LibraryBrowser<'a> {
    pub fn new(
        state: &'a mut LibraryBrowserState,
        scripts: &'a [ScriptItem],
        loading: bool,
        signed_in: bool,
    ) -> Self {
        Self {
            state,
            scripts,
            loading,
            signed_in,
        }
    }

    fn help_text(&self) -> &'static str {
        if self.state.confirm_delete {
            " Press d again to delete | any other key cancels "
        } else {
            " Enter Edit  d Delete  r Reload "
        }
    }

    fn render_message(&self, frame: &mut Frame, area: Rect, block: Block, text: &str) {
        let paragraph = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(paragraph, area);
    }

    fn list_item(&self, index: usize, script: &ScriptItem, width: usize) -> ListItem<'static> {
        let date = format_timestamp(script.created_at);
        let lines = format!("{} lines", script.line_count());
        let fixed = date.width() + lines.width() + 4;
        let title = truncate_to_width(&script.title, width.saturating_sub(fixed));
        let pad = width.saturating_sub(fixed + title.width());

        let style = match (index == self.state.selected, self.state.confirm_delete) {
            (true, true) => Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            (true, false) => Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            (false, _) => Style::default().fg(Color::Gray),
        };
        ListItem::new(Line::from(vec![
            Span::styled(date, style),
            Span::styled("  ", style),
            Span::styled(title, style),
            Span::styled(" ".repeat(pad + 2), style),
            Span::styled(lines, style.add_modifier(Modifier::DIM)),
        ]))
    }
}

impl Component for LibraryBrowser<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" My Scripts ")
            .padding(Padding::horizontal(1));

        if !self.signed_in {
            return self.render_message(frame, area, block, "Sign in (F4) to see your scripts.");
        }
        if self.loading && self.scripts.is_empty() {
            return self.render_message(frame, area, block, "Loading scripts...");
        }
        if self.scripts.is_empty() {
            return self.render_message(
                frame,
                area,
                block,
                "No saved scripts yet. Select a reply with code in the Generator and press s.",
            );
        }

        self.state.sync(self.scripts.len());
        let [list_area, preview_area] =
            Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(area);

        let block = block.title_bottom(Line::from(self.help_text()).centered());
        let width = usize::from(block.inner(list_area).width);
        let items: Vec<ListItem> = self
            .scripts
            .iter()
            .enumerate()
            .map(|(i, s)| self.list_item(i, s, width))
            .collect();
        frame.render_stateful_widget(List::new(items).block(block), list_area, &mut self.state.list_state);

        if let Some(script) = self.scripts.get(self.state.selected) {
            let preview = Paragraph::new(render_code(Some("lua"), &script.code)).block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(format!(" {} ", script.title))
                    .padding(Padding::horizontal(1)),
            );
            frame.render_widget(preview, preview_area);
        }
    }
}

/// Unix milliseconds as a short local date, e.g. "Jan 15 14:02".
fn format_timestamp(ms: i64) -> String {
    let dt: DateTime<Local> = DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .with_timezone(&Local);
    dt.format("%b %d %H:%M").to_string()
}

/// Truncate to at most `max_width` display columns, ending in "..." when cut.
fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max_width - 3 {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str("...");
    out
}
