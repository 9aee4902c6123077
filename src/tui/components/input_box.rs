//! # InputBox Component
//!
//! Multi-line prompt editor for the generator view.
//!
//! The buffer and cursor are internal state. `busy` and `focused` are props
//! refreshed from the app every frame. Text is word-wrapped with `textwrap`
//! and grows up to [`MAX_VISIBLE_LINES`] rows before scrolling internally.

use std::ops::Range;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};
use textwrap::WordSeparator;
use textwrap::core::break_words;
use textwrap::wrap_algorithms::wrap_first_fit;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Border (2) + padding (2) consumed horizontally
const HORIZONTAL_OVERHEAD: u16 = 4;
const VERTICAL_OVERHEAD: u16 = 2;
pub const MAX_VISIBLE_LINES: u16 = 5;
const PLACEHOLDER: &str = "Describe the Roblox script you need...";

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Enter pressed with non-blank text. The buffer has been cleared.
    Submit(String),
    ContentChanged,
}

pub struct InputBox {
    pub buffer: String,
    /// Prop: a reply is streaming
    pub busy: bool,
    /// Prop: keystrokes go to the input (false in cursor mode)
    pub focused: bool,
    /// Cursor as a byte offset into `buffer`
    cursor: usize,
    scroll_offset: u16,
    last_width: u16,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            busy: false,
            focused: true,
            cursor: 0,
            scroll_offset: 0,
            last_width: 80,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Height for the current buffer at `width`, borders included.
    pub fn calculate_height(&self, width: u16) -> u16 {
        let rows = visual_rows(&self.buffer, inner_width(width));
        let visible = u16::try_from(rows.len())
            .unwrap_or(u16::MAX)
            .clamp(1, MAX_VISIBLE_LINES);
        visible + VERTICAL_OVERHEAD
    }

    fn insert(&mut self, text: &str) -> Option<InputEvent> {
        self.buffer.insert_str(self.cursor, text);
        self.cursor += text.len();
        Some(InputEvent::ContentChanged)
    }

    fn move_to(&mut self, pos: usize) -> Option<InputEvent> {
        (pos != self.cursor).then(|| {
            self.cursor = pos;
            InputEvent::ContentChanged
        })
    }

    /// Moves one visual row up or down, keeping the display column.
    fn move_vertically(&mut self, down: bool) -> Option<InputEvent> {
        let rows = visual_rows(&self.buffer, inner_width(self.last_width));
        let current = row_of(&rows, self.cursor);
        let target = if down {
            current + 1
        } else {
            current.checked_sub(1)?
        };
        let row = rows.get(target)?;
        let column = self.buffer[rows[current].start..self.cursor].width();

        let mut pos = row.start;
        let mut acc = 0;
        for (i, c) in self.buffer[row.clone()].char_indices() {
            let w = c.width().unwrap_or(0);
            if acc + w > column {
                break;
            }
            acc += w;
            pos = row.start + i + c.len_utf8();
        }
        // The end of a soft-wrapped row is the start of the next one
        if pos == row.end
            && rows.get(target + 1).is_some_and(|next| next.start == row.end)
            && let Some((i, _)) = self.buffer[row.clone()].char_indices().next_back()
        {
            pos = row.start + i;
        }
        self.move_to(pos)
    }

    fn update_scroll(&mut self, rows: &[Range<usize>]) {
        let total = u16::try_from(rows.len()).unwrap_or(u16::MAX);
        if total <= MAX_VISIBLE_LINES {
            self.scroll_offset = 0;
            return;
        }
        let line = u16::try_from(row_of(rows, self.cursor)).unwrap_or(u16::MAX);
        if line < self.scroll_offset {
            self.scroll_offset = line;
        } else if line >= self.scroll_offset + MAX_VISIBLE_LINES {
            self.scroll_offset = line + 1 - MAX_VISIBLE_LINES;
        }
        self.scroll_offset = self.scroll_offset.min(total - MAX_VISIBLE_LINES);
    }

    fn title(&self) -> &'static str {
        if self.busy {
            "Water IA is writing (Esc to stop)"
        } else if self.focused {
            "Prompt (Enter to send, Shift+Enter for newline)"
        } else {
            "Prompt (Esc or i to type)"
        }
    }
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.last_width = area.width;
        let width = inner_width(area.width);
        let rows = visual_rows(&self.buffer, width);
        self.update_scroll(&rows);

        let border_style = if self.focused && !self.busy {
            Style::default().fg(Color::Green)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title(self.title())
            .padding(Padding::horizontal(1));

        let lines: Vec<Line> = if self.buffer.is_empty() {
            vec![Line::styled(
                PLACEHOLDER,
                Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
            )]
        } else {
            rows.iter()
                .skip(self.scroll_offset as usize)
                .take(MAX_VISIBLE_LINES as usize)
                .map(|r| Line::raw(self.buffer[r.clone()].trim_end_matches(' ').to_string()))
                .collect()
        };
        let inner = block.inner(area);
        frame.render_widget(Paragraph::new(lines).block(block), area);

        if self.focused && width > 0 {
            let row = row_of(&rows, self.cursor);
            let col = self.buffer[rows[row].start..self.cursor].width();
            let col = u16::try_from(col).unwrap_or(u16::MAX).min(width.saturating_sub(1));
            let visible_row = u16::try_from(row)
                .unwrap_or(u16::MAX)
                .saturating_sub(self.scroll_offset);
            frame.set_cursor_position((inner.x + col, inner.y + visible_row));
        }
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => self.insert(c.encode_utf8(&mut [0; 4])),
            TuiEvent::Paste(text) => self.insert(&text.replace("\r\n", "\n")),
            TuiEvent::Backspace => {
                let (prev, _) = self.buffer[..self.cursor].char_indices().next_back()?;
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Delete => {
                let c = self.buffer[self.cursor..].chars().next()?;
                self.buffer.drain(self.cursor..self.cursor + c.len_utf8());
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorLeft => {
                let (prev, _) = self.buffer[..self.cursor].char_indices().next_back()?;
                self.move_to(prev)
            }
            TuiEvent::CursorRight => {
                let c = self.buffer[self.cursor..].chars().next()?;
                self.move_to(self.cursor + c.len_utf8())
            }
            TuiEvent::Home => {
                let start = self.buffer[..self.cursor].rfind('\n').map_or(0, |i| i + 1);
                self.move_to(start)
            }
            TuiEvent::End => {
                let end = self.buffer[self.cursor..]
                    .find('\n')
                    .map_or(self.buffer.len(), |i| self.cursor + i);
                self.move_to(end)
            }
            TuiEvent::CursorUp => self.move_vertically(false),
            TuiEvent::CursorDown => self.move_vertically(true),
            TuiEvent::Submit => {
                if self.busy || self.buffer.trim().is_empty() {
                    return None;
                }
                let text = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                self.scroll_offset = 0;
                Some(InputEvent::Submit(text))
            }
            _ => None,
        }
    }
}

fn inner_width(width: u16) -> u16 {
    width.saturating_sub(HORIZONTAL_OVERHEAD)
}

/// Byte ranges of each wrapped row, newlines excluded. Always at least one row.
fn visual_rows(text: &str, width: u16) -> Vec<Range<usize>> {
    let width = usize::from(width.max(1));
    let mut rows = Vec::new();
    let mut base = 0;
    for line in text.split('\n') {
        let words = break_words(WordSeparator::AsciiSpace.find_words(line), width);
        let wrapped = wrap_first_fit(words.as_slice(), &[width as f64]);
        let first_row = rows.len();
        let mut pos = base;
        for row in wrapped {
            let len: usize = row.iter().map(|w| w.word.len() + w.whitespace.len()).sum();
            rows.push(pos..pos + len);
            pos += len;
        }
        if rows.len() == first_row {
            rows.push(base..base);
        } else if pos < base + line.len() {
            // Anything the wrapper left over stays on the last row
            if let Some(last) = rows.last_mut() {
                last.end = base + line.len();
            }
        }
        base += line.len() + 1;
    }
    rows
}

/// Row holding byte offset `pos`. A position shared by two rows belongs to
/// the later one.
fn row_of(rows: &[Range<usize>], pos: usize) -> usize {
    rows.iter().rposition(|r| r.start <= pos).unwrap_or(0)
}
