//! # MessageList Component
//!
//! Scrollable view of the chat transcript.
//!
//! ## Responsibilities
//!
//! - Display the list of messages
//! - Scrolling and stick-to-bottom while a reply streams
//! - Hit testing for mouse interactions
//! - Layout caching (message heights)
//!
//! ## Architecture
//!
//! `MessageList` is a transient component (created each frame) that wraps
//! `&'a mut MessageListState` (persistent state) and the transcript (props).
//! `Component::render` takes `&mut self`, so the layout cache and scroll
//! state are updated during the render pass, like Ratatui's `StatefulWidget`.

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::chat::{ChatMessage, Role};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::Message;
use crate::tui::event::TuiEvent;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
/// Rows reserved below the transcript for the "writing" indicator.
const INDICATOR_PADDING: u16 = 2;

/// Layout and scroll state for the message list.
/// Persisted in the parent `TuiState`.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Hovered or keyboard-selected message
    pub selected_index: Option<usize>,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true,
            selected_index: None,
            viewport_height: 0,
        }
    }

    fn max_offset(&self) -> u16 {
        self.layout
            .total_height()
            .saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Scroll the viewport so the selected message is fully visible.
    /// A message taller than the viewport is aligned by its top edge.
    pub fn scroll_to_selected(&mut self) {
        let Some(idx) = self.selected_index else {
            return;
        };
        let Some(&item_bottom) = self.layout.prefix_heights.get(idx) else {
            return;
        };
        let item_top = self.layout.item_top(idx);
        let offset_y = self.scroll_state.offset().y;

        if item_top < offset_y {
            self.scroll_state.set_offset(Position { x: 0, y: item_top });
            self.stick_to_bottom = false;
        } else if item_bottom > offset_y + self.viewport_height {
            let new_y = item_bottom.saturating_sub(self.viewport_height);
            let new_y = new_y.min(item_top);
            self.scroll_state.set_offset(Position { x: 0, y: new_y });
            self.stick_to_bottom = new_y >= self.max_offset();
        }
    }

    /// Clamp scroll and re-engage auto-scroll once the user reaches the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Index of the message under viewport row `row` (0 = top of the list area).
    pub fn message_at_row(&self, row: u16) -> Option<usize> {
        let y = self.scroll_state.offset().y.saturating_add(row);
        let idx = self.layout.prefix_heights.partition_point(|&end| end <= y);
        (idx < self.layout.prefix_heights.len()).then_some(idx)
    }

    /// Moves the selection by `delta` messages, starting from the last
    /// message when nothing is selected.
    pub fn move_selection(&mut self, delta: isize, message_count: usize) {
        if message_count == 0 {
            self.selected_index = None;
            return;
        }
        let last = message_count - 1;
        let next = match self.selected_index {
            None => last,
            Some(i) => i.saturating_add_signed(delta).min(last),
        };
        self.selected_index = Some(next);
        self.scroll_to_selected();
    }

    /// Forget layout and selection, e.g. after the conversation is replaced.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Scrollable conversation view component.
/// Created fresh each frame with references to state and data.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub messages: &'a [ChatMessage],
    /// Bumped when the transcript is replaced; invalidates cached heights
    pub epoch: u64,
    pub is_loading: bool,
    pub pulse_value: f32,
    pub spinner_frame: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(
        state: &'a mut MessageListState,
        messages: &'a [ChatMessage],
        epoch: u64,
        is_loading: bool,
        pulse_value: f32,
        spinner_frame: usize,
    ) -> Self {
        Self {
            state,
            messages,
            epoch,
            is_loading,
            pulse_value,
            spinner_frame,
        }
    }
}

impl Component for MessageList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // scrollbar column
        let num_items = self.messages.len();

        // 1. Update layout cache
        let layout = &mut self.state.layout;
        let reusable = layout.reusable_count(self.messages, content_width, self.epoch);
        layout.heights.truncate(reusable);
        for message in self.messages.iter().skip(layout.heights.len()) {
            layout
                .heights
                .push(Message::calculate_height(message, content_width));
        }
        layout.rebuild_prefix_heights();
        layout.update_metadata(self.messages, content_width, self.epoch);

        let total_height = self.state.layout.total_height();
        let show_indicator = self.is_loading && self.state.stick_to_bottom;
        let padding = if show_indicator {
            INDICATOR_PADDING.min(area.height / 2)
        } else {
            0
        };

        // 2. Clamp, unless auto-scroll is about to target the padded canvas
        self.state.viewport_height = area.height;
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        let scroll_offset = self.state.scroll_state.offset().y;
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);

        // 3. Render visible messages into a ScrollView
        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height + padding))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset = self.state.layout.item_top(visible_range.start);
        for i in visible_range {
            let message = &self.messages[i];
            let height = self.state.layout.heights[i];
            let is_last = i + 1 == num_items;
            let streaming = is_last && self.is_loading && message.role == Role::Model;
            let is_selected = self.state.selected_index == Some(i) && !streaming;
            let pulse = if streaming { self.pulse_value } else { 0.0 };

            scroll_view.render_widget(
                Message::new(message, is_selected, pulse),
                Rect::new(0, y_offset, content_width, height),
            );
            y_offset += height;
        }

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }
        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);

        // 4. "Writing" indicator in the padding below the transcript
        if show_indicator && padding > 0 {
            let spinner = SPINNER[self.spinner_frame % SPINNER.len()];
            let line = Line::from(vec![
                Span::styled(spinner, Style::default().fg(Color::Cyan)),
                Span::styled(
                    " Water IA is writing... (Esc to stop)",
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]);
            let row = area.y + area.height.saturating_sub(1);
            frame.render_widget(
                Paragraph::new(line),
                Rect::new(area.x + 1, row, content_width.saturating_sub(1), 1),
            );
        }
    }
}

/// Scroll handling lives on the persistent state; `MessageList` is rebuilt
/// every frame.
impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            _ => {}
        }
        None
    }
}

/// Cached layout measurements
pub struct LayoutCache {
    pub heights: Vec<u16>,
    pub prefix_heights: Vec<u16>,
    message_count: usize,
    content_width: u16,
    epoch: u64,
    /// Byte length of the last measured message, which may still be growing
    last_text_len: usize,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            heights: Vec::new(),
            prefix_heights: Vec::new(),
            message_count: 0,
            content_width: 0,
            epoch: 0,
            last_text_len: 0,
        }
    }

    /// Number of cached heights still valid for `messages`.
    ///
    /// The transcript only ever appends, except that the last message grows
    /// while a reply streams (and gains a suffix when interrupted).
    pub fn reusable_count(&self, messages: &[ChatMessage], content_width: u16, epoch: u64) -> usize {
        if self.content_width != content_width
            || self.epoch != epoch
            || self.heights.is_empty()
            || messages.len() < self.message_count
        {
            return 0;
        }

        let last_cached = self.message_count.saturating_sub(1);
        let tail_unchanged = messages
            .get(last_cached)
            .is_some_and(|m| m.text.len() == self.last_text_len);
        let stable = if tail_unchanged {
            self.message_count
        } else {
            last_cached
        };
        stable.min(self.heights.len())
    }

    pub fn update_metadata(&mut self, messages: &[ChatMessage], content_width: u16, epoch: u64) {
        self.message_count = messages.len();
        self.content_width = content_width;
        self.epoch = epoch;
        self.last_text_len = messages.last().map_or(0, |m| m.text.len());
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    /// Canvas row where message `idx` starts.
    pub fn item_top(&self, idx: usize) -> u16 {
        match idx {
            0 => 0,
            i => self.prefix_heights.get(i - 1).copied().unwrap_or(0),
        }
    }

    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end.max(start)
    }
}
