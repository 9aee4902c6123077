use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::core::chat::{ChatMessage, Role};
use crate::core::fence::code_blocks;
use crate::tui::component::Component;
use crate::tui::markdown::render_message;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// Pulse intensity threshold above which the border transitions from normal to BOLD.
const PULSE_BOLD_THRESHOLD: f32 = 0.6;
/// Pulse intensity threshold above which the border transitions from DIM to normal.
const PULSE_NORMAL_THRESHOLD: f32 = 0.2;

/// A single chat message in a rounded box.
///
/// Transient: built each frame from a borrowed [`ChatMessage`]. Selection and
/// pulse come from the parent `MessageList`.
#[derive(Clone, Copy)]
pub struct Message<'a> {
    pub message: &'a ChatMessage,
    pub is_selected: bool,
    /// 0.0..=1.0, non-zero only for the reply being streamed
    pub pulse_intensity: f32,
}

impl<'a> Message<'a> {
    pub fn new(message: &'a ChatMessage, is_selected: bool, pulse_intensity: f32) -> Self {
        Self {
            message,
            is_selected,
            pulse_intensity,
        }
    }

    /// Rendered height at `width`, borders included.
    ///
    /// Measured with the same `Paragraph` used for drawing, so the layout
    /// cache and the render pass always agree.
    pub fn calculate_height(message: &ChatMessage, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            return 1;
        }
        if message.text.trim().is_empty() {
            return VERTICAL_OVERHEAD;
        }
        let lines = body(message).line_count(content_width);
        u16::try_from(lines.max(1))
            .unwrap_or(u16::MAX)
            .saturating_add(VERTICAL_OVERHEAD)
    }
}

fn body(message: &ChatMessage) -> Paragraph<'static> {
    Paragraph::new(render_message(message, text_color(message))).wrap(Wrap { trim: false })
}

fn text_color(message: &ChatMessage) -> Color {
    match (message.role, message.is_error) {
        (_, true) => Color::Red,
        (Role::User, false) => Color::Green,
        (Role::Model, false) => Color::Blue,
    }
}

fn label(message: &ChatMessage) -> &'static str {
    match (message.role, message.is_error) {
        (_, true) => "error",
        (Role::User, false) => "you",
        (Role::Model, false) => "water",
    }
}

impl Widget for Message<'_> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let style = Style::default().fg(text_color(self.message));

        // Selection overrides the dim resting border
        let mut border_style = if self.is_selected {
            Style::default().fg(Color::Cyan)
        } else {
            style.add_modifier(Modifier::DIM)
        };

        // Three-phase breathing while the reply streams: DIM → normal → BOLD
        if self.pulse_intensity > PULSE_BOLD_THRESHOLD {
            border_style = border_style
                .remove_modifier(Modifier::DIM)
                .add_modifier(Modifier::BOLD);
        } else if self.pulse_intensity > PULSE_NORMAL_THRESHOLD {
            border_style = border_style.remove_modifier(Modifier::DIM);
        }

        let mut block = Block::bordered()
            .title(label(self.message))
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));

        if self.is_selected && self.message.role == Role::Model && !self.message.is_error {
            let blocks = code_blocks(&self.message.text).len();
            if blocks > 0 {
                let hint = if blocks == 1 {
                    " s: save script ".to_string()
                } else {
                    format!(" s: save {blocks} scripts ")
                };
                block = block.title_bottom(Line::from(hint).right_aligned());
            }
        }

        let inner = block.inner(area);
        block.render(area, buf);
        body(self.message).render(inner, buf);
    }
}

impl Component for Message<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen(msg: &ChatMessage, selected: bool, width: u16) -> String {
        let height = Message::calculate_height(msg, width);
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| {
                f.render_widget(Message::new(msg, selected, 0.0), f.area());
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn calculate_height_empty_content_returns_border_height() {
        let msg = ChatMessage::model("   ");
        assert_eq!(Message::calculate_height(&msg, 80), VERTICAL_OVERHEAD);
    }

    #[test]
    fn calculate_height_zero_width_returns_minimum() {
        let msg = ChatMessage::user("Hello world");
        assert_eq!(Message::calculate_height(&msg, 0), 1);
        assert_eq!(Message::calculate_height(&msg, HORIZONTAL_OVERHEAD), 1);
    }

    #[test]
    fn calculate_height_single_line_fits() {
        let msg = ChatMessage::user("Hello");
        assert_eq!(Message::calculate_height(&msg, 80), 1 + VERTICAL_OVERHEAD);
    }

    #[test]
    fn calculate_height_counts_code_frame() {
        let msg = ChatMessage::model("Here:\n```lua\nprint(1)\n```");
        // "Here:", blank, top frame, code line, bottom frame
        assert_eq!(Message::calculate_height(&msg, 80), 5 + VERTICAL_OVERHEAD);
    }

    #[test]
    fn calculate_height_wraps_long_prose() {
        let msg = ChatMessage::user("Hello world");
        // content width 5 forces a wrap
        assert!(Message::calculate_height(&msg, 9) >= 2 + VERTICAL_OVERHEAD);
    }

    #[test]
    fn labels_and_colors_by_role() {
        assert_eq!(label(&ChatMessage::user("x")), "you");
        assert_eq!(label(&ChatMessage::model("x")), "water");
        assert_eq!(label(&ChatMessage::error("x")), "error");
        assert_eq!(text_color(&ChatMessage::error("x")), Color::Red);
        assert_eq!(text_color(&ChatMessage::user("x")), Color::Green);
    }

    #[test]
    fn selected_reply_with_code_shows_save_hint() {
        let msg = ChatMessage::model("```lua\nprint(1)\n```");
        assert!(screen(&msg, true, 40).contains("s: save script"));
        assert!(!screen(&msg, false, 40).contains("s: save"));

        let two = ChatMessage::model("```lua\na()\n```\n```lua\nb()\n```");
        assert!(screen(&two, true, 40).contains("s: save 2 scripts"));
    }
}
