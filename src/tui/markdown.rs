//! Chat message → ratatui `Text` renderer.
//!
//! A reply is first cut into prose and fenced code with
//! [`split_segments`](crate::core::fence::split_segments). Prose goes through
//! `pulldown_cmark` (headings, emphasis, inline code, lists, quotes, links);
//! code is framed and highlighted with `syntect`, as Luau unless the fence
//! names another language.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::core::chat::ChatMessage;
use crate::core::fence::Segment;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const THEME: &str = "base16-ocean.dark";
const FRAME: Color = Color::DarkGray;

/// Renders a whole chat message. Error messages are shown verbatim in red.
pub fn render_message(message: &ChatMessage, base_fg: Color) -> Text<'static> {
    if message.is_error {
        return Text::from(
            message
                .text
                .lines()
                .map(|l| Line::from(Span::styled(l.to_owned(), Style::default().fg(Color::Red))))
                .collect::<Vec<_>>(),
        );
    }

    let mut out = Text::default();
    for (i, segment) in message.segments().into_iter().enumerate() {
        if i > 0 {
            out.lines.push(Line::default());
        }
        let rendered = match segment {
            Segment::Prose(prose) => render_prose(&prose, base_fg),
            Segment::Code { language, code } => render_code(language.as_deref(), &code),
        };
        out.lines.extend(rendered.lines);
    }
    out
}

/// Markdown prose into styled lines using `base_fg` for body text.
pub fn render_prose(content: &str, base_fg: Color) -> Text<'static> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);

    let mut w = ProseWriter::new(base_fg);
    for event in Parser::new_ext(content, opts) {
        w.handle(event);
    }
    w.text
}

/// A framed, highlighted code block.
///
/// ```text
/// ╭── lua ──
/// │ print("hi")
/// ╰──
/// ```
pub fn render_code(language: Option<&str>, code: &str) -> Text<'static> {
    let frame = Style::default().fg(FRAME);
    let label = language.unwrap_or("lua").to_owned();
    let mut lines = vec![Line::from(vec![
        Span::styled("╭── ", frame),
        Span::styled(label.clone(), frame.add_modifier(Modifier::BOLD)),
        Span::styled(" ──", frame),
    ])];

    let code = code.replace('\t', "    ");
    let body: Vec<Vec<Span<'static>>> = match (syntax_for(&label), THEME_SET.themes.get(THEME)) {
        (Some(syntax), Some(theme)) => highlight(&code, syntax, theme),
        _ => code
            .lines()
            .map(|l| vec![Span::styled(l.to_owned(), Style::default().fg(Color::White))])
            .collect(),
    };
    for spans in body {
        let mut line = vec![Span::styled("│ ", frame)];
        line.extend(spans);
        lines.push(Line::from(line));
    }

    lines.push(Line::from(Span::styled("╰──", frame)));
    Text::from(lines)
}

fn syntax_for(language: &str) -> Option<&'static SyntaxReference> {
    let token = if language.eq_ignore_ascii_case("luau") {
        "lua"
    } else {
        language
    };
    SYNTAX_SET.find_syntax_by_token(token)
}

fn highlight(code: &str, syntax: &SyntaxReference, theme: &Theme) -> Vec<Vec<Span<'static>>> {
    let mut hl = HighlightLines::new(syntax, theme);
    let mut out = Vec::new();
    for line in LinesWithEndings::from(code) {
        let spans = match hl.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => ranges
                .into_iter()
                .filter_map(|(style, frag)| {
                    let content = frag.trim_end_matches(['\r', '\n']);
                    (!content.is_empty()).then(|| {
                        let fg = Color::Rgb(style.foreground.r, style.foreground.g, style.foreground.b);
                        Span::styled(content.to_owned(), Style::default().fg(fg))
                    })
                })
                .collect(),
            Err(_) => vec![Span::raw(line.trim_end_matches(['\r', '\n']).to_owned())],
        };
        out.push(spans);
    }
    out
}

// ── Prose writer ────────────────────────────────────────────────────────────

struct ProseWriter {
    text: Text<'static>,
    base_fg: Color,
    /// Inline styles compose via `patch` so nested bold+italic works.
    styles: Vec<Style>,
    /// Blockquote `│` prefixes.
    quote_depth: usize,
    /// None = bullet list, Some(n) = ordered list at n.
    lists: Vec<Option<u64>>,
    /// Indented code block text, flushed at its end tag.
    code: Option<String>,
    link_url: Option<String>,
    needs_blank: bool,
}

impl ProseWriter {
    fn new(base_fg: Color) -> Self {
        Self {
            text: Text::default(),
            base_fg,
            styles: Vec::new(),
            quote_depth: 0,
            lists: Vec::new(),
            code: None,
            link_url: None,
            needs_blank: false,
        }
    }

    fn style(&self) -> Style {
        self.styles
            .last()
            .copied()
            .unwrap_or_else(|| Style::default().fg(self.base_fg))
    }

    fn push_style(&mut self, overlay: Style) {
        self.styles.push(self.style().patch(overlay));
    }

    fn new_line(&mut self) {
        let mut line = Line::default();
        for _ in 0..self.quote_depth {
            line.push_span(Span::styled("│ ", Style::default().fg(FRAME)));
        }
        self.text.lines.push(line);
    }

    fn push_span(&mut self, span: Span<'static>) {
        if self.text.lines.is_empty() {
            self.new_line();
        }
        if let Some(line) = self.text.lines.last_mut() {
            line.push_span(span);
        }
    }

    fn start_block(&mut self) {
        if self.needs_blank {
            self.text.lines.push(Line::default());
            self.needs_blank = false;
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.text(t),
            Event::Code(c) => self.push_span(Span::styled(
                c.to_string(),
                Style::default().fg(Color::White).bg(Color::DarkGray),
            )),
            Event::SoftBreak => self.push_span(Span::raw(" ")),
            Event::HardBreak => self.new_line(),
            Event::Rule => {
                self.start_block();
                self.text
                    .lines
                    .push(Line::from(Span::styled("─".repeat(40), Style::default().fg(FRAME))));
                self.needs_blank = true;
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.start_block();
                self.new_line();
            }
            Tag::Heading { level, .. } => {
                self.start_block();
                let style = heading_style(self.base_fg, level);
                self.new_line();
                self.push_span(Span::styled(format!("{} ", "#".repeat(level as usize)), style));
                self.push_style(style);
            }
            Tag::BlockQuote(_) => {
                self.start_block();
                self.quote_depth += 1;
                self.push_style(Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC));
            }
            Tag::CodeBlock(_) => {
                self.start_block();
                self.code = Some(String::new());
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.start_block();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.new_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{indent}{n}. ");
                        *n += 1;
                        m
                    }
                    _ => format!("{indent}- "),
                };
                self.push_span(Span::styled(marker, Style::default().fg(FRAME)));
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link_url = Some(dest_url.to_string());
                self.push_style(link_style());
            }
            _ => {}
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.needs_blank = true,
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.needs_blank = true;
            }
            TagEnd::BlockQuote(_) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.styles.pop();
                self.needs_blank = true;
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    let block = render_code(None, code.trim_end());
                    self.text.lines.extend(block.lines);
                }
                self.needs_blank = true;
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.needs_blank = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.link_url.take() {
                    self.push_span(Span::raw(" ("));
                    self.push_span(Span::styled(url, link_style()));
                    self.push_span(Span::raw(")"));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, cow: CowStr<'_>) {
        if let Some(code) = self.code.as_mut() {
            code.push_str(&cow);
            return;
        }
        // ratatui renders \t as zero-width
        let text = cow.replace('\t', "    ");
        let style = self.style();
        self.push_span(Span::styled(text, style));
    }
}

fn link_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::UNDERLINED)
}

fn heading_style(base_fg: Color, level: HeadingLevel) -> Style {
    let style = Style::default().fg(base_fg).add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => style.add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => style,
        _ => style.add_modifier(Modifier::ITALIC),
    }
}
