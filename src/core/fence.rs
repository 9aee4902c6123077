//! Splitting model replies into prose and fenced code.
//!
//! A fence is the shortest span between two ```` ``` ```` markers. An
//! unterminated fence is left in the prose.

use std::sync::LazyLock;

use regex::Regex;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("Code fence regex pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Prose(String),
    Code {
        language: Option<String>,
        code: String,
    },
}

impl Segment {
    pub fn is_code(&self) -> bool {
        matches!(self, Segment::Code { .. })
    }
}

/// Splits `text` into trimmed prose and code segments, in order.
/// Whitespace-only prose is dropped.
pub fn split_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in FENCE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_prose(&mut segments, &text[last..whole.start()]);
        let (language, code) = split_info_string(inner.as_str());
        segments.push(Segment::Code {
            language,
            code: code.trim().to_string(),
        });
        last = whole.end();
    }
    push_prose(&mut segments, &text[last..]);

    segments
}

/// Code bodies of every fenced segment in `text`.
pub fn code_blocks(text: &str) -> Vec<String> {
    split_segments(text)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Code { code, .. } if !code.is_empty() => Some(code),
            _ => None,
        })
        .collect()
}

fn push_prose(segments: &mut Vec<Segment>, raw: &str) {
    let prose = raw.trim();
    if !prose.is_empty() {
        segments.push(Segment::Prose(prose.to_string()));
    }
}

/// Separates a leading info string (```` ```lua ````) from the fence body.
///
/// `lua`/`luau` is always taken as the language. Any other word only counts
/// when it sits alone on the opening line, so ```` ```print(1)``` ```` keeps
/// its code intact.
fn split_info_string(inner: &str) -> (Option<String>, &str) {
    let word_len = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || "_+#.-".contains(c)))
        .unwrap_or(inner.len());
    if word_len == 0 {
        return (None, inner);
    }

    let (word, rest) = inner.split_at(word_len);
    let is_lua = word.eq_ignore_ascii_case("lua") || word.eq_ignore_ascii_case("luau");
    let on_own_line = rest.trim_start_matches([' ', '\t', '\r']).starts_with('\n');

    if (is_lua && (rest.is_empty() || rest.starts_with(char::is_whitespace))) || on_own_line {
        (Some(word.to_ascii_lowercase()), rest)
    } else {
        (None, inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(s: &str) -> Segment {
        Segment::Prose(s.to_string())
    }

    fn lua(code: &str) -> Segment {
        Segment::Code {
            language: Some("lua".to_string()),
            code: code.to_string(),
        }
    }

    #[test]
    fn splits_prose_code_prose() {
        let segs = split_segments("Hello\n```lua\nprint(1)\n```\nDone");
        assert_eq!(segs, vec![prose("Hello"), lua("print(1)"), prose("Done")]);
    }

    #[test]
    fn plain_text_is_single_prose_segment() {
        assert_eq!(split_segments("  just words \n"), vec![prose("just words")]);
        assert!(split_segments("   \n ").is_empty());
    }

    #[test]
    fn fence_without_language() {
        let segs = split_segments("```\nlocal x = 1\n```");
        assert_eq!(
            segs,
            vec![Segment::Code {
                language: None,
                code: "local x = 1".to_string()
            }]
        );
    }

    #[test]
    fn other_language_on_its_own_line_is_stripped() {
        let segs = split_segments("```json\n{\"a\": 1}\n```");
        assert_eq!(
            segs,
            vec![Segment::Code {
                language: Some("json".to_string()),
                code: "{\"a\": 1}".to_string()
            }]
        );
    }

    #[test]
    fn inline_fence_keeps_code() {
        let segs = split_segments("Try ```print(1)``` now");
        assert_eq!(
            segs,
            vec![
                prose("Try"),
                Segment::Code {
                    language: None,
                    code: "print(1)".to_string()
                },
                prose("now"),
            ]
        );
        let segs = split_segments("```lua print(2)```");
        assert_eq!(segs, vec![lua("print(2)")]);
    }

    #[test]
    fn luau_and_uppercase_are_normalized() {
        assert_eq!(split_segments("```Luau\nwait()\n```"), vec![Segment::Code {
            language: Some("luau".to_string()),
            code: "wait()".to_string()
        }]);
        assert_eq!(split_segments("```LUA\nwait()\n```"), vec![lua("wait()")]);
    }

    #[test]
    fn multiple_fences_use_shortest_match() {
        let text = "A\n```lua\none()\n```\nB\n```lua\ntwo()\n```";
        assert_eq!(
            split_segments(text),
            vec![prose("A"), lua("one()"), prose("B"), lua("two()")]
        );
        assert_eq!(code_blocks(text), vec!["one()", "two()"]);
    }

    #[test]
    fn unterminated_fence_stays_prose() {
        let segs = split_segments("Here:\n```lua\nprint(1)");
        assert_eq!(segs, vec![prose("Here:\n```lua\nprint(1)")]);
        assert!(code_blocks("Here:\n```lua\nprint(1)").is_empty());
    }

    #[test]
    fn empty_fences_are_not_saveable() {
        assert!(code_blocks("```lua\n```").is_empty());
        assert!(split_segments("```lua\n```")[0].is_code());
    }
}
