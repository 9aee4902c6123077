/// Who produced a segment of the conversation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Source {
    User,
    Model,
    /// System instruction. Always the first item of a [`Context`].
    Directive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextSegment {
    pub source: Source,
    pub content: String,
}

/// Conversation state sent to the model with every request.
///
/// Providers are stateless, so the full context travels on each call.
/// Dropping context ("reset") means replacing this value with a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub items: Vec<ContextSegment>,
}

impl Context {
    /// Creates a context holding only the system directive.
    pub fn new(directive: &str) -> Self {
        Context {
            items: vec![ContextSegment {
                source: Source::Directive,
                content: directive.to_string(),
            }],
        }
    }

    pub fn add(&mut self, segment: ContextSegment) {
        self.items.push(segment);
    }

    pub fn add_user_message(&mut self, content: String) {
        self.add(ContextSegment {
            source: Source::User,
            content,
        });
    }

    /// Appends to the trailing model message, starting one if the last item
    /// came from someone else.
    pub fn append_to_last_model_message(&mut self, content: &str) {
        if let Some(seg) = self.items.last_mut()
            && seg.source == Source::Model
        {
            seg.content.push_str(content);
            return;
        }

        self.add(ContextSegment {
            source: Source::Model,
            content: content.to_string(),
        });
    }

    /// Text of the system directive, if present.
    pub fn directive(&self) -> Option<&str> {
        self.items
            .iter()
            .find(|seg| seg.source == Source::Directive)
            .map(|seg| seg.content.as_str())
    }

    /// User and model turns, in order, without the directive.
    pub fn turns(&self) -> impl Iterator<Item = &ContextSegment> {
        self.items.iter().filter(|seg| seg.source != Source::Directive)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops everything after the first `len` items.
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }
}

/// A piece of a streamed model reply.
#[derive(Debug, PartialEq)]
pub enum StreamChunk {
    Content(String),
    /// The provider saw the end-of-response marker.
    Completed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_holds_only_directive() {
        let ctx = Context::new("be helpful");
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.directive(), Some("be helpful"));
        assert_eq!(ctx.turns().count(), 0);
    }

    #[test]
    fn append_starts_new_model_message_after_user() {
        let mut ctx = Context::new("sys");
        ctx.add_user_message("make a part".to_string());
        ctx.append_to_last_model_message("local p");
        ctx.append_to_last_model_message(" = Instance.new(\"Part\")");

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.items[2].source, Source::Model);
        assert_eq!(ctx.items[2].content, "local p = Instance.new(\"Part\")");
    }

    #[test]
    fn truncate_rolls_back_turns() {
        let mut ctx = Context::new("sys");
        ctx.add_user_message("one".to_string());
        ctx.append_to_last_model_message("reply");
        ctx.truncate(1);
        assert_eq!(ctx.turns().count(), 0);
        assert_eq!(ctx.directive(), Some("sys"));
    }
}
