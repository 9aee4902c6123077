//! # Chat Session
//!
//! One conversation with the model: the visible transcript plus the context
//! that travels with every request. The two diverge on purpose. The
//! transcript carries greetings and error lines the model never sees, and
//! the context carries the script seed prompt the user never sees.
//!
//! ```text
//! send ──► pending ──► receive* ──► finish
//!                 └──────────────► fail      (context rolled back)
//!                 └──────────────► interrupt (partial reply kept)
//! ```

use log::{debug, info};

use crate::core::fence::{Segment, split_segments};
use crate::core::library::ScriptItem;
use crate::inference::Context;

pub const GREETING: &str = "Hello! I'm Water IA. What are we building for Roblox today?";
pub const CLEARED: &str = "Chat cleared. Send a new idea!";
pub const SEND_ERROR: &str = "Error communicating with the AI.";
pub const EMPTY_REPLY: &str = "The AI returned an empty reply.";
pub const INTERRUPTED_SUFFIX: &str = "\n\n[interrupted]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            is_error: true,
        }
    }

    /// Display segments. Error lines are never split.
    pub fn segments(&self) -> Vec<Segment> {
        if self.is_error {
            return vec![Segment::Prose(self.text.clone())];
        }
        split_segments(&self.text)
    }
}

/// Bookkeeping for the request in flight.
#[derive(Debug, Clone, Copy)]
struct PendingTurn {
    /// Context length before the user turn was added.
    context_len: usize,
    /// Whether a model message for this turn exists in the transcript yet.
    reply_started: bool,
}

pub struct ChatSession {
    messages: Vec<ChatMessage>,
    context: Context,
    system_prompt: String,
    pending: Option<PendingTurn>,
    generation: u64,
    epoch: u64,
}

impl ChatSession {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            messages: vec![ChatMessage::model(GREETING)],
            context: Context::new(&system_prompt),
            system_prompt,
            pending: None,
            generation: 0,
            epoch: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    /// Bumped every time the conversation is replaced or a turn starts.
    /// Stream events tagged with an older generation belong to a request
    /// whose conversation no longer exists.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bumped whenever the transcript is replaced wholesale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Starts a user turn. Returns `false` (and changes nothing) for blank
    /// input or while a reply is still pending.
    pub fn send(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || self.is_waiting() {
            return false;
        }
        self.begin_turn(text.to_string(), ChatMessage::user(text));
        true
    }

    /// Appends streamed text to the in-flight reply.
    pub fn receive(&mut self, chunk: &str) {
        let Some(pending) = self.pending.as_mut() else {
            debug!("Dropping chunk with no pending turn");
            return;
        };
        self.context.append_to_last_model_message(chunk);

        if pending.reply_started
            && let Some(last) = self.messages.last_mut()
        {
            last.text.push_str(chunk);
        } else {
            pending.reply_started = true;
            self.messages.push(ChatMessage::model(chunk));
        }
    }

    /// Marks the reply complete. An empty reply is reported as an error.
    pub fn finish(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if !pending.reply_started {
            info!("Model returned an empty reply");
            self.context.truncate(pending.context_len);
            self.messages.push(ChatMessage::error(EMPTY_REPLY));
        }
    }

    /// Ends the turn with an error line and drops the turn from the context,
    /// so a retry does not send a dangling user message.
    pub fn fail(&mut self, message: &str) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        info!("Chat turn failed: {message}");
        // Partial reply text, if any, stays visible above the error line.
        self.context.truncate(pending.context_len);
        self.messages.push(ChatMessage::error(SEND_ERROR));
    }

    /// Stops waiting for the reply. Partial text is kept in both the
    /// transcript and the context.
    pub fn interrupt(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.generation += 1;
        if pending.reply_started {
            if let Some(last) = self.messages.last_mut() {
                last.text.push_str(INTERRUPTED_SUFFIX);
            }
        } else {
            self.context.truncate(pending.context_len);
        }
        info!("Chat turn interrupted");
    }

    /// Clears the transcript and drops all context.
    pub fn reset(&mut self) {
        self.replace_with(ChatMessage::model(CLEARED));
    }

    /// New conversation showing only the greeting.
    pub fn start_fresh(&mut self) {
        self.replace_with(ChatMessage::model(GREETING));
    }

    /// New conversation seeded with an existing script. The model receives
    /// the code; the transcript shows a short intro line instead.
    pub fn start_with_script(&mut self, script: &ScriptItem) {
        self.messages.clear();
        self.context = Context::new(&self.system_prompt);
        self.pending = None;
        self.epoch += 1;
        self.begin_turn(
            script_seed_prompt(script),
            ChatMessage::user(format!(
                "I want to continue editing the script: {}",
                script.title
            )),
        );
    }

    fn replace_with(&mut self, first: ChatMessage) {
        self.messages = vec![first];
        self.context = Context::new(&self.system_prompt);
        self.pending = None;
        self.generation += 1;
        self.epoch += 1;
    }

    fn begin_turn(&mut self, context_text: String, shown: ChatMessage) {
        self.generation += 1;
        self.pending = Some(PendingTurn {
            context_len: self.context.len(),
            reply_started: false,
        });
        self.context.add_user_message(context_text);
        self.messages.push(shown);
    }
}

fn script_seed_prompt(script: &ScriptItem) -> String {
    format!(
        "I have this Roblox script titled \"{}\":\n\n```lua\n{}\n```\n\n\
         Briefly summarize what it does and ask what I would like to change.",
        script.title, script.code
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fence::code_blocks;
    use crate::inference::Source;

    fn session() -> ChatSession {
        ChatSession::new("You write Luau.")
    }

    fn script() -> ScriptItem {
        ScriptItem {
            id: "s1".to_string(),
            title: "Door".to_string(),
            code: "script.Parent.Touched:Connect(print)".to_string(),
            created_at: 0,
            user_id: "user_bob".to_string(),
            tags: None,
        }
    }

    #[test]
    fn starts_with_greeting() {
        let chat = session();
        assert_eq!(chat.messages(), &[ChatMessage::model(GREETING)]);
        assert_eq!(chat.context().len(), 1);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut chat = session();
        assert!(!chat.send("   \n"));
        assert_eq!(chat.messages().len(), 1);
        assert!(!chat.is_waiting());
    }

    #[test]
    fn send_while_waiting_is_ignored() {
        let mut chat = session();
        assert!(chat.send("make a door"));
        assert!(!chat.send("and a window"));
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.context().turns().count(), 1);
    }

    #[test]
    fn streamed_reply_grows_one_message() {
        let mut chat = session();
        chat.send("make a part");
        chat.receive("local p = ");
        chat.receive("Instance.new(\"Part\")");
        chat.finish();

        assert!(!chat.is_waiting());
        let last = chat.messages().last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.text, "local p = Instance.new(\"Part\")");
        assert_eq!(chat.context().len(), 3);
        assert_eq!(chat.context().items[2].content, last.text);
    }

    #[test]
    fn reply_text_is_kept_verbatim() {
        let mut chat = session();
        chat.send("greet a friend");
        let code = "local msg = \"Say “hello” — friend…\"\nprint(msg)";
        chat.receive("```lua\n");
        chat.receive(code);
        chat.receive("\n```");
        chat.finish();

        let last = chat.messages().last().unwrap();
        assert_eq!(code_blocks(&last.text), vec![code.to_string()]);
        assert_eq!(chat.context().items[2].content, last.text);
    }

    #[test]
    fn failure_appends_error_and_rolls_back_context() {
        let mut chat = session();
        chat.send("make a part");
        chat.fail("network down");

        let last = chat.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.text, SEND_ERROR);
        assert_eq!(chat.context().len(), 1);

        // A retry sends exactly one user turn
        chat.send("make a part");
        assert_eq!(chat.context().turns().count(), 1);
    }

    #[test]
    fn empty_reply_becomes_error() {
        let mut chat = session();
        chat.send("hi");
        chat.finish();
        let last = chat.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(chat.context().len(), 1);
    }

    #[test]
    fn reset_drops_prior_turns_from_next_request() {
        let mut chat = session();
        chat.send("secret first idea");
        chat.receive("sure");
        chat.finish();

        chat.reset();
        assert_eq!(chat.messages(), &[ChatMessage::model(CLEARED)]);

        chat.send("second idea");
        let ctx = chat.context();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.items[0].source, Source::Directive);
        assert_eq!(ctx.items[1].content, "second idea");
        assert!(!ctx.items.iter().any(|s| s.content.contains("secret")));
    }

    #[test]
    fn reset_while_waiting_invalidates_generation() {
        let mut chat = session();
        chat.send("hi");
        let before = chat.generation();
        let epoch = chat.epoch();
        chat.reset();
        assert!(!chat.is_waiting());
        assert_ne!(chat.generation(), before);
        assert_ne!(chat.epoch(), epoch);
    }

    #[test]
    fn start_with_script_seeds_context() {
        let mut chat = session();
        chat.send("old");
        chat.start_with_script(&script());

        assert!(chat.is_waiting());
        assert_eq!(
            chat.messages(),
            &[ChatMessage::user(
                "I want to continue editing the script: Door"
            )]
        );
        let seed = &chat.context().items[1].content;
        assert!(seed.contains("Door"));
        assert!(seed.contains("```lua\nscript.Parent.Touched:Connect(print)\n```"));
        assert_eq!(chat.context().turns().count(), 1);

        chat.receive("This script prints touches.");
        chat.finish();
        assert_eq!(chat.messages().len(), 2);
    }

    #[test]
    fn interrupt_keeps_partial_reply() {
        let mut chat = session();
        chat.send("long one");
        chat.receive("partial");
        chat.interrupt();

        assert!(!chat.is_waiting());
        assert!(chat.messages().last().unwrap().text.ends_with("[interrupted]"));
        assert_eq!(chat.context().items.last().unwrap().content, "partial");
    }

    #[test]
    fn interrupt_before_reply_drops_turn() {
        let mut chat = session();
        chat.send("never answered");
        chat.interrupt();
        assert_eq!(chat.context().len(), 1);
        // user line stays visible
        assert_eq!(chat.messages().len(), 2);
    }

    #[test]
    fn error_messages_render_as_single_prose() {
        let msg = ChatMessage::error("```not code```");
        assert_eq!(msg.segments(), vec![Segment::Prose("```not code```".to_string())]);
    }
}
