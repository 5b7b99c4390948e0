//! Conversation state handed to the model.
//!
//! The first message is always the system instructions; [`Conversation::reset`]
//! keeps them and drops everything else.  History behind them is capped:
//! [`Conversation::compact`] drops the oldest whole turns once more than
//! `max_history` messages have piled up.

use crate::models::ChatMessage;

/// Built-in assistant instructions.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant integrated with various tools. \
When users ask for information from GitHub, web browsing, or search results, \
the matching tool fetches it for you and its output is given to you as context.\n\n\
For general questions, provide helpful, concise, and accurate answers. \
For tool-specific requests, answer from the tool output you were given.";

/// Messages kept behind the system instructions by default.
pub const DEFAULT_MAX_HISTORY: usize = 40;

#[derive(Debug, Clone)]
pub struct Conversation {
    system_prompt: String,
    messages: Vec<ChatMessage>,
    max_history: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            messages: vec![ChatMessage::system(system_prompt.clone())],
            system_prompt,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    /// Cap the history behind the system instructions (at least one
    /// message is always kept).
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history.max(1);
        self
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Drop the oldest messages until at most `max_history` remain behind
    /// the system instructions, then keep dropping until the history
    /// starts at a user message so no turn is left half cut.  Returns the
    /// number of messages removed.
    pub fn compact(&mut self) -> usize {
        let mut excess = self.messages.len().saturating_sub(1 + self.max_history);
        while let Some(msg) = self.messages.get(1 + excess) {
            if msg.role == "user" {
                break;
            }
            excess += 1;
        }
        if excess == 0 {
            return 0;
        }
        self.messages.drain(1..1 + excess);
        excess
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    /// Add background the model should use, e.g. tool output.
    pub fn push_context(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::system(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Drop everything but the system instructions.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// Roll back to `len` messages.  Never drops the system instructions.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len.max(1));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system instructions are present.
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_system_prompt() {
        let c = Conversation::default();
        assert_eq!(c.len(), 1);
        assert!(c.is_empty());
        assert_eq!(c.messages()[0].role, "system");
        assert_eq!(c.messages()[0].content, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn reset_keeps_instructions() {
        let mut c = Conversation::new("be brief");
        c.push_user("hi");
        c.push_context("Tool response (github): none");
        c.push_assistant("hello");
        assert_eq!(c.len(), 4);
        c.reset();
        assert_eq!(c.messages(), &[ChatMessage::system("be brief")]);
        c.reset();
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn compact_drops_oldest_whole_turns() {
        let mut c = Conversation::new("sys").with_max_history(4);
        for turn in 0..3 {
            c.push_user(format!("q{turn}"));
            c.push_context(format!("Tool response (github): r{turn}"));
            c.push_assistant(format!("a{turn}"));
        }
        assert_eq!(c.len(), 10);

        let dropped = c.compact();
        // Cutting to four would start at reply "a1", so that goes too
        // and the history begins at "q2".
        assert_eq!(dropped, 6);
        assert_eq!(
            c.messages(),
            &[
                ChatMessage::system("sys"),
                ChatMessage::user("q2"),
                ChatMessage::system("Tool response (github): r2"),
                ChatMessage::assistant("a2"),
            ]
        );
        assert_eq!(c.compact(), 0);
    }

    #[test]
    fn compact_is_a_no_op_under_the_cap() {
        let mut c = Conversation::default();
        c.push_user("hi");
        c.push_assistant("hello");
        assert_eq!(c.compact(), 0);
        assert_eq!(c.len(), 3);
        assert_eq!(Conversation::new("s").with_max_history(0).max_history(), 1);
    }

    #[test]
    fn truncate_never_drops_instructions() {
        let mut c = Conversation::default();
        c.push_user("hi");
        c.truncate(0);
        assert_eq!(c.len(), 1);
        assert_eq!(c.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }
}
