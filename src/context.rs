//! Context assembly for provider replay
//!
//! The provider rejects message sequences that do not open with a user
//! turn, so stored history is trimmed before replay. Callers that persist
//! the incoming message first must drop it from the history they pass in
//! and let `assemble` append the fresh copy, or the turn is duplicated.

use crate::conversation::{ChatMessage, Message};

/// Build the message sequence for a completion call: prior history (leading
/// assistant turns trimmed) followed by the new user message.
pub fn assemble(history: &[Message], new_message: &str) -> Vec<ChatMessage> {
    let start = history
        .iter()
        .position(|m| m.role == crate::conversation::Role::User)
        .unwrap_or(history.len());

    let mut messages: Vec<ChatMessage> = history[start..]
        .iter()
        .map(|m| ChatMessage {
            role: m.role,
            content: m.content.clone(),
        })
        .collect();

    messages.push(ChatMessage::user(new_message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use chrono::Utc;

    fn stored(role: Role, content: &str) -> Message {
        Message {
            id: 0,
            conversation_id: 1,
            role,
            content: content.to_string(),
            model: None,
            tokens_used: 0,
            input_tokens: 0,
            output_tokens: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_history_yields_single_message() {
        let messages = assemble(&[], "hello");
        assert_eq!(messages, vec![ChatMessage::user("hello")]);
    }

    #[test]
    fn history_is_replayed_in_order_with_new_message_last() {
        let history = vec![
            stored(Role::User, "first"),
            stored(Role::Assistant, "reply"),
        ];

        let messages = assemble(&history, "second");
        assert_eq!(
            messages,
            vec![
                ChatMessage::user("first"),
                ChatMessage::assistant("reply"),
                ChatMessage::user("second"),
            ]
        );
    }

    #[test]
    fn leading_assistant_turns_are_trimmed() {
        let history = vec![
            stored(Role::Assistant, "orphaned reply"),
            stored(Role::User, "question"),
            stored(Role::Assistant, "answer"),
        ];

        let messages = assemble(&history, "follow-up");
        assert_eq!(messages[0], ChatMessage::user("question"));
        assert_eq!(messages.last().unwrap(), &ChatMessage::user("follow-up"));
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn all_assistant_history_degenerates_to_new_message_only() {
        let history = vec![stored(Role::Assistant, "stray")];
        let messages = assemble(&history, "hello");
        assert_eq!(messages, vec![ChatMessage::user("hello")]);
    }
}
