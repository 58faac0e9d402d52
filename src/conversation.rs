use crate::types::{ChatMessage, Turn};

/// Append-only conversation log for one session.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    /// Start a log with its seed greeting turn.
    pub fn new(seed: Turn) -> Self {
        Self { turns: vec![seed] }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Turns mapped to wire messages, persona speakers becoming `assistant`.
    pub fn to_api_messages(&self) -> Vec<ChatMessage> {
        self.turns.iter().map(ChatMessage::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiRole, Role};

    #[test]
    fn all_returns_turns_in_append_order() {
        let mut log = ConversationLog::new(Turn::assistant("ready"));
        log.append(Turn::user("hello"));
        log.append(Turn::new(Role::persona("A"), "a"));
        log.append(Turn::new(Role::persona("B"), "b"));

        let contents: Vec<&str> = log.all().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["ready", "hello", "a", "b"]);
        assert_eq!(log.last().map(|t| &t.role), Some(&Role::persona("B")));
    }

    #[test]
    fn api_messages_collapse_personas_to_assistant() {
        let mut log = ConversationLog::new(Turn::new(Role::persona("Violet"), "online"));
        log.append(Turn::user("hi"));

        let msgs = log.to_api_messages();
        assert_eq!(msgs[0].role, ApiRole::Assistant);
        assert_eq!(msgs[1].role, ApiRole::User);
    }
}
