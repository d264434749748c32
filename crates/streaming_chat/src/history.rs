use crate::chat_completions::{ChatCompletionMessage, Role};
use crate::{Error, Result};

/// Ordered append log of the messages exchanged in one conversation.
///
/// The first message is always the system prompt the history was initialized
/// with, and it is the only system message.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    system_prompt: String,
    messages: Vec<ChatCompletionMessage>,
}

impl ConversationHistory {
    pub fn initialize(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            messages: vec![ChatCompletionMessage::system(system_prompt.as_str())],
            system_prompt,
        }
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Result<()> {
        if role == Role::System {
            return Err(Error::InvalidRoleError(role));
        }
        self.messages.push(ChatCompletionMessage::new(role, content));
        Ok(())
    }

    /// Drops every user and assistant message, keeping the system prompt.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.messages
            .push(ChatCompletionMessage::system(self.system_prompt.as_str()));
    }

    pub fn snapshot(&self) -> Vec<ChatCompletionMessage> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[ChatCompletionMessage] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_with_system_prompt() {
        let history = ConversationHistory::initialize("You are a helpful AI assistant.");
        assert_eq!(
            history.messages(),
            &[ChatCompletionMessage::system("You are a helpful AI assistant.")]
        );
    }

    #[test]
    fn test_append_keeps_order_and_rejects_system() {
        let mut history = ConversationHistory::initialize("prompt");
        history.append(Role::User, "Hello").unwrap();
        history.append(Role::Assistant, "Hi there").unwrap();

        let err = history.append(Role::System, "another prompt").unwrap_err();
        assert!(matches!(err, Error::InvalidRoleError(Role::System)));

        let roles: Vec<Role> = history.messages().iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn test_clear_restores_configured_prompt() {
        let mut history = ConversationHistory::initialize("prompt");
        for turn in 0..3 {
            history.append(Role::User, format!("question {turn}")).unwrap();
            history.append(Role::Assistant, format!("answer {turn}")).unwrap();
        }

        history.clear();
        assert_eq!(history.messages(), &[ChatCompletionMessage::system("prompt")]);

        history.clear();
        assert_eq!(history.messages().len(), 1);
        assert_eq!(history.system_prompt(), "prompt");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut history = ConversationHistory::initialize("prompt");
        history.append(Role::User, "Hello").unwrap();

        let snapshot = history.snapshot();
        history.append(Role::Assistant, "Hi").unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(history.messages().len(), 3);
    }
}
