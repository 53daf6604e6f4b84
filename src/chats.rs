use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::lock;
use crate::proto::LoopbackProto;
use crate::session::{ChatRegistryPort, ChatState};

// Chat-state timing, applied per conversation on each idle notification.
const PAUSED_AFTER: Duration = Duration::from_secs(10);
const INACTIVE_AFTER: Duration = Duration::from_secs(30);
const GONE_AFTER: Duration = Duration::from_secs(600);

struct Conversation {
    state: ChatState,
    changed_at: Instant,
}

impl Conversation {
    fn new() -> Self {
        Self {
            state: ChatState::Active,
            changed_at: Instant::now(),
        }
    }
}

/// Registry of open conversations keyed by bare address. Owns each
/// conversation's chat-state machine; the session only triggers checks.
pub(crate) struct ChatRegistry {
    conversations: HashMap<String, Conversation>,
    /// Open order, for stable idle fan-out.
    order: Vec<String>,
    focused: Option<String>,
    proto: Arc<Mutex<LoopbackProto>>,
}

impl ChatRegistry {
    pub(crate) fn new(proto: Arc<Mutex<LoopbackProto>>) -> Self {
        Self {
            conversations: HashMap::new(),
            order: Vec::new(),
            focused: None,
            proto,
        }
    }

    /// Open (or re-focus) the conversation with `contact`.
    pub(crate) fn open(&mut self, contact: &str) {
        if !self.conversations.contains_key(contact) {
            self.conversations
                .insert(contact.to_string(), Conversation::new());
            self.order.push(contact.to_string());
            tracing::debug!(contact, "conversation opened");
        }
        self.focused = Some(contact.to_string());
    }

    /// Close the focused conversation, announcing `gone` to the peer.
    pub(crate) fn close_focused(&mut self) -> Option<String> {
        let contact = self.focused.take()?;
        if self.conversations.remove(&contact).is_some() {
            self.order.retain(|c| c != &contact);
            lock(&self.proto).send_chat_state(&contact, ChatState::Gone);
            tracing::debug!(contact = %contact, "conversation closed");
        }
        Some(contact)
    }

    /// A message was sent in this conversation; that counts as activity and
    /// resets the state machine to `Active`.
    pub(crate) fn message_sent(&mut self, contact: &str) {
        if let Some(conv) = self.conversations.get_mut(contact) {
            conv.state = ChatState::Active;
            conv.changed_at = Instant::now();
        }
    }

    fn transition(
        proto: &Arc<Mutex<LoopbackProto>>,
        contact: &str,
        conv: &mut Conversation,
        next: ChatState,
    ) {
        conv.state = next;
        conv.changed_at = Instant::now();
        lock(proto).send_chat_state(contact, next);
    }

    #[cfg(test)]
    fn backdate(&mut self, contact: &str, by: Duration) {
        if let Some(conv) = self.conversations.get_mut(contact) {
            conv.changed_at = Instant::now() - by;
        }
    }
}

impl ChatRegistryPort for ChatRegistry {
    fn open_conversations(&self) -> Vec<String> {
        self.order.clone()
    }

    fn focused_chat(&self) -> Option<String> {
        self.focused.clone()
    }

    fn handle_idle(&mut self, contact: &str) {
        let Some(conv) = self.conversations.get_mut(contact) else {
            return;
        };
        let quiet = conv.changed_at.elapsed();
        match conv.state {
            ChatState::Composing if quiet >= PAUSED_AFTER => {
                Self::transition(&self.proto, contact, conv, ChatState::Paused);
            }
            ChatState::Active | ChatState::Paused if quiet >= INACTIVE_AFTER => {
                Self::transition(&self.proto, contact, conv, ChatState::Inactive);
            }
            ChatState::Inactive if quiet >= GONE_AFTER => {
                Self::transition(&self.proto, contact, conv, ChatState::Gone);
            }
            _ => {}
        }
    }

    fn handle_activity(&mut self, contact: &str) {
        let Some(conv) = self.conversations.get_mut(contact) else {
            return;
        };
        if conv.state == ChatState::Composing {
            conv.changed_at = Instant::now();
        } else {
            Self::transition(&self.proto, contact, conv, ChatState::Composing);
        }
    }
}

impl ChatRegistryPort for Arc<Mutex<ChatRegistry>> {
    fn open_conversations(&self) -> Vec<String> {
        lock(self).open_conversations()
    }

    fn focused_chat(&self) -> Option<String> {
        lock(self).focused_chat()
    }

    fn handle_idle(&mut self, contact: &str) {
        lock(self).handle_idle(contact);
    }

    fn handle_activity(&mut self, contact: &str) {
        lock(self).handle_activity(contact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn registry() -> ChatRegistry {
        let (tx, _rx) = unbounded();
        ChatRegistry::new(Arc::new(Mutex::new(LoopbackProto::new(tx))))
    }

    fn state(registry: &ChatRegistry, contact: &str) -> ChatState {
        registry.conversations[contact].state
    }

    #[test]
    fn open_focuses_and_lists_in_order() {
        let mut registry = registry();
        registry.open("alice@example.org");
        registry.open("bob@example.org");

        assert_eq!(
            registry.open_conversations(),
            vec!["alice@example.org".to_string(), "bob@example.org".to_string()]
        );
        assert_eq!(registry.focused_chat().as_deref(), Some("bob@example.org"));

        registry.open("alice@example.org");
        assert_eq!(registry.focused_chat().as_deref(), Some("alice@example.org"));
        assert_eq!(registry.open_conversations().len(), 2);
    }

    #[test]
    fn typing_moves_conversation_to_composing() {
        let mut registry = registry();
        registry.open("alice@example.org");
        registry.handle_activity("alice@example.org");
        assert_eq!(state(&registry, "alice@example.org"), ChatState::Composing);
    }

    #[test]
    fn composing_pauses_after_quiet_gap() {
        let mut registry = registry();
        registry.open("alice@example.org");
        registry.handle_activity("alice@example.org");

        registry.handle_idle("alice@example.org");
        assert_eq!(state(&registry, "alice@example.org"), ChatState::Composing);

        registry.backdate("alice@example.org", PAUSED_AFTER);
        registry.handle_idle("alice@example.org");
        assert_eq!(state(&registry, "alice@example.org"), ChatState::Paused);
    }

    #[test]
    fn idle_walks_active_through_inactive_to_gone() {
        let mut registry = registry();
        registry.open("alice@example.org");

        registry.backdate("alice@example.org", INACTIVE_AFTER);
        registry.handle_idle("alice@example.org");
        assert_eq!(state(&registry, "alice@example.org"), ChatState::Inactive);

        registry.backdate("alice@example.org", GONE_AFTER);
        registry.handle_idle("alice@example.org");
        assert_eq!(state(&registry, "alice@example.org"), ChatState::Gone);
    }

    #[test]
    fn activity_revives_paused_conversation() {
        let mut registry = registry();
        registry.open("alice@example.org");
        registry.handle_activity("alice@example.org");
        registry.backdate("alice@example.org", PAUSED_AFTER);
        registry.handle_idle("alice@example.org");

        registry.handle_activity("alice@example.org");
        assert_eq!(state(&registry, "alice@example.org"), ChatState::Composing);
    }

    #[test]
    fn close_removes_focus_and_listing() {
        let mut registry = registry();
        registry.open("alice@example.org");
        assert_eq!(
            registry.close_focused().as_deref(),
            Some("alice@example.org")
        );
        assert!(registry.focused_chat().is_none());
        assert!(registry.open_conversations().is_empty());
        assert!(registry.close_focused().is_none());
    }

    #[test]
    fn unknown_contact_notifications_are_ignored() {
        let mut registry = registry();
        registry.handle_idle("ghost@example.org");
        registry.handle_activity("ghost@example.org");
        assert!(registry.open_conversations().is_empty());
    }
}
