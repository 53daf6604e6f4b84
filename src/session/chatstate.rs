use super::*;

// Stateless routing from idle/activity ticks to the conversation-scoped
// chat-state machines. The per-state timing rules live in the registry.
impl Session {
    /// Notify every open conversation that the user has gone quiet.
    pub(super) fn handle_idle_fanout(&mut self) {
        if self.proto.connection_status() != ConnectionStatus::Connected {
            return;
        }
        for contact in self.chats.open_conversations() {
            self.chats.handle_idle(&contact);
        }
    }

    /// Notify the focused conversation, if any, that the user is typing.
    pub(super) fn handle_activity(&mut self) {
        if self.proto.connection_status() != ConnectionStatus::Connected {
            return;
        }
        if let Some(contact) = self.chats.focused_chat() {
            self.chats.handle_activity(&contact);
        }
    }
}
