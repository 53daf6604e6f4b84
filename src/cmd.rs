use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;

use crate::chats::ChatRegistry;
use crate::crypto::CryptoSessions;
use crate::lock;
use crate::proto::LoopbackProto;
use crate::session::{ChatRegistryPort, CommandOutcome, CommandPort, Presence, ProtocolPort};
use crate::ui::UiNote;

const HELP: &[&str] = &[
    "/connect <account>     sign in",
    "/disconnect            sign out",
    "/msg <contact> [text]  open a chat, optionally send text",
    "/close                 close the focused chat",
    "/status <presence> [message]  publish presence (online/chat/away/xa/dnd)",
    "/encrypt <contact>     start an encrypted session",
    "/quit                  leave",
];

/// The command layer: executes slash commands and routes plain lines to the
/// focused conversation. Outcomes are authoritative for the session loop.
pub(crate) struct CommandSet {
    proto: Arc<Mutex<LoopbackProto>>,
    chats: Arc<Mutex<ChatRegistry>>,
    crypto: Arc<Mutex<CryptoSessions>>,
    notes: Sender<UiNote>,
}

impl CommandSet {
    pub(crate) fn new(
        proto: Arc<Mutex<LoopbackProto>>,
        chats: Arc<Mutex<ChatRegistry>>,
        crypto: Arc<Mutex<CryptoSessions>>,
        notes: Sender<UiNote>,
    ) -> Self {
        Self {
            proto,
            chats,
            crypto,
            notes,
        }
    }

    fn notice(&self, text: impl Into<String>) {
        let _ = self.notes.send(UiNote::Notice(text.into()));
    }

    fn cmd_connect(&mut self, arg: Option<&str>) {
        match arg {
            Some(account) => lock(&self.proto).connect(account),
            None => self.notice("usage: /connect <account>"),
        }
    }

    fn cmd_msg(&mut self, rest: &str) {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let Some(contact) = parts.next().filter(|c| !c.is_empty()) else {
            self.notice("usage: /msg <contact> [text]");
            return;
        };
        lock(&self.chats).open(contact);
        if let Some(body) = parts.next().map(str::trim).filter(|b| !b.is_empty()) {
            self.send_to(contact, body);
        }
    }

    fn cmd_status(&mut self, rest: &str) {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let presence = parts.next().and_then(Presence::parse);
        let Some(presence) = presence else {
            self.notice("usage: /status <online|chat|away|xa|dnd> [message]");
            return;
        };
        let message = parts.next().map(str::trim).filter(|m| !m.is_empty());
        lock(&self.proto).send_presence(presence, message, 0);
    }

    fn cmd_encrypt(&mut self, arg: Option<&str>) {
        match arg {
            Some(contact) => lock(&self.crypto).begin(contact),
            None => self.notice("usage: /encrypt <contact>"),
        }
    }

    fn send_to(&mut self, contact: &str, body: &str) {
        if lock(&self.crypto).is_secure(contact) {
            tracing::debug!(contact, "sending over encrypted session");
        }
        lock(&self.proto).send_message(contact, body);
        lock(&self.chats).message_sent(contact);
        let _ = self.notes.send(UiNote::Outgoing {
            to: contact.to_string(),
            body: body.to_string(),
        });
    }
}

impl CommandPort for CommandSet {
    fn execute(&mut self, name: &str, line: &str) -> CommandOutcome {
        let rest = line[name.len()..].trim();
        let arg = (!rest.is_empty()).then_some(rest);

        match name {
            "/quit" | "/exit" => return CommandOutcome::Terminate,
            "/help" | "/commands" => {
                for entry in HELP {
                    self.notice(*entry);
                }
            }
            "/connect" => self.cmd_connect(arg),
            "/disconnect" => lock(&self.proto).disconnect(),
            "/msg" => self.cmd_msg(rest),
            "/close" => match lock(&self.chats).close_focused() {
                Some(contact) => self.notice(format!("closed chat with {contact}")),
                None => self.notice("no chat window to close"),
            },
            "/status" => self.cmd_status(rest),
            "/encrypt" => self.cmd_encrypt(arg),
            _ => self.notice(format!("unknown command {name}, try /help")),
        }
        CommandOutcome::Continue
    }

    fn execute_default(&mut self, line: &str) -> CommandOutcome {
        let focused = lock(&self.chats).focused_chat();
        match focused {
            Some(contact) => self.send_to(&contact, line),
            None => self.notice("no open chat, use /msg <contact> first"),
        }
        CommandOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver};

    fn commands() -> (CommandSet, Arc<Mutex<ChatRegistry>>, Receiver<UiNote>) {
        let (tx, rx) = unbounded();
        let proto = Arc::new(Mutex::new(LoopbackProto::new(tx.clone())));
        let chats = Arc::new(Mutex::new(ChatRegistry::new(proto.clone())));
        let crypto = Arc::new(Mutex::new(CryptoSessions::new(tx.clone())));
        (
            CommandSet::new(proto, chats.clone(), crypto, tx),
            chats,
            rx,
        )
    }

    fn notices(rx: &Receiver<UiNote>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(note) = rx.try_recv() {
            if let UiNote::Notice(text) = note {
                out.push(text);
            }
        }
        out
    }

    #[test]
    fn quit_and_exit_terminate() {
        let (mut commands, _chats, _rx) = commands();
        assert_eq!(
            commands.execute("/quit", "/quit"),
            CommandOutcome::Terminate
        );
        assert_eq!(
            commands.execute("/exit", "/exit"),
            CommandOutcome::Terminate
        );
    }

    #[test]
    fn unknown_command_reports_and_continues() {
        let (mut commands, _chats, rx) = commands();
        assert_eq!(
            commands.execute("/bogus", "/bogus now"),
            CommandOutcome::Continue
        );
        let notices = notices(&rx);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("/bogus"));
    }

    #[test]
    fn msg_opens_and_focuses_conversation() {
        let (mut commands, chats, _rx) = commands();
        commands.execute("/msg", "/msg alice@example.org");
        assert_eq!(
            lock(&chats).focused_chat().as_deref(),
            Some("alice@example.org")
        );
    }

    #[test]
    fn msg_without_contact_prints_usage() {
        let (mut commands, chats, rx) = commands();
        commands.execute("/msg", "/msg");
        assert!(lock(&chats).focused_chat().is_none());
        assert!(notices(&rx)[0].starts_with("usage:"));
    }

    #[test]
    fn default_line_without_focus_is_a_notice() {
        let (mut commands, _chats, rx) = commands();
        assert_eq!(commands.execute_default("hello"), CommandOutcome::Continue);
        assert!(notices(&rx)[0].contains("no open chat"));
    }

    #[test]
    fn default_line_goes_to_focused_chat() {
        let (mut commands, _chats, rx) = commands();
        commands.execute("/connect", "/connect me@example.org");
        lock(&commands.proto).pump_events();
        commands.execute("/msg", "/msg alice@example.org");

        commands.execute_default("hello there");

        let mut saw_outgoing = false;
        while let Ok(note) = rx.try_recv() {
            if let UiNote::Outgoing { to, body } = note {
                assert_eq!(to, "alice@example.org");
                assert_eq!(body, "hello there");
                saw_outgoing = true;
            }
        }
        assert!(saw_outgoing);
    }

    #[test]
    fn status_with_bad_presence_prints_usage() {
        let (mut commands, _chats, rx) = commands();
        commands.execute("/status", "/status invisible");
        assert!(notices(&rx)[0].starts_with("usage:"));
    }
}
