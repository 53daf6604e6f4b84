use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::lock;
use crate::session::{ConnectionStatus, Presence, ProtocolPort};
use crate::ui::UiNote;

const MAX_EVENTS_PER_PUMP: usize = 32;

/// Inbound protocol traffic, buffered until the per-tick pump drains it.
#[derive(Clone, Debug)]
pub(crate) enum NetEvent {
    Connected { account: String },
    Disconnected,
    Message { from: String, body: String },
}

/// Loopback protocol layer: a stand-in server that acknowledges connects
/// immediately and echoes outbound messages back as inbound traffic. Keeps
/// the wire format out of the session's hair while exercising the full
/// status/pump/presence surface.
pub(crate) struct LoopbackProto {
    status: ConnectionStatus,
    presence: Presence,
    account: Option<String>,
    inbound_tx: Sender<NetEvent>,
    inbound_rx: Receiver<NetEvent>,
    notes: Sender<UiNote>,
}

impl LoopbackProto {
    pub(crate) fn new(notes: Sender<UiNote>) -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        Self {
            status: ConnectionStatus::Disconnected,
            presence: Presence::Offline,
            account: None,
            inbound_tx,
            inbound_rx,
            notes,
        }
    }

    pub(crate) fn connect(&mut self, account: &str) {
        if self.status == ConnectionStatus::Connected {
            let _ = self
                .notes
                .send(UiNote::Notice("already connected".to_string()));
            return;
        }
        tracing::info!(account, "connecting");
        self.status = ConnectionStatus::Connecting;
        self.account = Some(account.to_string());
        // The loopback server accepts on the next pump.
        let _ = self.inbound_tx.send(NetEvent::Connected {
            account: account.to_string(),
        });
    }

    pub(crate) fn send_message(&mut self, to: &str, body: &str) {
        if self.status != ConnectionStatus::Connected {
            let _ = self
                .notes
                .send(UiNote::Notice("not connected".to_string()));
            return;
        }
        tracing::debug!(to, "sending message");
        // Echo reflector: the peer answers with the same body.
        let _ = self.inbound_tx.send(NetEvent::Message {
            from: to.to_string(),
            body: body.to_string(),
        });
    }

    pub(crate) fn send_chat_state(&mut self, contact: &str, state: crate::session::ChatState) {
        if self.status != ConnectionStatus::Connected {
            return;
        }
        tracing::debug!(contact, state = state.as_str(), "chat state update");
    }

    fn handle_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Connected { account } => {
                self.status = ConnectionStatus::Connected;
                self.presence = Presence::Online;
                tracing::info!(account = %account, "connected");
                let _ = self
                    .notes
                    .send(UiNote::Notice(format!("connected as {account}")));
                let _ = self.notes.send(UiNote::Status(account));
            }
            NetEvent::Disconnected => {
                self.status = ConnectionStatus::Disconnected;
                self.presence = Presence::Offline;
                let _ = self
                    .notes
                    .send(UiNote::Notice("disconnected".to_string()));
            }
            NetEvent::Message { from, body } => {
                let _ = self.notes.send(UiNote::Incoming { from, body });
            }
        }
    }
}

impl ProtocolPort for LoopbackProto {
    fn connection_status(&self) -> ConnectionStatus {
        self.status
    }

    fn account_presence(&self) -> Presence {
        self.presence
    }

    fn send_presence(&mut self, presence: Presence, message: Option<&str>, idle_secs: u64) {
        if self.status != ConnectionStatus::Connected {
            return;
        }
        self.presence = presence;
        tracing::info!(
            presence = presence.as_str(),
            message,
            idle_secs,
            "presence update"
        );
        let status = match message {
            Some(message) => format!("{} ({message})", presence.as_str()),
            None => presence.as_str().to_string(),
        };
        let _ = self.notes.send(UiNote::Status(status));
    }

    fn pump_events(&mut self) {
        for _ in 0..MAX_EVENTS_PER_PUMP {
            match self.inbound_rx.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(_) => break,
            }
        }
    }

    fn disconnect(&mut self) {
        if self.status == ConnectionStatus::Disconnected {
            return;
        }
        tracing::info!(account = ?self.account, "disconnecting");
        self.status = ConnectionStatus::Disconnecting;
        self.handle_event(NetEvent::Disconnected);
        self.account = None;
    }
}

impl ProtocolPort for Arc<Mutex<LoopbackProto>> {
    fn connection_status(&self) -> ConnectionStatus {
        lock(self).connection_status()
    }

    fn account_presence(&self) -> Presence {
        lock(self).account_presence()
    }

    fn send_presence(&mut self, presence: Presence, message: Option<&str>, idle_secs: u64) {
        lock(self).send_presence(presence, message, idle_secs);
    }

    fn pump_events(&mut self) {
        lock(self).pump_events();
    }

    fn disconnect(&mut self) {
        lock(self).disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded as ui_channel;

    fn proto() -> (LoopbackProto, Receiver<UiNote>) {
        let (tx, rx) = ui_channel();
        (LoopbackProto::new(tx), rx)
    }

    #[test]
    fn connect_completes_on_next_pump() {
        let (mut proto, _notes) = proto();
        proto.connect("alice@example.org");
        assert_eq!(proto.connection_status(), ConnectionStatus::Connecting);

        proto.pump_events();
        assert_eq!(proto.connection_status(), ConnectionStatus::Connected);
        assert_eq!(proto.account_presence(), Presence::Online);
    }

    #[test]
    fn outbound_message_echoes_back_as_incoming() {
        let (mut proto, notes) = proto();
        proto.connect("alice@example.org");
        proto.pump_events();
        while notes.try_recv().is_ok() {}

        proto.send_message("bob@example.org", "hello");
        proto.pump_events();

        let note = notes.try_recv().expect("incoming note");
        match note {
            UiNote::Incoming { from, body } => {
                assert_eq!(from, "bob@example.org");
                assert_eq!(body, "hello");
            }
            other => panic!("unexpected note {other:?}"),
        }
    }

    #[test]
    fn presence_updates_ignored_while_disconnected() {
        let (mut proto, notes) = proto();
        proto.send_presence(Presence::Away, Some("brb"), 0);
        assert_eq!(proto.account_presence(), Presence::Offline);
        assert!(notes.try_recv().is_err());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let (mut proto, notes) = proto();
        proto.connect("alice@example.org");
        proto.pump_events();
        proto.disconnect();
        proto.disconnect();

        let mut disconnect_notices = 0;
        while let Ok(note) = notes.try_recv() {
            if matches!(&note, UiNote::Notice(text) if text == "disconnected") {
                disconnect_notices += 1;
            }
        }
        assert_eq!(disconnect_notices, 1);
    }
}
