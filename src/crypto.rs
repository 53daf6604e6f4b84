use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::lock;
use crate::session::CryptoPort;
use crate::ui::UiNote;

/// Unanswered handshakes are abandoned after this long.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

struct Handshake {
    started: Instant,
    /// The loopback peer acknowledges immediately; a real transport would
    /// flip this when the reply frame arrives.
    acked: bool,
}

/// Encryption-session table, advanced once per tick by the session's crypto
/// poll. Tracks pending key exchanges and established sessions; the actual
/// key material lives with the (out of scope) cipher layer.
pub(crate) struct CryptoSessions {
    pending: HashMap<String, Handshake>,
    established: HashSet<String>,
    notes: Sender<UiNote>,
}

impl CryptoSessions {
    pub(crate) fn new(notes: Sender<UiNote>) -> Self {
        Self {
            pending: HashMap::new(),
            established: HashSet::new(),
            notes,
        }
    }

    /// Start a key exchange with `contact`. No-op if one is already pending
    /// or established.
    pub(crate) fn begin(&mut self, contact: &str) {
        if self.established.contains(contact) || self.pending.contains_key(contact) {
            let _ = self.notes.send(UiNote::Notice(format!(
                "encryption already active with {contact}"
            )));
            return;
        }
        tracing::info!(contact, "starting key exchange");
        self.pending.insert(
            contact.to_string(),
            Handshake {
                started: Instant::now(),
                acked: true,
            },
        );
    }

    pub(crate) fn is_secure(&self, contact: &str) -> bool {
        self.established.contains(contact)
    }

    #[cfg(test)]
    fn stall(&mut self, contact: &str) {
        if let Some(hs) = self.pending.get_mut(contact) {
            hs.acked = false;
            hs.started = Instant::now() - HANDSHAKE_TIMEOUT;
        }
    }
}

impl CryptoPort for CryptoSessions {
    fn poll(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut done = Vec::new();
        let mut expired = Vec::new();
        for (contact, hs) in &self.pending {
            if hs.acked {
                done.push(contact.clone());
            } else if hs.started.elapsed() >= HANDSHAKE_TIMEOUT {
                expired.push(contact.clone());
            }
        }
        for contact in done {
            self.pending.remove(&contact);
            self.established.insert(contact.clone());
            tracing::info!(contact = %contact, "encrypted session established");
            let _ = self.notes.send(UiNote::Notice(format!(
                "encrypted session established with {contact}"
            )));
        }
        for contact in expired {
            self.pending.remove(&contact);
            tracing::warn!(contact = %contact, "key exchange timed out");
            let _ = self.notes.send(UiNote::Notice(format!(
                "key exchange with {contact} timed out"
            )));
        }
    }
}

impl CryptoPort for Arc<Mutex<CryptoSessions>> {
    fn poll(&mut self) {
        lock(self).poll();
    }
}
