use anyhow::Result;

mod autoaway;
mod chatstate;
mod commands;
pub(crate) mod ports;
mod runtime;

pub(crate) use autoaway::AutoAwayState;
pub(crate) use ports::{
    AutoAwayConfig, AutoAwayMode, ChatRegistryPort, ChatState, CommandOutcome, CommandPort,
    ConnectionStatus, CryptoPort, HistoryPort, InputPort, PluginPort, PrefsPort, Presence,
    ProtocolPort, ReadOutcome, ReminderPort, UiPort,
};

/// Ticks with no keystroke and at least this much measured idle trigger the
/// per-conversation chat-state idle fan-out. The registry applies its own
/// per-state timing on top.
const CHAT_IDLE_GATE_MS: u64 = 1_000;

/// Collaborators injected at construction. The session never reaches around
/// these interfaces into globals, so tests can substitute recording fakes.
pub(crate) struct Ports {
    pub(crate) input: Box<dyn InputPort>,
    pub(crate) proto: Box<dyn ProtocolPort>,
    pub(crate) prefs: Box<dyn PrefsPort>,
    pub(crate) commands: Box<dyn CommandPort>,
    pub(crate) plugins: Box<dyn PluginPort>,
    pub(crate) crypto: Box<dyn CryptoPort>,
    pub(crate) reminder: Box<dyn ReminderPort>,
    pub(crate) chats: Box<dyn ChatRegistryPort>,
    pub(crate) history: Box<dyn HistoryPort>,
    pub(crate) ui: Box<dyn UiPort>,
}

/// The session coordinator: one cooperative control loop that interleaves
/// keyboard input, protocol events, plugin ticks, encryption polling, and the
/// auto-away presence machine. Strictly single-threaded; all apparent
/// concurrency is collaborator polling.
pub(crate) struct Session {
    input: Box<dyn InputPort>,
    proto: Box<dyn ProtocolPort>,
    prefs: Box<dyn PrefsPort>,
    commands: Box<dyn CommandPort>,
    plugins: Box<dyn PluginPort>,
    crypto: Box<dyn CryptoPort>,
    reminder: Box<dyn ReminderPort>,
    chats: Box<dyn ChatRegistryPort>,
    history: Box<dyn HistoryPort>,
    ui: Box<dyn UiPort>,

    autoaway: AutoAwayState,
    connect_target: Option<String>,
    finished: bool,
}

impl Session {
    pub(crate) fn new(ports: Ports, connect_target: Option<String>) -> Self {
        Self {
            input: ports.input,
            proto: ports.proto,
            prefs: ports.prefs,
            commands: ports.commands,
            plugins: ports.plugins,
            crypto: ports.crypto,
            reminder: ports.reminder,
            chats: ports.chats,
            history: ports.history,
            ui: ports.ui,
            autoaway: AutoAwayState::Armed,
            connect_target,
            finished: false,
        }
    }

    /// Release collaborators in reverse-dependency order. Runs at most once;
    /// `Drop` covers the error/panic exit routes.
    fn shutdown(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.autoaway = AutoAwayState::Armed;
        self.proto.disconnect();
        self.plugins.on_shutdown();
        tracing::info!("session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
