use serde::{Deserialize, Serialize};

/// State of the connection to the chat server, owned by the protocol layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Presence {
    Online,
    Chat,
    Away,
    Xa,
    Dnd,
    Offline,
}

impl Presence {
    /// Auto-away only engages from an "available" presence.
    pub(crate) fn is_available(self) -> bool {
        matches!(self, Presence::Online | Presence::Chat)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Presence::Online => "online",
            Presence::Chat => "chat",
            Presence::Away => "away",
            Presence::Xa => "xa",
            Presence::Dnd => "dnd",
            Presence::Offline => "offline",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "online" => Some(Presence::Online),
            "chat" => Some(Presence::Chat),
            "away" => Some(Presence::Away),
            "xa" => Some(Presence::Xa),
            "dnd" => Some(Presence::Dnd),
            "offline" => Some(Presence::Offline),
            _ => None,
        }
    }
}

/// Per-conversation typing-activity indicator, owned by the chat registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChatState {
    Active,
    Composing,
    Paused,
    Inactive,
    Gone,
}

impl ChatState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ChatState::Active => "active",
            ChatState::Composing => "composing",
            ChatState::Paused => "paused",
            ChatState::Inactive => "inactive",
            ChatState::Gone => "gone",
        }
    }
}

/// Verdict of one submitted line; `Terminate` is the only way the session ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandOutcome {
    Continue,
    Terminate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AutoAwayMode {
    Off,
    Away,
    Idle,
}

/// Auto-away preferences, re-read from the preferences port every tick so
/// live edits take effect without a restart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct AutoAwayConfig {
    #[serde(default = "default_autoaway_minutes")]
    pub(crate) minutes: u64,
    #[serde(default = "default_autoaway_mode")]
    pub(crate) mode: AutoAwayMode,
    #[serde(default = "default_autoaway_check")]
    pub(crate) check: bool,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

impl Default for AutoAwayConfig {
    fn default() -> Self {
        Self {
            minutes: default_autoaway_minutes(),
            mode: default_autoaway_mode(),
            check: default_autoaway_check(),
            message: None,
        }
    }
}

fn default_autoaway_minutes() -> u64 {
    15
}

fn default_autoaway_mode() -> AutoAwayMode {
    AutoAwayMode::Off
}

fn default_autoaway_check() -> bool {
    true
}

/// Result of one bounded non-blocking read attempt.
#[derive(Clone, Debug, Default)]
pub(crate) struct ReadOutcome {
    /// A complete submitted line, present at most once per tick.
    pub(crate) line: Option<String>,
    /// Whether any keystroke was consumed this tick.
    pub(crate) activity: bool,
}

pub(crate) trait InputPort {
    /// Must return within the collaborator's poll granularity whether or not
    /// a full line is available. This is the loop's only suspension point.
    fn read_line_nonblocking(&mut self) -> ReadOutcome;

    /// Milliseconds since the last keystroke.
    fn idle_ms(&self) -> u64;
}

pub(crate) trait ProtocolPort {
    fn connection_status(&self) -> ConnectionStatus;

    /// Last presence published for the signed-in account.
    fn account_presence(&self) -> Presence;

    /// Fire-and-forget; delivery failures surface on the protocol layer's own
    /// error channel, never here.
    fn send_presence(&mut self, presence: Presence, message: Option<&str>, idle_secs: u64);

    /// Drain any buffered inbound data. Bounded, never blocks.
    fn pump_events(&mut self);

    fn disconnect(&mut self);
}

pub(crate) trait PrefsPort {
    fn autoaway_config(&self) -> AutoAwayConfig;
    fn connect_account(&self) -> Option<String>;
}

pub(crate) trait CommandPort {
    fn execute(&mut self, name: &str, line: &str) -> CommandOutcome;
    fn execute_default(&mut self, line: &str) -> CommandOutcome;
}

pub(crate) trait PluginPort {
    fn on_start(&mut self);
    fn on_tick(&mut self);
    fn on_shutdown(&mut self);
}

pub(crate) trait CryptoPort {
    /// Advance pending key-exchange handshakes. Bounded, never blocks.
    fn poll(&mut self);
}

pub(crate) trait ReminderPort {
    fn tick(&mut self);
}

pub(crate) trait ChatRegistryPort {
    /// Bare addresses of every open conversation.
    fn open_conversations(&self) -> Vec<String>;

    /// Bare address of the focused conversation, `None` when the console or
    /// any non-chat window has focus.
    fn focused_chat(&self) -> Option<String>;

    fn handle_idle(&mut self, contact: &str);
    fn handle_activity(&mut self, contact: &str);
}

pub(crate) trait HistoryPort {
    fn append(&mut self, line: &str);
}

pub(crate) trait UiPort {
    fn refresh(&mut self);
    fn clear_input(&mut self);
    fn reset_search(&mut self);
    fn notify_auto_away_start(&mut self);
    fn notify_auto_away_end(&mut self);
    fn refresh_presence_indicator(&mut self, presence: Presence);
}
