use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::session::{AutoAwayConfig, PrefsPort};

fn default_poll_ms() -> u64 {
    50
}

fn default_remind_secs() -> u64 {
    60
}

/// User preferences, read once at startup from `prefs.json`. A missing file
/// and missing fields both fall back to defaults; only a malformed file is an
/// error, aborting before the session starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Prefs {
    #[serde(default)]
    pub(crate) autoaway: AutoAwayConfig,
    /// Account to `/connect` to when none is given on the command line.
    #[serde(default)]
    pub(crate) account: Option<String>,
    /// Input poll granularity, the tick cadence upper bound.
    #[serde(default = "default_poll_ms")]
    pub(crate) poll_ms: u64,
    /// Unread-message reminder interval; 0 disables reminders.
    #[serde(default = "default_remind_secs")]
    pub(crate) remind_secs: u64,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            autoaway: AutoAwayConfig::default(),
            account: None,
            poll_ms: default_poll_ms(),
            remind_secs: default_remind_secs(),
        }
    }
}

impl Prefs {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read prefs {}", path.display()));
            }
        };
        serde_json::from_str(&raw).with_context(|| format!("parse prefs {}", path.display()))
    }
}

impl PrefsPort for Prefs {
    fn autoaway_config(&self) -> AutoAwayConfig {
        self.autoaway.clone()
    }

    fn connect_account(&self) -> Option<String> {
        self.account.clone()
    }
}
