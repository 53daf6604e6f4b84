use super::*;

/// Auto-away flag, created `Armed` at session start and mutated only by
/// `handle_idle_time`. Transitions fire on threshold-crossing edges only, so
/// at most one presence update is sent per crossing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AutoAwayState {
    Armed,
    Engaged,
}

impl Session {
    /// Auto-away check, run once per tick while connected. Reads a fresh
    /// config snapshot each time so preference edits apply mid-session.
    pub(super) fn handle_idle_time(&mut self) {
        let config = self.prefs.autoaway_config();
        if config.mode == AutoAwayMode::Off {
            return;
        }

        let threshold_ms = config.minutes.saturating_mul(60_000);
        let idle_ms = self.input.idle_ms();

        match self.autoaway {
            AutoAwayState::Armed => {
                if !self.proto.account_presence().is_available() {
                    return;
                }
                if idle_ms < threshold_ms {
                    return;
                }
                self.autoaway = AutoAwayState::Engaged;
                match config.mode {
                    AutoAwayMode::Away => {
                        self.proto
                            .send_presence(Presence::Away, config.message.as_deref(), 0);
                        self.ui.notify_auto_away_start();
                    }
                    AutoAwayMode::Idle => {
                        self.proto.send_presence(
                            Presence::Online,
                            config.message.as_deref(),
                            idle_ms / 1_000,
                        );
                    }
                    AutoAwayMode::Off => {}
                }
                tracing::info!(idle_ms, "auto-away engaged");
            }
            AutoAwayState::Engaged => {
                if idle_ms >= threshold_ms {
                    return;
                }
                // The flag always re-arms on return; the presence update is
                // gated on the check preference.
                self.autoaway = AutoAwayState::Armed;
                if config.check {
                    match config.mode {
                        AutoAwayMode::Away => {
                            self.proto.send_presence(Presence::Online, None, 0);
                            self.ui.notify_auto_away_end();
                        }
                        AutoAwayMode::Idle => {
                            self.proto.send_presence(Presence::Online, None, 0);
                            self.ui.refresh_presence_indicator(Presence::Online);
                        }
                        AutoAwayMode::Off => {}
                    }
                }
                tracing::info!("auto-away released");
            }
        }
    }
}
