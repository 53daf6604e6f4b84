use super::*;

impl Session {
    /// Run the session until a submitted command yields `Terminate`.
    pub(crate) fn run(&mut self) -> Result<()> {
        self.plugins.on_start();

        // CLI target wins over the configured default account; either way the
        // synthesized line goes through the ordinary command router.
        let target = self
            .connect_target
            .take()
            .or_else(|| self.prefs.connect_account());
        if let Some(target) = target {
            self.process_line(&format!("/connect {target}"));
        }

        self.ui.refresh();
        tracing::info!("starting main event loop");

        loop {
            let line = self.await_line();
            if matches!(self.process_line(&line), CommandOutcome::Terminate) {
                break;
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Inner per-tick loop: repeats tick work until a full line is submitted.
    /// The fixed order is load-bearing: presence side effects from the
    /// auto-away check are visible to the same tick's UI refresh, and input is
    /// attempted before the fan-out work so it is never starved.
    fn await_line(&mut self) -> String {
        loop {
            if self.proto.connection_status() == ConnectionStatus::Connected {
                self.handle_idle_time();
            }

            let read = self.input.read_line_nonblocking();
            if read.activity {
                self.handle_activity();
            } else if self.input.idle_ms() >= CHAT_IDLE_GATE_MS {
                self.handle_idle_fanout();
            }

            self.run_tick();

            if let Some(line) = read.line {
                return line;
            }
        }
    }

    /// Periodic fan-out, invoked every tick whether or not input arrived.
    fn run_tick(&mut self) {
        self.plugins.on_tick();
        self.crypto.poll();
        self.reminder.tick();
        self.proto.pump_events();
        self.ui.refresh();
    }
}
