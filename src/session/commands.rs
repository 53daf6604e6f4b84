use super::*;

impl Session {
    /// Route one submitted line. Whitespace-only lines count as empty: no
    /// history append, no dispatch, session continues. Slash lines go to the
    /// command layer with the first token as the command name and the whole
    /// trimmed line as the argument; anything else goes to the default
    /// (plain-message) handler. The collaborator's outcome is authoritative.
    pub(crate) fn process_line(&mut self, raw: &str) -> CommandOutcome {
        tracing::debug!(line = raw, "input received");
        let line = raw.trim();

        if !line.is_empty() {
            self.history.append(line);
        }

        let outcome = if line.is_empty() {
            CommandOutcome::Continue
        } else if line.starts_with('/') {
            let name = line.split_whitespace().next().unwrap_or(line);
            self.commands.execute(name, line)
        } else {
            self.commands.execute_default(line)
        };

        self.ui.clear_input();
        self.ui.reset_search();

        outcome
    }
}
