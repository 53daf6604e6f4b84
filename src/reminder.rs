use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::session::ReminderPort;
use crate::ui::UiNote;

/// Periodic unread-message nudge. Fires a `Remind` note at the configured
/// interval; the UI decides whether there is anything worth repeating.
pub(crate) struct Reminder {
    notes: Sender<UiNote>,
    every: Option<Duration>,
    last: Instant,
}

impl Reminder {
    pub(crate) fn new(notes: Sender<UiNote>, every: Option<Duration>) -> Self {
        Self {
            notes,
            every,
            last: Instant::now(),
        }
    }
}

impl ReminderPort for Reminder {
    fn tick(&mut self) {
        let Some(every) = self.every else {
            return;
        };
        if self.last.elapsed() < every {
            return;
        }
        self.last = Instant::now();
        let _ = self.notes.send(UiNote::Remind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn disabled_reminder_never_fires() {
        let (tx, rx) = unbounded();
        let mut reminder = Reminder::new(tx, None);
        for _ in 0..10 {
            reminder.tick();
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn due_reminder_sends_a_note_per_interval() {
        let (tx, rx) = unbounded();
        let mut reminder = Reminder::new(tx, Some(Duration::ZERO));
        reminder.tick();
        reminder.tick();
        assert!(matches!(rx.try_recv(), Ok(UiNote::Remind)));
        assert!(matches!(rx.try_recv(), Ok(UiNote::Remind)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reminder_waits_out_its_interval() {
        let (tx, rx) = unbounded();
        let mut reminder = Reminder::new(tx, Some(Duration::from_secs(3600)));
        for _ in 0..5 {
            reminder.tick();
        }
        assert!(rx.try_recv().is_err());
    }
}
