use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;
use ratatui::backend::Backend;
use ratatui::layout::Position;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Widget, Wrap};
use ratatui::Terminal;
use unicode_width::UnicodeWidthStr;

use crate::input::InputBuffer;
use crate::lock;
use crate::session::{Presence, UiPort};

const MAX_NOTES_PER_TICK: usize = 64;
const PROMPT: &str = "> ";

/// Display traffic from the other collaborators. Everything that wants a line
/// on screen sends one of these instead of holding a UI reference.
#[derive(Clone, Debug)]
pub(crate) enum UiNote {
    Notice(String),
    Incoming { from: String, body: String },
    Outgoing { to: String, body: String },
    Status(String),
    Remind,
}

/// Inline-viewport terminal UI: transcript lines are appended above the
/// viewport via `insert_before`, the viewport itself holds the composer and a
/// status row.
pub(crate) struct TermUi<B: Backend> {
    terminal: Terminal<B>,
    buffer: Arc<Mutex<InputBuffer>>,
    notes: Receiver<UiNote>,
    pending: Vec<Line<'static>>,
    status: String,
    presence: Presence,
    unread: usize,
    seen_generation: u64,
    dirty: bool,
}

impl<B: Backend> TermUi<B> {
    pub(crate) fn new(
        terminal: Terminal<B>,
        buffer: Arc<Mutex<InputBuffer>>,
        notes: Receiver<UiNote>,
    ) -> Self {
        Self {
            terminal,
            buffer,
            notes,
            pending: Vec::new(),
            status: "not connected".to_string(),
            presence: Presence::Offline,
            unread: 0,
            seen_generation: u64::MAX,
            dirty: true,
        }
    }

    fn apply_note(&mut self, note: UiNote) {
        match note {
            UiNote::Notice(text) => {
                self.pending
                    .push(Line::from(Span::styled(text, notice_style())));
            }
            UiNote::Incoming { from, body } => {
                self.unread = self.unread.saturating_add(1);
                self.pending.push(Line::from(vec![
                    Span::styled(format!("{from}: "), contact_style()),
                    Span::raw(body),
                ]));
            }
            UiNote::Outgoing { to, body } => {
                self.unread = 0;
                self.pending.push(Line::from(vec![
                    Span::styled(format!("me -> {to}: "), me_style()),
                    Span::raw(body),
                ]));
            }
            UiNote::Status(text) => {
                self.status = text;
            }
            UiNote::Remind => {
                if self.unread > 0 {
                    self.status = format!("{} unread message(s)", self.unread);
                }
            }
        }
        self.dirty = true;
    }

    /// Scrollback writes are append-only, so pending lines flush once and are
    /// forgotten.
    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.pending);
        let height = lines.len().min(u16::MAX as usize) as u16;
        let result = self.terminal.insert_before(height, |buf| {
            let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
            paragraph.render(buf.area, buf);
        });
        if let Err(err) = result {
            tracing::warn!(%err, "transcript flush failed");
        }
    }

    fn draw(&mut self) {
        let text = lock(&self.buffer).text.clone();
        let status = format!(
            "[{}] {}{}",
            self.presence.as_str(),
            self.status,
            if self.unread > 0 {
                format!(" ({} unread)", self.unread)
            } else {
                String::new()
            }
        );
        let cursor_x = (UnicodeWidthStr::width(PROMPT) + UnicodeWidthStr::width(text.as_str()))
            .min(u16::MAX as usize) as u16;

        let result = self.terminal.draw(|f| {
            let area = f.area();
            let input_line = Line::from(vec![
                Span::styled(PROMPT, prompt_style()),
                Span::raw(text.clone()),
            ]);
            let status_line = Line::from(Span::styled(status.clone(), status_style()));
            let body = Paragraph::new(Text::from(vec![input_line, status_line]));
            f.render_widget(body, area);
            f.set_cursor_position(Position::new(
                cursor_x.min(area.width.saturating_sub(1)),
                area.y,
            ));
        });
        if let Err(err) = result {
            tracing::warn!(%err, "ui draw failed");
        }
    }
}

impl<B: Backend> UiPort for TermUi<B> {
    fn refresh(&mut self) {
        let mut drained = 0;
        while drained < MAX_NOTES_PER_TICK {
            match self.notes.try_recv() {
                Ok(note) => {
                    self.apply_note(note);
                    drained += 1;
                }
                Err(_) => break,
            }
        }

        let generation = lock(&self.buffer).generation;
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.dirty = true;
        }

        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.flush_pending();
        self.draw();
    }

    fn clear_input(&mut self) {
        let mut buf = lock(&self.buffer);
        buf.text.clear();
        buf.generation = buf.generation.wrapping_add(1);
        self.dirty = true;
    }

    fn reset_search(&mut self) {
        lock(&self.buffer).recall_pos = None;
    }

    fn notify_auto_away_start(&mut self) {
        self.apply_note(UiNote::Notice("auto-away: you are now away".to_string()));
        self.status = "away (auto)".to_string();
    }

    fn notify_auto_away_end(&mut self) {
        self.apply_note(UiNote::Notice("auto-away: welcome back".to_string()));
        self.status = "online".to_string();
    }

    fn refresh_presence_indicator(&mut self, presence: Presence) {
        self.presence = presence;
        self.dirty = true;
    }
}

fn prompt_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

fn notice_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn contact_style() -> Style {
    Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::BOLD)
}

fn me_style() -> Style {
    Style::default().fg(Color::Cyan)
}

fn status_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use ratatui::backend::TestBackend;

    fn ui() -> TermUi<TestBackend> {
        let terminal = Terminal::new(TestBackend::new(40, 4)).expect("test terminal");
        let (_tx, rx) = unbounded();
        TermUi::new(terminal, Arc::new(Mutex::new(InputBuffer::default())), rx)
    }

    #[test]
    fn incoming_notes_accumulate_unread() {
        let mut ui = ui();
        ui.apply_note(UiNote::Incoming {
            from: "alice@example.org".to_string(),
            body: "hi".to_string(),
        });
        ui.apply_note(UiNote::Incoming {
            from: "alice@example.org".to_string(),
            body: "there".to_string(),
        });
        assert_eq!(ui.unread, 2);

        ui.apply_note(UiNote::Remind);
        assert_eq!(ui.status, "2 unread message(s)");
    }

    #[test]
    fn outgoing_note_clears_unread() {
        let mut ui = ui();
        ui.apply_note(UiNote::Incoming {
            from: "alice@example.org".to_string(),
            body: "hi".to_string(),
        });
        ui.apply_note(UiNote::Outgoing {
            to: "alice@example.org".to_string(),
            body: "hey".to_string(),
        });
        assert_eq!(ui.unread, 0);
    }

    #[test]
    fn remind_with_no_unread_leaves_status_alone() {
        let mut ui = ui();
        ui.status = "online".to_string();
        ui.apply_note(UiNote::Remind);
        assert_eq!(ui.status, "online");
    }

    #[test]
    fn auto_away_notifications_update_status() {
        let mut ui = ui();
        ui.notify_auto_away_start();
        assert_eq!(ui.status, "away (auto)");
        ui.notify_auto_away_end();
        assert_eq!(ui.status, "online");
        assert_eq!(ui.pending.len(), 2);
    }
}
