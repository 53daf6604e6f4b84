use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::lock;
use crate::session::{InputPort, ReadOutcome};

const MAX_EVENTS_PER_TICK: u16 = 64;
const RECALL_LIMIT: usize = 200;

/// In-progress command line, shared with the UI layer for rendering.
#[derive(Debug, Default)]
pub(crate) struct InputBuffer {
    pub(crate) text: String,
    /// Position in the recall list while browsing history, newest last.
    pub(crate) recall_pos: Option<usize>,
    /// Bumped on every mutation so the UI knows when to redraw.
    pub(crate) generation: u64,
}

impl InputBuffer {
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Crossterm-backed line reader. The initial `event::poll` with the
/// configured granularity is the session's only suspension point; everything
/// after it drains with a zero timeout.
pub(crate) struct TermInput {
    buffer: Arc<Mutex<InputBuffer>>,
    poll: Duration,
    last_activity: Instant,
    recall: Vec<String>,
}

impl TermInput {
    pub(crate) fn new(
        buffer: Arc<Mutex<InputBuffer>>,
        poll: Duration,
        mut recall: Vec<String>,
    ) -> Self {
        if recall.len() > RECALL_LIMIT {
            recall.drain(..recall.len() - RECALL_LIMIT);
        }
        Self {
            buffer,
            poll,
            last_activity: Instant::now(),
            recall,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<String> {
        let mut buf = lock(&self.buffer);
        match key.code {
            KeyCode::Enter => {
                let line = std::mem::take(&mut buf.text);
                buf.recall_pos = None;
                buf.bump();
                if !line.trim().is_empty() {
                    self.recall.push(line.clone());
                    if self.recall.len() > RECALL_LIMIT {
                        self.recall.remove(0);
                    }
                }
                return Some(line);
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                buf.text.clear();
                buf.bump();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                buf.text.push(c);
                buf.recall_pos = None;
                buf.bump();
            }
            KeyCode::Backspace => {
                buf.text.pop();
                buf.bump();
            }
            KeyCode::Up => {
                let pos = match buf.recall_pos {
                    Some(0) => 0,
                    Some(pos) => pos - 1,
                    None if self.recall.is_empty() => return None,
                    None => self.recall.len() - 1,
                };
                buf.recall_pos = Some(pos);
                buf.text = self.recall[pos].clone();
                buf.bump();
            }
            KeyCode::Down => {
                match buf.recall_pos {
                    Some(pos) if pos + 1 < self.recall.len() => {
                        buf.recall_pos = Some(pos + 1);
                        buf.text = self.recall[pos + 1].clone();
                    }
                    Some(_) => {
                        buf.recall_pos = None;
                        buf.text.clear();
                    }
                    None => {}
                }
                buf.bump();
            }
            KeyCode::Esc => {
                buf.text.clear();
                buf.recall_pos = None;
                buf.bump();
            }
            _ => {}
        }
        None
    }

    fn handle_paste(&mut self, raw: &str) {
        // Multi-line pastes collapse to one submitted line at a time; embedded
        // newlines become spaces.
        let mut buf = lock(&self.buffer);
        for ch in raw.chars() {
            if ch == '\n' || ch == '\r' {
                buf.text.push(' ');
            } else {
                buf.text.push(ch);
            }
        }
        buf.bump();
    }
}

impl InputPort for TermInput {
    fn read_line_nonblocking(&mut self) -> ReadOutcome {
        let mut out = ReadOutcome::default();

        match event::poll(self.poll) {
            Ok(true) => {}
            Ok(false) => return out,
            Err(err) => {
                tracing::warn!(%err, "input poll failed");
                return out;
            }
        }

        let mut drained: u16 = 0;
        loop {
            let ev = match event::read() {
                Ok(ev) => ev,
                Err(err) => {
                    tracing::warn!(%err, "input read failed");
                    break;
                }
            };

            match ev {
                Event::Key(key) if !matches!(key.kind, KeyEventKind::Release) => {
                    out.activity = true;
                    self.last_activity = Instant::now();
                    if let Some(line) = self.handle_key(key) {
                        out.line = Some(line);
                        break;
                    }
                }
                Event::Paste(text) => {
                    out.activity = true;
                    self.last_activity = Instant::now();
                    self.handle_paste(&text);
                }
                _ => {}
            }

            drained = drained.saturating_add(1);
            if drained >= MAX_EVENTS_PER_TICK {
                break;
            }
            if !matches!(event::poll(Duration::ZERO), Ok(true)) {
                break;
            }
        }

        out
    }

    fn idle_ms(&self) -> u64 {
        self.last_activity.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> TermInput {
        TermInput::new(
            Arc::new(Mutex::new(InputBuffer::default())),
            Duration::from_millis(1),
            Vec::new(),
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typed_chars_then_enter_produce_a_line() {
        let mut input = input();
        for c in "/quit".chars() {
            assert!(input.handle_key(key(KeyCode::Char(c))).is_none());
        }
        let line = input.handle_key(key(KeyCode::Enter));
        assert_eq!(line.as_deref(), Some("/quit"));
        assert!(lock(&input.buffer).text.is_empty());
    }

    #[test]
    fn up_arrow_recalls_most_recent_line() {
        let mut input = input();
        for c in "hello".chars() {
            input.handle_key(key(KeyCode::Char(c)));
        }
        input.handle_key(key(KeyCode::Enter));

        input.handle_key(key(KeyCode::Up));
        assert_eq!(lock(&input.buffer).text, "hello");

        input.handle_key(key(KeyCode::Down));
        assert!(lock(&input.buffer).text.is_empty());
    }

    #[test]
    fn ctrl_u_clears_the_buffer() {
        let mut input = input();
        input.handle_key(key(KeyCode::Char('x')));
        input.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert!(lock(&input.buffer).text.is_empty());
    }

    #[test]
    fn blank_submissions_do_not_enter_recall() {
        let mut input = input();
        input.handle_key(key(KeyCode::Char(' ')));
        input.handle_key(key(KeyCode::Enter));
        assert!(input.recall.is_empty());
    }
}
