use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::session::HistoryPort;

/// Command history, persisted so line recall survives restarts.
pub(crate) struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create history dir {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("open history db {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS history (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              line TEXT NOT NULL,
              created_at INTEGER NOT NULL DEFAULT (unixepoch())
            );
            ",
        )
        .context("init history schema")?;

        Ok(Self { conn })
    }

    fn append_line(&self, line: &str) -> Result<()> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        self.conn
            .execute("INSERT INTO history(line) VALUES (?1)", params![trimmed])
            .context("insert history line")?;
        Ok(())
    }

    /// Most recent `limit` lines, oldest first, ready for up-arrow recall.
    pub(crate) fn recent(&self, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT line FROM history ORDER BY id DESC LIMIT ?1")
            .context("prepare recent history")?;

        let mut rows = stmt
            .query(params![limit as i64])
            .context("query recent history")?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().context("scan history row")? {
            out.push(row.get(0).context("history.line")?);
        }
        out.reverse();
        Ok(out)
    }
}

impl HistoryPort for HistoryStore {
    fn append(&mut self, line: &str) {
        // History is a convenience; losing a line must not disturb the tick.
        if let Err(err) = self.append_line(line) {
            tracing::warn!(%err, "history append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HistoryStore::open(&dir.path().join("history.db")).expect("open store");
        (dir, store)
    }

    #[test]
    fn appended_lines_come_back_oldest_first() {
        let (_dir, mut store) = store();
        store.append("/connect alice@example.org");
        store.append("hello");
        store.append("/quit");

        let recent = store.recent(10).expect("recent");
        assert_eq!(
            recent,
            vec![
                "/connect alice@example.org".to_string(),
                "hello".to_string(),
                "/quit".to_string(),
            ]
        );
    }

    #[test]
    fn recall_limit_keeps_newest_lines() {
        let (_dir, mut store) = store();
        for i in 0..5 {
            store.append(&format!("line {i}"));
        }
        let recent = store.recent(2).expect("recent");
        assert_eq!(recent, vec!["line 3".to_string(), "line 4".to_string()]);
    }

    #[test]
    fn blank_lines_are_not_stored() {
        let (_dir, mut store) = store();
        store.append("   ");
        assert!(store.recent(10).expect("recent").is_empty());
    }

    #[test]
    fn history_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.db");
        {
            let mut store = HistoryStore::open(&path).expect("open store");
            store.append("persisted");
        }
        let store = HistoryStore::open(&path).expect("reopen store");
        assert_eq!(store.recent(10).expect("recent"), vec!["persisted".to_string()]);
    }
}
