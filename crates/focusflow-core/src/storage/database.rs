//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - Completed sessions, in completion order
//! - Session statistics (today and all-time)

use std::path::Path;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result};
use crate::ports::{SessionEntry, SessionSink};
use crate::timer::Mode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub mode: Mode,
    pub duration_secs: u64,
    pub completed_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn entry(&self) -> SessionEntry {
        SessionEntry {
            mode: self.mode,
            duration_secs: self.duration_secs,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    /// Completed focus intervals.
    pub completed_pomodoros: u64,
    pub total_focus_min: u64,
    pub total_break_min: u64,
    pub today_sessions: u64,
    pub today_focus_min: u64,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/focusflow.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened,
    /// or if migration fails.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("focusflow.db"))
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if migration fails.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Append a completed session. Returns its row id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, entry: &SessionEntry) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sessions (mode, duration_secs, completed_at) VALUES (?1, ?2, ?3)",
            params![
                entry.mode.as_str(),
                entry.duration_secs,
                timestamp(entry.completed_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first. `limit = None` returns everything.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn history(&self, limit: Option<usize>) -> Result<Vec<SessionRecord>> {
        let limit = limit.map_or(-1, |l| l as i64);
        let mut stmt = self.conn.prepare(
            "SELECT id, mode, duration_secs, completed_at
             FROM sessions
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], session_from_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn stats_today(&self) -> Result<Stats> {
        let since = start_of_local_day(Utc::now());
        let mut stats = self.aggregate(Some(since))?;
        stats.today_sessions = stats.completed_pomodoros;
        stats.today_focus_min = stats.total_focus_min;
        Ok(stats)
    }

    pub fn stats_all(&self) -> Result<Stats> {
        let mut stats = self.aggregate(None)?;
        let today = self.aggregate(Some(start_of_local_day(Utc::now())))?;
        stats.today_sessions = today.completed_pomodoros;
        stats.today_focus_min = today.total_focus_min;
        Ok(stats)
    }

    /// Totals over sessions completed at or after `since`.
    fn aggregate(&self, since: Option<DateTime<Utc>>) -> Result<Stats> {
        let since = since.map(timestamp).unwrap_or_default();
        let mut stmt = self.conn.prepare(
            "SELECT mode, COUNT(*), COALESCE(SUM(duration_secs), 0)
             FROM sessions
             WHERE completed_at >= ?1
             GROUP BY mode",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        let mut stats = Stats::default();
        let mut focus_secs = 0;
        let mut break_secs = 0;
        for row in rows {
            let (mode, count, secs) = row?;
            stats.total_sessions += count;
            match Mode::parse(&mode) {
                Some(Mode::Focus) => {
                    stats.completed_pomodoros += count;
                    focus_secs += secs;
                }
                Some(Mode::ShortBreak | Mode::LongBreak) => break_secs += secs,
                None => {}
            }
        }
        stats.total_focus_min = focus_secs / 60;
        stats.total_break_min = break_secs / 60;
        Ok(stats)
    }
}

impl SessionSink for Database {
    fn record(&mut self, entry: &SessionEntry) -> Result<()> {
        self.record_session(entry).map(|_| ())
    }
}

/// Fixed-width UTC timestamps so string comparison orders chronologically.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn start_of_local_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_timezone(&Local)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .unwrap_or(now)
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let mode: String = row.get(1)?;
    let mode = Mode::parse(&mode).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("unknown mode '{mode}'").into(),
        )
    })?;
    let completed_at: String = row.get(3)?;
    let completed_at = DateTime::parse_from_rfc3339(&completed_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);
    Ok(SessionRecord {
        id: row.get(0)?,
        mode,
        duration_secs: row.get(2)?,
        completed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(mode: Mode, duration_secs: u64, completed_at: DateTime<Utc>) -> SessionEntry {
        SessionEntry {
            mode,
            duration_secs,
            completed_at,
        }
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_session(&entry(Mode::Focus, 1500, now)).unwrap();
        db.record_session(&entry(Mode::ShortBreak, 300, now)).unwrap();
        let stats = db.stats_all().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.completed_pomodoros, 1);
        assert_eq!(stats.total_focus_min, 25);
        assert_eq!(stats.total_break_min, 5);
        assert_eq!(stats.today_sessions, 1);
    }

    #[test]
    fn history_is_most_recent_first() {
        let mut db = Database::open_memory().unwrap();
        let base = Utc::now();
        db.record(&entry(Mode::Focus, 1500, base)).unwrap();
        db.record(&entry(Mode::ShortBreak, 300, base + Duration::minutes(25)))
            .unwrap();
        db.record(&entry(Mode::Focus, 1500, base + Duration::minutes(30)))
            .unwrap();

        let all = db.history(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].mode, Mode::Focus);
        assert_eq!(all[1].mode, Mode::ShortBreak);
        assert!(all[0].id > all[2].id);

        let limited = db.history(Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, all[0].id);
    }

    #[test]
    fn timestamps_roundtrip_at_millisecond_precision() {
        let db = Database::open_memory().unwrap();
        let at = DateTime::parse_from_rfc3339("2026-03-01T09:30:15.250Z")
            .unwrap()
            .with_timezone(&Utc);
        db.record_session(&entry(Mode::LongBreak, 900, at)).unwrap();
        let record = &db.history(None).unwrap()[0];
        assert_eq!(record.completed_at, at);
        assert_eq!(record.entry(), entry(Mode::LongBreak, 900, at));
    }

    #[test]
    fn old_sessions_do_not_count_for_today() {
        let db = Database::open_memory().unwrap();
        db.record_session(&entry(Mode::Focus, 1500, Utc::now() - Duration::days(3)))
            .unwrap();
        let today = db.stats_today().unwrap();
        assert_eq!(today.completed_pomodoros, 0);
        let all = db.stats_all().unwrap();
        assert_eq!(all.completed_pomodoros, 1);
        assert_eq!(all.today_sessions, 0);
    }

    #[test]
    fn opens_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.record_session(&entry(Mode::Focus, 60, Utc::now())).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.history(None).unwrap().len(), 1);
    }
}
