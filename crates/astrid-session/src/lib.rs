//! Voice session database.
//!
//! One SQLite file per session, WAL mode, tracking every voice from the
//! message that created it through renders to its stop. All statements
//! are parameterised; message payloads never reach SQL as text.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use astrid_core::Message;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Error type for session database operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Sql: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, SessionError>;

/// One row of the voices table.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceRow {
    pub created: i64,
    pub started: Option<i64>,
    pub last_render: Option<i64>,
    pub ended: Option<i64>,
    pub active: bool,
    pub timestamp: f64,
    pub id: u64,
    pub instrument_name: String,
    pub params: String,
    pub render_count: u64,
}

/// Handle on the session database.
#[derive(Debug)]
pub struct SessionDb {
    conn: Mutex<Connection>,
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

impl SessionDb {
    /// Create a fresh session database at `path`, replacing any previous
    /// session file, and switch it to WAL mode.
    pub fn create(path: &Path) -> Result<Self> {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE voices (
                created INTEGER,
                started INTEGER,
                last_render INTEGER,
                ended INTEGER,
                active INTEGER,
                timestamp REAL,
                id INTEGER,
                instrument_name TEXT,
                params TEXT,
                render_count INTEGER
            )",
            [],
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an existing session database read-write.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record a voice on message receipt: not yet started, inactive,
    /// zero renders.
    pub fn insert_voice(&self, msg: &Message) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO voices (created, started, last_render, ended, active, timestamp,
                                 id, instrument_name, params, render_count)
             VALUES (?1, NULL, NULL, NULL, 0, ?2, ?3, ?4, ?5, 0)",
            params![
                now_nanos(),
                msg.timestamp,
                msg.voice_id,
                msg.instrument_name,
                msg.params
            ],
        )?;
        Ok(())
    }

    /// First render: the voice becomes active.
    pub fn mark_voice_active(&self, voice_id: u64) -> Result<()> {
        let now = now_nanos();
        self.conn.lock().execute(
            "UPDATE voices SET active = 1, started = ?1, last_render = ?1, render_count = 1
             WHERE id = ?2",
            params![now, voice_id],
        )?;
        Ok(())
    }

    /// Subsequent renders bump the render counter and freshness stamp.
    pub fn increment_render_count(&self, voice_id: u64, count: u64) -> Result<()> {
        self.conn.lock().execute(
            "UPDATE voices SET active = 1, last_render = ?1, render_count = ?2 WHERE id = ?3",
            params![now_nanos(), count, voice_id],
        )?;
        Ok(())
    }

    /// Stop: the voice is done.
    pub fn mark_voice_stopped(&self, voice_id: u64, count: u64) -> Result<()> {
        let now = now_nanos();
        self.conn.lock().execute(
            "UPDATE voices SET active = 0, ended = ?1, last_render = ?1, render_count = ?2
             WHERE id = ?3",
            params![now, count, voice_id],
        )?;
        Ok(())
    }

    /// Look up one voice.
    pub fn voice(&self, voice_id: u64) -> Result<Option<VoiceRow>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT created, started, last_render, ended, active, timestamp,
                        id, instrument_name, params, render_count
                 FROM voices WHERE id = ?1",
                params![voice_id],
                Self::row_from,
            )
            .optional()?;
        Ok(row)
    }

    /// All voices currently marked active.
    pub fn active_voices(&self) -> Result<Vec<VoiceRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT created, started, last_render, ended, active, timestamp,
                    id, instrument_name, params, render_count
             FROM voices WHERE active = 1 ORDER BY created",
        )?;
        let rows = stmt
            .query_map([], Self::row_from)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn row_from(row: &rusqlite::Row<'_>) -> rusqlite::Result<VoiceRow> {
        Ok(VoiceRow {
            created: row.get(0)?,
            started: row.get(1)?,
            last_render: row.get(2)?,
            ended: row.get(3)?,
            active: row.get::<_, i64>(4)? != 0,
            timestamp: row.get(5)?,
            id: row.get::<_, i64>(6)? as u64,
            instrument_name: row.get(7)?,
            params: row.get(8)?,
            render_count: row.get::<_, i64>(9)? as u64,
        })
    }
}
