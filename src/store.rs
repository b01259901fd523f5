use chrono::{DateTime, Local};
use directories::ProjectDirs;
use itertools::Itertools;
use rusqlite::{params, Connection, Result};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::session::{ErrorMap, FinalResult};

/// One finished session as persisted for history and leaderboards.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user: String,
    pub wpm: f64,
    pub raw_wpm: f64,
    pub accuracy: f64,
    pub characters_typed: usize,
    pub error_count: usize,
    pub error_map: ErrorMap,
    pub duration_secs: f64,
    pub timestamp: DateTime<Local>,
}

impl SessionRecord {
    pub fn from_result(user: &str, result: &FinalResult) -> Self {
        Self {
            user: user.to_string(),
            wpm: result.wpm,
            raw_wpm: result.raw_wpm,
            accuracy: result.accuracy,
            characters_typed: result.characters_typed,
            error_count: result.error_count,
            error_map: result.error_map.clone(),
            duration_secs: result.test_duration_seconds,
            timestamp: Local::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub user: String,
    pub wpm: f64,
    pub accuracy: f64,
}

/// Storage collaborator for finished sessions. Callers at the completion
/// boundary treat every method as fire-and-forget: an error is reported and
/// dropped, never allowed back into scoring.
pub trait ResultStore {
    fn save_session_result(&mut self, record: &SessionRecord) -> Result<()>;

    /// A user's sessions, most recent first.
    fn user_history(&self, user: &str) -> Result<Vec<SessionRecord>>;

    /// Best run per user, fastest first.
    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;

    /// A user's most-mistyped characters across all saved sessions,
    /// worst first. Feeds practice-mode word synthesis.
    fn error_characters(&self, user: &str, limit: usize) -> Result<Vec<char>>;
}

/// SQLite-backed store under the XDG state directory.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the default on-disk store.
    pub fn new() -> Result<Self> {
        let db_path = Self::db_path().unwrap_or_else(|| PathBuf::from("typr_history.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        Self::open(&db_path)
    }

    /// Open a store at an explicit path; `:memory:` works for tests.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path.as_ref())
    }

    fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                wpm REAL NOT NULL,
                raw_wpm REAL NOT NULL,
                accuracy REAL NOT NULL,
                characters_typed INTEGER NOT NULL,
                error_count INTEGER NOT NULL,
                error_map TEXT NOT NULL,
                duration_secs REAL NOT NULL,
                timestamp TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_results_user ON session_results(user)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_results_timestamp ON session_results(timestamp)",
            [],
        )?;

        Ok(SqliteStore { conn })
    }

    /// Database file path under $HOME/.local/state/typr
    fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home).join(".local").join("state").join("typr");
            Some(state_dir.join("history.db"))
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "typr") {
            let state_dir = proj_dirs.data_local_dir();
            Some(state_dir.join("history.db"))
        } else {
            None
        }
    }
}

impl ResultStore for SqliteStore {
    fn save_session_result(&mut self, record: &SessionRecord) -> Result<()> {
        let error_map = serde_json::to_string(&record.error_map).unwrap_or_default();
        self.conn.execute(
            r#"
            INSERT INTO session_results
            (user, wpm, raw_wpm, accuracy, characters_typed, error_count, error_map, duration_secs, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.user,
                record.wpm,
                record.raw_wpm,
                record.accuracy,
                record.characters_typed,
                record.error_count,
                error_map,
                record.duration_secs,
                record.timestamp.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn user_history(&self, user: &str) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user, wpm, raw_wpm, accuracy, characters_typed, error_count, error_map, duration_secs, timestamp
            FROM session_results
            WHERE user = ?1
            ORDER BY timestamp DESC
            "#,
        )?;

        let rows = stmt.query_map([user], |row| {
            let timestamp_str: String = row.get(8)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        8,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            let error_map_json: String = row.get(6)?;

            Ok(SessionRecord {
                user: row.get(0)?,
                wpm: row.get(1)?,
                raw_wpm: row.get(2)?,
                accuracy: row.get(3)?,
                characters_typed: row.get::<_, i64>(4)? as usize,
                error_count: row.get::<_, i64>(5)? as usize,
                error_map: serde_json::from_str(&error_map_json).unwrap_or_default(),
                duration_secs: row.get(7)?,
                timestamp,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }

        Ok(records)
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT user, wpm, accuracy FROM session_results ORDER BY wpm DESC, timestamp ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(LeaderboardEntry {
                user: row.get(0)?,
                wpm: row.get(1)?,
                accuracy: row.get(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }

        // One row per user: the ordering above makes the first occurrence
        // that user's best run.
        Ok(entries
            .into_iter()
            .unique_by(|e| e.user.clone())
            .take(limit)
            .collect())
    }

    fn error_characters(&self, user: &str, limit: usize) -> Result<Vec<char>> {
        let mut stmt = self
            .conn
            .prepare("SELECT error_map FROM session_results WHERE user = ?1")?;

        let rows = stmt.query_map([user], |row| row.get::<_, String>(0))?;

        let mut totals: HashMap<char, u64> = HashMap::new();
        for row in rows {
            let map: ErrorMap = serde_json::from_str(&row?).unwrap_or_default();
            for (c, n) in map.iter() {
                *totals.entry(c).or_insert(0) += u64::from(n);
            }
        }

        Ok(totals
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
            .take(limit)
            .map(|(c, _)| c)
            .collect())
    }
}

/// Append-only CSV log of finished sessions, one line per run.
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "typr") {
            pd.config_dir().join("log.csv")
        } else {
            PathBuf::from("typr_log.csv")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn append(&self, record: &SessionRecord) -> std::result::Result<(), csv::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record([
                "date",
                "user",
                "wpm",
                "raw_wpm",
                "accuracy",
                "errors",
                "duration_secs",
            ])?;
        }

        writer.write_record([
            record.timestamp.format("%c").to_string(),
            record.user.clone(),
            format!("{:.2}", record.wpm),
            format!("{:.2}", record.raw_wpm),
            format!("{}", record.accuracy),
            record.error_count.to_string(),
            format!("{:.2}", record.duration_secs),
        ])?;

        writer.flush()?;
        Ok(())
    }
}
