//! Logging service - structured event logging to DuckDB
//!
//! Events go to logs.duckdb next to the customer database. Credentials,
//! challenge answers and email addresses are never logged: events carry at
//! most a customer id.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::{Connection, ToSql};
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

/// File name of the event log inside the data directory
pub const LOG_DATABASE_FILE: &str = "logs.duckdb";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Millisecond clock in the high bits, a wrapping 16-bit sequence in the low bits
fn next_entry_id(now: i64) -> u64 {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((now.max(0) as u64) << 16) | seq
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Which front end produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Service,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Service => "service",
        }
    }
}

/// Something worth recording, before it is stamped and stored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attach the customer the event is about; `None` leaves it unset
    pub fn with_customer(mut self, customer_id: Option<i64>) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A stored event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub customer_id: Option<i64>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

impl LogEntry {
    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }

    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            timestamp: row.get("timestamp")?,
            entry_point: row.get("entry_point")?,
            app_version: row.get("app_version")?,
            platform: row.get("platform")?,
            event: row.get("event")?,
            command: row.get("command")?,
            customer_id: row.get("customer_id")?,
            error_message: row.get("error_message")?,
            error_details: row.get("error_details")?,
        })
    }
}

/// Which entries to read back, newest first
#[derive(Debug, Clone)]
pub struct LogQuery {
    pub limit: usize,
    pub errors_only: bool,
    pub customer_id: Option<i64>,
    pub command: Option<String>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            errors_only: false,
            customer_id: None,
            command: None,
        }
    }
}

impl LogQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn errors(limit: usize) -> Self {
        Self {
            limit,
            errors_only: true,
            ..Self::default()
        }
    }

    /// WHERE clause and its parameters, limit last
    fn to_sql(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut clauses = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if self.errors_only {
            clauses.push("error_message IS NOT NULL");
        }
        if let Some(id) = self.customer_id {
            clauses.push("customer_id = ?");
            params.push(Box::new(id));
        }
        if let Some(command) = &self.command {
            clauses.push("command = ?");
            params.push(Box::new(command.clone()));
        }
        params.push(Box::new(self.limit as i64));

        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        (filter, params)
    }
}

/// Totals over the whole log
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total: u64,
    pub errors: u64,
    /// Oldest entry, unix milliseconds
    pub first_timestamp: Option<i64>,
    /// Event names with their counts, most frequent first
    pub events: Vec<(String, u64)>,
}

/// Records and reads back events in logs.duckdb
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create the log database in `data_dir` and bring its schema up to date
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join(LOG_DATABASE_FILE);
        let conn = Connection::open(&db_path)?;
        MigrationService::new(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: std::env::consts::OS,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Stamp an event with time, entry point, version and platform, and store it
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let now = now_ms();
        self.conn()?.execute(
            "INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform,
                event, command, customer_id, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                next_entry_id(now),
                now,
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.command,
                &event.customer_id,
                &event.error_message,
                &event.error_details,
            ],
        )?;
        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let log_event = LogEvent::new(event).with_error(message);
        self.log(match details {
            Some(d) => log_event.with_error_details(d),
            None => log_event,
        })
    }

    pub fn query(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let (filter, params) = query.to_sql();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM sys_logs {} ORDER BY timestamp DESC, id DESC LIMIT ?",
            filter
        ))?;
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| &**p).collect();
        let entries = stmt
            .query_map(refs.as_slice(), LogEntry::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn stats(&self) -> Result<LogStats> {
        let conn = self.conn()?;
        let (total, errors, first_timestamp): (i64, i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), COUNT(error_message), MIN(timestamp) FROM sys_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT event, COUNT(*) AS n FROM sys_logs GROUP BY event ORDER BY n DESC, event",
        )?;
        let events = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as u64))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LogStats {
            total: total.max(0) as u64,
            errors: errors.max(0) as u64,
            first_timestamp,
            events,
        })
    }

    /// Delete entries older than `timestamp_ms`, returning how many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
