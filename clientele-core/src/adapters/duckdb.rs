//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::{params, Connection, ToSql};

use crate::domain::result::{Error, Result};
use crate::domain::{Customer, CUSTOMER_ENTITY};
use crate::migrations::MIGRATIONS;
use crate::ports::{CustomerRepository, IdBatchStore, TransactionManager};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const CUSTOMER_COLUMNS: &str = "customer_id, username, email, first_name, last_name, password,
     challenge_question, challenge_answer, password_change_required, registered,
     created_at, updated_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_to_customer(row: &duckdb::Row) -> duckdb::Result<Customer> {
    Ok(Customer {
        id: Some(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        password: row.get(5)?,
        unencoded_password: None,
        challenge_question: row.get(6)?,
        challenge_answer: row.get(7)?,
        unencoded_challenge_answer: None,
        password_change_required: row.get(8)?,
        registered: row.get(9)?,
        created_at: parse_timestamp(row.get(10)?),
        updated_at: parse_timestamp(row.get(11)?),
    })
}

/// DuckDB-backed customer store
///
/// One connection guarded by a mutex. Transactions are per repository:
/// while one is active every statement on this repository joins it.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    in_transaction: AtomicBool,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff while another process holds the file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => return Ok(Self::from_connection(conn, Some(db_path.to_path_buf()))),
                Err(e) if attempt + 1 < MAX_RETRIES && is_retryable_error(&e.to_string()) => {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    eprintln!(
                        "[clientele] Database busy, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES,
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self::from_connection(conn, None))
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> Self {
        Self {
            conn: Mutex::new(conn),
            db_path,
            in_transaction: AtomicBool::new(false),
        }
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off: nothing here needs one
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Path of the database file, None for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn, MIGRATIONS).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn count_customers(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM sys_customers", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_registered_customers(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM sys_customers WHERE registered",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn read_one(conn: &Connection, filter: &str, values: &[&dyn ToSql]) -> Result<Option<Customer>> {
        let sql = format!(
            "SELECT {} FROM sys_customers WHERE {} ORDER BY customer_id LIMIT 1",
            CUSTOMER_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(values, row_to_customer)?;
        let customer = rows.next().transpose()?;
        Ok(customer)
    }

    fn reserve_on(conn: &Connection, id_type: &str, batch_size: u32) -> Result<i64> {
        let start = {
            let mut stmt =
                conn.prepare("SELECT next_id FROM sys_id_generation WHERE id_type = ?")?;
            let mut rows = stmt.query_map([id_type], |row| row.get::<_, i64>(0))?;
            let current = rows.next().transpose()?;
            current.unwrap_or(1)
        };
        conn.execute(
            "INSERT INTO sys_id_generation (id_type, next_id) VALUES (?, ?)
             ON CONFLICT (id_type) DO UPDATE SET next_id = EXCLUDED.next_id",
            params![id_type, start + i64::from(batch_size.max(1))],
        )?;
        Ok(start)
    }

    /// Raise the sequence for `id_type` above `id`, never lowering it
    fn advance_past(conn: &Connection, id_type: &str, id: i64) -> Result<()> {
        conn.execute(
            "INSERT INTO sys_id_generation (id_type, next_id) VALUES (?, ?)
             ON CONFLICT (id_type) DO UPDATE SET next_id = GREATEST(next_id, EXCLUDED.next_id)",
            params![id_type, id + 1],
        )?;
        Ok(())
    }
}

impl CustomerRepository for DuckDbRepository {
    fn maintain_customer(&self, customer: Customer) -> Result<Customer> {
        let conn = self.conn()?;

        if let Some(username) = customer.username.as_deref() {
            let taken: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sys_customers WHERE username = ? AND customer_id IS DISTINCT FROM ?",
                params![username, customer.id],
                |row| row.get(0),
            )?;
            if taken > 0 {
                return Err(Error::database(format!(
                    "Duplicate key: username '{}' already exists",
                    username
                )));
            }
        }

        let id = match customer.id {
            Some(id) => {
                Self::advance_past(&conn, CUSTOMER_ENTITY, id)?;
                id
            }
            None => Self::reserve_on(&conn, CUSTOMER_ENTITY, 1)?,
        };
        let now = Utc::now().to_rfc3339();

        // created_at is only written on insert
        conn.execute(
            "INSERT INTO sys_customers (customer_id, username, email, first_name, last_name, password,
                                        challenge_question, challenge_answer, password_change_required,
                                        registered, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (customer_id) DO UPDATE SET
                username = EXCLUDED.username,
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                password = EXCLUDED.password,
                challenge_question = EXCLUDED.challenge_question,
                challenge_answer = EXCLUDED.challenge_answer,
                password_change_required = EXCLUDED.password_change_required,
                registered = EXCLUDED.registered,
                updated_at = EXCLUDED.updated_at",
            params![
                id,
                customer.username,
                customer.email,
                customer.first_name,
                customer.last_name,
                customer.password,
                customer.challenge_question,
                customer.challenge_answer,
                customer.password_change_required,
                customer.registered,
                now,
                now,
            ],
        )?;

        Self::read_one(&conn, "customer_id = ?", params![id])?
            .ok_or_else(|| Error::database(format!("Customer {} vanished after write", id)))
    }

    fn read_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let conn = self.conn()?;
        Self::read_one(&conn, "email = ?", params![email])
    }

    fn read_customer_by_username(&self, username: &str) -> Result<Option<Customer>> {
        let conn = self.conn()?;
        Self::read_one(&conn, "username = ?", params![username])
    }

    fn read_customer_by_id(&self, id: i64) -> Result<Option<Customer>> {
        let conn = self.conn()?;
        Self::read_one(&conn, "customer_id = ?", params![id])
    }
}

impl TransactionManager for DuckDbRepository {
    fn begin(&self) -> Result<()> {
        let conn = self.conn()?;
        if self.in_transaction.load(Ordering::SeqCst) {
            return Err(Error::database("Transaction already active"));
        }
        conn.execute_batch("BEGIN TRANSACTION")?;
        self.in_transaction.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let conn = self.conn()?;
        // A failed COMMIT aborts the transaction in DuckDB, so the flag clears either way
        self.in_transaction.store(false, Ordering::SeqCst);
        conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let conn = self.conn()?;
        self.in_transaction.store(false, Ordering::SeqCst);
        conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }
}

impl IdBatchStore for DuckDbRepository {
    fn reserve_id_batch(&self, id_type: &str, batch_size: u32) -> Result<i64> {
        let conn = self.conn()?;
        Self::reserve_on(&conn, id_type, batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file"));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_insert_roundtrips_fields() {
        let repo = repo();
        let mut customer = Customer::new("bob", "bob@example.com");
        customer.first_name = Some("Bob".to_string());
        customer.password = Some("hash".to_string());
        customer.challenge_question = Some("Pet?".to_string());
        customer.challenge_answer = Some("answer-hash".to_string());
        customer.registered = true;
        customer.password_change_required = true;
        customer.unencoded_password = Some("plain".to_string());

        let saved = repo.maintain_customer(customer).unwrap();

        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.username.as_deref(), Some("bob"));
        assert_eq!(saved.first_name.as_deref(), Some("Bob"));
        assert!(saved.last_name.is_none());
        assert_eq!(saved.password.as_deref(), Some("hash"));
        assert_eq!(saved.challenge_answer.as_deref(), Some("answer-hash"));
        assert!(saved.registered);
        assert!(saved.password_change_required);
        assert!(saved.unencoded_password.is_none());
        assert!(saved.created_at.is_some());
    }

    #[test]
    fn test_update_keeps_id_and_created_at() {
        let repo = repo();
        let saved = repo.maintain_customer(Customer::new("bob", "b@example.com")).unwrap();

        let mut changed = saved.clone();
        changed.email = Some("new@example.com".to_string());
        let updated = repo.maintain_customer(changed).unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.created_at, saved.created_at);
        assert_eq!(updated.email.as_deref(), Some("new@example.com"));
        assert_eq!(repo.count_customers().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let repo = repo();
        repo.maintain_customer(Customer::new("bob", "b@example.com")).unwrap();
        let err = repo
            .maintain_customer(Customer::new("bob", "other@example.com"))
            .unwrap_err();
        assert!(err.to_string().contains("Duplicate key"));
    }

    #[test]
    fn test_lookups() {
        let repo = repo();
        let saved = repo.maintain_customer(Customer::new("bob", "b@example.com")).unwrap();

        assert_eq!(repo.read_customer_by_email("b@example.com").unwrap().unwrap().id, saved.id);
        assert_eq!(repo.read_customer_by_username("bob").unwrap().unwrap().id, saved.id);
        assert!(repo.read_customer_by_username("alice").unwrap().is_none());
        assert!(repo.read_customer_by_id(99).unwrap().is_none());
    }

    #[test]
    fn test_rollback_discards_writes() {
        let repo = repo();
        repo.begin().unwrap();
        assert!(repo.is_active());
        repo.maintain_customer(Customer::new("bob", "b@example.com")).unwrap();
        repo.rollback().unwrap();

        assert!(!repo.is_active());
        assert_eq!(repo.count_customers().unwrap(), 0);
    }

    #[test]
    fn test_explicit_id_is_not_handed_out_again() {
        let repo = repo();
        let alice = Customer {
            id: Some(1),
            ..Customer::new("alice", "a@example.com")
        };
        repo.maintain_customer(alice).unwrap();

        let bob = repo.maintain_customer(Customer::new("bob", "b@example.com")).unwrap();

        assert_eq!(bob.id, Some(2));
        assert_eq!(repo.count_customers().unwrap(), 2);
        assert_eq!(
            repo.read_customer_by_id(1).unwrap().unwrap().username.as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn test_explicit_id_below_sequence_leaves_it_alone() {
        let repo = repo();
        assert_eq!(repo.reserve_id_batch(CUSTOMER_ENTITY, 10).unwrap(), 1);
        let reserved = Customer {
            id: Some(4),
            ..Customer::new("alice", "a@example.com")
        };
        repo.maintain_customer(reserved).unwrap();
        assert_eq!(repo.reserve_id_batch(CUSTOMER_ENTITY, 10).unwrap(), 11);
    }

    #[test]
    fn test_id_batches_are_disjoint() {
        let repo = repo();
        assert_eq!(repo.reserve_id_batch(CUSTOMER_ENTITY, 50).unwrap(), 1);
        assert_eq!(repo.reserve_id_batch(CUSTOMER_ENTITY, 50).unwrap(), 51);
        assert_eq!(repo.reserve_id_batch("address", 5).unwrap(), 1);

        let saved = repo.maintain_customer(Customer::new("bob", "b@example.com")).unwrap();
        assert_eq!(saved.id, Some(101));
    }
}
