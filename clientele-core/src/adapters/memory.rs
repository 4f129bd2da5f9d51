//! In-memory repository implementation
//!
//! Used by tests and by callers that want a throwaway store. Transactions
//! snapshot the whole map on begin and restore it on rollback.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::domain::result::{Error, Result};
use crate::domain::{Customer, CUSTOMER_ENTITY};
use crate::ports::{CustomerRepository, IdBatchStore, TransactionManager};

#[derive(Default, Clone)]
struct State {
    customers: HashMap<i64, Customer>,
    next_ids: HashMap<String, i64>,
}

impl State {
    fn reserve(&mut self, id_type: &str, batch_size: u32) -> i64 {
        let next = self.next_ids.entry(id_type.to_string()).or_insert(1);
        let start = *next;
        *next += i64::from(batch_size.max(1));
        start
    }

    /// Keep future reservations above an id that was stored without one
    fn advance_past(&mut self, id_type: &str, id: i64) {
        let next = self.next_ids.entry(id_type.to_string()).or_insert(1);
        if *next <= id {
            *next = id + 1;
        }
    }
}

#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
    snapshot: Mutex<Option<State>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored customers
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.customers.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    fn snapshot(&self) -> Result<MutexGuard<'_, Option<State>>> {
        self.snapshot
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    fn find(&self, matches: impl Fn(&Customer) -> bool) -> Result<Option<Customer>> {
        Ok(self.state()?.customers.values().find(|c| matches(c)).cloned())
    }
}

impl CustomerRepository for InMemoryRepository {
    fn maintain_customer(&self, mut customer: Customer) -> Result<Customer> {
        let mut state = self.state()?;

        if let Some(username) = customer.username.as_deref() {
            let taken = state
                .customers
                .values()
                .any(|c| c.username.as_deref() == Some(username) && c.id != customer.id);
            if taken {
                return Err(Error::database(format!(
                    "Duplicate key: username '{}' already exists",
                    username
                )));
            }
        }

        let id = match customer.id {
            Some(id) => {
                state.advance_past(CUSTOMER_ENTITY, id);
                id
            }
            None => state.reserve(CUSTOMER_ENTITY, 1),
        };
        let now = Utc::now();
        let created_at = state
            .customers
            .get(&id)
            .and_then(|existing| existing.created_at)
            .unwrap_or(now);

        customer.id = Some(id);
        customer.created_at = Some(created_at);
        customer.updated_at = Some(now);
        customer.unencoded_password = None;
        customer.unencoded_challenge_answer = None;

        state.customers.insert(id, customer.clone());
        Ok(customer)
    }

    fn read_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        self.find(|c| c.email.as_deref() == Some(email))
    }

    fn read_customer_by_username(&self, username: &str) -> Result<Option<Customer>> {
        self.find(|c| c.username.as_deref() == Some(username))
    }

    fn read_customer_by_id(&self, id: i64) -> Result<Option<Customer>> {
        Ok(self.state()?.customers.get(&id).cloned())
    }
}

impl TransactionManager for InMemoryRepository {
    fn begin(&self) -> Result<()> {
        let mut snapshot = self.snapshot()?;
        if snapshot.is_some() {
            return Err(Error::database("Transaction already active"));
        }
        *snapshot = Some(self.state()?.clone());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.snapshot()?
            .take()
            .map(|_| ())
            .ok_or_else(|| Error::database("No active transaction"))
    }

    fn rollback(&self) -> Result<()> {
        let saved = self
            .snapshot()?
            .take()
            .ok_or_else(|| Error::database("No active transaction"))?;
        *self.state()? = saved;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.snapshot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

impl IdBatchStore for InMemoryRepository {
    fn reserve_id_batch(&self, id_type: &str, batch_size: u32) -> Result<i64> {
        Ok(self.state()?.reserve(id_type, batch_size))
    }
}
