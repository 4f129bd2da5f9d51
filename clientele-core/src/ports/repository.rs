//! Repository ports - persistence abstraction

use crate::domain::result::Result;
use crate::domain::Customer;

/// Customer data access
///
/// Lookups return `Ok(None)` when nothing matches; `Err` is reserved for
/// failures of the store itself.
pub trait CustomerRepository: Send + Sync {
    /// Insert the customer when it has no id (or an unknown one), update it otherwise.
    /// Returns the stored state, including the assigned id and audit timestamps.
    /// Storing an explicit id moves the "customer" id sequence past it, so later
    /// id-less inserts never land on that row.
    fn maintain_customer(&self, customer: Customer) -> Result<Customer>;

    fn read_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;

    fn read_customer_by_username(&self, username: &str) -> Result<Option<Customer>>;

    fn read_customer_by_id(&self, id: i64) -> Result<Option<Customer>>;
}

/// Unit-of-work control for a store
///
/// Only one transaction can be active per implementation instance.
pub trait TransactionManager: Send + Sync {
    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Whether a transaction begun on this instance is still open
    fn is_active(&self) -> bool;
}

/// Durable source of id ranges, keyed by entity type
pub trait IdBatchStore: Send + Sync {
    /// Reserve `batch_size` consecutive ids for `id_type`, returning the first one
    fn reserve_id_batch(&self, id_type: &str, batch_size: u32) -> Result<i64>;
}
