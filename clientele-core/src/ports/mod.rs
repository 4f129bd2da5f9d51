//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod password_encoder;
mod repository;

use crate::domain::result::Result;
use crate::domain::Customer;

pub use password_encoder::PasswordEncoder;
pub use repository::{CustomerRepository, IdBatchStore, TransactionManager};

/// Hands out the next id for an entity type
pub trait IdGenerator: Send + Sync {
    fn find_next_id(&self, id_type: &str) -> Result<i64>;
}

/// Builds fresh, unsaved entity instances
pub trait EntityFactory: Send + Sync {
    fn create_customer(&self) -> Customer;
}
