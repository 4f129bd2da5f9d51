//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod authentication;
mod customer;
mod id_generation;
pub mod logging;
pub mod migration;
pub mod transaction;

pub use authentication::AuthenticationService;
pub use customer::CustomerService;
pub use id_generation::{IdGenerationService, DEFAULT_BATCH_SIZE};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogQuery, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
