//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod authentication;
mod customer;
mod password_change;
pub mod result;

pub use authentication::{Authentication, AuthenticationSummary, SecurityContext};
pub use customer::{is_valid_email, Customer, CUSTOMER_ENTITY};
pub use password_change::PasswordChange;
