//! Entity configuration - compile-time factories for domain entities

use crate::domain::Customer;
use crate::ports::EntityFactory;

/// Factory functions for each entity type
///
/// Deployments that extend the customer with defaults swap in their own
/// constructor with `with_customer_factory`.
#[derive(Clone, Copy)]
pub struct EntityConfiguration {
    customer: fn() -> Customer,
}

impl Default for EntityConfiguration {
    fn default() -> Self {
        Self {
            customer: Customer::default,
        }
    }
}

impl EntityConfiguration {
    pub fn with_customer_factory(mut self, factory: fn() -> Customer) -> Self {
        self.customer = factory;
        self
    }
}

impl EntityFactory for EntityConfiguration {
    fn create_customer(&self) -> Customer {
        (self.customer)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_factory_builds_blank_customer() {
        let customer = EntityConfiguration::default().create_customer();
        assert_eq!(customer, Customer::default());
    }

    #[test]
    fn test_custom_factory() {
        fn needs_reset() -> Customer {
            Customer {
                password_change_required: true,
                ..Customer::default()
            }
        }

        let config = EntityConfiguration::default().with_customer_factory(needs_reset);
        assert!(config.create_customer().password_change_required);
    }
}
