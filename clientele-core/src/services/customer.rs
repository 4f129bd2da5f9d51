//! Customer service - registration, lookups and password changes

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{Authentication, Customer, PasswordChange, SecurityContext, CUSTOMER_ENTITY};
use crate::ports::{
    CustomerRepository, EntityFactory, IdGenerator, PasswordEncoder, TransactionManager,
};

use super::transaction;

/// Customer service
///
/// A thin layer over the customer repository: it encodes credentials before
/// they are stored, defaults the registration flag, and re-authenticates the
/// session after a password change.
pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
    transactions: Arc<dyn TransactionManager>,
    id_generator: Arc<dyn IdGenerator>,
    password_encoder: Arc<dyn PasswordEncoder>,
    entities: Arc<dyn EntityFactory>,
    salt: Option<String>,
}

impl CustomerService {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        transactions: Arc<dyn TransactionManager>,
        id_generator: Arc<dyn IdGenerator>,
        password_encoder: Arc<dyn PasswordEncoder>,
        entities: Arc<dyn EntityFactory>,
    ) -> Self {
        Self {
            customers,
            transactions,
            id_generator,
            password_encoder,
            entities,
            salt: None,
        }
    }

    /// Use a fixed salt when encoding passwords and challenge answers
    pub fn with_salt(mut self, salt: Option<String>) -> Self {
        self.salt = salt;
        self
    }

    /// Encode pending credentials and upsert the customer
    ///
    /// Every saved customer ends up registered. The plaintext inputs are not
    /// cleared here; repositories only store and return encoded values.
    pub fn save_customer(&self, mut customer: Customer) -> Result<Customer> {
        if !customer.registered {
            customer.registered = true;
        }

        if let Some(raw) = customer.unencoded_password.as_deref() {
            customer.password = Some(self.encode(raw)?);
        }

        // The stored answer is encoded, so this holds for any submitted answer
        // unless it happens to equal the encoded form.
        if let Some(raw) = customer.unencoded_challenge_answer.as_deref() {
            if customer.challenge_answer.as_deref() != Some(raw) {
                customer.challenge_answer = Some(self.encode(raw)?);
            }
        }

        self.customers.maintain_customer(customer)
    }

    pub fn register_customer(&self, mut customer: Customer) -> Result<Customer> {
        customer.registered = true;
        self.save_customer(customer)
    }

    pub fn read_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        transaction::required(self.transactions.as_ref(), || {
            self.customers.read_customer_by_email(email)
        })
    }

    pub fn read_customer_by_username(&self, username: &str) -> Result<Option<Customer>> {
        transaction::required(self.transactions.as_ref(), || {
            self.customers.read_customer_by_username(username)
        })
    }

    pub fn read_customer_by_id(&self, id: i64) -> Result<Option<Customer>> {
        self.customers.read_customer_by_id(id)
    }

    /// Store a new password and swap the session onto it
    ///
    /// The new authentication keeps the authorities of the one it replaces;
    /// the replaced token is marked unauthenticated. Fails, and rolls back,
    /// when the customer is unknown or the context holds no authentication.
    pub fn change_password(
        &self,
        password_change: &PasswordChange,
        security_context: &mut SecurityContext,
    ) -> Result<Customer> {
        transaction::required(self.transactions.as_ref(), || {
            let mut customer = self
                .read_customer_by_username(&password_change.username)?
                .ok_or_else(|| {
                    Error::not_found(format!("Customer '{}'", password_change.username))
                })?;
            customer.unencoded_password = Some(password_change.new_password.clone());
            customer.password_change_required = password_change.password_change_required;
            let customer = self.save_customer(customer)?;

            let previous = security_context
                .authentication()
                .cloned()
                .ok_or_else(|| Error::authentication("No authentication in security context"))?;
            let renewed = Authentication::authenticated(
                password_change.username.clone(),
                password_change.new_password.clone(),
                previous.authorities().to_vec(),
            );
            security_context.set_authentication(Arc::new(renewed));
            previous.set_authenticated(false);

            Ok(customer)
        })
    }

    /// Look up a customer, or build an unsaved one with a fresh id
    pub fn create_customer_from_id(&self, customer_id: Option<i64>) -> Result<Customer> {
        let existing = match customer_id {
            Some(id) => self.read_customer_by_id(id)?,
            None => None,
        };

        match existing {
            Some(customer) => Ok(customer),
            None => {
                let mut customer = self.entities.create_customer();
                customer.id = Some(self.id_generator.find_next_id(CUSTOMER_ENTITY)?);
                Ok(customer)
            }
        }
    }

    fn encode(&self, raw: &str) -> Result<String> {
        self.password_encoder.encode_password(raw, self.salt.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    use super::*;
    use crate::adapters::entity::EntityConfiguration;
    use crate::adapters::memory::InMemoryRepository;

    /// Encodes `x` as `ENC(x)` so assertions can see what was encoded
    struct EncEncoder;

    impl PasswordEncoder for EncEncoder {
        fn encode_password(&self, raw: &str, _salt: Option<&str>) -> Result<String> {
            Ok(format!("ENC({})", raw))
        }

        fn is_password_valid(&self, encoded: &str, raw: &str, salt: Option<&str>) -> Result<bool> {
            Ok(self.encode_password(raw, salt)? == encoded)
        }
    }

    struct FailingEncoder;

    impl PasswordEncoder for FailingEncoder {
        fn encode_password(&self, _raw: &str, _salt: Option<&str>) -> Result<String> {
            Err(Error::encoding("encoder offline"))
        }

        fn is_password_valid(&self, _encoded: &str, _raw: &str, _salt: Option<&str>) -> Result<bool> {
            Err(Error::encoding("encoder offline"))
        }
    }

    struct CountingIds {
        next: AtomicI64,
        calls: AtomicUsize,
    }

    impl CountingIds {
        fn starting_at(next: i64) -> Self {
            Self {
                next: AtomicI64::new(next),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl IdGenerator for CountingIds {
        fn find_next_id(&self, id_type: &str) -> Result<i64> {
            assert_eq!(id_type, CUSTOMER_ENTITY);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.next.fetch_add(1, Ordering::SeqCst))
        }
    }

    /// Passes everything to an in-memory repository, counting lookups
    struct CountingReads {
        inner: Arc<InMemoryRepository>,
        reads: AtomicUsize,
    }

    impl CountingReads {
        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        fn counted<T>(&self, read: impl FnOnce(&InMemoryRepository) -> T) -> T {
            self.reads.fetch_add(1, Ordering::SeqCst);
            read(&self.inner)
        }
    }

    impl CustomerRepository for CountingReads {
        fn maintain_customer(&self, customer: Customer) -> Result<Customer> {
            self.inner.maintain_customer(customer)
        }

        fn read_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
            self.counted(|repo| repo.read_customer_by_email(email))
        }

        fn read_customer_by_username(&self, username: &str) -> Result<Option<Customer>> {
            self.counted(|repo| repo.read_customer_by_username(username))
        }

        fn read_customer_by_id(&self, id: i64) -> Result<Option<Customer>> {
            self.counted(|repo| repo.read_customer_by_id(id))
        }
    }

    struct Fixture {
        repo: Arc<InMemoryRepository>,
        customers: Arc<CountingReads>,
        ids: Arc<CountingIds>,
        service: CustomerService,
    }

    fn fixture() -> Fixture {
        fixture_with_encoder(Arc::new(EncEncoder))
    }

    fn fixture_with_encoder(encoder: Arc<dyn PasswordEncoder>) -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let customers = Arc::new(CountingReads {
            inner: repo.clone(),
            reads: AtomicUsize::new(0),
        });
        let ids = Arc::new(CountingIds::starting_at(1000));
        let service = CustomerService::new(
            customers.clone(),
            repo.clone(),
            ids.clone(),
            encoder,
            Arc::new(EntityConfiguration::default()),
        );
        Fixture {
            repo,
            customers,
            ids,
            service,
        }
    }

    fn session_for(username: &str, password: &str) -> (SecurityContext, Arc<Authentication>) {
        let auth = Arc::new(Authentication::authenticated(
            username,
            password,
            vec!["ROLE_USER".to_string(), "ROLE_ADMIN".to_string()],
        ));
        (SecurityContext::with_authentication(Arc::clone(&auth)), auth)
    }

    #[test]
    fn test_save_registers_and_encodes_password() {
        let f = fixture();
        let mut customer = Customer::new("alice", "alice@example.com");
        customer.unencoded_password = Some("secret".to_string());

        let saved = f.service.save_customer(customer).unwrap();

        assert!(saved.registered);
        assert_eq!(saved.password.as_deref(), Some("ENC(secret)"));
        assert!(saved.id.is_some());
    }

    #[test]
    fn test_save_without_password_keeps_stored_hash() {
        let f = fixture();
        let saved = f
            .service
            .save_customer(Customer::new("alice", "a@example.com").with_unencoded_password("one"))
            .unwrap();

        let mut reloaded = f.service.read_customer_by_id(saved.id.unwrap()).unwrap().unwrap();
        reloaded.first_name = Some("Alice".to_string());
        let resaved = f.service.save_customer(reloaded).unwrap();

        assert_eq!(resaved.password.as_deref(), Some("ENC(one)"));
        assert_eq!(resaved.first_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_save_encodes_new_challenge_answer() {
        let f = fixture();
        let mut customer = Customer::new("alice", "a@example.com").with_challenge("Pet?", "rex");
        customer.challenge_answer = Some("ENC(old)".to_string());

        let saved = f.service.save_customer(customer).unwrap();

        assert_eq!(saved.challenge_answer.as_deref(), Some("ENC(rex)"));
    }

    #[test]
    fn test_save_reencodes_answer_on_every_submission() {
        let f = fixture();
        let first = f
            .service
            .save_customer(Customer::new("alice", "a@example.com").with_challenge("Pet?", "rex"))
            .unwrap();

        // Same plaintext again: compared against the encoded value, so encoded again
        let mut again = first.clone();
        again.unencoded_challenge_answer = Some("rex".to_string());
        let second = f.service.save_customer(again).unwrap();
        assert_eq!(second.challenge_answer.as_deref(), Some("ENC(rex)"));

        // Only an answer equal to the stored encoded text is left alone
        let mut literal = second.clone();
        literal.unencoded_challenge_answer = Some("ENC(rex)".to_string());
        let third = f.service.save_customer(literal).unwrap();
        assert_eq!(third.challenge_answer.as_deref(), Some("ENC(rex)"));
    }

    #[test]
    fn test_register_always_registers() {
        let f = fixture();
        let mut customer = Customer::new("carol", "c@example.com");
        customer.registered = false;
        assert!(f.service.register_customer(customer).unwrap().registered);

        let mut already = Customer::new("dave", "d@example.com");
        already.registered = true;
        assert!(f.service.register_customer(already).unwrap().registered);
    }

    #[test]
    fn test_encoder_failure_propagates_and_nothing_is_stored() {
        let f = fixture_with_encoder(Arc::new(FailingEncoder));
        let customer = Customer::new("erin", "e@example.com").with_unencoded_password("pw");

        let err = f.service.save_customer(customer).unwrap_err();

        assert!(matches!(err, Error::Encoding(_)));
        assert_eq!(f.repo.len(), 0);
    }

    #[test]
    fn test_reads_return_none_when_missing() {
        let f = fixture();
        assert!(f.service.read_customer_by_email("nobody@example.com").unwrap().is_none());
        assert!(f.service.read_customer_by_username("nobody").unwrap().is_none());
        assert!(f.service.read_customer_by_id(42).unwrap().is_none());
    }

    #[test]
    fn test_reads_find_saved_customer() {
        let f = fixture();
        let saved = f
            .service
            .register_customer(Customer::new("frank", "frank@example.com"))
            .unwrap();

        let by_email = f.service.read_customer_by_email("frank@example.com").unwrap().unwrap();
        let by_name = f.service.read_customer_by_username("frank").unwrap().unwrap();
        let by_id = f.service.read_customer_by_id(saved.id.unwrap()).unwrap().unwrap();

        assert_eq!(by_email.id, saved.id);
        assert_eq!(by_name.id, saved.id);
        assert_eq!(by_id.username.as_deref(), Some("frank"));
        assert!(!f.repo.is_active());
    }

    #[test]
    fn test_change_password_reauthenticates() {
        let f = fixture();
        f.service
            .register_customer(Customer::new("bob", "bob@example.com").with_unencoded_password("old"))
            .unwrap();
        let (mut ctx, previous) = session_for("bob", "old");

        let mut change = PasswordChange::new("bob", "new1");
        change.password_change_required = true;
        let saved = f.service.change_password(&change, &mut ctx).unwrap();

        assert_eq!(saved.password.as_deref(), Some("ENC(new1)"));
        assert!(saved.password_change_required);
        let stored = f.service.read_customer_by_username("bob").unwrap().unwrap();
        assert_eq!(stored.password.as_deref(), Some("ENC(new1)"));

        let current = ctx.authentication().unwrap();
        assert_eq!(current.principal(), "bob");
        assert_eq!(current.credentials(), "new1");
        assert_eq!(current.authorities(), previous.authorities());
        assert!(current.is_authenticated());
        assert!(!previous.is_authenticated());
        assert!(!f.repo.is_active());
    }

    #[test]
    fn test_change_password_for_unknown_customer_fails() {
        let f = fixture();
        let (mut ctx, previous) = session_for("ghost", "pw");

        let err = f
            .service
            .change_password(&PasswordChange::new("ghost", "new"), &mut ctx)
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(previous.is_authenticated());
        assert!(!f.repo.is_active());
    }

    #[test]
    fn test_change_password_without_session_rolls_back() {
        let f = fixture();
        f.service
            .register_customer(Customer::new("bob", "bob@example.com").with_unencoded_password("old"))
            .unwrap();
        let mut ctx = SecurityContext::new();

        let err = f
            .service
            .change_password(&PasswordChange::new("bob", "new1"), &mut ctx)
            .unwrap_err();

        assert!(matches!(err, Error::Authentication(_)));
        let stored = f.service.read_customer_by_username("bob").unwrap().unwrap();
        assert_eq!(stored.password.as_deref(), Some("ENC(old)"));
        assert!(ctx.authentication().is_none());
    }

    #[test]
    fn test_create_from_missing_id_generates_new_customer() {
        let f = fixture();

        let fresh = f.service.create_customer_from_id(None).unwrap();

        assert_eq!(fresh.id, Some(1000));
        assert!(fresh.username.is_none());
        assert!(!fresh.registered);
        assert_eq!(f.customers.reads(), 0, "no id means no lookup");
        assert_eq!(f.repo.len(), 0, "create_customer_from_id must not persist");

        let unknown = f.service.create_customer_from_id(Some(999_999)).unwrap();
        assert_eq!(unknown.id, Some(1001));
        assert_eq!(f.customers.reads(), 1);
    }

    #[test]
    fn test_create_from_existing_id_returns_stored_customer() {
        let f = fixture();
        let saved = f
            .service
            .register_customer(Customer::new("gina", "g@example.com"))
            .unwrap();

        let found = f.service.create_customer_from_id(saved.id).unwrap();

        assert_eq!(found, saved);
        assert_eq!(f.customers.reads(), 1);
        assert_eq!(f.ids.calls.load(Ordering::SeqCst), 0);
    }
}
