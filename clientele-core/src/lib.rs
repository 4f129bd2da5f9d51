//! Clientele Core - customer profile management
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Customer, PasswordChange, Authentication)
//! - **ports**: Trait definitions for external dependencies (repository, encoder, ids)
//! - **services**: Business logic orchestration (CustomerService and friends)
//! - **adapters**: Concrete implementations (DuckDB, in-memory, Argon2, SHA-256)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;
pub mod log_migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use adapters::entity::EntityConfiguration;
use config::Config;
use ports::PasswordEncoder;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{Authentication, AuthenticationSummary, Customer, PasswordChange, SecurityContext};
pub use domain::result::{Error, OperationResult};
pub use services::{EntryPoint, LogEvent, LogQuery, LoggingService};

/// File name of the customer database inside the data directory
pub const DATABASE_FILE: &str = "clientele.duckdb";

/// Main context for Clientele operations
///
/// Opens the customer database in a data directory and wires every service
/// against it. One context per process or session: the repository's
/// transaction state is shared by everything built here.
pub struct ClienteleContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub password_encoder: Arc<dyn PasswordEncoder>,
    pub id_generation_service: Arc<IdGenerationService>,
    pub customer_service: CustomerService,
    pub authentication_service: AuthenticationService,
}

impl ClienteleContext {
    /// Create a new context, loading settings from `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::with_config(data_dir, config)
    }

    /// Create a context with an already resolved configuration
    pub fn with_config(data_dir: &Path, config: Config) -> Result<Self> {
        let encoder = config.build_password_encoder();
        Self::with_encoder(data_dir, config, encoder)
    }

    /// Create a context with an explicit password encoder
    pub fn with_encoder(
        data_dir: &Path,
        config: Config,
        password_encoder: Arc<dyn PasswordEncoder>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let db_path = data_dir.join(DATABASE_FILE);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );

        // Initialize schema
        repository.ensure_schema()?;

        let id_generation_service = Arc::new(IdGenerationService::new(
            repository.clone(),
            config.id_batch_size,
        ));
        let customer_service = CustomerService::new(
            repository.clone(),
            repository.clone(),
            id_generation_service.clone(),
            password_encoder.clone(),
            Arc::new(EntityConfiguration::default()),
        )
        .with_salt(config.password_salt.clone());
        let authentication_service = AuthenticationService::new(
            repository.clone(),
            password_encoder.clone(),
            config.password_salt.clone(),
            config.default_authorities.clone(),
        );

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            password_encoder,
            id_generation_service,
            customer_service,
            authentication_service,
        })
    }
}
