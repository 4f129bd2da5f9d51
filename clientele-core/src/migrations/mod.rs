//! Customer database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary with include_str! and applied
//! in list order by `MigrationService`.

/// All migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// When adding a migration, create NNN_description.sql and append it here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_customers.sql", include_str!("001_customers.sql")),
    ("002_id_generation.sql", include_str!("002_id_generation.sql")),
];
