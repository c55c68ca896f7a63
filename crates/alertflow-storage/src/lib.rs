//! PostgreSQL storage layer for the workflow engine.
//!
//! Contains SeaORM entities, migrations (schema plus the node-library
//! seed), and [`PgWorkflowStore`], the database implementation of the
//! engine's [`WorkflowStore`](alertflow_engine::traits::WorkflowStore)
//! contract.

pub mod migrations;
pub mod models;
pub mod store;

pub use store::PgWorkflowStore;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

/// Connect to a database using the given URL, with production pool
/// settings applied.
pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(10)
        .min_connections(2)
        .max_lifetime(Duration::from_secs(30 * 60))
        .idle_timeout(Duration::from_secs(5 * 60));
    Database::connect(opts).await
}

/// Run the workflow-engine migrations, including the node-library seed.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrations::Migrator::up(db, None).await
}
