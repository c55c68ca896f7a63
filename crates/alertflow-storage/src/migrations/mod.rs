//! Schema migrations for the workflow tables, plus the node-library seed.

use sea_orm_migration::prelude::*;

mod m20250301_000001_workflow_tables;
mod m20250301_000002_seed_node_library;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_workflow_tables::Migration),
            Box::new(m20250301_000002_seed_node_library::Migration),
        ]
    }
}
