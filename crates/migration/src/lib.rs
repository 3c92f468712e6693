//! Schema migrations for the catalog, accounts, worker registry, and login sessions.
//!
//! Tables are created with their foreign keys inline so the same migrations run on MySQL and
//! SQLite.

pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_catalog_tables;
mod m20240301_000002_create_identity_tables;
mod m20240301_000003_create_worker_tables;
mod m20240301_000004_create_sessions_table;

#[derive(Debug)]
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    /// Applied in order; append new migrations at the end.
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_catalog_tables::Migration),
            Box::new(m20240301_000002_create_identity_tables::Migration),
            Box::new(m20240301_000003_create_worker_tables::Migration),
            Box::new(m20240301_000004_create_sessions_table::Migration),
        ]
    }
}
