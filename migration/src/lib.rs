pub use sea_orm_migration::prelude::*;

mod m20261016_000001_create_dimension_tables;
mod m20261016_000002_create_fact_tables;
mod m20261016_000003_create_miner;
mod m20261016_000004_create_sync_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261016_000001_create_dimension_tables::Migration),
            Box::new(m20261016_000002_create_fact_tables::Migration),
            Box::new(m20261016_000003_create_miner::Migration),
            Box::new(m20261016_000004_create_sync_status::Migration),
        ]
    }
}
