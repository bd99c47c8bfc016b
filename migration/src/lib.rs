pub use sea_orm_migration::prelude::*;

mod m20241104_000001_create_tickets;
mod m20241104_000002_create_daily_passenger_counts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241104_000001_create_tickets::Migration),
            Box::new(m20241104_000002_create_daily_passenger_counts::Migration),
        ]
    }
}
