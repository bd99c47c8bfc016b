use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DailyPassengerCount::Table)
                    .if_not_exists()
                    .col(pk_auto(DailyPassengerCount::Id))
                    .col(date(DailyPassengerCount::Date).not_null().unique_key())
                    .col(
                        integer(DailyPassengerCount::TotalPassengers)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        integer(DailyPassengerCount::CurrentPassengers)
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DailyPassengerCount::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum DailyPassengerCount {
    Table,
    Id,
    Date,
    TotalPassengers,
    CurrentPassengers,
}
