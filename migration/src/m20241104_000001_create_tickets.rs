use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ticket::Table)
                    .if_not_exists()
                    .col(pk_auto(Ticket::Id))
                    .col(string_len(Ticket::UserId, 50).not_null())
                    .col(string_len(Ticket::FromLocation, 50).not_null())
                    .col(string_len(Ticket::ToLocation, 50).not_null())
                    .col(double(Ticket::Fare).not_null())
                    .col(date(Ticket::TicketDate).not_null())
                    .col(boolean(Ticket::IsValidated).not_null().default(false))
                    .col(boolean(Ticket::IsActive).not_null().default(true))
                    .col(double(Ticket::DestinationLatitude).not_null())
                    .col(double(Ticket::DestinationLongitude).not_null())
                    .col(double_null(Ticket::CurrentLatitude))
                    .col(double_null(Ticket::CurrentLongitude))
                    .col(boolean(Ticket::IsArrived).not_null().default(false))
                    .col(boolean(Ticket::IsReleased).not_null().default(false))
                    .col(string_len_null(Ticket::QrCodePath, 200))
                    .to_owned(),
            )
            .await?;

        // Location pings look up the caller's open ticket
        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_user_active")
                    .table(Ticket::Table)
                    .col(Ticket::UserId)
                    .col(Ticket::IsActive)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ticket::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ticket {
    Table,
    Id,
    UserId,
    FromLocation,
    ToLocation,
    Fare,
    TicketDate,
    IsValidated,
    IsActive,
    DestinationLatitude,
    DestinationLongitude,
    CurrentLatitude,
    CurrentLongitude,
    IsArrived,
    IsReleased,
    QrCodePath,
}
