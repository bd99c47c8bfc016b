//! Ticket lifecycle: booking, location tracking, validation and reset.
//!
//! Each operation runs in one database transaction. A ticket leaves its
//! booking date's `current_passengers` exactly once, on whichever comes
//! first of manager validation or arrival at the destination.

use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use thiserror::Error;

use crate::entities::{daily_passenger_count, ticket};
use crate::network::Network;
use crate::services::artifacts::ArtifactStore;
use crate::services::counters::{self, DailySnapshot};
use crate::services::reset::RESET_CONFIRMATION;
use crate::utils::geo::{self, Coordinates};
use crate::utils::qr::{self, QrError, TicketPayload};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Invalid route selected: {from} to {to} is not served")]
    InvalidRoute { from: String, to: String },

    #[error("No coordinates known for destination {0}")]
    UnknownDestination(String),

    #[error("Valid latitude and longitude are required")]
    InvalidCoordinates,

    #[error("No active ticket found")]
    NoActiveTicket,

    #[error("Ticket {0} not found")]
    TicketNotFound(i32),

    #[error("Reset cancelled: confirmation text did not match")]
    ConfirmationMismatch,

    #[error(transparent)]
    Qr(#[from] QrError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbErr),

    #[error("Artifact error: {0}")]
    Artifact(#[from] std::io::Error),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationStatus {
    Tracking,
    Arrived,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationUpdate {
    pub ticket_id: i32,
    pub status: LocationStatus,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Validated,
    AlreadyValidated,
}

#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    pub ticket_id: i32,
    pub outcome: ValidationOutcome,
    /// Whether this validation took the passenger off the onboard counter
    pub released: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetSummary {
    pub tickets_deleted: u64,
    pub counters_deleted: u64,
    pub artifacts_removed: usize,
    pub artifacts_failed: usize,
}

pub struct TicketLifecycle<'a> {
    db: &'a DatabaseConnection,
    network: &'a Network,
    artifacts: &'a ArtifactStore,
    proximity_threshold_km: f64,
}

impl<'a> TicketLifecycle<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        network: &'a Network,
        artifacts: &'a ArtifactStore,
        proximity_threshold_km: f64,
    ) -> Self {
        Self {
            db,
            network,
            artifacts,
            proximity_threshold_km,
        }
    }

    pub fn quote(&self, from: &str, to: &str) -> LifecycleResult<f64> {
        self.network
            .fare(from, to)
            .ok_or_else(|| LifecycleError::InvalidRoute {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// Issue a ticket, write its QR image and count the passenger for `date`
    pub async fn book(
        &self,
        user_id: &str,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> LifecycleResult<ticket::Model> {
        let fare = self.quote(from, to)?;
        let destination = self
            .network
            .coordinates(to)
            .ok_or_else(|| LifecycleError::UnknownDestination(to.to_string()))?;

        let txn = self.db.begin().await?;

        let inserted = ticket::ActiveModel {
            user_id: Set(user_id.to_string()),
            from_location: Set(from.to_string()),
            to_location: Set(to.to_string()),
            fare: Set(fare),
            ticket_date: Set(date),
            is_validated: Set(false),
            is_active: Set(true),
            destination_latitude: Set(destination.latitude),
            destination_longitude: Set(destination.longitude),
            current_latitude: Set(None),
            current_longitude: Set(None),
            is_arrived: Set(false),
            is_released: Set(false),
            qr_code_path: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let ticket_id = inserted.id;
        let png = qr::encode_png(&TicketPayload::from(&inserted))?;
        let path = self.artifacts.write(ticket_id, &png).await?;

        let mut active: ticket::ActiveModel = inserted.into();
        active.qr_code_path = Set(Some(path.display().to_string()));

        // The image is already on disk; drop it if the rows never land
        match finish_booking(txn, active, date).await {
            Ok(ticket) => {
                tracing::info!(
                    ticket_id,
                    user = %user_id,
                    route = %format!("{} -> {}", from, to),
                    fare,
                    "Ticket booked"
                );
                Ok(ticket)
            }
            Err(e) => {
                self.artifacts.discard(ticket_id).await;
                Err(e.into())
            }
        }
    }

    /// Record a position ping and mark arrival once within the proximity threshold
    pub async fn update_location(
        &self,
        user_id: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> LifecycleResult<LocationUpdate> {
        let position =
            Coordinates::from_parts(latitude, longitude).ok_or(LifecycleError::InvalidCoordinates)?;

        let txn = self.db.begin().await?;

        let ticket = ticket::Entity::find()
            .filter(ticket::Column::UserId.eq(user_id))
            .filter(ticket::Column::IsActive.eq(true))
            .filter(ticket::Column::IsArrived.eq(false))
            .order_by_desc(ticket::Column::Id)
            .one(&txn)
            .await?
            .ok_or(LifecycleError::NoActiveTicket)?;

        ticket::Entity::update_many()
            .col_expr(ticket::Column::CurrentLatitude, Expr::value(position.latitude))
            .col_expr(ticket::Column::CurrentLongitude, Expr::value(position.longitude))
            .filter(ticket::Column::Id.eq(ticket.id))
            .exec(&txn)
            .await?;

        let destination = Coordinates::new(ticket.destination_latitude, ticket.destination_longitude);
        let distance_km = position.distance_km(&destination);

        let status = if geo::is_within_proximity(&position, &destination, self.proximity_threshold_km) {
            let arrived = ticket::Entity::update_many()
                .col_expr(ticket::Column::IsArrived, Expr::value(true))
                .col_expr(ticket::Column::IsActive, Expr::value(false))
                .filter(ticket::Column::Id.eq(ticket.id))
                .filter(ticket::Column::IsArrived.eq(false))
                .exec(&txn)
                .await?;

            if arrived.rows_affected == 1 {
                release(&txn, &ticket).await?;
            }
            LocationStatus::Arrived
        } else {
            LocationStatus::Tracking
        };

        txn.commit().await?;

        if status == LocationStatus::Arrived {
            tracing::info!(ticket_id = ticket.id, user = %user_id, distance_km, "Passenger arrived");
        } else {
            tracing::debug!(ticket_id = ticket.id, distance_km, "Location updated");
        }

        Ok(LocationUpdate {
            ticket_id: ticket.id,
            status,
            distance_km,
        })
    }

    /// Mark a ticket validated. Validating twice is a no-op reported as `AlreadyValidated`.
    pub async fn validate(&self, ticket_id: i32) -> LifecycleResult<Validation> {
        let txn = self.db.begin().await?;

        let ticket = ticket::Entity::find_by_id(ticket_id)
            .one(&txn)
            .await?
            .ok_or(LifecycleError::TicketNotFound(ticket_id))?;

        let marked = ticket::Entity::update_many()
            .col_expr(ticket::Column::IsValidated, Expr::value(true))
            .filter(ticket::Column::Id.eq(ticket_id))
            .filter(ticket::Column::IsValidated.eq(false))
            .exec(&txn)
            .await?;

        let (outcome, released) = if marked.rows_affected == 0 {
            (ValidationOutcome::AlreadyValidated, false)
        } else {
            (ValidationOutcome::Validated, release(&txn, &ticket).await?)
        };

        txn.commit().await?;

        match outcome {
            ValidationOutcome::Validated => tracing::info!(ticket_id, released, "Ticket validated"),
            ValidationOutcome::AlreadyValidated => {
                tracing::info!(ticket_id, "Ticket already validated")
            }
        }

        Ok(Validation {
            ticket_id,
            outcome,
            released,
        })
    }

    /// Validate the ticket whose id is embedded in a scanned QR image
    pub async fn validate_scan(&self, image: &[u8]) -> LifecycleResult<Validation> {
        let ticket_id = qr::decode_ticket_id(image)?;
        self.validate(ticket_id).await
    }

    pub async fn ticket(&self, ticket_id: i32) -> LifecycleResult<ticket::Model> {
        ticket::Entity::find_by_id(ticket_id)
            .one(self.db)
            .await?
            .ok_or(LifecycleError::TicketNotFound(ticket_id))
    }

    /// A passenger's tickets, newest first
    pub async fn tickets_for(&self, user_id: &str) -> LifecycleResult<Vec<ticket::Model>> {
        Ok(ticket::Entity::find()
            .filter(ticket::Column::UserId.eq(user_id))
            .order_by_desc(ticket::Column::Id)
            .all(self.db)
            .await?)
    }

    /// PNG bytes for a ticket's QR code, regenerating the file if it went missing
    pub async fn qr_artifact(&self, ticket: &ticket::Model) -> LifecycleResult<Vec<u8>> {
        if let Some(path) = &ticket.qr_code_path {
            if let Some(bytes) = self.artifacts.read(path).await? {
                return Ok(bytes);
            }
        }

        tracing::warn!(ticket_id = ticket.id, "QR artifact missing, regenerating");

        let png = qr::encode_png(&TicketPayload::from(ticket))?;
        let path = self.artifacts.write(ticket.id, &png).await?;

        ticket::Entity::update_many()
            .col_expr(
                ticket::Column::QrCodePath,
                Expr::value(path.display().to_string()),
            )
            .filter(ticket::Column::Id.eq(ticket.id))
            .exec(self.db)
            .await?;

        Ok(png)
    }

    pub async fn daily_count(&self, date: NaiveDate) -> LifecycleResult<DailySnapshot> {
        Ok(counters::for_date(self.db, date).await?)
    }

    /// Purge every ticket, counter and QR image. Only proceeds on the exact confirmation text.
    pub async fn reset(&self, confirmation: &str) -> LifecycleResult<ResetSummary> {
        if confirmation != RESET_CONFIRMATION {
            return Err(LifecycleError::ConfirmationMismatch);
        }

        let txn = self.db.begin().await?;
        let tickets = ticket::Entity::delete_many().exec(&txn).await?;
        let counters = daily_passenger_count::Entity::delete_many().exec(&txn).await?;
        txn.commit().await?;

        let purge = self.artifacts.purge().await;

        tracing::info!(
            tickets = tickets.rows_affected,
            counters = counters.rows_affected,
            artifacts = purge.removed,
            artifact_failures = purge.failed,
            "All data reset"
        );

        Ok(ResetSummary {
            tickets_deleted: tickets.rows_affected,
            counters_deleted: counters.rows_affected,
            artifacts_removed: purge.removed,
            artifacts_failed: purge.failed,
        })
    }
}

async fn finish_booking(
    txn: DatabaseTransaction,
    active: ticket::ActiveModel,
    date: NaiveDate,
) -> Result<ticket::Model, DbErr> {
    let ticket = active.update(&txn).await?;
    counters::record_boarding(&txn, date).await?;
    txn.commit().await?;
    Ok(ticket)
}

/// Take the ticket off its booking date's onboard count, at most once per ticket
async fn release<C: ConnectionTrait>(db: &C, ticket: &ticket::Model) -> Result<bool, DbErr> {
    let claimed = ticket::Entity::update_many()
        .col_expr(ticket::Column::IsReleased, Expr::value(true))
        .filter(ticket::Column::Id.eq(ticket.id))
        .filter(ticket::Column::IsReleased.eq(false))
        .exec(db)
        .await?;

    if claimed.rows_affected == 0 {
        return Ok(false);
    }

    counters::release_seat(db, ticket.ticket_date).await
}
