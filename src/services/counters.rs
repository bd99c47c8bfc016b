//! Daily passenger counters.
//!
//! Every mutation is a single SQL statement keyed by date, so concurrent
//! bookings and releases never lose updates.

use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;

use crate::entities::daily_passenger_count::{self, Column, Entity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub total_passengers: i32,
    pub current_passengers: i32,
}

impl DailySnapshot {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_passengers: 0,
            current_passengers: 0,
        }
    }
}

impl From<daily_passenger_count::Model> for DailySnapshot {
    fn from(m: daily_passenger_count::Model) -> Self {
        Self {
            date: m.date,
            total_passengers: m.total_passengers,
            current_passengers: m.current_passengers,
        }
    }
}

/// Count a new booking: creates the day's row or bumps both counters
pub async fn record_boarding<C: ConnectionTrait>(db: &C, date: NaiveDate) -> Result<(), DbErr> {
    let row = daily_passenger_count::ActiveModel {
        date: Set(date),
        total_passengers: Set(1),
        current_passengers: Set(1),
        ..Default::default()
    };

    Entity::insert(row)
        .on_conflict(
            OnConflict::column(Column::Date)
                .value(
                    Column::TotalPassengers,
                    Expr::col((Entity, Column::TotalPassengers)).add(1),
                )
                .value(
                    Column::CurrentPassengers,
                    Expr::col((Entity, Column::CurrentPassengers)).add(1),
                )
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// Take one passenger off the day's onboard count, never going below zero.
/// Returns whether a row was decremented.
pub async fn release_seat<C: ConnectionTrait>(db: &C, date: NaiveDate) -> Result<bool, DbErr> {
    let result = Entity::update_many()
        .col_expr(
            Column::CurrentPassengers,
            Expr::col(Column::CurrentPassengers).sub(1),
        )
        .filter(Column::Date.eq(date))
        .filter(Column::CurrentPassengers.gt(0))
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

pub async fn for_date<C: ConnectionTrait>(db: &C, date: NaiveDate) -> Result<DailySnapshot, DbErr> {
    Ok(Entity::find()
        .filter(Column::Date.eq(date))
        .one(db)
        .await?
        .map(DailySnapshot::from)
        .unwrap_or_else(|| DailySnapshot::empty(date)))
}
