use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::tickets::TicketResponse;
use crate::network::{City, FareRule};
use crate::services::lifecycle::LocationStatus;
use crate::utils::jwt::Claims;
use crate::AppState;

// ============ Fares & Cities ============

/// List every priced route
pub async fn list_fares(State(state): State<AppState>) -> Json<Vec<FareRule>> {
    Json(state.network.routes().to_vec())
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub from: String,
    pub to: String,
}

/// Price a route before booking
pub async fn quote_fare(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> AppResult<Json<FareRule>> {
    let fare = state.lifecycle().quote(&query.from, &query.to)?;

    Ok(Json(FareRule {
        from: query.from,
        to: query.to,
        fare,
    }))
}

/// List all cities
pub async fn list_cities(State(state): State<AppState>) -> Json<Vec<City>> {
    Json(state.network.cities())
}

// ============ Tickets ============

#[derive(Debug, Deserialize)]
pub struct BookTicketRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct BookTicketResponse {
    pub ticket_id: i32,
    pub fare: f64,
    pub ticket_date: NaiveDate,
    pub view_url: String,
    pub qr_url: String,
    pub message: String,
}

/// Book a ticket for the logged-in passenger
pub async fn book_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BookTicketRequest>,
) -> AppResult<Json<BookTicketResponse>> {
    let today = Local::now().date_naive();
    let ticket = state
        .lifecycle()
        .book(&claims.sub, &payload.from, &payload.to, today)
        .await?;

    Ok(Json(BookTicketResponse {
        ticket_id: ticket.id,
        fare: ticket.fare,
        ticket_date: ticket.ticket_date,
        view_url: format!("/api/tickets/{}", ticket.id),
        qr_url: format!("/api/tickets/{}/qr", ticket.id),
        message: format!("Ticket booked successfully! Ticket ID: {}", ticket.id),
    }))
}

/// List the logged-in passenger's tickets
pub async fn my_tickets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<TicketResponse>>> {
    let tickets = state.lifecycle().tickets_for(&claims.sub).await?;
    Ok(Json(tickets.into_iter().map(TicketResponse::from).collect()))
}

// ============ Location ============

/// Both fields optional so a missing coordinate is a 400, not a body rejection
#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub ticket_id: i32,
    pub status: LocationStatus,
    pub distance_km: f64,
    pub message: String,
}

/// Report the passenger's current position
pub async fn update_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LocationRequest>,
) -> AppResult<Json<LocationResponse>> {
    let update = state
        .lifecycle()
        .update_location(&claims.sub, payload.latitude, payload.longitude)
        .await?;

    let message = match update.status {
        LocationStatus::Arrived => "You have arrived at your destination".to_string(),
        LocationStatus::Tracking => {
            format!("{:.2} km from your destination", update.distance_km)
        }
    };

    Ok(Json(LocationResponse {
        ticket_id: update.ticket_id,
        status: update.status,
        distance_km: update.distance_km,
        message,
    }))
}
