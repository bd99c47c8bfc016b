use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Serialize;

use crate::entities::ticket;
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: i32,
    pub user_id: String,
    pub from_location: String,
    pub to_location: String,
    pub fare: f64,
    pub ticket_date: NaiveDate,
    pub is_validated: bool,
    pub is_active: bool,
    pub is_arrived: bool,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub qr_url: String,
}

impl From<ticket::Model> for TicketResponse {
    fn from(t: ticket::Model) -> Self {
        Self {
            qr_url: format!("/api/tickets/{}/qr", t.id),
            id: t.id,
            user_id: t.user_id,
            from_location: t.from_location,
            to_location: t.to_location,
            fare: t.fare,
            ticket_date: t.ticket_date,
            is_validated: t.is_validated,
            is_active: t.is_active,
            is_arrived: t.is_arrived,
            current_latitude: t.current_latitude,
            current_longitude: t.current_longitude,
        }
    }
}

async fn visible_ticket(state: &AppState, claims: &Claims, ticket_id: i32) -> AppResult<ticket::Model> {
    let ticket = state.lifecycle().ticket(ticket_id).await?;

    if !claims.can_view(&ticket) {
        return Err(AppError::Forbidden(
            "You can only view your own tickets".to_string(),
        ));
    }

    Ok(ticket)
}

/// View a ticket
pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ticket_id): Path<i32>,
) -> AppResult<Json<TicketResponse>> {
    let ticket = visible_ticket(&state, &claims, ticket_id).await?;
    Ok(Json(ticket.into()))
}

/// Serve the ticket's QR code image
pub async fn get_ticket_qr(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ticket_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let ticket = visible_ticket(&state, &claims, ticket_id).await?;
    let png = state.lifecycle().qr_artifact(&ticket).await?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
