use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::counters::DailySnapshot;
use crate::services::lifecycle::{ResetSummary, ValidationOutcome};
use crate::services::reset::RESET_CONFIRMATION;
use crate::utils::jwt::Claims;
use crate::AppState;

// ============ Dashboard ============

/// Today's passenger counters
pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DailySnapshot>> {
    let today = Local::now().date_naive();
    Ok(Json(state.lifecycle().daily_count(today).await?))
}

// ============ Validation ============

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackLevel {
    Success,
    Warning,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub level: FeedbackLevel,
    pub ticket_id: i32,
    pub message: String,
}

fn bad_form(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Invalid form data: {}", e))
}

/// Validate a ticket from an uploaded QR image (`qr_image`) or a typed id (`ticket_id`).
/// The image wins when both are sent.
pub async fn validate_ticket(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ValidationResponse>> {
    let mut image: Option<Vec<u8>> = None;
    let mut typed_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("qr_image") => {
                let bytes = field.bytes().await.map_err(bad_form)?;
                if !bytes.is_empty() {
                    image = Some(bytes.to_vec());
                }
            }
            Some("ticket_id") => {
                let text = field.text().await.map_err(bad_form)?;
                if !text.trim().is_empty() {
                    typed_id = Some(text);
                }
            }
            _ => {}
        }
    }

    let lifecycle = state.lifecycle();
    let validation = match (image, typed_id) {
        (Some(image), _) => lifecycle.validate_scan(&image).await?,
        (None, Some(text)) => {
            let ticket_id = text
                .trim()
                .parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid ticket id: {}", text.trim())))?;
            lifecycle.validate(ticket_id).await?
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "Upload a QR image or enter a ticket id".to_string(),
            ))
        }
    };

    let (level, message) = match validation.outcome {
        ValidationOutcome::Validated => (
            FeedbackLevel::Success,
            format!("Ticket {} validated successfully!", validation.ticket_id),
        ),
        ValidationOutcome::AlreadyValidated => (
            FeedbackLevel::Warning,
            format!("Ticket {} already validated", validation.ticket_id),
        ),
    };

    Ok(Json(ValidationResponse {
        level,
        ticket_id: validation.ticket_id,
        message,
    }))
}

// ============ Reset ============

#[derive(Debug, Serialize)]
pub struct ResetChallenge {
    pub confirmation_token: Uuid,
    pub expires_at: DateTime<Utc>,
    pub prompt: String,
}

/// First step of a reset: hand out a one-shot confirmation token
pub async fn request_reset(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<ResetChallenge> {
    let (confirmation_token, expires_at) = state.reset_tokens.issue();
    tracing::info!(manager = %claims.sub, "Reset confirmation requested");

    Json(ResetChallenge {
        confirmation_token,
        expires_at,
        prompt: format!(
            "This deletes every ticket, counter and QR image. Type {} to proceed.",
            RESET_CONFIRMATION
        ),
    })
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub confirmation_token: Uuid,
    pub confirmation: String,
}

/// Second step of a reset: purge everything if the typed confirmation matches
pub async fn reset(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ResetRequest>,
) -> AppResult<Json<ResetSummary>> {
    if !state.reset_tokens.redeem(payload.confirmation_token) {
        return Err(AppError::BadRequest(
            "Reset confirmation expired or unknown, request a new one".to_string(),
        ));
    }

    let summary = state.lifecycle().reset(&payload.confirmation).await?;
    tracing::warn!(manager = %claims.sub, "All tickets and counters deleted");

    Ok(Json(summary))
}
