use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::credentials::Role;
use crate::error::AppResult;
use crate::utils::jwt::create_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub principal: PrincipalInfo,
}

#[derive(Debug, Serialize)]
pub struct PrincipalInfo {
    pub username: String,
    pub role: Role,
}

/// Login as a passenger or manager
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let role = match state.credentials.authenticate(&payload.username, &payload.password) {
        Ok(role) => role,
        Err(e) => {
            tracing::warn!(username = %payload.username, "Failed login attempt");
            return Err(e);
        }
    };

    let token = create_token(
        &payload.username,
        role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    tracing::info!(username = %payload.username, role = ?role, "Logged in");

    Ok(Json(AuthResponse {
        token,
        principal: PrincipalInfo {
            username: payload.username,
            role,
        },
    }))
}
