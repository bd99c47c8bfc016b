use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
    GovernorError, GovernorLayer,
};

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::utils::jwt::Claims;

/// Custom key extractor that keys on the authenticated principal set by auth_middleware
#[derive(Debug, Clone, Copy)]
pub struct PrincipalExtractor;

impl KeyExtractor for PrincipalExtractor {
    type Key = String;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let claims = req
            .extensions()
            .get::<Claims>()
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(claims.sub.clone())
    }
}

pub type RoleGovernorLayer = GovernorLayer<
    PrincipalExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Roles that get a per-principal limiter
/// - Manager: 500 requests per minute (QR scans come in bursts at the door)
/// - Passenger: 100 requests per minute (location pings included)
pub enum RateLimitedRole {
    Passenger,
    Manager,
}

pub fn create_role_governor(role: RateLimitedRole) -> RoleGovernorLayer {
    let (per_ms, burst) = match role {
        RateLimitedRole::Manager => (120, 500),
        RateLimitedRole::Passenger => (600, 100),
    };

    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(PrincipalExtractor)
            .finish()
            .expect("valid role governor config"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}
