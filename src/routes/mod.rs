use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::{auth, manager, passenger, tickets};
use crate::middleware::auth::{auth_middleware, require_manager, require_passenger};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

/// Upper bound for uploaded QR photos
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let passenger_governor = create_role_governor(RateLimitedRole::Passenger);
    let manager_governor = create_role_governor(RateLimitedRole::Manager);
    let public_governor = create_public_governor();

    // Public routes (login, fare table, cities)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/fares", get(passenger::list_fares))
        .route("/fares/quote", get(passenger::quote_fare))
        .route("/cities", get(passenger::list_cities))
        .layer(public_governor);

    // Ticket views (any authenticated principal, ownership checked per ticket)
    let ticket_routes = Router::new()
        .route("/{id}", get(tickets::get_ticket))
        .route("/{id}/qr", get(tickets::get_ticket_qr))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Passenger routes (requires auth + passenger role)
    let passenger_routes = Router::new()
        .route("/tickets", post(passenger::book_ticket))
        .route("/tickets", get(passenger::my_tickets))
        .route("/location", post(passenger::update_location))
        .layer(passenger_governor)
        .layer(middleware::from_fn(require_passenger))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Manager routes (requires auth + manager role)
    let manager_routes = Router::new()
        .route("/dashboard", get(manager::dashboard))
        .route("/validate", post(manager::validate_ticket))
        .route("/reset/request", post(manager::request_reset))
        .route("/reset", post(manager::reset))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(manager_governor)
        .layer(middleware::from_fn(require_manager))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api", public_routes)
        .nest("/api/tickets", ticket_routes)
        .nest("/api/passenger", passenger_routes)
        .nest("/api/manager", manager_routes)
        .with_state(state)
}
