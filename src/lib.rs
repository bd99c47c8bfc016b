pub mod config;
pub mod credentials;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod network;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use credentials::CredentialStore;
use network::Network;
use services::artifacts::ArtifactStore;
use services::lifecycle::TicketLifecycle;
use services::reset::ResetTokens;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub network: Arc<Network>,
    pub credentials: Arc<CredentialStore>,
    pub artifacts: ArtifactStore,
    pub reset_tokens: Arc<ResetTokens>,
}

impl AppState {
    pub fn lifecycle(&self) -> TicketLifecycle<'_> {
        TicketLifecycle::new(
            &self.db,
            &self.network,
            &self.artifacts,
            self.config.proximity_threshold_km,
        )
    }
}
