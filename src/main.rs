use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bus_count_backend::{
    config::Config,
    credentials::CredentialStore,
    db,
    middleware::rate_limit::{create_global_governor, log_request},
    network::Network,
    routes,
    services::{artifacts::ArtifactStore, reset::ResetTokens},
    AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bus_count_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    let network = Network::from_config(
        config
            .load_network()
            .expect("Failed to load fare table and city coordinates"),
    );
    tracing::info!("Loaded {} priced routes", network.routes().len());

    let credentials = CredentialStore::from_config(
        &config
            .load_credentials()
            .expect("Failed to load credentials"),
    )
    .expect("Failed to prepare credentials");
    if credentials.is_empty() {
        tracing::warn!("No accounts configured, every login will be rejected");
    } else {
        tracing::info!("Loaded {} accounts", credentials.len());
    }

    // Connect to database
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    // Run migrations
    db::migrate(&db).await.expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    // Create app state
    let state = AppState {
        db,
        artifacts: ArtifactStore::new(config.artifact_dir.clone()),
        config: config.clone(),
        network: Arc::new(network),
        credentials: Arc::new(credentials),
        reset_tokens: Arc::new(ResetTokens::default()),
    };

    // Create router with middleware
    let app = routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(log_request))
            .layer(TraceLayer::new_for_http())
            .layer(create_global_governor())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
    );

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
