//! Meetboard server.
//!
//! Receives meeting webhooks and pushes live status updates to SSE clients.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin meetboard-server
//! cargo run --bin meetboard-server -- --host 0.0.0.0 --port 3000 --webhook-secret <secret>
//! ```

use std::sync::Arc;

use meetboard_server::{
    config::{ServerConfig, StoreKind},
    domain::MeetingRepository,
    infrastructure::{
        broadcaster::SseBroadcaster,
        repository::{InMemoryMeetingRepository, RedisMeetingRepository},
    },
    ui::{AppState, Server},
    usecase::MeetingService,
};
use meetboard_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);
    tracing::debug!(?config, "Loaded configuration");

    // Initialize dependencies in order:
    // 1. Repository
    // 2. Broadcaster
    // 3. MeetingService (+ subscribers)
    // 4. AppState
    // 5. Server

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 1. Create Repository
    let repository: Arc<dyn MeetingRepository> = match config.store {
        StoreKind::Memory => {
            tracing::info!("Using in-memory meeting store");
            Arc::new(InMemoryMeetingRepository::new())
        }
        StoreKind::Redis => match RedisMeetingRepository::connect(&config.redis_url).await {
            Ok(repository) => {
                tracing::info!("Using redis meeting store");
                Arc::new(repository)
            }
            Err(e) => {
                tracing::error!("Failed to connect to redis: {}", e);
                std::process::exit(1);
            }
        },
    };

    // 2. Create Broadcaster
    let broadcaster = Arc::new(SseBroadcaster::new(
        repository.clone(),
        clock.clone(),
        config.broadcaster_config(),
    ));

    // 3. Create MeetingService and register subscribers
    let mut meeting_service = MeetingService::new(repository, clock.clone());
    meeting_service.register_update_callback(broadcaster.clone());

    // 4. Create AppState
    let verifier = config.signature_verifier();
    if !verifier.is_enabled() {
        tracing::warn!("No webhook secret configured, signature verification is disabled");
    } else {
        tracing::info!(mode = ?verifier.mode(), "Webhook signature verification enabled");
    }
    let state = AppState {
        meeting_service: Arc::new(meeting_service),
        broadcaster,
        verifier,
        clock,
    };

    // 5. Create and run the server
    let server = Server::new(state, config.shutdown_grace);
    if let Err(e) = server.run(&config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
