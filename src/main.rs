//! Entry point: load config, wire dependencies, and run the server.

use std::sync::Arc;

use rally::auth::JwtSecret;
use rally::config::Config;
use rally::repositories::{
    ActivityRepository, MemoryPhotoGateway, MemoryRepository, UserRepository,
};
use rally::{build_dispatcher, create_app, AppState, CommentFanout, Hub};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let repo = Arc::new(MemoryRepository::new());
    let activities: Arc<dyn ActivityRepository> = repo.clone();
    let users: Arc<dyn UserRepository> = repo.clone();
    let photos = Arc::new(MemoryPhotoGateway::new());

    let dispatcher = Arc::new(build_dispatcher(activities, users.clone(), photos)?);
    let hub = Arc::new(Hub::new());
    let fanout = Arc::new(CommentFanout::new(hub.clone()));
    let jwt_secret = JwtSecret::new(config.jwt_secret.clone(), config.token_ttl_days);

    let state = AppState {
        dispatcher,
        hub,
        fanout,
        users,
        jwt_secret,
    };

    let app = create_app(state);

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
