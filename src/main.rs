use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mealboard::config::Config;
use mealboard::routes::{create_router, AppState};
use mealboard::services::{AiService, RateLimiter, SquareService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mealboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    if config.is_production() {
        tracing::info!("Using production Square environment");
    } else {
        tracing::info!("Using sandbox Square environment");
    }

    let square = SquareService::new(&config).expect("Failed to initialize Square client");
    if !square.is_configured() {
        tracing::warn!("SQUARE_ACCESS_TOKEN not set - order endpoints will report unconfigured");
    }

    let ai = AiService::new(config.ai_api_key.as_deref(), &config.ai_model);
    if config.ai_api_key.is_none() {
        tracing::warn!("AI_API_KEY not set - chat will use templated fallback replies");
    }

    // Initialize Upstash rate limiter if configured
    let rate_limiter = match &config.upstash_redis_url {
        Some(url) => match RateLimiter::new(url, config.rate_limit_per_minute) {
            Ok(limiter) => {
                tracing::info!("Upstash Redis rate limiter configured");
                Some(limiter)
            }
            Err(e) => {
                tracing::error!("Failed to initialize rate limiter: {} - rate limiting disabled", e);
                None
            }
        },
        None => {
            tracing::warn!("Upstash Redis not configured - rate limiting disabled");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        square,
        ai,
        rate_limiter,
    };

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Dashboard origin: {}", config.frontend_url);

    // ConnectInfo gives the rate limiter the socket peer when no proxy
    // headers are present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
