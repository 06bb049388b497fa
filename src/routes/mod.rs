pub mod ai;
pub mod square;

use axum::extract::State;
use axum::http::HeaderValue;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::rate_limit_middleware;
use crate::models::Period;
use crate::services::{AiService, RateLimiter, SquareService};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub square: SquareService,
    pub ai: AiService,
    pub rate_limiter: Option<RateLimiter>,
}

/// JSON envelope shared by every endpoint, matching what the dashboard
/// frontend consumes. `success: false` always carries an `error`; an
/// unconfigured integration stays `success: true` with a `message` so the
/// UI can render an explained empty state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<PeriodEcho>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_orders: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodEcho {
    pub start_date: String,
    pub end_date: String,
}

impl From<&Period> for PeriodEcho {
    fn from(period: &Period) -> Self {
        Self {
            start_date: period.start.to_rfc3339(),
            end_date: period.end.to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            error: None,
            period: None,
            location_id: None,
            total_orders: None,
        }
    }

    pub fn failed(data: T, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn period(mut self, period: &Period) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    // Restrict CORS to the dashboard origin when it parses; otherwise stay
    // permissive so a misconfigured origin doesn't take the API down.
    let cors = match state.config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => CorsLayer::permissive(),
    };

    Router::new()
        .route("/health", get(health))
        .nest("/api/square", square::routes())
        .nest("/api/ai", ai::routes())
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.square_environment,
    }))
}
