use std::sync::Arc;

use redis::{AsyncCommands, Client};
use thiserror::Error;
use tokio::sync::Mutex;

/// Fixed-window request limiter backed by Upstash Redis. Optional: when no
/// Redis URL is configured the middleware skips the check entirely.
#[derive(Clone)]
pub struct RateLimiter {
    client: Client,
    connection: Arc<Mutex<Option<redis::aio::MultiplexedConnection>>>,
    requests_per_minute: u32,
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis error: {0}")]
    Redis(String),
}

impl RateLimiter {
    pub fn new(redis_url: &str, requests_per_minute: u32) -> Result<Self, RateLimitError> {
        let client =
            Client::open(redis_url).map_err(|e| RateLimitError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            connection: Arc::new(Mutex::new(None)),
            requests_per_minute,
        })
    }

    async fn get_connection(
        &self,
    ) -> Result<redis::aio::MultiplexedConnection, RateLimitError> {
        let mut conn_guard = self.connection.lock().await;

        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RateLimitError::Connection(e.to_string()))?;

        *conn_guard = Some(conn.clone());
        Ok(conn)
    }

    /// Returns `Ok(true)` when the request is within budget for this client.
    pub async fn check_rate_limit(&self, ip: &str) -> Result<bool, RateLimitError> {
        let key = format!("mealboard:rate:{}", ip);
        let window_seconds: i64 = 60;

        let mut conn = self.get_connection().await?;

        let count: i64 = conn
            .incr(&key, 1)
            .await
            .map_err(|e| RateLimitError::Redis(e.to_string()))?;

        // First hit in the window starts the expiry clock.
        if count == 1 {
            let _: () = conn
                .expire(&key, window_seconds)
                .await
                .map_err(|e| RateLimitError::Redis(e.to_string()))?;
        }

        Ok(count <= self.requests_per_minute as i64)
    }
}
