use std::env;

/// Placeholder value shipped in .env.example; treated the same as an unset token.
const TOKEN_PLACEHOLDER: &str = "your_square_access_token_here";

#[derive(Clone)]
pub struct Config {
    pub square_access_token: Option<String>,
    pub square_environment: String,
    pub square_location_id: Option<String>,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub frontend_url: String,
    pub port: u16,
    pub upstash_redis_url: Option<String>,
    pub rate_limit_per_minute: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            square_access_token: non_empty("SQUARE_ACCESS_TOKEN")
                .filter(|token| token != TOKEN_PLACEHOLDER),
            square_environment: env::var("SQUARE_ENVIRONMENT")
                .unwrap_or_else(|_| "sandbox".to_string()),
            square_location_id: non_empty("SQUARE_LOCATION_ID"),
            ai_api_key: non_empty("AI_API_KEY"),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            upstash_redis_url: non_empty("UPSTASH_REDIS_URL"),
            rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
        }
    }

    pub fn is_production(&self) -> bool {
        self.square_environment == "production"
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
