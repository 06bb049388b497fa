pub mod ai;
pub mod rate_limiter;
pub mod square;

pub use ai::AiService;
pub use rate_limiter::RateLimiter;
pub use square::{ComparativeFetch, OrdersFetch, SquareService, StateFilter};
