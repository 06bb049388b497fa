use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Order, Period, SquareOrder};

const SQUARE_VERSION: &str = "2023-10-18";
const PAGE_SIZE: u32 = 500;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_MS: u64 = 250;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct SquareService {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    location_id: Option<String>,
}

/// Order-state policy for a search. KPI math uses completed orders only;
/// order listings also show open (not yet completed) orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    CompletedOnly,
    CompletedAndOpen,
}

impl StateFilter {
    fn states(&self) -> &'static [&'static str] {
        match self {
            StateFilter::CompletedOnly => &["COMPLETED"],
            StateFilter::CompletedAndOpen => &["COMPLETED", "OPEN"],
        }
    }
}

/// Outcome of an order fetch. `Unconfigured` (no token, no resolvable
/// location) is not an error: the dashboard renders an empty state with an
/// explanation. Remote failures are `Err` and never masquerade as zero data.
#[derive(Debug)]
pub enum OrdersFetch {
    Fetched {
        location_id: String,
        orders: Vec<Order>,
    },
    Unconfigured {
        reason: String,
    },
}

/// Like [`OrdersFetch`] but carrying the immediately-preceding period of
/// equal length for comparison.
#[derive(Debug)]
pub enum ComparativeFetch {
    Fetched {
        location_id: String,
        current: Vec<Order>,
        previous: Vec<Order>,
    },
    Unconfigured {
        reason: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquareLocation {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub business_name: Option<String>,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
    pub address: Option<serde_json::Value>,
}

// ============ WIRE TYPES ============

#[derive(Debug, Serialize)]
struct SearchOrdersRequest {
    location_ids: Vec<String>,
    query: SearchQuery,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchQuery {
    filter: SearchFilter,
    sort: SearchSort,
}

#[derive(Debug, Serialize)]
struct SearchFilter {
    date_time_filter: DateTimeFilter,
    state_filter: WireStateFilter,
}

#[derive(Debug, Serialize)]
struct DateTimeFilter {
    created_at: TimeRange,
}

#[derive(Debug, Serialize)]
struct TimeRange {
    start_at: String,
    end_at: String,
}

#[derive(Debug, Serialize)]
struct WireStateFilter {
    states: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SearchSort {
    sort_field: &'static str,
    sort_order: &'static str,
}

#[derive(Debug, Deserialize)]
struct SearchOrdersResponse {
    #[serde(default)]
    orders: Vec<SquareOrder>,
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListLocationsResponse {
    #[serde(default)]
    locations: Vec<SquareLocation>,
}

enum RequestFailure {
    /// Network error, 429 or 5xx: worth another attempt.
    Retryable(String),
    /// 4xx or an unparsable body: retrying cannot help.
    Permanent(String),
}

impl SquareService {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = if config.is_production() {
            "https://connect.squareup.com"
        } else {
            "https://connect.squareupsandbox.com"
        }
        .to_string();

        Ok(Self {
            client,
            base_url,
            access_token: config.square_access_token.clone(),
            location_id: config.square_location_id.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.access_token.is_some()
    }

    pub async fn list_locations(&self) -> AppResult<Vec<SquareLocation>> {
        let token = self.require_token()?;
        let response: ListLocationsResponse = self
            .request_json(token, Method::GET, "/v2/locations", None)
            .await?;
        Ok(response.locations)
    }

    /// Fetch all orders in `period` for the requested (or resolved) location.
    pub async fn fetch_orders(
        &self,
        requested_location: Option<&str>,
        period: &Period,
        filter: StateFilter,
    ) -> AppResult<OrdersFetch> {
        let Some(token) = self.access_token.as_deref() else {
            return Ok(OrdersFetch::Unconfigured {
                reason: "Square API token not configured".to_string(),
            });
        };

        let location_id = match self.resolve_location(requested_location).await? {
            Some(id) => id,
            None => {
                return Ok(OrdersFetch::Unconfigured {
                    reason: "No Square location found".to_string(),
                })
            }
        };

        let orders = self.search_orders(token, &location_id, period, filter).await?;
        Ok(OrdersFetch::Fetched { location_id, orders })
    }

    /// Fetch `period` and its immediately-preceding period of equal length.
    /// The two queries are independent, so they run concurrently.
    pub async fn fetch_orders_with_previous(
        &self,
        requested_location: Option<&str>,
        period: &Period,
        filter: StateFilter,
    ) -> AppResult<ComparativeFetch> {
        let Some(token) = self.access_token.as_deref() else {
            return Ok(ComparativeFetch::Unconfigured {
                reason: "Square API token not configured".to_string(),
            });
        };

        let location_id = match self.resolve_location(requested_location).await? {
            Some(id) => id,
            None => {
                return Ok(ComparativeFetch::Unconfigured {
                    reason: "No Square location found".to_string(),
                })
            }
        };

        let previous_period = period.previous();
        let (current, previous) = tokio::join!(
            self.search_orders(token, &location_id, period, filter),
            self.search_orders(token, &location_id, &previous_period, filter),
        );

        Ok(ComparativeFetch::Fetched {
            location_id,
            current: current?,
            previous: previous?,
        })
    }

    /// Explicit location wins; otherwise the first ACTIVE location from the
    /// remote listing, else the first listed at all.
    async fn resolve_location(&self, requested: Option<&str>) -> AppResult<Option<String>> {
        if let Some(id) = requested {
            return Ok(Some(id.to_string()));
        }
        if let Some(id) = &self.location_id {
            return Ok(Some(id.clone()));
        }

        let locations = self.list_locations().await?;
        Ok(locations
            .iter()
            .find(|l| l.status.as_deref() == Some("ACTIVE"))
            .or_else(|| locations.first())
            .map(|l| l.id.clone()))
    }

    /// Pages through the orders-search endpoint until no continuation cursor
    /// is returned. Aggregations are only correct over the complete set, so
    /// a failure mid-loop discards the partial accumulation and fails the
    /// whole call.
    async fn search_orders(
        &self,
        token: &str,
        location_id: &str,
        period: &Period,
        filter: StateFilter,
    ) -> AppResult<Vec<Order>> {
        let mut orders: Vec<Order> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = SearchOrdersRequest {
                location_ids: vec![location_id.to_string()],
                query: SearchQuery {
                    filter: SearchFilter {
                        date_time_filter: DateTimeFilter {
                            created_at: TimeRange {
                                start_at: period.start.to_rfc3339(),
                                end_at: period.end.to_rfc3339(),
                            },
                        },
                        state_filter: WireStateFilter {
                            states: filter.states().iter().map(|s| s.to_string()).collect(),
                        },
                    },
                    sort: SearchSort {
                        sort_field: "CREATED_AT",
                        sort_order: "DESC",
                    },
                },
                limit: PAGE_SIZE,
                cursor: cursor.take(),
            };
            let body = serde_json::to_value(&request)
                .map_err(|e| AppError::Internal(format!("Failed to encode search request: {}", e)))?;

            let page: SearchOrdersResponse = self
                .request_json(token, Method::POST, "/v2/orders/search", Some(&body))
                .await?;

            tracing::debug!(
                "Square returned {} orders for location {} in this batch",
                page.orders.len(),
                location_id
            );
            orders.extend(page.orders.into_iter().filter_map(Order::from_wire));

            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(orders)
    }

    fn require_token(&self) -> AppResult<&str> {
        self.access_token.as_deref().ok_or_else(|| {
            AppError::ExternalService("Square API token not configured".to_string())
        })
    }

    /// One logical request with bounded retry and exponential backoff around
    /// transient failures.
    async fn request_json<T: DeserializeOwned>(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> AppResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.execute(token, method.clone(), &url, body).await {
                Ok(value) => return Ok(value),
                Err(RequestFailure::Retryable(reason)) if attempt < MAX_ATTEMPTS => {
                    let delay = Duration::from_millis(RETRY_BASE_MS << (attempt - 1));
                    tracing::warn!(
                        "Square request to {} failed (attempt {}/{}): {} - retrying in {:?}",
                        url,
                        attempt,
                        MAX_ATTEMPTS,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(RequestFailure::Retryable(reason)) => {
                    return Err(AppError::ExternalService(format!(
                        "Square API error after {} attempts: {}",
                        MAX_ATTEMPTS, reason
                    )))
                }
                Err(RequestFailure::Permanent(reason)) => {
                    return Err(AppError::ExternalService(reason))
                }
            }
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        token: &str,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, RequestFailure> {
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header("Square-Version", SQUARE_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RequestFailure::Retryable(format!("request error: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                RequestFailure::Permanent(format!("Failed to parse Square response: {}", e))
            });
        }

        let detail = response.text().await.unwrap_or_default();
        let reason = format!("Square API error {}: {}", status, detail);
        if status.is_server_error() || status.as_u16() == 429 {
            Err(RequestFailure::Retryable(reason))
        } else {
            Err(RequestFailure::Permanent(reason))
        }
    }
}
