use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{
    compute_customer_cohorts, compute_daily_revenue, compute_kpis, compute_top_items,
    DailyCustomerCohort, DailyRevenuePoint, KpiReport, MenuItemStat,
};
use crate::error::{AppError, AppResult};
use crate::models::{Order, Period};
use crate::routes::{ApiResponse, AppState};
use crate::services::{ComparativeFetch, OrdersFetch, StateFilter};

const DEFAULT_KPI_DAYS: i64 = 30;
const DEFAULT_LISTING_DAYS: i64 = 7;
const DEFAULT_ORDER_LIMIT: usize = 50;
const DEFAULT_TOP_ITEMS: usize = 5;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/locations", get(get_locations))
        .route("/kpis", get(get_kpis))
        .route("/orders", get(get_orders))
        .route("/menu-items", get(get_menu_items))
        .route("/analytics/customers", get(get_customer_analytics))
        .route("/analytics/revenue", get(get_revenue_analytics))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location_id: Option<String>,
    pub limit: Option<usize>,
}

impl RangeQuery {
    /// Resolve the requested window, defaulting to the last `default_days`
    /// days when a bound is absent.
    fn period(&self, default_days: i64) -> AppResult<Period> {
        let fallback = Period::last_days(default_days);
        let start = match &self.start_date {
            Some(raw) => parse_date("startDate", raw)?,
            None => fallback.start,
        };
        let end = match &self.end_date {
            Some(raw) => parse_date("endDate", raw)?,
            None => fallback.end,
        };
        Period::new(start, end)
    }
}

/// Accepts a full RFC3339 timestamp or a bare `YYYY-MM-DD`, which reads as
/// midnight UTC. The dashboard sends full timestamps; the short form keeps
/// hand-written query strings working.
fn parse_date(field: &str, raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid {}: expected an RFC3339 timestamp or YYYY-MM-DD, got {:?}",
                field, raw
            ))
        })
}

// ============ LOCATIONS ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationSummary {
    id: String,
    name: Option<String>,
    status: Option<String>,
    business_name: Option<String>,
    #[serde(rename = "type")]
    location_type: Option<String>,
    address: Option<serde_json::Value>,
}

async fn get_locations(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<LocationSummary>>>> {
    if !state.square.is_configured() {
        return Ok(Json(
            ApiResponse::ok(vec![]).message("Square API token not configured"),
        ));
    }

    match state.square.list_locations().await {
        Ok(locations) => {
            let data = locations
                .into_iter()
                .map(|l| LocationSummary {
                    id: l.id,
                    name: l.name,
                    status: l.status,
                    business_name: l.business_name,
                    location_type: l.location_type,
                    address: l.address,
                })
                .collect();
            Ok(Json(ApiResponse::ok(data)))
        }
        Err(err) => {
            tracing::error!("Square locations fetch failed: {}", err);
            Ok(Json(ApiResponse::failed(
                vec![],
                "Failed to fetch locations",
                err.to_string(),
            )))
        }
    }
}

// ============ KPIS ============

async fn get_kpis(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<ApiResponse<KpiReport>>> {
    let period = query.period(DEFAULT_KPI_DAYS)?;

    match state
        .square
        .fetch_orders_with_previous(
            query.location_id.as_deref(),
            &period,
            StateFilter::CompletedOnly,
        )
        .await
    {
        Ok(ComparativeFetch::Fetched {
            location_id,
            current,
            previous,
        }) => {
            let report = compute_kpis(&current, &previous);
            Ok(Json(
                ApiResponse::ok(report).period(&period).location(location_id),
            ))
        }
        Ok(ComparativeFetch::Unconfigured { reason }) => Ok(Json(
            ApiResponse::ok(KpiReport::zeroed())
                .message(reason)
                .period(&period),
        )),
        Err(err) => {
            tracing::error!("Square KPI fetch failed: {}", err);
            Ok(Json(
                ApiResponse::failed(
                    KpiReport::zeroed(),
                    "Failed to fetch orders from Square",
                    err.to_string(),
                )
                .period(&period),
            ))
        }
    }
}

// ============ ORDERS ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderSummary {
    id: String,
    /// Major currency units.
    amount: f64,
    status: &'static str,
    customer: String,
    created_at: String,
    location: Option<String>,
    items: Vec<ItemSummary>,
}

#[derive(Debug, Serialize)]
struct ItemSummary {
    name: String,
    quantity: u32,
    price: f64,
}

fn summarize_order(order: Order) -> OrderSummary {
    OrderSummary {
        id: order.id,
        amount: order.total_minor as f64 / 100.0,
        status: order.state.as_str(),
        customer: order
            .customer_id
            .unwrap_or_else(|| "Guest".to_string()),
        created_at: order.created_at.to_rfc3339(),
        location: order.location_id,
        items: order
            .line_items
            .into_iter()
            .map(|item| ItemSummary {
                name: item.name,
                quantity: item.quantity,
                price: item.total_minor as f64 / 100.0,
            })
            .collect(),
    }
}

async fn get_orders(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<ApiResponse<Vec<OrderSummary>>>> {
    let period = query.period(DEFAULT_LISTING_DAYS)?;
    let limit = query.limit.unwrap_or(DEFAULT_ORDER_LIMIT);

    match state
        .square
        .fetch_orders(
            query.location_id.as_deref(),
            &period,
            StateFilter::CompletedAndOpen,
        )
        .await
    {
        Ok(OrdersFetch::Fetched { location_id, orders }) => {
            let total_orders = orders.len();
            let data: Vec<OrderSummary> = orders
                .into_iter()
                .take(limit)
                .map(summarize_order)
                .collect();

            let mut response = ApiResponse::ok(data).period(&period).location(location_id);
            response.total_orders = Some(total_orders);
            Ok(Json(response))
        }
        Ok(OrdersFetch::Unconfigured { reason }) => Ok(Json(
            ApiResponse::ok(vec![]).message(reason).period(&period),
        )),
        Err(err) => {
            tracing::error!("Square orders fetch failed: {}", err);
            Ok(Json(
                ApiResponse::failed(vec![], "Failed to fetch orders from Square", err.to_string())
                    .period(&period),
            ))
        }
    }
}

// ============ MENU ITEMS ============

async fn get_menu_items(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<ApiResponse<Vec<MenuItemStat>>>> {
    let period = query.period(DEFAULT_KPI_DAYS)?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_ITEMS);

    match state
        .square
        .fetch_orders(
            query.location_id.as_deref(),
            &period,
            StateFilter::CompletedOnly,
        )
        .await
    {
        Ok(OrdersFetch::Fetched { location_id, orders }) => {
            let data = compute_top_items(&orders, limit);
            Ok(Json(
                ApiResponse::ok(data).period(&period).location(location_id),
            ))
        }
        Ok(OrdersFetch::Unconfigured { reason }) => Ok(Json(
            ApiResponse::ok(vec![]).message(reason).period(&period),
        )),
        Err(err) => {
            tracing::error!("Square menu-items fetch failed: {}", err);
            Ok(Json(
                ApiResponse::failed(vec![], "Failed to fetch orders from Square", err.to_string())
                    .period(&period),
            ))
        }
    }
}

// ============ CUSTOMER ANALYTICS ============

async fn get_customer_analytics(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<ApiResponse<Vec<DailyCustomerCohort>>>> {
    let period = query.period(DEFAULT_KPI_DAYS)?;

    match state
        .square
        .fetch_orders(
            query.location_id.as_deref(),
            &period,
            StateFilter::CompletedOnly,
        )
        .await
    {
        Ok(OrdersFetch::Fetched { location_id, orders }) => {
            let data = compute_customer_cohorts(&orders);
            Ok(Json(
                ApiResponse::ok(data).period(&period).location(location_id),
            ))
        }
        Ok(OrdersFetch::Unconfigured { reason }) => Ok(Json(
            ApiResponse::ok(vec![]).message(reason).period(&period),
        )),
        Err(err) => {
            tracing::error!("Square customer analytics fetch failed: {}", err);
            Ok(Json(
                ApiResponse::failed(vec![], "Failed to fetch orders from Square", err.to_string())
                    .period(&period),
            ))
        }
    }
}

// ============ REVENUE ANALYTICS ============

async fn get_revenue_analytics(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<ApiResponse<Vec<DailyRevenuePoint>>>> {
    let period = query.period(DEFAULT_KPI_DAYS)?;

    match state
        .square
        .fetch_orders(
            query.location_id.as_deref(),
            &period,
            StateFilter::CompletedOnly,
        )
        .await
    {
        Ok(OrdersFetch::Fetched { location_id, orders }) => {
            let data = compute_daily_revenue(&orders);
            Ok(Json(
                ApiResponse::ok(data).period(&period).location(location_id),
            ))
        }
        Ok(OrdersFetch::Unconfigured { reason }) => Ok(Json(
            ApiResponse::ok(vec![]).message(reason).period(&period),
        )),
        Err(err) => {
            tracing::error!("Square revenue analytics fetch failed: {}", err);
            Ok(Json(
                ApiResponse::failed(vec![], "Failed to fetch orders from Square", err.to_string())
                    .period(&period),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: Option<&str>, end: Option<&str>) -> RangeQuery {
        RangeQuery {
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
            location_id: None,
            limit: None,
        }
    }

    #[test]
    fn period_accepts_rfc3339_bounds() {
        let period = query(
            Some("2026-03-01T08:30:00Z"),
            Some("2026-03-08T08:30:00Z"),
        )
        .period(DEFAULT_KPI_DAYS)
        .unwrap();
        assert_eq!(period.duration().num_days(), 7);
    }

    #[test]
    fn period_accepts_bare_dates_as_midnight_utc() {
        let period = query(Some("2026-03-01"), Some("2026-03-08"))
            .period(DEFAULT_KPI_DAYS)
            .unwrap();
        assert_eq!(period.start.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(period.end.to_rfc3339(), "2026-03-08T00:00:00+00:00");
    }

    #[test]
    fn period_rejects_garbage_dates() {
        let err = query(Some("last tuesday"), None)
            .period(DEFAULT_KPI_DAYS)
            .unwrap_err();
        assert!(err.to_string().contains("startDate"));
    }

    #[test]
    fn period_defaults_missing_bounds() {
        let period = query(None, None).period(DEFAULT_KPI_DAYS).unwrap();
        assert_eq!(period.duration().num_days(), DEFAULT_KPI_DAYS);
    }
}
