//! Daily revenue series for the dashboard's trend chart.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::round2;
use crate::models::Order;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRevenuePoint {
    pub date: NaiveDate,
    /// Major currency units.
    pub revenue: f64,
    pub orders: u64,
}

/// Revenue and order count per UTC day, ascending by date. Days without
/// orders are omitted.
pub fn compute_daily_revenue(orders: &[Order]) -> Vec<DailyRevenuePoint> {
    let mut by_day: BTreeMap<NaiveDate, (i64, u64)> = BTreeMap::new();

    for order in orders {
        let entry = by_day.entry(order.created_at.date_naive()).or_default();
        entry.0 += order.total_minor;
        entry.1 += 1;
    }

    by_day
        .into_iter()
        .map(|(date, (revenue_minor, orders))| DailyRevenuePoint {
            date,
            revenue: round2(revenue_minor as f64 / 100.0),
            orders,
        })
        .collect()
}
