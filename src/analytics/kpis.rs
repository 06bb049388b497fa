//! Period-over-period KPI derivation.
//!
//! Both input sets must already be filtered to their periods and to completed
//! orders; this module only reduces them.

use std::collections::HashMap;

use serde::Serialize;

use crate::analytics::{round1, round2};
use crate::models::Order;

/// Money-valued metric triple in major currency units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub current: f64,
    pub previous: f64,
    pub change: f64,
}

/// Integer-valued metric triple (order counts, customer counts).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountMetric {
    pub current: u64,
    pub previous: u64,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiReport {
    pub revenue: Metric,
    pub orders: CountMetric,
    pub average_order_value: Metric,
    pub customers: CountMetric,
    pub returning_customer_rate: Metric,
}

impl KpiReport {
    /// All-zero report, served when the Square integration is unconfigured.
    pub fn zeroed() -> Self {
        compute_kpis(&[], &[])
    }
}

/// Percentage change vs. the previous value, rounded to 1 decimal.
/// A zero previous value yields 0, never NaN or infinity.
fn change_percent(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        round1((current - previous) / previous * 100.0)
    } else {
        0.0
    }
}

fn revenue_major(orders: &[Order]) -> f64 {
    orders.iter().map(|o| o.total_minor).sum::<i64>() as f64 / 100.0
}

/// Orders per customer id; orders without one do not contribute.
fn orders_by_customer(orders: &[Order]) -> HashMap<&str, u64> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for order in orders {
        if let Some(customer_id) = order.customer_id.as_deref() {
            *counts.entry(customer_id).or_default() += 1;
        }
    }
    counts
}

/// Share of a period's unique customers with strictly more than one order in
/// that same period, as a percentage.
fn returning_rate(by_customer: &HashMap<&str, u64>) -> f64 {
    if by_customer.is_empty() {
        return 0.0;
    }
    let returning = by_customer.values().filter(|&&n| n > 1).count();
    returning as f64 / by_customer.len() as f64 * 100.0
}

pub fn compute_kpis(current: &[Order], previous: &[Order]) -> KpiReport {
    let revenue = revenue_major(current);
    let prev_revenue = revenue_major(previous);

    let order_count = current.len() as u64;
    let prev_order_count = previous.len() as u64;

    let aov = if order_count > 0 {
        revenue / order_count as f64
    } else {
        0.0
    };
    let prev_aov = if prev_order_count > 0 {
        prev_revenue / prev_order_count as f64
    } else {
        0.0
    };

    let by_customer = orders_by_customer(current);
    let prev_by_customer = orders_by_customer(previous);

    let unique_customers = by_customer.len() as u64;
    let prev_unique_customers = prev_by_customer.len() as u64;

    let rate = returning_rate(&by_customer);
    let prev_rate = returning_rate(&prev_by_customer);

    KpiReport {
        revenue: Metric {
            current: round2(revenue),
            previous: round2(prev_revenue),
            change: change_percent(revenue, prev_revenue),
        },
        orders: CountMetric {
            current: order_count,
            previous: prev_order_count,
            change: change_percent(order_count as f64, prev_order_count as f64),
        },
        average_order_value: Metric {
            current: round2(aov),
            previous: round2(prev_aov),
            change: change_percent(aov, prev_aov),
        },
        customers: CountMetric {
            current: unique_customers,
            previous: prev_unique_customers,
            change: change_percent(unique_customers as f64, prev_unique_customers as f64),
        },
        returning_customer_rate: Metric {
            current: round1(rate),
            previous: round1(prev_rate),
            change: change_percent(rate, prev_rate),
        },
    }
}
