pub mod cohorts;
pub mod kpis;
pub mod revenue;
pub mod top_items;

pub use cohorts::{compute_customer_cohorts, DailyCustomerCohort};
pub use kpis::{compute_kpis, CountMetric, KpiReport, Metric};
pub use revenue::{compute_daily_revenue, DailyRevenuePoint};
pub use top_items::{compute_top_items, MenuItemStat};

/// Round to 2 decimal places, half away from zero. Used for money in major
/// units.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 1 decimal place, half away from zero. Used for percentages.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
