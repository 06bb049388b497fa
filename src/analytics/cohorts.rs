//! Daily new-vs-returning customer cohorts.
//!
//! Day bucketing truncates `created_at` to the UTC calendar date. "New" on a
//! given day means the customer's first order anywhere in the fetched set
//! falls on that day, so classification is only meaningful over the complete
//! order set for the period.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Order;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCustomerCohort {
    pub date: NaiveDate,
    pub new_customers: u32,
    pub returning_customers: u32,
    pub total_customers: u32,
}

/// One record per UTC day with at least one qualifying order, ascending by
/// date. Days without orders are omitted, not zero-filled. Orders without a
/// customer id do not qualify.
pub fn compute_customer_cohorts(orders: &[Order]) -> Vec<DailyCustomerCohort> {
    let mut first_order_date: HashMap<&str, NaiveDate> = HashMap::new();
    let mut customers_by_day: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();

    for order in orders {
        let Some(customer_id) = order.customer_id.as_deref() else {
            continue;
        };
        let day = order.created_at.date_naive();

        // Input ordering is not guaranteed, so track the minimum.
        first_order_date
            .entry(customer_id)
            .and_modify(|first| {
                if day < *first {
                    *first = day;
                }
            })
            .or_insert(day);

        customers_by_day.entry(day).or_default().insert(customer_id);
    }

    customers_by_day
        .into_iter()
        .map(|(date, customers)| {
            let new_customers = customers
                .iter()
                .filter(|id| first_order_date[*id] == date)
                .count() as u32;
            let total_customers = customers.len() as u32;

            DailyCustomerCohort {
                date,
                new_customers,
                returning_customers: total_customers - new_customers,
                total_customers,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::models::OrderState;

    fn order(id: &str, customer: Option<&str>, day: u32, hour: u32) -> Order {
        Order {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap(),
            state: OrderState::Completed,
            customer_id: customer.map(str::to_string),
            location_id: None,
            total_minor: 1000,
            line_items: vec![],
        }
    }

    #[test]
    fn classifies_new_and_returning_per_day() {
        // A orders on D1 and D2, B only on D2.
        let orders = vec![
            order("o1", Some("A"), 1, 12),
            order("o2", Some("A"), 2, 9),
            order("o3", Some("B"), 2, 10),
        ];

        let cohorts = compute_customer_cohorts(&orders);
        assert_eq!(cohorts.len(), 2);

        assert_eq!(cohorts[0].date.to_string(), "2026-03-01");
        assert_eq!(cohorts[0].new_customers, 1);
        assert_eq!(cohorts[0].returning_customers, 0);
        assert_eq!(cohorts[0].total_customers, 1);

        assert_eq!(cohorts[1].date.to_string(), "2026-03-02");
        assert_eq!(cohorts[1].new_customers, 1);
        assert_eq!(cohorts[1].returning_customers, 1);
        assert_eq!(cohorts[1].total_customers, 2);
    }

    #[test]
    fn first_order_date_ignores_input_ordering() {
        // Later order appears first in the slice.
        let orders = vec![
            order("o2", Some("A"), 5, 12),
            order("o1", Some("A"), 2, 12),
        ];

        let cohorts = compute_customer_cohorts(&orders);
        assert_eq!(cohorts[0].date.to_string(), "2026-03-02");
        assert_eq!(cohorts[0].new_customers, 1);
        assert_eq!(cohorts[1].new_customers, 0);
        assert_eq!(cohorts[1].returning_customers, 1);
    }

    #[test]
    fn same_day_repeat_orders_stay_new() {
        let orders = vec![
            order("o1", Some("A"), 3, 9),
            order("o2", Some("A"), 3, 20),
        ];

        let cohorts = compute_customer_cohorts(&orders);
        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].new_customers, 1);
        assert_eq!(cohorts[0].returning_customers, 0);
        assert_eq!(cohorts[0].total_customers, 1);
    }

    #[test]
    fn anonymous_orders_are_skipped_and_empty_days_omitted() {
        let orders = vec![
            order("o1", None, 1, 12),
            order("o2", Some("A"), 4, 12),
        ];

        let cohorts = compute_customer_cohorts(&orders);
        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].date.to_string(), "2026-03-04");
    }

    #[test]
    fn totals_always_balance() {
        let orders = vec![
            order("o1", Some("A"), 1, 1),
            order("o2", Some("B"), 1, 2),
            order("o3", Some("A"), 2, 3),
            order("o4", Some("C"), 2, 4),
            order("o5", Some("B"), 3, 5),
        ];

        for cohort in compute_customer_cohorts(&orders) {
            assert_eq!(
                cohort.new_customers + cohort.returning_customers,
                cohort.total_customers
            );
        }
    }
}
