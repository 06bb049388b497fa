//! End-to-end aggregation over one fixture week of orders: the same order
//! set feeds the KPI, top-items and cohort reductions, and the results must
//! stay mutually consistent.

use chrono::{TimeZone, Utc};

use mealboard::analytics::{
    compute_customer_cohorts, compute_daily_revenue, compute_kpis, compute_top_items,
};
use mealboard::models::{LineItem, Order, OrderState};

fn item(name: &str, quantity: u32, total_minor: i64) -> LineItem {
    LineItem {
        name: name.to_string(),
        quantity,
        unit_price_minor: total_minor / quantity.max(1) as i64,
        total_minor,
        catalog_object_id: None,
    }
}

fn order(id: &str, customer: Option<&str>, day: u32, items: Vec<LineItem>) -> Order {
    Order {
        id: id.to_string(),
        created_at: Utc.with_ymd_and_hms(2026, 3, day, 13, 0, 0).unwrap(),
        state: OrderState::Completed,
        customer_id: customer.map(str::to_string),
        location_id: Some("L1".to_string()),
        total_minor: items.iter().map(|i| i.total_minor).sum(),
        line_items: items,
    }
}

/// One week of completed orders: three known customers (alice returns twice,
/// bob once, cara once), one anonymous walk-in, and a gift card sale.
fn fixture_week() -> Vec<Order> {
    vec![
        order(
            "o1",
            Some("alice"),
            9,
            vec![item("Signature Burger", 1, 1550), item("Fries", 1, 450)],
        ),
        order(
            "o2",
            Some("bob"),
            9,
            vec![item("Chicken Wings", 2, 2400)],
        ),
        order(
            "o3",
            Some("alice"),
            10,
            vec![item("Caesar Salad", 1, 1200), item("Fries", 2, 900)],
        ),
        order(
            "o4",
            None,
            10,
            vec![item("Signature Burger", 2, 3100)],
        ),
        order(
            "o5",
            Some("cara"),
            12,
            vec![
                item("$50 Gift Card", 1, 5000),
                item("Chicken Wings", 1, 1200),
            ],
        ),
        order(
            "o6",
            Some("alice"),
            12,
            vec![item("Signature Burger", 1, 1550)],
        ),
    ]
}

fn previous_week() -> Vec<Order> {
    vec![
        order("p1", Some("bob"), 2, vec![item("Fries", 1, 450)]),
        order(
            "p2",
            Some("dave"),
            3,
            vec![item("Signature Burger", 1, 1550)],
        ),
    ]
}

#[test]
fn kpis_match_the_fixture() {
    let current = fixture_week();
    let previous = previous_week();
    let report = compute_kpis(&current, &previous);

    // 2000 + 2400 + 2100 + 3100 + 6200 + 1550 cents
    assert_eq!(report.revenue.current, 173.5);
    assert_eq!(report.revenue.previous, 20.0);
    assert_eq!(report.revenue.change, 767.5);

    assert_eq!(report.orders.current, 6);
    assert_eq!(report.orders.previous, 2);

    assert_eq!(report.customers.current, 3);
    assert_eq!(report.customers.previous, 2);

    // alice has 3 orders, bob and cara 1 each.
    assert!((report.returning_customer_rate.current - 33.3).abs() < 0.05);
    assert!(report.returning_customer_rate.current >= 0.0);
    assert!(report.returning_customer_rate.current <= 100.0);

    // AOV reconstructs revenue within rounding tolerance.
    let reconstructed = report.average_order_value.current * report.orders.current as f64;
    assert!((reconstructed - report.revenue.current).abs() < 0.05);

    assert!(report.customers.current <= report.orders.current);
}

#[test]
fn top_items_exclude_gift_cards_and_conserve_quantity() {
    let current = fixture_week();
    let top = compute_top_items(&current, 10);

    assert!(top.iter().all(|stat| !stat.name.to_lowercase().contains("gift")));

    // Burger: o1 + o4 + o6 = 4 units, 6200c. Wings: o2 + o5 = 3 units, 3600c.
    assert_eq!(top[0].name, "Signature Burger");
    assert_eq!(top[0].total_quantity, 4);
    assert_eq!(top[0].total_revenue, 62.0);
    assert_eq!(top[0].order_count, 3);

    assert_eq!(top[1].name, "Chicken Wings");
    assert_eq!(top[1].total_revenue, 36.0);

    // Quantity conservation: with limit >= distinct items, returned quantity
    // equals the sum over non-excluded lines.
    let expected: u64 = current
        .iter()
        .flat_map(|o| &o.line_items)
        .filter(|i| !i.name.to_lowercase().contains("gift"))
        .map(|i| i.quantity as u64)
        .sum();
    let returned: u64 = top.iter().map(|s| s.total_quantity).sum();
    assert_eq!(returned, expected);

    // A smaller limit never returns more quantity than exists.
    let truncated: u64 = compute_top_items(&current, 2)
        .iter()
        .map(|s| s.total_quantity)
        .sum();
    assert!(truncated <= expected);
}

#[test]
fn cohorts_balance_and_agree_with_daily_revenue_days() {
    let current = fixture_week();
    let cohorts = compute_customer_cohorts(&current);

    // Day 9: alice + bob new. Day 10: alice returning (o4 is anonymous).
    // Day 12: cara new, alice returning.
    assert_eq!(cohorts.len(), 3);
    assert_eq!(cohorts[0].new_customers, 2);
    assert_eq!(cohorts[0].returning_customers, 0);
    assert_eq!(cohorts[1].new_customers, 0);
    assert_eq!(cohorts[1].returning_customers, 1);
    assert_eq!(cohorts[2].new_customers, 1);
    assert_eq!(cohorts[2].returning_customers, 1);

    for cohort in &cohorts {
        assert_eq!(
            cohort.new_customers + cohort.returning_customers,
            cohort.total_customers
        );
    }

    // Dates ascend.
    for pair in cohorts.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }

    // Every cohort day carries revenue; revenue may cover more days because
    // anonymous orders count toward revenue but not cohorts.
    let revenue = compute_daily_revenue(&current);
    let revenue_days: Vec<_> = revenue.iter().map(|p| p.date).collect();
    for cohort in &cohorts {
        assert!(revenue_days.contains(&cohort.date));
    }
    let total: f64 = revenue.iter().map(|p| p.revenue).sum();
    assert!((total - 173.5).abs() < 0.001);
}

#[test]
fn kpi_report_serializes_with_dashboard_field_names() {
    let report = compute_kpis(&fixture_week(), &previous_week());
    let json = serde_json::to_value(&report).unwrap();

    assert!(json.get("averageOrderValue").is_some());
    assert!(json.get("returningCustomerRate").is_some());
    assert!(json["revenue"].get("current").is_some());
    assert!(json["revenue"].get("change").is_some());
}
