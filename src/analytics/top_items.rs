//! Top-selling menu item ranking.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::analytics::round2;
use crate::models::Order;

/// Name markers for non-food line items excluded from the ranking.
const EXCLUDED_NAME_MARKERS: [&str; 3] = ["gift card", "giftcard", "gift"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemStat {
    pub name: String,
    pub total_quantity: u64,
    pub total_revenue: f64,
    /// Number of distinct orders containing this item, not line entries.
    pub order_count: u64,
}

pub fn is_excluded_item(name: &str) -> bool {
    let lower = name.to_lowercase();
    EXCLUDED_NAME_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

#[derive(Default)]
struct ItemAccumulator {
    total_quantity: u64,
    revenue_minor: i64,
    order_count: u64,
}

/// Rank items by total revenue across all line items, returning up to
/// `limit` entries. Aggregation key is the exact item name; ties keep
/// first-seen order (stable sort), so output is deterministic for a fixed
/// input.
pub fn compute_top_items(orders: &[Order], limit: usize) -> Vec<MenuItemStat> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut names: Vec<&str> = Vec::new();
    let mut stats: Vec<ItemAccumulator> = Vec::new();

    for order in orders {
        let mut seen_in_order: HashSet<usize> = HashSet::new();
        for item in &order.line_items {
            if is_excluded_item(&item.name) {
                continue;
            }

            let idx = *index.entry(item.name.as_str()).or_insert_with(|| {
                names.push(item.name.as_str());
                stats.push(ItemAccumulator::default());
                stats.len() - 1
            });

            let stat = &mut stats[idx];
            stat.total_quantity += item.quantity as u64;
            stat.revenue_minor += item.total_minor;
            if seen_in_order.insert(idx) {
                stat.order_count += 1;
            }
        }
    }

    let mut ranked: Vec<usize> = (0..stats.len()).collect();
    ranked.sort_by(|&a, &b| stats[b].revenue_minor.cmp(&stats[a].revenue_minor));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|idx| MenuItemStat {
            name: names[idx].to_string(),
            total_quantity: stats[idx].total_quantity,
            total_revenue: round2(stats[idx].revenue_minor as f64 / 100.0),
            order_count: stats[idx].order_count,
        })
        .collect()
}
