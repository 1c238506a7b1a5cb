use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use crate::models::{CustomerMetrics, ExcludedCustomer, ExclusionReason, PreparedOrder};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Ordered by customer identifier.
    pub metrics: Vec<CustomerMetrics>,
    pub excluded: Vec<ExcludedCustomer>,
}

#[derive(Default)]
struct CustomerAccumulator {
    last_order_date: Option<NaiveDateTime>,
    order_totals: BTreeSet<u32>,
    monetary: f64,
    order_count: u64,
    categories: Vec<String>,
}

/// Whole days from `last` to `reference`, floored.
pub fn days_between(reference: NaiveDateTime, last: NaiveDateTime) -> i64 {
    (reference - last).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Groups prepared orders by customer and reduces them to recency, frequency
/// and monetary values relative to `reference_date`.
///
/// Frequency is the number of distinct `order_num_total` values among the
/// customer's records. Customers without a usable last order date are
/// reported in `excluded` instead of failing the batch.
pub fn aggregate(orders: &[PreparedOrder], reference_date: NaiveDateTime) -> Aggregation {
    let mut customers: BTreeMap<&str, CustomerAccumulator> = BTreeMap::new();

    for order in orders {
        let entry = customers.entry(order.master_id.as_str()).or_default();
        entry.last_order_date = entry.last_order_date.max(order.last_order_date);
        entry.order_totals.insert(order.order_num_total);
        entry.monetary += order.customer_value_total;
        entry.order_count += u64::from(order.order_num_total);
        for category in &order.categories {
            if !entry.categories.contains(category) {
                entry.categories.push(category.clone());
            }
        }
    }

    let mut aggregation = Aggregation::default();
    for (customer_id, acc) in customers {
        let Some(last_order_date) = acc.last_order_date else {
            log::warn!("rfm: excluding customer {customer_id}: no parseable last order date");
            aggregation.excluded.push(ExcludedCustomer {
                customer_id: customer_id.to_string(),
                reason: ExclusionReason::MissingReferenceDate,
            });
            continue;
        };

        let recency = days_between(reference_date, last_order_date);
        if recency < 0 {
            log::warn!(
                "rfm: excluding customer {customer_id}: last order {last_order_date} is after {reference_date}"
            );
            aggregation.excluded.push(ExcludedCustomer {
                customer_id: customer_id.to_string(),
                reason: ExclusionReason::OrderAfterReferenceDate,
            });
            continue;
        }

        aggregation.metrics.push(CustomerMetrics {
            customer_id: customer_id.to_string(),
            recency,
            frequency: acc.order_totals.len() as u32,
            monetary: acc.monetary,
            order_count: acc.order_count,
            categories: acc.categories,
        });
    }

    log::info!(
        "rfm: aggregated {} customers ({} excluded) from {} records",
        aggregation.metrics.len(),
        aggregation.excluded.len(),
        orders.len()
    );
    aggregation
}
