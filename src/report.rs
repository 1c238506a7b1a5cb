use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{ChannelSummary, PreparedOrder, Segment, SegmentSummary, SegmentedCustomer};
use crate::pipeline::{Cohort, RfmRun};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerTotal<T> {
    pub customer_id: String,
    pub total: T,
}

pub fn summarize_by_channel(orders: &[PreparedOrder]) -> Vec<ChannelSummary> {
    let mut map: HashMap<&str, (HashSet<&str>, usize, u64, f64)> = HashMap::new();

    for order in orders {
        let entry = map.entry(order.order_channel.as_str()).or_default();
        entry.0.insert(order.master_id.as_str());
        entry.1 += 1;
        entry.2 += u64::from(order.order_num_total);
        entry.3 += order.customer_value_total;
    }

    let mut summaries: Vec<ChannelSummary> = map
        .into_iter()
        .map(|(channel, (customers, rows, order_total, value_total))| ChannelSummary {
            order_channel: channel.to_string(),
            customer_count: customers.len(),
            avg_order_num: order_total as f64 / rows as f64,
            avg_customer_value: value_total / rows as f64,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.customer_count
            .cmp(&a.customer_count)
            .then_with(|| a.order_channel.cmp(&b.order_channel))
    });
    summaries
}

fn top_by<T, F>(orders: &[PreparedOrder], limit: usize, value: F) -> Vec<CustomerTotal<T>>
where
    T: Copy + Default + PartialOrd + std::ops::AddAssign,
    F: Fn(&PreparedOrder) -> T,
{
    let mut totals: BTreeMap<&str, T> = BTreeMap::new();
    for order in orders {
        *totals.entry(order.master_id.as_str()).or_default() += value(order);
    }

    let mut ranked: Vec<CustomerTotal<T>> = totals
        .into_iter()
        .map(|(customer_id, total)| CustomerTotal {
            customer_id: customer_id.to_string(),
            total,
        })
        .collect();
    // stable sort keeps ties in identifier order
    ranked.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

/// Customers with the highest summed spend.
pub fn top_customers_by_value(orders: &[PreparedOrder], limit: usize) -> Vec<CustomerTotal<f64>> {
    top_by(orders, limit, |order| order.customer_value_total)
}

/// Customers with the most orders.
pub fn top_customers_by_orders(orders: &[PreparedOrder], limit: usize) -> Vec<CustomerTotal<u64>> {
    top_by(orders, limit, |order| u64::from(order.order_num_total))
}

pub fn summarize_by_segment(customers: &[SegmentedCustomer]) -> Vec<SegmentSummary> {
    let mut map: BTreeMap<Segment, (usize, f64, f64, f64)> = BTreeMap::new();

    for customer in customers {
        let metrics = customer.metrics();
        let entry = map.entry(customer.segment).or_default();
        entry.0 += 1;
        entry.1 += metrics.recency as f64;
        entry.2 += f64::from(metrics.frequency);
        entry.3 += metrics.monetary;
    }

    map.into_iter()
        .map(|(segment, (count, recency, frequency, monetary))| SegmentSummary {
            segment,
            count,
            avg_recency: recency / count as f64,
            avg_frequency: frequency / count as f64,
            avg_monetary: monetary / count as f64,
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct Description {
    pub records: usize,
    pub channels: Vec<ChannelSummary>,
    pub top_by_value: Vec<CustomerTotal<f64>>,
    pub top_by_orders: Vec<CustomerTotal<u64>>,
}

pub fn describe(orders: &[PreparedOrder], limit: usize) -> Description {
    Description {
        records: orders.len(),
        channels: summarize_by_channel(orders),
        top_by_value: top_customers_by_value(orders, limit),
        top_by_orders: top_customers_by_orders(orders, limit),
    }
}

pub fn render_description(description: &Description) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Records: {}", description.records);
    let _ = writeln!(output);
    let _ = writeln!(output, "Customers by order channel:");
    for channel in &description.channels {
        let _ = writeln!(
            output,
            "- {}: {} customers, avg orders {:.3}, avg spend {:.3}",
            channel.order_channel,
            channel.customer_count,
            channel.avg_order_num,
            channel.avg_customer_value
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Top customers by spend:");
    for entry in &description.top_by_value {
        let _ = writeln!(output, "- {}: {:.2}", entry.customer_id, entry.total);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Top customers by orders:");
    for entry in &description.top_by_orders {
        let _ = writeln!(output, "- {}: {}", entry.customer_id, entry.total);
    }

    output
}

pub fn build_report(reference_date: NaiveDate, run: &RfmRun, cohorts: &[Cohort]) -> String {
    let summaries = summarize_by_segment(&run.customers);
    let mut output = String::new();

    let _ = writeln!(output, "# RFM Segmentation Report");
    let _ = writeln!(
        output,
        "Reference date {} across {} scored customers",
        reference_date,
        run.customers.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Segments");

    if summaries.is_empty() {
        let _ = writeln!(output, "No customers were scored.");
    } else {
        let _ = writeln!(output, "| segment | customers | recency | frequency | monetary |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for summary in &summaries {
            let _ = writeln!(
                output,
                "| {} | {} | {:.1} | {:.2} | {:.2} |",
                summary.segment,
                summary.count,
                summary.avg_recency,
                summary.avg_frequency,
                summary.avg_monetary
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohorts");
    if cohorts.is_empty() {
        let _ = writeln!(output, "No cohorts configured.");
    } else {
        for cohort in cohorts {
            let _ = writeln!(
                output,
                "- {}: {} customers",
                cohort.name,
                cohort.customer_ids.len()
            );
        }
    }

    if !run.excluded.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Excluded Customers");
        for excluded in &run.excluded {
            let _ = writeln!(output, "- {}: {}", excluded.customer_id, excluded.reason);
        }
    }

    output
}
