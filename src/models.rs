use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::RfmError;

/// One row of the order-history snapshot, as read from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub master_id: String,
    pub order_channel: String,
    pub last_order_channel: String,
    pub first_order_date: Option<String>,
    pub last_order_date: Option<String>,
    pub last_order_date_online: Option<String>,
    pub last_order_date_offline: Option<String>,
    pub order_num_total_ever_online: u32,
    pub order_num_total_ever_offline: u32,
    pub customer_value_total_ever_offline: f64,
    pub customer_value_total_ever_online: f64,
    pub interested_in_categories_12: Vec<String>,
}

/// An order record with totals derived and dates parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedOrder {
    pub master_id: String,
    pub order_channel: String,
    pub last_order_channel: String,
    pub first_order_date: Option<NaiveDateTime>,
    pub last_order_date: Option<NaiveDateTime>,
    pub last_order_date_online: Option<NaiveDateTime>,
    pub last_order_date_offline: Option<NaiveDateTime>,
    pub order_num_total: u32,
    pub customer_value_total: f64,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerMetrics {
    pub customer_id: String,
    pub recency: i64,
    pub frequency: u32,
    pub monetary: f64,
    /// Sum of `order_num_total` across the customer's records.
    pub order_count: u64,
    pub categories: Vec<String>,
}

impl CustomerMetrics {
    pub fn average_order_value(&self) -> Option<f64> {
        if self.order_count == 0 {
            None
        } else {
            Some(self.monetary / self.order_count as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCustomer {
    pub metrics: CustomerMetrics,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
}

impl ScoredCustomer {
    pub fn rf_code(&self) -> String {
        format!("{}{}", self.recency_score, self.frequency_score)
    }

    pub fn rfm_code(&self) -> String {
        format!(
            "{}{}{}",
            self.recency_score, self.frequency_score, self.monetary_score
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedCustomer {
    pub scored: ScoredCustomer,
    pub rf_code: String,
    pub rfm_code: String,
    pub segment: Segment,
}

impl SegmentedCustomer {
    pub fn customer_id(&self) -> &str {
        &self.scored.metrics.customer_id
    }

    pub fn metrics(&self) -> &CustomerMetrics {
        &self.scored.metrics
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Hibernating,
    AtRisk,
    CantLoose,
    AboutToSleep,
    NeedAttention,
    LoyalCustomers,
    Promising,
    NewCustomers,
    PotentialLoyalists,
    Champions,
}

impl Segment {
    pub const ALL: [Segment; 10] = [
        Segment::Hibernating,
        Segment::AtRisk,
        Segment::CantLoose,
        Segment::AboutToSleep,
        Segment::NeedAttention,
        Segment::LoyalCustomers,
        Segment::Promising,
        Segment::NewCustomers,
        Segment::PotentialLoyalists,
        Segment::Champions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Hibernating => "hibernating",
            Segment::AtRisk => "at_risk",
            Segment::CantLoose => "cant_loose",
            Segment::AboutToSleep => "about_to_sleep",
            Segment::NeedAttention => "need_attention",
            Segment::LoyalCustomers => "loyal_customers",
            Segment::Promising => "promising",
            Segment::NewCustomers => "new_customers",
            Segment::PotentialLoyalists => "potential_loyalists",
            Segment::Champions => "champions",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = RfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Segment::ALL
            .into_iter()
            .find(|segment| segment.as_str() == s)
            .ok_or_else(|| RfmError::UnknownSegment(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Recency => "recency",
            Metric::Frequency => "frequency",
            Metric::Monetary => "monetary",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    MissingReferenceDate,
    OrderAfterReferenceDate,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::MissingReferenceDate => f.write_str("no parseable last order date"),
            ExclusionReason::OrderAfterReferenceDate => {
                f.write_str("last order date is after the reference date")
            }
        }
    }
}

/// A customer left out of scoring because its recency could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedCustomer {
    pub customer_id: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub order_channel: String,
    pub customer_count: usize,
    pub avg_order_num: f64,
    pub avg_customer_value: f64,
}

#[derive(Debug, Clone)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub count: usize,
    pub avg_recency: f64,
    pub avg_frequency: f64,
    pub avg_monetary: f64,
}
