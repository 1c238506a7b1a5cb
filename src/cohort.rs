use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{RfmError, RfmResult};
use crate::models::{CustomerMetrics, Segment, SegmentedCustomer};

pub const WOMEN_CATEGORY: &str = "KADIN";
pub const MEN_CATEGORY: &str = "ERKEK";
pub const CHILDREN_CATEGORY: &str = "COCUK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMatch {
    /// A category matches when it contains the token, as the source data's
    /// composite categories (e.g. `AKTIFCOCUK`) are meant to.
    #[default]
    Substring,
    Exact,
}

/// Passes when any of the customer's categories matches any token.
/// Comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPredicate {
    pub any_of: Vec<String>,
    #[serde(default)]
    pub matching: CategoryMatch,
}

impl CategoryPredicate {
    pub fn any_of(tokens: &[&str]) -> Self {
        Self {
            any_of: tokens.iter().map(|token| token.to_string()).collect(),
            matching: CategoryMatch::Substring,
        }
    }

    pub fn matches(&self, categories: &[String]) -> bool {
        categories.iter().any(|category| {
            self.any_of.iter().any(|token| match self.matching {
                CategoryMatch::Substring => category.contains(token.as_str()),
                CategoryMatch::Exact => category == token,
            })
        })
    }
}

/// A named customer selection for one marketing action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSpec {
    pub name: String,
    pub segments: Vec<Segment>,
    pub categories: CategoryPredicate,
    /// Minimum spend per order. Unset means no spend filter.
    #[serde(default)]
    pub min_average_order_value: Option<f64>,
}

impl CohortSpec {
    /// Loyal customers interested in women's products, for a new brand launch.
    pub fn new_brand_targets() -> Self {
        Self {
            name: "new_brand_target_customer_ids".to_string(),
            segments: vec![Segment::Champions, Segment::LoyalCustomers],
            categories: CategoryPredicate::any_of(&[WOMEN_CATEGORY]),
            min_average_order_value: None,
        }
    }

    /// Lapsing and new customers interested in men's or children's products.
    pub fn discount_targets() -> Self {
        Self {
            name: "discount_target_customer_ids".to_string(),
            segments: vec![
                Segment::CantLoose,
                Segment::AboutToSleep,
                Segment::NewCustomers,
            ],
            categories: CategoryPredicate::any_of(&[MEN_CATEGORY, CHILDREN_CATEGORY]),
            min_average_order_value: None,
        }
    }

    pub fn validate(&self) -> RfmResult<()> {
        if self.name.trim().is_empty() {
            return Err(RfmError::InvalidConfig("cohort name is empty".to_string()));
        }
        if self.name.contains(['/', '\\']) {
            return Err(RfmError::InvalidConfig(format!(
                "cohort name '{}' must not contain path separators",
                self.name
            )));
        }
        if self.segments.is_empty() {
            return Err(RfmError::InvalidConfig(format!(
                "cohort '{}' targets no segments",
                self.name
            )));
        }
        if self.categories.any_of.is_empty() {
            return Err(RfmError::InvalidConfig(format!(
                "cohort '{}' has no category tokens",
                self.name
            )));
        }
        Ok(())
    }

    fn meets_spend(&self, metrics: &CustomerMetrics) -> bool {
        match self.min_average_order_value {
            None => true,
            Some(threshold) => metrics
                .average_order_value()
                .is_some_and(|average| average >= threshold),
        }
    }

    pub fn includes(&self, customer: &SegmentedCustomer) -> bool {
        self.segments.contains(&customer.segment)
            && self.categories.matches(&customer.metrics().categories)
            && self.meets_spend(customer.metrics())
    }
}

/// Identifiers of matching customers, deduplicated, in population order.
pub fn select_cohort(population: &[SegmentedCustomer], spec: &CohortSpec) -> Vec<String> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = population
        .iter()
        .filter(|customer| spec.includes(customer))
        .map(SegmentedCustomer::customer_id)
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect();

    log::info!("cohort: {} selected {} customers", spec.name, ids.len());
    ids
}
