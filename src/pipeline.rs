use crate::cohort::{select_cohort, CohortSpec};
use crate::config::AnalysisConfig;
use crate::error::RfmResult;
use crate::models::{ExcludedCustomer, OrderRecord, Segment, SegmentedCustomer};
use crate::{prep, rfm, scoring, segment};

/// Output of one segmentation run.
#[derive(Debug, Clone)]
pub struct RfmRun {
    /// One entry per scored customer, ordered by customer identifier.
    pub customers: Vec<SegmentedCustomer>,
    pub excluded: Vec<ExcludedCustomer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    pub name: String,
    pub customer_ids: Vec<String>,
}

pub fn run(records: &[OrderRecord], config: &AnalysisConfig) -> RfmResult<RfmRun> {
    let prepared = prep::prepare_orders(records);
    let aggregation = rfm::aggregate(&prepared, config.reference_timestamp());
    let scored = scoring::score_customers(aggregation.metrics, config.quantile_policy)?;
    let customers = segment::segment_customers(scored)?;

    Ok(RfmRun {
        customers,
        excluded: aggregation.excluded,
    })
}

impl RfmRun {
    pub fn cohort(&self, spec: &CohortSpec) -> Cohort {
        Cohort {
            name: spec.name.clone(),
            customer_ids: select_cohort(&self.customers, spec),
        }
    }

    pub fn cohorts(&self, specs: &[CohortSpec]) -> Vec<Cohort> {
        specs.iter().map(|spec| self.cohort(spec)).collect()
    }

    /// Customers in any of `segments`; an empty filter keeps everyone.
    pub fn in_segments(&self, segments: &[Segment]) -> Vec<&SegmentedCustomer> {
        self.customers
            .iter()
            .filter(|customer| segments.is_empty() || segments.contains(&customer.segment))
            .collect()
    }
}
