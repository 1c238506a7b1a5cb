use std::ops::RangeInclusive;

use crate::error::{RfmError, RfmResult};
use crate::models::{ScoredCustomer, Segment, SegmentedCustomer};

/// Maps a (recency score, frequency score) region to a segment.
#[derive(Debug, Clone)]
pub struct SegmentRule {
    pub recency: RangeInclusive<u8>,
    pub frequency: RangeInclusive<u8>,
    pub segment: Segment,
}

impl SegmentRule {
    const fn new(recency: RangeInclusive<u8>, frequency: RangeInclusive<u8>, segment: Segment) -> Self {
        Self {
            recency,
            frequency,
            segment,
        }
    }

    pub fn matches(&self, recency_score: u8, frequency_score: u8) -> bool {
        self.recency.contains(&recency_score) && self.frequency.contains(&frequency_score)
    }
}

/// Evaluated in order; the first matching rule wins.
pub static SEGMENT_RULES: [SegmentRule; 10] = [
    SegmentRule::new(1..=2, 1..=2, Segment::Hibernating),
    SegmentRule::new(1..=2, 3..=4, Segment::AtRisk),
    SegmentRule::new(1..=2, 5..=5, Segment::CantLoose),
    SegmentRule::new(3..=3, 1..=2, Segment::AboutToSleep),
    SegmentRule::new(3..=3, 3..=3, Segment::NeedAttention),
    SegmentRule::new(3..=4, 4..=5, Segment::LoyalCustomers),
    SegmentRule::new(4..=4, 1..=1, Segment::Promising),
    SegmentRule::new(5..=5, 1..=1, Segment::NewCustomers),
    SegmentRule::new(4..=5, 2..=3, Segment::PotentialLoyalists),
    SegmentRule::new(5..=5, 4..=5, Segment::Champions),
];

pub fn classify(rules: &[SegmentRule], recency_score: u8, frequency_score: u8) -> RfmResult<Segment> {
    for score in [recency_score, frequency_score] {
        if !(1..=5).contains(&score) {
            return Err(RfmError::InvalidScore { score });
        }
    }

    rules
        .iter()
        .find(|rule| rule.matches(recency_score, frequency_score))
        .map(|rule| rule.segment)
        .ok_or_else(|| RfmError::UnmappedSegmentCode {
            code: format!("{recency_score}{frequency_score}"),
        })
}

/// Checks that every one of the 25 score pairs maps to a segment.
pub fn verify_coverage(rules: &[SegmentRule]) -> RfmResult<()> {
    for recency_score in 1..=5 {
        for frequency_score in 1..=5 {
            classify(rules, recency_score, frequency_score)?;
        }
    }
    Ok(())
}

pub fn segment_customers_with(
    rules: &[SegmentRule],
    scored: Vec<ScoredCustomer>,
) -> RfmResult<Vec<SegmentedCustomer>> {
    verify_coverage(rules)?;

    scored
        .into_iter()
        .map(|scored| {
            let segment = classify(rules, scored.recency_score, scored.frequency_score)?;
            Ok(SegmentedCustomer {
                rf_code: scored.rf_code(),
                rfm_code: scored.rfm_code(),
                segment,
                scored,
            })
        })
        .collect()
}

pub fn segment_customers(scored: Vec<ScoredCustomer>) -> RfmResult<Vec<SegmentedCustomer>> {
    let segmented = segment_customers_with(&SEGMENT_RULES, scored)?;
    log::info!("segment: labelled {} customers", segmented.len());
    Ok(segmented)
}
