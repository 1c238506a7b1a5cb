use serde::{Deserialize, Serialize};

use crate::error::{RfmError, RfmResult};
use crate::models::{CustomerMetrics, Metric, ScoredCustomer};

pub const SCORE_BINS: usize = 5;

/// What to do when a metric has too few distinct values for five distinct
/// quantile edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantilePolicy {
    /// Tied edges share the lowest reachable bin; empty bins are skipped.
    #[default]
    Collapse,
    /// Fail the run with `RfmError::DegenerateQuantileBin`.
    Strict,
}

/// Linear-interpolated quantile edges at 0, 1/5, ..., 5/5 of `sorted`.
pub fn quantile_edges(sorted: &[f64]) -> RfmResult<[f64; SCORE_BINS + 1]> {
    let last = sorted.len().checked_sub(1).ok_or(RfmError::EmptyPopulation)?;
    let mut edges = [0.0; SCORE_BINS + 1];

    for (j, edge) in edges.iter_mut().enumerate() {
        let position = (j * last) as f64 / SCORE_BINS as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let fraction = position - lower as f64;
        *edge = sorted[lower] + (sorted[upper] - sorted[lower]) * fraction;
    }

    Ok(edges)
}

/// Bin number in `1..=5`: the first bin whose upper edge is at least `value`.
pub fn bin_of(value: f64, edges: &[f64; SCORE_BINS + 1]) -> u8 {
    (1..=SCORE_BINS)
        .find(|&j| value <= edges[j])
        .unwrap_or(SCORE_BINS) as u8
}

fn has_tied_edges(edges: &[f64; SCORE_BINS + 1]) -> bool {
    edges.windows(2).any(|pair| pair[0] == pair[1])
}

fn distinct_values(sorted: &[f64]) -> usize {
    let mut count = 0;
    let mut previous = None;
    for &value in sorted {
        if previous != Some(value) {
            count += 1;
            previous = Some(value);
        }
    }
    count
}

/// Splits `values` into quintiles and returns each value's bin (1 = lowest).
pub fn quintile_bins(values: &[f64], metric: Metric, policy: QuantilePolicy) -> RfmResult<Vec<u8>> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let edges = quantile_edges(&sorted)?;
    log::debug!("scoring: {metric} edges {edges:?}");

    if has_tied_edges(&edges) {
        let distinct = distinct_values(&sorted);
        match policy {
            QuantilePolicy::Strict => {
                return Err(RfmError::DegenerateQuantileBin {
                    metric,
                    distinct,
                    population: values.len(),
                });
            }
            QuantilePolicy::Collapse => {
                log::warn!(
                    "scoring: {metric} has tied quantile edges ({distinct} distinct values across {} customers), collapsing bins",
                    values.len()
                );
            }
        }
    }

    Ok(values.iter().map(|&value| bin_of(value, &edges)).collect())
}

/// One-based ranks with ties ordered by position, so every rank is unique.
pub fn first_occurrence_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (position, index) in order.into_iter().enumerate() {
        ranks[index] = (position + 1) as f64;
    }
    ranks
}

/// Scores a whole population. Recency is inverted so the most recent
/// quintile scores 5; frequency is binned on its tie-broken rank.
pub fn score_customers(
    metrics: Vec<CustomerMetrics>,
    policy: QuantilePolicy,
) -> RfmResult<Vec<ScoredCustomer>> {
    if metrics.is_empty() {
        return Err(RfmError::EmptyPopulation);
    }

    let recency: Vec<f64> = metrics.iter().map(|m| m.recency as f64).collect();
    let frequency: Vec<f64> = metrics.iter().map(|m| f64::from(m.frequency)).collect();
    let monetary: Vec<f64> = metrics.iter().map(|m| m.monetary).collect();

    let recency_bins = quintile_bins(&recency, Metric::Recency, policy)?;
    let frequency_bins = quintile_bins(
        &first_occurrence_ranks(&frequency),
        Metric::Frequency,
        policy,
    )?;
    let monetary_bins = quintile_bins(&monetary, Metric::Monetary, policy)?;

    let scored: Vec<ScoredCustomer> = metrics
        .into_iter()
        .enumerate()
        .map(|(i, metrics)| ScoredCustomer {
            metrics,
            recency_score: SCORE_BINS as u8 + 1 - recency_bins[i],
            frequency_score: frequency_bins[i],
            monetary_score: monetary_bins[i],
        })
        .collect();

    log::info!("scoring: scored {} customers", scored.len());
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, recency: i64, frequency: u32, monetary: f64) -> CustomerMetrics {
        CustomerMetrics {
            customer_id: id.to_string(),
            recency,
            frequency,
            monetary,
            order_count: u64::from(frequency),
            categories: Vec::new(),
        }
    }

    fn score_counts(scores: impl Iterator<Item = u8>) -> [usize; 5] {
        let mut counts = [0; 5];
        for score in scores {
            counts[usize::from(score) - 1] += 1;
        }
        counts
    }

    #[test]
    fn five_customers_fill_five_quintiles() {
        let metrics = vec![
            customer("a", 1, 1, 100.0),
            customer("b", 10, 1, 200.0),
            customer("c", 20, 1, 300.0),
            customer("d", 30, 1, 400.0),
            customer("e", 40, 1, 500.0),
        ];
        let scored = score_customers(metrics, QuantilePolicy::Strict).unwrap();

        let recency: Vec<u8> = scored.iter().map(|s| s.recency_score).collect();
        let monetary: Vec<u8> = scored.iter().map(|s| s.monetary_score).collect();
        let frequency: Vec<u8> = scored.iter().map(|s| s.frequency_score).collect();
        assert_eq!(recency, vec![5, 4, 3, 2, 1]);
        assert_eq!(monetary, vec![1, 2, 3, 4, 5]);
        assert_eq!(frequency, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn distinct_values_spread_evenly() {
        let metrics: Vec<CustomerMetrics> = (0..100)
            .map(|i| customer(&format!("c{i:03}"), i, (i % 7) as u32, (i * 13 % 100) as f64))
            .collect();
        let scored = score_customers(metrics, QuantilePolicy::Strict).unwrap();

        assert_eq!(score_counts(scored.iter().map(|s| s.recency_score)), [20; 5]);
        assert_eq!(score_counts(scored.iter().map(|s| s.frequency_score)), [20; 5]);
        assert_eq!(score_counts(scored.iter().map(|s| s.monetary_score)), [20; 5]);
    }

    #[test]
    fn more_recent_customers_never_score_lower() {
        let metrics: Vec<CustomerMetrics> = (0..23)
            .map(|i| customer(&format!("c{i:02}"), (i * 3) % 17, 1, 50.0 + i as f64))
            .collect();
        let scored = score_customers(metrics, QuantilePolicy::Collapse).unwrap();

        for a in &scored {
            for b in &scored {
                if a.metrics.recency < b.metrics.recency {
                    assert!(a.recency_score >= b.recency_score);
                }
            }
        }
    }

    #[test]
    fn tied_frequencies_are_broken_by_population_order() {
        let metrics: Vec<CustomerMetrics> = (0..7)
            .map(|i| customer(&format!("c{i}"), i, 3, 10.0 * (i + 1) as f64))
            .collect();
        let scored = score_customers(metrics, QuantilePolicy::Strict).unwrap();

        let frequency: Vec<u8> = scored.iter().map(|s| s.frequency_score).collect();
        assert_eq!(frequency, vec![1, 1, 2, 3, 4, 5, 5]);
        assert!(frequency.windows(2).all(|pair| pair[1] - pair[0] <= 1));
    }

    #[test]
    fn first_occurrence_ranks_are_unique() {
        let ranks = first_occurrence_ranks(&[3.0, 1.0, 3.0, 1.0, 2.0]);
        assert_eq!(ranks, vec![4.0, 1.0, 5.0, 2.0, 3.0]);
    }

    #[test]
    fn collapse_policy_skips_empty_bins() {
        let values = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0, 200.0, 300.0];
        let bins = quintile_bins(&values, Metric::Monetary, QuantilePolicy::Collapse).unwrap();
        assert_eq!(bins, vec![1, 1, 1, 1, 1, 1, 1, 4, 5, 5]);
    }

    #[test]
    fn strict_policy_rejects_tied_edges() {
        let values = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0, 200.0, 300.0];
        let err = quintile_bins(&values, Metric::Monetary, QuantilePolicy::Strict).unwrap_err();
        match err {
            RfmError::DegenerateQuantileBin {
                metric,
                distinct,
                population,
            } => {
                assert_eq!(metric, Metric::Monetary);
                assert_eq!(distinct, 4);
                assert_eq!(population, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_population_is_an_error() {
        assert!(matches!(
            score_customers(Vec::new(), QuantilePolicy::Collapse),
            Err(RfmError::EmptyPopulation)
        ));
    }
}
