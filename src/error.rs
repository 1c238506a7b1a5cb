use thiserror::Error;

use crate::models::Metric;

#[derive(Error, Debug)]
pub enum RfmError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "Degenerate quantile bins for {metric}: {distinct} distinct values across {population} customers"
    )]
    DegenerateQuantileBin {
        metric: Metric,
        distinct: usize,
        population: usize,
    },

    #[error("No segment rule covers rf code '{code}'")]
    UnmappedSegmentCode { code: String },

    #[error("Score {score} is outside 1..=5")]
    InvalidScore { score: u8 },

    #[error("Unknown segment '{0}'")]
    UnknownSegment(String),

    #[error("No customers left to score")]
    EmptyPopulation,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type RfmResult<T> = Result<T, RfmError>;
