//! RFM (recency, frequency, monetary) segmentation of retail customers and
//! extraction of marketing cohorts from the segmented population.

pub mod cohort;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod prep;
pub mod report;
pub mod rfm;
pub mod scoring;
pub mod segment;

pub use config::AnalysisConfig;
pub use error::{RfmError, RfmResult};
pub use pipeline::{run, Cohort, RfmRun};
