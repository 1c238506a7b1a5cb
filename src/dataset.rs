use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::RfmResult;
use crate::models::{OrderRecord, SegmentedCustomer};
use crate::pipeline::Cohort;

#[derive(Deserialize)]
struct CsvRow {
    master_id: String,
    order_channel: String,
    last_order_channel: String,
    first_order_date: Option<String>,
    last_order_date: Option<String>,
    last_order_date_online: Option<String>,
    last_order_date_offline: Option<String>,
    #[serde(deserialize_with = "order_count")]
    order_num_total_ever_online: u32,
    #[serde(deserialize_with = "order_count")]
    order_num_total_ever_offline: u32,
    #[serde(deserialize_with = "spend")]
    customer_value_total_ever_offline: f64,
    #[serde(deserialize_with = "spend")]
    customer_value_total_ever_online: f64,
    #[serde(default)]
    interested_in_categories_12: String,
}

impl From<CsvRow> for OrderRecord {
    fn from(row: CsvRow) -> Self {
        OrderRecord {
            master_id: row.master_id,
            order_channel: row.order_channel,
            last_order_channel: row.last_order_channel,
            first_order_date: row.first_order_date,
            last_order_date: row.last_order_date,
            last_order_date_online: row.last_order_date_online,
            last_order_date_offline: row.last_order_date_offline,
            order_num_total_ever_online: row.order_num_total_ever_online,
            order_num_total_ever_offline: row.order_num_total_ever_offline,
            customer_value_total_ever_offline: row.customer_value_total_ever_offline,
            customer_value_total_ever_online: row.customer_value_total_ever_online,
            interested_in_categories_12: parse_categories(&row.interested_in_categories_12),
        }
    }
}

/// Counts are exported as floats (`4.0`); anything fractional or negative is rejected.
fn order_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(de::Error::custom(format!(
            "order count must be a non-negative whole number, got {value}"
        )));
    }
    Ok(value as u32)
}

/// Spend may be negative (refunds) but must be a finite number.
fn spend<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(de::Error::custom(format!(
            "spend must be a finite number, got {value}"
        )));
    }
    Ok(value)
}

/// Splits `[ERKEK, KADIN]` into its tokens.
pub fn parse_categories(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_orders<R: io::Read>(reader: R) -> RfmResult<Vec<OrderRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        records.push(OrderRecord::from(row));
    }

    Ok(records)
}

pub fn load_orders(csv_path: &Path) -> RfmResult<Vec<OrderRecord>> {
    let records = read_orders(File::open(csv_path)?)?;
    log::info!("dataset: read {} records from {}", records.len(), csv_path.display());
    Ok(records)
}

#[derive(Serialize)]
struct SegmentedRow<'a> {
    master_id: &'a str,
    recency: i64,
    frequency: u32,
    monetary: f64,
    recency_score: u8,
    frequency_score: u8,
    monetary_score: u8,
    rf_score: &'a str,
    rfm_score: &'a str,
    segment: &'a str,
}

pub fn write_segmented<'a, W, I>(writer: W, customers: I) -> RfmResult<()>
where
    W: io::Write,
    I: IntoIterator<Item = &'a SegmentedCustomer>,
{
    let mut writer = csv::Writer::from_writer(writer);

    for customer in customers {
        let metrics = customer.metrics();
        writer.serialize(SegmentedRow {
            master_id: &metrics.customer_id,
            recency: metrics.recency,
            frequency: metrics.frequency,
            monetary: metrics.monetary,
            recency_score: customer.scored.recency_score,
            frequency_score: customer.scored.frequency_score,
            monetary_score: customer.scored.monetary_score,
            rf_score: &customer.rf_code,
            rfm_score: &customer.rfm_code,
            segment: customer.segment.as_str(),
        })?;
    }

    writer.flush()?;
    Ok(())
}

/// One identifier per line, no header.
pub fn write_ids<W: io::Write>(writer: W, ids: &[String]) -> RfmResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    for id in ids {
        writer.write_record([id.as_str()])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes `<out_dir>/<cohort name>.csv` for every cohort and returns the paths.
pub fn export_cohorts(out_dir: &Path, cohorts: &[Cohort]) -> RfmResult<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(cohorts.len());

    for cohort in cohorts {
        let path = out_dir.join(format!("{}.csv", cohort.name));
        write_ids(File::create(&path)?, &cohort.customer_ids)?;
        log::info!(
            "dataset: wrote {} ids to {}",
            cohort.customer_ids.len(),
            path.display()
        );
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "master_id,order_channel,last_order_channel,first_order_date,last_order_date,last_order_date_online,last_order_date_offline,order_num_total_ever_online,order_num_total_ever_offline,customer_value_total_ever_offline,customer_value_total_ever_online,interested_in_categories_12";

    #[test]
    fn reads_source_rows() {
        let data = format!(
            "{HEADER}\ncc294636,Android App,Offline,2020-10-30,2021-02-26,2021-02-21,2021-02-26,4.0,1.0,139.99,799.38,[KADIN]\n\
             f431bd5a,Android App,Mobile,2017-02-08,2021-02-16,2021-02-16,,19.0,2.0,159.97,1853.58,\"[ERKEK, COCUK, KADIN, AKTIFSPOR]\"\n"
        );
        let records = read_orders(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].order_num_total_ever_online, 4);
        assert_eq!(records[1].last_order_date_offline, None);
        assert_eq!(
            records[1].interested_in_categories_12,
            vec!["ERKEK", "COCUK", "KADIN", "AKTIFSPOR"]
        );
    }

    #[test]
    fn rejects_fractional_counts() {
        let data = format!(
            "{HEADER}\nx,Mobile,Mobile,2020-10-30,2021-02-26,2021-02-21,2021-02-26,1.5,1.0,10.0,10.0,[KADIN]\n"
        );
        assert!(read_orders(data.as_bytes()).is_err());
    }

    #[test]
    fn rejects_non_finite_spend() {
        for spend in ["NaN", "inf", "-inf"] {
            let data = format!(
                "{HEADER}\nx,Mobile,Mobile,2020-10-30,2021-02-26,2021-02-21,2021-02-26,1.0,1.0,10.0,{spend},[KADIN]\n"
            );
            assert!(read_orders(data.as_bytes()).is_err(), "accepted spend {spend}");
        }
    }

    #[test]
    fn accepts_refunds_as_negative_spend() {
        let data = format!(
            "{HEADER}\nx,Mobile,Mobile,2020-10-30,2021-02-26,2021-02-21,2021-02-26,1.0,1.0,-25.5,10.0,[KADIN]\n"
        );
        let records = read_orders(data.as_bytes()).unwrap();
        assert_eq!(records[0].customer_value_total_ever_offline, -25.5);
    }

    #[test]
    fn category_lists_tolerate_empty_input() {
        assert!(parse_categories("").is_empty());
        assert!(parse_categories("[]").is_empty());
        assert_eq!(parse_categories("[AKTIFCOCUK]"), vec!["AKTIFCOCUK"]);
    }

    #[test]
    fn ids_are_written_without_header() {
        let mut out = Vec::new();
        write_ids(&mut out, &["a1".to_string(), "b2".to_string()]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a1\nb2\n");
    }
}
