use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::{OrderRecord, PreparedOrder};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses a date-bearing field. Anything unparseable comes back as `None`.
pub fn parse_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    for format in DATETIME_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp);
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.naive_utc())
}

pub fn prepare_order(record: &OrderRecord) -> PreparedOrder {
    let order_num_total = record
        .order_num_total_ever_online
        .saturating_add(record.order_num_total_ever_offline);
    let customer_value_total =
        record.customer_value_total_ever_online + record.customer_value_total_ever_offline;

    PreparedOrder {
        master_id: record.master_id.clone(),
        order_channel: record.order_channel.clone(),
        last_order_channel: record.last_order_channel.clone(),
        first_order_date: parse_timestamp(record.first_order_date.as_deref()),
        last_order_date: parse_timestamp(record.last_order_date.as_deref()),
        last_order_date_online: parse_timestamp(record.last_order_date_online.as_deref()),
        last_order_date_offline: parse_timestamp(record.last_order_date_offline.as_deref()),
        order_num_total,
        customer_value_total,
        categories: record.interested_in_categories_12.clone(),
    }
}

pub fn prepare_orders(records: &[OrderRecord]) -> Vec<PreparedOrder> {
    let prepared: Vec<PreparedOrder> = records.iter().map(prepare_order).collect();
    let unparsed = prepared
        .iter()
        .filter(|order| order.last_order_date.is_none())
        .count();
    if unparsed > 0 {
        log::warn!("prep: {unparsed} of {} records have no parseable last_order_date", prepared.len());
    }
    log::info!("prep: prepared {} order records", prepared.len());
    prepared
}

#[cfg(test)]
pub(crate) fn sample_record(master_id: &str, last_order_date: &str) -> OrderRecord {
    OrderRecord {
        master_id: master_id.to_string(),
        order_channel: "Android App".to_string(),
        last_order_channel: "Offline".to_string(),
        first_order_date: Some("2020-01-05".to_string()),
        last_order_date: Some(last_order_date.to_string()),
        last_order_date_online: Some("2021-01-10".to_string()),
        last_order_date_offline: Some(last_order_date.to_string()),
        order_num_total_ever_online: 4,
        order_num_total_ever_offline: 1,
        customer_value_total_ever_offline: 139.99,
        customer_value_total_ever_online: 799.38,
        interested_in_categories_12: vec!["KADIN".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_combine_both_channels() {
        let prepared = prepare_order(&sample_record("cc294636", "2021-02-26"));
        assert_eq!(prepared.order_num_total, 5);
        assert!((prepared.customer_value_total - 939.37).abs() < 1e-9);
    }

    #[test]
    fn accepts_supported_date_layouts() {
        let midnight = NaiveDate::from_ymd_opt(2021, 5, 30)
            .and_then(|date| date.and_hms_opt(0, 0, 0));
        assert_eq!(parse_timestamp(Some("2021-05-30")), midnight);
        assert_eq!(parse_timestamp(Some("2021-05-30 00:00:00")), midnight);
        assert_eq!(parse_timestamp(Some("2021-05-30T00:00:00Z")), midnight);
    }

    #[test]
    fn malformed_dates_become_none() {
        assert_eq!(parse_timestamp(Some("30/05/2021")), None);
        assert_eq!(parse_timestamp(Some("  ")), None);
        assert_eq!(parse_timestamp(None), None);
    }

    #[test]
    fn bad_date_does_not_abort_the_batch() {
        let records = vec![
            sample_record("a", "not a date"),
            sample_record("b", "2021-05-01"),
        ];
        let prepared = prepare_orders(&records);
        assert_eq!(prepared.len(), 2);
        assert!(prepared[0].last_order_date.is_none());
        assert!(prepared[1].last_order_date.is_some());
    }
}
