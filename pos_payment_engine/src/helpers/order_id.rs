use chrono::{DateTime, SecondsFormat, Utc};

const ORDER_ID_PREFIX: &str = "POS-";

/// An order id derived from the current time, for invoices created without one.
pub fn default_order_id() -> String {
    order_id_for_time(Utc::now())
}

/// `POS-` followed by the ISO-8601 timestamp (millisecond precision) with `:` and `.` replaced by `-`.
pub fn order_id_for_time(time: DateTime<Utc>) -> String {
    let stamp = time.to_rfc3339_opts(SecondsFormat::Millis, true).replace([':', '.'], "-");
    format!("{ORDER_ID_PREFIX}{stamp}")
}
