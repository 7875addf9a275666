//! Payload and key fixtures

use chrono::NaiveDate;
use minetally_domain::{
    ActivityPayload, HaulLoad, MetricKey, ReconciliationKey, ReportingMonth, ShiftKey,
};

pub const SITE: &str = "site-1";

pub fn march() -> ReportingMonth {
    ReportingMonth::new(2025, 3).unwrap()
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

pub fn shift_key(d: u32, shift: &str, operator: &str) -> ShiftKey {
    ShiftKey::new(SITE, day(d), shift, operator)
}

pub fn hauling(sub: &str, unit: &str, weights: &[f64], distance: f64) -> ActivityPayload {
    weights.iter().fold(
        ActivityPayload::new("Hauling", sub)
            .with_value("Equipment", unit)
            .with_value("Distance", distance),
        |payload, &w| payload.with_load(HaulLoad::new(w)),
    )
}

pub fn loading(sub: &str, unit: &str, buckets: f64) -> ActivityPayload {
    ActivityPayload::new("Loading", sub)
        .with_value("Equipment", unit)
        .with_value("Buckets", buckets)
}

pub fn face_drilling(holes: f64, cut_length: f64) -> ActivityPayload {
    ActivityPayload::new("Development", "Face Drilling")
        .with_value("No of Holes", holes)
        .with_value("Cut Length", cut_length)
}

pub fn weight_key(sub: &str) -> ReconciliationKey {
    ReconciliationKey::new(SITE, march(), MetricKey::new("Hauling", sub, "Weight"))
}

pub fn tonnes_key(sub: &str) -> ReconciliationKey {
    ReconciliationKey::new(SITE, march(), MetricKey::new("Loading", sub, "Tonnes"))
}
