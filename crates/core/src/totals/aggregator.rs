//! Deterministic shift-totals aggregation
//!
//! Every payload is first broken into `(activity, sub_activity, metric,
//! value)` contributions. Contributions are then sorted and summed in that
//! canonical order, so the floating-point result is bit-identical for any
//! ordering of the input payloads.

use std::cmp::Ordering;

use minetally_domain::constants::{
    ACTIVITY_DEVELOPMENT, ACTIVITY_HAULING, FIELD_BOLT_LENGTH, FIELD_CUT_LENGTH, FIELD_DISTANCE,
    FIELD_NO_OF_BOLTS, FIELD_NO_OF_HOLES, FIELD_TRUCKS, FIELD_WEIGHT, METRIC_DEV_DRILLM,
    METRIC_GS_DRILLM, METRIC_TKMS, SUB_DEVELOPMENT, SUB_FACE_DRILLING, SUB_GROUND_SUPPORT,
    SUB_PRODUCTION, SUB_REHAB,
};
use minetally_domain::{ActivityPayload, ShiftTotals};

/// Hauling fields that are produced by load weighting instead of summed as
/// captured.
const WEIGHTED_HAULING_FIELDS: [&str; 3] = [FIELD_WEIGHT, FIELD_DISTANCE, FIELD_TRUCKS];

struct Contribution<'a> {
    activity: &'a str,
    sub_activity: &'a str,
    metric: &'a str,
    value: f64,
}

impl Contribution<'_> {
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.activity
            .cmp(other.activity)
            .then_with(|| self.sub_activity.cmp(other.sub_activity))
            .then_with(|| self.metric.cmp(other.metric))
            .then_with(|| self.value.total_cmp(&other.value))
    }
}

/// Aggregate a shift's payloads into totals.
///
/// Non-numeric values are skipped. Hauling payloads carrying a load list and
/// legacy scalar hauling payloads in the same shift are both counted.
pub fn aggregate<'a, I>(payloads: I) -> ShiftTotals
where
    I: IntoIterator<Item = &'a ActivityPayload>,
{
    let mut contributions = Vec::new();
    for payload in payloads {
        contribute(payload, &mut contributions);
    }
    contributions.sort_by(Contribution::canonical_cmp);

    let mut totals = ShiftTotals::new();
    for c in &contributions {
        totals.add(c.activity, c.sub_activity, c.metric, c.value);
    }
    totals
}

fn contribute<'a>(payload: &'a ActivityPayload, out: &mut Vec<Contribution<'a>>) {
    let activity = payload.activity.as_str();
    let sub_activity = payload.sub_activity.as_str();
    let mut push = |metric: &'a str, value: f64| {
        out.push(Contribution { activity, sub_activity, metric, value });
    };

    let is_hauling = activity == ACTIVITY_HAULING;
    for (key, value) in &payload.values {
        if is_hauling && WEIGHTED_HAULING_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if let Some(number) = value.as_number() {
            push(key.as_str(), number);
        }
    }

    if is_hauling {
        let (trucks, weight) = hauling_weight(payload);
        let distance = payload.number(FIELD_DISTANCE);
        push(FIELD_WEIGHT, weight);
        push(FIELD_TRUCKS, trucks);
        push(FIELD_DISTANCE, trucks * distance);
        if sub_activity == SUB_PRODUCTION || sub_activity == SUB_DEVELOPMENT {
            push(METRIC_TKMS, weight * distance);
        }
    } else if activity == ACTIVITY_DEVELOPMENT {
        match sub_activity {
            SUB_FACE_DRILLING => push(
                METRIC_DEV_DRILLM,
                payload.number(FIELD_NO_OF_HOLES) * payload.number(FIELD_CUT_LENGTH),
            ),
            SUB_GROUND_SUPPORT | SUB_REHAB => {
                let bolt_length = payload
                    .value(FIELD_BOLT_LENGTH)
                    .and_then(|v| v.measurement())
                    .unwrap_or(0.0);
                push(METRIC_GS_DRILLM, payload.number(FIELD_NO_OF_BOLTS) * bolt_length);
            }
            _ => {}
        }
    }
}

/// `(trucks, total weight)` of one hauling payload.
fn hauling_weight(payload: &ActivityPayload) -> (f64, f64) {
    if payload.has_loads() {
        let weight = payload.loads.iter().map(|load| load.weight).filter(|w| w.is_finite()).sum();
        (payload.loads.len() as f64, weight)
    } else {
        let trucks = payload.number(FIELD_TRUCKS);
        (trucks, trucks * payload.number(FIELD_WEIGHT))
    }
}
