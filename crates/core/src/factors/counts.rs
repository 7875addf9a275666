//! Primary count extraction
//!
//! Loaders count buckets, trucks count loads. Only ore is counted: an entry
//! (or an individual load) that names any other material is skipped.

use std::collections::BTreeMap;

use minetally_domain::constants::{
    ACTIVITY_HAULING, ACTIVITY_LOADING, FIELD_BUCKETS, FIELD_EQUIPMENT, FIELD_MATERIAL,
    FIELD_TRUCKS, MATERIAL_ORE, SUB_DEVELOPMENT, SUB_PRODUCTION,
};
use minetally_domain::{
    ActivityPayload, EquipmentKind, HaulLoad, PayloadValue, ReconciliationBasis, UnitCounts,
};
use tracing::debug;

use super::ports::MonthActivity;

/// Activity label whose entries feed the counts for `kind`.
pub fn source_activity(kind: EquipmentKind) -> &'static str {
    match kind {
        EquipmentKind::Loader => ACTIVITY_LOADING,
        EquipmentKind::Truck => ACTIVITY_HAULING,
    }
}

/// Per-unit production and development counts, ordered by unit id. Units
/// with no counted work are left out.
pub fn unit_counts(
    activities: &[MonthActivity],
    kind: EquipmentKind,
    basis: ReconciliationBasis,
) -> Vec<UnitCounts> {
    let mut per_unit: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for entry in activities.iter().filter(|a| basis.includes(a.validated)) {
        let payload = &entry.payload;
        if payload.activity != source_activity(kind) {
            continue;
        }
        let production = match payload.sub_activity.as_str() {
            SUB_PRODUCTION => true,
            SUB_DEVELOPMENT => false,
            _ => continue,
        };
        if !is_ore(payload.value(FIELD_MATERIAL)) {
            continue;
        }
        let Some(unit_id) = unit_id(payload) else {
            debug!(date = %entry.date, activity = %payload.activity, "entry without equipment skipped");
            continue;
        };

        let count = match kind {
            EquipmentKind::Loader => payload.number(FIELD_BUCKETS),
            EquipmentKind::Truck => truckloads(payload),
        };
        let slot = per_unit.entry(unit_id).or_default();
        if production {
            slot.0 += count;
        } else {
            slot.1 += count;
        }
    }

    per_unit
        .into_iter()
        .filter(|(_, (prod, dev))| *prod != 0.0 || *dev != 0.0)
        .map(|(unit, (prod, dev))| UnitCounts::new(unit, prod, dev))
        .collect()
}

fn unit_id(payload: &ActivityPayload) -> Option<String> {
    let label = payload.value(FIELD_EQUIPMENT)?.to_label();
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_string())
}

fn truckloads(payload: &ActivityPayload) -> f64 {
    if payload.has_loads() {
        payload.loads.iter().filter(|load| load_is_ore(load)).count() as f64
    } else {
        payload.number(FIELD_TRUCKS)
    }
}

fn load_is_ore(load: &HaulLoad) -> bool {
    load.material.as_deref().map_or(true, |m| m.trim().eq_ignore_ascii_case(MATERIAL_ORE))
}

fn is_ore(material: Option<&PayloadValue>) -> bool {
    match material {
        None => true,
        Some(value) => value.to_label().trim().eq_ignore_ascii_case(MATERIAL_ORE),
    }
}
