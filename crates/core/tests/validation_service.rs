//! Integration tests for the validation snapshot lifecycle.

mod support;

use std::sync::Arc;

use minetally_common::testing::assert_approx_eq;
use minetally_core::ValidationService;
use minetally_domain::{ActivityPayload, MinetallyError, ShiftSelector, ShiftState};

use support::{day, face_drilling, hauling, shift_key, InMemoryStore, SITE};

fn service() -> (Arc<InMemoryStore>, ValidationService) {
    let store = Arc::new(InMemoryStore::new());
    (store.clone(), ValidationService::new(store))
}

#[test]
fn add_activity_creates_shift_and_totals() {
    let (_, service) = service();
    let key = shift_key(4, "D", "op-1");

    service.add_activity(&key, hauling("Production", "TK01", &[10.0, 20.0], 5.0)).unwrap();

    let shift = service.get_shift(&key).unwrap();
    assert_eq!(shift.state(), ShiftState::Captured);
    assert_eq!(shift.totals.get("Hauling", "Production", "Weight"), Some(30.0));
    assert_eq!(shift.totals.get("Hauling", "Production", "Trucks"), Some(2.0));
    assert_eq!(shift.totals.get("Hauling", "Production", "Distance"), Some(10.0));
    assert_eq!(service.list_activities(&key).unwrap().len(), 1);
}

#[test]
fn create_or_get_is_idempotent() {
    let (_, service) = service();
    let key = shift_key(4, "D", "op-1");

    let first = service.create_or_get_shift(&key).unwrap();
    let second = service.create_or_get_shift(&key).unwrap();

    assert_eq!(first.id, second.id);
    assert!(first.totals.is_empty());
    assert_eq!(service.list_day(SITE, day(4)).unwrap().len(), 1);
}

#[test]
fn validated_shift_is_immutable_until_unvalidated() {
    let (store, service) = service();
    let key = shift_key(4, "D", "op-1");
    let activity = service.add_activity(&key, face_drilling(4.0, 3.5)).unwrap();
    service.validate(SITE, day(4), &ShiftSelector::default()).unwrap();
    let commits = store.commits();

    let err = service.add_activity(&key, face_drilling(1.0, 1.0)).unwrap_err();
    assert!(matches!(err, MinetallyError::ImmutableShift(_)));
    assert!(matches!(
        service.edit_activity(&activity.id, face_drilling(2.0, 2.0)),
        Err(MinetallyError::ImmutableShift(_))
    ));
    assert!(matches!(service.delete_activity(&activity.id), Err(MinetallyError::ImmutableShift(_))));
    assert!(matches!(service.delete_shift(&key), Err(MinetallyError::ImmutableShift(_))));
    assert_eq!(store.commits(), commits, "rejected mutations must not commit");
    assert_eq!(service.list_activities(&key).unwrap().len(), 1);

    assert_eq!(service.unvalidate(SITE, day(4)).unwrap(), 1);
    service.add_activity(&key, face_drilling(1.0, 1.0)).unwrap();

    let shift = service.get_shift(&key).unwrap();
    assert!(!shift.validated);
    assert_approx_eq(shift.totals.get("Development", "Face Drilling", "Dev Drillm").unwrap(), 15.0, 1e-9);
}

#[test]
fn edit_and_delete_recompute_totals() {
    let (_, service) = service();
    let key = shift_key(4, "N", "op-2");
    let first = service.add_activity(&key, face_drilling(4.0, 3.5)).unwrap();
    service.add_activity(&key, face_drilling(2.0, 3.0)).unwrap();

    let shift = service.get_shift(&key).unwrap();
    assert_approx_eq(shift.totals.get("Development", "Face Drilling", "Dev Drillm").unwrap(), 20.0, 1e-9);

    let shift = service.edit_activity(&first.id, face_drilling(1.0, 3.5)).unwrap();
    assert_approx_eq(shift.totals.get("Development", "Face Drilling", "Dev Drillm").unwrap(), 9.5, 1e-9);

    let shift = service.delete_activity(&first.id).unwrap();
    assert_approx_eq(shift.totals.get("Development", "Face Drilling", "Dev Drillm").unwrap(), 6.0, 1e-9);
    assert_eq!(service.list_activities(&key).unwrap().len(), 1);
}

#[test]
fn deleting_a_shift_reopens_its_day() {
    let (_, service) = service();
    let gone = shift_key(4, "D", "op-1");
    let stays = shift_key(4, "N", "op-2");
    let other_day = shift_key(5, "D", "op-1");
    for key in [&gone, &stays, &other_day] {
        service.add_activity(key, face_drilling(1.0, 1.0)).unwrap();
    }
    service.validate(SITE, day(4), &ShiftSelector { operator_id: Some("op-2".into()), shift: None }).unwrap();
    service.validate(SITE, day(5), &ShiftSelector::default()).unwrap();

    let reopened = service.delete_shift(&gone).unwrap();

    assert_eq!(reopened, 1);
    assert!(matches!(service.get_shift(&gone), Err(MinetallyError::NotFound(_))));
    assert!(!service.get_shift(&stays).unwrap().validated);
    assert!(service.get_shift(&other_day).unwrap().validated);
}

#[test]
fn validate_applies_selector_and_reports_no_data() {
    let (_, service) = service();
    service.add_activity(&shift_key(4, "D", "op-1"), face_drilling(1.0, 1.0)).unwrap();
    service.add_activity(&shift_key(4, "N", "op-1"), face_drilling(1.0, 1.0)).unwrap();

    let night = ShiftSelector { shift: Some("N".into()), operator_id: None };
    let validated = service.validate(SITE, day(4), &night).unwrap();
    assert_eq!(validated.len(), 1);
    assert_eq!(validated[0].key.shift, "N");
    assert!(!service.get_shift(&shift_key(4, "D", "op-1")).unwrap().validated);

    let err = service.validate(SITE, day(6), &ShiftSelector::default()).unwrap_err();
    assert!(matches!(err, MinetallyError::NoData(_)));

    let nobody = ShiftSelector { shift: None, operator_id: Some("op-9".into()) };
    assert!(matches!(service.validate(SITE, day(4), &nobody), Err(MinetallyError::NoData(_))));
}

#[test]
fn finalize_is_all_or_nothing() {
    let (_, service) = service();
    let key = shift_key(7, "D", "op-3");

    let bad = vec![face_drilling(1.0, 2.0), ActivityPayload::new("", "Production")];
    assert!(matches!(service.finalize_shift(&key, bad), Err(MinetallyError::InvalidInput(_))));
    assert!(matches!(service.get_shift(&key), Err(MinetallyError::NotFound(_))));

    let shift = service
        .finalize_shift(&key, vec![face_drilling(1.0, 2.0), hauling("Development", "TK02", &[30.0], 2.0)])
        .unwrap();
    assert_eq!(service.list_activities(&key).unwrap().len(), 2);
    assert_eq!(shift.totals.get("Hauling", "Development", "Weight"), Some(30.0));
}

#[test]
fn missing_records_are_not_found() {
    let (_, service) = service();

    assert!(matches!(service.delete_activity("nope"), Err(MinetallyError::NotFound(_))));
    assert!(matches!(
        service.edit_activity("nope", face_drilling(1.0, 1.0)),
        Err(MinetallyError::NotFound(_))
    ));
    assert!(matches!(service.delete_shift(&shift_key(1, "D", "x")), Err(MinetallyError::NotFound(_))));
    assert!(matches!(service.list_activities(&shift_key(1, "D", "x")), Err(MinetallyError::NotFound(_))));
    assert_eq!(service.unvalidate(SITE, day(1)).unwrap(), 0);
}

#[test]
fn blank_shift_key_is_rejected() {
    let (_, service) = service();
    let key = shift_key(4, " ", "op-1");

    assert!(matches!(service.create_or_get_shift(&key), Err(MinetallyError::InvalidInput(_))));
}
