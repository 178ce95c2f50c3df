use hydrolog::core::validation::{
    Status, classify, classify_field, classify_slot, hard_violations, prefill, suggested_severity,
};
use hydrolog::models::field::{FieldValue, GENERATOR_FIELDS, TRANSFORMER_FIELDS, lookup};
use hydrolog::models::hour_slot::HourSlot;
use hydrolog::models::issue::Severity;
use hydrolog::models::stream::{LogKind, LogStream};

mod common;
use common::day;

#[test]
fn test_unset_value_is_normal_for_every_field() {
    for spec in GENERATOR_FIELDS.iter().chain(TRANSFORMER_FIELDS) {
        if let Some(range) = spec.range() {
            let c = classify(0.0, range);
            assert_eq!(c.status, Status::Normal, "{} should accept the unset value", spec.key);
            assert!(c.message.is_none());
        }
    }
}

#[test]
fn test_classify_bands() {
    let spec = lookup(LogKind::Generator, "stator_temp_r_c").unwrap();
    let range = spec.range().unwrap();

    assert_eq!(classify(150.0, range).status, Status::Normal);

    let warn = classify(190.0, range);
    assert_eq!(warn.status, Status::Warning);
    assert_eq!(warn.message.as_deref(), Some("outside ideal band 0..180"));

    let danger = classify(205.0, range);
    assert_eq!(danger.status, Status::Danger);
    assert_eq!(danger.message.as_deref(), Some("outside safe limits 0..200"));

    // hard-only ranges have no warning band
    let level = lookup(LogKind::Generator, "headwater_level_masl").unwrap();
    assert_eq!(classify(350.0, level.range().unwrap()).status, Status::Danger);
    assert_eq!(classify(480.0, level.range().unwrap()).status, Status::Normal);
}

#[test]
fn test_choice_fields_are_never_classified() {
    let spec = lookup(LogKind::Transformer, "buchholz_relay").unwrap();
    let c = classify_field(spec, &FieldValue::Choice("trip".into()));
    assert_eq!(c.status, Status::Normal);
}

#[test]
fn test_field_parsing() {
    let temp = lookup(LogKind::Generator, "stator_temp_r_c").unwrap();
    assert_eq!(temp.parse("72,5"), Some(FieldValue::Number(72.5)));
    assert_eq!(temp.parse(""), Some(FieldValue::Number(0.0)));
    assert_eq!(temp.parse("hot"), None);
    assert_eq!(temp.parse("NaN"), None);

    let breaker = lookup(LogKind::Generator, "breaker_status").unwrap();
    assert_eq!(breaker.parse("CLOSED"), Some(FieldValue::Choice("closed".into())));
    assert_eq!(breaker.parse("ajar"), None);
}

#[test]
fn test_slot_checks_and_hard_violations() {
    let mut slot = HourSlot::blank(day(), 10, LogStream::Generator);
    slot.values.insert("stator_temp_r_c".into(), FieldValue::Number(205.0));
    slot.values.insert("thrust_bearing_temp_c".into(), FieldValue::Number(80.0));

    let checks = classify_slot(&slot);
    let status_of = |key: &str| {
        checks
            .iter()
            .find(|c| c.field == key)
            .map(|c| c.classification.status)
    };
    assert_eq!(status_of("stator_temp_r_c"), Some(Status::Danger));
    assert_eq!(status_of("thrust_bearing_temp_c"), Some(Status::Warning));
    assert_eq!(status_of("frequency_hz"), Some(Status::Normal));

    let violations = hard_violations(&slot);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field, "stator_temp_r_c");
    assert_eq!(violations[0].value, Some(205.0));
    assert_eq!(violations[0].max, Some(200.0));
}

#[test]
fn test_suggested_severity() {
    assert_eq!(suggested_severity(Status::Danger), Severity::Critical);
    assert_eq!(suggested_severity(Status::Warning), Severity::High);
    assert_eq!(suggested_severity(Status::Normal), Severity::Medium);
}

#[test]
fn test_issue_prefill_from_reading() {
    let spec = lookup(LogKind::Generator, "stator_temp_r_c").unwrap();
    let pre = prefill("generator", spec, &FieldValue::Number(190.0));

    assert_eq!(pre.severity, Severity::High);
    assert_eq!(pre.location.module, "generator");
    assert_eq!(pre.location.section, "temperature");
    assert_eq!(pre.location.item, "Stator winding temperature R");
    assert_eq!(pre.location.unit.as_deref(), Some("°C"));
    assert_eq!(
        pre.description,
        "Stator winding temperature R reading 190 °C is outside ideal band 0..180"
    );
}

#[test]
fn test_catalogues_cover_the_log_forms() {
    assert_eq!(GENERATOR_FIELDS.len(), 46);
    assert_eq!(TRANSFORMER_FIELDS.len(), 40);

    for fields in [GENERATOR_FIELDS, TRANSFORMER_FIELDS] {
        let mut keys: Vec<_> = fields.iter().map(|f| f.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), fields.len(), "field keys must be unique");
    }
}
