//! Tests for static webhook event decoding.

use super::*;
use crate::error::WebhookErrorCode;

fn payload(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// Action classification
// ============================================================================

#[test]
fn test_every_action_maps_to_its_event_type() {
    let expected = [
        (AppointmentAction::Scheduled, "appointment.scheduled"),
        (AppointmentAction::Rescheduled, "appointment.rescheduled"),
        (AppointmentAction::Canceled, "appointment.canceled"),
        (AppointmentAction::Changed, "appointment.changed"),
    ];

    for (action, tag) in expected {
        let event_type = action.event_type();
        assert_eq!(event_type.as_str(), tag);
        assert_eq!(event_type.action(), action);
        assert_eq!(event_type.scope(), EventScope::Appointment);
        assert_eq!(action.as_str().parse::<AppointmentAction>().unwrap(), action);
    }
}

#[test]
fn test_unknown_action_is_rejected() {
    let error = "bogus".parse::<AppointmentAction>().unwrap_err();

    assert_eq!(error.code(), WebhookErrorCode::InvalidPayload);
    assert!(error.message().contains("Unsupported static webhook action \"bogus\""));
}

#[test]
fn test_action_matching_is_case_sensitive() {
    assert!("Scheduled".parse::<AppointmentAction>().is_err());
}

// ============================================================================
// Numeric fields
// ============================================================================

#[test]
fn test_parse_required_numeric() {
    let fields = payload(&[("id", " 42 "), ("blank", "  ")]);

    assert_eq!(parse_required_numeric(&fields, "id").unwrap(), 42);

    let missing = parse_required_numeric(&fields, "other").unwrap_err();
    assert_eq!(missing.code(), WebhookErrorCode::InvalidPayload);
    assert!(missing.message().contains("missing \"other\""));

    let blank = parse_required_numeric(&fields, "blank").unwrap_err();
    assert!(blank.message().contains("missing \"blank\""));
}

#[test]
fn test_parse_optional_numeric() {
    let fields = payload(&[("calendarID", "7"), ("blank", "")]);

    assert_eq!(parse_optional_numeric(&fields, "calendarID").unwrap(), Some(7));
    assert_eq!(parse_optional_numeric(&fields, "absent").unwrap(), None);
    assert_eq!(parse_optional_numeric(&fields, "blank").unwrap(), None);
}

#[test]
fn test_non_numeric_values_are_rejected() {
    for value in ["abc", "12abc", "-3", "+3", "1.5", "99999999999999999999999"] {
        let fields = payload(&[("calendarID", value)]);

        let error = parse_optional_numeric(&fields, "calendarID").unwrap_err();

        assert_eq!(error.code(), WebhookErrorCode::InvalidPayload);
        assert!(
            error.message().contains("\"calendarID\" must be numeric"),
            "unexpected message for {:?}: {}",
            value,
            error
        );
    }
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_decode_scheduled_event() {
    let body = "action=scheduled&id=42&calendarID=7";

    let event = decode_event(body).expect("valid payload");

    assert_eq!(event.scope, EventScope::Appointment);
    assert_eq!(event.action, AppointmentAction::Scheduled);
    assert_eq!(event.event_type, EventType::AppointmentScheduled);
    assert_eq!(event.id, 42);
    assert_eq!(event.calendar_id, Some(7));
    assert_eq!(event.appointment_type_id, None);
    assert_eq!(event.raw_body, body);
    assert_eq!(event.payload.len(), 3);
    assert_eq!(event.field("calendarID"), Some("7"));
}

#[test]
fn test_decode_all_identifiers() {
    let event = decode_event("action=rescheduled&id=1&calendarID=2&appointmentTypeID=3").unwrap();

    assert_eq!(event.event_type, EventType::AppointmentRescheduled);
    assert_eq!(event.id, 1);
    assert_eq!(event.calendar_id, Some(2));
    assert_eq!(event.appointment_type_id, Some(3));
}

#[test]
fn test_decode_missing_id() {
    let error = decode_event("action=scheduled").unwrap_err();

    assert_eq!(error.code(), WebhookErrorCode::InvalidPayload);
    assert!(error.message().contains("missing \"id\""));
}

#[test]
fn test_decode_unknown_action() {
    let error = decode_event("action=bogus&id=1").unwrap_err();

    assert_eq!(error.code(), WebhookErrorCode::InvalidPayload);
    assert!(error.message().contains("Unsupported static webhook action"));
}

#[test]
fn test_decode_missing_or_blank_action() {
    for body in ["id=1", "action=&id=1", "action=%20%20&id=1", ""] {
        let error = decode_event(body).unwrap_err();

        assert_eq!(error.code(), WebhookErrorCode::InvalidPayload);
        assert!(error.message().contains("missing \"action\""), "{}", body);
    }
}

#[test]
fn test_decode_trims_action() {
    let event = decode_event("action=+canceled+&id=9").unwrap();

    assert_eq!(event.event_type, EventType::AppointmentCanceled);
}

#[test]
fn test_decode_non_numeric_id() {
    let error = decode_event("action=changed&id=abc").unwrap_err();

    assert!(error.message().contains("\"id\" must be numeric"));
}

#[test]
fn test_decode_non_numeric_optional_field_fails() {
    let error = decode_event("action=changed&id=5&appointmentTypeID=x").unwrap_err();

    assert!(error.message().contains("\"appointmentTypeID\" must be numeric"));
}

#[test]
fn test_decode_percent_decodes_and_keeps_extra_fields() {
    let event = decode_event("action=changed&id=5&note=Hello%2C+world%21&email=a%40b.com").unwrap();

    assert_eq!(event.field("note"), Some("Hello, world!"));
    assert_eq!(event.field("email"), Some("a@b.com"));
}

#[test]
fn test_decode_last_duplicate_wins() {
    let event = decode_event("action=scheduled&id=1&id=2&note=a&note=b").unwrap();

    assert_eq!(event.id, 2);
    assert_eq!(event.field("note"), Some("b"));
}

#[test]
fn test_decoded_event_serializes_with_wire_names() {
    let event = decode_event("action=canceled&id=9&calendarID=4").unwrap();

    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(json["type"], "appointment.canceled");
    assert_eq!(json["scope"], "appointment");
    assert_eq!(json["action"], "canceled");
    assert_eq!(json["id"], 9);
    assert_eq!(json["calendarID"], 4);
    assert!(json["appointmentTypeID"].is_null());
    assert_eq!(json["payload"]["calendarID"], "4");
    assert_eq!(json["raw_body"], "action=canceled&id=9&calendarID=4");
}
