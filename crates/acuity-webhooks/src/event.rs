//! Static webhook event decoding.
//!
//! Acuity delivers static webhooks as `application/x-www-form-urlencoded`
//! bodies such as `action=scheduled&id=42&calendarID=7&appointmentTypeID=3`.
//! Decoding either yields a fully validated [`DecodedEvent`] or fails with
//! [`WebhookErrorCode::InvalidPayload`]; there is no partially valid event.
//!
//! [`WebhookErrorCode::InvalidPayload`]: crate::WebhookErrorCode::InvalidPayload

use crate::error::{WebhookError, WebhookResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Payload field naming the action.
pub const ACTION_FIELD: &str = "action";
/// Payload field carrying the appointment ID.
pub const ID_FIELD: &str = "id";
/// Payload field carrying the calendar ID.
pub const CALENDAR_ID_FIELD: &str = "calendarID";
/// Payload field carrying the appointment type ID.
pub const APPOINTMENT_TYPE_ID_FIELD: &str = "appointmentTypeID";

/// Resource family an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    /// Appointment lifecycle events.
    Appointment,
}

impl EventScope {
    /// The scope prefix used in event type tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appointment => "appointment",
        }
    }
}

/// Appointment lifecycle actions delivered by static webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    Scheduled,
    Rescheduled,
    Canceled,
    Changed,
}

impl AppointmentAction {
    /// Every supported action.
    pub const ALL: [AppointmentAction; 4] = [
        Self::Scheduled,
        Self::Rescheduled,
        Self::Canceled,
        Self::Changed,
    ];

    /// The action as it appears in the payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Rescheduled => "rescheduled",
            Self::Canceled => "canceled",
            Self::Changed => "changed",
        }
    }

    /// Fully-qualified event type for this action.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Scheduled => EventType::AppointmentScheduled,
            Self::Rescheduled => EventType::AppointmentRescheduled,
            Self::Canceled => EventType::AppointmentCanceled,
            Self::Changed => EventType::AppointmentChanged,
        }
    }
}

impl FromStr for AppointmentAction {
    type Err = WebhookError;

    /// Parse an action, matching the payload value exactly.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| {
                WebhookError::invalid_payload(format!(
                    "Unsupported static webhook action \"{}\".",
                    value
                ))
            })
    }
}

impl fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified event type, `<scope>.<action>` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    #[serde(rename = "appointment.scheduled")]
    AppointmentScheduled,
    #[serde(rename = "appointment.rescheduled")]
    AppointmentRescheduled,
    #[serde(rename = "appointment.canceled")]
    AppointmentCanceled,
    #[serde(rename = "appointment.changed")]
    AppointmentChanged,
}

impl EventType {
    /// The `<scope>.<action>` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppointmentScheduled => "appointment.scheduled",
            Self::AppointmentRescheduled => "appointment.rescheduled",
            Self::AppointmentCanceled => "appointment.canceled",
            Self::AppointmentChanged => "appointment.changed",
        }
    }

    /// Resource family of the event.
    pub fn scope(&self) -> EventScope {
        EventScope::Appointment
    }

    /// Action that produced the event.
    pub fn action(&self) -> AppointmentAction {
        match self {
            Self::AppointmentScheduled => AppointmentAction::Scheduled,
            Self::AppointmentRescheduled => AppointmentAction::Rescheduled,
            Self::AppointmentCanceled => AppointmentAction::Canceled,
            Self::AppointmentChanged => AppointmentAction::Changed,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated, validated static webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedEvent {
    pub scope: EventScope,
    pub action: AppointmentAction,
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Appointment ID.
    pub id: u64,

    #[serde(rename = "calendarID")]
    pub calendar_id: Option<u64>,

    #[serde(rename = "appointmentTypeID")]
    pub appointment_type_id: Option<u64>,

    /// Every decoded field, last occurrence winning for duplicate keys.
    pub payload: BTreeMap<String, String>,

    /// The body text the event was decoded from.
    pub raw_body: String,
}

impl DecodedEvent {
    /// Look up any decoded payload field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.payload.get(name).map(String::as_str)
    }
}

/// Decode a static webhook body.
///
/// # Errors
///
/// Returns [`WebhookErrorCode::InvalidPayload`] when the action is missing
/// or unsupported, or when `id` is missing or any ID field is not numeric.
///
/// [`WebhookErrorCode::InvalidPayload`]: crate::WebhookErrorCode::InvalidPayload
///
/// # Examples
///
/// ```rust
/// use acuity_webhooks::{decode_event, EventType};
///
/// let event = decode_event("action=scheduled&id=42&calendarID=7")?;
///
/// assert_eq!(event.event_type, EventType::AppointmentScheduled);
/// assert_eq!(event.id, 42);
/// assert_eq!(event.calendar_id, Some(7));
/// assert_eq!(event.appointment_type_id, None);
/// # Ok::<(), acuity_webhooks::WebhookError>(())
/// ```
pub fn decode_event(text: &str) -> WebhookResult<DecodedEvent> {
    let payload: BTreeMap<String, String> = url::form_urlencoded::parse(text.as_bytes())
        .into_owned()
        .collect();

    let action = payload
        .get(ACTION_FIELD)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            WebhookError::invalid_payload(format!(
                "Static webhook payload is missing \"{}\".",
                ACTION_FIELD
            ))
        })?
        .parse::<AppointmentAction>()?;

    let id = parse_required_numeric(&payload, ID_FIELD)?;
    let calendar_id = parse_optional_numeric(&payload, CALENDAR_ID_FIELD)?;
    let appointment_type_id = parse_optional_numeric(&payload, APPOINTMENT_TYPE_ID_FIELD)?;

    let event_type = action.event_type();
    Ok(DecodedEvent {
        scope: event_type.scope(),
        action,
        event_type,
        id,
        calendar_id,
        appointment_type_id,
        payload,
        raw_body: text.to_string(),
    })
}

/// Parse a numeric field that must be present.
///
/// # Errors
///
/// Fails with `InvalidPayload` when the field is absent or blank, or when
/// it is not a base-10 unsigned integer.
pub fn parse_required_numeric(
    payload: &BTreeMap<String, String>,
    field: &str,
) -> WebhookResult<u64> {
    parse_optional_numeric(payload, field)?.ok_or_else(|| {
        WebhookError::invalid_payload(format!(
            "Static webhook payload is missing \"{}\".",
            field
        ))
    })
}

/// Parse a numeric field that may be absent.
///
/// An absent or blank field yields `Ok(None)`. Only a plain run of ASCII
/// digits is accepted: signs and trailing text such as `42abc` are
/// rejected rather than truncated to their numeric prefix.
///
/// # Errors
///
/// Fails with `InvalidPayload` when the field is present but not a
/// base-10 unsigned integer.
pub fn parse_optional_numeric(
    payload: &BTreeMap<String, String>,
    field: &str,
) -> WebhookResult<Option<u64>> {
    let value = match payload.get(field).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };

    // `u64::from_str` accepts a leading '+', which is not a plain digit run.
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_numeric(field));
    }

    value.parse::<u64>().map(Some).map_err(|_| not_numeric(field))
}

fn not_numeric(field: &str) -> WebhookError {
    WebhookError::invalid_payload(format!(
        "Static webhook payload field \"{}\" must be numeric.",
        field
    ))
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
