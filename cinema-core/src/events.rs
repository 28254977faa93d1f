use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::repository::Document;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    Created,
    Confirmed,
    Cancelled,
    #[serde(rename = "Checked_In")]
    CheckedIn,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Created,
        EventType::Confirmed,
        EventType::Cancelled,
        EventType::CheckedIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "Created",
            EventType::Confirmed => "Confirmed",
            EventType::Cancelled => "Cancelled",
            EventType::CheckedIn => "Checked_In",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Where a reservation event was recorded from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    #[default]
    Web,
    Mobile,
    System,
}

impl EventSource {
    pub const ALL: [EventSource; 3] = [EventSource::Web, EventSource::Mobile, EventSource::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Web => "Web",
            EventSource::Mobile => "Mobile",
            EventSource::System => "System",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// One lifecycle transition recorded in the event log.
///
/// `reservation_id` is a plain string: nothing checks that it names an
/// existing reservation, and nothing orders events against reservation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationEvent {
    pub id: String,
    pub reservation_id: String,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default)]
    pub source: EventSource,
    pub note: String,
    pub created_at: NaiveDate,
}

impl Document for ReservationEvent {
    const COLLECTION: &'static str = "reservation_events";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_in_keeps_its_underscore() {
        assert_eq!(
            serde_json::to_value(EventType::CheckedIn).unwrap(),
            serde_json::json!("Checked_In")
        );
        assert_eq!("Checked_In".parse::<EventType>(), Ok(EventType::CheckedIn));
        assert!("CheckedIn".parse::<EventType>().is_err());
    }

    #[test]
    fn stored_event_without_enums_uses_defaults() {
        let event: ReservationEvent = serde_json::from_value(serde_json::json!({
            "id": "e1",
            "reservation_id": "7",
            "note": "walk-in",
            "created_at": "2024-05-01"
        }))
        .unwrap();

        assert_eq!(event.event_type, EventType::Created);
        assert_eq!(event.source, EventSource::Web);
        assert_eq!(serde_json::to_value(&event).unwrap()["created_at"], "2024-05-01");
    }
}
