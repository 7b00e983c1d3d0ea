use serde::{Deserialize, Serialize};

/// Entity kind under which calendar event reminders are stored.
pub const CALENDAR_EVENT_ENTITY: &str = "calendar_event";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderMethod {
    Email,
    WebSocket,
}

impl ReminderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderMethod::Email => "email",
            ReminderMethod::WebSocket => "web_socket",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "email" => Some(ReminderMethod::Email),
            "web_socket" => Some(ReminderMethod::WebSocket),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalUnit {
    #[serde(rename = "M")]
    Minute,
    #[serde(rename = "H")]
    Hour,
    #[serde(rename = "D")]
    Day,
    #[serde(rename = "W")]
    Week,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Minute => "M",
            IntervalUnit::Hour => "H",
            IntervalUnit::Day => "D",
            IntervalUnit::Week => "W",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "M" => Some(IntervalUnit::Minute),
            "H" => Some(IntervalUnit::Hour),
            "D" => Some(IntervalUnit::Day),
            "W" => Some(IntervalUnit::Week),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderInterval {
    pub number: u32,
    pub unit: IntervalUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub interval: ReminderInterval,
}

/// A reminder together with the id of the entity it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderRecord {
    pub related_entity_id: i64,
    pub reminder: Reminder,
}
