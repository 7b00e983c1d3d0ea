use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::calendar_type::CalendarAlias;

/// Child events nest at most this many levels below a top-level event.
pub const MAX_CHILD_DEPTH: usize = 4;

/// The calendar an event is stored in. An event belongs to exactly one
/// personal calendar or exactly one system calendar, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarRef {
    Personal { id: i64 },
    System { id: i64, public: bool },
}

impl CalendarRef {
    pub fn id(&self) -> i64 {
        match self {
            CalendarRef::Personal { id } | CalendarRef::System { id, .. } => *id,
        }
    }

    pub fn alias(&self) -> CalendarAlias {
        match self {
            CalendarRef::Personal { .. } => CalendarAlias::User,
            CalendarRef::System { public: true, .. } => CalendarAlias::Public,
            CalendarRef::System { public: false, .. } => CalendarAlias::System,
        }
    }

    pub fn personal_id(&self) -> Option<i64> {
        match self {
            CalendarRef::Personal { id } => Some(*id),
            CalendarRef::System { .. } => None,
        }
    }

    pub fn system_id(&self) -> Option<i64> {
        match self {
            CalendarRef::Personal { .. } => None,
            CalendarRef::System { id, .. } => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    NotResponded,
    TentativelyAccepted,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::NotResponded => "not_responded",
            InvitationStatus::TentativelyAccepted => "tentatively_accepted",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_responded" => Some(InvitationStatus::NotResponded),
            "tentatively_accepted" => Some(InvitationStatus::TentativelyAccepted),
            "accepted" => Some(InvitationStatus::Accepted),
            "declined" => Some(InvitationStatus::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: i64,
    pub calendar: CalendarRef,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub background_color: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub parent_event_id: Option<i64>,
    pub invitation_status: Option<InvitationStatus>,
    /// Per-invitee copies of this event.
    pub child_events: Vec<CalendarEvent>,
    pub invited_users: Vec<i64>,
    pub notifiable: Option<bool>,
}

impl CalendarEvent {
    pub fn new(
        id: i64,
        calendar: CalendarRef,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            calendar,
            title: title.into(),
            description: None,
            start,
            end,
            all_day: false,
            background_color: None,
            created_at: None,
            updated_at: None,
            parent_event_id: None,
            invitation_status: None,
            child_events: Vec::new(),
            invited_users: Vec::new(),
            notifiable: None,
        }
    }

    pub fn add_child_event(&mut self, mut child: CalendarEvent) {
        child.parent_event_id = Some(self.id);
        self.child_events.push(child);
    }
}
