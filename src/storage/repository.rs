use serde::Serialize;
use thiserror::Error;

use crate::calendar::{Calendar, CalendarEvent, InvitationStatus, ReminderRecord, SystemCalendar, User};
use crate::query::EventQuery;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

/// A connection from a calendar to another calendar it watches, joined with
/// the connected calendar's name and owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionView {
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub visible: bool,
    pub calendar: i64,
    pub calendar_name: Option<String>,
    pub owner: i64,
    pub owner_first_name: Option<String>,
    pub owner_last_name: Option<String>,
}

/// An invitee's copy of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestView {
    pub id: i64,
    pub invitation_status: Option<InvitationStatus>,
    pub email: String,
    pub user_full_name: String,
}

#[cfg_attr(test, mockall::automock)]
pub trait CalendarLookup {
    fn find_calendar(&self, calendar_id: i64) -> Result<Option<Calendar>, StoreError>;
    fn find_system_calendar(&self, calendar_id: i64) -> Result<Option<SystemCalendar>, StoreError>;
}

/// Read side of the event store.
pub trait EventRepository: CalendarLookup {
    /// Events matching `query`, each with its child events and invitees loaded.
    fn find_events(&self, query: &EventQuery) -> Result<Vec<CalendarEvent>, StoreError>;
    fn connected_calendar_ids(&self, calendar_id: i64) -> Result<Vec<i64>, StoreError>;
    fn connections(&self, calendar_id: i64) -> Result<Vec<ConnectionView>, StoreError>;
    fn find_calendars(&self, calendar_ids: &[i64]) -> Result<Vec<Calendar>, StoreError>;
    fn find_user(&self, user_id: i64) -> Result<Option<User>, StoreError>;
    fn user_calendars(&self, organization_id: Option<i64>, user_id: i64) -> Result<Vec<Calendar>, StoreError>;
    /// Non-public system calendars of one organization.
    fn system_calendars(&self, organization_id: Option<i64>) -> Result<Vec<SystemCalendar>, StoreError>;
    fn public_calendars(&self) -> Result<Vec<SystemCalendar>, StoreError>;
    fn guests(&self, parent_event_id: i64) -> Result<Vec<GuestView>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ReminderStore {
    fn find_reminders_by_entities(
        &self,
        entity_ids: &[i64],
        entity_kind: &str,
    ) -> Result<Vec<ReminderRecord>, StoreError>;
}
