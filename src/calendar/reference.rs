use thiserror::Error;

use crate::storage::{CalendarLookup, StoreError};

use super::calendar_type::CalendarAlias;
use super::event::{CalendarEvent, CalendarRef};
use super::uid::{UidError, decode_uid};

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Unexpected calendar alias: \"{alias}\". CalendarId: {calendar_id}.")]
    UnexpectedAlias { alias: String, calendar_id: i64 },
    #[error("Calendar {alias}_{calendar_id} not found")]
    CalendarNotFound { alias: CalendarAlias, calendar_id: i64 },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Uid(#[from] UidError),
}

/// Points events at the calendar named by an alias and id.
pub struct CalendarReferenceResolver<'a, L: CalendarLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: CalendarLookup + ?Sized> CalendarReferenceResolver<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    pub fn attach_calendar(
        &self,
        event: &mut CalendarEvent,
        alias: &str,
        calendar_id: i64,
    ) -> Result<(), ReferenceError> {
        let alias = CalendarAlias::parse(alias).ok_or_else(|| ReferenceError::UnexpectedAlias {
            alias: alias.to_string(),
            calendar_id,
        })?;

        match alias {
            CalendarAlias::User => {
                if event.calendar.personal_id() == Some(calendar_id) {
                    return Ok(());
                }
                let calendar = self
                    .lookup
                    .find_calendar(calendar_id)?
                    .ok_or(ReferenceError::CalendarNotFound { alias, calendar_id })?;
                event.calendar = CalendarRef::Personal { id: calendar.id };
            }
            CalendarAlias::System | CalendarAlias::Public => {
                let calendar = self
                    .lookup
                    .find_system_calendar(calendar_id)?
                    .ok_or(ReferenceError::CalendarNotFound { alias, calendar_id })?;
                event.calendar = CalendarRef::System {
                    id: calendar.id,
                    public: calendar.is_public,
                };
            }
        }

        tracing::debug!("Event {} attached to calendar {}", event.id, event.calendar.id());
        Ok(())
    }

    pub fn attach_by_uid(&self, event: &mut CalendarEvent, uid: &str) -> Result<(), ReferenceError> {
        let (alias, calendar_id) = decode_uid(uid)?;
        self.attach_calendar(event, &alias, calendar_id)
    }
}
