//! Calendar listings for the current session.

use serde::Serialize;

use crate::calendar::{CalendarEvent, CalendarReferenceResolver, ReferenceError};
use crate::security::Authorizer;
use crate::storage::{ConnectionView, EventRepository, GuestView, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemCalendarSummary {
    pub id: i64,
    pub name: String,
    pub public: bool,
}

pub struct CalendarEventManager<'a> {
    repository: &'a dyn EventRepository,
    authorizer: &'a dyn Authorizer,
}

impl<'a> CalendarEventManager<'a> {
    pub fn new(repository: &'a dyn EventRepository, authorizer: &'a dyn Authorizer) -> Self {
        Self { repository, authorizer }
    }

    /// Personal calendars of the current user in the current organization.
    /// Unnamed calendars take the user's full name.
    pub fn user_calendars(&self) -> Result<Vec<CalendarSummary>, StoreError> {
        let Some(user_id) = self.authorizer.current_user_id() else {
            return Ok(Vec::new());
        };

        let calendars = self
            .repository
            .user_calendars(self.authorizer.current_organization_id(), user_id)?;
        if calendars.is_empty() {
            return Ok(Vec::new());
        }

        let user = self.repository.find_user(user_id)?;
        Ok(calendars
            .into_iter()
            .map(|calendar| CalendarSummary {
                id: calendar.id,
                name: calendar.display_name(user.as_ref()),
            })
            .collect())
    }

    /// System calendars of the current organization followed by public ones.
    pub fn system_calendars(&self) -> Result<Vec<SystemCalendarSummary>, StoreError> {
        let mut calendars = self
            .repository
            .system_calendars(self.authorizer.current_organization_id())?;
        calendars.extend(self.repository.public_calendars()?);

        Ok(calendars
            .into_iter()
            .map(|calendar| SystemCalendarSummary {
                id: calendar.id,
                name: calendar.name,
                public: calendar.is_public,
            })
            .collect())
    }

    pub fn connections(&self, calendar_id: i64) -> Result<Vec<ConnectionView>, StoreError> {
        self.repository.connections(calendar_id)
    }

    pub fn guests(&self, parent_event_id: i64) -> Result<Vec<GuestView>, StoreError> {
        self.repository.guests(parent_event_id)
    }

    pub fn set_calendar(
        &self,
        event: &mut CalendarEvent,
        alias: &str,
        calendar_id: i64,
    ) -> Result<(), ReferenceError> {
        CalendarReferenceResolver::new(self.repository).attach_calendar(event, alias, calendar_id)
    }
}
