use std::collections::HashMap;

use crate::calendar::{CalendarAlias, CalendarUid, User};
use crate::normalizer::{EventDto, EventNormalizer};
use crate::query::{CalendarScopeResolver, EventQuery, TimeWindow};
use crate::storage::StoreError;

use super::{CalendarMetadata, CalendarMetadataMap, CalendarProvider, Collaborators, ProviderContext, VisibilityMap};

/// The requesting calendar and the personal calendars connected to it.
pub struct PersonalCalendarProvider<'a> {
    collaborators: Collaborators<'a>,
}

impl<'a> PersonalCalendarProvider<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        Self { collaborators }
    }

    fn enabled(&self) -> bool {
        self.collaborators.features.is_personal_calendar_supported()
    }
}

impl CalendarProvider for PersonalCalendarProvider<'_> {
    fn alias(&self) -> CalendarAlias {
        CalendarAlias::User
    }

    fn default_metadata(
        &self,
        context: &ProviderContext,
        known_calendars: &[CalendarUid],
    ) -> Result<CalendarMetadataMap, StoreError> {
        let mut result = CalendarMetadataMap::new();
        if !self.enabled() {
            return Ok(result);
        }

        let mut ids = vec![context.calendar_id];
        ids.extend(
            known_calendars
                .iter()
                .filter(|uid| uid.alias == CalendarAlias::User && uid.id != context.calendar_id)
                .map(|uid| uid.id),
        );

        let repository = self.collaborators.repository;
        let mut owners: HashMap<i64, Option<User>> = HashMap::new();
        for calendar in repository.find_calendars(&ids)? {
            if !owners.contains_key(&calendar.owner_id) {
                owners.insert(calendar.owner_id, repository.find_user(calendar.owner_id)?);
            }
            let owner = owners.get(&calendar.owner_id).and_then(Option::as_ref);

            result.insert(
                CalendarUid::new(CalendarAlias::User, calendar.id),
                CalendarMetadata::new(
                    CalendarAlias::User,
                    calendar.display_name(owner),
                    calendar.id != context.calendar_id,
                ),
            );
        }

        Ok(result)
    }

    fn events(
        &self,
        context: &ProviderContext,
        window: &TimeWindow,
        visibility: &VisibilityMap,
    ) -> Result<Vec<EventDto>, StoreError> {
        if !self.enabled() {
            return Ok(Vec::new());
        }

        let Collaborators { repository, authorizer, reminders, .. } = self.collaborators;
        let scope = CalendarScopeResolver::new(repository, authorizer).resolve_scope(context.calendar_id, true)?;
        let query = EventQuery::builder(*window)
            .personal(scope)
            .exclude_calendars(visibility.invisible_ids(CalendarAlias::User))
            .build();

        let events = repository.find_events(&query)?;
        EventNormalizer::new(authorizer, reminders).normalize_many(&events, Some(context.calendar_id))
    }
}
