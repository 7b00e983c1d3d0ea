use crate::calendar::{CalendarAlias, CalendarUid};
use crate::normalizer::{EventDto, EventNormalizer};
use crate::query::{EventQuery, TimeWindow};
use crate::storage::StoreError;

use super::{CalendarMetadata, CalendarMetadataMap, CalendarProvider, Collaborators, ProviderContext, VisibilityMap};

/// Organization-wide calendars that are not public.
pub struct SystemCalendarProvider<'a> {
    collaborators: Collaborators<'a>,
}

impl<'a> SystemCalendarProvider<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        Self { collaborators }
    }
}

impl CalendarProvider for SystemCalendarProvider<'_> {
    fn alias(&self) -> CalendarAlias {
        CalendarAlias::System
    }

    /// Lists every system calendar of the organization, not only the known
    /// ones.
    fn default_metadata(
        &self,
        context: &ProviderContext,
        _known_calendars: &[CalendarUid],
    ) -> Result<CalendarMetadataMap, StoreError> {
        let mut result = CalendarMetadataMap::new();
        if !self.collaborators.features.is_system_calendar_supported() {
            return Ok(result);
        }

        for calendar in self.collaborators.repository.system_calendars(context.organization_id)? {
            result.insert(
                CalendarUid::new(CalendarAlias::System, calendar.id),
                CalendarMetadata::new(CalendarAlias::System, calendar.name, false),
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
        if !self.collaborators.features.is_system_calendar_supported() {
            return Ok(Vec::new());
        }

        let query = EventQuery::builder(*window)
            .system(context.organization_id)
            .exclude_calendars(visibility.invisible_ids(CalendarAlias::System))
            .build();
        let events = self.collaborators.repository.find_events(&query)?;

        EventNormalizer::new(self.collaborators.authorizer, self.collaborators.reminders)
            .normalize_many(&events, Some(context.calendar_id))
    }
}
