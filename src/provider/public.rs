use crate::calendar::{CalendarAlias, CalendarUid};
use crate::normalizer::{EventDto, EventNormalizer};
use crate::query::{EventQuery, TimeWindow};
use crate::storage::StoreError;

use super::{CalendarMetadata, CalendarMetadataMap, CalendarProvider, Collaborators, ProviderContext, VisibilityMap};

/// Calendars shared across organizations.
pub struct PublicCalendarProvider<'a> {
    collaborators: Collaborators<'a>,
}

impl<'a> PublicCalendarProvider<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        Self { collaborators }
    }
}

impl CalendarProvider for PublicCalendarProvider<'_> {
    fn alias(&self) -> CalendarAlias {
        CalendarAlias::Public
    }

    fn default_metadata(
        &self,
        _context: &ProviderContext,
        _known_calendars: &[CalendarUid],
    ) -> Result<CalendarMetadataMap, StoreError> {
        let mut result = CalendarMetadataMap::new();
        if !self.collaborators.features.is_public_calendar_supported() {
            return Ok(result);
        }

        for calendar in self.collaborators.repository.public_calendars()? {
            result.insert(
                CalendarUid::new(CalendarAlias::Public, calendar.id),
                CalendarMetadata::new(CalendarAlias::Public, calendar.name, false),
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
        if !self.collaborators.features.is_public_calendar_supported() {
            return Ok(Vec::new());
        }

        let query = EventQuery::builder(*window)
            .public()
            .exclude_calendars(visibility.invisible_ids(CalendarAlias::Public))
            .build();
        let events = self.collaborators.repository.find_events(&query)?;

        EventNormalizer::new(self.collaborators.authorizer, self.collaborators.reminders)
            .normalize_many(&events, Some(context.calendar_id))
    }
}
