use serde::Serialize;

use crate::normalizer::EventDto;
use crate::provider::{CalendarMetadataMap, CalendarProvider, ProviderContext, VisibilityMap};
use crate::query::TimeWindow;
use crate::storage::StoreError;

/// Events and calendar metadata merged across every provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalendarView {
    pub events: Vec<EventDto>,
    pub calendars: CalendarMetadataMap,
}

/// Runs each provider in order. Metadata from later providers replaces
/// earlier entries for the same calendar; events are concatenated as-is.
pub fn aggregate<P: CalendarProvider>(
    providers: &[P],
    context: &ProviderContext,
    window: &TimeWindow,
    visibility: &VisibilityMap,
) -> Result<CalendarView, StoreError> {
    let known_calendars = visibility.known_calendars();
    let mut view = CalendarView::default();

    for provider in providers {
        view.calendars
            .extend(provider.default_metadata(context, &known_calendars)?);
    }

    for provider in providers {
        let events = provider.events(context, window, visibility)?;
        tracing::debug!("{} provider returned {} events", provider.alias(), events.len());
        view.events.extend(events);
    }

    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarAlias, CalendarEvent, CalendarRef, CalendarUid};
    use crate::normalizer::EventNormalizer;
    use crate::provider::{CalendarMetadata, Collaborators, standard_sources};
    use crate::security::{Capability, SessionAuthorizer};
    use crate::storage::repository::MockReminderStore;
    use crate::storage::{CalendarsConfig, fixtures};
    use pretty_assertions::assert_eq;

    /// A provider with canned output.
    struct StubProvider {
        alias: CalendarAlias,
        metadata: Vec<(CalendarUid, &'static str)>,
        events: Vec<EventDto>,
    }

    impl CalendarProvider for StubProvider {
        fn alias(&self) -> CalendarAlias {
            self.alias
        }

        fn default_metadata(
            &self,
            _context: &ProviderContext,
            _known_calendars: &[CalendarUid],
        ) -> Result<CalendarMetadataMap, StoreError> {
            let mut map = CalendarMetadataMap::new();
            for (uid, name) in &self.metadata {
                map.insert(*uid, CalendarMetadata::new(self.alias, *name, false));
            }
            Ok(map)
        }

        fn events(
            &self,
            _context: &ProviderContext,
            _window: &TimeWindow,
            _visibility: &VisibilityMap,
        ) -> Result<Vec<EventDto>, StoreError> {
            Ok(self.events.clone())
        }
    }

    fn context() -> ProviderContext {
        ProviderContext {
            organization_id: Some(1),
            user_id: Some(fixtures::ADA),
            calendar_id: fixtures::ADA_CALENDAR,
        }
    }

    fn dto(id: i64) -> EventDto {
        let authorizer = SessionAuthorizer::new(None, None, []);
        let mut reminders = MockReminderStore::new();
        reminders
            .expect_find_reminders_by_entities()
            .returning(|_, _| Ok(Vec::new()));
        let event = CalendarEvent::new(
            id,
            CalendarRef::Personal { id: 1 },
            "stub",
            fixtures::at(9, 0),
            fixtures::at(10, 0),
        );
        EventNormalizer::new(&authorizer, &reminders)
            .normalize(&event, None)
            .unwrap()
    }

    #[test]
    fn events_are_concatenated_in_provider_order() {
        let providers = vec![
            StubProvider { alias: CalendarAlias::User, metadata: vec![], events: vec![dto(3), dto(1)] },
            StubProvider { alias: CalendarAlias::System, metadata: vec![], events: vec![dto(2)] },
            StubProvider { alias: CalendarAlias::Public, metadata: vec![], events: vec![dto(1)] },
        ];

        let view = aggregate(&providers, &context(), &fixtures::window(), &VisibilityMap::new()).unwrap();

        let ids: Vec<i64> = view.events.iter().map(|event| event.id).collect();
        assert_eq!(ids, vec![3, 1, 2, 1]);
    }

    #[test]
    fn last_provider_wins_on_metadata_collision() {
        let shared = CalendarUid::new(CalendarAlias::System, 7);
        let providers = vec![
            StubProvider {
                alias: CalendarAlias::System,
                metadata: vec![(shared, "first"), (CalendarUid::new(CalendarAlias::System, 8), "other")],
                events: vec![],
            },
            StubProvider { alias: CalendarAlias::System, metadata: vec![(shared, "second")], events: vec![] },
        ];

        let view = aggregate(&providers, &context(), &fixtures::window(), &VisibilityMap::new()).unwrap();

        let keys: Vec<String> = view.calendars.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["system_7", "system_8"]);
        assert_eq!(view.calendars.get(&shared).unwrap().calendar_name, "second");
    }

    #[test]
    fn standard_sources_merge_every_calendar_kind() {
        let store = fixtures::seeded_store();
        let authorizer = SessionAuthorizer::new(
            Some(1),
            Some(fixtures::ADA),
            [Capability::ViewConnections, Capability::UpdateEvents, Capability::DeleteEvents],
        );
        let features = CalendarsConfig {
            personal_enabled: true,
            system_enabled: true,
            public_enabled: true,
        };
        let providers = standard_sources(Collaborators {
            repository: &store,
            authorizer: &authorizer,
            reminders: &store,
            features: &features,
        });
        let visibility: VisibilityMap = [(CalendarUid::new(CalendarAlias::User, fixtures::GRACE_CALENDAR), true)]
            .into_iter()
            .collect();

        let view = aggregate(&providers, &context(), &fixtures::window(), &visibility).unwrap();

        let ids: Vec<i64> = view.events.iter().map(|event| event.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 6]);
        let keys: Vec<String> = view.calendars.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["user_123", "user_456", "system_10", "public_20"]);
    }

    #[test]
    fn disabled_kind_is_invisible_to_the_aggregate() {
        let store = fixtures::seeded_store();
        let authorizer = SessionAuthorizer::new(Some(1), Some(fixtures::ADA), []);
        let features = CalendarsConfig {
            personal_enabled: true,
            system_enabled: true,
            public_enabled: false,
        };
        let providers = standard_sources(Collaborators {
            repository: &store,
            authorizer: &authorizer,
            reminders: &store,
            features: &features,
        });

        let view = aggregate(&providers, &context(), &fixtures::window(), &VisibilityMap::new()).unwrap();

        assert!(view.events.iter().all(|event| event.calendar_alias != CalendarAlias::Public));
        assert!(view.calendars.keys().all(|uid| uid.alias != CalendarAlias::Public));
    }
}
