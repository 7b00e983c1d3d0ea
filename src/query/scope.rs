use std::collections::BTreeSet;

use crate::security::{Authorizer, Capability};
use crate::storage::{EventRepository, StoreError};

/// Expands a calendar id into the calendar ids a query should read.
pub struct CalendarScopeResolver<'a> {
    repository: &'a dyn EventRepository,
    authorizer: &'a dyn Authorizer,
}

impl<'a> CalendarScopeResolver<'a> {
    pub fn new(repository: &'a dyn EventRepository, authorizer: &'a dyn Authorizer) -> Self {
        Self { repository, authorizer }
    }

    /// Without the view-connections capability the scope silently narrows
    /// to the calendar itself.
    pub fn resolve_scope(&self, calendar_id: i64, include_connected: bool) -> Result<BTreeSet<i64>, StoreError> {
        let mut scope = BTreeSet::from([calendar_id]);

        if !include_connected {
            return Ok(scope);
        }

        if !self.authorizer.has_capability(Capability::ViewConnections) {
            tracing::debug!(
                "Connections of calendar {} not viewable, narrowing scope",
                calendar_id
            );
            return Ok(scope);
        }

        scope.extend(self.repository.connected_calendar_ids(calendar_id)?);
        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::SessionAuthorizer;
    use crate::storage::fixtures;

    #[test]
    fn without_connections_scope_is_calendar_itself() {
        let store = fixtures::seeded_store();
        let authorizer = SessionAuthorizer::new(Some(1), Some(1), [Capability::ViewConnections]);
        let resolver = CalendarScopeResolver::new(&store, &authorizer);

        let scope = resolver.resolve_scope(fixtures::ADA_CALENDAR, false).unwrap();

        assert_eq!(scope, BTreeSet::from([fixtures::ADA_CALENDAR]));
    }

    #[test]
    fn connected_calendars_join_the_scope() {
        let store = fixtures::seeded_store();
        let authorizer = SessionAuthorizer::new(Some(1), Some(1), [Capability::ViewConnections]);
        let resolver = CalendarScopeResolver::new(&store, &authorizer);

        let scope = resolver.resolve_scope(fixtures::ADA_CALENDAR, true).unwrap();

        assert_eq!(
            scope,
            BTreeSet::from([fixtures::ADA_CALENDAR, fixtures::GRACE_CALENDAR])
        );
    }

    #[test]
    fn denied_connections_capability_fails_open_to_own_calendar() {
        let store = fixtures::seeded_store();
        let authorizer = SessionAuthorizer::new(Some(1), Some(1), []);
        let resolver = CalendarScopeResolver::new(&store, &authorizer);

        let scope = resolver.resolve_scope(fixtures::ADA_CALENDAR, true).unwrap();

        assert_eq!(scope, BTreeSet::from([fixtures::ADA_CALENDAR]));
    }
}
