//! Calendar sources contributing metadata and events to a calendar view.
//!
//! Each source covers one storage category of calendar. Sources are
//! registered in a fixed order (personal, system, public) and a disabled
//! category contributes nothing.

pub mod personal;
pub mod public;
pub mod system;

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::calendar::{CalendarAlias, CalendarUid};
use crate::normalizer::EventDto;
use crate::query::TimeWindow;
use crate::security::Authorizer;
use crate::storage::{EventRepository, FeatureFlags, ReminderStore, StoreError};

pub use personal::PersonalCalendarProvider;
pub use public::PublicCalendarProvider;
pub use system::SystemCalendarProvider;

/// Display defaults for one calendar.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMetadata {
    pub calendar_name: String,
    pub removable: bool,
    pub position: i32,
}

impl CalendarMetadata {
    pub fn new(alias: CalendarAlias, calendar_name: impl Into<String>, removable: bool) -> Self {
        Self {
            calendar_name: calendar_name.into(),
            removable,
            position: alias.default_position(),
        }
    }
}

/// Calendar metadata in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarMetadataMap {
    entries: Vec<(CalendarUid, CalendarMetadata)>,
}

impl CalendarMetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an existing entry in place, so a calendar keeps the position
    /// of its first insertion.
    pub fn insert(&mut self, uid: CalendarUid, metadata: CalendarMetadata) {
        match self.entries.iter_mut().find(|(key, _)| *key == uid) {
            Some((_, existing)) => *existing = metadata,
            None => self.entries.push((uid, metadata)),
        }
    }

    pub fn extend(&mut self, other: CalendarMetadataMap) {
        for (uid, metadata) in other.entries {
            self.insert(uid, metadata);
        }
    }

    pub fn get(&self, uid: &CalendarUid) -> Option<&CalendarMetadata> {
        self.entries
            .iter()
            .find(|(key, _)| key == uid)
            .map(|(_, metadata)| metadata)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CalendarUid> {
        self.entries.iter().map(|(uid, _)| uid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CalendarMetadataMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (uid, metadata) in &self.entries {
            map.serialize_entry(uid, metadata)?;
        }
        map.end()
    }
}

/// Per-calendar display switch. Calendars mapped to `false` are left out of
/// event results; absent calendars are visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityMap {
    entries: BTreeMap<CalendarUid, bool>,
}

impl VisibilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, uid: CalendarUid, visible: bool) {
        self.entries.insert(uid, visible);
    }

    pub fn invisible_ids(&self, alias: CalendarAlias) -> Vec<i64> {
        self.entries
            .iter()
            .filter(|(uid, visible)| uid.alias == alias && !**visible)
            .map(|(uid, _)| uid.id)
            .collect()
    }

    pub fn known_calendars(&self) -> Vec<CalendarUid> {
        self.entries.keys().copied().collect()
    }
}

impl FromIterator<(CalendarUid, bool)> for VisibilityMap {
    fn from_iter<I: IntoIterator<Item = (CalendarUid, bool)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Who is asking, and from which calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderContext {
    pub organization_id: Option<i64>,
    pub user_id: Option<i64>,
    pub calendar_id: i64,
}

/// The read-only collaborators every provider draws on.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub repository: &'a dyn EventRepository,
    pub authorizer: &'a dyn Authorizer,
    pub reminders: &'a dyn ReminderStore,
    pub features: &'a dyn FeatureFlags,
}

pub trait CalendarProvider {
    fn alias(&self) -> CalendarAlias;

    fn default_metadata(
        &self,
        context: &ProviderContext,
        known_calendars: &[CalendarUid],
    ) -> Result<CalendarMetadataMap, StoreError>;

    fn events(
        &self,
        context: &ProviderContext,
        window: &TimeWindow,
        visibility: &VisibilityMap,
    ) -> Result<Vec<EventDto>, StoreError>;
}

pub enum CalendarSource<'a> {
    Personal(PersonalCalendarProvider<'a>),
    System(SystemCalendarProvider<'a>),
    Public(PublicCalendarProvider<'a>),
}

impl<'a> CalendarSource<'a> {
    fn provider(&self) -> &dyn CalendarProvider {
        match self {
            CalendarSource::Personal(provider) => provider,
            CalendarSource::System(provider) => provider,
            CalendarSource::Public(provider) => provider,
        }
    }
}

impl CalendarProvider for CalendarSource<'_> {
    fn alias(&self) -> CalendarAlias {
        self.provider().alias()
    }

    fn default_metadata(
        &self,
        context: &ProviderContext,
        known_calendars: &[CalendarUid],
    ) -> Result<CalendarMetadataMap, StoreError> {
        self.provider().default_metadata(context, known_calendars)
    }

    fn events(
        &self,
        context: &ProviderContext,
        window: &TimeWindow,
        visibility: &VisibilityMap,
    ) -> Result<Vec<EventDto>, StoreError> {
        self.provider().events(context, window, visibility)
    }
}

/// Every source in registration order.
pub fn standard_sources(collaborators: Collaborators<'_>) -> Vec<CalendarSource<'_>> {
    vec![
        CalendarSource::Personal(PersonalCalendarProvider::new(collaborators)),
        CalendarSource::System(SystemCalendarProvider::new(collaborators)),
        CalendarSource::Public(PublicCalendarProvider::new(collaborators)),
    ]
}
