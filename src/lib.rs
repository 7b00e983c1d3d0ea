pub mod aggregate;
pub mod api;
pub mod calendar;
pub mod manager;
pub mod normalizer;
pub mod provider;
pub mod query;
pub mod security;
pub mod storage;

pub use aggregate::{CalendarView, aggregate};
pub use api::{ApiError, CalendarService, ListEventsParams, ListEventsRequest, RequestError};
pub use calendar::{CalendarEvent, CalendarRef, CalendarUid};
pub use normalizer::{EventDto, EventNormalizer};
pub use provider::{CalendarProvider, CalendarSource, Collaborators, ProviderContext, VisibilityMap};
pub use query::TimeWindow;
