pub mod config;
pub mod repository;
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::{CalendarsConfig, Config, ConfigError, FeatureFlags};
pub use repository::{CalendarLookup, ConnectionView, EventRepository, GuestView, ReminderStore, StoreError};
pub use store::SqliteStore;
