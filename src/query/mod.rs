pub mod filter;
pub mod scope;
pub mod window;

pub use filter::{EventQuery, EventQueryBuilder, EventSource, SqlClause};
pub use scope::CalendarScopeResolver;
pub use window::{TimeWindow, overlap_clause};
