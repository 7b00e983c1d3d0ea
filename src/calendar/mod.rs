pub mod calendar_type;
pub mod event;
pub mod reference;
pub mod reminder;
pub mod uid;

pub use calendar_type::{Calendar, CalendarAlias, CalendarConnection, SystemCalendar, User};
pub use event::{CalendarEvent, CalendarRef, InvitationStatus, MAX_CHILD_DEPTH};
pub use reference::{CalendarReferenceResolver, ReferenceError};
pub use reminder::{
    CALENDAR_EVENT_ENTITY, IntervalUnit, Reminder, ReminderInterval, ReminderMethod, ReminderRecord,
};
pub use uid::{CalendarUid, UidError, decode_uid, encode_uid};
