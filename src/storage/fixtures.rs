//! Seeded in-memory store shared by unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::calendar::{
    CALENDAR_EVENT_ENTITY, Calendar, CalendarConnection, CalendarEvent, CalendarRef, IntervalUnit,
    InvitationStatus, Reminder, ReminderInterval, ReminderMethod, ReminderRecord, SystemCalendar, User,
};
use crate::query::TimeWindow;

use super::SqliteStore;

pub const ADA: i64 = 1;
pub const GRACE: i64 = 2;

pub const ADA_CALENDAR: i64 = 123;
pub const GRACE_CALENDAR: i64 = 456;
pub const EMPTY_CALENDAR: i64 = 789;

pub const SYSTEM_CALENDAR: i64 = 10;
pub const OTHER_ORG_SYSTEM_CALENDAR: i64 = 11;
pub const PUBLIC_CALENDAR: i64 = 20;

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, hour, minute, 0).unwrap()
}

pub fn window() -> TimeWindow {
    TimeWindow::new(at(0, 0), Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap())
}

pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 12, 20, 9, 30, 0).unwrap()
}

pub fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    seed(&store);
    store
}

pub fn seed(store: &SqliteStore) {
    store
        .store_user(&User {
            id: ADA,
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            email: "ada@example.com".to_string(),
        })
        .unwrap();
    store
        .store_user(&User {
            id: GRACE,
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
            email: "grace@example.com".to_string(),
        })
        .unwrap();

    for (id, owner_id, name) in [
        (ADA_CALENDAR, ADA, None),
        (GRACE_CALENDAR, GRACE, Some("Compilers")),
        (EMPTY_CALENDAR, ADA, Some("Scratch")),
    ] {
        store
            .store_calendar(&Calendar {
                id,
                organization_id: Some(1),
                owner_id,
                name: name.map(str::to_string),
            })
            .unwrap();
    }

    store
        .store_connection(&CalendarConnection {
            id: 1,
            calendar_id: ADA_CALENDAR,
            connected_calendar_id: GRACE_CALENDAR,
            color: Some("#ffffff".to_string()),
            background_color: Some("#4986e7".to_string()),
            visible: true,
            created_at: created_at(),
        })
        .unwrap();

    for (id, organization_id, name, is_public) in [
        (SYSTEM_CALENDAR, Some(1), "Company", false),
        (OTHER_ORG_SYSTEM_CALENDAR, Some(2), "Other company", false),
        (PUBLIC_CALENDAR, None, "Holidays", true),
    ] {
        store
            .store_system_calendar(&SystemCalendar {
                id,
                organization_id,
                name: name.to_string(),
                is_public,
                background_color: None,
            })
            .unwrap();
    }

    let mut planning = CalendarEvent::new(
        1,
        CalendarRef::Personal { id: ADA_CALENDAR },
        "Planning",
        at(10, 0),
        at(11, 0),
    );
    planning.invited_users = vec![GRACE];
    let mut invitation = CalendarEvent::new(
        2,
        CalendarRef::Personal { id: GRACE_CALENDAR },
        "Planning",
        at(10, 0),
        at(11, 0),
    );
    invitation.invitation_status = Some(InvitationStatus::NotResponded);
    planning.add_child_event(invitation);
    store.store_event(&planning).unwrap();

    let mut review = CalendarEvent::new(
        3,
        CalendarRef::Personal { id: GRACE_CALENDAR },
        "Review",
        at(12, 0),
        at(13, 0),
    );
    review.created_at = Some(created_at());
    store.store_event(&review).unwrap();

    store
        .store_event(&CalendarEvent::new(
            4,
            CalendarRef::System { id: SYSTEM_CALENDAR, public: false },
            "All hands",
            at(9, 0),
            at(9, 30),
        ))
        .unwrap();
    store
        .store_event(&CalendarEvent::new(
            5,
            CalendarRef::System { id: OTHER_ORG_SYSTEM_CALENDAR, public: false },
            "Other all hands",
            at(9, 0),
            at(10, 0),
        ))
        .unwrap();

    let mut new_year = CalendarEvent::new(
        6,
        CalendarRef::System { id: PUBLIC_CALENDAR, public: true },
        "New Year",
        window().start,
        window().end,
    );
    new_year.all_day = true;
    store.store_event(&new_year).unwrap();

    store
        .store_event(&CalendarEvent::new(
            7,
            CalendarRef::Personal { id: ADA_CALENDAR },
            "Last year",
            Utc.with_ymd_and_hms(2019, 12, 31, 22, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2019, 12, 31, 23, 0, 0).unwrap(),
        ))
        .unwrap();

    store
        .store_reminder(
            CALENDAR_EVENT_ENTITY,
            &ReminderRecord {
                related_entity_id: 1,
                reminder: Reminder {
                    method: ReminderMethod::Email,
                    interval: ReminderInterval { number: 15, unit: IntervalUnit::Minute },
                },
            },
        )
        .unwrap();
}
