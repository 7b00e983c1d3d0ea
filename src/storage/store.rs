use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult, Row, params, params_from_iter};

use crate::calendar::{
    Calendar, CalendarConnection, CalendarEvent, CalendarRef, IntervalUnit, InvitationStatus, MAX_CHILD_DEPTH,
    Reminder, ReminderInterval, ReminderMethod, ReminderRecord, SystemCalendar, User,
};
use crate::query::EventQuery;

use super::repository::{CalendarLookup, ConnectionView, EventRepository, GuestView, ReminderStore, StoreError};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        first_name TEXT,
        last_name TEXT,
        email TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS calendars (
        id INTEGER PRIMARY KEY,
        organization_id INTEGER,
        owner_id INTEGER NOT NULL REFERENCES users(id),
        name TEXT
    );

    CREATE TABLE IF NOT EXISTS calendar_connections (
        id INTEGER PRIMARY KEY,
        calendar_id INTEGER NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
        connected_calendar_id INTEGER NOT NULL REFERENCES calendars(id) ON DELETE CASCADE,
        color TEXT,
        background_color TEXT,
        visible INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS system_calendars (
        id INTEGER PRIMARY KEY,
        organization_id INTEGER,
        name TEXT NOT NULL,
        is_public INTEGER NOT NULL DEFAULT 0,
        background_color TEXT
    );

    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY,
        calendar_id INTEGER REFERENCES calendars(id) ON DELETE CASCADE,
        system_calendar_id INTEGER REFERENCES system_calendars(id) ON DELETE CASCADE,
        parent_id INTEGER REFERENCES events(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        start_at INTEGER NOT NULL,
        end_at INTEGER NOT NULL,
        all_day INTEGER NOT NULL DEFAULT 0,
        background_color TEXT,
        invitation_status TEXT,
        notifiable INTEGER,
        created_at INTEGER,
        updated_at INTEGER,
        CHECK ((calendar_id IS NULL) <> (system_calendar_id IS NULL))
    );

    CREATE INDEX IF NOT EXISTS events_calendar_start ON events(calendar_id, start_at);
    CREATE INDEX IF NOT EXISTS events_system_calendar_start ON events(system_calendar_id, start_at);
    CREATE INDEX IF NOT EXISTS events_parent ON events(parent_id);

    CREATE TABLE IF NOT EXISTS event_invitees (
        event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users(id),
        PRIMARY KEY (event_id, user_id)
    );

    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_kind TEXT NOT NULL,
        related_entity_id INTEGER NOT NULL,
        method TEXT NOT NULL,
        interval_number INTEGER NOT NULL,
        interval_unit TEXT NOT NULL
    );
";

const EVENT_SELECT: &str = "SELECT e.id, e.calendar_id, e.system_calendar_id, sc.is_public, e.parent_id, \
    e.title, e.description, e.start_at, e.end_at, e.all_day, e.background_color, e.invitation_status, \
    e.notifiable, e.created_at, e.updated_at \
    FROM events e LEFT JOIN system_calendars sc ON sc.id = e.system_calendar_id";

const CALENDAR_COLUMNS: &str = "id, organization_id, owner_id, name";
const SYSTEM_CALENDAR_COLUMNS: &str = "id, organization_id, name, is_public, background_color";

/// SQLite-backed event store.
pub struct SqliteStore {
    conn: Connection,
}

struct EventRow {
    id: i64,
    calendar_id: Option<i64>,
    system_calendar_id: Option<i64>,
    is_public: Option<bool>,
    parent_id: Option<i64>,
    title: String,
    description: Option<String>,
    start_at: i64,
    end_at: i64,
    all_day: bool,
    background_color: Option<String>,
    invitation_status: Option<String>,
    notifiable: Option<bool>,
    created_at: Option<i64>,
    updated_at: Option<i64>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let store = Self::new(Connection::open(path)?);
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self::new(Connection::open_in_memory()?);
        store.initialize()?;
        Ok(store)
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn store_user(&self, user: &User) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO users (id, first_name, last_name, email) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.first_name, user.last_name, user.email],
        )?;
        Ok(())
    }

    pub fn store_calendar(&self, calendar: &Calendar) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO calendars (id, organization_id, owner_id, name) VALUES (?1, ?2, ?3, ?4)",
            params![calendar.id, calendar.organization_id, calendar.owner_id, calendar.name],
        )?;
        Ok(())
    }

    pub fn store_system_calendar(&self, calendar: &SystemCalendar) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO system_calendars (id, organization_id, name, is_public, background_color)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                calendar.id,
                calendar.organization_id,
                calendar.name,
                calendar.is_public,
                calendar.background_color,
            ],
        )?;
        Ok(())
    }

    /// Replaces any connection with the same id.
    pub fn store_connection(&self, connection: &CalendarConnection) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO calendar_connections
                (id, calendar_id, connected_calendar_id, color, background_color, visible, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                connection.id,
                connection.calendar_id,
                connection.connected_calendar_id,
                connection.color,
                connection.background_color,
                connection.visible,
                connection.created_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Inserts or updates an event together with its invitees and child events.
    pub fn store_event(&self, event: &CalendarEvent) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO events (id, calendar_id, system_calendar_id, parent_id, title, description,
                start_at, end_at, all_day, background_color, invitation_status, notifiable,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(id) DO UPDATE SET
                calendar_id = excluded.calendar_id,
                system_calendar_id = excluded.system_calendar_id,
                parent_id = excluded.parent_id,
                title = excluded.title,
                description = excluded.description,
                start_at = excluded.start_at,
                end_at = excluded.end_at,
                all_day = excluded.all_day,
                background_color = excluded.background_color,
                invitation_status = excluded.invitation_status,
                notifiable = excluded.notifiable,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
            params![
                event.id,
                event.calendar.personal_id(),
                event.calendar.system_id(),
                event.parent_event_id,
                event.title,
                event.description,
                event.start.timestamp_millis(),
                event.end.timestamp_millis(),
                event.all_day,
                event.background_color,
                event.invitation_status.map(|status| status.as_str()),
                event.notifiable,
                event.created_at.map(|at| at.timestamp_millis()),
                event.updated_at.map(|at| at.timestamp_millis()),
            ],
        )?;

        self.conn
            .execute("DELETE FROM event_invitees WHERE event_id = ?1", [event.id])?;
        for user_id in &event.invited_users {
            self.conn.execute(
                "INSERT INTO event_invitees (event_id, user_id) VALUES (?1, ?2)",
                params![event.id, user_id],
            )?;
        }

        for child in &event.child_events {
            let mut child = child.clone();
            child.parent_event_id = Some(event.id);
            self.store_event(&child)?;
        }

        Ok(())
    }

    pub fn delete_event(&self, id: i64) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
        Ok(())
    }

    pub fn store_reminder(&self, entity_kind: &str, record: &ReminderRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO reminders (entity_kind, related_entity_id, method, interval_number, interval_unit)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entity_kind,
                record.related_entity_id,
                record.reminder.method.as_str(),
                record.reminder.interval.number,
                record.reminder.interval.unit.as_str(),
            ],
        )?;
        Ok(())
    }

    fn query_events(&self, clause: &str, params: &[Value]) -> Result<Vec<CalendarEvent>, StoreError> {
        let sql = format!(
            "{} WHERE {} ORDER BY COALESCE(e.calendar_id, e.system_calendar_id), e.start_at, e.id",
            EVENT_SELECT, clause
        );
        tracing::trace!("Event query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), read_event_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter().map(CalendarEvent::try_from).collect()
    }

    fn load_related(&self, events: &mut [CalendarEvent], depth: usize) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }
        self.attach_invitees(events)?;

        if depth >= MAX_CHILD_DEPTH {
            tracing::debug!("Child events deeper than {} levels not loaded", MAX_CHILD_DEPTH);
            return Ok(());
        }

        let ids: Vec<i64> = events.iter().map(|event| event.id).collect();
        let mut children = self.query_events(
            &format!("e.parent_id IN ({})", placeholders(1, ids.len())),
            &integer_values(&ids),
        )?;
        self.load_related(&mut children, depth + 1)?;

        for child in children {
            if let Some(parent) = events
                .iter_mut()
                .find(|event| Some(event.id) == child.parent_event_id)
            {
                parent.child_events.push(child);
            }
        }

        Ok(())
    }

    fn attach_invitees(&self, events: &mut [CalendarEvent]) -> Result<(), StoreError> {
        let ids: Vec<i64> = events.iter().map(|event| event.id).collect();
        let sql = format!(
            "SELECT event_id, user_id FROM event_invitees WHERE event_id IN ({}) ORDER BY event_id, user_id",
            placeholders(1, ids.len())
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let pairs = stmt
            .query_map(params_from_iter(integer_values(&ids).iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut invitees: HashMap<i64, Vec<i64>> = HashMap::new();
        for (event_id, user_id) in pairs {
            invitees.entry(event_id).or_default().push(user_id);
        }
        for event in events.iter_mut() {
            event.invited_users = invitees.remove(&event.id).unwrap_or_default();
        }

        Ok(())
    }

    fn query_calendars(&self, clause: &str, params: &[Value]) -> Result<Vec<Calendar>, StoreError> {
        let sql = format!("SELECT {} FROM calendars WHERE {} ORDER BY id", CALENDAR_COLUMNS, clause);
        let mut stmt = self.conn.prepare(&sql)?;
        let calendars = stmt
            .query_map(params_from_iter(params.iter()), read_calendar_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(calendars)
    }

    fn query_system_calendars(&self, clause: &str, params: &[Value]) -> Result<Vec<SystemCalendar>, StoreError> {
        let sql = format!(
            "SELECT {} FROM system_calendars WHERE {} ORDER BY id",
            SYSTEM_CALENDAR_COLUMNS, clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let calendars = stmt
            .query_map(params_from_iter(params.iter()), read_system_calendar_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(calendars)
    }
}

impl CalendarLookup for SqliteStore {
    fn find_calendar(&self, calendar_id: i64) -> Result<Option<Calendar>, StoreError> {
        let calendar = self
            .conn
            .query_row(
                &format!("SELECT {} FROM calendars WHERE id = ?1", CALENDAR_COLUMNS),
                [calendar_id],
                read_calendar_row,
            )
            .optional()?;
        Ok(calendar)
    }

    fn find_system_calendar(&self, calendar_id: i64) -> Result<Option<SystemCalendar>, StoreError> {
        let calendar = self
            .conn
            .query_row(
                &format!("SELECT {} FROM system_calendars WHERE id = ?1", SYSTEM_CALENDAR_COLUMNS),
                [calendar_id],
                read_system_calendar_row,
            )
            .optional()?;
        Ok(calendar)
    }
}

impl EventRepository for SqliteStore {
    fn find_events(&self, query: &EventQuery) -> Result<Vec<CalendarEvent>, StoreError> {
        let clause = query.where_clause();
        let mut events = self.query_events(&clause.sql, &clause.params)?;
        self.load_related(&mut events, 0)?;
        Ok(events)
    }

    fn connected_calendar_ids(&self, calendar_id: i64) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT connected_calendar_id FROM calendar_connections
             WHERE calendar_id = ?1 ORDER BY created_at, id",
        )?;
        let ids = stmt
            .query_map([calendar_id], |row| row.get(0))?
            .collect::<SqliteResult<Vec<i64>>>()?;
        Ok(ids)
    }

    fn connections(&self, calendar_id: i64) -> Result<Vec<ConnectionView>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.color, a.background_color, a.visible, ac.id, ac.name, u.id, u.first_name, u.last_name
             FROM calendar_connections a
             INNER JOIN calendars ac ON ac.id = a.connected_calendar_id
             INNER JOIN users u ON u.id = ac.owner_id
             WHERE a.calendar_id = ?1
             ORDER BY a.created_at, a.id",
        )?;
        let connections = stmt
            .query_map([calendar_id], |row| {
                Ok(ConnectionView {
                    color: row.get(0)?,
                    background_color: row.get(1)?,
                    visible: row.get(2)?,
                    calendar: row.get(3)?,
                    calendar_name: row.get(4)?,
                    owner: row.get(5)?,
                    owner_first_name: row.get(6)?,
                    owner_last_name: row.get(7)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(connections)
    }

    fn find_calendars(&self, calendar_ids: &[i64]) -> Result<Vec<Calendar>, StoreError> {
        if calendar_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.query_calendars(
            &format!("id IN ({})", placeholders(1, calendar_ids.len())),
            &integer_values(calendar_ids),
        )
    }

    fn find_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, first_name, last_name, email FROM users WHERE id = ?1",
                [user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        email: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn user_calendars(&self, organization_id: Option<i64>, user_id: i64) -> Result<Vec<Calendar>, StoreError> {
        self.query_calendars(
            "owner_id = ?1 AND organization_id IS ?2",
            &[Value::Integer(user_id), organization_id.map_or(Value::Null, Value::Integer)],
        )
    }

    fn system_calendars(&self, organization_id: Option<i64>) -> Result<Vec<SystemCalendar>, StoreError> {
        self.query_system_calendars(
            "is_public = 0 AND organization_id IS ?1",
            &[organization_id.map_or(Value::Null, Value::Integer)],
        )
    }

    fn public_calendars(&self) -> Result<Vec<SystemCalendar>, StoreError> {
        self.query_system_calendars("is_public = 1", &[])
    }

    fn guests(&self, parent_event_id: i64) -> Result<Vec<GuestView>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT e.id, e.invitation_status, u.id, u.first_name, u.last_name, u.email
             FROM events e
             INNER JOIN calendars c ON c.id = e.calendar_id
             INNER JOIN users u ON u.id = c.owner_id
             WHERE e.parent_id = ?1
             ORDER BY e.id",
        )?;
        let rows = stmt
            .query_map([parent_event_id], |row| {
                let user = User {
                    id: row.get(2)?,
                    first_name: row.get(3)?,
                    last_name: row.get(4)?,
                    email: row.get(5)?,
                };
                Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?, user))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, status, user)| -> Result<GuestView, StoreError> {
                Ok(GuestView {
                    id,
                    invitation_status: status.as_deref().map(parse_invitation_status).transpose()?,
                    user_full_name: user.full_name(),
                    email: user.email,
                })
            })
            .collect()
    }
}

impl ReminderStore for SqliteStore {
    fn find_reminders_by_entities(
        &self,
        entity_ids: &[i64],
        entity_kind: &str,
    ) -> Result<Vec<ReminderRecord>, StoreError> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT related_entity_id, method, interval_number, interval_unit FROM reminders
             WHERE entity_kind = ?1 AND related_entity_id IN ({})
             ORDER BY related_entity_id, id",
            placeholders(2, entity_ids.len())
        );
        let mut params = vec![Value::Text(entity_kind.to_string())];
        params.extend(integer_values(entity_ids));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter()
            .map(|(related_entity_id, method, number, unit)| -> Result<ReminderRecord, StoreError> {
                let method = ReminderMethod::parse(&method).ok_or_else(|| StoreError::CorruptRow {
                    table: "reminders",
                    reason: format!("unknown method '{}'", method),
                })?;
                let unit = IntervalUnit::parse(&unit).ok_or_else(|| StoreError::CorruptRow {
                    table: "reminders",
                    reason: format!("unknown interval unit '{}'", unit),
                })?;
                Ok(ReminderRecord {
                    related_entity_id,
                    reminder: Reminder {
                        method,
                        interval: ReminderInterval { number, unit },
                    },
                })
            })
            .collect()
    }
}

impl TryFrom<EventRow> for CalendarEvent {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let calendar = match (row.calendar_id, row.system_calendar_id) {
            (Some(id), None) => CalendarRef::Personal { id },
            (None, Some(id)) => CalendarRef::System {
                id,
                public: row.is_public.unwrap_or(false),
            },
            _ => {
                return Err(StoreError::CorruptRow {
                    table: "events",
                    reason: format!("event {} must belong to exactly one calendar", row.id),
                });
            }
        };

        Ok(CalendarEvent {
            id: row.id,
            calendar,
            title: row.title,
            description: row.description,
            start: timestamp(row.start_at)?,
            end: timestamp(row.end_at)?,
            all_day: row.all_day,
            background_color: row.background_color,
            created_at: row.created_at.map(timestamp).transpose()?,
            updated_at: row.updated_at.map(timestamp).transpose()?,
            parent_event_id: row.parent_id,
            invitation_status: row
                .invitation_status
                .as_deref()
                .map(parse_invitation_status)
                .transpose()?,
            child_events: Vec::new(),
            invited_users: Vec::new(),
            notifiable: row.notifiable,
        })
    }
}

fn read_event_row(row: &Row<'_>) -> SqliteResult<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        calendar_id: row.get(1)?,
        system_calendar_id: row.get(2)?,
        is_public: row.get(3)?,
        parent_id: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        start_at: row.get(7)?,
        end_at: row.get(8)?,
        all_day: row.get(9)?,
        background_color: row.get(10)?,
        invitation_status: row.get(11)?,
        notifiable: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn read_calendar_row(row: &Row<'_>) -> SqliteResult<Calendar> {
    Ok(Calendar {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        owner_id: row.get(2)?,
        name: row.get(3)?,
    })
}

fn read_system_calendar_row(row: &Row<'_>) -> SqliteResult<SystemCalendar> {
    Ok(SystemCalendar {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        name: row.get(2)?,
        is_public: row.get(3)?,
        background_color: row.get(4)?,
    })
}

fn timestamp(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| StoreError::CorruptRow {
        table: "events",
        reason: format!("timestamp {} out of range", millis),
    })
}

fn parse_invitation_status(value: &str) -> Result<InvitationStatus, StoreError> {
    InvitationStatus::parse(value).ok_or_else(|| StoreError::CorruptRow {
        table: "events",
        reason: format!("unknown invitation status '{}'", value),
    })
}

fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|index| format!("?{}", index))
        .collect::<Vec<_>>()
        .join(", ")
}

fn integer_values(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| Value::Integer(*id)).collect()
}
