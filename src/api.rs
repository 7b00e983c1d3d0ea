//! Request-level entry points: argument validation, event listing and the
//! merged calendar view.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::aggregate::{CalendarView, aggregate};
use crate::calendar::{CalendarAlias, CalendarUid};
use crate::normalizer::{EventDto, EventNormalizer};
use crate::provider::{Collaborators, ProviderContext, VisibilityMap, standard_sources};
use crate::query::{CalendarScopeResolver, EventQuery, TimeWindow};
use crate::storage::StoreError;

static TIMESTAMP_RE: OnceLock<Regex> = OnceLock::new();
static CALENDAR_ID_RE: OnceLock<Regex> = OnceLock::new();

fn timestamp_pattern() -> &'static Regex {
    TIMESTAMP_RE.get_or_init(|| {
        Regex::new(r"^\d{4}(-\d{2}(-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|([-+]\d{2}(:?\d{2})?))?)?)?)?$")
            .expect("timestamp pattern is valid")
    })
}

fn calendar_id_pattern() -> &'static Regex {
    CALENDAR_ID_RE.get_or_init(|| Regex::new(r"^\d+$").expect("calendar id pattern is valid"))
}

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("The \"{0}\" argument must be provided.")]
    MissingArgument(&'static str),
    #[error("Invalid value '{value}' for the \"{name}\" argument")]
    InvalidArgument { name: &'static str, value: String },
    #[error("Malformed timestamp '{value}' for the \"{name}\" argument")]
    MalformedTimestamp { name: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Raw list-request arguments as they arrive from the caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsParams {
    pub calendar: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub subordinate: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListEventsRequest {
    pub calendar_id: i64,
    pub window: TimeWindow,
    /// Include events of connected calendars.
    pub subordinate: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ListEventsRequest {
    pub fn parse(params: &ListEventsParams) -> Result<Self, RequestError> {
        let calendar = required("calendar", &params.calendar)?;
        let start = required("start", &params.start)?;
        let end = required("end", &params.end)?;

        if !calendar_id_pattern().is_match(calendar) {
            return Err(invalid("calendar", calendar));
        }
        let calendar_id = calendar.parse().map_err(|_| invalid("calendar", calendar))?;

        let subordinate = match params.subordinate.as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => return Err(invalid("subordinate", other)),
        };

        Ok(Self {
            calendar_id,
            window: TimeWindow::new(parse_timestamp("start", start)?, parse_timestamp("end", end)?),
            subordinate,
            created_at: optional_timestamp("createdAt", &params.created_at)?,
            updated_at: optional_timestamp("updatedAt", &params.updated_at)?,
        })
    }
}

fn required<'p>(name: &'static str, value: &'p Option<String>) -> Result<&'p str, RequestError> {
    match value.as_deref() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(RequestError::MissingArgument(name)),
    }
}

fn invalid(name: &'static str, value: &str) -> RequestError {
    RequestError::InvalidArgument {
        name,
        value: value.to_string(),
    }
}

fn optional_timestamp(name: &'static str, value: &Option<String>) -> Result<Option<DateTime<Utc>>, RequestError> {
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(name, value).map(Some),
    }
}

/// Parses an RFC 3339 style timestamp. Missing date parts default to the
/// first month or day, a missing time to midnight, a missing offset to UTC.
pub fn parse_timestamp(name: &'static str, value: &str) -> Result<DateTime<Utc>, RequestError> {
    let malformed = || RequestError::MalformedTimestamp {
        name,
        value: value.to_string(),
    };

    if !timestamp_pattern().is_match(value) {
        return Err(malformed());
    }

    let (date_part, time_part) = match value.find(['T', ' ']) {
        Some(at) => (&value[..at], Some(&value[at + 1..])),
        None => (value, None),
    };
    let date = parse_date(date_part).ok_or_else(malformed)?;

    let Some(time_part) = time_part else {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    };

    let (clock, offset_seconds) = split_offset(time_part).ok_or_else(malformed)?;
    let time = NaiveTime::parse_from_str(clock, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(clock, "%H:%M"))
        .map_err(|_| malformed())?;
    let offset = FixedOffset::east_opt(offset_seconds).ok_or_else(malformed)?;

    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(malformed)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.split('-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next().map_or(Some(1), |part| part.parse().ok())?;
    let day = parts.next().map_or(Some(1), |part| part.parse().ok())?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn split_offset(time: &str) -> Option<(&str, i32)> {
    if let Some(clock) = time.strip_suffix('Z') {
        return Some((clock, 0));
    }

    let Some(at) = time.find(['+', '-']) else {
        return Some((time, 0));
    };
    let sign = if time[at..].starts_with('-') { -1 } else { 1 };
    let digits: String = time[at + 1..].chars().filter(|c| *c != ':').collect();
    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..) {
        Some(rest) if !rest.is_empty() => rest.parse().ok()?,
        _ => 0,
    };

    Some((&time[..at], sign * (hours * 3600 + minutes * 60)))
}

/// Removes the derived permission flags from an inbound event payload.
pub fn strip_auxiliary_fields(payload: &mut serde_json::Value) {
    if let Some(fields) = payload.as_object_mut() {
        fields.remove("editable");
        fields.remove("removable");
    }
}

pub struct CalendarService<'a> {
    collaborators: Collaborators<'a>,
}

impl<'a> CalendarService<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        Self { collaborators }
    }

    pub fn list_events_from(&self, params: &ListEventsParams) -> Result<Vec<EventDto>, ApiError> {
        let request = ListEventsRequest::parse(params)?;
        self.list_events(&request)
    }

    /// Events of one calendar, optionally with its connected calendars,
    /// overlapping the requested window.
    pub fn list_events(&self, request: &ListEventsRequest) -> Result<Vec<EventDto>, ApiError> {
        let span = tracing::info_span!("list_events", request_id = %Uuid::new_v4());
        let _enter = span.enter();

        let Collaborators { repository, authorizer, reminders, .. } = self.collaborators;
        let scope = CalendarScopeResolver::new(repository, authorizer)
            .resolve_scope(request.calendar_id, request.subordinate)?;
        tracing::trace!("Calendar {} resolved to scope {:?}", request.calendar_id, scope);

        let query = EventQuery::builder(request.window)
            .personal(scope)
            .created_at(request.created_at)
            .updated_at(request.updated_at)
            .build();
        let events = repository.find_events(&query)?;
        let result = EventNormalizer::new(authorizer, reminders).normalize_many(&events, Some(request.calendar_id))?;

        tracing::info!("Listed {} events for calendar {}", result.len(), request.calendar_id);
        Ok(result)
    }

    /// Every calendar kind merged for display from `calendar_id`. Connected
    /// calendars hidden by their connection stay out of the event list.
    pub fn calendar_view(&self, calendar_id: i64, window: TimeWindow) -> Result<CalendarView, ApiError> {
        let span = tracing::info_span!("calendar_view", request_id = %Uuid::new_v4());
        let _enter = span.enter();

        let authorizer = self.collaborators.authorizer;
        let context = ProviderContext {
            organization_id: authorizer.current_organization_id(),
            user_id: authorizer.current_user_id(),
            calendar_id,
        };

        let visibility: VisibilityMap = self
            .collaborators
            .repository
            .connections(calendar_id)?
            .into_iter()
            .map(|connection| (CalendarUid::new(CalendarAlias::User, connection.calendar), connection.visible))
            .collect();

        let view = aggregate(&standard_sources(self.collaborators), &context, &window, &visibility)?;
        tracing::info!(
            "Calendar view for {} has {} events across {} calendars",
            calendar_id,
            view.events.len(),
            view.calendars.len()
        );
        Ok(view)
    }
}
