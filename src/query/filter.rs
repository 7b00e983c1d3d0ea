use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;

use super::window::{TimeWindow, overlap_clause};

/// Which storage category of calendar an event query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Personal,
    /// Non-public system calendars of one organization.
    System { organization_id: Option<i64> },
    Public,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub window: TimeWindow,
    pub source: EventSource,
    /// `None` leaves the calendar ids unrestricted.
    pub calendar_ids: Option<BTreeSet<i64>>,
    pub excluded_calendar_ids: BTreeSet<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A WHERE clause over `events e` left-joined with `system_calendars sc`,
/// with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlClause {
    pub sql: String,
    pub params: Vec<Value>,
}

pub struct EventQueryBuilder {
    query: EventQuery,
}

impl EventQuery {
    pub fn builder(window: TimeWindow) -> EventQueryBuilder {
        EventQueryBuilder {
            query: EventQuery {
                window,
                source: EventSource::Personal,
                calendar_ids: None,
                excluded_calendar_ids: BTreeSet::new(),
                created_at: None,
                updated_at: None,
            },
        }
    }

    fn calendar_column(&self) -> &'static str {
        match self.source {
            EventSource::Personal => "e.calendar_id",
            EventSource::System { .. } | EventSource::Public => "e.system_calendar_id",
        }
    }

    pub fn where_clause(&self) -> SqlClause {
        let mut params = Vec::new();
        let window_start = push_param(&mut params, Value::Integer(self.window.start.timestamp_millis()));
        let window_end = push_param(&mut params, Value::Integer(self.window.end.timestamp_millis()));

        let mut clauses = vec![overlap_clause("e.start_at", "e.end_at", &window_start, &window_end)];

        match self.source {
            EventSource::Personal => clauses.push("e.calendar_id IS NOT NULL".to_string()),
            EventSource::System { organization_id } => {
                clauses.push("sc.is_public = 0".to_string());
                let organization = push_param(&mut params, organization_id.map_or(Value::Null, Value::Integer));
                clauses.push(format!("sc.organization_id IS {}", organization));
            }
            EventSource::Public => clauses.push("sc.is_public = 1".to_string()),
        }

        let column = self.calendar_column();
        if let Some(ids) = &self.calendar_ids {
            if ids.is_empty() {
                clauses.push("0 = 1".to_string());
            } else {
                let placeholders = push_ids(&mut params, ids);
                clauses.push(format!("{} IN ({})", column, placeholders));
            }
        }
        if !self.excluded_calendar_ids.is_empty() {
            let placeholders = push_ids(&mut params, &self.excluded_calendar_ids);
            clauses.push(format!("{} NOT IN ({})", column, placeholders));
        }

        if let Some(created_at) = self.created_at {
            let param = push_param(&mut params, Value::Integer(created_at.timestamp_millis()));
            clauses.push(format!("e.created_at = {}", param));
        }
        if let Some(updated_at) = self.updated_at {
            let param = push_param(&mut params, Value::Integer(updated_at.timestamp_millis()));
            clauses.push(format!("e.updated_at = {}", param));
        }

        SqlClause { sql: clauses.join(" AND "), params }
    }
}

impl EventQueryBuilder {
    pub fn personal(mut self, scope: impl IntoIterator<Item = i64>) -> Self {
        self.query.source = EventSource::Personal;
        self.query.calendar_ids = Some(scope.into_iter().collect());
        self
    }

    pub fn system(mut self, organization_id: Option<i64>) -> Self {
        self.query.source = EventSource::System { organization_id };
        self
    }

    pub fn public(mut self) -> Self {
        self.query.source = EventSource::Public;
        self
    }

    pub fn exclude_calendars(mut self, calendar_ids: impl IntoIterator<Item = i64>) -> Self {
        self.query.excluded_calendar_ids.extend(calendar_ids);
        self
    }

    pub fn created_at(mut self, created_at: Option<DateTime<Utc>>) -> Self {
        self.query.created_at = created_at;
        self
    }

    pub fn updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.query.updated_at = updated_at;
        self
    }

    pub fn build(self) -> EventQuery {
        self.query
    }
}

fn push_param(params: &mut Vec<Value>, value: Value) -> String {
    params.push(value);
    format!("?{}", params.len())
}

fn push_ids(params: &mut Vec<Value>, ids: &BTreeSet<i64>) -> String {
    ids.iter()
        .map(|id| push_param(params, Value::Integer(*id)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn personal_query_restricts_calendar_scope() {
        let clause = EventQuery::builder(window()).personal([3, 1]).build().where_clause();

        assert!(clause.sql.starts_with("((e.start_at < ?2"));
        assert!(clause.sql.contains("e.calendar_id IS NOT NULL"));
        assert!(clause.sql.ends_with("e.calendar_id IN (?3, ?4)"));
        assert_eq!(
            clause.params[2..].to_vec(),
            vec![Value::Integer(1), Value::Integer(3)]
        );
    }

    #[test]
    fn window_bounds_are_first_parameters() {
        let clause = EventQuery::builder(window()).personal([1]).build().where_clause();

        assert_eq!(clause.params[0], Value::Integer(window().start.timestamp_millis()));
        assert_eq!(clause.params[1], Value::Integer(window().end.timestamp_millis()));
    }

    #[test]
    fn system_query_filters_by_organization() {
        let clause = EventQuery::builder(window()).system(Some(7)).build().where_clause();

        assert!(clause.sql.contains("sc.is_public = 0"));
        assert!(clause.sql.contains("sc.organization_id IS ?3"));
        assert_eq!(clause.params[2], Value::Integer(7));
    }

    #[test]
    fn public_query_has_no_organization_filter() {
        let clause = EventQuery::builder(window()).public().build().where_clause();

        assert!(clause.sql.contains("sc.is_public = 1"));
        assert!(!clause.sql.contains("organization_id"));
        assert_eq!(clause.params.len(), 2);
    }

    #[test]
    fn excluded_calendars_use_kind_column() {
        let clause = EventQuery::builder(window())
            .public()
            .exclude_calendars([4, 5])
            .build()
            .where_clause();

        assert!(clause.sql.ends_with("e.system_calendar_id NOT IN (?3, ?4)"));
    }

    #[test]
    fn timestamp_filters_are_exact_matches() {
        let created = Utc.with_ymd_and_hms(2019, 12, 1, 9, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2019, 12, 2, 9, 0, 0).unwrap();

        let clause = EventQuery::builder(window())
            .personal([1])
            .created_at(Some(created))
            .updated_at(Some(updated))
            .build()
            .where_clause();

        assert!(clause.sql.contains("e.created_at = ?4"));
        assert!(clause.sql.ends_with("e.updated_at = ?5"));
        assert_eq!(clause.params[3], Value::Integer(created.timestamp_millis()));
    }

    #[test]
    fn empty_scope_matches_nothing() {
        let clause = EventQuery::builder(window())
            .personal(Vec::new())
            .build()
            .where_clause();

        assert!(clause.sql.ends_with("0 = 1"));
    }
}
