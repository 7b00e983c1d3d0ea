//! Conversion of stored events into the public event shape.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::calendar::{
    CALENDAR_EVENT_ENTITY, CalendarAlias, CalendarEvent, InvitationStatus, MAX_CHILD_DEPTH, Reminder,
};
use crate::security::{Authorizer, Capability};
use crate::storage::{ReminderStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub calendar: i64,
    pub calendar_alias: CalendarAlias,
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    pub all_day: bool,
    pub background_color: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub parent_event_id: Option<i64>,
    pub invitation_status: Option<InvitationStatus>,
    pub child_events: Vec<EventDto>,
    pub invited_users: Vec<i64>,
    /// True only when the event is stored in the requesting personal
    /// calendar. System and public events are never editable, even when
    /// their id equals the requesting calendar id.
    pub editable: bool,
    /// Same ownership rule as `editable`, gated by the delete capability.
    pub removable: bool,
    pub notifiable: bool,
    pub reminders: Vec<Reminder>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Permissions {
    update: bool,
    delete: bool,
}

pub struct EventNormalizer<'a> {
    authorizer: &'a dyn Authorizer,
    reminders: &'a dyn ReminderStore,
}

impl<'a> EventNormalizer<'a> {
    pub fn new(authorizer: &'a dyn Authorizer, reminders: &'a dyn ReminderStore) -> Self {
        Self { authorizer, reminders }
    }

    pub fn normalize(&self, event: &CalendarEvent, requesting_calendar_id: Option<i64>) -> Result<EventDto, StoreError> {
        let permissions = self.permissions(requesting_calendar_id);
        let mut dto = self.build(event, requesting_calendar_id, permissions, 0, &mut HashSet::new());
        self.attach_reminders(std::slice::from_mut(&mut dto))?;
        Ok(dto)
    }

    /// Normalizes `events` in order, with a single reminder lookup for the
    /// whole batch.
    pub fn normalize_many(
        &self,
        events: &[CalendarEvent],
        requesting_calendar_id: Option<i64>,
    ) -> Result<Vec<EventDto>, StoreError> {
        let permissions = if events.is_empty() {
            Permissions::default()
        } else {
            self.permissions(requesting_calendar_id)
        };

        let mut dtos: Vec<EventDto> = events
            .iter()
            .map(|event| self.build(event, requesting_calendar_id, permissions, 0, &mut HashSet::new()))
            .collect();
        self.attach_reminders(&mut dtos)?;

        Ok(dtos)
    }

    fn permissions(&self, requesting_calendar_id: Option<i64>) -> Permissions {
        if requesting_calendar_id.is_none() {
            return Permissions::default();
        }
        Permissions {
            update: self.authorizer.has_capability(Capability::UpdateEvents),
            delete: self.authorizer.has_capability(Capability::DeleteEvents),
        }
    }

    fn build(
        &self,
        event: &CalendarEvent,
        requesting_calendar_id: Option<i64>,
        permissions: Permissions,
        depth: usize,
        visited: &mut HashSet<i64>,
    ) -> EventDto {
        visited.insert(event.id);

        let own = requesting_calendar_id.is_some() && event.calendar.personal_id() == requesting_calendar_id;

        let mut child_events = Vec::with_capacity(event.child_events.len());
        if depth < MAX_CHILD_DEPTH {
            for child in &event.child_events {
                if visited.contains(&child.id) {
                    tracing::warn!("Event {} appears in its own child chain, skipping", child.id);
                    continue;
                }
                child_events.push(self.build(child, requesting_calendar_id, permissions, depth + 1, visited));
            }
        } else if !event.child_events.is_empty() {
            tracing::warn!("Child events of event {} nested too deep, dropping", event.id);
        }

        EventDto {
            calendar: event.calendar.id(),
            calendar_alias: event.calendar.alias(),
            id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            start: event.start.to_rfc3339(),
            end: event.end.to_rfc3339(),
            all_day: event.all_day,
            background_color: event.background_color.clone(),
            created_at: event.created_at.map(|at| at.to_rfc3339()),
            updated_at: event.updated_at.map(|at| at.to_rfc3339()),
            parent_event_id: event.parent_event_id,
            invitation_status: event.invitation_status,
            child_events,
            invited_users: event.invited_users.clone(),
            editable: own && permissions.update,
            removable: own && permissions.delete,
            notifiable: event.notifiable.unwrap_or(false),
            reminders: Vec::new(),
        }
    }

    fn attach_reminders(&self, dtos: &mut [EventDto]) -> Result<(), StoreError> {
        let mut ids = Vec::new();
        collect_ids(dtos, &mut ids);

        let mut by_event: HashMap<i64, Vec<Reminder>> = HashMap::new();
        for record in self
            .reminders
            .find_reminders_by_entities(&ids, CALENDAR_EVENT_ENTITY)?
        {
            by_event
                .entry(record.related_entity_id)
                .or_default()
                .push(record.reminder);
        }

        assign_reminders(dtos, &by_event);
        Ok(())
    }
}

fn collect_ids(dtos: &[EventDto], ids: &mut Vec<i64>) {
    for dto in dtos {
        ids.push(dto.id);
        collect_ids(&dto.child_events, ids);
    }
}

fn assign_reminders(dtos: &mut [EventDto], by_event: &HashMap<i64, Vec<Reminder>>) {
    for dto in dtos {
        if let Some(reminders) = by_event.get(&dto.id) {
            dto.reminders = reminders.clone();
        }
        assign_reminders(&mut dto.child_events, by_event);
    }
}
