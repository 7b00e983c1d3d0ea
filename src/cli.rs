use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use calendar_events::api::{CalendarService, ListEventsParams, ListEventsRequest, parse_timestamp};
use calendar_events::manager::CalendarEventManager;
use calendar_events::provider::Collaborators;
use calendar_events::query::TimeWindow;
use calendar_events::security::SessionAuthorizer;
use calendar_events::storage::{Config, SqliteStore};

#[derive(Debug, Parser)]
#[command(name = "calendar-events")]
#[command(about = "Query calendar events across personal, system and public calendars")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// List events of a calendar in a time window
    Events {
        calendar: String,
        start: String,
        end: String,

        /// Include events of connected calendars
        #[arg(long)]
        subordinate: bool,

        /// Only events created at this exact instant
        #[arg(long)]
        created_at: Option<String>,

        /// Only events updated at this exact instant
        #[arg(long)]
        updated_at: Option<String>,
    },
    /// Events and calendar metadata from every calendar kind
    View {
        calendar_id: i64,
        start: String,
        end: String,
    },
    /// Personal and system calendars of the session user
    Calendars,
    Connections {
        calendar_id: i64,
    },
    /// Invitees of an event
    Guests {
        event_id: i64,
    },
    /// Events of the current local day
    Today {
        calendar_id: i64,
    },
}

pub fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(&config.database.path)?;
    let authorizer = SessionAuthorizer::from_config(&config.session);
    let collaborators = Collaborators {
        repository: &store,
        authorizer: &authorizer,
        reminders: &store,
        features: &config.calendars,
    };

    let output = execute(command, collaborators, config.session.utc_offset_minutes, Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn execute(
    command: Command,
    collaborators: Collaborators<'_>,
    utc_offset_minutes: i32,
    now: DateTime<Utc>,
) -> anyhow::Result<Value> {
    let service = CalendarService::new(collaborators);
    let manager = CalendarEventManager::new(collaborators.repository, collaborators.authorizer);

    let output = match command {
        Command::Events { calendar, start, end, subordinate, created_at, updated_at } => {
            let params = ListEventsParams {
                calendar: Some(calendar),
                start: Some(start),
                end: Some(end),
                subordinate: subordinate.then(|| "1".to_string()),
                created_at,
                updated_at,
            };
            serde_json::to_value(service.list_events_from(&params)?)?
        }
        Command::View { calendar_id, start, end } => {
            let window = TimeWindow::new(parse_timestamp("start", &start)?, parse_timestamp("end", &end)?);
            serde_json::to_value(service.calendar_view(calendar_id, window)?)?
        }
        Command::Calendars => json!({
            "user": manager.user_calendars()?,
            "system": manager.system_calendars()?,
        }),
        Command::Connections { calendar_id } => serde_json::to_value(manager.connections(calendar_id)?)?,
        Command::Guests { event_id } => serde_json::to_value(manager.guests(event_id)?)?,
        Command::Today { calendar_id } => {
            let offset = utc_offset_minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .ok_or_else(|| anyhow::anyhow!("Invalid UTC offset: {} minutes", utc_offset_minutes))?;
            let request = ListEventsRequest {
                calendar_id,
                window: TimeWindow::day_of(now, offset),
                subordinate: false,
                created_at: None,
                updated_at: None,
            };
            serde_json::to_value(service.list_events(&request)?)?
        }
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calendar_events::calendar::{Calendar, CalendarEvent, CalendarRef, User};
    use calendar_events::security::Capability;
    use calendar_events::storage::CalendarsConfig;
    use chrono::TimeZone;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("calendar-events").chain(line.split_whitespace()))
            .map(|cli| cli.command)
    }

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .store_user(&User {
                id: 1,
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                email: "ada@example.com".to_string(),
            })
            .unwrap();
        store
            .store_calendar(&Calendar { id: 123, organization_id: Some(1), owner_id: 1, name: None })
            .unwrap();
        store
            .store_event(&CalendarEvent::new(
                1,
                CalendarRef::Personal { id: 123 },
                "Planning",
                Utc.with_ymd_and_hms(2020, 1, 1, 23, 30, 0).unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 2, 0, 30, 0).unwrap(),
            ))
            .unwrap();
        store
    }

    fn try_run(
        store: &SqliteStore,
        command: Command,
        utc_offset_minutes: i32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Value> {
        let authorizer = SessionAuthorizer::new(Some(1), Some(1), [Capability::UpdateEvents]);
        let features = CalendarsConfig {
            personal_enabled: true,
            system_enabled: true,
            public_enabled: true,
        };
        let collaborators = Collaborators {
            repository: store,
            authorizer: &authorizer,
            reminders: store,
            features: &features,
        };
        execute(command, collaborators, utc_offset_minutes, now)
    }

    fn run_against(store: &SqliteStore, command: Command, utc_offset_minutes: i32, now: DateTime<Utc>) -> Value {
        try_run(store, command, utc_offset_minutes, now).unwrap()
    }

    #[test]
    fn no_arguments_shows_help() {
        let err = parse("").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
    }

    #[test]
    fn parses_events_with_flags() {
        let command = parse("events 123 2020-01-01 2020-01-02 --subordinate --created-at 2019-12-20T09:30:00Z").unwrap();

        assert_eq!(
            command,
            Command::Events {
                calendar: "123".to_string(),
                start: "2020-01-01".to_string(),
                end: "2020-01-02".to_string(),
                subordinate: true,
                created_at: Some("2019-12-20T09:30:00Z".to_string()),
                updated_at: None,
            }
        );
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(parse("agenda").is_err());
        assert!(parse("events 1 2 3 --verbose").is_err());
        assert!(parse("guests abc").is_err());
        assert!(parse("calendars extra").is_err());
        assert!(parse("view 123 2020-01-01").is_err());
    }

    #[test]
    fn parses_id_commands() {
        assert_eq!(parse("guests 7").unwrap(), Command::Guests { event_id: 7 });
        assert_eq!(parse("today 123").unwrap(), Command::Today { calendar_id: 123 });
        assert_eq!(parse("connections 123").unwrap(), Command::Connections { calendar_id: 123 });
    }

    #[test]
    fn events_command_prints_event_list() {
        let store = seeded_store();
        let command = parse("events 123 2020-01-01T00:00:00Z 2020-01-02T00:00:00Z").unwrap();

        let output = run_against(&store, command, 0, Utc::now());

        assert_eq!(output[0]["id"], 1);
        assert_eq!(output[0]["editable"], true);
        assert_eq!(output[0]["removable"], false);
    }

    #[test]
    fn today_uses_local_day() {
        let store = seeded_store();
        let now = Utc.with_ymd_and_hms(2020, 1, 2, 12, 0, 0).unwrap();

        let utc_day = run_against(&store, Command::Today { calendar_id: 123 }, 0, now);
        let far_east_day = run_against(&store, Command::Today { calendar_id: 123 }, 14 * 60, now);

        assert_eq!(utc_day.as_array().unwrap().len(), 1);
        assert_eq!(far_east_day.as_array().unwrap().len(), 0);
    }

    #[test]
    fn today_rejects_out_of_range_offset() {
        let store = seeded_store();
        let now = Utc.with_ymd_and_hms(2020, 1, 2, 12, 0, 0).unwrap();

        assert!(try_run(&store, Command::Today { calendar_id: 123 }, i32::MAX, now).is_err());
        assert!(try_run(&store, Command::Today { calendar_id: 123 }, 24 * 60, now).is_err());
    }

    #[test]
    fn calendars_command_lists_both_kinds() {
        let store = seeded_store();

        let output = run_against(&store, Command::Calendars, 0, Utc::now());

        assert_eq!(output["user"][0]["name"], "Ada Lovelace");
        assert_eq!(output["system"], json!([]));
    }
}
