use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of calendar as it appears in a calendar UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarAlias {
    User,
    System,
    Public,
}

impl CalendarAlias {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarAlias::User => "user",
            CalendarAlias::System => "system",
            CalendarAlias::Public => "public",
        }
    }

    pub fn parse(alias: &str) -> Option<Self> {
        match alias {
            "user" => Some(CalendarAlias::User),
            "system" => Some(CalendarAlias::System),
            "public" => Some(CalendarAlias::Public),
            _ => None,
        }
    }

    /// Client-side ordering hint; lower sorts first.
    pub fn default_position(&self) -> i32 {
        match self {
            CalendarAlias::User => 0,
            CalendarAlias::System => -60,
            CalendarAlias::Public => -80,
        }
    }
}

impl fmt::Display for CalendarAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
}

impl User {
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A personal calendar owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: i64,
    pub organization_id: Option<i64>,
    pub owner_id: i64,
    pub name: Option<String>,
}

impl Calendar {
    /// Unnamed calendars are shown under their owner's name.
    pub fn display_name(&self, owner: Option<&User>) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => owner.map(User::full_name).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConnection {
    pub id: i64,
    pub calendar_id: i64,
    pub connected_calendar_id: i64,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemCalendar {
    pub id: i64,
    /// `None` for public calendars.
    pub organization_id: Option<i64>,
    pub name: String,
    pub is_public: bool,
    pub background_color: Option<String>,
}

impl SystemCalendar {
    pub fn alias(&self) -> CalendarAlias {
        if self.is_public {
            CalendarAlias::Public
        } else {
            CalendarAlias::System
        }
    }
}
