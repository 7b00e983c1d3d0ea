//! Calendar UIDs identify a calendar by kind and id: `{alias}_{id}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::calendar_type::CalendarAlias;

#[derive(Debug, Error, PartialEq)]
pub enum UidError {
    #[error("Calendar uid '{0}' has no '_' separator")]
    MissingSeparator(String),
    #[error("Calendar uid '{0}' does not end with a numeric id")]
    InvalidId(String),
    #[error("Unknown calendar alias '{0}'")]
    UnknownAlias(String),
}

pub fn encode_uid(alias: &str, id: i64) -> String {
    format!("{}_{}", alias, id)
}

/// Splits at the last underscore, so aliases may contain underscores.
pub fn decode_uid(uid: &str) -> Result<(String, i64), UidError> {
    let delim = uid
        .rfind('_')
        .ok_or_else(|| UidError::MissingSeparator(uid.to_string()))?;
    let id = uid[delim + 1..]
        .parse::<i64>()
        .map_err(|_| UidError::InvalidId(uid.to_string()))?;

    Ok((uid[..delim].to_string(), id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarUid {
    pub alias: CalendarAlias,
    pub id: i64,
}

impl CalendarUid {
    pub fn new(alias: CalendarAlias, id: i64) -> Self {
        Self { alias, id }
    }
}

impl fmt::Display for CalendarUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_uid(self.alias.as_str(), self.id))
    }
}

impl FromStr for CalendarUid {
    type Err = UidError;

    fn from_str(uid: &str) -> Result<Self, Self::Err> {
        let (alias, id) = decode_uid(uid)?;
        let alias = CalendarAlias::parse(&alias).ok_or(UidError::UnknownAlias(alias))?;
        Ok(Self { alias, id })
    }
}

impl Serialize for CalendarUid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarUid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uid = String::deserialize(deserializer)?;
        uid.parse().map_err(serde::de::Error::custom)
    }
}
