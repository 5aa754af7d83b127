//! Attributes shared by every entity

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Identity and lifecycle timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseModel {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default = "now", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "now", with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl BaseModel {
    /// Fresh id, `created_at == updated_at`
    pub fn new() -> Self {
        let now = now();
        Self {
            id: new_id(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`, never before `created_at`
    pub fn touch(&mut self) {
        self.updated_at = now().max(self.created_at);
    }
}

impl Default for BaseModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Current time at the precision the wire format keeps
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Timestamp wire format: `2017-09-28T21:05:54.119427`
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    pub fn format(value: &DateTime<Utc>) -> String {
        value.format(FORMAT).to_string()
    }

    /// Accepts the wire format (any fraction length) or RFC 3339
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            Ok(naive) => Ok(Utc.from_utc_datetime(&naive)),
            Err(_) => DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)),
        }
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}
