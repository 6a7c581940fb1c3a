//! # Core Domain Entities
//!
//! Badge roster and punch history as kept by every node.
//!
//! ## Clusters
//!
//! - **Identity**: `SystemId`, `BadgeNumber`
//! - **Roster**: `Badge`, `BadgeStatus`, `BadgeRoster`
//! - **History**: `PunchRecord`

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Identifier of one deployed node ("system"/machine).
pub type SystemId = String;

/// A badge number as typed at the clock. Never parsed as an integer.
pub type BadgeNumber = String;

// =============================================================================
// CLUSTER B: ROSTER
// =============================================================================

/// Whether a badge is currently on the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeStatus {
    /// Punched in; the badge has an open record.
    In,
    /// Punched out, or never punched.
    #[default]
    Out,
}

impl fmt::Display for BadgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadgeStatus::In => write!(f, "in"),
            BadgeStatus::Out => write!(f, "out"),
        }
    }
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Badge {
    /// Name shown on the active-badge grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Optional photo location (URL or local path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Derived on-the-clock status.
    #[serde(default)]
    pub status: BadgeStatus,
}

impl Badge {
    /// A named badge that is punched out.
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            ..Self::default()
        }
    }
}

/// The full badge map, ordered by badge number.
pub type BadgeRoster = BTreeMap<BadgeNumber, Badge>;

// =============================================================================
// CLUSTER C: HISTORY
// =============================================================================

/// A single punch-in/punch-out pair.
///
/// Times are kept at whole-second precision, which is what the storage and
/// wire format carry; truncating on construction keeps a locally created
/// record equal to the same record after it has crossed the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchRecord {
    /// When the badge punched in.
    #[serde(rename = "ts_in", with = "punch_time")]
    pub time_in: DateTime<Utc>,
    /// When the badge punched out; absent while the record is open.
    #[serde(
        rename = "ts_out",
        default,
        skip_serializing_if = "Option::is_none",
        with = "punch_time::option"
    )]
    pub time_out: Option<DateTime<Utc>>,
    /// Whole seconds between `time_in` and `time_out`.
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

impl PunchRecord {
    /// Open a record at `time_in`.
    pub fn open(time_in: DateTime<Utc>) -> Self {
        Self {
            time_in: time_in.trunc_subsecs(0),
            time_out: None,
            duration_seconds: None,
        }
    }

    /// A closed record with its duration already tabulated.
    pub fn closed(time_in: DateTime<Utc>, time_out: DateTime<Utc>) -> Self {
        let mut record = Self::open(time_in);
        record.close(time_out);
        record
    }

    /// True while no punch-out has been recorded.
    pub fn is_open(&self) -> bool {
        self.time_out.is_none()
    }

    /// Record the punch-out and derive the duration.
    pub fn close(&mut self, time_out: DateTime<Utc>) {
        self.time_out = Some(time_out.trunc_subsecs(0));
        self.tabulate();
    }

    /// Recompute `duration_seconds` from the stored times.
    pub fn tabulate(&mut self) {
        self.duration_seconds = self
            .time_out
            .map(|out| (out - self.time_in).num_seconds());
    }
}

/// Serde helpers for the `YYYY-MM-DD HH:MM:SS` punch timestamp format.
///
/// Stored times carry no offset; they are always UTC.
pub mod punch_time {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Format used in punch files and history payloads.
    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let naive = NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)?;
        Ok(Utc.from_utc_datetime(&naive))
    }

    /// Same format for an optional timestamp.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(ts) => super::serialize(ts, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapped(#[serde(with = "super")] DateTime<Utc>);

            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(ts)| ts))
        }
    }
}
