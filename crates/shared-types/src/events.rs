//! # Sync Events
//!
//! Everything that crosses node boundaries, and its JSON wire format.
//!
//! ```text
//! {
//!   "system_id":  "clock-east",
//!   "badge_num":  "1001",            // null for roster-wide events
//!   "event_type": "punch_in",
//!   "ts":         "2024-05-06T07:00:00Z",
//!   "details":    {}                 // shape fixed by event_type
//! }
//! ```
//!
//! | event_type           | badge_num | details                      |
//! |----------------------|-----------|------------------------------|
//! | `punch_in`           | required  | `{}`                         |
//! | `punch_out`          | required  | `{}`                         |
//! | `badge_roster_sync`  | null      | `{"badges": {num: badge}}`   |
//! | `punch_history_sync` | required  | `{"punches": [record, ...]}` |
//! | `checksum_announce`  | required  | `{"hash": "<sha256 hex>"}`   |
//! | `backfill_request`   | required  | `{}`                         |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::digest::ChecksumDigest;
use crate::entities::{BadgeNumber, BadgeRoster, PunchRecord, SystemId};
use crate::errors::EventError;

/// Discriminant of a `SyncEvent`, serialized as `event_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PunchIn,
    PunchOut,
    BadgeRosterSync,
    PunchHistorySync,
    ChecksumAnnounce,
    BackfillRequest,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 6] = [
        EventKind::PunchIn,
        EventKind::PunchOut,
        EventKind::BadgeRosterSync,
        EventKind::PunchHistorySync,
        EventKind::ChecksumAnnounce,
        EventKind::BackfillRequest,
    ];

    /// Wire name (`event_type`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PunchIn => "punch_in",
            EventKind::PunchOut => "punch_out",
            EventKind::BadgeRosterSync => "badge_roster_sync",
            EventKind::PunchHistorySync => "punch_history_sync",
            EventKind::ChecksumAnnounce => "checksum_announce",
            EventKind::BackfillRequest => "backfill_request",
        }
    }

    /// Whether events of this kind name a single badge.
    pub fn is_badge_scoped(&self) -> bool {
        !matches!(self, EventKind::BadgeRosterSync)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific content of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// A badge punched in at the event timestamp.
    PunchIn { badge: BadgeNumber },
    /// A badge punched out at the event timestamp.
    PunchOut { badge: BadgeNumber },
    /// The sender's full badge roster.
    BadgeRosterSync { badges: BadgeRoster },
    /// The sender's full punch list for one badge.
    PunchHistorySync {
        badge: BadgeNumber,
        punches: Vec<PunchRecord>,
    },
    /// The sender's digest of one badge's punch list.
    ChecksumAnnounce { digest: ChecksumDigest },
    /// The sender holds no history for `badge` and asks for a backfill.
    BackfillRequest { badge: BadgeNumber },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::PunchIn { .. } => EventKind::PunchIn,
            EventPayload::PunchOut { .. } => EventKind::PunchOut,
            EventPayload::BadgeRosterSync { .. } => EventKind::BadgeRosterSync,
            EventPayload::PunchHistorySync { .. } => EventKind::PunchHistorySync,
            EventPayload::ChecksumAnnounce { .. } => EventKind::ChecksumAnnounce,
            EventPayload::BackfillRequest { .. } => EventKind::BackfillRequest,
        }
    }

    pub fn badge_number(&self) -> Option<&str> {
        match self {
            EventPayload::PunchIn { badge }
            | EventPayload::PunchOut { badge }
            | EventPayload::PunchHistorySync { badge, .. }
            | EventPayload::BackfillRequest { badge } => Some(badge),
            EventPayload::ChecksumAnnounce { digest } => Some(digest.badge_number()),
            EventPayload::BadgeRosterSync { .. } => None,
        }
    }
}

/// An immutable event as published to the shared topic.
///
/// Serializes to and deserializes from the wire object; decoding validates
/// the payload against `event_type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WireEvent")]
pub struct SyncEvent {
    origin_system_id: SystemId,
    timestamp: DateTime<Utc>,
    payload: EventPayload,
}

impl SyncEvent {
    pub fn new(origin_system_id: impl Into<SystemId>, timestamp: DateTime<Utc>, payload: EventPayload) -> Self {
        Self {
            origin_system_id: origin_system_id.into(),
            timestamp,
            payload,
        }
    }

    pub fn punch_in(origin: impl Into<SystemId>, badge: impl Into<BadgeNumber>, at: DateTime<Utc>) -> Self {
        Self::new(origin, at, EventPayload::PunchIn { badge: badge.into() })
    }

    pub fn punch_out(origin: impl Into<SystemId>, badge: impl Into<BadgeNumber>, at: DateTime<Utc>) -> Self {
        Self::new(origin, at, EventPayload::PunchOut { badge: badge.into() })
    }

    pub fn roster_sync(origin: impl Into<SystemId>, badges: BadgeRoster) -> Self {
        Self::new(origin, Utc::now(), EventPayload::BadgeRosterSync { badges })
    }

    pub fn history_sync(
        origin: impl Into<SystemId>,
        badge: impl Into<BadgeNumber>,
        punches: Vec<PunchRecord>,
    ) -> Self {
        Self::new(
            origin,
            Utc::now(),
            EventPayload::PunchHistorySync {
                badge: badge.into(),
                punches,
            },
        )
    }

    pub fn checksum_announce(origin: impl Into<SystemId>, digest: ChecksumDigest) -> Self {
        Self::new(origin, Utc::now(), EventPayload::ChecksumAnnounce { digest })
    }

    pub fn backfill_request(origin: impl Into<SystemId>, badge: impl Into<BadgeNumber>) -> Self {
        Self::new(origin, Utc::now(), EventPayload::BackfillRequest { badge: badge.into() })
    }

    /// Node that emitted the event.
    pub fn origin_system_id(&self) -> &str {
        &self.origin_system_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Badge the event is about; `None` for roster-wide events.
    pub fn badge_number(&self) -> Option<&str> {
        self.payload.badge_number()
    }

    /// True when `system_id` names the node that emitted this event.
    pub fn is_from(&self, system_id: &str) -> bool {
        self.origin_system_id == system_id
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>, EventError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode and validate wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, EventError> {
        let wire: WireEvent = serde_json::from_slice(bytes)?;
        SyncEvent::try_from(wire)
    }
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// The raw wire object before payload validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireEvent {
    pub system_id: String,
    pub badge_num: Option<String>,
    pub event_type: EventKind,
    pub ts: DateTime<Utc>,
    pub details: Value,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoDetails {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RosterDetails {
    badges: BadgeRoster,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct HistoryDetails {
    punches: Vec<PunchRecord>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ChecksumDetails {
    hash: String,
}

/// Borrowed view used for serialization, so encoding never clones payloads.
#[derive(Serialize)]
struct WireEventRef<'a> {
    system_id: &'a str,
    badge_num: Option<&'a str>,
    event_type: EventKind,
    ts: &'a DateTime<Utc>,
    details: DetailsRef<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum DetailsRef<'a> {
    Empty(NoDetails),
    Roster { badges: &'a BadgeRoster },
    History { punches: &'a [PunchRecord] },
    Checksum { hash: &'a str },
}

impl Serialize for SyncEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let details = match &self.payload {
            EventPayload::PunchIn { .. }
            | EventPayload::PunchOut { .. }
            | EventPayload::BackfillRequest { .. } => DetailsRef::Empty(NoDetails {}),
            EventPayload::BadgeRosterSync { badges } => DetailsRef::Roster { badges },
            EventPayload::PunchHistorySync { punches, .. } => DetailsRef::History { punches },
            EventPayload::ChecksumAnnounce { digest } => DetailsRef::Checksum {
                hash: digest.hash(),
            },
        };
        WireEventRef {
            system_id: &self.origin_system_id,
            badge_num: self.badge_number(),
            event_type: self.kind(),
            ts: &self.timestamp,
            details,
        }
        .serialize(serializer)
    }
}

fn parse_details<T: DeserializeOwned>(kind: EventKind, details: Value) -> Result<T, EventError> {
    serde_json::from_value(details).map_err(|e| EventError::InvalidDetails {
        kind,
        reason: e.to_string(),
    })
}

impl TryFrom<WireEvent> for SyncEvent {
    type Error = EventError;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        if wire.system_id.is_empty() {
            return Err(EventError::MissingOrigin);
        }

        let kind = wire.event_type;
        let badge = match (kind.is_badge_scoped(), wire.badge_num) {
            (true, Some(badge)) if !badge.is_empty() => Some(badge),
            (true, _) => return Err(EventError::MissingBadge { kind }),
            (false, Some(_)) => return Err(EventError::UnexpectedBadge { kind }),
            (false, None) => None,
        };
        // Badge-scoped kinds always carry a badge from here on.
        let badge = badge.unwrap_or_default();

        let payload = match kind {
            EventKind::PunchIn => {
                parse_details::<NoDetails>(kind, wire.details)?;
                EventPayload::PunchIn { badge }
            }
            EventKind::PunchOut => {
                parse_details::<NoDetails>(kind, wire.details)?;
                EventPayload::PunchOut { badge }
            }
            EventKind::BackfillRequest => {
                parse_details::<NoDetails>(kind, wire.details)?;
                EventPayload::BackfillRequest { badge }
            }
            EventKind::BadgeRosterSync => {
                let RosterDetails { badges } = parse_details(kind, wire.details)?;
                EventPayload::BadgeRosterSync { badges }
            }
            EventKind::PunchHistorySync => {
                let HistoryDetails { punches } = parse_details(kind, wire.details)?;
                EventPayload::PunchHistorySync { badge, punches }
            }
            EventKind::ChecksumAnnounce => {
                let ChecksumDetails { hash } = parse_details(kind, wire.details)?;
                EventPayload::ChecksumAnnounce {
                    digest: ChecksumDigest::from_parts(badge, hash)?,
                }
            }
        };

        Ok(SyncEvent {
            origin_system_id: wire.system_id,
            timestamp: wire.ts,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Badge, BadgeStatus};
    use chrono::TimeZone;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 0, 0).unwrap()
    }

    fn sample_events() -> Vec<SyncEvent> {
        let mut roster = BadgeRoster::new();
        roster.insert("1001".into(), Badge::named("Ada"));
        roster.insert(
            "1002".into(),
            Badge {
                display_name: Some("Grace".into()),
                photo_url: Some("https://example.org/grace.png".into()),
                status: BadgeStatus::In,
            },
        );
        let punches = vec![
            PunchRecord::closed(t0(), t0() + chrono::Duration::hours(4)),
            PunchRecord::open(t0() + chrono::Duration::days(1)),
        ];
        let digest = ChecksumDigest::compute("1001", &punches).unwrap();

        vec![
            SyncEvent::punch_in("east", "1001", t0()),
            SyncEvent::punch_out("east", "1001", t0() + chrono::Duration::seconds(30)),
            SyncEvent::new("east", t0(), EventPayload::BadgeRosterSync { badges: roster }),
            SyncEvent::new(
                "east",
                t0(),
                EventPayload::PunchHistorySync {
                    badge: "1001".into(),
                    punches,
                },
            ),
            SyncEvent::new("east", t0(), EventPayload::ChecksumAnnounce { digest }),
            SyncEvent::new("west", t0(), EventPayload::BackfillRequest { badge: "1001".into() }),
        ]
    }

    #[test]
    fn test_round_trip_every_kind() {
        let events = sample_events();
        let kinds: Vec<EventKind> = events.iter().map(SyncEvent::kind).collect();
        assert_eq!(kinds, EventKind::ALL.to_vec());

        for event in events {
            let bytes = event.encode().unwrap();
            let back = SyncEvent::decode(&bytes).unwrap();
            assert_eq!(back, event, "round trip changed {}", event.kind());
        }
    }

    #[test]
    fn test_wire_shape_of_punch_in() {
        let value = serde_json::to_value(SyncEvent::punch_in("east", "1001", t0())).unwrap();
        assert_eq!(
            value,
            json!({
                "system_id": "east",
                "badge_num": "1001",
                "event_type": "punch_in",
                "ts": "2024-05-06T07:00:00Z",
                "details": {}
            })
        );
    }

    #[test]
    fn test_roster_sync_has_null_badge() {
        let value = serde_json::to_value(SyncEvent::new(
            "east",
            t0(),
            EventPayload::BadgeRosterSync {
                badges: BadgeRoster::new(),
            },
        ))
        .unwrap();
        assert_eq!(value["badge_num"], Value::Null);
        assert_eq!(value["details"], json!({ "badges": {} }));
    }

    #[test]
    fn test_payload_mismatch_rejected_at_decode() {
        let bytes = serde_json::to_vec(&json!({
            "system_id": "east",
            "badge_num": "1001",
            "event_type": "punch_in",
            "ts": "2024-05-06T07:00:00Z",
            "details": { "hash": "00" }
        }))
        .unwrap();
        assert!(matches!(
            SyncEvent::decode(&bytes),
            Err(EventError::InvalidDetails {
                kind: EventKind::PunchIn,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_badge_rejected() {
        let wire = WireEvent {
            system_id: "east".into(),
            badge_num: None,
            event_type: EventKind::PunchOut,
            ts: t0(),
            details: json!({}),
        };
        assert_eq!(
            SyncEvent::try_from(wire),
            Err(EventError::MissingBadge {
                kind: EventKind::PunchOut
            })
        );
    }

    #[test]
    fn test_roster_with_badge_rejected() {
        let wire = WireEvent {
            system_id: "east".into(),
            badge_num: Some("1001".into()),
            event_type: EventKind::BadgeRosterSync,
            ts: t0(),
            details: json!({ "badges": {} }),
        };
        assert!(matches!(
            SyncEvent::try_from(wire),
            Err(EventError::UnexpectedBadge { .. })
        ));
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let wire = WireEvent {
            system_id: "east".into(),
            badge_num: Some("1001".into()),
            event_type: EventKind::ChecksumAnnounce,
            ts: t0(),
            details: json!({ "hash": "xyz" }),
        };
        assert!(matches!(
            SyncEvent::try_from(wire),
            Err(EventError::InvalidDigest(_))
        ));
    }

    #[test]
    fn test_empty_origin_rejected() {
        let wire = WireEvent {
            system_id: String::new(),
            badge_num: Some("1001".into()),
            event_type: EventKind::PunchIn,
            ts: t0(),
            details: json!({}),
        };
        assert_eq!(SyncEvent::try_from(wire), Err(EventError::MissingOrigin));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(matches!(
            SyncEvent::decode(b"1001 punch_in at 2024-05-06 07:00:00"),
            Err(EventError::Encoding(_))
        ));
    }

    #[test]
    fn test_self_origin() {
        let event = SyncEvent::punch_in("east", "1001", t0());
        assert!(event.is_from("east"));
        assert!(!event.is_from("west"));
        assert_eq!(event.badge_number(), Some("1001"));
    }
}
