//! Typed view of a decoded GTFS-Realtime feed.
//!
//! Every [`FeedEntity`] carries exactly one [`EntityKind`]; the variant is
//! fixed when the wire message is decoded (see [`crate::parser`]) and read
//! back only by matching on it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Response-header name used to surface [`FeedHeader::gtfs_realtime_version`].
pub const VERSION_HEADER: &str = "X-GTFS-RT-Version";
/// Response-header name used to surface [`FeedHeader::timestamp`].
pub const TIMESTAMP_HEADER: &str = "X-GTFS-RT-Timestamp";

/// Feed-level metadata copied from the wire header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedHeader {
    pub gtfs_realtime_version: String,
    /// POSIX seconds at which the producer generated the feed.
    pub timestamp: u64,
}

impl FeedHeader {
    /// Header name/value pairs a caller can attach to its own response.
    pub fn metadata(&self) -> [(&'static str, String); 2] {
        [
            (VERSION_HEADER, self.gtfs_realtime_version.clone()),
            (TIMESTAMP_HEADER, self.timestamp.to_string()),
        ]
    }

    /// The header timestamp as a UTC datetime, if it is representable.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// The three entity shapes a feed can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityType {
    #[serde(rename = "alert")]
    Alert,
    #[serde(rename = "trip_schedule_update")]
    TripUpdate,
    #[serde(rename = "vehicle_position")]
    Vehicle,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Alert, EntityType::TripUpdate, EntityType::Vehicle];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Alert => "alert",
            EntityType::TripUpdate => "trip_schedule_update",
            EntityType::Vehicle => "vehicle_position",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity type '{0}' (expected alert, trip_schedule_update or vehicle_position)")]
pub struct UnknownEntityType(pub String);

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEntityType(s.to_string()))
    }
}

/// Identifies the trip instance an entity refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripRef {
    pub trip_id: String,
    pub route_id: String,
    /// Scheduled start time, `HH:MM:SS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Service date, `YYYYMMDD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

/// One translated piece of alert text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub header_text: Vec<Translation>,
    /// Trips named by the alert's informed entities.
    pub informed_trips: Vec<TripRef>,
}

/// Predicted times at a single stop of a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopTimeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
    /// Predicted arrival, POSIX seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival: Option<i64>,
    /// Predicted departure, POSIX seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripUpdate {
    pub trip: TripRef,
    pub stop_time_updates: Vec<StopTimeUpdate>,
}

impl TripUpdate {
    pub fn serves_stop(&self, stop_id: &str) -> bool {
        self.stop_time_updates
            .iter()
            .any(|stu| stu.stop_id.as_deref() == Some(stop_id))
    }
}

/// Where a vehicle is relative to its current stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStopStatus {
    IncomingAt,
    StoppedAt,
    InTransitTo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehiclePosition {
    pub trip: TripRef,
    /// POSIX seconds at which the position was measured.
    pub timestamp: u64,
    pub stop_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stop_sequence: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<VehicleStopStatus>,
}

/// The populated variant of a feed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Alert(Alert),
    TripUpdate(TripUpdate),
    Vehicle(VehiclePosition),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntity {
    pub id: String,
    #[serde(flatten)]
    pub kind: EntityKind,
}

impl FeedEntity {
    pub fn entity_type(&self) -> EntityType {
        match self.kind {
            EntityKind::Alert(_) => EntityType::Alert,
            EntityKind::TripUpdate(_) => EntityType::TripUpdate,
            EntityKind::Vehicle(_) => EntityType::Vehicle,
        }
    }

    /// The trip this entity describes. Alerts may name several trips and
    /// therefore have none here.
    pub fn trip(&self) -> Option<&TripRef> {
        match &self.kind {
            EntityKind::Alert(_) => None,
            EntityKind::TripUpdate(update) => Some(&update.trip),
            EntityKind::Vehicle(vehicle) => Some(&vehicle.trip),
        }
    }
}

/// The complete decoded contents of one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    pub header: FeedHeader,
    pub entities: Vec<FeedEntity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip() -> TripRef {
        TripRef {
            trip_id: "t1".into(),
            route_id: "A".into(),
            start_time: None,
            start_date: Some("20240101".into()),
        }
    }

    #[test]
    fn test_entity_type_round_trips_through_str() {
        for t in EntityType::ALL {
            assert_eq!(t.as_str().parse::<EntityType>().unwrap(), t);
        }
        assert!("bus".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_entity_type_follows_variant() {
        let vehicle = FeedEntity {
            id: "v".into(),
            kind: EntityKind::Vehicle(VehiclePosition {
                trip: trip(),
                timestamp: 1,
                stop_id: "A15N".into(),
                current_stop_sequence: None,
                current_status: Some(VehicleStopStatus::StoppedAt),
            }),
        };
        assert_eq!(vehicle.entity_type(), EntityType::Vehicle);
        assert_eq!(vehicle.trip().map(|t| t.trip_id.as_str()), Some("t1"));

        let alert = FeedEntity {
            id: "a".into(),
            kind: EntityKind::Alert(Alert {
                header_text: vec![],
                informed_trips: vec![trip()],
            }),
        };
        assert_eq!(alert.entity_type(), EntityType::Alert);
        assert!(alert.trip().is_none());
    }

    #[test]
    fn test_entity_serializes_with_variant_key() {
        let entity = FeedEntity {
            id: "tu1".into(),
            kind: EntityKind::TripUpdate(TripUpdate {
                trip: trip(),
                stop_time_updates: vec![StopTimeUpdate {
                    stop_id: Some("A15N".into()),
                    arrival: Some(1_700_000_000),
                    departure: None,
                }],
            }),
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["id"], "tu1");
        assert_eq!(json["trip_update"]["trip"]["route_id"], "A");
        assert_eq!(json["trip_update"]["stop_time_updates"][0]["stop_id"], "A15N");
        assert!(json["trip_update"]["stop_time_updates"][0].get("departure").is_none());
    }

    #[test]
    fn test_header_metadata() {
        let header = FeedHeader {
            gtfs_realtime_version: "1.0".into(),
            timestamp: 1_700_000_000,
        };
        let [version, timestamp] = header.metadata();
        assert_eq!(version, (VERSION_HEADER, "1.0".to_string()));
        assert_eq!(timestamp, (TIMESTAMP_HEADER, "1700000000".to_string()));
        assert_eq!(header.generated_at().unwrap().timestamp(), 1_700_000_000);
    }
}
