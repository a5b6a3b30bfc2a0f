//! Wire-format fixtures shared by the integration tests.

#![allow(dead_code)]

use gtfs_rt_feeds::gtfs_rt::{
    Alert, EntitySelector, FeedEntity, FeedHeader, FeedMessage, TranslatedString,
    TripDescriptor, TripUpdate, VehiclePosition, translated_string, trip_update,
    vehicle_position::VehicleStopStatus,
};
use prost::Message;

pub const FEED_TIMESTAMP: u64 = 1_700_000_000;

pub fn descriptor(trip_id: &str, route_id: &str) -> TripDescriptor {
    TripDescriptor {
        trip_id: Some(trip_id.to_string()),
        route_id: Some(route_id.to_string()),
        start_time: Some("08:00:00".to_string()),
        start_date: Some("20240101".to_string()),
        ..Default::default()
    }
}

pub fn trip_entity(id: &str, trip_id: &str, route_id: &str, stops: &[&str]) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        trip_update: Some(TripUpdate {
            trip: descriptor(trip_id, route_id),
            stop_time_update: stops
                .iter()
                .enumerate()
                .map(|(i, stop)| trip_update::StopTimeUpdate {
                    stop_id: Some(stop.to_string()),
                    arrival: Some(trip_update::StopTimeEvent {
                        time: Some(FEED_TIMESTAMP as i64 + 60 * i as i64),
                        ..Default::default()
                    }),
                    departure: Some(trip_update::StopTimeEvent {
                        time: Some(FEED_TIMESTAMP as i64 + 60 * i as i64 + 30),
                        ..Default::default()
                    }),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn vehicle_entity(id: &str, trip_id: &str, route_id: &str, stop_id: &str) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        vehicle: Some(VehiclePosition {
            trip: Some(descriptor(trip_id, route_id)),
            timestamp: Some(FEED_TIMESTAMP - 15),
            stop_id: Some(stop_id.to_string()),
            current_stop_sequence: Some(4),
            current_status: Some(VehicleStopStatus::InTransitTo as i32),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn alert_entity(id: &str, text: &str, trip_id: &str, route_id: &str) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        alert: Some(Alert {
            header_text: Some(TranslatedString {
                translation: vec![translated_string::Translation {
                    text: text.to_string(),
                    language: Some("en".to_string()),
                }],
            }),
            informed_entity: vec![EntitySelector {
                trip: Some(descriptor(trip_id, route_id)),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn encode(entity: Vec<FeedEntity>) -> Vec<u8> {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "1.0".to_string(),
            timestamp: Some(FEED_TIMESTAMP),
            ..Default::default()
        },
        entity,
    }
    .encode_to_vec()
}

/// Ten entities interleaving 3 trip updates, 4 vehicles and 3 alerts.
pub fn ace_feed() -> Vec<u8> {
    encode(vec![
        trip_entity("tu1", "A-101", "A", &["A02N", "A03N", "A05N"]),
        vehicle_entity("v1", "A-101", "A", "A03N"),
        alert_entity("al1", "A trains delayed", "A-101", "A"),
        trip_entity("tu2", "C-201", "C", &["A15S", "A20S"]),
        vehicle_entity("v2", "C-201", "C", "A15S"),
        vehicle_entity("v3", "E-301", "E", "F12N"),
        alert_entity("al2", "C trains rerouted", "C-201", "C"),
        trip_entity("tu3", "E-301", "E", &["F12N", "A15S"]),
        vehicle_entity("v4", "A-102", "A", "A15S"),
        alert_entity("al3", "Elevator outage", "E-301", "E"),
    ])
}
