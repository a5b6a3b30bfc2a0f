//! Protobuf decoder for GTFS Realtime feeds.
//!
//! [`decode`] turns raw bytes into a [`FeedSnapshot`]. The wire entity keeps
//! its variants as independent optional fields; the projection below looks
//! at all three once and rejects entities that do not carry exactly one.

use prost::Message;

use crate::error::ProcessingError;
use crate::gtfs_rt;
use crate::model::{
    Alert, EntityKind, FeedEntity, FeedHeader, FeedSnapshot, StopTimeUpdate, Translation, TripRef,
    TripUpdate, VehiclePosition, VehicleStopStatus,
};

/// Decodes a protobuf-encoded GTFS-RT [`gtfs_rt::FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<gtfs_rt::FeedMessage, ProcessingError> {
    Ok(gtfs_rt::FeedMessage::decode(bytes)?)
}

/// Decodes raw bytes into a typed snapshot, preserving entity order.
///
/// # Errors
///
/// Any malformed payload or structurally inconsistent entity yields a
/// [`ProcessingError`]; nothing lower-level escapes.
pub fn decode(bytes: &[u8]) -> Result<FeedSnapshot, ProcessingError> {
    FeedSnapshot::try_from(parse_feed(bytes)?)
}

impl TryFrom<gtfs_rt::FeedMessage> for FeedSnapshot {
    type Error = ProcessingError;

    fn try_from(message: gtfs_rt::FeedMessage) -> Result<Self, Self::Error> {
        let header = FeedHeader {
            timestamp: required(message.header.timestamp, "feed header", "timestamp")?,
            gtfs_realtime_version: message.header.gtfs_realtime_version,
        };

        let entities = message
            .entity
            .into_iter()
            .map(FeedEntity::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeedSnapshot { header, entities })
    }
}

impl TryFrom<gtfs_rt::FeedEntity> for FeedEntity {
    type Error = ProcessingError;

    fn try_from(entity: gtfs_rt::FeedEntity) -> Result<Self, Self::Error> {
        let gtfs_rt::FeedEntity {
            id,
            alert,
            trip_update,
            vehicle,
            ..
        } = entity;

        let kind = match (alert, trip_update, vehicle) {
            (Some(alert), None, None) => EntityKind::Alert(project_alert(&id, alert)),
            (None, Some(update), None) => EntityKind::TripUpdate(project_trip_update(&id, update)?),
            (None, None, Some(vehicle)) => EntityKind::Vehicle(project_vehicle(&id, vehicle)?),
            (None, None, None) => return Err(ProcessingError::MissingVariant { entity_id: id }),
            (alert, trip_update, vehicle) => {
                let populated = [
                    ("alert", alert.is_some()),
                    ("trip_update", trip_update.is_some()),
                    ("vehicle", vehicle.is_some()),
                ]
                .into_iter()
                .filter_map(|(name, set)| set.then_some(name))
                .collect();
                return Err(ProcessingError::AmbiguousVariant {
                    entity_id: id,
                    populated,
                });
            }
        };

        Ok(FeedEntity { id, kind })
    }
}

fn required<T>(value: Option<T>, context: &str, field: &'static str) -> Result<T, ProcessingError> {
    value.ok_or_else(|| ProcessingError::MissingField {
        context: context.to_string(),
        field,
    })
}

fn project_trip(entity_id: &str, trip: gtfs_rt::TripDescriptor) -> Result<TripRef, ProcessingError> {
    let context = format!("trip of entity '{entity_id}'");
    Ok(TripRef {
        trip_id: required(trip.trip_id, &context, "trip_id")?,
        route_id: required(trip.route_id, &context, "route_id")?,
        start_time: trip.start_time,
        start_date: trip.start_date,
    })
}

// Informed entities that select a route, stop or agency rather than a trip
// are not carried over.
fn project_alert(entity_id: &str, alert: gtfs_rt::Alert) -> Alert {
    let header_text = alert
        .header_text
        .map(|text| {
            text.translation
                .into_iter()
                .map(|t| Translation {
                    text: t.text,
                    language: t.language,
                })
                .collect()
        })
        .unwrap_or_default();

    let informed_trips = alert
        .informed_entity
        .into_iter()
        .filter_map(|selector| selector.trip)
        .filter_map(|trip| match project_trip(entity_id, trip) {
            Ok(trip) => Some(trip),
            Err(e) => {
                tracing::debug!(entity_id, error = %e, "Skipping incomplete informed trip");
                None
            }
        })
        .collect();

    Alert {
        header_text,
        informed_trips,
    }
}

fn project_trip_update(
    entity_id: &str,
    update: gtfs_rt::TripUpdate,
) -> Result<TripUpdate, ProcessingError> {
    let stop_time_updates = update
        .stop_time_update
        .into_iter()
        .map(|stu| StopTimeUpdate {
            stop_id: stu.stop_id,
            arrival: stu.arrival.and_then(|event| event.time),
            departure: stu.departure.and_then(|event| event.time),
        })
        .collect();

    Ok(TripUpdate {
        trip: project_trip(entity_id, update.trip)?,
        stop_time_updates,
    })
}

fn project_vehicle(
    entity_id: &str,
    vehicle: gtfs_rt::VehiclePosition,
) -> Result<VehiclePosition, ProcessingError> {
    let context = format!("vehicle of entity '{entity_id}'");

    let current_status = vehicle
        .current_status
        .map(|raw| stop_status(entity_id, raw))
        .transpose()?;

    Ok(VehiclePosition {
        trip: project_trip(entity_id, required(vehicle.trip, &context, "trip")?)?,
        timestamp: required(vehicle.timestamp, &context, "timestamp")?,
        stop_id: required(vehicle.stop_id, &context, "stop_id")?,
        current_stop_sequence: vehicle.current_stop_sequence,
        current_status,
    })
}

fn stop_status(entity_id: &str, raw: i32) -> Result<VehicleStopStatus, ProcessingError> {
    use gtfs_rt::vehicle_position::VehicleStopStatus as Wire;

    match Wire::try_from(raw) {
        Ok(Wire::IncomingAt) => Ok(VehicleStopStatus::IncomingAt),
        Ok(Wire::StoppedAt) => Ok(VehicleStopStatus::StoppedAt),
        Ok(Wire::InTransitTo) => Ok(VehicleStopStatus::InTransitTo),
        Err(_) => Err(ProcessingError::UnknownStatus {
            entity_id: entity_id.to_string(),
            value: raw,
        }),
    }
}
