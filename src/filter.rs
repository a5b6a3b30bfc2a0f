//! Entity selection by type, route, stop and trip.

use serde::Serialize;

use crate::model::{EntityKind, EntityType, FeedEntity};

/// Caller-supplied selection. Unset or empty fields do not constrain; set
/// fields are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub entity_type: Option<EntityType>,
    pub route_id: Option<String>,
    pub stop_id: Option<String>,
    pub trip_id: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn route_id(mut self, route_id: impl Into<String>) -> Self {
        self.route_id = non_empty(route_id.into());
        self
    }

    pub fn stop_id(mut self, stop_id: impl Into<String>) -> Self {
        self.stop_id = non_empty(stop_id.into());
        self
    }

    pub fn trip_id(mut self, trip_id: impl Into<String>) -> Self {
        self.trip_id = non_empty(trip_id.into());
        self
    }

    /// Sets all three trip fields at once, dropping empty values.
    pub fn trip_fields(
        self,
        route_id: Option<String>,
        stop_id: Option<String>,
        trip_id: Option<String>,
    ) -> Self {
        Self {
            route_id: route_id.and_then(non_empty),
            stop_id: stop_id.and_then(non_empty),
            trip_id: trip_id.and_then(non_empty),
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entity_type.is_none() && !self.constrains_trip_fields()
    }

    fn route(&self) -> Option<&str> {
        given(&self.route_id)
    }

    fn stop(&self) -> Option<&str> {
        given(&self.stop_id)
    }

    fn trip(&self) -> Option<&str> {
        given(&self.trip_id)
    }

    fn constrains_trip_fields(&self) -> bool {
        self.route().is_some() || self.stop().is_some() || self.trip().is_some()
    }

    pub fn matches(&self, entity: &FeedEntity) -> bool {
        includes(entity, self)
    }
}

/// Returns `true` if `entity` satisfies every field set in `criteria`.
///
/// | criterion   | alert            | trip update              | vehicle          |
/// |-------------|------------------|--------------------------|------------------|
/// | entity_type | variant match    | variant match            | variant match    |
/// | route_id    | never            | `trip.route_id`          | `trip.route_id`  |
/// | stop_id     | never            | any stop time update     | current stop     |
/// | trip_id     | never            | `trip.trip_id`           | `trip.trip_id`   |
pub fn includes(entity: &FeedEntity, criteria: &FilterCriteria) -> bool {
    if criteria.is_empty() {
        return true;
    }

    if criteria
        .entity_type
        .is_some_and(|wanted| wanted != entity.entity_type())
    {
        return false;
    }

    let stop_matches = match &entity.kind {
        // Alerts have no single trip or stop to compare against.
        EntityKind::Alert(_) => return !criteria.constrains_trip_fields(),
        EntityKind::TripUpdate(update) => criteria
            .stop()
            .is_none_or(|stop| update.serves_stop(stop)),
        EntityKind::Vehicle(vehicle) => criteria.stop().is_none_or(|stop| vehicle.stop_id == stop),
    };

    let Some(trip) = entity.trip() else {
        return false;
    };

    stop_matches
        && criteria.route().is_none_or(|route| trip.route_id == route)
        && criteria.trip().is_none_or(|id| trip.trip_id == id)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

// An empty string counts as unset, even when assigned to a field directly.
fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Keeps the entities matching `criteria`, in their original order.
pub fn filter_entities(entities: Vec<FeedEntity>, criteria: &FilterCriteria) -> Vec<FeedEntity> {
    if criteria.is_empty() {
        return entities;
    }
    entities
        .into_iter()
        .filter(|entity| includes(entity, criteria))
        .collect()
}
