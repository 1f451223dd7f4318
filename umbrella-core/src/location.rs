//! Location permission handling and coarse, debounced position updates.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt::Display;

use crate::model::Coordinate;

/// Weather does not change block to block; ask the sensor for a 3 km fix.
pub const DESIRED_ACCURACY_METERS: f64 = 3000.0;
pub const DISTANCE_FILTER_METERS: f64 = 3000.0;

/// Minimum spacing between accepted updates. The sensor's own filters are not reliable.
pub const UPDATE_DEBOUNCE: TimeDelta = TimeDelta::seconds(10);

/// Authorization as reported by the platform sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

/// What the tracker cares about in an [`AuthorizationStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Undetermined,
    Denied,
    Authorized,
}

impl AuthorizationStatus {
    pub fn permission(&self) -> PermissionState {
        match self {
            Self::NotDetermined => PermissionState::Undetermined,
            Self::Restricted | Self::Denied => PermissionState::Denied,
            Self::AuthorizedWhenInUse | Self::AuthorizedAlways => PermissionState::Authorized,
        }
    }
}

/// Platform location service.
///
/// Results come back asynchronously through [`SensorEvent`]s, which the owner
/// feeds into the tracker on the main context.
pub trait LocationSensor {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Show the permission prompt.
    fn request_authorization(&mut self);

    /// Ask for a single fix.
    fn request_location(&mut self);

    fn set_accuracy(&mut self, desired_accuracy_meters: f64, distance_filter_meters: f64);
}

/// Callbacks coming out of a [`LocationSensor`].
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    AuthorizationChanged(AuthorizationStatus),
    /// Oldest first; only the last one matters.
    LocationsUpdated(Vec<Coordinate>),
    Failed(String),
}

/// Receiver of location notifications. Implement whichever you need.
pub trait LocationConsumer {
    fn location_updated(&mut self, _coordinate: Coordinate) {}

    fn permission_lost(&mut self) {}

    fn permission_gained(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastKnownLocation {
    pub coordinate: Coordinate,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct LocationTracker<S> {
    sensor: S,
    last: Option<LastKnownLocation>,
}

impl<S: LocationSensor> LocationTracker<S> {
    pub fn new(mut sensor: S) -> Self {
        sensor.set_accuracy(DESIRED_ACCURACY_METERS, DISTANCE_FILTER_METERS);
        Self { sensor, last: None }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn last_known(&self) -> Option<LastKnownLocation> {
        self.last
    }

    pub fn last_location(&self) -> Option<Coordinate> {
        self.last.map(|last| last.coordinate)
    }

    /// Prompt for permission, ask for a fix, or report that we have no access.
    pub fn request_location(&mut self, consumer: &mut dyn LocationConsumer) {
        match self.sensor.authorization_status().permission() {
            PermissionState::Undetermined => {
                tracing::debug!("requesting location permission");
                self.sensor.request_authorization();
            }
            PermissionState::Authorized => {
                tracing::debug!("requesting location");
                self.sensor.request_location();
            }
            PermissionState::Denied => consumer.permission_lost(),
        }
    }

    pub fn on_authorization_changed(
        &mut self,
        status: AuthorizationStatus,
        consumer: &mut dyn LocationConsumer,
    ) {
        tracing::debug!(?status, "authorization changed");
        match status.permission() {
            PermissionState::Denied => consumer.permission_lost(),
            PermissionState::Authorized => consumer.permission_gained(),
            PermissionState::Undetermined => {}
        }
    }

    pub fn on_location_update(
        &mut self,
        coordinate: Coordinate,
        consumer: &mut dyn LocationConsumer,
    ) {
        self.on_location_update_at(coordinate, Utc::now(), consumer);
    }

    /// Accept `coordinate` unless the previous accepted update is younger than
    /// [`UPDATE_DEBOUNCE`] at `now`.
    pub fn on_location_update_at(
        &mut self,
        coordinate: Coordinate,
        now: DateTime<Utc>,
        consumer: &mut dyn LocationConsumer,
    ) {
        debug_assert!(coordinate.is_valid(), "sensor reported {coordinate:?}");

        if let Some(last) = self.last {
            if now - last.updated_at < UPDATE_DEBOUNCE {
                tracing::debug!(?coordinate, "filtering location update");
                return;
            }
        }

        tracing::info!(
            latitude = coordinate.latitude,
            longitude = coordinate.longitude,
            "location updated"
        );
        self.last = Some(LastKnownLocation { coordinate, updated_at: now });
        consumer.location_updated(coordinate);
    }

    /// Sensor errors are transient and resolve on the next fix.
    pub fn on_location_error(&self, error: impl Display) {
        tracing::warn!(%error, "location sensor error");
    }

    /// Route a raw sensor callback to the matching handler.
    pub fn handle(&mut self, event: SensorEvent, consumer: &mut dyn LocationConsumer) {
        match event {
            SensorEvent::AuthorizationChanged(status) => {
                self.on_authorization_changed(status, consumer)
            }
            SensorEvent::LocationsUpdated(locations) => {
                if let Some(latest) = locations.last() {
                    self.on_location_update(*latest, consumer);
                }
            }
            SensorEvent::Failed(error) => self.on_location_error(error),
        }
    }
}
