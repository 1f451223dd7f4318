//! A location "sensor" for machines without one: a fixed, configured position.

use tokio::sync::mpsc::UnboundedSender;
use umbrella_core::{AuthorizationStatus, Coordinate, LocationSensor, SensorEvent};

#[derive(Debug)]
pub struct FixedLocationSensor {
    coordinate: Option<Coordinate>,
    status: AuthorizationStatus,
    events: UnboundedSender<SensorEvent>,
}

impl FixedLocationSensor {
    /// Without a coordinate there is nothing to hand out, which reads as a denial.
    pub fn new(coordinate: Option<Coordinate>, events: UnboundedSender<SensorEvent>) -> Self {
        let status = match coordinate {
            Some(_) => AuthorizationStatus::NotDetermined,
            None => AuthorizationStatus::Denied,
        };
        Self { coordinate, status, events }
    }

    fn emit(&self, event: SensorEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("sensor event dropped, loop has stopped");
        }
    }
}

impl LocationSensor for FixedLocationSensor {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    // Running the command with a location is consent enough.
    fn request_authorization(&mut self) {
        if self.coordinate.is_some() {
            self.status = AuthorizationStatus::AuthorizedWhenInUse;
            self.emit(SensorEvent::AuthorizationChanged(self.status));
        }
    }

    fn request_location(&mut self) {
        match self.coordinate {
            Some(coordinate) => self.emit(SensorEvent::LocationsUpdated(vec![coordinate])),
            None => self.emit(SensorEvent::Failed("no location configured".into())),
        }
    }

    fn set_accuracy(&mut self, desired_accuracy_meters: f64, distance_filter_meters: f64) {
        tracing::debug!(
            desired_accuracy_meters,
            distance_filter_meters,
            "fixed sensor ignores accuracy"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn grants_permission_then_reports_position() {
        let (tx, mut rx) = unbounded_channel();
        let here = Coordinate::new(50.08, 14.43);
        let mut sensor = FixedLocationSensor::new(Some(here), tx);

        assert_eq!(sensor.authorization_status(), AuthorizationStatus::NotDetermined);

        sensor.request_authorization();
        assert_eq!(
            rx.try_recv().unwrap(),
            SensorEvent::AuthorizationChanged(AuthorizationStatus::AuthorizedWhenInUse)
        );

        sensor.request_location();
        assert_eq!(rx.try_recv().unwrap(), SensorEvent::LocationsUpdated(vec![here]));
    }

    #[test]
    fn no_coordinate_is_denied() {
        let (tx, mut rx) = unbounded_channel();
        let mut sensor = FixedLocationSensor::new(None, tx);

        assert_eq!(sensor.authorization_status(), AuthorizationStatus::Denied);
        sensor.request_authorization();
        assert!(rx.try_recv().is_err());
    }
}
