//! The main context: one task that owns the tracker and the forecast
//! controller and is the only place consumer callbacks run.

use std::time::Duration;

use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::AbortHandle,
};

use crate::{
    error::FetchError,
    fetcher::{FORECAST_ENTRIES, ForecastConsumer, ForecastOutcome, WeatherFetcher},
    location::{LocationConsumer, LocationSensor, LocationTracker, SensorEvent},
    model::{Coordinate, Forecast},
};

/// Delay before asking again after a failed fetch.
pub const RETRY_DELAY: Duration = Duration::from_secs(15);

/// The user-facing side: whatever draws the weather.
pub trait Presenter {
    fn show_forecast(&mut self, forecast: &Forecast);

    /// `placeholder` is true while no forecast has been shown yet.
    fn show_fetch_failure(&mut self, placeholder: bool);

    fn show_permission_lost(&mut self);
}

/// Work posted to the main context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Fetch again for the last known position, or locate first if there is none.
    Refresh,
    RequestLocation,
    /// A retry timer expired; carries the generation it was scheduled with.
    RetryDue(u64),
    Shutdown,
}

/// Cloneable way to poke a running [`Umbrella`] from other tasks.
#[derive(Debug, Clone)]
pub struct UmbrellaHandle {
    actions: UnboundedSender<Action>,
}

impl UmbrellaHandle {
    /// Returns false once the loop has gone away.
    pub fn send(&self, action: Action) -> bool {
        self.actions.send(action).is_ok()
    }

    pub fn refresh(&self) -> bool {
        self.send(Action::Refresh)
    }

    pub fn shutdown(&self) -> bool {
        self.send(Action::Shutdown)
    }
}

/// Consumer of both location and forecast notifications. Owns retry scheduling.
#[derive(Debug)]
pub struct Controller<P> {
    fetcher: WeatherFetcher,
    presenter: P,
    actions: UnboundedSender<Action>,
    pending_retry: Option<(u64, AbortHandle)>,
    retry_generation: u64,
    retry_delay: Duration,
    placeholder: bool,
}

impl<P: Presenter> Controller<P> {
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn retry_pending(&self) -> bool {
        self.pending_retry.is_some()
    }

    /// Start a fetch; a pending retry is superseded by it.
    pub fn fetch(&mut self, coordinate: Coordinate) {
        self.cancel_retry();
        self.fetcher.request_forecast(coordinate);
    }

    fn schedule_retry(&mut self) {
        self.cancel_retry();

        self.retry_generation += 1;
        let generation = self.retry_generation;

        tracing::info!(
            delay_secs = self.retry_delay.as_secs(),
            generation,
            "scheduling forecast retry"
        );
        let actions = self.actions.clone();
        let delay = self.retry_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = actions.send(Action::RetryDue(generation));
        });
        self.pending_retry = Some((generation, task.abort_handle()));
    }

    fn cancel_retry(&mut self) {
        if let Some((generation, retry)) = self.pending_retry.take() {
            tracing::debug!(generation, "cancelling pending retry");
            retry.abort();
        }
    }

    /// Claim the pending retry if `generation` is still the current one.
    ///
    /// A timer may already have queued its `RetryDue` when a newer fetch
    /// cancelled it; such stale notifications are rejected here.
    fn take_due_retry(&mut self, generation: u64) -> bool {
        match self.pending_retry {
            Some((pending, _)) if pending == generation => {
                self.pending_retry = None;
                true
            }
            _ => false,
        }
    }
}

impl<P> Drop for Controller<P> {
    fn drop(&mut self) {
        if let Some((_, retry)) = self.pending_retry.take() {
            retry.abort();
        }
    }
}

impl<P: Presenter> LocationConsumer for Controller<P> {
    fn location_updated(&mut self, coordinate: Coordinate) {
        self.fetch(coordinate);
    }

    fn permission_lost(&mut self) {
        self.presenter.show_permission_lost();
    }

    fn permission_gained(&mut self) {
        let _ = self.actions.send(Action::RequestLocation);
    }
}

impl<P: Presenter> ForecastConsumer for Controller<P> {
    fn forecast_ready(&mut self, forecast: Forecast) {
        debug_assert_eq!(forecast.len(), FORECAST_ENTRIES);

        self.presenter.show_forecast(&forecast);
        self.placeholder = false;
    }

    fn fetch_failed(&mut self, _error: &FetchError) {
        self.presenter.show_fetch_failure(self.placeholder);
        self.schedule_retry();
    }
}

/// Event loop wiring sensor, tracker, fetcher and presenter together.
#[derive(Debug)]
pub struct Umbrella<S, P> {
    tracker: LocationTracker<S>,
    controller: Controller<P>,
    sensor_events: UnboundedReceiver<SensorEvent>,
    outcomes: UnboundedReceiver<ForecastOutcome>,
    actions: UnboundedReceiver<Action>,
}

impl<S: LocationSensor, P: Presenter> Umbrella<S, P> {
    pub fn new(
        sensor: S,
        sensor_events: UnboundedReceiver<SensorEvent>,
        fetcher: WeatherFetcher,
        outcomes: UnboundedReceiver<ForecastOutcome>,
        presenter: P,
    ) -> (Self, UmbrellaHandle) {
        let (actions_tx, actions) = unbounded_channel();

        let controller = Controller {
            fetcher,
            presenter,
            actions: actions_tx.clone(),
            pending_retry: None,
            retry_generation: 0,
            retry_delay: RETRY_DELAY,
            placeholder: true,
        };

        let umbrella = Self {
            tracker: LocationTracker::new(sensor),
            controller,
            sensor_events,
            outcomes,
            actions,
        };

        (umbrella, UmbrellaHandle { actions: actions_tx })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.controller.retry_delay = delay;
        self
    }

    pub fn tracker(&self) -> &LocationTracker<S> {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut LocationTracker<S> {
        &mut self.tracker
    }

    pub fn controller(&self) -> &Controller<P> {
        &self.controller
    }

    pub fn presenter(&self) -> &P {
        self.controller.presenter()
    }

    /// Run until [`Action::Shutdown`] or until every input channel closes.
    pub async fn run(mut self) -> Self {
        self.start();
        while self.step().await {}
        self
    }

    /// Kick things off by asking for a location.
    pub fn start(&mut self) {
        self.tracker.request_location(&mut self.controller);
    }

    /// Wait for and handle one event. Returns false when the loop should stop.
    pub async fn step(&mut self) -> bool {
        tokio::select! {
            Some(event) = self.sensor_events.recv() => {
                self.tracker.handle(event, &mut self.controller);
                true
            }
            Some(outcome) = self.outcomes.recv() => {
                outcome.deliver(&mut self.controller);
                true
            }
            Some(action) = self.actions.recv() => self.handle_action(action),
            else => false,
        }
    }

    fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::Refresh => self.refresh(),
            Action::RequestLocation => self.tracker.request_location(&mut self.controller),
            Action::RetryDue(generation) => {
                if self.controller.take_due_retry(generation) {
                    tracing::info!(generation, "firing postponed forecast request");
                    self.refresh();
                } else {
                    tracing::debug!(generation, "ignoring superseded retry");
                }
            }
            Action::Shutdown => return false,
        }
        true
    }

    fn refresh(&mut self) {
        match self.tracker.last_location() {
            Some(coordinate) => self.controller.fetch(coordinate),
            None => self.tracker.request_location(&mut self.controller),
        }
    }
}
