//! Live turn-by-turn navigation
//!
//! [`SessionCore`] is the state machine: it consumes events (trip start,
//! location fixes, gateway responses, user commands) and emits effects
//! (snapshots to publish, leg requests to issue). It is synchronous and
//! single-threaded, so every transition is unit-testable without a runtime.
//!
//! [`NavigationSession`] wraps a core in a tokio task that processes one
//! event queue in arrival order. Gateway calls run as separate tasks and
//! re-enter the queue as generation-tagged results, so nothing ever blocks
//! the location stream and a response from a cancelled or superseded
//! request can be recognized and dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gateway::{DirectionsGateway, GatewayError, RouteLeg, route_with_deadline};
use crate::geo::{distance_meters, initial_bearing};
use crate::instructions;
use crate::measure::{Degrees, Meters, Seconds};
use crate::optimizer::Trip;
use crate::types::{GeoPoint, LocationFix, TransportMode};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("navigation session is closed")]
    Closed,
}

/// Tunable thresholds and limits for a navigation session.
///
/// The defaults mirror common practice (an arrival radius generous enough
/// to absorb urban GPS noise, a tighter step radius, a bounded gateway
/// deadline) but none of them is sacred; callers with better field data
/// should override them.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SessionConfig {
    /// Distance below which the user has reached the current destination.
    pub arrival_threshold: Meters<f64>,

    /// Distance below which the current step's maneuver counts as done.
    pub step_advance_threshold: Meters<f64>,

    /// Deadline for a single directions request.
    pub gateway_deadline: Duration,

    /// Capacity of the session's event queue.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            arrival_threshold: Meters(50.0),
            step_advance_threshold: Meters(30.0),
            gateway_deadline: Duration::from_secs(15),
            event_capacity: 64,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NavStatus {
    Idle,
    RoutingInProgress,
    Navigating,
    ArrivedAtStop,
    Completed,
    RoutingFailed,
}

/// Observable session state, published on every transition.
#[derive(Clone, PartialEq, Debug)]
pub struct NavSnapshot {
    pub status: NavStatus,

    /// 0-based index of the stop currently being navigated to.
    pub destination_index: usize,
    pub destination_name: Option<String>,

    pub current_instruction: Option<String>,
    pub next_instruction: Option<String>,

    pub distance_to_maneuver: Option<Meters<f64>>,
    pub distance_remaining: Option<Meters<f64>>,
    pub heading_to_maneuver: Option<Degrees<f64>>,
    pub eta: Option<DateTime<Utc>>,

    pub last_known_location: Option<GeoPoint>,
    pub last_error: Option<GatewayError>,
}

impl Default for NavSnapshot {
    fn default() -> Self {
        Self {
            status: NavStatus::Idle,
            destination_index: 0,
            destination_name: None,
            current_instruction: None,
            next_instruction: None,
            distance_to_maneuver: None,
            distance_remaining: None,
            heading_to_maneuver: None,
            eta: None,
            last_known_location: None,
            last_error: None,
        }
    }
}

/// A directions request the session wants issued.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LegRequest {
    pub generation: u64,
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub mode: TransportMode,
}

/// What a state transition asks the surrounding runtime to do.
#[derive(Clone, PartialEq, Debug)]
pub enum Effect {
    Publish(NavSnapshot),
    Request(LegRequest),
}

/// Events fed to the state machine, in queue order.
#[derive(Debug)]
pub enum SessionEvent {
    Start(Trip),
    Location(LocationFix),
    Retry,
    Cancel,
    LegResolved {
        generation: u64,
        result: Result<RouteLeg, GatewayError>,
    },
}

/// The navigation state machine.
///
/// Owns every piece of mutable session state; nothing outside its event
/// methods touches it. Each method returns the effects to apply, in order.
pub struct SessionCore {
    config: SessionConfig,
    generation: u64,
    status: NavStatus,
    trip: Option<Trip>,
    destination_index: usize,
    active_leg: Option<RouteLeg>,
    step_index: usize,
    last_fix: Option<LocationFix>,
    last_error: Option<GatewayError>,
}

impl SessionCore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            generation: 0,
            status: NavStatus::Idle,
            trip: None,
            destination_index: 0,
            active_leg: None,
            step_index: 0,
            last_fix: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> NavStatus {
        self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn destination_index(&self) -> usize {
        self.destination_index
    }

    pub fn active_leg(&self) -> Option<&RouteLeg> {
        self.active_leg.as_ref()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::Start(trip) => self.start(trip),
            SessionEvent::Location(fix) => self.on_location(fix),
            SessionEvent::Retry => self.retry(),
            SessionEvent::Cancel => self.cancel(),
            SessionEvent::LegResolved { generation, result } => {
                self.on_leg_result(generation, result)
            }
        }
    }

    /// Begin navigating a trip, routing the first leg.
    pub fn start(&mut self, trip: Trip) -> Vec<Effect> {
        self.generation += 1;
        self.destination_index = 0;
        self.active_leg = None;
        self.step_index = 0;
        self.last_error = None;

        if trip.stops.is_empty() {
            debug!("trip has no stops, completing immediately");
            self.trip = Some(trip);
            self.status = NavStatus::Completed;
            return vec![Effect::Publish(self.snapshot())];
        }

        info!(stops = trip.stops.len(), mode = %trip.mode, "starting navigation");
        self.status = NavStatus::RoutingInProgress;
        let request = LegRequest {
            generation: self.generation,
            from: trip.origin,
            to: trip.stops[0].stop.point,
            mode: trip.mode,
        };
        self.trip = Some(trip);
        vec![Effect::Request(request), Effect::Publish(self.snapshot())]
    }

    /// Feed one point from the geolocation stream.
    pub fn on_location(&mut self, fix: LocationFix) -> Vec<Effect> {
        self.last_fix = Some(fix);
        if self.status != NavStatus::Navigating {
            return vec![Effect::Publish(self.snapshot())];
        }

        let destination = match &self.trip {
            Some(trip) => trip.destination(self.destination_index).map(|dest| {
                (
                    dest.stop.point,
                    dest.stop.name.clone(),
                    trip.stops.len(),
                    trip.mode,
                )
            }),
            None => None,
        };
        let Some((dest_point, dest_name, stop_count, mode)) = destination else {
            return vec![Effect::Publish(self.snapshot())];
        };

        let distance = distance_meters(fix.point, dest_point);
        if distance >= self.config.arrival_threshold {
            self.advance_step(fix);
            return vec![Effect::Publish(self.snapshot())];
        }

        debug!(stop = %dest_name, distance = %distance, "arrived at stop");
        self.status = NavStatus::ArrivedAtStop;
        let mut effects = vec![Effect::Publish(self.snapshot())];

        if self.destination_index + 1 < stop_count {
            self.destination_index += 1;
            self.generation += 1;
            self.step_index = 0;
            self.status = NavStatus::RoutingInProgress;
            let next_point = self
                .trip
                .as_ref()
                .and_then(|t| t.destination(self.destination_index))
                .map(|d| d.stop.point);
            if let Some(to) = next_point {
                // the next leg departs from the stop just reached
                effects.push(Effect::Request(LegRequest {
                    generation: self.generation,
                    from: dest_point,
                    to,
                    mode,
                }));
            }
            effects.push(Effect::Publish(self.snapshot()));
        } else {
            info!("trip completed");
            self.status = NavStatus::Completed;
            effects.push(Effect::Publish(self.snapshot()));
        }
        effects
    }

    /// Apply a gateway response, unless it is from a superseded request.
    pub fn on_leg_result(
        &mut self,
        generation: u64,
        result: Result<RouteLeg, GatewayError>,
    ) -> Vec<Effect> {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "discarding stale gateway result"
            );
            return Vec::new();
        }
        if self.status != NavStatus::RoutingInProgress {
            debug!(status = %self.status, "ignoring gateway result outside routing");
            return Vec::new();
        }

        match result {
            Ok(mut leg) => {
                for step in &mut leg.steps {
                    step.instruction = instructions::localize(&step.instruction);
                }
                debug!(steps = leg.steps.len(), "leg routed");
                self.active_leg = Some(leg);
                self.step_index = 0;
                self.last_error = None;
                self.status = NavStatus::Navigating;
            }
            Err(error) => {
                warn!(%error, "leg routing failed");
                self.last_error = Some(error);
                self.status = NavStatus::RoutingFailed;
            }
        }
        vec![Effect::Publish(self.snapshot())]
    }

    /// Re-issue the failed leg. Only meaningful in `RoutingFailed`.
    pub fn retry(&mut self) -> Vec<Effect> {
        if self.status != NavStatus::RoutingFailed {
            debug!(status = %self.status, "retry ignored");
            return Vec::new();
        }
        let request = match &self.trip {
            Some(trip) => trip.destination(self.destination_index).map(|dest| LegRequest {
                generation: self.generation + 1,
                from: trip.leg_origin(self.destination_index),
                to: dest.stop.point,
                mode: trip.mode,
            }),
            None => None,
        };
        let Some(request) = request else {
            return Vec::new();
        };

        info!(destination = self.destination_index, "retrying failed leg");
        self.generation += 1;
        self.status = NavStatus::RoutingInProgress;
        vec![Effect::Request(request), Effect::Publish(self.snapshot())]
    }

    /// End the session. Any in-flight gateway result becomes stale.
    pub fn cancel(&mut self) -> Vec<Effect> {
        info!("navigation cancelled");
        self.generation += 1;
        self.status = NavStatus::Idle;
        self.trip = None;
        self.active_leg = None;
        self.destination_index = 0;
        self.step_index = 0;
        self.last_error = None;
        vec![Effect::Publish(self.snapshot())]
    }

    /// Move the step cursor forward past any maneuver the fix has reached,
    /// preferring the nearest upcoming one so a missed maneuver cannot pin
    /// the instruction list behind the user's actual position. The cursor
    /// never moves backwards, which keeps adjacent steps from oscillating.
    fn advance_step(&mut self, fix: LocationFix) {
        let new_index = {
            let Some(leg) = &self.active_leg else { return };
            if leg.steps.is_empty() {
                return;
            }
            let mut nearest = self.step_index;
            let mut nearest_distance = distance_meters(fix.point, leg.steps[nearest].maneuver);
            for i in nearest + 1..leg.steps.len() {
                let d = distance_meters(fix.point, leg.steps[i].maneuver);
                if d < nearest_distance {
                    nearest = i;
                    nearest_distance = d;
                }
            }
            if nearest_distance < self.config.step_advance_threshold {
                (nearest + 1).min(leg.steps.len() - 1)
            } else {
                nearest
            }
        };
        if new_index != self.step_index {
            debug!(from = self.step_index, to = new_index, "advanced step");
            self.step_index = new_index;
        }
    }

    /// Current observable state.
    pub fn snapshot(&self) -> NavSnapshot {
        let destination = self
            .trip
            .as_ref()
            .and_then(|t| t.destination(self.destination_index));

        let show_instructions = self.active_leg.is_some()
            && !matches!(self.status, NavStatus::Idle | NavStatus::Completed);
        let (current_instruction, next_instruction) = match (&self.active_leg, show_instructions) {
            (Some(leg), true) => {
                let current = leg
                    .steps
                    .get(self.step_index)
                    .map(|s| s.instruction.clone())
                    .unwrap_or_else(|| instructions::FALLBACK_INSTRUCTION.to_owned());
                let next = leg
                    .steps
                    .get(self.step_index + 1)
                    .map(|s| s.instruction.clone());
                (Some(current), next)
            }
            _ => (None, None),
        };

        let mut distance_to_maneuver = None;
        let mut distance_remaining = None;
        let mut heading_to_maneuver = None;
        let mut eta = None;
        if self.status == NavStatus::Navigating {
            if let (Some(leg), Some(fix)) = (&self.active_leg, &self.last_fix) {
                if let Some(step) = leg.steps.get(self.step_index) {
                    let to_maneuver = distance_meters(fix.point, step.maneuver);
                    let after: Meters<f64> = leg.steps[self.step_index + 1..]
                        .iter()
                        .fold(Meters(0.0), |acc, s| acc + s.distance);
                    let remaining_time: Seconds<f64> = leg.steps[self.step_index..]
                        .iter()
                        .fold(Seconds(0.0), |acc, s| acc + s.duration);
                    distance_to_maneuver = Some(to_maneuver);
                    distance_remaining = Some(to_maneuver + after);
                    heading_to_maneuver = Some(initial_bearing(fix.point, step.maneuver));
                    eta = Some(fix.timestamp + remaining_time.to_chrono());
                }
            }
        }

        NavSnapshot {
            status: self.status,
            destination_index: self.destination_index,
            destination_name: destination.map(|d| d.stop.name.clone()),
            current_instruction,
            next_instruction,
            distance_to_maneuver,
            distance_remaining,
            heading_to_maneuver,
            eta,
            last_known_location: self.last_fix.map(|f| f.point),
            last_error: self.last_error.clone(),
        }
    }
}

/// A running navigation session.
///
/// Cheap handle over the session's event queue and published state. All
/// methods enqueue and return; none of them waits on the directions
/// provider. Dropping the handle tears the session down.
pub struct NavigationSession {
    events: mpsc::Sender<SessionEvent>,
    snapshots: watch::Receiver<NavSnapshot>,
    worker: JoinHandle<()>,
}

impl NavigationSession {
    /// Spawn a session driven by the given directions gateway.
    pub fn spawn(gateway: Arc<dyn DirectionsGateway>, config: SessionConfig) -> Self {
        let (events, mut inbox) = mpsc::channel::<SessionEvent>(config.event_capacity);
        let (publish, snapshots) = watch::channel(NavSnapshot::default());
        let resolver = events.clone();

        let worker = tokio::spawn(async move {
            let mut core = SessionCore::new(config);
            while let Some(event) = inbox.recv().await {
                for effect in core.handle(event) {
                    match effect {
                        Effect::Publish(snapshot) => {
                            let _ = publish.send(snapshot);
                        }
                        Effect::Request(request) => spawn_leg_request(
                            Arc::clone(&gateway),
                            resolver.clone(),
                            request,
                            config.gateway_deadline,
                        ),
                    }
                }
            }
        });

        Self {
            events,
            snapshots,
            worker,
        }
    }

    pub async fn start(&self, trip: Trip) -> Result<(), SessionError> {
        self.send(SessionEvent::Start(trip)).await
    }

    pub async fn update_location(&self, fix: LocationFix) -> Result<(), SessionError> {
        self.send(SessionEvent::Location(fix)).await
    }

    pub async fn retry(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Retry).await
    }

    pub async fn cancel(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Cancel).await
    }

    /// Watch published snapshots. The UI may poll or await changes.
    pub fn subscribe(&self) -> watch::Receiver<NavSnapshot> {
        self.snapshots.clone()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> NavSnapshot {
        self.snapshots.borrow().clone()
    }

    async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.events
            .send(event)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

fn spawn_leg_request(
    gateway: Arc<dyn DirectionsGateway>,
    resolver: mpsc::Sender<SessionEvent>,
    request: LegRequest,
    deadline: Duration,
) {
    tokio::spawn(async move {
        let result = route_with_deadline(
            gateway.as_ref(),
            request.from,
            request.to,
            request.mode,
            deadline,
        )
        .await;
        let event = SessionEvent::LegResolved {
            generation: request.generation,
            result,
        };
        if resolver.send(event).await.is_err() {
            debug!("session gone before leg result could be delivered");
        }
    });
}

/// A source of live location fixes. The engine only reads from it.
pub trait GeolocationSource {
    /// Begin delivering fixes. Fixes arrive in delivery order.
    fn start(&mut self) -> mpsc::Receiver<LocationFix>;

    /// Stop delivering fixes.
    fn stop(&mut self);
}

/// Drain a location stream into a session until either side closes.
pub async fn forward_locations(
    session: &NavigationSession,
    mut fixes: mpsc::Receiver<LocationFix>,
) -> Result<(), SessionError> {
    while let Some(fix) = fixes.recv().await {
        session.update_location(fix).await?;
    }
    Ok(())
}
