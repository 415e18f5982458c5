//! Exports intended for testing use only.
//!
//! Deterministic stand-ins for the external collaborators: a scripted
//! directions gateway and a replayed location stream. They exist so the
//! engine's tests (and downstream consumers' tests) never touch a real
//! provider, but they are not intended for production use.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::gateway::{DirectionsGateway, GatewayError, RouteLeg, RouteStep};
use crate::geo::{centroid, distance_meters};
use crate::session::GeolocationSource;
use crate::types::{GeoPoint, LocationFix, TransportMode};

/// Coordinates rounded to micro-degrees, so a scripted point matches the
/// same point arriving through a leg request.
type PointKey = (i64, i64);

fn key(point: GeoPoint) -> PointKey {
    (
        (point.lat().0 * 1e6).round() as i64,
        (point.lon().0 * 1e6).round() as i64,
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
enum Script {
    Fail(GatewayError),
    NeverResolve,
    Delay(Duration),
}

/// A directions gateway with scriptable per-destination behavior.
///
/// Unscripted legs resolve immediately to a synthesized two-step route.
/// Destinations can be made to fail, hang (for deadline tests), or resolve
/// after a delay (for ordering tests). Every call is recorded.
pub struct FakeDirectionsGateway {
    scripts: Mutex<HashMap<PointKey, Script>>,
    calls: Mutex<Vec<(GeoPoint, GeoPoint, TransportMode)>>,
}

#[allow(clippy::new_without_default)]
impl FakeDirectionsGateway {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make legs toward `to` fail with the given error.
    pub fn fail_leg_to(&self, to: GeoPoint, error: GatewayError) {
        lock(&self.scripts).insert(key(to), Script::Fail(error));
    }

    /// Make legs toward `to` hang forever.
    pub fn never_resolve_to(&self, to: GeoPoint) {
        lock(&self.scripts).insert(key(to), Script::NeverResolve);
    }

    /// Make legs toward `to` resolve only after `delay`.
    pub fn delay_leg_to(&self, to: GeoPoint, delay: Duration) {
        lock(&self.scripts).insert(key(to), Script::Delay(delay));
    }

    /// Clear any script for `to`; legs toward it resolve immediately.
    pub fn resolve_normally(&self, to: GeoPoint) {
        lock(&self.scripts).remove(&key(to));
    }

    /// Every (from, to, mode) this gateway has been asked for, in call
    /// order.
    pub fn calls(&self) -> Vec<(GeoPoint, GeoPoint, TransportMode)> {
        lock(&self.calls).clone()
    }

    /// A plausible straight-line leg with a midpoint maneuver.
    pub fn synthesize_leg(from: GeoPoint, to: GeoPoint, mode: TransportMode) -> RouteLeg {
        let mid = centroid(&[from, to]).unwrap_or(from);
        let total = distance_meters(from, to);
        let half = total / 2.0;
        let speed = mode.cruise_speed();
        let steps = vec![
            RouteStep {
                instruction: "head toward the waypoint".to_owned(),
                distance: half,
                duration: half / speed,
                street: None,
                maneuver: mid,
            },
            RouteStep {
                instruction: "arrive at destination".to_owned(),
                distance: total - half,
                duration: (total - half) / speed,
                street: None,
                maneuver: to,
            },
        ];
        RouteLeg::from_steps(from, to, vec![from, mid, to], steps)
    }
}

#[async_trait]
impl DirectionsGateway for FakeDirectionsGateway {
    async fn route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        mode: TransportMode,
    ) -> Result<RouteLeg, GatewayError> {
        lock(&self.calls).push((from, to, mode));
        let script = lock(&self.scripts).get(&key(to)).cloned();
        match script {
            Some(Script::Fail(error)) => Err(error),
            Some(Script::NeverResolve) => std::future::pending().await,
            Some(Script::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Self::synthesize_leg(from, to, mode))
            }
            None => Ok(Self::synthesize_leg(from, to, mode)),
        }
    }
}

/// Replays a scripted fix sequence on a fixed interval, cycling until
/// stopped, the way a real provider keeps reporting the same position
/// while the user stands still.
pub struct SimulatedLocationSource {
    script: Vec<LocationFix>,
    interval: Duration,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedLocationSource {
    pub fn new(script: Vec<LocationFix>, interval: Duration) -> Self {
        Self {
            script,
            interval,
            worker: None,
        }
    }
}

impl GeolocationSource for SimulatedLocationSource {
    fn start(&mut self) -> mpsc::Receiver<LocationFix> {
        let (tx, rx) = mpsc::channel(16);
        let script = self.script.clone();
        let interval = self.interval;
        self.worker = Some(tokio::spawn(async move {
            if script.is_empty() {
                return;
            }
            for fix in script.iter().cycle() {
                if tx.send(*fix).await.is_err() {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        }));
        rx
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
