//! The directions-provider boundary
//!
//! The engine never talks to a mapping service directly; it depends only on
//! the [`DirectionsGateway`] shape. The production implementation adapts
//! whatever provider the app ships with, tests use the scripted fake from
//! [`crate::testonly`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::measure::{Meters, Seconds};
use crate::types::{GeoPoint, TransportMode};

#[derive(Error, Clone, PartialEq, Debug)]
pub enum GatewayError {
    #[error("directions request timed out after {0:?}")]
    Timeout(Duration),
    #[error("directions request failed: {0}")]
    Request(String),
    #[error("no route found between the requested points")]
    NoRoute,
}

type Result<T> = std::result::Result<T, GatewayError>;

/// One instruction-bearing segment within a leg.
#[derive(Clone, PartialEq, Debug)]
pub struct RouteStep {
    /// Raw instruction text in whatever language the provider uses.
    pub instruction: String,

    /// Length of this step.
    pub distance: Meters<f64>,

    /// Expected travel time over this step.
    pub duration: Seconds<f64>,

    /// Street name, if the provider reports one.
    pub street: Option<String>,

    /// Where the instruction applies. Arrival and step-advance detection
    /// measure against this point.
    pub maneuver: GeoPoint,
}

/// The routed path between two consecutive stops.
///
/// Produced by one gateway call; immutable.
#[derive(Clone, PartialEq, Debug)]
pub struct RouteLeg {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub polyline: Vec<GeoPoint>,
    pub steps: Vec<RouteStep>,
    pub total_distance: Meters<f64>,
    pub total_duration: Seconds<f64>,
}

impl RouteLeg {
    /// Build a leg with totals derived from its steps, so the aggregate
    /// figures cannot drift from the per-step ones.
    pub fn from_steps(
        from: GeoPoint,
        to: GeoPoint,
        polyline: Vec<GeoPoint>,
        steps: Vec<RouteStep>,
    ) -> Self {
        let mut total_distance = Meters(0.0);
        let mut total_duration = Seconds(0.0);
        for step in &steps {
            total_distance += step.distance;
            total_duration += step.duration;
        }
        Self {
            from,
            to,
            polyline,
            steps,
            total_distance,
            total_duration,
        }
    }
}

/// An external directions provider.
///
/// Implementations are expected to be cheap to share behind an `Arc` and
/// safe to call concurrently.
#[async_trait]
pub trait DirectionsGateway: Send + Sync {
    /// Request a routed leg between two coordinates.
    async fn route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        mode: TransportMode,
    ) -> Result<RouteLeg>;
}

/// Issue a gateway request with a deadline.
///
/// A call that has not resolved within `deadline` is reported as
/// [`GatewayError::Timeout`]; the transport-level request is left to run to
/// completion on its own, its eventual result is simply never observed.
pub async fn route_with_deadline(
    gateway: &dyn DirectionsGateway,
    from: GeoPoint,
    to: GeoPoint,
    mode: TransportMode,
    deadline: Duration,
) -> Result<RouteLeg> {
    match tokio::time::timeout(deadline, gateway.route(from, to, mode)).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;

    use super::{GatewayError, RouteLeg, RouteStep, route_with_deadline};
    use crate::geo_point;
    use crate::measure::{Meters, Seconds};
    use crate::testonly::FakeDirectionsGateway;
    use crate::types::TransportMode;

    #[test]
    fn leg_totals_follow_steps() -> Result<()> {
        let from = geo_point!(0.0, 0.0);
        let to = geo_point!(0.0, 0.02);
        let steps = vec![
            RouteStep {
                instruction: "turn left".to_owned(),
                distance: Meters(700.0),
                duration: Seconds(60.0),
                street: None,
                maneuver: geo_point!(0.0, 0.01),
            },
            RouteStep {
                instruction: "arrive at destination".to_owned(),
                distance: Meters(500.0),
                duration: Seconds(45.0),
                street: None,
                maneuver: to,
            },
        ];
        let leg = RouteLeg::from_steps(from, to, vec![from, to], steps);
        assert_eq!(leg.total_distance, Meters(1200.0));
        assert_eq!(leg.total_duration, Seconds(105.0));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_maps_to_timeout_error() -> Result<()> {
        let from = geo_point!(0.0, 0.0);
        let to = geo_point!(0.0, 1.0);
        let gateway = FakeDirectionsGateway::new();
        gateway.never_resolve_to(to);

        let deadline = Duration::from_secs(15);
        let result =
            route_with_deadline(&gateway, from, to, TransportMode::Walking, deadline).await;
        assert_eq!(result, Err(GatewayError::Timeout(deadline)));
        Ok(())
    }
}
