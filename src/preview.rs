//! Whole-trip route preview
//!
//! Resolves every leg of a trip up front, one gateway call per consecutive
//! stop pair, fanned out concurrently. Results are keyed by leg index so
//! completion order never affects the output order, and a failed leg does
//! not discard the ones that resolved: the caller gets everything that is
//! known plus the indices of the gaps.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::gateway::{DirectionsGateway, GatewayError, RouteLeg, route_with_deadline};
use crate::measure::{Meters, Seconds};
use crate::optimizer::Trip;

/// The outcome of resolving a full trip, leg by leg.
#[derive(Clone, Debug)]
pub struct FullRoute {
    /// One entry per leg, in trip order.
    pub legs: Vec<Result<RouteLeg, GatewayError>>,

    /// Summed distance over the resolved legs only.
    pub total_distance: Meters<f64>,

    /// Summed duration over the resolved legs only.
    pub total_duration: Seconds<f64>,

    /// True when at least one leg failed, so the totals undercount.
    pub is_partial: bool,
}

impl FullRoute {
    /// Indices of the legs that failed to resolve.
    pub fn failed_legs(&self) -> Vec<usize> {
        self.legs
            .iter()
            .enumerate()
            .filter_map(|(i, leg)| leg.as_ref().err().map(|_| i))
            .collect()
    }

    /// The resolved legs with their indices, in trip order.
    pub fn resolved_legs(&self) -> impl Iterator<Item = (usize, &RouteLeg)> {
        self.legs
            .iter()
            .enumerate()
            .filter_map(|(i, leg)| leg.as_ref().ok().map(|l| (i, l)))
    }
}

/// Resolve all of a trip's legs concurrently.
///
/// Each fan-out task writes only its own index slot, so no ordering or
/// locking discipline is needed beyond the join itself.
pub async fn calculate_full_route(
    gateway: Arc<dyn DirectionsGateway>,
    trip: &Trip,
    deadline: Duration,
) -> FullRoute {
    let endpoints: Vec<_> = trip.legs().collect();
    let mode = trip.mode;

    let mut tasks = JoinSet::new();
    for (index, (from, to)) in endpoints.iter().copied().enumerate() {
        let gateway = Arc::clone(&gateway);
        tasks.spawn(async move {
            let result = route_with_deadline(gateway.as_ref(), from, to, mode, deadline).await;
            (index, result)
        });
    }

    let mut slots: Vec<Option<Result<RouteLeg, GatewayError>>> = vec![None; endpoints.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(join_error) => warn!(%join_error, "leg routing task failed"),
        }
    }

    let legs: Vec<Result<RouteLeg, GatewayError>> = slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Err(GatewayError::Request("routing task failed".to_owned())))
        })
        .collect();

    let mut total_distance = Meters(0.0);
    let mut total_duration = Seconds(0.0);
    for leg in legs.iter().flatten() {
        total_distance += leg.total_distance;
        total_duration += leg.total_duration;
    }
    let is_partial = legs.iter().any(|leg| leg.is_err());
    debug!(
        legs = legs.len(),
        failed = legs.iter().filter(|l| l.is_err()).count(),
        "full route calculated"
    );

    FullRoute {
        legs,
        total_distance,
        total_duration,
        is_partial,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Result;
    use chrono::{TimeZone, Utc};

    use super::calculate_full_route;
    use crate::gateway::GatewayError;
    use crate::geo_point;
    use crate::measure::{Meters, Seconds};
    use crate::optimizer::{Trip, optimize};
    use crate::testonly::FakeDirectionsGateway;
    use crate::types::{GeoPoint, Stop, StopCategory, TransportMode};

    fn stop(id: &str, point: GeoPoint) -> Stop {
        Stop {
            id: id.to_owned(),
            name: id.to_owned(),
            address: format!("{id} street"),
            point,
            category: StopCategory::Landmark,
            visit_duration: None,
        }
    }

    fn three_stop_trip() -> Result<Trip> {
        let origin = geo_point!(0.0, 0.0);
        let stops = vec![
            stop("a", geo_point!(0.0, 0.01)),
            stop("b", geo_point!(0.0, 0.02)),
            stop("c", geo_point!(0.0, 0.03)),
        ];
        Ok(optimize(
            origin,
            "origin",
            &stops,
            TransportMode::Cycling,
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn resolves_legs_in_trip_order() -> Result<()> {
        let trip = three_stop_trip()?;
        let gateway = Arc::new(FakeDirectionsGateway::new());

        let route =
            calculate_full_route(gateway, &trip, Duration::from_secs(15)).await;
        assert_eq!(route.legs.len(), 3);
        assert!(!route.is_partial);
        assert!(route.failed_legs().is_empty());

        let expected: Vec<_> = trip.legs().collect();
        for (index, leg) in route.resolved_legs() {
            assert_eq!(leg.from, expected[index].0);
            assert_eq!(leg.to, expected[index].1);
        }
        Ok(())
    }

    #[tokio::test]
    async fn failed_leg_yields_partial_totals() -> Result<()> {
        let trip = three_stop_trip()?;
        let failing_destination = trip.stops[1].stop.point;
        let gateway = Arc::new(FakeDirectionsGateway::new());
        gateway.fail_leg_to(
            failing_destination,
            GatewayError::Request("segment outage".to_owned()),
        );

        let route =
            calculate_full_route(gateway, &trip, Duration::from_secs(15)).await;
        assert!(route.is_partial);
        assert_eq!(route.failed_legs(), vec![1]);
        assert_eq!(route.resolved_legs().count(), 2);

        let expected_distance = route
            .resolved_legs()
            .fold(Meters(0.0), |acc, (_, leg)| acc + leg.total_distance);
        let expected_duration = route
            .resolved_legs()
            .fold(Seconds(0.0), |acc, (_, leg)| acc + leg.total_duration);
        assert_eq!(route.total_distance, expected_distance);
        assert_eq!(route.total_duration, expected_duration);
        assert!(route.total_distance > Meters(0.0));
        Ok(())
    }

    #[tokio::test]
    async fn empty_trip_is_an_empty_route() -> Result<()> {
        let origin = geo_point!(0.0, 0.0);
        let trip = optimize(
            origin,
            "origin",
            &[],
            TransportMode::Walking,
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        );
        let gateway = Arc::new(FakeDirectionsGateway::new());

        let route =
            calculate_full_route(gateway, &trip, Duration::from_secs(15)).await;
        assert!(route.legs.is_empty());
        assert!(!route.is_partial);
        assert_eq!(route.total_distance, Meters(0.0));
        assert_eq!(route.total_duration, Seconds(0.0));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn slow_legs_do_not_reorder_results() -> Result<()> {
        let trip = three_stop_trip()?;
        let gateway = Arc::new(FakeDirectionsGateway::new());
        // Delay only the first leg; later legs then complete first.
        gateway.delay_leg_to(trip.stops[0].stop.point, Duration::from_secs(5));

        let route =
            calculate_full_route(gateway, &trip, Duration::from_secs(15)).await;
        assert!(!route.is_partial);
        let expected: Vec<_> = trip.legs().collect();
        for (index, leg) in route.resolved_legs() {
            assert_eq!(leg.to, expected[index].1);
        }
        Ok(())
    }
}
