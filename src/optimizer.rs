//! Stop ordering and timing estimates
//!
//! Orders an unordered set of stops from a fixed origin with a greedy
//! nearest-neighbor pass and attaches per-stop distance and timing
//! estimates. The heuristic is intentionally O(N²) greedy rather than an
//! optimal tour: trips have a handful of stops and the result must come
//! back at interactive latency. Travel times here are straight-line
//! estimates from the transport mode's assumed speed; once the directions
//! gateway resolves real legs, their routed durations supersede these.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::geo::distance_meters;
use crate::measure::{FromUnit, Meters, Minutes, Seconds};
use crate::types::{GeoPoint, Stop, TransportMode};

/// Assumed time at a stop when the user didn't specify one.
pub const DEFAULT_VISIT_DURATION: Minutes<f64> = Minutes(30.0);

/// A stop with its position in the visiting order and timing estimates.
#[derive(Clone, PartialEq, Debug)]
pub struct OrderedStop {
    pub stop: Stop,

    /// 1-based position in the visiting order.
    pub sequence_index: usize,

    /// Straight-line distance from the previous stop (or the origin).
    pub distance_from_previous: Meters<f64>,

    /// Estimated travel time from the previous stop (or the origin).
    pub travel_time_from_previous: Seconds<f64>,

    pub estimated_arrival: DateTime<Utc>,

    /// Arrival plus the stop's visit duration.
    pub estimated_departure: DateTime<Utc>,
}

/// An optimized trip: origin, ordered stops, and aggregate figures.
///
/// Created once by [`optimize`]; read-only thereafter. Changing the origin,
/// the stop set, or the transport mode means optimizing again.
#[derive(Clone, PartialEq, Debug)]
pub struct Trip {
    pub origin: GeoPoint,
    pub origin_address: String,
    pub stops: Vec<OrderedStop>,
    pub mode: TransportMode,
    pub departure: DateTime<Utc>,
    pub total_distance: Meters<f64>,
    pub estimated_duration: Seconds<f64>,
}

impl Trip {
    /// The consecutive (from, to) coordinate pairs of the trip, one per
    /// leg: origin → stop 1, stop 1 → stop 2, and so on.
    pub fn legs(&self) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
        let froms = std::iter::once(self.origin).chain(self.stops.iter().map(|s| s.stop.point));
        let tos = self.stops.iter().map(|s| s.stop.point);
        froms.zip(tos)
    }

    /// The stop at a 0-based destination index.
    pub fn destination(&self, index: usize) -> Option<&OrderedStop> {
        self.stops.get(index)
    }

    /// Coordinate a leg to the given destination index departs from.
    pub fn leg_origin(&self, index: usize) -> GeoPoint {
        if index == 0 {
            self.origin
        } else {
            self.stops[index - 1].stop.point
        }
    }
}

/// Order stops greedily from the origin and estimate per-stop timing.
///
/// Ties on distance are broken by original input order, so identical input
/// always produces identical output. An empty stop list yields an empty
/// trip with zero totals, not an error.
#[instrument(level = "trace", skip_all)]
pub fn optimize(
    origin: GeoPoint,
    origin_address: impl Into<String>,
    stops: &[Stop],
    mode: TransportMode,
    departure: DateTime<Utc>,
) -> Trip {
    let speed = mode.cruise_speed();
    let mut remaining: Vec<Stop> = stops.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());

    let mut current = origin;
    let mut clock = departure;
    let mut total_distance = Meters(0.0);
    let mut total_travel = Seconds(0.0);
    let mut total_visits = Seconds(0.0);

    while !remaining.is_empty() {
        let mut nearest = 0;
        let mut nearest_distance = distance_meters(current, remaining[0].point);
        for (candidate, stop) in remaining.iter().enumerate().skip(1) {
            let d = distance_meters(current, stop.point);
            if d < nearest_distance {
                nearest = candidate;
                nearest_distance = d;
            }
        }

        let stop = remaining.remove(nearest);
        let travel_time = nearest_distance / speed;
        let visit: Seconds<f64> =
            Seconds::from_unit(stop.visit_duration.unwrap_or(DEFAULT_VISIT_DURATION));

        let estimated_arrival = clock + travel_time.to_chrono();
        let estimated_departure = estimated_arrival + visit.to_chrono();

        current = stop.point;
        clock = estimated_departure;
        total_distance += nearest_distance;
        total_travel += travel_time;
        total_visits += visit;

        ordered.push(OrderedStop {
            stop,
            sequence_index: ordered.len() + 1,
            distance_from_previous: nearest_distance,
            travel_time_from_previous: travel_time,
            estimated_arrival,
            estimated_departure,
        });
    }

    debug!(
        stops = ordered.len(),
        total_distance = %total_distance,
        "optimized trip"
    );

    Trip {
        origin,
        origin_address: origin_address.into(),
        stops: ordered,
        mode,
        departure,
        total_distance,
        estimated_duration: total_travel + total_visits,
    }
}
