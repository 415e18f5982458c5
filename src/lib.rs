//! Route optimization and turn-by-turn navigation for multi-stop trips.
//!
//! Takes a start point and an unordered set of stops, produces a visiting
//! order with time and distance estimates ([`optimize`]), then drives a live
//! navigation session over a geolocation stream ([`NavigationSession`]):
//! arrival detection, per-leg requests against a directions provider, and
//! user-facing instruction state. [`calculate_full_route`] resolves a whole
//! trip's legs up front for a non-interactive preview.
//!
//! The crate is a library core with no UI, wire, or persistence surface of
//! its own. The directions provider and the location stream are injected
//! through the [`DirectionsGateway`] and [`GeolocationSource`] interfaces;
//! deterministic fakes for both live in [`testonly`].

pub mod gateway;
pub mod geo;
pub mod instructions;
pub mod measure;
pub mod optimizer;
pub mod preview;
pub mod session;
pub mod testonly;
pub mod types;

use chrono::Utc;

pub use crate::gateway::{
    DirectionsGateway, GatewayError, RouteLeg, RouteStep, route_with_deadline,
};
pub use crate::geo::{
    GeoError, GeoSpan, bounding_span, centroid, distance_meters, initial_bearing,
};
pub use crate::optimizer::{DEFAULT_VISIT_DURATION, OrderedStop, Trip, optimize};
pub use crate::preview::{FullRoute, calculate_full_route};
pub use crate::session::{
    Effect, GeolocationSource, LegRequest, NavSnapshot, NavStatus, NavigationSession,
    SessionConfig, SessionCore, SessionError, SessionEvent, forward_locations,
};
pub use crate::types::{
    GeoPoint, LocationFix, Stop, StopCategory, TransportMode, TypeError,
};

/// Plan a trip departing now.
///
/// Thin wrapper over [`optimize`] for callers that don't need to control
/// the departure time.
pub fn plan_trip(
    origin: GeoPoint,
    origin_address: impl Into<String>,
    stops: &[Stop],
    mode: TransportMode,
) -> Trip {
    optimize(origin, origin_address, stops, mode, Utc::now())
}
