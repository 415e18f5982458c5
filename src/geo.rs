//! Pure geometry over WGS84 coordinates
//!
//! Great-circle math on a spherical earth model. At city scale the error
//! against a full geodesic solution is far below GPS accuracy, which is all
//! the navigation engine needs.

use thiserror::Error;

use crate::measure::{Degrees, Meters};
use crate::types::{GeoPoint, TypeError};

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("no points given")]
    EmptyInput,
    #[error("core type error")]
    Type(#[from] TypeError),
}

type Result<T> = std::result::Result<T, GeoError>;

/// Mean earth radius.
pub const EARTH_RADIUS: Meters<f64> = Meters(6_371_000.0);

/// Smallest span returned per axis, so single-point regions stay visible.
pub const MIN_SPAN: Degrees<f64> = Degrees(0.01);

/// Great-circle distance between two points (haversine formula).
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> Meters<f64> {
    let lat1 = a.lat().0.to_radians();
    let lat2 = b.lat().0.to_radians();
    let delta_lat = (b.lat().0 - a.lat().0).to_radians();
    let delta_lon = (b.lon().0 - a.lon().0).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS * c
}

/// Arithmetic mean of the given points' latitudes and longitudes.
///
/// Fine at city scale; not meaningful for point sets spanning the
/// antimeridian.
pub fn centroid(points: &[GeoPoint]) -> Result<GeoPoint> {
    if points.is_empty() {
        return Err(GeoError::EmptyInput);
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.lat().0).sum::<f64>() / n;
    let lon = points.iter().map(|p| p.lon().0).sum::<f64>() / n;
    Ok(GeoPoint::new(Degrees(lat), Degrees(lon))?)
}

/// Latitude/longitude deltas covering a set of points.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GeoSpan {
    pub lat_delta: Degrees<f64>,
    pub lon_delta: Degrees<f64>,
}

/// The smallest span covering all points, floored at [`MIN_SPAN`] per axis
/// so a single-point set still yields a usable map region.
pub fn bounding_span(points: &[GeoPoint]) -> Result<GeoSpan> {
    if points.is_empty() {
        return Err(GeoError::EmptyInput);
    }
    let mut min_lat = f64::INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    let mut min_lon = f64::INFINITY;
    let mut max_lon = f64::NEG_INFINITY;
    for p in points {
        min_lat = min_lat.min(p.lat().0);
        max_lat = max_lat.max(p.lat().0);
        min_lon = min_lon.min(p.lon().0);
        max_lon = max_lon.max(p.lon().0);
    }
    Ok(GeoSpan {
        lat_delta: Degrees((max_lat - min_lat).max(MIN_SPAN.0)),
        lon_delta: Degrees((max_lon - min_lon).max(MIN_SPAN.0)),
    })
}

/// Initial bearing from `a` to `b`, in degrees within [0, 360).
pub fn initial_bearing(a: GeoPoint, b: GeoPoint) -> Degrees<f64> {
    let lat1 = a.lat().0.to_radians();
    let lat2 = b.lat().0.to_radians();
    let delta_lon = (b.lon().0 - a.lon().0).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    let bearing = y.atan2(x).to_degrees();
    Degrees((bearing + 360.0) % 360.0)
}
