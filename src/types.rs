//! Core value types shared across the crate.

use approx::{AbsDiffEq, RelativeEq, abs_diff_eq, relative_eq};
use chrono::{DateTime, Utc};
use strum::EnumString;
use thiserror::Error;

use crate::measure::{Degrees, KilometersPerHour, Meters, MetersPerSecond, Minutes};

#[derive(Error, Debug)]
pub enum TypeError {
    #[error("geographic point invariant: invalid value {1:?} for {0:?}")]
    GeoPointInvariant(GeoPointDimension, Degrees<f64>),
}

type Result<T> = std::result::Result<T, TypeError>;

#[derive(Debug)]
pub enum GeoPointDimension {
    Latitude,
    Longitude,
}

/// A point on the surface of the WGS84 ellipsoid.
///
/// Enforces valid latitude and longitude values as type invariants.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GeoPoint {
    lat: Degrees<f64>,
    lon: Degrees<f64>,
}

impl GeoPoint {
    pub fn new(lat: Degrees<f64>, lon: Degrees<f64>) -> Result<GeoPoint> {
        if lat.0 < -90.0 || lat.0 > 90.0 {
            return Err(TypeError::GeoPointInvariant(
                GeoPointDimension::Latitude,
                lat,
            ));
        }
        if lon.0 < -180.0 || lon.0 > 180.0 {
            return Err(TypeError::GeoPointInvariant(
                GeoPointDimension::Longitude,
                lon,
            ));
        }
        Ok(Self { lat, lon })
    }

    /// Get point latitude
    pub fn lat(&self) -> Degrees<f64> {
        self.lat
    }

    /// Get point longitude
    pub fn lon(&self) -> Degrees<f64> {
        self.lon
    }
}

impl Default for GeoPoint {
    fn default() -> GeoPoint {
        GeoPoint {
            lat: Degrees(0.0),
            lon: Degrees(0.0),
        }
    }
}

impl AbsDiffEq for GeoPoint {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        abs_diff_eq!(self.lat.0, other.lat.0, epsilon = epsilon)
            && abs_diff_eq!(self.lon.0, other.lon.0, epsilon = epsilon)
    }
}

impl RelativeEq for GeoPoint {
    fn default_max_relative() -> Self::Epsilon {
        0.000_000_000_000_001
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        relative_eq!(
            self.lat().0,
            other.lat().0,
            epsilon = epsilon,
            max_relative = max_relative
        ) && relative_eq!(
            self.lon().0,
            other.lon().0,
            epsilon = epsilon,
            max_relative = max_relative
        )
    }
}

/// Instantiate a `GeoPoint` with a tuple-like syntax.
#[macro_export]
macro_rules! geo_point {
    ( $lat:expr, $lon:expr ) => {
        $crate::types::GeoPoint::new(
            $crate::measure::Degrees($lat),
            $crate::measure::Degrees($lon),
        )?
    };
}

/// Instantiate a vec of `GeoPoint` with tuple-like syntax.
#[macro_export]
macro_rules! geo_points {
    ( $( ( $lat:expr, $lon:expr $(,)? ) ),* $(,)? ) => {
        vec![ $( $crate::geo_point!($lat, $lon) ),* ]
    };
}

/// Category tag attached to a stop, mostly for map pin styling.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum StopCategory {
    Landmark,
    Museum,
    Park,
    Restaurant,
    Cafe,
    Viewpoint,
    Shopping,
    Other,
}

/// A place the user wants to visit.
///
/// Immutable once created; a trip's stop list is fixed after generation.
#[derive(Clone, PartialEq, Debug)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub address: String,
    pub point: GeoPoint,
    pub category: StopCategory,
    /// How long the user plans to stay, if they said.
    pub visit_duration: Option<Minutes<f64>>,
}

/// How the user is getting around.
///
/// The speed and directions-profile mappings live here and nowhere else, so
/// UI code cannot grow its own divergent copies.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransportMode {
    Walking,
    Cycling,
    Driving,
    Transit,
}

impl TransportMode {
    /// Assumed average speed, used for pre-routing time estimates.
    pub fn cruise_speed(self) -> MetersPerSecond<f64> {
        let kmh = match self {
            TransportMode::Walking => 5.0,
            TransportMode::Cycling => 15.0,
            TransportMode::Driving => 40.0,
            TransportMode::Transit => 20.0,
        };
        MetersPerSecond::from(KilometersPerHour(kmh))
    }

    /// The routing profile name understood by directions providers.
    pub fn directions_profile(self) -> &'static str {
        match self {
            TransportMode::Walking => "walking",
            TransportMode::Cycling => "cycling",
            TransportMode::Driving => "driving",
            TransportMode::Transit => "transit",
        }
    }
}

/// One sample from a geolocation source.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LocationFix {
    pub point: GeoPoint,
    pub horizontal_accuracy: Meters<f64>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use anyhow::Result;
    use approx::assert_relative_eq;

    use super::{GeoPoint, StopCategory, TransportMode};
    use crate::measure::{Degrees, MetersPerSecond};

    #[test]
    fn geo_point_valid() -> Result<()> {
        let p = GeoPoint::new(Degrees(45.0), Degrees(-122.0))?;
        assert_eq!(p.lat(), Degrees(45.0));
        assert_eq!(p.lon(), Degrees(-122.0));
        Ok(())
    }

    #[test]
    fn geo_point_invalid_latitude() {
        assert!(GeoPoint::new(Degrees(90.1), Degrees(0.0)).is_err());
        assert!(GeoPoint::new(Degrees(-91.0), Degrees(0.0)).is_err());
    }

    #[test]
    fn geo_point_invalid_longitude() {
        assert!(GeoPoint::new(Degrees(0.0), Degrees(180.5)).is_err());
        assert!(GeoPoint::new(Degrees(0.0), Degrees(-181.0)).is_err());
    }

    #[test]
    fn geo_point_macro() -> Result<()> {
        let p = geo_point!(1.0, 2.0);
        assert_eq!(p, GeoPoint::new(Degrees(1.0), Degrees(2.0))?);
        Ok(())
    }

    #[test]
    fn geo_points_macro() -> Result<()> {
        let points = geo_points![(1.0, 2.0), (3.0, 4.0)];
        assert_eq!(points.len(), 2);
        assert_eq!(points[1], GeoPoint::new(Degrees(3.0), Degrees(4.0))?);
        Ok(())
    }

    #[test]
    fn cruise_speeds() {
        assert_relative_eq!(
            TransportMode::Walking.cruise_speed(),
            MetersPerSecond(5.0 / 3.6),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            TransportMode::Driving.cruise_speed(),
            MetersPerSecond(40.0 / 3.6),
            max_relative = 1e-12
        );
    }

    #[test]
    fn directions_profiles() {
        assert_eq!(TransportMode::Cycling.directions_profile(), "cycling");
        assert_eq!(TransportMode::Transit.directions_profile(), "transit");
    }

    #[test]
    fn mode_round_trips_through_strings() -> Result<()> {
        assert_eq!(TransportMode::Walking.to_string(), "walking");
        assert_eq!(TransportMode::from_str("driving")?, TransportMode::Driving);
        assert_eq!(StopCategory::from_str("museum")?, StopCategory::Museum);
        Ok(())
    }
}
