//! Great-circle math and viewport geometry.
//!
//! Everything here is a pure function of its inputs. Coordinates are in
//! degrees; NaN or infinite inputs propagate into the outputs unchecked.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the point is a usable WGS84 coordinate.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Haversine distance between two lat/lng points in meters.
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

/// Haversine distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    distance_meters(lat1, lng1, lat2, lng2) / 1000.0
}

/// Circle approximating the visible map region.
///
/// `radius_km` is a coarse zoom-level proxy, not an exact bounding circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportGeometry {
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_km: f64,
}

impl ViewportGeometry {
    /// Build a viewport from an already-known circle. Negative radii clamp to zero.
    pub fn new(center_lat: f64, center_lng: f64, radius_km: f64) -> Self {
        Self {
            center_lat,
            center_lng,
            radius_km: radius_km.max(0.0),
        }
    }

    /// Derive a viewport from two diagonal corners of the visible rectangle.
    ///
    /// Center is the arithmetic midpoint of the corners, radius is half the
    /// great-circle diagonal.
    pub fn from_corners(far_left: GeoPoint, near_right: GeoPoint) -> Self {
        let center_lat = (far_left.lat + near_right.lat) / 2.0;
        let center_lng = (far_left.lng + near_right.lng) / 2.0;
        let diagonal_m =
            distance_meters(far_left.lat, far_left.lng, near_right.lat, near_right.lng);

        Self {
            center_lat,
            center_lng,
            radius_km: diagonal_m / 2.0 / 1000.0,
        }
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_lat, self.center_lng)
    }

    /// True when `point` lies within `radius_km` of the center (boundary inclusive).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        haversine_km(self.center_lat, self.center_lng, point.lat, point.lng) <= self.radius_km
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minneapolis_to_st_paul_is_about_fifteen_km() {
        let d = distance_meters(44.9778, -93.2650, 44.9537, -93.0900);
        assert!(d > 13_000.0 && d < 15_500.0, "Expected ~14km, got {d}m");
    }

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(distance_meters(44.96, -93.27, 44.96, -93.27), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let km = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((km - 111.19).abs() < 0.1, "got {km}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = distance_meters(40.7128, -74.0060, 32.7767, -96.7970);
        let b = distance_meters(32.7767, -96.7970, 40.7128, -74.0060);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn nan_input_propagates() {
        assert!(distance_meters(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn viewport_center_is_corner_midpoint() {
        let vp = ViewportGeometry::from_corners(
            GeoPoint::new(45.00, -93.30),
            GeoPoint::new(44.90, -93.20),
        );
        assert!((vp.center_lat - 44.95).abs() < 1e-9);
        assert!((vp.center_lng - -93.25).abs() < 1e-9);
    }

    #[test]
    fn viewport_radius_is_half_the_diagonal() {
        let far_left = GeoPoint::new(45.00, -93.30);
        let near_right = GeoPoint::new(44.90, -93.20);
        let vp = ViewportGeometry::from_corners(far_left, near_right);
        let diagonal_km = far_left.distance_km(&near_right);
        assert!((vp.radius_km * 2.0 - diagonal_km).abs() < 1e-9);
        assert!(vp.radius_km > 0.0);
    }

    #[test]
    fn viewport_center_lies_inside_rectangle() {
        let far_left = GeoPoint::new(10.5, 20.0);
        let near_right = GeoPoint::new(10.0, 21.0);
        let vp = ViewportGeometry::from_corners(far_left, near_right);
        assert!(vp.center_lat <= 10.5 && vp.center_lat >= 10.0);
        assert!(vp.center_lng >= 20.0 && vp.center_lng <= 21.0);
    }

    #[test]
    fn degenerate_viewport_has_zero_radius() {
        let p = GeoPoint::new(44.95, -93.25);
        let vp = ViewportGeometry::from_corners(p, p);
        assert_eq!(vp.radius_km, 0.0);
        assert!(vp.contains(&p));
    }

    #[test]
    fn negative_radius_is_clamped() {
        assert_eq!(ViewportGeometry::new(0.0, 0.0, -3.0).radius_km, 0.0);
    }

    #[test]
    fn contains_respects_radius() {
        let vp = ViewportGeometry::new(44.9537, -93.0900, 5.0);
        assert!(vp.contains(&GeoPoint::new(44.96, -93.10)));
        // Minneapolis downtown is ~14km from St. Paul
        assert!(!vp.contains(&GeoPoint::new(44.9778, -93.2650)));
    }

    #[test]
    fn point_validity() {
        assert!(GeoPoint::new(44.9, -93.2).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }
}
