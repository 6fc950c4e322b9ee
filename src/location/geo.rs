//! Coordinate validation, great-circle distance and geohash helpers.

use super::types::Coordinate;

/// Mean Earth radius in meters, used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Geohash length used for public markers.
///
/// Length 7 cells are roughly 150 m × 150 m, coarse enough that a
/// geohash never narrows a jittered point below the jitter radius.
pub const PUBLIC_GEOHASH_LENGTH: usize = 7;

/// Returns `true` if `coord` lies within the valid latitude/longitude ranges.
///
/// # Examples
///
/// ```
/// use mjhood_core::location::{is_valid_coordinate, Coordinate};
///
/// assert!(is_valid_coordinate(&Coordinate { lat: 0.0, lng: 0.0 }));
/// assert!(!is_valid_coordinate(&Coordinate { lat: 91.0, lng: 0.0 }));
/// assert!(!is_valid_coordinate(&Coordinate { lat: 45.0, lng: 200.0 }));
/// ```
#[must_use]
pub fn is_valid_coordinate(coord: &Coordinate) -> bool {
    coord.is_valid()
}

/// Great-circle distance between two coordinates in meters (haversine).
///
/// # Error Handling
///
/// No range validation is performed. Out-of-range but finite inputs still
/// give a distance on the sphere. NaN or infinite inputs yield NaN, so
/// callers that accept untrusted input should check
/// [`is_valid_coordinate`] first.
///
/// # Examples
///
/// ```
/// use mjhood_core::location::{calculate_distance, Coordinate};
///
/// let a = Coordinate { lat: 24.7136, lng: 46.6753 };
/// assert_eq!(calculate_distance(a, a), 0.0);
///
/// let b = Coordinate { lat: 24.7236, lng: 46.6753 };
/// let d = calculate_distance(a, b);
/// assert!((d - 1_112.0).abs() < 1.0); // 0.01° of latitude
/// ```
#[must_use]
pub fn calculate_distance(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    // Rounding can push `h` a hair above 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Encodes a coordinate as a geohash of the given length.
///
/// # Arguments
///
/// * `coord` - Coordinate to encode, normally an already masked one
/// * `length` - Geohash length (typically [`PUBLIC_GEOHASH_LENGTH`])
///
/// # Error Handling
///
/// Returns an empty string if encoding fails, which happens for
/// out-of-range coordinates (latitude not in -90..=90, longitude not in
/// -180..=180). Callers that need the hash should validate the coordinate
/// first or check for an empty string.
///
/// # Examples
///
/// ```
/// use mjhood_core::location::{location_to_geohash, Coordinate};
///
/// let hash = location_to_geohash(Coordinate { lat: 24.7136, lng: 46.6753 }, 7);
/// assert_eq!(hash.len(), 7);
/// assert!(location_to_geohash(Coordinate { lat: 95.0, lng: 0.0 }, 7).is_empty());
/// ```
#[must_use]
pub fn location_to_geohash(coord: Coordinate, length: usize) -> String {
    geohash::encode(
        geohash::Coord {
            x: coord.lng,
            y: coord.lat,
        },
        length,
    )
    .unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate { lat, lng }
    }

    #[test]
    fn valid_coordinate_examples() {
        assert!(!is_valid_coordinate(&coord(91.0, 0.0)));
        assert!(!is_valid_coordinate(&coord(45.0, 200.0)));
        assert!(is_valid_coordinate(&coord(0.0, 0.0)));
        assert!(is_valid_coordinate(&coord(-90.0, -180.0)));
        assert!(!is_valid_coordinate(&coord(f64::NAN, 0.0)));
    }

    #[test]
    fn distance_to_self_is_zero() {
        let riyadh = coord(24.7136, 46.6753);
        assert!(calculate_distance(riyadh, riyadh).abs() < f64::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let riyadh = coord(24.7136, 46.6753);
        let jeddah = coord(21.4858, 39.1925);

        let there = calculate_distance(riyadh, jeddah);
        let back = calculate_distance(jeddah, riyadh);
        assert!((there - back).abs() < 1e-6);
    }

    #[test]
    fn distance_riyadh_to_jeddah() {
        let riyadh = coord(24.7136, 46.6753);
        let jeddah = coord(21.4858, 39.1925);

        let d = calculate_distance(riyadh, jeddah);
        // ~846 km great-circle
        assert!((840_000.0..855_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn distance_antipodal_is_half_circumference() {
        let d = calculate_distance(coord(0.0, 0.0), coord(0.0, 180.0));
        assert!((d - PI * EARTH_RADIUS_METERS).abs() < 1.0);

        let poles = calculate_distance(coord(90.0, 0.0), coord(-90.0, 0.0));
        assert!((poles - PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }

    #[test]
    fn distance_with_nan_is_nan() {
        assert!(calculate_distance(coord(f64::NAN, 0.0), coord(0.0, 0.0)).is_nan());
    }

    #[test]
    fn geohash_has_requested_length() {
        let hash = location_to_geohash(coord(24.7136, 46.6753), PUBLIC_GEOHASH_LENGTH);
        assert_eq!(hash.len(), PUBLIC_GEOHASH_LENGTH);
    }

    #[test]
    fn geohash_nearby_points_share_prefix() {
        let a = location_to_geohash(coord(24.7136, 46.6753), 8);
        let b = location_to_geohash(coord(24.7137, 46.6754), 8);

        let common = a
            .chars()
            .zip(b.chars())
            .take_while(|(x, y)| x == y)
            .count();
        assert!(common >= 6);
    }

    #[test]
    fn geohash_invalid_coordinate_is_empty() {
        assert!(location_to_geohash(coord(95.0, 0.0), 7).is_empty());
    }
}
