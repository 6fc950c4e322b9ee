//! Privacy-preserving coordinate masking.
//!
//! This module derives public coordinates from exact ones:
//! - Jitter: a deterministic per-user offset within a radius
//! - Neighborhood: snapping to a coarse grid shared by nearby users
//!
//! It also decides which stored coordinate counts as "exact" and who may
//! see it. Nothing here performs I/O or keeps state between calls.
//!
//! # Jitter shape
//!
//! Latitude and longitude are offset independently, each by up to the
//! radius. The result lies in a square around the exact point, so the
//! displacement can reach `radius * √2` at the corners.

use log::debug;

use super::error::{MaskError, Result};
use super::seed::{OffsetSource, StringHashSource};
use super::types::{Coordinate, LocationRecord, MaskMethod, MaskingSettings, ViewerRole};

/// Default jitter radius in meters.
pub const DEFAULT_JITTER_RADIUS_METERS: f64 = 100.0;

/// Default neighborhood grid size in degrees (~1.1 km at the equator).
pub const NEIGHBORHOOD_GRID_DEGREES: f64 = 0.01;

/// Approximate meters per degree of latitude.
pub const METERS_PER_DEGREE_LATITUDE: f64 = 111_000.0;

/// Floor for `cos(lat)` when scaling the longitude offset.
///
/// `cos(lat)` reaches this value at about 89.43°. Above that the
/// longitude offset stops growing instead of diverging at the poles.
pub const MIN_LONGITUDE_SCALE: f64 = 0.01;

/// Applies deterministic jitter to `exact`, seeded by `identity_token`.
///
/// The same `(exact, identity_token, radius_meters)` always yields the same
/// output, so a user's marker does not move between page loads.
///
/// # Arguments
///
/// * `exact` - Stored coordinate to mask
/// * `identity_token` - Stable per-user seed, usually the account id
/// * `radius_meters` - Maximum offset per axis ([`DEFAULT_JITTER_RADIUS_METERS`] by default)
///
/// # Errors
///
/// - [`MaskError::InvalidCoordinate`] if `exact` is out of range
/// - [`MaskError::EmptyIdentityToken`] if `identity_token` is empty
/// - [`MaskError::InvalidRadius`] if `radius_meters` is not positive and finite
///
/// # Examples
///
/// ```
/// use mjhood_core::location::{apply_jitter, calculate_distance, Coordinate};
///
/// let exact = Coordinate { lat: 24.7136, lng: 46.6753 };
/// let masked = apply_jitter(exact, "user-123", 100.0).unwrap();
///
/// assert_ne!(masked, exact);
/// assert!(calculate_distance(exact, masked) < 142.0);
/// assert_eq!(masked, apply_jitter(exact, "user-123", 100.0).unwrap());
/// ```
pub fn apply_jitter(
    exact: Coordinate,
    identity_token: &str,
    radius_meters: f64,
) -> Result<Coordinate> {
    apply_jitter_with(&StringHashSource, exact, identity_token, radius_meters)
}

/// Applies jitter using offsets drawn from `source`.
///
/// # Arguments
///
/// * `source` - Supplies the two offsets in `[0, 1)` for `identity_token`
/// * `exact`, `identity_token`, `radius_meters` - As for [`apply_jitter`]
///
/// # Errors
///
/// Same as [`apply_jitter`].
pub fn apply_jitter_with<S: OffsetSource + ?Sized>(
    source: &S,
    exact: Coordinate,
    identity_token: &str,
    radius_meters: f64,
) -> Result<Coordinate> {
    let exact = exact.validated()?;
    if identity_token.is_empty() {
        return Err(MaskError::EmptyIdentityToken);
    }
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(MaskError::InvalidRadius(radius_meters));
    }

    let (r1, r2) = source.offsets(identity_token);

    let lat_offset = radius_meters / METERS_PER_DEGREE_LATITUDE * r1.mul_add(2.0, -1.0);
    let lng_offset = radius_meters / (METERS_PER_DEGREE_LATITUDE * longitude_scale(exact.lat))
        * r2.mul_add(2.0, -1.0);

    Ok(Coordinate {
        lat: (exact.lat + lat_offset).clamp(-90.0, 90.0),
        lng: wrap_longitude(exact.lng + lng_offset),
    })
}

/// Snaps `exact` to the nearest point on the 0.01° neighborhood grid.
///
/// Nearby users collapse onto the same point, and the identity token plays
/// no part. Rounding is half away from zero.
///
/// # Errors
///
/// Returns [`MaskError::InvalidCoordinate`] if `exact` is out of range.
///
/// # Examples
///
/// ```
/// use mjhood_core::location::{get_neighborhood_center, Coordinate};
///
/// let a = get_neighborhood_center(Coordinate { lat: 24.7136, lng: 46.6753 }).unwrap();
/// let b = get_neighborhood_center(Coordinate { lat: 24.7112, lng: 46.6771 }).unwrap();
/// assert_eq!(a, b);
/// ```
pub fn get_neighborhood_center(exact: Coordinate) -> Result<Coordinate> {
    snap_to_grid(exact, NEIGHBORHOOD_GRID_DEGREES)
}

/// Snaps `exact` to the nearest multiple of `precision_degrees` on each axis.
///
/// The result is clamped back into the valid ranges, since a coarse grid
/// can round past the poles or the antimeridian.
///
/// # Arguments
///
/// * `exact` - Stored coordinate to snap
/// * `precision_degrees` - Cell size in degrees on both axes (0.01 ≈ 1.1 km)
///
/// # Errors
///
/// - [`MaskError::InvalidCoordinate`] if `exact` is out of range
/// - [`MaskError::InvalidConfig`] if `precision_degrees` is not positive and finite
pub fn snap_to_grid(exact: Coordinate, precision_degrees: f64) -> Result<Coordinate> {
    let exact = exact.validated()?;
    if !precision_degrees.is_finite() || precision_degrees <= 0.0 {
        return Err(MaskError::InvalidConfig(format!(
            "grid precision must be positive, got {precision_degrees}"
        )));
    }

    let snap = |value: f64| (value / precision_degrees).round() * precision_degrees;

    Ok(Coordinate {
        lat: snap(exact.lat).clamp(-90.0, 90.0),
        lng: snap(exact.lng).clamp(-180.0, 180.0),
    })
}

/// Masks `exact` for public display using `method` and default parameters.
///
/// # Arguments
///
/// * `exact` - Stored coordinate to mask
/// * `identity_token` - Jitter seed; ignored by [`MaskMethod::Neighborhood`]
/// * `method` - Masking strategy
///
/// # Errors
///
/// Propagates the errors of [`apply_jitter`] or [`get_neighborhood_center`].
pub fn mask_coordinates(
    exact: Coordinate,
    identity_token: &str,
    method: MaskMethod,
) -> Result<Coordinate> {
    debug!("Masking coordinate with method={}", method.as_str());
    match method {
        MaskMethod::Jitter => apply_jitter(exact, identity_token, DEFAULT_JITTER_RADIUS_METERS),
        MaskMethod::Neighborhood => get_neighborhood_center(exact),
    }
}

/// Masks `exact` using the method, radius and grid from `settings`.
///
/// # Errors
///
/// - [`MaskError::InvalidConfig`] if `settings` fails [`MaskingSettings::validate`]
/// - Otherwise, validation errors from the selected method
pub fn mask_with_settings(
    exact: Coordinate,
    identity_token: &str,
    settings: &MaskingSettings,
) -> Result<Coordinate> {
    mask_with_source(&StringHashSource, exact, identity_token, settings)
}

/// Masks `exact` per `settings`, drawing jitter offsets from `source`.
///
/// # Arguments
///
/// * `source` - Offset source used when `settings.method` is jitter
/// * `exact` - Stored coordinate to mask
/// * `identity_token` - Jitter seed; ignored by [`MaskMethod::Neighborhood`]
/// * `settings` - Method, radius and grid; validated before use
///
/// # Errors
///
/// Same as [`mask_with_settings`].
pub fn mask_with_source<S: OffsetSource + ?Sized>(
    source: &S,
    exact: Coordinate,
    identity_token: &str,
    settings: &MaskingSettings,
) -> Result<Coordinate> {
    settings.validate()?;
    debug!("Masking coordinate with method={}", settings.method.as_str());
    match settings.method {
        MaskMethod::Jitter => {
            apply_jitter_with(source, exact, identity_token, settings.jitter_radius_meters)
        }
        MaskMethod::Neighborhood => snap_to_grid(exact, settings.grid_precision_degrees),
    }
}

/// Returns the authoritative coordinate of a record, if it has one.
///
/// The exact pair wins when both halves are present. Otherwise the public
/// pair is used. `0.0` counts as present. Non-finite values count as
/// missing. Ranges are not checked here; the masking functions do that.
///
/// # Examples
///
/// ```
/// use mjhood_core::location::{get_exact_coordinates, Coordinate, LocationRecord};
///
/// let record = LocationRecord::public(24.7, 46.6);
/// assert_eq!(
///     get_exact_coordinates(&record),
///     Some(Coordinate { lat: 24.7, lng: 46.6 })
/// );
/// assert_eq!(get_exact_coordinates(&LocationRecord::default()), None);
/// ```
#[must_use]
pub fn get_exact_coordinates(record: &LocationRecord) -> Option<Coordinate> {
    coordinate_pair(record.location_exact_lat, record.location_exact_lng)
        .or_else(|| coordinate_pair(record.latitude, record.longitude))
}

/// Like [`get_exact_coordinates`], but fails when the record has no location.
///
/// For handlers where a location is mandatory, such as posting a need flag.
///
/// # Errors
///
/// Returns [`MaskError::MissingLocation`] if neither coordinate pair is present.
pub fn require_location(record: &LocationRecord) -> Result<Coordinate> {
    get_exact_coordinates(record).ok_or(MaskError::MissingLocation)
}

/// Returns `true` only for the `admin` and `moderator` roles.
///
/// This answers the question and nothing more; callers decide what to
/// return based on it.
#[must_use]
pub fn can_view_exact_coordinates(role: Option<&str>) -> bool {
    ViewerRole::from_role(role).can_view_exact()
}

fn coordinate_pair(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinate> {
    match (lat, lng) {
        (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
            Some(Coordinate { lat, lng })
        }
        _ => None,
    }
}

fn longitude_scale(lat: f64) -> f64 {
    let scale = lat.to_radians().cos();
    if scale < MIN_LONGITUDE_SCALE {
        debug!("Latitude too close to a pole, clamping longitude scale");
        MIN_LONGITUDE_SCALE
    } else {
        scale
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::geo::calculate_distance;

    const RIYADH: Coordinate = Coordinate {
        lat: 24.7136,
        lng: 46.6753,
    };

    struct FixedSource(f64, f64);

    impl OffsetSource for FixedSource {
        fn offsets(&self, _token: &str) -> (f64, f64) {
            (self.0, self.1)
        }
    }

    fn approx_eq(a: Coordinate, b: Coordinate) -> bool {
        (a.lat - b.lat).abs() < 1e-9 && (a.lng - b.lng).abs() < 1e-9
    }

    #[test]
    fn jitter_riyadh_scenario() {
        let masked = apply_jitter(RIYADH, "user-123", 100.0).unwrap();

        assert!(approx_eq(
            masked,
            Coordinate {
                lat: 24.714_092_286_921_886,
                lng: 46.674_898_220_919_64,
            }
        ));
        assert!(calculate_distance(RIYADH, masked) <= 100.0 * 2.0_f64.sqrt());
        assert_eq!(masked, apply_jitter(RIYADH, "user-123", 100.0).unwrap());
    }

    #[test]
    fn jitter_differs_per_token() {
        let a = apply_jitter(RIYADH, "user-123", 100.0).unwrap();
        let b = apply_jitter(RIYADH, "user-456", 100.0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn jitter_scales_with_radius() {
        let small = apply_jitter(RIYADH, "user-123", 10.0).unwrap();
        let large = apply_jitter(RIYADH, "user-123", 1_000.0).unwrap();

        let d_small = calculate_distance(RIYADH, small);
        let d_large = calculate_distance(RIYADH, large);
        assert!((d_large / d_small - 100.0).abs() < 0.1);
    }

    #[test]
    fn jitter_corner_offsets() {
        // r = 0 and r -> 1 push both axes to the edge of the square.
        let masked = apply_jitter_with(&FixedSource(0.0, 0.0), RIYADH, "t", 111.0).unwrap();
        assert!((masked.lat - (RIYADH.lat - 0.001)).abs() < 1e-12);
        assert!(masked.lng < RIYADH.lng - 0.001);

        let centered = apply_jitter_with(&FixedSource(0.5, 0.5), RIYADH, "t", 111.0).unwrap();
        assert!(approx_eq(centered, RIYADH));
    }

    #[test]
    fn jitter_rejects_invalid_coordinate() {
        let invalid = Coordinate {
            lat: 91.0,
            lng: 0.0,
        };
        let result = apply_jitter(invalid, "user-123", 100.0);
        assert!(matches!(result, Err(MaskError::InvalidCoordinate { .. })));
    }

    #[test]
    fn jitter_rejects_empty_token() {
        let result = apply_jitter(RIYADH, "", 100.0);
        assert!(matches!(result, Err(MaskError::EmptyIdentityToken)));
    }

    #[test]
    fn jitter_rejects_bad_radius() {
        for radius in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                apply_jitter(RIYADH, "user-123", radius),
                Err(MaskError::InvalidRadius(_))
            ));
        }
    }

    #[test]
    fn jitter_at_poles_stays_valid() {
        for lat in [90.0, -90.0, 89.999, -89.999] {
            for token in ["user-123", "user-456", "a", "zzz"] {
                let masked = apply_jitter(Coordinate { lat, lng: 10.0 }, token, 100.0).unwrap();
                assert!(masked.is_valid(), "{token} at {lat} gave {masked:?}");
                // Scale floor caps the longitude offset at radius / (111 km * 0.01).
                let max_offset = 100.0 / (METERS_PER_DEGREE_LATITUDE * MIN_LONGITUDE_SCALE);
                assert!((masked.lng - 10.0).abs() <= max_offset + 1e-9);
            }
        }
    }

    #[test]
    fn jitter_wraps_across_antimeridian() {
        let east = Coordinate {
            lat: 0.0,
            lng: 180.0,
        };
        let masked = apply_jitter_with(&FixedSource(0.5, 0.999), east, "t", 1_000.0).unwrap();
        assert!(masked.is_valid());
        assert!(masked.lng < -179.99);
    }

    #[test]
    fn neighborhood_snaps_to_grid() {
        let center = get_neighborhood_center(RIYADH).unwrap();
        assert!(approx_eq(
            center,
            Coordinate {
                lat: 24.71,
                lng: 46.68
            }
        ));
    }

    #[test]
    fn neighborhood_is_idempotent() {
        let once = get_neighborhood_center(RIYADH).unwrap();
        let twice = get_neighborhood_center(once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn neighborhood_same_cell_same_center() {
        let a = get_neighborhood_center(Coordinate {
            lat: 24.7112,
            lng: 46.6771,
        })
        .unwrap();
        let b = get_neighborhood_center(Coordinate {
            lat: 24.7138,
            lng: 46.6753,
        })
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn snap_rounds_half_away_from_zero() {
        let snapped = snap_to_grid(
            Coordinate {
                lat: 0.125,
                lng: -0.125,
            },
            0.25,
        )
        .unwrap();
        assert_eq!(
            snapped,
            Coordinate {
                lat: 0.25,
                lng: -0.25
            }
        );
    }

    #[test]
    fn snap_clamps_coarse_grid_at_pole() {
        let snapped = snap_to_grid(
            Coordinate {
                lat: 90.0,
                lng: 180.0,
            },
            0.7,
        )
        .unwrap();
        assert!(snapped.is_valid());
    }

    #[test]
    fn snap_rejects_bad_precision() {
        assert!(matches!(
            snap_to_grid(RIYADH, 0.0),
            Err(MaskError::InvalidConfig(_))
        ));
        assert!(snap_to_grid(RIYADH, f64::NAN).is_err());
    }

    #[test]
    fn neighborhood_rejects_invalid_coordinate() {
        assert!(get_neighborhood_center(Coordinate {
            lat: 0.0,
            lng: 181.0
        })
        .is_err());
    }

    #[test]
    fn mask_coordinates_dispatches() {
        assert_eq!(
            mask_coordinates(RIYADH, "user-123", MaskMethod::Jitter).unwrap(),
            apply_jitter(RIYADH, "user-123", DEFAULT_JITTER_RADIUS_METERS).unwrap()
        );
        assert_eq!(
            mask_coordinates(RIYADH, "user-123", MaskMethod::Neighborhood).unwrap(),
            get_neighborhood_center(RIYADH).unwrap()
        );
    }

    #[test]
    fn mask_coordinates_neighborhood_ignores_token() {
        assert_eq!(
            mask_coordinates(RIYADH, "", MaskMethod::Neighborhood).unwrap(),
            mask_coordinates(RIYADH, "user-999", MaskMethod::Neighborhood).unwrap()
        );
    }

    #[test]
    fn mask_with_settings_uses_configured_values() {
        let settings = MaskingSettings {
            method: MaskMethod::Jitter,
            jitter_radius_meters: 500.0,
            ..MaskingSettings::default()
        };
        assert_eq!(
            mask_with_settings(RIYADH, "user-123", &settings).unwrap(),
            apply_jitter(RIYADH, "user-123", 500.0).unwrap()
        );

        let settings = MaskingSettings {
            method: MaskMethod::Neighborhood,
            grid_precision_degrees: 0.1,
            ..MaskingSettings::default()
        };
        let snapped = mask_with_settings(RIYADH, "user-123", &settings).unwrap();
        assert!(approx_eq(
            snapped,
            Coordinate {
                lat: 24.7,
                lng: 46.7
            }
        ));
    }

    #[test]
    fn mask_with_settings_rejects_invalid_settings() {
        let coarse_grid = MaskingSettings {
            method: MaskMethod::Neighborhood,
            grid_precision_degrees: 5.0,
            ..MaskingSettings::default()
        };
        assert!(matches!(
            mask_with_settings(RIYADH, "user-123", &coarse_grid),
            Err(MaskError::InvalidConfig(_))
        ));

        // Checked even when the offending field belongs to the other method.
        let bad_radius = MaskingSettings {
            method: MaskMethod::Neighborhood,
            jitter_radius_meters: -1.0,
            ..MaskingSettings::default()
        };
        assert!(matches!(
            mask_with_source(&FixedSource(0.5, 0.5), RIYADH, "user-123", &bad_radius),
            Err(MaskError::InvalidConfig(_))
        ));
    }

    #[test]
    fn exact_coordinates_prefer_exact_pair() {
        let record = LocationRecord {
            location_exact_lat: Some(24.7136),
            location_exact_lng: Some(46.6753),
            latitude: Some(24.7),
            longitude: Some(46.6),
        };
        assert_eq!(get_exact_coordinates(&record), Some(RIYADH));
    }

    #[test]
    fn exact_coordinates_fall_back_to_public_pair() {
        let record = LocationRecord::public(24.7, 46.6);
        assert_eq!(
            get_exact_coordinates(&record),
            Some(Coordinate {
                lat: 24.7,
                lng: 46.6
            })
        );
    }

    #[test]
    fn exact_coordinates_half_pair_falls_back() {
        let record = LocationRecord {
            location_exact_lat: Some(24.7136),
            location_exact_lng: None,
            latitude: Some(24.7),
            longitude: Some(46.6),
        };
        assert_eq!(
            get_exact_coordinates(&record),
            Some(Coordinate {
                lat: 24.7,
                lng: 46.6
            })
        );
    }

    #[test]
    fn exact_coordinates_empty_record_is_none() {
        assert_eq!(get_exact_coordinates(&LocationRecord::default()), None);
    }

    #[test]
    fn exact_coordinates_zero_is_present() {
        let record = LocationRecord::exact(0.0, 0.0);
        assert_eq!(
            get_exact_coordinates(&record),
            Some(Coordinate { lat: 0.0, lng: 0.0 })
        );
    }

    #[test]
    fn exact_coordinates_non_finite_is_missing() {
        let record = LocationRecord {
            location_exact_lat: Some(f64::NAN),
            location_exact_lng: Some(46.6),
            latitude: None,
            longitude: None,
        };
        assert_eq!(get_exact_coordinates(&record), None);
    }

    #[test]
    fn require_location_reports_missing() {
        assert!(matches!(
            require_location(&LocationRecord::default()),
            Err(MaskError::MissingLocation)
        ));
        assert_eq!(
            require_location(&LocationRecord::exact(24.7136, 46.6753)).unwrap(),
            RIYADH
        );
    }

    #[test]
    fn role_predicate() {
        assert!(can_view_exact_coordinates(Some("admin")));
        assert!(can_view_exact_coordinates(Some("moderator")));
        assert!(!can_view_exact_coordinates(Some("user")));
        assert!(!can_view_exact_coordinates(Some("superuser")));
        assert!(!can_view_exact_coordinates(None));
    }

    #[test]
    fn wrap_longitude_behaviour() {
        assert!((wrap_longitude(180.0) - 180.0).abs() < f64::EPSILON);
        assert!((wrap_longitude(-180.0) + 180.0).abs() < f64::EPSILON);
        assert!((wrap_longitude(181.0) + 179.0).abs() < 1e-9);
        assert!((wrap_longitude(-181.0) - 179.0).abs() < 1e-9);
    }
}
