//! Location data types.

use serde::{Deserialize, Serialize};

use super::error::{MaskError, Result};
use super::geo::{location_to_geohash, PUBLIC_GEOHASH_LENGTH};
use super::privacy::{DEFAULT_JITTER_RADIUS_METERS, NEIGHBORHOOD_GRID_DEGREES};

/// A latitude/longitude pair in degrees.
///
/// Valid coordinates have `lat` in `[-90, 90]` and `lng` in `[-180, 180]`.
/// The fields are public so records coming from the backend can be built
/// directly. Use [`Coordinate::new`] when the values are untrusted.
///
/// # Examples
///
/// ```
/// use mjhood_core::location::Coordinate;
///
/// let riyadh = Coordinate::new(24.7136, 46.6753).unwrap();
/// assert!(riyadh.is_valid());
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl Coordinate {
    /// Creates a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidCoordinate`] if either axis is out of
    /// range or not finite.
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        Self { lat, lng }.validated()
    }

    /// Returns `true` if both axes are within their valid ranges.
    ///
    /// NaN fails every range check, so it is never valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Returns `self` if valid, otherwise an `InvalidCoordinate` error.
    pub(crate) fn validated(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(MaskError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

/// Strategy used to derive a public coordinate from an exact one.
///
/// | Method       | Output                                | Per-user |
/// |--------------|---------------------------------------|----------|
/// | Jitter       | exact + deterministic offset (~100 m) | yes      |
/// | Neighborhood | exact snapped to a 0.01° grid (~1 km) | no       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaskMethod {
    /// Deterministic per-user offset within the jitter radius
    #[default]
    Jitter,
    /// Snap to the center of a coarse grid cell shared by nearby users
    Neighborhood,
}

impl MaskMethod {
    /// Returns the wire name of this method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jitter => "jitter",
            Self::Neighborhood => "neighborhood",
        }
    }
}

/// Role of whoever is viewing a location.
///
/// Anonymous viewers and any unrecognised role map to [`ViewerRole::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewerRole {
    /// Full access, including exact coordinates
    Admin,
    /// Moderation access, including exact coordinates
    Moderator,
    /// Regular or anonymous viewer; sees masked coordinates only
    #[default]
    User,
}

impl ViewerRole {
    /// Parses a role string as stored on a profile.
    ///
    /// Matching is exact and case-sensitive. `None` means anonymous.
    ///
    /// # Examples
    ///
    /// ```
    /// use mjhood_core::location::ViewerRole;
    ///
    /// assert_eq!(ViewerRole::from_role(Some("admin")), ViewerRole::Admin);
    /// assert_eq!(ViewerRole::from_role(Some("Admin")), ViewerRole::User);
    /// assert_eq!(ViewerRole::from_role(None), ViewerRole::User);
    /// ```
    #[must_use]
    pub fn from_role(role: Option<&str>) -> Self {
        match role {
            Some("admin") => Self::Admin,
            Some("moderator") => Self::Moderator,
            _ => Self::User,
        }
    }

    /// Returns `true` if this role may see exact coordinates.
    #[must_use]
    pub const fn can_view_exact(self) -> bool {
        matches!(self, Self::Admin | Self::Moderator)
    }
}

/// Location columns of a profile or listing row.
///
/// Field names match the backend columns so rows can be deserialized
/// directly. Every field is optional and defaults to absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRecord {
    /// Exact latitude (restricted column)
    pub location_exact_lat: Option<f64>,
    /// Exact longitude (restricted column)
    pub location_exact_lng: Option<f64>,
    /// Public latitude
    pub latitude: Option<f64>,
    /// Public longitude
    pub longitude: Option<f64>,
}

impl LocationRecord {
    /// Creates a record holding only an exact coordinate.
    #[must_use]
    pub const fn exact(lat: f64, lng: f64) -> Self {
        Self {
            location_exact_lat: Some(lat),
            location_exact_lng: Some(lng),
            latitude: None,
            longitude: None,
        }
    }

    /// Creates a record holding only a public coordinate.
    #[must_use]
    pub const fn public(lat: f64, lng: f64) -> Self {
        Self {
            location_exact_lat: None,
            location_exact_lng: None,
            latitude: Some(lat),
            longitude: Some(lng),
        }
    }

    /// Parses a record from a JSON row.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Settings controlling how coordinates are masked for public display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingSettings {
    /// Masking strategy for public output
    pub method: MaskMethod,

    /// Jitter radius in meters (used by [`MaskMethod::Jitter`])
    pub jitter_radius_meters: f64,

    /// Grid cell size in degrees (used by [`MaskMethod::Neighborhood`])
    pub grid_precision_degrees: f64,
}

impl Default for MaskingSettings {
    fn default() -> Self {
        Self {
            method: MaskMethod::default(),
            jitter_radius_meters: DEFAULT_JITTER_RADIUS_METERS,
            grid_precision_degrees: NEIGHBORHOOD_GRID_DEGREES,
        }
    }
}

impl MaskingSettings {
    /// Checks that the radius and grid size are usable.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidConfig`] if the radius is not a positive
    /// finite number, or the grid is not in `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let radius = self.jitter_radius_meters;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(MaskError::InvalidConfig(format!(
                "jitter_radius_meters must be positive, got {radius}"
            )));
        }

        let grid = self.grid_precision_degrees;
        if !grid.is_finite() || grid <= 0.0 || grid > 1.0 {
            return Err(MaskError::InvalidConfig(format!(
                "grid_precision_degrees must be in (0, 1], got {grid}"
            )));
        }

        Ok(())
    }

    /// Parses and validates settings from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Converts these settings to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A masked location ready to embed in an API response or map marker.
///
/// Only derived values are held here. The exact coordinate never enters
/// this type, so serializing it cannot leak the stored location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicLocation {
    /// Masked latitude
    pub latitude: f64,

    /// Masked longitude
    pub longitude: f64,

    /// Geohash of the masked point, for clustering markers
    pub geohash: String,

    /// Method that produced the masked point
    pub method: MaskMethod,
}

impl PublicLocation {
    /// Wraps an already-masked coordinate.
    #[must_use]
    pub fn new(masked: Coordinate, method: MaskMethod) -> Self {
        Self {
            latitude: masked.lat,
            longitude: masked.lng,
            geohash: location_to_geohash(masked, PUBLIC_GEOHASH_LENGTH),
            method,
        }
    }

    /// Returns the masked point as a [`Coordinate`].
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.latitude,
            lng: self.longitude,
        }
    }

    /// Creates a `PublicLocation` from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or missing required fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts this `PublicLocation` to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
