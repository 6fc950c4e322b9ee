//! Location module for Mjhood.
//!
//! Turns the exact coordinates stored for profiles, listings, needs and CVs
//! into coordinates that are safe to show on the public map:
//! - Deterministic per-user jitter (default, ~100 m)
//! - Neighborhood grid snapping (~1.1 km cells)
//! - Exact-coordinate lookup with public fallback
//! - Role predicate deciding who may see exact coordinates
//!
//! # Privacy Guarantees
//!
//! - Exact coordinates are never modified or stored by this module
//! - Masked coordinates are recomputed per request and are stable per user
//! - Jitter with the default [`StringHashSource`] is obfuscation only; use a
//!   [`KeyedHashSource`] when offsets must not be recomputable from the token
//!
//! # Example Usage
//!
//! ```
//! use mjhood_core::location::{
//!     can_view_exact_coordinates, get_exact_coordinates, mask_coordinates, LocationRecord,
//!     MaskMethod,
//! };
//!
//! let record = LocationRecord::exact(24.7136, 46.6753);
//! let exact = get_exact_coordinates(&record).unwrap();
//!
//! let shown = if can_view_exact_coordinates(Some("moderator")) {
//!     exact
//! } else {
//!     mask_coordinates(exact, "user-123", MaskMethod::Jitter).unwrap()
//! };
//! assert_eq!(shown, exact);
//! ```

pub mod error;
pub mod geo;
pub mod privacy;
pub mod seed;
pub mod types;

pub use error::{MaskError, Result};
pub use geo::{calculate_distance, is_valid_coordinate, location_to_geohash};
pub use privacy::{
    apply_jitter, apply_jitter_with, can_view_exact_coordinates, get_exact_coordinates,
    get_neighborhood_center, mask_coordinates, mask_with_settings, mask_with_source,
    require_location, snap_to_grid,
};
pub use seed::{KeyedHashSource, MaskingKey, OffsetSource, StringHashSource};
pub use types::{
    Coordinate, LocationRecord, MaskMethod, MaskingSettings, PublicLocation, ViewerRole,
};
