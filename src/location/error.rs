//! Error types for coordinate masking.
//!
//! Masking is pure computation, so every error here describes bad input
//! (coordinates, tokens, radii, settings, keys) rather than a transient
//! failure. None of them are retryable.

use thiserror::Error;

/// Error type for masking operations.
#[derive(Error, Debug)]
pub enum MaskError {
    /// Latitude or longitude is outside the valid range or not finite.
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate {
        /// Rejected latitude.
        lat: f64,
        /// Rejected longitude.
        lng: f64,
    },

    /// The identity token used to seed jitter is empty.
    #[error("Identity token must not be empty")]
    EmptyIdentityToken,

    /// Jitter radius is not a positive, finite distance.
    #[error("Invalid jitter radius: {0} meters")]
    InvalidRadius(f64),

    /// Masking settings failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Masking key material is malformed.
    #[error("Invalid masking key: {0}")]
    InvalidKey(String),

    /// The record carries neither an exact nor a public coordinate.
    #[error("No location available for record")]
    MissingLocation,

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for masking operations.
pub type Result<T> = std::result::Result<T, MaskError>;
