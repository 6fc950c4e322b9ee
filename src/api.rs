//! High-level API used by the marketplace's request handlers.

use log::warn;

use crate::location::{
    can_view_exact_coordinates, get_exact_coordinates, mask_with_source, Coordinate,
    KeyedHashSource, LocationRecord, MaskError, MaskingKey, MaskingSettings, PublicLocation,
    Result, StringHashSource,
};

/// Core interface for Mjhood location handling.
///
/// Holds the masking settings and, optionally, a secret key for jitter.
/// All read operations take `&self`, so one instance can be shared across
/// request handlers.
///
/// # Examples
///
/// ```
/// use mjhood_core::location::LocationRecord;
/// use mjhood_core::MjhoodCore;
///
/// let core = MjhoodCore::new();
/// let record = LocationRecord::exact(24.7136, 46.6753);
///
/// let for_admin = core.location_for_viewer(&record, "user-123", Some("admin")).unwrap();
/// let for_public = core.location_for_viewer(&record, "user-123", None).unwrap();
/// assert_ne!(for_admin, for_public);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MjhoodCore {
    settings: MaskingSettings,
    keyed: Option<KeyedHashSource>,
}

impl MjhoodCore {
    /// Creates a `MjhoodCore` with default settings and unkeyed jitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `MjhoodCore` with custom settings.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidConfig`] if the settings fail validation.
    pub fn with_settings(settings: MaskingSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            keyed: None,
        })
    }

    /// Switches jitter to offsets derived from `key`.
    ///
    /// Masked positions change when the key changes, so the key must be
    /// stable across deployments.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidKey`] if the key cannot be used for HMAC.
    pub fn with_key(mut self, key: MaskingKey) -> Result<Self> {
        self.keyed = Some(KeyedHashSource::new(key)?);
        Ok(self)
    }

    /// Returns whether jitter uses a secret key.
    #[must_use]
    pub const fn is_keyed(&self) -> bool {
        self.keyed.is_some()
    }

    /// Gets the current masking settings.
    #[must_use]
    pub const fn settings(&self) -> &MaskingSettings {
        &self.settings
    }

    /// Replaces the masking settings.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidConfig`] if the settings fail validation.
    /// The current settings are kept in that case.
    pub fn set_settings(&mut self, settings: MaskingSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Masks `exact` using the configured method and offset source.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `exact` or `identity_token` is unusable.
    pub fn mask(&self, exact: Coordinate, identity_token: &str) -> Result<Coordinate> {
        match &self.keyed {
            Some(source) => mask_with_source(source, exact, identity_token, &self.settings),
            None => mask_with_source(&StringHashSource, exact, identity_token, &self.settings),
        }
    }

    /// Builds the public marker for a record.
    ///
    /// Returns `Ok(None)` when the record has no location.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the stored coordinate is out of range
    /// or the identity token is empty.
    pub fn public_location(
        &self,
        record: &LocationRecord,
        identity_token: &str,
    ) -> Result<Option<PublicLocation>> {
        let Some(exact) = get_exact_coordinates(record) else {
            return Ok(None);
        };

        let masked = self
            .mask(exact, identity_token)
            .inspect_err(log_rejected)?;
        Ok(Some(PublicLocation::new(masked, self.settings.method)))
    }

    /// Returns the coordinate `role` is allowed to see for a record.
    ///
    /// Admins and moderators get the exact coordinate. Everyone else,
    /// including anonymous viewers (`None`), gets the masked one.
    ///
    /// # Errors
    ///
    /// Returns a validation error if masking is needed and the stored
    /// coordinate or identity token is unusable.
    pub fn location_for_viewer(
        &self,
        record: &LocationRecord,
        identity_token: &str,
        role: Option<&str>,
    ) -> Result<Option<Coordinate>> {
        let Some(exact) = get_exact_coordinates(record) else {
            return Ok(None);
        };

        if can_view_exact_coordinates(role) {
            return Ok(Some(exact));
        }

        self.mask(exact, identity_token)
            .inspect_err(log_rejected)
            .map(Some)
    }
}

fn log_rejected(err: &MaskError) {
    if matches!(err, MaskError::InvalidCoordinate { .. }) {
        warn!("Stored coordinate rejected for masking: out of range");
    }
}
