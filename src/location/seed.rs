//! Deterministic offset sources for jitter.
//!
//! Jitter needs two values in `[0, 1)` that are stable for a given identity
//! token. Two sources are provided:
//!
//! - [`StringHashSource`]: a 32-bit polynomial string hash fed into a
//!   sine-based generator. Anyone who knows the token can recompute the
//!   offsets, so this is obfuscation only.
//! - [`KeyedHashSource`]: HMAC-SHA256 of the token under a secret
//!   [`MaskingKey`]. Without the key the offsets cannot be recomputed, so masked
//!   points cannot be unmasked from the public token alone.
//!
//! Neither source stops an observer who collects many masked points for the
//! same user across different exact locations from narrowing things down.

use std::fmt;

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::error::{MaskError, Result};

/// Length of a masking key in bytes.
pub const MASKING_KEY_LEN: usize = 32;

/// Source of the two pseudo-random values used to offset a coordinate.
pub trait OffsetSource {
    /// Returns two independent values in `[0, 1)` derived from `token`.
    ///
    /// Must be deterministic: the same token always yields the same pair.
    fn offsets(&self, token: &str) -> (f64, f64);
}

/// 32-bit polynomial hash (`h = h * 31 + unit`) over UTF-16 code units.
///
/// Arithmetic wraps at 32 bits and the absolute value is returned, so
/// existing masked positions stay where they were when this hash was
/// computed by earlier clients.
///
/// # Examples
///
/// ```
/// use mjhood_core::location::seed::string_hash;
///
/// assert_eq!(string_hash(""), 0);
/// assert_eq!(string_hash("a"), 97);
/// assert_eq!(string_hash("user-123"), 267_697_872);
/// ```
#[must_use]
pub fn string_hash(s: &str) -> u32 {
    s.encode_utf16()
        .fold(0_i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        })
        .unsigned_abs()
}

/// Sine-based generator mapping a seed to `[0, 1)`.
#[must_use]
pub fn seeded_random(seed: f64) -> f64 {
    let x = seed.sin() * 10_000.0;
    x - x.floor()
}

/// Offsets from [`string_hash`] and [`seeded_random`] at `seed` and `seed + 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringHashSource;

impl OffsetSource for StringHashSource {
    fn offsets(&self, token: &str) -> (f64, f64) {
        let seed = f64::from(string_hash(token));
        (seeded_random(seed), seeded_random(seed + 1.0))
    }
}

/// Secret key for [`KeyedHashSource`].
///
/// Key bytes are wiped on drop and never printed by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MaskingKey([u8; MASKING_KEY_LEN]);

impl MaskingKey {
    /// Generates a fresh random key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; MASKING_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wraps existing key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; MASKING_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a key from a 64-character hex string.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidKey`] if the string is not valid hex or
    /// does not decode to exactly 32 bytes.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; MASKING_KEY_LEN]);
        hex::decode_to_slice(encoded.trim(), bytes.as_mut_slice())
            .map_err(|e| MaskError::InvalidKey(e.to_string()))?;
        Ok(Self(*bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MaskingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MaskingKey([REDACTED])")
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Offsets from `HMAC-SHA256(key, token)`.
///
/// The first and second 8-byte words of the tag each give one value.
/// The MAC is keyed once at construction and cloned for every token.
#[derive(Clone)]
pub struct KeyedHashSource {
    mac: HmacSha256,
}

impl KeyedHashSource {
    /// Creates a source bound to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidKey`] if the MAC rejects the key bytes.
    #[allow(clippy::needless_pass_by_value)] // The key is wiped when dropped here.
    pub fn new(key: MaskingKey) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|e| MaskError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }
}

impl fmt::Debug for KeyedHashSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyedHashSource([REDACTED])")
    }
}

impl OffsetSource for KeyedHashSource {
    fn offsets(&self, token: &str) -> (f64, f64) {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        let tag = mac.finalize().into_bytes();

        let (first, rest) = tag.split_at(8);
        (unit_interval(first), unit_interval(&rest[..8]))
    }
}

/// Maps the top 53 bits of an 8-byte big-endian word to `[0, 1)`.
#[allow(clippy::cast_precision_loss)] // 53-bit values are exact in f64.
fn unit_interval(bytes: &[u8]) -> f64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    (u64::from_be_bytes(word) >> 11) as f64 / (1_u64 << 53) as f64
}
