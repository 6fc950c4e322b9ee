//! Mjhood Core Library
//!
//! Core functionality for Mjhood - the neighborhood services and needs map.
//! This crate provides the location-privacy layer that sits between the
//! backend's exact coordinates and the public map.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod location;

pub use api::MjhoodCore;
