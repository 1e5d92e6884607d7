//! # gatekit-core
//!
//! Core entity and attribute types shared across the GateKit workspace.
//!
//! This crate provides:
//! - The [`AttributeValue`] tagged union and the [`Attributes`] container
//! - The [`Resource`] entity and its raw [`ResourceDocument`] input shape
//! - The [`Action`] enum for requested operations
//!
//! The authorization engine itself lives in `gatekit-authz`; everything here
//! is plain data with serde support and no policy semantics.

pub mod action;
pub mod attribute;
pub mod error;
pub mod resource;

pub use action::Action;
pub use attribute::{AttributeValue, Attributes, ValueType};
pub use error::CoreError;
pub use resource::{Resource, ResourceDocument};

/// Type alias for core results.
pub type Result<T> = std::result::Result<T, CoreError>;
