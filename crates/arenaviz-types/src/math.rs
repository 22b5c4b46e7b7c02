//! Minimal vector and quaternion value types.
//!
//! These exist for the wire protocol (entity poses in commands and
//! snapshots), not for geometry. The engine is free to use whatever math
//! library it likes internally; poses cross the boundary in this shape.

use serde::{Deserialize, Serialize};

/// A position or extent in arena coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component (meters).
    pub x: f64,
    /// Y component (meters).
    pub y: f64,
    /// Z component (meters).
    pub z: f64,
}

impl Vec3 {
    /// Construct a vector from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// An orientation quaternion (x, y, z, w ordering on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
    /// W (scalar) component.
    pub w: f64,
}

impl Quaternion {
    /// Construct a quaternion from components.
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// The identity rotation.
    pub const fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}
