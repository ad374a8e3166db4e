use nalgebra::{Isometry3, Matrix4, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ValidationError};

/// A point in world space (m). Unconstrained apart from being finite on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CartesianPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector(v: Vector3<f64>) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn distance_to(&self, other: &CartesianPosition) -> f64 {
        (self.to_vector() - other.to_vector()).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_finite("x", self.x)?;
        ensure_finite("y", self.y)?;
        ensure_finite("z", self.z)
    }
}

/// Placement of the crane base in world space: a position plus a yaw about Z (degrees).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotation_z: f64,
}

impl Orientation {
    pub fn new(x: f64, y: f64, z: f64, rotation_z: f64) -> Self {
        Self {
            x,
            y,
            z,
            rotation_z,
        }
    }

    /// Rigid placement of the base: translate, then rotate about Z.
    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(self.x, self.y, self.z),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.rotation_z.to_radians()),
        )
    }

    pub fn world_transform(&self) -> Matrix4<f64> {
        self.isometry().to_homogeneous()
    }

    /// Express a world point in the crane's local frame.
    pub fn to_local(&self, point: &CartesianPosition) -> CartesianPosition {
        let p = self
            .isometry()
            .inverse_transform_point(&Point3::from(point.to_vector()));
        CartesianPosition::from_vector(p.coords)
    }

    /// Express a crane-local point in world space.
    pub fn to_world(&self, point: &CartesianPosition) -> CartesianPosition {
        let p = self.isometry().transform_point(&Point3::from(point.to_vector()));
        CartesianPosition::from_vector(p.coords)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_finite("orientation.x", self.x)?;
        ensure_finite("orientation.y", self.y)?;
        ensure_finite("orientation.z", self.z)?;
        ensure_finite("orientation.rotationZ", self.rotation_z)
    }
}
