use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_in_range, ValidationError};
use crate::types::Dimensions;

/// Allowed swing range in degrees.
pub const SWING_RANGE_DEG: (f64, f64) = (-180.0, 180.0);
/// Allowed elbow range in degrees.
pub const ELBOW_RANGE_DEG: (f64, f64) = (-180.0, 180.0);
/// Allowed wrist range in degrees.
pub const WRIST_RANGE_DEG: (f64, f64) = (-180.0, 180.0);
/// Allowed gripper opening, as a fraction of the maximum aperture.
pub const GRIPPER_RANGE: (f64, f64) = (0.0, 1.0);

/// Values of the five crane joints, either as a target or as reported by the backend.
///
/// Field names match the wire format exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    pub swing: f64,   // Column yaw (degrees)
    pub lift: f64,    // Arm carriage height along the column (m)
    pub elbow: f64,   // Rotation applied at the wrist pivot (degrees)
    pub wrist: f64,   // Rotation applied at the gripper pivot (degrees)
    pub gripper: f64, // Opening fraction [0, 1]
}

impl Default for JointState {
    /// The state a session starts from before the backend reports anything.
    fn default() -> Self {
        Self {
            swing: 0.0,
            lift: 1.0,
            elbow: 0.0,
            wrist: 0.0,
            gripper: 0.0,
        }
    }
}

impl JointState {
    pub const FIELD_NAMES: [&'static str; 5] = ["swing", "lift", "elbow", "wrist", "gripper"];

    pub fn new(swing: f64, lift: f64, elbow: f64, wrist: f64, gripper: f64) -> Self {
        Self {
            swing,
            lift,
            elbow,
            wrist,
            gripper,
        }
    }

    /// Convert to array, in `FIELD_NAMES` order
    pub fn to_array(&self) -> [f64; 5] {
        [self.swing, self.lift, self.elbow, self.wrist, self.gripper]
    }

    /// Create from array, in `FIELD_NAMES` order
    pub fn from_array(arr: [f64; 5]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3], arr[4])
    }

    /// Check every joint is finite and inside its declared range.
    ///
    /// The lift range depends on the column height, so the crane dimensions are needed.
    /// Values are never clamped here.
    pub fn validate(&self, dimensions: &Dimensions) -> Result<(), ValidationError> {
        self.ensure_finite()?;

        ensure_in_range("swing", self.swing, SWING_RANGE_DEG)?;
        ensure_in_range("lift", self.lift, (0.0, dimensions.lift_max()))?;
        ensure_in_range("elbow", self.elbow, ELBOW_RANGE_DEG)?;
        ensure_in_range("wrist", self.wrist, WRIST_RANGE_DEG)?;
        ensure_in_range("gripper", self.gripper, GRIPPER_RANGE)?;
        Ok(())
    }

    pub fn ensure_finite(&self) -> Result<(), ValidationError> {
        for (field, value) in Self::FIELD_NAMES.into_iter().zip(self.to_array()) {
            ensure_finite(field, value)?;
        }
        Ok(())
    }
}
