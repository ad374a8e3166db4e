use eyre::Result;
use serde::{Deserialize, Serialize};

/// Cylinder measured as radius and height (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    pub radius: f64,
    pub height: f64,
}

/// Axis aligned box: width along X, height along Y, depth along Z (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl BoxSize {
    pub const fn new(width: f64, height: f64, depth: f64) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

/// Structural constants of the crane.
///
/// Loaded once at startup and then shared read-only (`Arc<Dimensions>`) between the
/// kinematic model and whatever renders the pose. The backend is expected to use the
/// same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub base: Cylinder,
    pub column: BoxSize,
    pub upper_arm: BoxSize,
    /// Vertical drop between the upper arm and the wrist pivot.
    pub upper_spacer: BoxSize,
    pub lower_arm: BoxSize,
    /// Vertical drop between the lower arm and the gripper pivot.
    pub lower_spacer: BoxSize,
    pub gripper: BoxSize,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            base: Cylinder {
                radius: 0.5,
                height: 0.4,
            },
            column: BoxSize::new(0.3, 2.0, 0.3),
            upper_arm: BoxSize::new(1.0, 0.5, 0.2),
            upper_spacer: BoxSize::new(0.1, 0.5, 0.1),
            lower_arm: BoxSize::new(1.0, 0.15, 0.15),
            lower_spacer: BoxSize::new(0.05, 0.15, 0.05),
            gripper: BoxSize::new(0.2, 0.1, 0.1),
        }
    }
}

impl Dimensions {
    /// Upper bound of the lift joint: the arm carriage can travel the whole column.
    pub fn lift_max(&self) -> f64 {
        self.column.height
    }

    pub fn validate(&self) -> Result<()> {
        let boxes = [
            ("column", &self.column),
            ("upper_arm", &self.upper_arm),
            ("upper_spacer", &self.upper_spacer),
            ("lower_arm", &self.lower_arm),
            ("lower_spacer", &self.lower_spacer),
            ("gripper", &self.gripper),
        ];

        for (name, size) in boxes {
            let axes = [
                ("width", size.width),
                ("height", size.height),
                ("depth", size.depth),
            ];
            for (axis, value) in axes {
                if !value.is_finite() || value <= 0.0 {
                    return Err(eyre::eyre!(
                        "Dimension {}.{} must be a positive number, got {}",
                        name,
                        axis,
                        value
                    ));
                }
            }
        }

        if !(self.base.radius.is_finite() && self.base.radius > 0.0)
            || !(self.base.height.is_finite() && self.base.height > 0.0)
        {
            return Err(eyre::eyre!(
                "Base cylinder must have positive radius and height, got {:?}",
                self.base
            ));
        }

        Ok(())
    }
}
