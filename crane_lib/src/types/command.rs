use crate::error::ValidationError;
use crate::types::{CartesianPosition, Dimensions, JointState, Orientation};

/// What the operator asked the crane to reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Joints(JointState),
    Position(CartesianPosition),
}

/// A motion request, always paired with the base orientation in effect when it was issued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub target: Target,
    pub orientation: Orientation,
}

impl Command {
    pub fn joints(state: JointState, orientation: Orientation) -> Self {
        Self {
            target: Target::Joints(state),
            orientation,
        }
    }

    pub fn position(position: CartesianPosition, orientation: Orientation) -> Self {
        Self {
            target: Target::Position(position),
            orientation,
        }
    }

    /// Range and finiteness check against the crane's structure.
    pub fn validate(&self, dimensions: &Dimensions) -> Result<(), ValidationError> {
        match &self.target {
            Target::Joints(state) => state.validate(dimensions)?,
            Target::Position(position) => position.validate()?,
        }
        self.orientation.validate()
    }

    /// Checks that only guarantee the command can be represented as JSON.
    pub fn ensure_finite(&self) -> Result<(), ValidationError> {
        match &self.target {
            Target::Joints(state) => state.ensure_finite()?,
            Target::Position(position) => position.validate()?,
        }
        self.orientation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_joint_target() {
        let dims = Dimensions::default();
        let ok = Command::joints(JointState::default(), Orientation::default());
        assert!(ok.validate(&dims).is_ok());

        let bad = Command::joints(
            JointState::new(200.0, 1.0, 0.0, 0.0, 0.0),
            Orientation::default(),
        );
        assert!(bad.validate(&dims).is_err());
        // Out of range but finite is still encodable
        assert!(bad.ensure_finite().is_ok());
    }

    #[test]
    fn test_validate_position_target() {
        let dims = Dimensions::default();
        let far = Command::position(
            CartesianPosition::new(100.0, -50.0, 7.0),
            Orientation::default(),
        );
        assert!(far.validate(&dims).is_ok());

        let nan = Command::position(
            CartesianPosition::new(f64::NAN, 0.0, 0.0),
            Orientation::default(),
        );
        assert!(nan.validate(&dims).is_err());
        assert!(nan.ensure_finite().is_err());
    }

    #[test]
    fn test_orientation_checked() {
        let dims = Dimensions::default();
        let cmd = Command::joints(
            JointState::default(),
            Orientation::new(0.0, f64::NEG_INFINITY, 0.0, 0.0),
        );
        assert_eq!(
            cmd.validate(&dims),
            Err(ValidationError::NonFinite {
                field: "orientation.y"
            })
        );
    }
}
