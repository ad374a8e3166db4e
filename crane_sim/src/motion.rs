use crane_lib::{
    compute_pose, CartesianPosition, Command, Dimensions, JointSpeeds, JointState, Orientation,
    Response, Status, Target, ValidationError,
};
use std::sync::Arc;
use thiserror::Error;

/// Why a command was refused. The text goes back to the client as `errorMessage`.
#[derive(Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("limit exceeded: {0}")]
    LimitExceeded(#[from] ValidationError),

    #[error("cartesian targets are not supported without inverse kinematics")]
    CartesianUnsupported,
}

/// Moves the simulated crane toward its target at bounded joint speeds.
pub struct MotionController {
    state: JointState,
    target: Option<JointState>,
    speeds: JointSpeeds,
    dimensions: Arc<Dimensions>,
    orientation: Orientation,
}

impl MotionController {
    pub fn new(state: JointState, speeds: JointSpeeds, dimensions: Arc<Dimensions>) -> Self {
        Self {
            state,
            target: None,
            speeds,
            dimensions,
            orientation: Orientation::default(),
        }
    }

    pub fn state(&self) -> JointState {
        self.state
    }

    pub fn target(&self) -> Option<JointState> {
        self.target
    }

    pub fn is_moving(&self) -> bool {
        self.target.is_some()
    }

    /// Status a newly connected client should see.
    pub fn status(&self) -> Status {
        if self.is_moving() {
            Status::Moving
        } else {
            Status::Stopped
        }
    }

    /// Accept a new target, replacing any motion in progress.
    pub fn set_target(&mut self, command: &Command) -> Result<(), Rejection> {
        match command.target {
            Target::Joints(target) => {
                target.validate(&self.dimensions)?;
                command.orientation.validate()?;
                self.orientation = command.orientation;
                self.target = Some(target);
                Ok(())
            }
            Target::Position(_) => Err(Rejection::CartesianUnsupported),
        }
    }

    /// Advance by `dt` seconds. Returns `Stopped` once every joint has reached the target.
    pub fn step(&mut self, dt: f64) -> Status {
        let Some(target) = self.target else {
            return Status::Stopped;
        };

        let current = self.state.to_array();
        let goal = target.to_array();
        let mut next = [0.0; 5];

        for (i, speed) in self.speeds.to_array().into_iter().enumerate() {
            let remaining = goal[i] - current[i];
            let max_step = speed * dt;
            next[i] = if remaining.abs() <= max_step {
                goal[i]
            } else {
                current[i] + max_step * remaining.signum()
            };
        }

        self.state = JointState::from_array(next);
        if self.state == target {
            self.target = None;
            Status::Stopped
        } else {
            Status::Moving
        }
    }

    /// End-effector world position for the current state.
    pub fn position(&self) -> CartesianPosition {
        compute_pose(&self.state, &self.orientation, &self.dimensions).end_effector
    }

    pub fn snapshot(&self, status: Status) -> Response {
        Response::state(status, self.state, self.position())
    }
}
