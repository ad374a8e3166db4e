use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{ConnectionManager, Delivery};
use crate::error::{DecodeError, EncodeError};
use crate::protocol::{decode_response, Response};
use crate::types::{
    CartesianPosition, Command, Dimensions, JointState, Orientation, Status, Target,
};
use crate::utils::{compute_pose, ChainTransforms};

pub const DEFAULT_BACKEND_ERROR: &str = "backend reported an error";

/// Everything the client knows about the crane. Only the reconciler mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientState {
    pub current_joint_state: JointState,
    /// End-effector position as last reported by the backend
    pub reported_position: Option<CartesianPosition>,
    pub status: Status,
    pub last_error: Option<String>,
    pub last_sent_command: Option<Command>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            current_joint_state: JointState::default(),
            reported_position: None,
            status: Status::Stopped,
            last_error: None,
            last_sent_command: None,
        }
    }
}

/// Merges backend messages into `ClientState` and gates outgoing commands.
///
/// The backend is authoritative: the latest message always replaces what we hold, with
/// no prediction and no attempt to match replies to commands.
pub struct StateReconciler {
    state: ClientState,
    dimensions: Arc<Dimensions>,
    orientation: Orientation,
}

impl StateReconciler {
    pub fn new(dimensions: Arc<Dimensions>) -> Self {
        Self {
            state: ClientState::default(),
            dimensions,
            orientation: Orientation::default(),
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn dimensions(&self) -> &Arc<Dimensions> {
        &self.dimensions
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Change the base placement used for rendering and for the next command.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Decode and apply one inbound frame. Decode failures leave the state untouched.
    pub fn on_message(&mut self, raw: &str) -> Result<Status, DecodeError> {
        match decode_response(raw) {
            Ok(response) => Ok(self.apply(response)),
            Err(e) => {
                warn!("Dropping malformed backend message: {}", e);
                Err(e)
            }
        }
    }

    pub fn apply(&mut self, response: Response) -> Status {
        self.state.status = response.status;

        if response.status == Status::Error {
            let message = response
                .error_message
                .unwrap_or_else(|| DEFAULT_BACKEND_ERROR.to_string());
            warn!("Backend error: {}", message);
            self.state.last_error = Some(message);
            return response.status;
        }

        if let Some(joints) = response.crane_state {
            self.state.current_joint_state = joints;
        }
        if let Some(position) = response.xyz_position {
            self.state.reported_position = Some(position);
        }
        self.state.last_error = None;

        debug!(
            "Applied {} state: {:?}",
            response.status, self.state.current_joint_state
        );
        response.status
    }

    /// Validate, record and forward an operator command.
    ///
    /// A command that fails validation is neither recorded nor sent. A command that passes
    /// is recorded as the last sent one even when the link drops it.
    pub fn on_submit(
        &mut self,
        command: Command,
        connection: &mut ConnectionManager,
    ) -> Result<Delivery, EncodeError> {
        command.validate(&self.dimensions)?;

        self.state.last_sent_command = Some(command);
        self.orientation = command.orientation;

        let delivery = connection.send(&command)?;
        debug!("Submitted {:?}: {:?}", command.target, delivery);
        Ok(delivery)
    }

    /// Transforms of the crane as currently known.
    pub fn pose(&self) -> ChainTransforms {
        compute_pose(
            &self.state.current_joint_state,
            &self.orientation,
            &self.dimensions,
        )
    }

    /// The cartesian target in flight, if the last command was one.
    pub fn target_position(&self) -> Option<CartesianPosition> {
        match self.state.last_sent_command?.target {
            Target::Position(position) => Some(position),
            Target::Joints(_) => None,
        }
    }

    /// Back to session-start state. Used when the operator ends a session.
    pub fn reset(&mut self) {
        self.state = ClientState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::connection::test_support::RecordingTransport;
    use crate::error::ValidationError;
    use crate::protocol::decode_command;

    fn reconciler() -> StateReconciler {
        StateReconciler::new(Arc::new(Dimensions::default()))
    }

    const MOVING: &str = r#"{"status":"moving","craneState":{"swing":10,"lift":1,"elbow":0,"wrist":0,"gripper":0},"xyzPosition":{"x":1.9,"y":0.75,"z":-0.3}}"#;
    const STOPPED: &str = r#"{"status":"stopped","craneState":{"swing":20,"lift":1,"elbow":0,"wrist":0,"gripper":0}}"#;

    #[test]
    fn test_session_start_state() {
        let r = reconciler();
        assert_eq!(r.state().current_joint_state, JointState::default());
        assert_eq!(r.state().status, Status::Stopped);
        assert!(r.state().last_error.is_none());
        assert!(r.state().last_sent_command.is_none());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut r = reconciler();
        r.on_message(MOVING).unwrap();
        let once = r.state().clone();
        r.on_message(MOVING).unwrap();
        assert_eq!(r.state(), &once);
    }

    #[test]
    fn test_latest_message_wins() {
        let mut r = reconciler();
        assert_eq!(r.on_message(MOVING).unwrap(), Status::Moving);
        assert_eq!(r.on_message(STOPPED).unwrap(), Status::Stopped);

        assert_eq!(r.state().current_joint_state.swing, 20.0);
        assert_eq!(r.state().status, Status::Stopped);
        // Not carried in the second message, so the first report stays
        assert_eq!(
            r.state().reported_position,
            Some(CartesianPosition::new(1.9, 0.75, -0.3))
        );
    }

    #[test]
    fn test_reverse_order_last_message_wins() {
        let mut r = reconciler();
        assert_eq!(r.on_message(STOPPED).unwrap(), Status::Stopped);
        assert_eq!(r.on_message(MOVING).unwrap(), Status::Moving);

        assert_eq!(r.state().current_joint_state.swing, 10.0);
        assert_eq!(r.state().status, Status::Moving);
    }

    #[test]
    fn test_error_ignores_carried_state() {
        let mut r = reconciler();
        r.on_message(MOVING).unwrap();

        let raw = r#"{"status":"error","errorMessage":"x","craneState":{"swing":99,"lift":1,"elbow":0,"wrist":0,"gripper":0}}"#;
        assert_eq!(r.on_message(raw).unwrap(), Status::Error);
        assert_eq!(r.state().current_joint_state.swing, 10.0);
        assert_eq!(r.state().last_error.as_deref(), Some("x"));
    }

    #[test]
    fn test_error_keeps_joints_until_next_status() {
        let mut r = reconciler();
        r.on_message(MOVING).unwrap();

        let status = r
            .on_message(r#"{"status":"error","errorMessage":"limit exceeded"}"#)
            .unwrap();
        assert_eq!(status, Status::Error);
        assert_eq!(r.state().status, Status::Error);
        assert_eq!(r.state().last_error.as_deref(), Some("limit exceeded"));
        assert_eq!(r.state().current_joint_state.swing, 10.0);

        r.on_message(STOPPED).unwrap();
        assert!(r.state().last_error.is_none());
        assert_eq!(r.state().current_joint_state.swing, 20.0);
    }

    #[test]
    fn test_error_without_message() {
        let mut r = reconciler();
        r.on_message(r#"{"status":"error"}"#).unwrap();
        assert_eq!(r.state().last_error.as_deref(), Some(DEFAULT_BACKEND_ERROR));
    }

    #[test]
    fn test_malformed_message_leaves_state() {
        let mut r = reconciler();
        r.on_message(MOVING).unwrap();
        let before = r.state().clone();

        let result = r.on_message(r#"{"status":"moving","craneState":{"swing":"NaN"}}"#);
        assert!(result.is_err());
        assert!(r.on_message("garbage").is_err());
        assert!(r.on_message(r#"{"status":"paused"}"#).is_err());
        assert_eq!(r.state(), &before);
    }

    #[test]
    fn test_submit_while_closed_records_intent() {
        let mut r = reconciler();
        let (mut connection, _events) = ConnectionManager::new();
        let command = Command::joints(
            JointState::new(45.0, 1.5, 0.0, 0.0, 0.5),
            Orientation::new(0.0, 0.0, 0.0, 30.0),
        );

        let delivery = r.on_submit(command, &mut connection).unwrap();
        assert_eq!(delivery, Delivery::Dropped);
        assert_eq!(r.state().last_sent_command, Some(command));
        assert_eq!(r.orientation().rotation_z, 30.0);
    }

    #[test]
    fn test_submit_sends_encoded_command() {
        let mut r = reconciler();
        let (mut connection, _events) = ConnectionManager::new();
        let recorder = RecordingTransport::default();
        connection.attach(Box::new(recorder.clone()));

        let command = Command::position(
            CartesianPosition::new(1.0, 1.0, 1.0),
            Orientation::default(),
        );
        assert_eq!(r.on_submit(command, &mut connection).unwrap(), Delivery::Sent);

        let frames = recorder.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(decode_command(&frames[0]).unwrap(), command);
        assert_eq!(r.target_position(), Some(CartesianPosition::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_invalid_submit_records_nothing() {
        let mut r = reconciler();
        let (mut connection, _events) = ConnectionManager::new();
        let recorder = RecordingTransport::default();
        connection.attach(Box::new(recorder.clone()));

        let command = Command::joints(
            JointState::new(0.0, 5.0, 0.0, 0.0, 0.0),
            Orientation::default(),
        );
        let result = r.on_submit(command, &mut connection);
        assert!(matches!(
            result,
            Err(EncodeError::Validation(ValidationError::OutOfRange { field: "lift", .. }))
        ));
        assert!(r.state().last_sent_command.is_none());
        assert!(recorder.frames().is_empty());
    }

    #[test]
    fn test_pose_follows_reported_state() {
        let mut r = reconciler();
        let start = r.pose();
        assert!((start.end_effector.x - 2.0).abs() < 1e-9);

        let swung = r#"{"status":"stopped","craneState":{"swing":90,"lift":1,"elbow":0,"wrist":0,"gripper":0}}"#;
        r.on_message(swung).unwrap();
        let pose = r.pose();
        assert!((pose.end_effector.z + 2.0).abs() < 1e-9);
        assert!(pose.end_effector.x.abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut r = reconciler();
        r.on_message(MOVING).unwrap();
        r.reset();
        assert_eq!(r.state(), &ClientState::default());
    }
}
