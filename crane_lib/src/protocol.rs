//! JSON wire format spoken between the operator client and the motion backend.
//!
//! Commands travel client to backend as
//! `{"type": "crane_state" | "xyz_position", "target": {..}, "orientation": {..}}`.
//! Responses travel backend to client as
//! `{"status": "moving" | "stopped" | "error", "craneState"?, "xyzPosition"?, "errorMessage"?}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError};
use crate::types::{CartesianPosition, Command, JointState, Orientation, Status, Target};

pub const TYPE_CRANE_STATE: &str = "crane_state";
pub const TYPE_XYZ_POSITION: &str = "xyz_position";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireCommand {
    CraneState {
        target: JointState,
        orientation: Orientation,
    },
    XyzPosition {
        target: CartesianPosition,
        orientation: Orientation,
    },
}

impl From<&Command> for WireCommand {
    fn from(command: &Command) -> Self {
        match command.target {
            Target::Joints(target) => WireCommand::CraneState {
                target,
                orientation: command.orientation,
            },
            Target::Position(target) => WireCommand::XyzPosition {
                target,
                orientation: command.orientation,
            },
        }
    }
}

impl From<WireCommand> for Command {
    fn from(wire: WireCommand) -> Self {
        match wire {
            WireCommand::CraneState {
                target,
                orientation,
            } => Command::joints(target, orientation),
            WireCommand::XyzPosition {
                target,
                orientation,
            } => Command::position(target, orientation),
        }
    }
}

/// A backend message after shape validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crane_state: Option<JointState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xyz_position: Option<CartesianPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Response {
    pub fn state(
        status: Status,
        crane_state: JointState,
        xyz_position: CartesianPosition,
    ) -> Self {
        Self {
            status,
            crane_state: Some(crane_state),
            xyz_position: Some(xyz_position),
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            crane_state: None,
            xyz_position: None,
            error_message: Some(message.into()),
        }
    }
}

/// Serialize a command. Non-finite values are refused since JSON cannot carry them.
///
/// Range checks are the caller's job; an out-of-range but finite command encodes fine.
pub fn encode(command: &Command) -> Result<String, EncodeError> {
    command.ensure_finite()?;
    Ok(serde_json::to_string(&WireCommand::from(command))?)
}

/// Parse and shape-check a backend message.
///
/// An error status only needs `errorMessage`; everything else in such a message is ignored,
/// however malformed. Unknown fields are ignored.
pub fn decode_response(raw: &str) -> Result<Response, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(DecodeError::InvalidJson)?;
    let obj = value.as_object().ok_or(DecodeError::NotAnObject("payload"))?;

    let status_str = obj
        .get("status")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("status"))?;
    let status = Status::parse(status_str)
        .ok_or_else(|| DecodeError::UnknownStatus(status_str.to_string()))?;

    let error_message = obj
        .get("errorMessage")
        .and_then(Value::as_str)
        .map(str::to_string);

    if status == Status::Error {
        return Ok(Response {
            status,
            crane_state: None,
            xyz_position: None,
            error_message,
        });
    }

    let crane_state = match present(obj, "craneState") {
        Some(v) => {
            let [swing, lift, elbow, wrist, gripper] =
                finite_fields(v, "craneState", JointState::FIELD_NAMES)?;
            Some(JointState::new(swing, lift, elbow, wrist, gripper))
        }
        None => None,
    };

    let xyz_position = match present(obj, "xyzPosition") {
        Some(v) => {
            let [x, y, z] = finite_fields(v, "xyzPosition", ["x", "y", "z"])?;
            Some(CartesianPosition::new(x, y, z))
        }
        None => None,
    };

    Ok(Response {
        status,
        crane_state,
        xyz_position,
        error_message,
    })
}

/// Parse a command on the backend side.
pub fn decode_command(raw: &str) -> Result<Command, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(DecodeError::InvalidJson)?;
    let kind = value
        .as_object()
        .ok_or(DecodeError::NotAnObject("payload"))?
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("type"))?;

    if kind != TYPE_CRANE_STATE && kind != TYPE_XYZ_POSITION {
        return Err(DecodeError::UnknownType(kind.to_string()));
    }

    let wire: WireCommand = serde_json::from_value(value).map_err(DecodeError::Malformed)?;
    Ok(wire.into())
}

pub fn encode_response(response: &Response) -> Result<String, EncodeError> {
    if let Some(state) = &response.crane_state {
        state.ensure_finite()?;
    }
    if let Some(position) = &response.xyz_position {
        position.validate()?;
    }
    Ok(serde_json::to_string(response)?)
}

/// A field counts as absent when missing or explicitly null.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn finite_fields<const N: usize>(
    value: &Value,
    object: &'static str,
    fields: [&'static str; N],
) -> Result<[f64; N], DecodeError> {
    let obj = value.as_object().ok_or(DecodeError::NotAnObject(object))?;
    let mut out = [0.0; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = obj
            .get(field)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or(DecodeError::BadNumber { object, field })?;
    }
    Ok(out)
}
