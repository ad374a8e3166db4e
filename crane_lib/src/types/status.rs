use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution state reported by the motion backend.
///
/// This says nothing about the link itself; see `ConnectionState` for that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Moving,
    #[default]
    Stopped,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Moving => "moving",
            Status::Stopped => "stopped",
            Status::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "moving" => Some(Status::Moving),
            "stopped" => Some(Status::Stopped),
            "error" => Some(Status::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
