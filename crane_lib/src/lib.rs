//! # Crane Library
//!
//! Shared types and utilities for the crane remote-control system: the kinematic
//! chain model, the wire protocol spoken with the motion backend, and the client side
//! connection and state reconciliation.
//! This library is used by both the operator console and the simulated backend.

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use client::*;
pub use error::*;
pub use protocol::*;
pub use types::*;
pub use utils::*;
