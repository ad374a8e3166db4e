pub mod connection;
pub mod reconciler;

pub use connection::*;
pub use reconciler::*;
