pub mod command;
pub mod config;
pub mod dimensions;
pub mod joint_state;
pub mod position;
pub mod status;

pub use command::*;
pub use config::*;
pub use dimensions::*;
pub use joint_state::*;
pub use position::*;
pub use status::*;
