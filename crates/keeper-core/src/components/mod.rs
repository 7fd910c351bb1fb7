//! ECS components for the colony world model.

mod common;
mod structures;
mod units;

pub use common::*;
pub use structures::*;
pub use units::*;
