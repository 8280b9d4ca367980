//! Application services layer.

pub mod batch;
pub mod error;
pub mod queue;
pub mod render;
