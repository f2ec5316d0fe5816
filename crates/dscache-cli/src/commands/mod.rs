//! CLI command implementations.

pub mod sample;
pub mod status;
pub mod sync;
