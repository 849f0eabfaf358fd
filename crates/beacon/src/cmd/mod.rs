//! Command implementations for the Beacon CLI

pub mod flush;
pub mod send;
pub mod status;
