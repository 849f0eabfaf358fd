//! Beacon Protocol - Core types for the analytics write path
//!
//! This crate provides the types that flow through the pipeline:
//! - `Event` - A single analytics event (track, identify, screen, ...)
//! - `EventType` - Event classification used by plugins and flush policies
//! - `Settings` - Immutable remote settings snapshot
//! - `WriteKey` - Source identifier that scopes storage and uploads
//!
//! # Wire Format
//!
//! Batches are uploaded as a single JSON document:
//!
//! ```text
//! {"batch":[<event-json>,<event-json>,...],"sentAt":"<ISO8601>","writeKey":"<string>"}
//! ```
//!
//! The header/separator/footer helpers in this crate are the only place that
//! format is spelled out, so storage media never build it by hand.

mod error;
mod event;
mod settings;
mod wire;
mod write_key;

pub use error::ProtocolError;
pub use event::{Event, EventType};
pub use settings::Settings;
pub use wire::{BATCH_HEADER, BATCH_SEPARATOR, batch_footer, iso8601_now};
pub use write_key::WriteKey;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Maximum serialized size of a single event (bytes)
pub const MAX_EVENT_SIZE: usize = 32_000;

/// Batch size (bytes) past which the open batch file is rolled over
pub const MAX_BATCH_SIZE: usize = 475_000;

/// Integration key of the first-party collector destination
pub const COLLECTOR_INTEGRATION_KEY: &str = "Segment.io";

#[cfg(test)]
mod event_test;
