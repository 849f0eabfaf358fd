//! Beacon - Pipeline
//!
//! The engine behind a destination: events are queued, framed into batch
//! files, and uploaded when a flush policy or an explicit flush asks for it.
//!
//! # Architecture
//!
//! ```text
//! [Timeline]                  [EventPipeline]                       [Collector]
//!   Destination ──put──→ write channel ──→ Writer ──→ BatchStore
//!   plugin                                  │ FlushPolicy
//!                                           ↓
//!                                   upload channel ──→ Uploader ──→ Transport
//! ```
//!
//! # Key Design
//!
//! - **Channel-based**: `tokio::sync::mpsc` between caller, writer and uploader
//! - **Policies**: count, interval and startup triggers behind one trait
//! - **Bounded pools**: file work on a small blocking pool, uploads serialized
//! - **Fail-soft**: storage and network errors are logged; transient upload
//!   failures keep the batch for the next cycle
//!
//! # Example
//!
//! ```ignore
//! let pipeline = EventPipeline::builder("Segment.io", storage, transport)
//!     .policies(policy::from_config(&config.pipeline))
//!     .pools(WorkerPools::from_config(&config.pipeline))
//!     .build();
//!
//! pipeline.start()?;
//! pipeline.put(event).await;
//! pipeline.flush_and_wait(Duration::from_secs(5)).await?;
//! pipeline.stop();
//! ```

mod destination;
mod error;
mod event_pipeline;
mod metrics;
pub mod policy;
mod pools;
mod transport;

pub use destination::CollectorDestination;
pub use error::{PipelineError, Result};
pub use event_pipeline::{DEFAULT_QUEUE_SIZE, EventPipeline, EventPipelineBuilder};
pub use metrics::{PipelineMetrics, PipelineMetricsSnapshot};
pub use policy::{CountPolicy, FlushPolicy, Flusher, FrequencyPolicy, StartupPolicy};
pub use pools::WorkerPools;
pub use transport::{HttpTransport, Transport, UploadOutcome};
