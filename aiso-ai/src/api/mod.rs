//! HTTP API handlers
//!
//! REST routes for samples, tags, AI configuration and batches, plus the SSE
//! stream carrying batch progress and sample change notifications.

pub mod ai;
pub mod batch;
pub mod health;
pub mod samples;
pub mod setup;
pub mod sse;
pub mod tags;

pub use ai::ai_routes;
pub use batch::batch_routes;
pub use health::health_routes;
pub use samples::sample_routes;
pub use setup::setup_routes;
pub use sse::event_stream;
pub use tags::tag_routes;
