//! Sample analysis services
//!
//! - `metadata_extractor`: container properties via lofty
//! - `heuristic_estimator`: filename-derived tempo/key guesses
//! - `providers`: hosted completion clients and the classify calls built on them
//! - `result_combiner`: merge provider answers, filename fallback
//! - `ai_service`: the per-file and batch pipeline

pub mod ai_service;
pub mod heuristic_estimator;
pub mod metadata_extractor;
pub mod providers;
pub mod result_combiner;

pub use ai_service::{basic_text_search, AiService, AiStatus, BatchPermit, PipelineError};
pub use heuristic_estimator::{BpmRange, HeuristicEstimate, HeuristicEstimator};
pub use metadata_extractor::{AudioMetadata, BasicFileInfo, MetadataError, MetadataExtractor};
pub use providers::{CompletionBackend, CompletionRequest, ProviderError, ProviderSet};
