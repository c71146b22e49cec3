//! Data models for the sample organizer service
//!
//! - Sample records, tags and categories
//! - Provider replies and combined analysis
//! - Batch results and progress reports

pub mod analysis;
pub mod batch;
pub mod sample;

pub use analysis::{
    AiAnalysis, AnalysisSource, Categorization, FailureKind, ProviderAnalysis, ProviderKind,
    ProviderOutcome, TagSuggestion,
};
pub use batch::{file_name_of, BatchItem, BatchOptions, BatchProgress, BatchReport, FailedFile};
pub use sample::{
    dedup_labels, Category, CustomTag, NewSample, Sample, SampleUpdate, Tag, TagAssignment, TagKind,
};
