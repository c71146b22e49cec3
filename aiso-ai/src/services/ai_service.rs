//! Sample processing pipeline
//!
//! extract → estimate → analyze (each configured provider) → combine → persist
//!
//! `AiService` is constructed explicitly and shared through `AppState`; the
//! provider set can be replaced at runtime by `initialize`.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::heuristic_estimator::HeuristicEstimator;
use super::metadata_extractor::{MetadataError, MetadataExtractor};
use super::providers::{
    classify, AnthropicClient, OpenAiClient, ProviderError, ProviderSet, SampleDescriptor,
};
use super::result_combiner;
use crate::config::{ProviderCredentials, ServiceSettings};
use crate::db::{SampleStore, StorageKind};
use crate::models::{
    BatchItem, BatchOptions, BatchProgress, BatchReport, FailedFile, NewSample,
    ProviderKind, Sample, SampleUpdate,
};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No AI provider is configured")]
    AiUnavailable,

    #[error("A batch is already running")]
    BatchInProgress,

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("Storage error: {0}")]
    Store(#[from] aiso_common::Error),

    #[error("Sample not found: {0}")]
    NotFound(Uuid),

    #[error("AI provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Provider and pipeline availability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiStatus {
    pub openai: bool,
    pub anthropic: bool,
    /// Container metadata extraction is always available
    pub audio_analysis: bool,
    /// A batch is running
    pub processing: bool,
    pub storage: StorageKind,
}

/// Exclusive right to run one batch; released on drop
#[derive(Debug)]
pub struct BatchPermit {
    batch_id: Uuid,
    running: Arc<AtomicBool>,
}

impl BatchPermit {
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }
}

impl Drop for BatchPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Sample processing service
pub struct AiService {
    extractor: MetadataExtractor,
    estimator: HeuristicEstimator,
    settings: ServiceSettings,
    providers: RwLock<ProviderSet>,
    store: Arc<dyn SampleStore>,
    batch_running: Arc<AtomicBool>,
}

impl AiService {
    /// Create a service with no providers configured
    pub fn new(store: Arc<dyn SampleStore>, settings: ServiceSettings) -> Self {
        Self {
            extractor: MetadataExtractor::new(settings.max_file_size_bytes),
            estimator: HeuristicEstimator::default(),
            settings,
            providers: RwLock::new(ProviderSet::empty()),
            store,
            batch_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_providers(self, providers: ProviderSet) -> Self {
        self.set_providers(providers);
        self
    }

    pub fn store(&self) -> &Arc<dyn SampleStore> {
        &self.store
    }

    pub fn providers(&self) -> ProviderSet {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_providers(&self, providers: ProviderSet) {
        *self.providers.write().unwrap_or_else(PoisonError::into_inner) = providers;
    }

    /// Rebuild the provider set from API keys; blank keys leave a provider unconfigured
    pub fn initialize(&self, credentials: &ProviderCredentials) -> AiStatus {
        let mut providers = ProviderSet::empty();

        if let Some(key) = credentials.key_for(ProviderKind::Anthropic) {
            match AnthropicClient::new(self.settings.client_settings(ProviderKind::Anthropic, key)) {
                Ok(client) => providers = providers.with(Arc::new(client)),
                Err(e) => tracing::warn!(error = %e, "Anthropic client not created"),
            }
        }
        if let Some(key) = credentials.key_for(ProviderKind::OpenAi) {
            match OpenAiClient::new(self.settings.client_settings(ProviderKind::OpenAi, key)) {
                Ok(client) => providers = providers.with(Arc::new(client)),
                Err(e) => tracing::warn!(error = %e, "OpenAI client not created"),
            }
        }

        tracing::info!(
            openai = providers.has(ProviderKind::OpenAi),
            anthropic = providers.has(ProviderKind::Anthropic),
            "AI providers initialized"
        );

        self.set_providers(providers);
        self.status()
    }

    pub fn status(&self) -> AiStatus {
        let providers = self.providers();
        AiStatus {
            openai: providers.has(ProviderKind::OpenAi),
            anthropic: providers.has(ProviderKind::Anthropic),
            audio_analysis: true,
            processing: self.batch_running.load(Ordering::SeqCst),
            storage: self.store.kind(),
        }
    }

    /// Analyze one file and persist the result (create or replace by path)
    pub async fn process_audio_file(&self, path: &Path) -> Result<Sample, PipelineError> {
        let extractor = self.extractor.clone();
        let owned_path = path.to_path_buf();
        let metadata = tokio::task::spawn_blocking(move || extractor.extract(&owned_path))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;

        let estimate = self.estimator.estimate(&metadata);
        let descriptor = SampleDescriptor::new(&metadata, &estimate);

        let mut outcomes = Vec::new();
        for backend in self.providers().analysis_order() {
            outcomes.push(classify::analyze(backend.as_ref(), &descriptor).await);
        }

        let bpm = estimate.bpm.map(f64::from);
        let combined = result_combiner::combine(outcomes.clone(), &metadata.name, bpm);

        let analysis = serde_json::json!({
            "heuristics": estimate,
            "providers": outcomes,
            "sources": combined.sources,
            "use_case": combined.use_case,
            "codec": metadata.codec,
            "container": metadata.container,
            "bit_depth": metadata.bit_depth,
            "processed_at": chrono::Utc::now(),
        });

        let sample = self
            .store
            .save_sample(NewSample {
                name: metadata.name.clone(),
                path: metadata.file_path.clone(),
                size: Some(metadata.file_size_bytes),
                duration: metadata.duration_seconds,
                bitrate: metadata.bitrate_kbps,
                sample_rate: metadata.sample_rate,
                channels: metadata.channels,
                category: Some(combined.category),
                subcategory: combined.subcategory,
                mood: Some(combined.mood),
                energy: Some(combined.energy),
                style: Some(combined.style),
                bpm,
                confidence: Some(combined.confidence),
                key: estimate.key,
                description: None,
                tags: combined.tags,
                characteristics: combined.characteristics,
                analysis,
            })
            .await?;

        tracing::info!(
            id = %sample.id,
            file = %sample.name,
            category = ?sample.category,
            confidence = ?sample.confidence,
            "Sample processed"
        );
        Ok(sample)
    }

    /// Import selected files
    ///
    /// A file whose container cannot be parsed is still stored as a minimal
    /// `{path, name, size}` record. Unsupported extensions and missing files
    /// are reported as failures.
    pub async fn import_files(&self, paths: &[PathBuf]) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            items.push(self.import_one(path).await);
        }
        items
    }

    async fn import_one(&self, path: &Path) -> BatchItem {
        let error = match self.process_audio_file(path).await {
            Ok(sample) => return BatchItem::Processed(Box::new(sample)),
            Err(PipelineError::Metadata(e @ MetadataError::UnsupportedFormat(_))) => {
                return failed(path, e.to_string());
            }
            Err(PipelineError::Metadata(e)) => e,
            Err(e) => return failed(path, e.to_string()),
        };

        tracing::warn!(file = %path.display(), error = %error, "Metadata extraction failed, storing minimal record");

        let info = match self.extractor.basic_info(path) {
            Ok(info) => info,
            Err(e) => return failed(path, e.to_string()),
        };
        match self
            .store
            .save_sample(NewSample::minimal(info.path, info.name, Some(info.size)))
            .await
        {
            Ok(sample) => BatchItem::Processed(Box::new(sample)),
            Err(e) => failed(path, e.to_string()),
        }
    }

    /// Reserve the single batch slot
    ///
    /// Fails with `AiUnavailable` when `require_ai` is set and no provider is
    /// configured, and with `BatchInProgress` when another batch holds the slot.
    pub fn begin_batch(&self, options: BatchOptions) -> Result<BatchPermit, PipelineError> {
        if options.require_ai && self.providers().is_empty() {
            return Err(PipelineError::AiUnavailable);
        }
        if self.batch_running.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::BatchInProgress);
        }
        Ok(BatchPermit {
            batch_id: Uuid::new_v4(),
            running: Arc::clone(&self.batch_running),
        })
    }

    /// Process files strictly in order, reporting after every file
    ///
    /// Cancellation is checked before each file; a cancelled batch returns the
    /// items handled so far.
    pub async fn process_batch<F>(
        &self,
        permit: BatchPermit,
        paths: &[PathBuf],
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> BatchReport
    where
        F: FnMut(BatchProgress) + Send,
    {
        let total = paths.len();
        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;

        tracing::info!(batch_id = %permit.batch_id, total, "Batch started");

        for (index, path) in paths.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                tracing::info!(batch_id = %permit.batch_id, processed = index, total, "Batch cancelled");
                break;
            }

            let item = match self.process_audio_file(path).await {
                Ok(sample) => BatchItem::Processed(Box::new(sample)),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Batch file failed");
                    failed(path, e.to_string())
                }
            };

            on_progress(BatchProgress::new(
                index + 1,
                total,
                path.to_string_lossy().into_owned(),
                item.clone(),
            ));
            results.push(item);
        }

        let report = BatchReport {
            batch_id: permit.batch_id,
            total,
            results,
            cancelled,
        };
        tracing::info!(
            batch_id = %report.batch_id,
            processed = report.results.len(),
            failed = report.failed_count(),
            cancelled,
            "Batch finished"
        );
        report
    }

    /// `begin_batch` followed by `process_batch`
    pub async fn run_batch<F>(
        &self,
        paths: &[PathBuf],
        options: BatchOptions,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<BatchReport, PipelineError>
    where
        F: FnMut(BatchProgress) + Send,
    {
        let permit = self.begin_batch(options)?;
        Ok(self.process_batch(permit, paths, cancel, on_progress).await)
    }

    /// Semantic search with provider fallback to plain text matching
    ///
    /// Providers are asked OpenAI first, then Anthropic; the first non-empty
    /// answer wins.
    pub async fn search_samples(&self, query: &str, samples: Vec<Sample>) -> Vec<Sample> {
        if query.trim().is_empty() {
            return samples;
        }

        for backend in self.providers().search_order() {
            let matches = classify::search(backend.as_ref(), query, &samples).await;
            if !matches.is_empty() {
                tracing::debug!(provider = %backend.kind(), matches = matches.len(), "AI search answered");
                return matches.into_iter().map(|i| samples[i].clone()).collect();
            }
        }

        basic_text_search(query, samples)
    }

    /// Generate and store a description with the primary provider
    ///
    /// A provider failure leaves the stored description untouched.
    pub async fn describe_sample(&self, id: Uuid) -> Result<Sample, PipelineError> {
        let sample = self
            .store
            .get_sample(id)
            .await?
            .ok_or(PipelineError::NotFound(id))?;

        let backend = self
            .providers()
            .analysis_order()
            .into_iter()
            .next()
            .ok_or(PipelineError::AiUnavailable)?;

        let description = classify::describe(backend.as_ref(), &sample).await?;
        let updated = self
            .store
            .update_sample(
                id,
                SampleUpdate {
                    description: Some(description),
                    ..Default::default()
                },
            )
            .await?;
        Ok(updated)
    }
}

fn failed(path: &Path, error: String) -> BatchItem {
    BatchItem::Failed(FailedFile::new(path.to_string_lossy().into_owned(), error))
}

/// Any-term substring match over name, category, tags, mood and style
///
/// Results are ordered by how many terms hit name or category; the sort is
/// stable so equal scores keep input order.
pub fn basic_text_search(query: &str, samples: Vec<Sample>) -> Vec<Sample> {
    let query = query.to_lowercase();
    let terms: Vec<&str> = query.split_whitespace().collect();
    if terms.is_empty() {
        return samples;
    }

    let mut scored: Vec<(usize, Sample)> = samples
        .into_iter()
        .filter_map(|sample| {
            let haystack = format!(
                "{} {} {} {} {}",
                sample.name,
                sample.category.as_deref().unwrap_or(""),
                sample.tags.join(" "),
                sample.mood.as_deref().unwrap_or(""),
                sample.style.as_deref().unwrap_or(""),
            )
            .to_lowercase();
            if !terms.iter().any(|term| haystack.contains(term)) {
                return None;
            }

            let head = format!("{} {}", sample.name, sample.category.as_deref().unwrap_or(""))
                .to_lowercase();
            let score = terms.iter().filter(|term| head.contains(*term)).count();
            Some((score, sample))
        })
        .collect();

    scored.sort_by(|(a, _), (b, _)| b.cmp(a));
    scored.into_iter().map(|(_, sample)| sample).collect()
}
