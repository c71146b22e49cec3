//! Ephemeral sample store
//!
//! Used when the database file cannot be opened. Contents are lost on exit.

use aiso_common::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{newest_first, now, search_rank, SampleStore, StorageKind};
use crate::models::{NewSample, Sample, SampleUpdate, TagAssignment};

/// In-memory [`SampleStore`] keyed by id
#[derive(Default)]
pub struct MemorySampleStore {
    samples: RwLock<HashMap<Uuid, Sample>>,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect_sorted<F>(&self, keep: F) -> Vec<Sample>
    where
        F: Fn(&Sample) -> bool,
    {
        let samples = self.samples.read().await;
        let mut matching: Vec<Sample> = samples.values().filter(|s| keep(s)).cloned().collect();
        matching.sort_by(newest_first);
        matching
    }
}

#[async_trait]
impl SampleStore for MemorySampleStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Ephemeral
    }

    async fn save_sample(&self, sample: NewSample) -> Result<Sample> {
        let mut samples = self.samples.write().await;
        let now = now();

        let existing = samples.values().find(|s| s.path == sample.path).cloned();
        let saved = match existing {
            Some(existing) => sample.replace(&existing, now),
            None => sample.into_sample(Uuid::new_v4(), now),
        };

        samples.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn get_sample(&self, id: Uuid) -> Result<Option<Sample>> {
        Ok(self.samples.read().await.get(&id).cloned())
    }

    async fn list_samples(&self) -> Result<Vec<Sample>> {
        Ok(self.collect_sorted(|_| true).await)
    }

    async fn update_sample(&self, id: Uuid, update: SampleUpdate) -> Result<Sample> {
        let mut samples = self.samples.write().await;
        let sample = samples
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Sample {}", id)))?;

        update.apply_to(sample);
        sample.updated_at = now();
        Ok(sample.clone())
    }

    async fn add_tag(&self, id: Uuid, tag: &str) -> Result<TagAssignment> {
        let mut samples = self.samples.write().await;
        let sample = samples
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Sample {}", id)))?;

        let added = !sample.tags.iter().any(|t| t == tag);
        if added {
            sample.tags.push(tag.to_string());
            sample.updated_at = now();
        }
        Ok(TagAssignment {
            sample: sample.clone(),
            added,
        })
    }

    async fn delete_sample(&self, id: Uuid) -> Result<bool> {
        Ok(self.samples.write().await.remove(&id).is_some())
    }

    async fn search_samples(&self, query: &str) -> Result<Vec<Sample>> {
        let needle = query.to_ascii_lowercase();
        let samples = self.samples.read().await;

        let mut ranked: Vec<(u8, Sample)> = samples
            .values()
            .filter_map(|s| search_rank(s, &needle).map(|rank| (rank, s.clone())))
            .collect();
        ranked.sort_by(|(rank_a, a), (rank_b, b)| rank_a.cmp(rank_b).then_with(|| newest_first(a, b)));

        Ok(ranked.into_iter().map(|(_, sample)| sample).collect())
    }

    async fn samples_by_category(&self, category: &str) -> Result<Vec<Sample>> {
        Ok(self
            .collect_sorted(|s| s.category.as_deref() == Some(category))
            .await)
    }

    async fn samples_by_tag(&self, tag: &str) -> Result<Vec<Sample>> {
        Ok(self.collect_sorted(|s| s.tags.iter().any(|t| t == tag)).await)
    }

    async fn record_play(&self, id: Uuid) -> Result<Sample> {
        let mut samples = self.samples.write().await;
        let sample = samples
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Sample {}", id)))?;

        sample.play_count = sample.play_count.saturating_add(1);
        sample.last_played = Some(now());
        Ok(sample.clone())
    }
}
