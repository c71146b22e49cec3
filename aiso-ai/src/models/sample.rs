//! Sample records, tags and categories
//!
//! One `Sample` exists per imported audio file; `path` is unique across records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored sample record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Stable identifier, kept across re-imports of the same path
    pub id: Uuid,
    /// File base name
    pub name: String,
    /// Absolute file path (unique)
    pub path: String,
    /// File size in bytes
    pub size: Option<u64>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Bitrate (kbps)
    pub bitrate: Option<u32>,
    /// Sample rate (Hz)
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,

    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub mood: Option<String>,
    pub energy: Option<String>,
    pub style: Option<String>,
    /// Filename-derived tempo; never measured from audio
    pub bpm: Option<f64>,
    /// Category confidence (0.0-1.0), uncalibrated
    pub confidence: Option<f64>,
    /// Musical key guess from the filename
    pub key: Option<String>,
    pub description: Option<String>,

    /// Deduplicated tag names
    pub tags: Vec<String>,
    /// Deduplicated sonic characteristic labels
    pub characteristics: Vec<String>,
    /// Free-form analysis payload (heuristic estimate, providers, timestamps)
    pub analysis: serde_json::Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_played: Option<DateTime<Utc>>,
    pub play_count: u32,
    pub favorite: bool,
}

/// Create-or-replace input for the sample store
///
/// Carries everything a (re-)import determines. Identity, creation time and
/// usage counters are owned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSample {
    pub name: String,
    pub path: String,
    pub size: Option<u64>,
    pub duration: Option<f64>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub mood: Option<String>,
    pub energy: Option<String>,
    pub style: Option<String>,
    pub bpm: Option<f64>,
    pub confidence: Option<f64>,
    pub key: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub characteristics: Vec<String>,
    #[serde(default)]
    pub analysis: serde_json::Value,
}

impl NewSample {
    /// Minimal record used when the audio container cannot be parsed
    pub fn minimal(path: String, name: String, size: Option<u64>) -> Self {
        Self {
            name,
            path,
            size,
            category: Some("unknown".to_string()),
            mood: Some("neutral".to_string()),
            ..Default::default()
        }
    }

    /// Build the stored record for a first insert
    pub fn into_sample(self, id: Uuid, now: DateTime<Utc>) -> Sample {
        Sample {
            id,
            name: self.name,
            path: self.path,
            size: self.size,
            duration: self.duration,
            bitrate: self.bitrate,
            sample_rate: self.sample_rate,
            channels: self.channels,
            category: self.category,
            subcategory: self.subcategory,
            mood: self.mood,
            energy: self.energy,
            style: self.style,
            bpm: self.bpm,
            confidence: self.confidence,
            key: self.key,
            description: self.description,
            tags: dedup_labels(self.tags),
            characteristics: dedup_labels(self.characteristics),
            analysis: normalize_analysis(self.analysis),
            created_at: now,
            updated_at: now,
            last_played: None,
            play_count: 0,
            favorite: false,
        }
    }

    /// Overwrite an existing record in place (re-import of the same path)
    ///
    /// Keeps identity, creation time, play statistics and the favorite flag.
    pub fn replace(self, existing: &Sample, now: DateTime<Utc>) -> Sample {
        let mut sample = self.into_sample(existing.id, existing.created_at);
        sample.updated_at = now;
        sample.last_played = existing.last_played;
        sample.play_count = existing.play_count;
        sample.favorite = existing.favorite;
        sample
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub mood: Option<String>,
    pub energy: Option<String>,
    pub style: Option<String>,
    pub bpm: Option<f64>,
    pub confidence: Option<f64>,
    pub key: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub characteristics: Option<Vec<String>>,
    pub analysis: Option<serde_json::Value>,
    pub favorite: Option<bool>,
}

impl SampleUpdate {
    /// Merge into `sample`; does not touch timestamps
    pub fn apply_to(self, sample: &mut Sample) {
        if let Some(name) = self.name {
            sample.name = name;
        }
        if let Some(category) = self.category {
            sample.category = Some(category);
        }
        if let Some(subcategory) = self.subcategory {
            sample.subcategory = Some(subcategory);
        }
        if let Some(mood) = self.mood {
            sample.mood = Some(mood);
        }
        if let Some(energy) = self.energy {
            sample.energy = Some(energy);
        }
        if let Some(style) = self.style {
            sample.style = Some(style);
        }
        if let Some(bpm) = self.bpm {
            sample.bpm = Some(bpm);
        }
        if let Some(confidence) = self.confidence {
            sample.confidence = Some(confidence.clamp(0.0, 1.0));
        }
        if let Some(key) = self.key {
            sample.key = Some(key);
        }
        if let Some(description) = self.description {
            sample.description = Some(description);
        }
        if let Some(tags) = self.tags {
            sample.tags = dedup_labels(tags);
        }
        if let Some(characteristics) = self.characteristics {
            sample.characteristics = dedup_labels(characteristics);
        }
        if let Some(analysis) = self.analysis {
            sample.analysis = normalize_analysis(analysis);
        }
        if let Some(favorite) = self.favorite {
            sample.favorite = favorite;
        }
    }
}

/// Trim labels, drop empties and duplicates, keep first-occurrence order
pub fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if label.is_empty() || out.iter().any(|l| l == label) {
            continue;
        }
        out.push(label.to_string());
    }
    out
}

fn normalize_analysis(analysis: serde_json::Value) -> serde_json::Value {
    if analysis.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        analysis
    }
}

// ============================================================================
// Tags and categories
// ============================================================================

/// Where a tag came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// Present on stored samples (provider, fallback or manual assignment)
    System,
    /// Created by the user in the tag manager
    Custom,
}

/// Named label with display colour and usage counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: String,
    /// Number of stored samples carrying the tag
    pub usage_count: usize,
    pub kind: TagKind,
}

/// User-created tag as persisted in the custom tag file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTag {
    pub name: String,
    pub color: String,
}

/// Named grouping with colour and sample count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub color: String,
    pub sample_count: usize,
}

/// Result of a drag-and-drop tag assignment
#[derive(Debug, Clone, Serialize)]
pub struct TagAssignment {
    pub sample: Sample,
    /// False when the sample already carried the tag
    pub added: bool,
}
