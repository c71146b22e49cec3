//! Tags and categories derived from stored samples, plus user-created tags
//!
//! Custom tags live in `custom-tags.json` next to the database, not in the
//! sample store.

use aiso_common::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use super::SampleStore;
use crate::config::CATEGORIES;
use crate::models::{Category, CustomTag, Tag, TagAssignment, TagKind};

/// Colour for categories outside the vocabulary and for plain system tags
pub const DEFAULT_COLOR: &str = "#6b7280";

const CATEGORY_COLORS: &[(&str, &str)] = &[
    ("kick", "#ef4444"),
    ("snare", "#f97316"),
    ("hihat", "#eab308"),
    ("cymbal", "#facc15"),
    ("percussion", "#f59e0b"),
    ("bass", "#8b5cf6"),
    ("lead", "#06b6d4"),
    ("pad", "#3b82f6"),
    ("chord", "#6366f1"),
    ("arp", "#14b8a6"),
    ("vocal", "#ec4899"),
    ("fx", "#22c55e"),
    ("loop", "#10b981"),
    ("one-shot", "#f43f5e"),
    ("melody", "#0ea5e9"),
];

pub fn category_color(category: &str) -> &'static str {
    CATEGORY_COLORS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}

/// Add `tag` to a sample unless it is already present (drag-and-drop tagging)
pub async fn assign_tag(store: &dyn SampleStore, id: Uuid, tag: &str) -> Result<TagAssignment> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(Error::InvalidInput("Tag name must not be empty".to_string()));
    }

    let assignment = store.add_tag(id, tag).await?;
    if !assignment.added {
        tracing::info!(sample_id = %id, tag, "Tag already assigned");
    }
    Ok(assignment)
}

/// Vocabulary categories in fixed order, then ad hoc categories by name
pub async fn list_categories(store: &dyn SampleStore) -> Result<Vec<Category>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for sample in store.list_samples().await? {
        if let Some(category) = sample.category.filter(|c| !c.is_empty()) {
            *counts.entry(category).or_default() += 1;
        }
    }

    let mut categories: Vec<Category> = CATEGORIES
        .iter()
        .map(|name| Category {
            name: name.to_string(),
            color: category_color(name).to_string(),
            sample_count: counts.remove(*name).unwrap_or(0),
        })
        .collect();

    categories.extend(counts.into_iter().map(|(name, sample_count)| Category {
        name,
        color: DEFAULT_COLOR.to_string(),
        sample_count,
    }));

    Ok(categories)
}

/// Tags on stored samples merged with custom tags
///
/// A custom tag with the same name (case-insensitive) as a system tag keeps
/// the custom colour and kind. Sorted by usage, then name.
pub async fn list_tags(store: &dyn SampleStore, custom: &[CustomTag]) -> Result<Vec<Tag>> {
    let mut usage: BTreeMap<String, usize> = BTreeMap::new();
    for sample in store.list_samples().await? {
        for tag in sample.tags {
            *usage.entry(tag).or_default() += 1;
        }
    }

    let mut tags: Vec<Tag> = custom
        .iter()
        .map(|custom_tag| {
            let usage_count = usage
                .iter()
                .filter(|(name, _)| name.eq_ignore_ascii_case(&custom_tag.name))
                .map(|(_, count)| *count)
                .sum();
            Tag {
                name: custom_tag.name.clone(),
                color: custom_tag.color.clone(),
                usage_count,
                kind: TagKind::Custom,
            }
        })
        .collect();

    for (name, usage_count) in usage {
        if custom.iter().any(|c| c.name.eq_ignore_ascii_case(&name)) {
            continue;
        }
        tags.push(Tag {
            color: category_color(&name).to_string(),
            name,
            usage_count,
            kind: TagKind::System,
        });
    }

    tags.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.name.cmp(&b.name)));
    Ok(tags)
}

/// JSON file of user-created tags
///
/// Clones share one write lock, so concurrent creates never drop each
/// other's entries.
#[derive(Debug, Clone)]
pub struct CustomTagFile {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CustomTagFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored tags; a missing file holds none
    pub fn try_load(&self) -> Result<Vec<CustomTag>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Stored tags for display; an unreadable file yields none
    pub fn load(&self) -> Vec<CustomTag> {
        self.try_load().unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Error reading custom tags");
            Vec::new()
        })
    }

    /// Add a tag; the name and colour must be non-empty and the name unused
    ///
    /// An unreadable file is left as it is and the create fails.
    pub fn create(&self, name: &str, color: &str) -> Result<CustomTag> {
        let name = name.trim();
        let color = color.trim();
        if name.is_empty() || color.is_empty() {
            return Err(Error::InvalidInput(
                "Tag name and colour are required".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut tags = self.try_load().inspect_err(|e| {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Custom tags file unreadable, refusing to overwrite"
            );
        })?;
        if tags.iter().any(|t| t.name.eq_ignore_ascii_case(name)) {
            return Err(Error::InvalidInput(format!("Tag '{}' already exists", name)));
        }

        let tag = CustomTag {
            name: name.to_string(),
            color: color.to_string(),
        };
        tags.push(tag.clone());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&tags)?)?;

        tracing::info!(tag = %tag.name, "Custom tag created");
        Ok(tag)
    }
}
