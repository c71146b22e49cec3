//! Audio metadata extraction service
//!
//! Extract container-level properties from audio files using lofty:
//! - Duration, bitrate, sample rate, channel count, bit depth
//! - Codec and container identifiers
//! - File size
//!
//! Nothing here decodes audio; all values come from headers.

use lofty::file::{FileType, TaggedFileExt};
use lofty::prelude::*;
use lofty::probe::Probe;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// File extensions accepted for import
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "m4a", "ogg"];

/// Metadata extraction errors
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Failed to probe or parse the container
    #[error("Failed to read file: {0}")]
    ReadError(String),

    /// Unsupported audio format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the configured size limit
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    /// I/O error (missing file, permissions)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Extracted audio metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    /// File path
    pub file_path: String,

    /// File base name
    pub name: String,

    /// File size in bytes
    pub file_size_bytes: u64,

    /// Duration in seconds
    pub duration_seconds: Option<f64>,

    /// Bitrate (kbps)
    pub bitrate_kbps: Option<u32>,

    /// Sample rate (Hz)
    pub sample_rate: Option<u32>,

    /// Number of channels
    pub channels: Option<u8>,

    /// Bit depth
    pub bit_depth: Option<u8>,

    /// Codec identifier (MP3, FLAC, PCM, ...)
    pub codec: String,

    /// Container identifier (MPEG, WAVE, Ogg, ...)
    pub container: String,
}

/// Path, name and size of a file whose container could not be parsed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicFileInfo {
    pub path: String,
    pub name: String,
    pub size: u64,
}

/// Metadata extractor service
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    max_file_size_bytes: u64,
}

impl MetadataExtractor {
    /// Create new metadata extractor with a size limit
    pub fn new(max_file_size_bytes: u64) -> Self {
        Self { max_file_size_bytes }
    }

    /// Extract metadata from audio file
    pub fn extract(&self, file_path: &Path) -> Result<AudioMetadata, MetadataError> {
        let file_size_bytes = std::fs::metadata(file_path)?.len();

        if !is_supported_extension(file_path) {
            return Err(MetadataError::UnsupportedFormat(
                file_path
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "no extension".to_string()),
            ));
        }

        if file_size_bytes > self.max_file_size_bytes {
            return Err(MetadataError::TooLarge {
                size: file_size_bytes,
                limit: self.max_file_size_bytes,
            });
        }

        // Probe the file to determine format
        let tagged_file = Probe::open(file_path)
            .map_err(|e| MetadataError::ReadError(e.to_string()))?
            .read()
            .map_err(|e| MetadataError::ReadError(e.to_string()))?;

        let properties = tagged_file.properties();
        let duration = properties.duration();
        let duration_seconds = if duration.is_zero() {
            None
        } else {
            Some(duration.as_secs_f64())
        };
        let bitrate_kbps = properties
            .audio_bitrate()
            .or_else(|| properties.overall_bitrate());

        let (container, codec) = container_and_codec(tagged_file.file_type());

        let metadata = AudioMetadata {
            file_path: file_path.to_string_lossy().to_string(),
            name: base_name(file_path),
            file_size_bytes,
            duration_seconds,
            bitrate_kbps,
            sample_rate: properties.sample_rate(),
            channels: properties.channels(),
            bit_depth: properties.bit_depth(),
            codec: codec.to_string(),
            container: container.to_string(),
        };

        tracing::debug!(
            file = %file_path.display(),
            duration_s = ?metadata.duration_seconds,
            sample_rate = ?metadata.sample_rate,
            codec = %metadata.codec,
            "Extracted metadata"
        );

        Ok(metadata)
    }

    /// Minimal `{path, name, size}` for files that failed full extraction
    pub fn basic_info(&self, file_path: &Path) -> Result<BasicFileInfo, MetadataError> {
        let size = std::fs::metadata(file_path)?.len();
        Ok(BasicFileInfo {
            path: file_path.to_string_lossy().to_string(),
            name: base_name(file_path),
            size,
        })
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new(100 * 1024 * 1024)
    }
}

fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn container_and_codec(file_type: FileType) -> (&'static str, &'static str) {
    match file_type {
        FileType::Mpeg => ("MPEG", "MP3"),
        FileType::Flac => ("FLAC", "FLAC"),
        FileType::Opus => ("Ogg", "Opus"),
        FileType::Vorbis => ("Ogg", "Vorbis"),
        FileType::Aac => ("ADTS", "AAC"),
        FileType::Mp4 => ("MPEG-4", "AAC"),
        FileType::Aiff => ("AIFF", "PCM"),
        FileType::Wav => ("WAVE", "PCM"),
        FileType::WavPack => ("WavPack", "WavPack"),
        _ => ("Unknown", "Unknown"),
    }
}
