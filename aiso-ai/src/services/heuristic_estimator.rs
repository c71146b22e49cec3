//! Filename heuristics standing in for audio analysis
//!
//! Nothing in this module looks at the audio stream. Tempo and key come from
//! filename tokens, the tempo band from keywords and duration, and the spectral
//! centroid from container properties. Every value is an approximation: it is
//! stored under `analysis.heuristics` and never presented as a measurement.
//! Features that would need real signal analysis (loudness, zero-crossing rate)
//! are always `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::metadata_extractor::AudioMetadata;

/// Literal tempo token such as `128bpm` or `90 BPM`
static BPM_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[^0-9])(\d{2,3})\s*bpm").expect("valid BPM regex"));

/// Note-name token: letter, optional accidental, optional mode
static KEY_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Ga-g])(#|b|sharp|flat)?(m|min|minor|maj|major)?$").expect("valid key regex")
});

/// Approximate tempo band inferred from keywords and duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpmRange {
    pub min: u32,
    pub max: u32,
}

impl BpmRange {
    const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> u32 {
        (self.min + self.max) / 2
    }
}

/// Filename/container derived estimate (approximate by construction)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicEstimate {
    /// Tempo from an explicit `<N>bpm` filename token
    pub bpm: Option<u32>,
    /// 0.7 when `bpm` came from a filename token, else 0.0
    pub bpm_confidence: f64,
    /// Keyword/duration tempo band when no explicit tempo exists
    pub bpm_range: Option<BpmRange>,
    /// Key guess from a note-name filename token
    pub key: Option<String>,
    /// Placeholder derived from sample rate and bitrate
    pub spectral_centroid_hz: Option<u32>,
    /// Not measured
    pub zero_crossing_rate: Option<f32>,
    /// Not measured
    pub loudness_lufs: Option<f32>,
    pub time_signature: String,
    pub method: String,
}

/// Filename heuristic estimator
#[derive(Debug, Clone)]
pub struct HeuristicEstimator {
    bpm_min: u32,
    bpm_max: u32,
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self::new(60, 200)
    }
}

impl HeuristicEstimator {
    /// Create an estimator accepting explicit tempos within `bpm_min..=bpm_max`
    pub fn new(bpm_min: u32, bpm_max: u32) -> Self {
        Self { bpm_min, bpm_max }
    }

    pub fn estimate(&self, metadata: &AudioMetadata) -> HeuristicEstimate {
        let name = metadata.name.to_lowercase();
        let bpm = self.bpm_from_name(&name);
        let bpm_range = if bpm.is_some() {
            None
        } else {
            bpm_range_for(&name, metadata.duration_seconds)
        };

        HeuristicEstimate {
            bpm,
            bpm_confidence: if bpm.is_some() { 0.7 } else { 0.0 },
            bpm_range,
            key: key_from_name(&metadata.name),
            spectral_centroid_hz: spectral_centroid(metadata),
            zero_crossing_rate: None,
            loudness_lufs: None,
            time_signature: "4/4".to_string(),
            method: "filename-heuristic".to_string(),
        }
    }

    fn bpm_from_name(&self, lowercase_name: &str) -> Option<u32> {
        BPM_TOKEN
            .captures_iter(lowercase_name)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .find(|bpm| (self.bpm_min..=self.bpm_max).contains(bpm))
    }
}

fn bpm_range_for(name: &str, duration: Option<f64>) -> Option<BpmRange> {
    let has = |needle: &str| name.contains(needle);

    if (has("kick") || has("bass")) && duration.is_some_and(|d| d < 1.0) {
        return Some(BpmRange::new(120, 140));
    }
    if has("trap") {
        return Some(BpmRange::new(140, 160));
    }
    if has("dnb") || (has("drum") && has("bass")) {
        return Some(BpmRange::new(170, 180));
    }
    if has("ambient") || has("pad") {
        return Some(BpmRange::new(80, 100));
    }

    match duration {
        Some(d) if d < 0.5 => Some(BpmRange::new(120, 140)),
        Some(d) if d < 2.0 => Some(BpmRange::new(110, 130)),
        Some(d) if d > 8.0 => Some(BpmRange::new(100, 120)),
        _ => None,
    }
}

/// Find a separator-delimited note-name token in the file stem
///
/// The mode may be attached ("Cm") or the following token ("Bb-minor"). A
/// bare lowercase letter is ignored (too likely to be a word fragment) unless
/// an accidental or mode goes with it ("f#", "am", "a minor").
fn key_from_name(name: &str) -> Option<String> {
    let stem = match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => name,
    };

    let tokens: Vec<&str> = stem
        .split(|c: char| c == '_' || c == '-' || c == ' ' || c == '.')
        .filter(|token| !token.is_empty())
        .collect();

    tokens.iter().enumerate().find_map(|(i, token)| {
        let caps = KEY_TOKEN.captures(token)?;
        let letter = caps.get(1)?.as_str();
        let accidental = caps.get(2).map(|m| m.as_str());
        let mode = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .or_else(|| tokens.get(i + 1).and_then(|next| mode_word(next)));

        let bare_lowercase = letter.chars().all(|c| c.is_ascii_lowercase())
            && accidental.is_none()
            && mode.is_none();
        if bare_lowercase {
            return None;
        }

        let mut key = letter.to_ascii_uppercase();
        match accidental {
            Some("#") | Some("sharp") => key.push('#'),
            Some("b") | Some("flat") => key.push('b'),
            _ => {}
        }
        if matches!(mode.as_deref(), Some("m") | Some("min") | Some("minor")) {
            key.push('m');
        }
        Some(key)
    })
}

/// Standalone mode word following a note token, normalized to lowercase
fn mode_word(token: &str) -> Option<String> {
    let lower = token.to_ascii_lowercase();
    matches!(lower.as_str(), "min" | "minor" | "maj" | "major").then_some(lower)
}

fn spectral_centroid(metadata: &AudioMetadata) -> Option<u32> {
    let sample_rate = metadata.sample_rate? as f64;
    let bitrate = metadata.bitrate_kbps? as f64;
    let normalized_bitrate = (bitrate / 320.0).min(1.0);
    Some((sample_rate * 0.1 * (0.5 + normalized_bitrate * 0.5)).floor() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str, duration: Option<f64>) -> AudioMetadata {
        AudioMetadata {
            file_path: format!("/samples/{}", name),
            name: name.to_string(),
            file_size_bytes: 1024,
            duration_seconds: duration,
            bitrate_kbps: Some(160),
            sample_rate: Some(44100),
            channels: Some(2),
            bit_depth: Some(16),
            codec: "PCM".to_string(),
            container: "WAVE".to_string(),
        }
    }

    #[test]
    fn explicit_bpm_token_wins() {
        let estimate = HeuristicEstimator::default().estimate(&metadata("Trap_Loop_145bpm.wav", Some(4.0)));
        assert_eq!(estimate.bpm, Some(145));
        assert_eq!(estimate.bpm_confidence, 0.7);
        assert!(estimate.bpm_range.is_none());
    }

    #[test]
    fn bpm_token_with_space_and_uppercase() {
        let estimate = HeuristicEstimator::default().estimate(&metadata("bass_F#_120 BPM.wav", Some(3.0)));
        assert_eq!(estimate.bpm, Some(120));
        assert_eq!(estimate.key.as_deref(), Some("F#"));
    }

    #[test]
    fn out_of_range_bpm_token_is_ignored() {
        let estimate = HeuristicEstimator::default().estimate(&metadata("fx_999bpm.wav", None));
        assert_eq!(estimate.bpm, None);
        assert_eq!(estimate.bpm_confidence, 0.0);
    }

    #[test]
    fn short_kick_gets_house_band_without_fabricated_value() {
        let estimate = HeuristicEstimator::default().estimate(&metadata("deep_kick_01.wav", Some(0.4)));
        assert_eq!(estimate.bpm, None);
        assert_eq!(estimate.bpm_range, Some(BpmRange { min: 120, max: 140 }));
    }

    #[test]
    fn keyword_bands() {
        let estimator = HeuristicEstimator::default();
        assert_eq!(
            estimator.estimate(&metadata("dark_trap_hats.wav", Some(5.0))).bpm_range,
            Some(BpmRange { min: 140, max: 160 })
        );
        assert_eq!(
            estimator.estimate(&metadata("rolling_drum_and_bass.wav", Some(5.0))).bpm_range,
            Some(BpmRange { min: 170, max: 180 })
        );
        assert_eq!(
            estimator.estimate(&metadata("Ambient_Texture.flac", Some(20.0))).bpm_range,
            Some(BpmRange { min: 80, max: 100 })
        );
    }

    #[test]
    fn duration_bands_and_unknown() {
        let estimator = HeuristicEstimator::default();
        assert_eq!(
            estimator.estimate(&metadata("hit.wav", Some(1.5))).bpm_range,
            Some(BpmRange { min: 110, max: 130 })
        );
        assert_eq!(
            estimator.estimate(&metadata("texture.wav", Some(12.0))).bpm_range,
            Some(BpmRange { min: 100, max: 120 })
        );
        assert_eq!(estimator.estimate(&metadata("texture.wav", Some(4.0))).bpm_range, None);
        assert_eq!(estimator.estimate(&metadata("texture.wav", None)).bpm_range, None);
    }

    #[test]
    fn key_tokens() {
        assert_eq!(key_from_name("Pad_Cm_loop.wav").as_deref(), Some("Cm"));
        assert_eq!(key_from_name("lead-Bb-minor.wav").as_deref(), Some("Bbm"));
        assert_eq!(key_from_name("stab F# Minor 128.wav").as_deref(), Some("F#m"));
        assert_eq!(key_from_name("pad_a_minor.wav").as_deref(), Some("Am"));
        assert_eq!(key_from_name("pluck-E-major.wav").as_deref(), Some("E"));
        assert_eq!(key_from_name("keys_am_90.wav").as_deref(), Some("Am"));
        assert_eq!(key_from_name("Chord Gmaj.wav").as_deref(), Some("G"));
        assert_eq!(key_from_name("deep_kick_01.wav"), None);
        assert_eq!(key_from_name("a_b_c.wav"), None);
    }

    #[test]
    fn unmeasured_features_stay_absent() {
        let estimate = HeuristicEstimator::default().estimate(&metadata("snare.wav", Some(0.3)));
        assert!(estimate.loudness_lufs.is_none());
        assert!(estimate.zero_crossing_rate.is_none());
        // 44100 * 0.1 * (0.5 + 0.5 * 0.5)
        assert_eq!(estimate.spectral_centroid_hz, Some(3307));
        assert_eq!(estimate.method, "filename-heuristic");
    }
}
