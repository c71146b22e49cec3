//! Configuration resolution for aiso-ai
//!
//! Provider API keys resolve ENV → TOML. Keys are never written to the
//! sample store.

use aiso_common::config::{ProviderConfig, TomlConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::models::ProviderKind;
use crate::services::providers::{anthropic, openai, ClientSettings};

pub const OPENAI_API_KEY_ENV: &str = "AISO_OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY_ENV: &str = "AISO_ANTHROPIC_API_KEY";

/// Category vocabulary offered to providers and listed with palette colours
pub const CATEGORIES: &[&str] = &[
    "kick", "snare", "hihat", "cymbal", "percussion", "bass", "lead", "pad", "chord", "arp",
    "vocal", "fx", "loop", "one-shot", "melody",
];

pub const MOODS: &[&str] = &[
    "aggressive", "calm", "dark", "bright", "energetic", "melancholic", "uplifting",
    "mysterious", "playful", "serious",
];

pub const STYLES: &[&str] = &[
    "trap", "house", "techno", "ambient", "jazz", "rock", "pop", "classical", "experimental",
    "minimal",
];

/// Provider API keys; empty or absent keys leave the provider unconfigured
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    #[serde(default)]
    pub openai: Option<String>,
    #[serde(default)]
    pub anthropic: Option<String>,
}

impl ProviderCredentials {
    pub fn key_for(&self, kind: ProviderKind) -> Option<&str> {
        let key = match kind {
            ProviderKind::OpenAi => self.openai.as_deref(),
            ProviderKind::Anthropic => self.anthropic.as_deref(),
        };
        key.filter(|k| is_valid_key(k))
    }
}

/// Model and endpoint for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEndpoint {
    pub model: String,
    pub base_url: String,
}

/// Pipeline settings derived from the TOML config
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub timeout: Duration,
    pub requests_per_minute: u32,
    pub max_file_size_bytes: u64,
    pub openai: ProviderEndpoint,
    pub anthropic: ProviderEndpoint,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

impl ServiceSettings {
    pub fn from_toml(config: &TomlConfig) -> Self {
        let endpoint = |provider: &ProviderConfig, model: &str, base_url: &str| ProviderEndpoint {
            model: provider.model.clone().unwrap_or_else(|| model.to_string()),
            base_url: provider
                .base_url
                .clone()
                .unwrap_or_else(|| base_url.to_string()),
        };

        Self {
            timeout: Duration::from_secs(config.ai.timeout_seconds.max(1)),
            requests_per_minute: config.ai.requests_per_minute,
            max_file_size_bytes: config.ai.max_file_size_mb.saturating_mul(1024 * 1024),
            openai: endpoint(&config.openai, openai::DEFAULT_MODEL, openai::DEFAULT_BASE_URL),
            anthropic: endpoint(
                &config.anthropic,
                anthropic::DEFAULT_MODEL,
                anthropic::DEFAULT_BASE_URL,
            ),
        }
    }

    /// Client settings for `kind` with the given key
    pub fn client_settings(&self, kind: ProviderKind, api_key: &str) -> ClientSettings {
        let endpoint = match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
        };
        ClientSettings {
            api_key: api_key.to_string(),
            model: endpoint.model.clone(),
            base_url: endpoint.base_url.clone(),
            timeout: self.timeout,
            requests_per_minute: self.requests_per_minute,
        }
    }
}

/// Resolve one provider key: environment first, then TOML
pub fn resolve_api_key(
    kind: ProviderKind,
    env_var_name: &str,
    toml_section: &ProviderConfig,
) -> Option<String> {
    let env_key = std::env::var(env_var_name).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_section.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            provider = %kind,
            "API key found in environment and TOML config; using environment"
        );
    }

    if let Some(key) = env_key {
        info!(provider = %kind, "API key loaded from environment variable");
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!(provider = %kind, "API key loaded from TOML config");
        return Some(key);
    }
    None
}

/// Startup credentials from ENV and TOML
pub fn resolve_credentials(config: &TomlConfig) -> ProviderCredentials {
    ProviderCredentials {
        openai: resolve_api_key(ProviderKind::OpenAi, OPENAI_API_KEY_ENV, &config.openai),
        anthropic: resolve_api_key(
            ProviderKind::Anthropic,
            ANTHROPIC_API_KEY_ENV,
            &config.anthropic,
        ),
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_key_wins_over_toml() {
        std::env::set_var(OPENAI_API_KEY_ENV, "sk-env");
        let section = ProviderConfig {
            api_key: Some("sk-toml".to_string()),
            ..Default::default()
        };
        let key = resolve_api_key(ProviderKind::OpenAi, OPENAI_API_KEY_ENV, &section);
        std::env::remove_var(OPENAI_API_KEY_ENV);
        assert_eq!(key.as_deref(), Some("sk-env"));
    }

    #[test]
    #[serial]
    fn toml_key_used_when_env_blank() {
        std::env::set_var(ANTHROPIC_API_KEY_ENV, "   ");
        let section = ProviderConfig {
            api_key: Some("ak-toml".to_string()),
            ..Default::default()
        };
        let key = resolve_api_key(ProviderKind::Anthropic, ANTHROPIC_API_KEY_ENV, &section);
        std::env::remove_var(ANTHROPIC_API_KEY_ENV);
        assert_eq!(key.as_deref(), Some("ak-toml"));
    }

    #[test]
    #[serial]
    fn no_key_anywhere() {
        std::env::remove_var(OPENAI_API_KEY_ENV);
        let key = resolve_api_key(ProviderKind::OpenAi, OPENAI_API_KEY_ENV, &ProviderConfig::default());
        assert!(key.is_none());
    }

    #[test]
    fn default_settings() {
        let settings = ServiceSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.max_file_size_bytes, 100 * 1024 * 1024);
        assert_eq!(settings.anthropic.model, "claude-3-5-sonnet-20241022");
        assert_eq!(settings.openai.model, "gpt-4");

        let client = settings.client_settings(ProviderKind::OpenAi, "sk");
        assert_eq!(client.base_url, "https://api.openai.com");
        assert_eq!(client.requests_per_minute, 60);
    }

    #[test]
    fn blank_credentials_are_ignored() {
        let credentials = ProviderCredentials {
            openai: Some("".to_string()),
            anthropic: Some("ak".to_string()),
        };
        assert_eq!(credentials.key_for(ProviderKind::OpenAi), None);
        assert_eq!(credentials.key_for(ProviderKind::Anthropic), Some("ak"));
    }
}
