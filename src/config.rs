//! Configuration types, built from environment variables.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Custom-emoji ids that map reactions to sentiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiConfig {
    pub agree_emoji_id: String,
    pub neutral_emoji_id: String,
    pub disagree_emoji_id: String,
}

impl EmojiConfig {
    /// Build from environment variables.
    /// Returns `None` unless all three emoji ids are set.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            agree_emoji_id: non_empty_var("CURATOR_AGREE_EMOJI_ID")?,
            neutral_emoji_id: non_empty_var("CURATOR_NEUTRAL_EMOJI_ID")?,
            disagree_emoji_id: non_empty_var("CURATOR_DISAGREE_EMOJI_ID")?,
        })
    }
}

/// Curation thresholds and channel selection.
#[derive(Debug, Clone)]
pub struct CuratorConfig {
    /// Absent emoji config fails every run at validation.
    pub emoji: Option<EmojiConfig>,
    /// Minimum number of agree reactions required for greenlighting.
    pub minimum_agree_threshold: u32,
    /// Minimum agree share (0–100) of agree + disagree reactions.
    pub minimum_approval_percentage: f64,
    /// Name of the tag applied to greenlit threads (case-insensitive lookup).
    pub greenlit_tag: String,
    /// Suggestion forums curated by the scheduled loop.
    pub suggestion_forum_ids: Vec<String>,
    /// Alpha suggestion forums curated by the scheduled loop.
    pub alpha_suggestion_forum_ids: Vec<String>,
    /// Cron expression for scheduled curation. `None` disables the loop.
    pub schedule: Option<String>,
    /// Whether Prometheus metrics are recorded.
    pub metrics_enabled: bool,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            emoji: None,
            minimum_agree_threshold: 15,
            minimum_approval_percentage: 75.0,
            greenlit_tag: "greenlit".to_string(),
            suggestion_forum_ids: Vec::new(),
            alpha_suggestion_forum_ids: Vec::new(),
            schedule: None,
            metrics_enabled: false,
        }
    }
}

impl CuratorConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let minimum_agree_threshold = match std::env::var("CURATOR_MIN_AGREE") {
            Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "CURATOR_MIN_AGREE".into(),
                message: format!("{e}"),
            })?,
            Err(_) => defaults.minimum_agree_threshold,
        };

        let minimum_approval_percentage = match std::env::var("CURATOR_MIN_PERCENT") {
            Ok(raw) => parse_percentage(&raw)?,
            Err(_) => defaults.minimum_approval_percentage,
        };

        let metrics_enabled = std::env::var("CURATOR_METRICS_ENABLED")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            emoji: EmojiConfig::from_env(),
            minimum_agree_threshold,
            minimum_approval_percentage,
            greenlit_tag: non_empty_var("CURATOR_GREENLIT_TAG").unwrap_or(defaults.greenlit_tag),
            suggestion_forum_ids: list_var("CURATOR_FORUM_IDS"),
            alpha_suggestion_forum_ids: list_var("CURATOR_ALPHA_FORUM_IDS"),
            schedule: non_empty_var("CURATOR_SCHEDULE"),
            metrics_enabled,
        })
    }

    /// All forums the scheduled loop visits, suggestion forums first.
    pub fn forum_ids(&self) -> Vec<String> {
        let mut ids = self.suggestion_forum_ids.clone();
        for id in &self.alpha_suggestion_forum_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

/// Chat-platform connection settings.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub bot_token: SecretString,
    pub api_base: String,
}

impl PlatformConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = non_empty_var("DISCORD_BOT_TOKEN")
            .ok_or_else(|| ConfigError::MissingEnvVar("DISCORD_BOT_TOKEN".into()))?;
        let api_base = non_empty_var("DISCORD_API_BASE")
            .unwrap_or_else(|| "https://discord.com/api/v10".to_string());
        Ok(Self {
            bot_token: SecretString::from(token),
            api_base,
        })
    }
}

/// Location of the curation database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let db_path = std::env::var("CURATOR_DB_PATH")
            .unwrap_or_else(|_| "./data/forum-curator.db".to_string());
        Self {
            db_path: PathBuf::from(db_path),
        }
    }
}

fn parse_percentage(raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: "CURATOR_MIN_PERCENT".into(),
        message: format!("{e}"),
    })?;
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: "CURATOR_MIN_PERCENT".into(),
            message: format!("{value} is outside 0-100"),
        });
    }
    Ok(value)
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn list_var(key: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_curation_thresholds() {
        let config = CuratorConfig::default();
        assert_eq!(config.minimum_agree_threshold, 15);
        assert!((config.minimum_approval_percentage - 75.0).abs() < f64::EPSILON);
        assert_eq!(config.greenlit_tag, "greenlit");
        assert!(config.emoji.is_none());
    }

    #[test]
    fn percentage_rejects_out_of_range() {
        assert!(parse_percentage("101").is_err());
        assert!(parse_percentage("-1").is_err());
        assert!(parse_percentage("abc").is_err());
        assert!((parse_percentage(" 80.5 ").unwrap() - 80.5).abs() < f64::EPSILON);
    }

    #[test]
    fn forum_ids_dedupes_alpha_forums() {
        let config = CuratorConfig {
            suggestion_forum_ids: vec!["1".into(), "2".into()],
            alpha_suggestion_forum_ids: vec!["2".into(), "3".into()],
            ..Default::default()
        };
        assert_eq!(config.forum_ids(), vec!["1", "2", "3"]);
    }
}
