//! Configuration structures for the engine.
//!
//! This module provides TOML-based configuration. The configuration system
//! supports:
//! - Bundled defaults (include_str! from folio.toml)
//! - User overrides (~/.config/folio/folio.toml, then ./folio.toml)
//! - Automatic merging with user values taking precedence

use derive_getters::Getters;
use folio_cache::BeatCacheConfig;
use folio_core::Stage;
use folio_error::{ConfigError, FolioError, FolioResult};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_retry2::strategy::jitter;
use tracing::{debug, instrument};

/// Page layout of a book.
///
/// ```toml
/// [layout]
/// max_story_pages = 10
/// decision_pages = [5]
/// initial_pages = 2
/// batch_size = 2
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct LayoutConfig {
    /// Story pages between cover and back cover
    #[serde(default = "default_max_story_pages")]
    max_story_pages: u32,

    /// Pages that must offer a branching choice
    #[serde(default = "default_decision_pages")]
    decision_pages: Vec<u32>,

    /// Pages generated right after the cover
    #[serde(default = "default_initial_pages")]
    initial_pages: u32,

    /// Pages generated per continue or choice
    #[serde(default = "default_batch_size")]
    batch_size: u32,
}

fn default_max_story_pages() -> u32 {
    10
}

fn default_decision_pages() -> Vec<u32> {
    vec![5]
}

fn default_initial_pages() -> u32 {
    2
}

fn default_batch_size() -> u32 {
    2
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_story_pages: default_max_story_pages(),
            decision_pages: default_decision_pages(),
            initial_pages: default_initial_pages(),
            batch_size: default_batch_size(),
        }
    }
}

/// Artificial delays in the session lifecycle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct TimingConfig {
    /// How long terminal progress stays visible (milliseconds)
    #[serde(default = "default_progress_grace_ms")]
    progress_grace_ms: u64,

    /// Delay between the cover finishing and the reading view (milliseconds)
    #[serde(default = "default_launch_transition_ms")]
    launch_transition_ms: u64,
}

fn default_progress_grace_ms() -> u64 {
    1_500
}

fn default_launch_transition_ms() -> u64 {
    800
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            progress_grace_ms: default_progress_grace_ms(),
            launch_transition_ms: default_launch_transition_ms(),
        }
    }
}

impl TimingConfig {
    /// Grace delay before clearing terminal progress.
    pub fn progress_grace(&self) -> Duration {
        Duration::from_millis(self.progress_grace_ms)
    }

    /// Delay before the session enters the reading view.
    pub fn launch_transition(&self) -> Duration {
        Duration::from_millis(self.launch_transition_ms)
    }
}

/// Per-stage deadlines.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct TimeoutConfig {
    /// Beat generation deadline (milliseconds)
    #[serde(default = "default_beat_ms")]
    beat_ms: u64,

    /// Persona casting deadline (milliseconds)
    #[serde(default = "default_persona_ms")]
    persona_ms: u64,

    /// Image rendering deadline (milliseconds)
    #[serde(default = "default_image_ms")]
    image_ms: u64,
}

fn default_beat_ms() -> u64 {
    60_000
}

fn default_persona_ms() -> u64 {
    90_000
}

fn default_image_ms() -> u64 {
    120_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            beat_ms: default_beat_ms(),
            persona_ms: default_persona_ms(),
            image_ms: default_image_ms(),
        }
    }
}

impl TimeoutConfig {
    /// Deadline for a single attempt of the given stage.
    pub fn for_stage(&self, stage: Stage) -> Duration {
        let ms = match stage {
            Stage::Beat => self.beat_ms,
            Stage::Persona => self.persona_ms,
            Stage::Image => self.image_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Backoff schedule for transient provider errors.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    max_retries: u32,

    /// First backoff delay (milliseconds)
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,

    /// Backoff cap (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    max_delay_ms: u64,

    /// Randomise each delay
    #[serde(default = "default_jitter")]
    jitter: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    16_000
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// Delays between attempts: doubling from the base, capped, optionally jittered.
    ///
    /// # Example
    ///
    /// ```
    /// use folio_retry::RetryConfig;
    /// use std::time::Duration;
    ///
    /// let retry = RetryConfig::default()
    ///     .with_base_delay_ms(100)
    ///     .with_max_delay_ms(300)
    ///     .with_jitter(false);
    ///
    /// let delays: Vec<_> = retry.delays().collect();
    /// assert_eq!(
    ///     delays,
    ///     vec![
    ///         Duration::from_millis(100),
    ///         Duration::from_millis(200),
    ///         Duration::from_millis(300),
    ///     ]
    /// );
    /// ```
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let base = self.base_delay_ms;
        let cap = self.max_delay_ms;
        let jittered = self.jitter;
        (0..self.max_retries).map(move |attempt| {
            let ms = base.saturating_mul(2u64.saturating_pow(attempt)).min(cap);
            let delay = Duration::from_millis(ms);
            if jittered { jitter(delay) } else { delay }
        })
    }
}

/// Top-level Folio configuration.
///
/// Loads engine settings from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from folio.toml)
/// 2. User override (~/.config/folio/folio.toml, then ./folio.toml)
///
/// # Example
///
/// ```no_run
/// use folio_retry::FolioConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = FolioConfig::load()?;
/// println!("Batch size: {}", config.layout.batch_size());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct FolioConfig {
    /// Page layout
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Session delays
    #[serde(default)]
    pub timing: TimingConfig,

    /// Stage deadlines
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Backoff schedule
    #[serde(default)]
    pub retry: RetryConfig,

    /// Beat cache
    #[serde(default)]
    pub cache: BeatCacheConfig,
}

impl FolioConfig {
    /// Load configuration from a specific file path.
    ///
    /// Missing sections and fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> FolioResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                FolioError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                FolioError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (folio.toml shipped with library)
    /// 2. User config in home directory (~/.config/folio/folio.toml)
    /// 3. User config in current directory (./folio.toml)
    ///
    /// User config files are optional and will be silently skipped if not found.
    #[instrument]
    pub fn load() -> FolioResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../folio.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/folio/folio.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("folio").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| {
                FolioError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                FolioError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject layouts the engine cannot page through.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        if layout.max_story_pages == 0 {
            return Err(ConfigError::new("layout.max_story_pages must be at least 1"));
        }
        if layout.batch_size == 0 {
            return Err(ConfigError::new("layout.batch_size must be at least 1"));
        }
        if let Some(page) = layout
            .decision_pages
            .iter()
            .find(|page| **page == 0 || **page > layout.max_story_pages)
        {
            return Err(ConfigError::new(format!(
                "layout.decision_pages entry {} is not a story page",
                page
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_per_stage() {
        let timeouts = TimeoutConfig::default().with_image_ms(5);
        assert_eq!(timeouts.for_stage(Stage::Image), Duration::from_millis(5));
        assert_eq!(timeouts.for_stage(Stage::Beat), Duration::from_millis(60_000));
    }

    #[test]
    fn test_delays_respect_retry_count() {
        let retry = RetryConfig::default().with_max_retries(0);
        assert_eq!(retry.delays().count(), 0);

        let retry = RetryConfig::default().with_max_retries(5).with_jitter(false);
        let delays: Vec<_> = retry.delays().collect();
        assert_eq!(delays.len(), 5);
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(16_000)));
    }

    #[test]
    fn test_validate_rejects_bad_layout() {
        let mut config = FolioConfig::default();
        config.layout = LayoutConfig::default().with_batch_size(0);
        assert!(config.validate().is_err());

        config.layout = LayoutConfig::default().with_decision_pages(vec![11]);
        assert!(config.validate().is_err());

        config.layout = LayoutConfig::default();
        assert!(config.validate().is_ok());
    }
}
