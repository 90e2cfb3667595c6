//! Retry policy, stage deadlines and configuration.
//!
//! Every remote call the engine makes goes through [`StageGuard::run`],
//! which layers three things around it:
//!
//! - the caller's cancellation token, checked before each attempt and raced
//!   against it
//! - a per-stage deadline from the `[timeouts]` section
//! - bounded, jittered exponential backoff for transient errors
//!
//! Configuration is TOML-based. [`FolioConfig::load`] merges the bundled
//! defaults with optional user overrides.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod guard;

pub use config::{
    FolioConfig, LayoutConfig, LayoutConfigBuilder, RetryConfig, RetryConfigBuilder,
    TimeoutConfig, TimeoutConfigBuilder, TimingConfig, TimingConfigBuilder,
};
pub use guard::StageGuard;
