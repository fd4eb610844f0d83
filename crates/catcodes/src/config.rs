//! Re-coding configuration with builder pattern.
//!
//! [`RecodeConfig`] controls threading, how incoming features are matched to
//! a frozen container, and the per-feature category cap. It uses the `bon`
//! crate for builder generation with validation at build time.
//!
//! # Example
//!
//! ```
//! use catcodes::{FeatureMatching, RecodeConfig};
//!
//! // All defaults
//! let config = RecodeConfig::builder().build().unwrap();
//!
//! // Match features by name, single-threaded
//! let config = RecodeConfig::builder()
//!     .feature_matching(FeatureMatching::Name)
//!     .n_threads(std::num::NonZeroUsize::new(1).unwrap())
//!     .build()
//!     .unwrap();
//! ```

use std::num::NonZeroUsize;

use bon::Builder;

use crate::error::CategoryError;
use crate::utils::{Parallelism, run_with_threads};

/// Largest code space a feature may have: every code must fit in an `i32`.
pub const MAX_CATEGORIES: usize = i32::MAX as usize;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_categories` must be in `1..=i32::MAX`.
    InvalidMaxCategories(usize),
    /// A dedicated thread pool could not be created.
    ThreadPool(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMaxCategories(v) => {
                write!(f, "max_categories must be in 1..={}, got {}", MAX_CATEGORIES, v)
            }
            Self::ThreadPool(msg) => write!(f, "failed to create thread pool: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// RecodeConfig
// =============================================================================

/// How the columns of an incoming batch are matched to the features of a
/// frozen container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureMatching {
    /// Column `i` is feature `i`. If both sides carry names they must agree.
    #[default]
    Position,
    /// Columns are looked up by feature name and re-ordered to container order.
    Name,
}

/// Configuration for schema construction and projection.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct RecodeConfig {
    /// Number of threads. `None` uses the current rayon pool.
    pub n_threads: Option<NonZeroUsize>,

    /// Feature identity convention. Default: [`FeatureMatching::Position`].
    #[builder(default)]
    pub feature_matching: FeatureMatching,

    /// Per-feature category cap. Default: `i32::MAX`.
    #[builder(default = MAX_CATEGORIES)]
    pub max_categories: usize,
}

/// Custom finishing function that validates the config.
impl<S: recode_config_builder::IsComplete> RecodeConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMaxCategories`] if `max_categories` is
    /// zero or exceeds `i32::MAX`.
    pub fn build(self) -> Result<RecodeConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl RecodeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_categories == 0 || self.max_categories > MAX_CATEGORIES {
            return Err(ConfigError::InvalidMaxCategories(self.max_categories));
        }
        Ok(())
    }

    /// Run `f` on the configured thread pool.
    pub(crate) fn install<T: Send>(
        &self,
        f: impl FnOnce(Parallelism) -> T + Send,
    ) -> Result<T, CategoryError> {
        let n_threads = self.n_threads.map_or(0, NonZeroUsize::get);
        run_with_threads(n_threads, f)
            .map_err(|e| CategoryError::Config(ConfigError::ThreadPool(e.to_string())))
    }
}

impl Default for RecodeConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}
