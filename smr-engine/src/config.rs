//! Matching settings resolution
//!
//! Each value resolves independently with ENV → TOML → compiled default
//! priority. Invalid environment values are reported and ignored.

use crate::matching::signals::{
    ScoreOptions, DEFAULT_DURATION_TOLERANCE_SECS, DEFAULT_SIZE_TOLERANCE_PERCENT,
    IDENTITY_DURATION_TOLERANCE_SECS,
};
use smr_common::config::{MatchingConfig, TomlConfig};
use std::str::FromStr;
use tracing::{debug, warn};

pub const ENV_DURATION_TOLERANCE: &str = "SMR_DURATION_TOLERANCE";
pub const ENV_ID_DURATION_TOLERANCE: &str = "SMR_ID_DURATION_TOLERANCE";
pub const ENV_SIZE_TOLERANCE_PERCENT: &str = "SMR_SIZE_TOLERANCE_PERCENT";
pub const ENV_FEDERATED_MIN_RATIO: &str = "SMR_FEDERATED_MIN_RATIO";

/// Minimum ratio for loose federated title matching
pub const DEFAULT_FEDERATED_MIN_RATIO: f64 = 0.75;

/// Minimum ratio for disambiguated single-result lookups (performers)
pub const DEFAULT_PERFORMER_MIN_RATIO: f64 = 0.9;

/// Sub-source queries in flight at once; 1 means sequential
pub const DEFAULT_FEDERATED_CONCURRENCY: usize = 1;

/// Fully resolved matching settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub duration_tolerance_secs: u64,
    pub identity_duration_tolerance_secs: u64,
    pub size_tolerance_percent: f64,
    pub federated_min_ratio: f64,
    pub performer_min_ratio: f64,
    pub federated_concurrency: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            duration_tolerance_secs: DEFAULT_DURATION_TOLERANCE_SECS,
            identity_duration_tolerance_secs: IDENTITY_DURATION_TOLERANCE_SECS,
            size_tolerance_percent: DEFAULT_SIZE_TOLERANCE_PERCENT,
            federated_min_ratio: DEFAULT_FEDERATED_MIN_RATIO,
            performer_min_ratio: DEFAULT_PERFORMER_MIN_RATIO,
            federated_concurrency: DEFAULT_FEDERATED_CONCURRENCY,
        }
    }
}

impl EngineSettings {
    /// Resolve settings from environment and TOML
    ///
    /// **Priority:** ENV → TOML → default
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        let matching: &MatchingConfig = &toml_config.matching;
        let defaults = Self::default();

        let settings = Self {
            duration_tolerance_secs: resolve_value(
                ENV_DURATION_TOLERANCE,
                matching.duration_tolerance_secs,
                defaults.duration_tolerance_secs,
                |_| true,
            ),
            identity_duration_tolerance_secs: resolve_value(
                ENV_ID_DURATION_TOLERANCE,
                matching.identity_duration_tolerance_secs,
                defaults.identity_duration_tolerance_secs,
                |_| true,
            ),
            size_tolerance_percent: resolve_value(
                ENV_SIZE_TOLERANCE_PERCENT,
                matching.size_tolerance_percent.filter(|p| is_tolerance(*p)),
                defaults.size_tolerance_percent,
                |p| is_tolerance(*p),
            ),
            federated_min_ratio: resolve_value(
                ENV_FEDERATED_MIN_RATIO,
                matching.federated_min_ratio.filter(|r| is_ratio(*r)),
                defaults.federated_min_ratio,
                |r| is_ratio(*r),
            ),
            performer_min_ratio: matching
                .performer_min_ratio
                .filter(|r| is_ratio(*r))
                .unwrap_or(defaults.performer_min_ratio),
            federated_concurrency: matching
                .federated_concurrency
                .filter(|n| *n > 0)
                .unwrap_or(defaults.federated_concurrency),
        };

        debug!(?settings, "Resolved matching settings");
        settings
    }

    /// Scoring options for free-text queries
    pub fn text_options(&self) -> ScoreOptions {
        ScoreOptions {
            duration_tolerance_secs: self.duration_tolerance_secs,
            size_tolerance_percent: self.size_tolerance_percent,
            identity_search: false,
        }
    }

    /// Scoring options for identifier queries
    pub fn identity_options(&self) -> ScoreOptions {
        ScoreOptions {
            duration_tolerance_secs: self.identity_duration_tolerance_secs,
            size_tolerance_percent: self.size_tolerance_percent,
            identity_search: true,
        }
    }
}

fn is_ratio(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn is_tolerance(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Environment value if set and accepted by `is_valid`, else the TOML value,
/// else the default
fn resolve_value<T, F>(env_key: &str, toml_value: Option<T>, default: T, is_valid: F) -> T
where
    T: FromStr,
    F: Fn(&T) -> bool,
{
    if let Ok(raw) = std::env::var(env_key) {
        match raw.trim().parse::<T>() {
            Ok(value) if is_valid(&value) => {
                debug!("{} loaded from environment variable", env_key);
                return value;
            }
            _ => warn!("Ignoring invalid {} value: {:?}", env_key, raw),
        }
    }

    toml_value.unwrap_or(default)
}
