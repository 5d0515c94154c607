//! Engine configuration.
//!
//! Every field has a serde default so a partial JSON document (or none at
//! all) yields a usable configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::units::{Distance, Meters};

fn default_hiding_radius() -> Distance {
    Distance::miles(0.5)
}

fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_circle_steps() -> usize {
    360
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_initial_radius() -> Distance {
    Distance::new(25.0, crate::units::DistanceUnit::Kilometers)
}

fn default_max_radius() -> Distance {
    Distance::new(400.0, crate::units::DistanceUnit::Kilometers)
}

fn default_max_iterations() -> u32 {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Radius of the circle a hider may roam around their station
    #[serde(default = "default_hiding_radius")]
    pub hiding_radius: Distance,

    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Vertices used to approximate a geodesic circle
    #[serde(default = "default_circle_steps")]
    pub circle_steps: usize,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub search: SearchPolicy,

    /// SQLite file for the permanent cache tier. Kept in memory when unset.
    #[serde(default)]
    pub permanent_cache_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            hiding_radius: default_hiding_radius(),
            overpass_url: default_overpass_url(),
            request_timeout_secs: default_request_timeout_secs(),
            circle_steps: default_circle_steps(),
            retry: RetryPolicy::default(),
            search: SearchPolicy::default(),
            permanent_cache_path: None,
        }
    }
}

impl EngineConfig {
    pub fn hiding_radius_m(&self) -> Meters {
        self.hiding_radius.meters()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Bounded exponential backoff for remote lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2×base, 4×base, ...
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Bounds for the expanding-radius landmark search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPolicy {
    #[serde(default = "default_initial_radius")]
    pub initial_radius: Distance,
    #[serde(default = "default_max_radius")]
    pub max_radius: Distance,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        SearchPolicy {
            initial_radius: default_initial_radius(),
            max_radius: default_max_radius(),
            max_iterations: default_max_iterations(),
        }
    }
}
