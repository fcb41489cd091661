// src/ingest/config.rs
use serde::Deserialize;

use crate::config::env_or;

pub const ENV_PRIMARY_WINDOW_DAYS: &str = "PIPELINE_PRIMARY_WINDOW_DAYS";
pub const ENV_SUPPLEMENT_FLOOR_CAP: &str = "PIPELINE_SUPPLEMENT_FLOOR_CAP";
pub const ENV_LAST_RESORT_FLOOR: &str = "PIPELINE_LAST_RESORT_FLOOR";

/// Fallback thresholds for the aggregation pipeline.
///
/// These are tuning knobs, not semantic constants: the defaults reproduce the
/// historical behaviour of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PipelineConfig {
    /// Historical window the live source can serve; longer requests always
    /// pull in the static dataset.
    #[serde(default = "default_primary_window_days")]
    pub primary_window_days: u32,
    /// Upper bound of the supplement floor `min(cap, max_results / 2)`.
    #[serde(default = "default_supplement_floor_cap")]
    pub supplement_floor_cap: usize,
    /// Below this many merged items the hardcoded fallback is consulted.
    #[serde(default = "default_last_resort_floor")]
    pub last_resort_floor: usize,
}

fn default_primary_window_days() -> u32 {
    30
}
fn default_supplement_floor_cap() -> usize {
    30
}
fn default_last_resort_floor() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            primary_window_days: default_primary_window_days(),
            supplement_floor_cap: default_supplement_floor_cap(),
            last_resort_floor: default_last_resort_floor(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            primary_window_days: env_or(ENV_PRIMARY_WINDOW_DAYS, default_primary_window_days()),
            supplement_floor_cap: env_or(ENV_SUPPLEMENT_FLOOR_CAP, default_supplement_floor_cap()),
            last_resort_floor: env_or(ENV_LAST_RESORT_FLOOR, default_last_resort_floor()),
        }
    }

    /// Primary yield below this pulls in the secondary source.
    pub fn supplement_floor(&self, max_results: usize) -> usize {
        self.supplement_floor_cap.min(max_results / 2)
    }

    pub fn needs_supplement(&self, days: u32, primary_count: usize, max_results: usize) -> bool {
        days > self.primary_window_days || primary_count < self.supplement_floor(max_results)
    }

    pub fn needs_last_resort(&self, merged_count: usize) -> bool {
        merged_count == 0 || merged_count < self.last_resort_floor
    }
}
