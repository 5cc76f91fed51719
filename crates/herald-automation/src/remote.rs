//! Remote-data contract and remote configuration
//!
//! Remote data is the source of truth for remote-data-sourced schedules.
//! The core only needs to know whether a schedule's metadata snapshot is
//! still current; stale schedules are invalidated instead of displayed.
//!
//! This module also parses the in-app section of the remote config map,
//! currently just the tag-group cache tuning knobs.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Staleness oracle backed by the remote-data pipeline.
pub trait RemoteDataSource: Send + Sync {
    /// Whether the given metadata snapshot matches the latest known
    /// remote-data payload. `None` metadata (app-defined schedules) is
    /// always current.
    fn is_metadata_current(&self, metadata: Option<&Value>) -> bool;
}

/// Default tag-group cache max age.
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(600);
/// Default window during which stale cache reads are still served.
pub const DEFAULT_CACHE_STALE_READ_AGE: Duration = Duration::from_secs(3600);
/// Default window during which local tag data is preferred over the cache.
pub const DEFAULT_PREFER_LOCAL_UNTIL: Duration = Duration::from_secs(600);

/// Tag-group cache tuning delivered through remote config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroupConfig {
    pub enabled: bool,
    pub cache_max_age: Duration,
    pub cache_stale_read_age: Duration,
    pub cache_prefer_local_until: Duration,
}

impl Default for TagGroupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            cache_stale_read_age: DEFAULT_CACHE_STALE_READ_AGE,
            cache_prefer_local_until: DEFAULT_PREFER_LOCAL_UNTIL,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTagGroupConfig {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    cache_max_age_seconds: Option<u64>,
    #[serde(default)]
    cache_stale_read_age_seconds: Option<u64>,
    #[serde(default)]
    cache_prefer_local_until_seconds: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// In-app section of the remote configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InAppRemoteConfig {
    pub tag_groups: TagGroupConfig,
}

impl InAppRemoteConfig {
    /// Parse the config map, falling back to defaults for anything absent
    /// or malformed. A `None` map resets everything to defaults.
    pub fn from_config(config: Option<&Value>) -> Self {
        let raw = config
            .and_then(|value| value.get("tag_groups"))
            .and_then(|value| {
                serde_json::from_value::<RawTagGroupConfig>(value.clone())
                    .map_err(|err| {
                        tracing::warn!(error = %err, "Ignoring malformed tag_groups config");
                        err
                    })
                    .ok()
            });

        let tag_groups = match raw {
            Some(raw) => TagGroupConfig {
                enabled: raw.enabled,
                cache_max_age: raw
                    .cache_max_age_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_CACHE_MAX_AGE),
                cache_stale_read_age: raw
                    .cache_stale_read_age_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_CACHE_STALE_READ_AGE),
                cache_prefer_local_until: raw
                    .cache_prefer_local_until_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_PREFER_LOCAL_UNTIL),
            },
            None => TagGroupConfig::default(),
        };

        Self { tag_groups }
    }
}
