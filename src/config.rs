//! Configuration Manager: loads a layered TOML + environment
//! configuration at startup and holds the hot-swappable fields (heartbeat
//! pacing, admission lists) behind a reader-writer guard. Admin endpoints
//! take the writer; every request handler takes the reader - writes are
//! rare.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::RwLock;
use tracing::info;

use crate::types::HeartbeatPacing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPropagationMode {
    /// Labels in the request are authoritative; NTS writes them directly.
    Distributed,
    /// NTS asks a delegated updater to refresh labels; no direct write.
    Delegated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    pub min_version: String,
    pub host_resolution_enabled: bool,
    pub min_alloc_mb: i64,
    pub min_alloc_vcores: i32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            min_version: "NONE".to_string(),
            host_resolution_enabled: false,
            min_alloc_mb: 0,
            min_alloc_vcores: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionLists {
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for AdmissionLists {
    fn default() -> Self {
        Self {
            include: None,
            exclude: Vec::new(),
        }
    }
}

/// Everything read by request handlers under the reader guard, plus the
/// admission/version floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicConfig {
    pub pacing: HeartbeatPacing,
    pub admission: AdmissionConfig,
    pub admission_lists: AdmissionLists,
    pub label_mode: LabelPropagationMode,
    pub timeline_v2_enabled: bool,
    pub work_preserving_recovery_enabled: bool,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            pacing: HeartbeatPacing::default(),
            admission: AdmissionConfig::default(),
            admission_lists: AdmissionLists::default(),
            label_mode: LabelPropagationMode::Distributed,
            timeline_v2_enabled: false,
            work_preserving_recovery_enabled: true,
        }
    }
}

/// Static, process-lifetime configuration - set once at startup, never
/// hot-reloaded (bind addresses, thread counts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind_addr: SocketAddr,
    pub client_threads: usize,
    pub liveness_timeout_ms: u64,
    pub liveness_scan_interval_ms: u64,
    pub nats_url: Option<String>,
    /// Stamped into every `RegisterResponse`; identifies this RM instance
    /// across a restart, letting nodes detect an RM failover.
    pub rm_identifier: i64,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8040".parse().unwrap(),
            metrics_bind_addr: "0.0.0.0:8041".parse().unwrap(),
            client_threads: 8,
            liveness_timeout_ms: 60_000,
            liveness_scan_interval_ms: 5_000,
            nats_url: None,
            rm_identifier: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NtsConfig {
    #[serde(default)]
    pub server: StaticConfig,
    #[serde(default)]
    pub dynamic: DynamicConfig,
}

impl NtsConfig {
    /// Load configuration from an optional file path, layered with
    /// `NTS_`-prefixed environment variables.
    pub fn load(path: Option<&str>) -> crate::error::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("NTS").separator("__"));

        let settings = builder.build()?;
        let mut parsed: NtsConfig = settings.try_deserialize()?;
        parsed.dynamic.pacing.sanitize();
        Ok(parsed)
    }
}

/// Runtime holder for the hot-swappable fields. Reads take the shared
/// guard; admin updates take the exclusive guard - writes are rare.
pub struct ConfigManager {
    dynamic: RwLock<DynamicConfig>,
    pub server: StaticConfig,
}

impl ConfigManager {
    pub fn new(config: NtsConfig) -> Self {
        Self {
            dynamic: RwLock::new(config.dynamic),
            server: config.server,
        }
    }

    pub async fn snapshot(&self) -> DynamicConfig {
        self.dynamic.read().await.clone()
    }

    pub async fn pacing(&self) -> HeartbeatPacing {
        self.dynamic.read().await.pacing.clone()
    }

    pub async fn admission(&self) -> AdmissionConfig {
        self.dynamic.read().await.admission.clone()
    }

    pub async fn admission_lists(&self) -> AdmissionLists {
        self.dynamic.read().await.admission_lists.clone()
    }

    pub async fn label_mode(&self) -> LabelPropagationMode {
        self.dynamic.read().await.label_mode
    }

    pub async fn timeline_v2_enabled(&self) -> bool {
        self.dynamic.read().await.timeline_v2_enabled
    }

    pub async fn work_preserving_recovery_enabled(&self) -> bool {
        self.dynamic.read().await.work_preserving_recovery_enabled
    }

    /// Admin verb: hot-replace heartbeat pacing, sanitizing before commit.
    pub async fn update_pacing(&self, mut pacing: HeartbeatPacing) {
        pacing.sanitize();
        info!(?pacing, "updating heartbeat pacing configuration");
        self.dynamic.write().await.pacing = pacing;
    }

    /// Admin verb: hot-replace admission lists.
    pub async fn update_admission_lists(&self, lists: AdmissionLists) {
        info!(
            include = ?lists.include,
            exclude = ?lists.exclude,
            "updating admission lists"
        );
        self.dynamic.write().await.admission_lists = lists;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_sanitized() {
        let config = NtsConfig::default();
        // Default HeartbeatPacing already satisfies sanitize's invariants.
        let mut pacing = config.dynamic.pacing.clone();
        let before = pacing.clone();
        pacing.sanitize();
        assert_eq!(pacing, before);
    }

    #[tokio::test]
    async fn test_update_pacing_is_visible_to_subsequent_reads() {
        let manager = ConfigManager::new(NtsConfig::default());
        let mut pacing = HeartbeatPacing {
            default_interval_ms: 2000,
            min_interval_ms: 1000,
            max_interval_ms: 5000,
            speedup_factor: 0.5,
            slowdown_factor: 2.0,
            scaling_enabled: true,
        };
        manager.update_pacing(pacing.clone()).await;
        pacing.sanitize();
        assert_eq!(manager.pacing().await, pacing);
    }

    #[tokio::test]
    async fn test_update_admission_lists_is_visible() {
        let manager = ConfigManager::new(NtsConfig::default());
        manager
            .update_admission_lists(AdmissionLists {
                include: Some(vec!["h1".to_string()]),
                exclude: vec![],
            })
            .await;
        let lists = manager.admission_lists().await;
        assert_eq!(lists.include, Some(vec!["h1".to_string()]));
    }
}
