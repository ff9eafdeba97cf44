//! Admission Policy: stateless predicates consulted by `Register` (and
//! re-checked on `Heartbeat`) in fixed order. First failure wins.

use std::net::IpAddr;

use crate::config::AdmissionConfig;
use crate::types::{NodeState, ResourceCapability};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionFailure(pub String);

impl std::fmt::Display for AdmissionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolvable host, as seen from the resource manager's point of view.
/// Implementations back this with real DNS (or the NTS rack/host view);
/// tests use a `HashSet`-backed stub.
pub trait HostResolver: Send + Sync {
    fn resolves(&self, host: &str) -> bool;
}

pub struct AlwaysResolves;
impl HostResolver for AlwaysResolves {
    fn resolves(&self, _host: &str) -> bool {
        true
    }
}

/// "Include/exclude list" and "is this node already decommissioning"
/// membership checks.
pub trait NodesListManager: Send + Sync {
    fn is_valid_node(&self, host: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct AdmissionListManager {
    include: Option<std::collections::HashSet<String>>,
    exclude: std::collections::HashSet<String>,
}

impl AdmissionListManager {
    pub fn new(include: Option<Vec<String>>, exclude: Vec<String>) -> Self {
        Self {
            include: include.map(|v| v.into_iter().collect()),
            exclude: exclude.into_iter().collect(),
        }
    }
}

impl NodesListManager for AdmissionListManager {
    fn is_valid_node(&self, host: &str) -> bool {
        if self.exclude.contains(host) {
            return false;
        }
        match &self.include {
            Some(include) => include.contains(host),
            None => true,
        }
    }
}

/// Compare two dot-separated version strings lexicographically on their
/// integer components; missing trailing components read as 0.
pub fn version_at_least(reported: &str, floor: &str) -> bool {
    let reported_parts = parse_version(reported);
    let floor_parts = parse_version(floor);
    let len = reported_parts.len().max(floor_parts.len());
    for i in 0..len {
        let r = reported_parts.get(i).copied().unwrap_or(0);
        let f = floor_parts.get(i).copied().unwrap_or(0);
        if r != f {
            return r > f;
        }
    }
    true
}

fn parse_version(v: &str) -> Vec<u64> {
    v.split('.').map(|c| c.parse().unwrap_or(0)).collect()
}

/// Run the fixed-order admission sequence for a `Register` call.
/// `already_decommissioning` lets the include/exclude check be bypassed
/// for nodes already draining.
#[allow(clippy::too_many_arguments)]
pub fn admit_register(
    config: &AdmissionConfig,
    host: &str,
    remote_ip: Option<IpAddr>,
    reported_version: &str,
    host_resolver: &dyn HostResolver,
    nodes_list: &dyn NodesListManager,
    already_decommissioning: bool,
    reported_capability: &ResourceCapability,
) -> Result<(), AdmissionFailure> {
    check_version(config, reported_version)?;
    check_host_resolution(config, host, remote_ip, host_resolver)?;
    check_admission_list(host, nodes_list, already_decommissioning)?;
    check_min_allocation(config, reported_capability)?;
    Ok(())
}

/// The subset of admission re-run on every heartbeat: admission list
/// membership only, and only when the node is not decommissioning.
pub fn admit_heartbeat(
    host: &str,
    nodes_list: &dyn NodesListManager,
    state: NodeState,
) -> Result<(), AdmissionFailure> {
    check_admission_list(host, nodes_list, state == NodeState::Decommissioning)
}

fn check_version(config: &AdmissionConfig, reported_version: &str) -> Result<(), AdmissionFailure> {
    if config.min_version.eq_ignore_ascii_case("NONE") {
        return Ok(());
    }
    let floor = if config.min_version.eq_ignore_ascii_case("EqualToRM") {
        env!("CARGO_PKG_VERSION")
    } else {
        config.min_version.as_str()
    };
    if version_at_least(reported_version, floor) {
        Ok(())
    } else {
        Err(AdmissionFailure(format!(
            "node version {} is lower than the minimum allowed version {}",
            reported_version, floor
        )))
    }
}

fn check_host_resolution(
    config: &AdmissionConfig,
    host: &str,
    remote_ip: Option<IpAddr>,
    host_resolver: &dyn HostResolver,
) -> Result<(), AdmissionFailure> {
    if !config.host_resolution_enabled {
        return Ok(());
    }
    if remote_ip.is_some() && !host_resolver.resolves(host) {
        return Err(AdmissionFailure(format!(
            "unable to resolve declared host {} to an address",
            host
        )));
    }
    Ok(())
}

fn check_admission_list(
    host: &str,
    nodes_list: &dyn NodesListManager,
    already_decommissioning: bool,
) -> Result<(), AdmissionFailure> {
    if already_decommissioning {
        return Ok(());
    }
    if nodes_list.is_valid_node(host) {
        Ok(())
    } else {
        Err(AdmissionFailure(format!(
            "host {} is not a valid node per the admission lists",
            host
        )))
    }
}

fn check_min_allocation(
    config: &AdmissionConfig,
    capability: &ResourceCapability,
) -> Result<(), AdmissionFailure> {
    if capability.meets_minimum(config.min_alloc_mb, config.min_alloc_vcores) {
        Ok(())
    } else {
        Err(AdmissionFailure(format!(
            "reported capability {}MB/{}vcores is below the minimum allocation {}MB/{}vcores",
            capability.memory_mb,
            capability.vcores,
            config.min_alloc_mb,
            config.min_alloc_vcores
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdmissionConfig {
        AdmissionConfig {
            min_version: "3.0.0".to_string(),
            host_resolution_enabled: false,
            min_alloc_mb: 1024,
            min_alloc_vcores: 1,
        }
    }

    #[test]
    fn test_version_comparison_basic() {
        assert!(version_at_least("3.4.0", "3.0.0"));
        assert!(!version_at_least("3.3.9", "3.4.0"));
        assert!(version_at_least("3.4.0", "3.4.0"));
    }

    #[test]
    fn test_version_comparison_missing_components() {
        assert!(version_at_least("3.4", "3.4.0"));
        assert!(!version_at_least("3.4", "3.4.1"));
    }

    #[test]
    fn test_version_floor_none_always_passes() {
        let mut config = config();
        config.min_version = "NONE".to_string();
        assert!(check_version(&config, "0.0.1").is_ok());
    }

    #[test]
    fn test_version_floor_equal_to_rm() {
        let mut config = config();
        config.min_version = "EqualToRM".to_string();
        assert!(check_version(&config, env!("CARGO_PKG_VERSION")).is_ok());
    }

    #[test]
    fn test_version_rejection_message_has_both_versions() {
        let mut config = config();
        config.min_version = "3.4.0".to_string();
        let err = check_version(&config, "3.3.9").unwrap_err();
        assert!(err.0.contains("3.3.9"));
        assert!(err.0.contains("3.4.0"));
    }

    #[test]
    fn test_admission_list_exclude_wins() {
        let list = AdmissionListManager::new(Some(vec!["h1".to_string()]), vec!["h1".to_string()]);
        assert!(!list.is_valid_node("h1"));
    }

    #[test]
    fn test_admission_list_include_required_when_set() {
        let list = AdmissionListManager::new(Some(vec!["h1".to_string()]), vec![]);
        assert!(list.is_valid_node("h1"));
        assert!(!list.is_valid_node("h2"));
    }

    #[test]
    fn test_admission_list_no_include_means_open() {
        let list = AdmissionListManager::new(None, vec!["bad".to_string()]);
        assert!(list.is_valid_node("anything"));
        assert!(!list.is_valid_node("bad"));
    }

    #[test]
    fn test_decommissioning_node_bypasses_admission_list() {
        let list = AdmissionListManager::new(Some(vec![]), vec!["h1".to_string()]);
        assert!(check_admission_list("h1", &list, true).is_ok());
        assert!(check_admission_list("h1", &list, false).is_err());
    }

    #[test]
    fn test_min_allocation() {
        let config = config();
        assert!(check_min_allocation(&config, &ResourceCapability::new(1024, 1)).is_ok());
        assert!(check_min_allocation(&config, &ResourceCapability::new(512, 1)).is_err());
    }

    #[test]
    fn test_admit_register_fixed_order_version_first() {
        let config = AdmissionConfig {
            min_version: "3.4.0".to_string(),
            host_resolution_enabled: false,
            min_alloc_mb: 99999,
            min_alloc_vcores: 99,
        };
        let list = AdmissionListManager::new(None, vec![]);
        // Both version and min-alloc would fail; version must be reported
        // first per the fixed-order requirement.
        let err = admit_register(
            &config,
            "h1",
            None,
            "3.3.9",
            &AlwaysResolves,
            &list,
            false,
            &ResourceCapability::new(1, 1),
        )
        .unwrap_err();
        assert!(err.0.contains("version"));
    }
}
