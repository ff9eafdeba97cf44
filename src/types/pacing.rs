use serde::{Deserialize, Serialize};
use tracing::warn;

/// Compile-time fallback heartbeat interval, used whenever a loaded
/// configuration fails validation.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1_000;

/// Per-cluster heartbeat pacing configuration. Validated on load and on
/// every admin hot-reload via `sanitize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatPacing {
    pub default_interval_ms: u64,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub speedup_factor: f64,
    pub slowdown_factor: f64,
    pub scaling_enabled: bool,
}

impl Default for HeartbeatPacing {
    fn default() -> Self {
        Self {
            default_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            min_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            max_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            speedup_factor: 1.0,
            slowdown_factor: 1.0,
            scaling_enabled: false,
        }
    }
}

impl HeartbeatPacing {
    /// Apply validation rules in place, warning for each correction made.
    /// Idempotent: sanitizing an already-valid config is a no-op.
    pub fn sanitize(&mut self) {
        if self.default_interval_ms == 0 {
            warn!(
                "heartbeat default interval must be positive, resetting to {}ms",
                DEFAULT_HEARTBEAT_INTERVAL_MS
            );
            self.default_interval_ms = DEFAULT_HEARTBEAT_INTERVAL_MS;
        }

        let d = self.default_interval_ms;
        if !(self.min_interval_ms > 0
            && self.min_interval_ms <= d
            && d <= self.max_interval_ms)
        {
            warn!(
                min = self.min_interval_ms,
                default = d,
                max = self.max_interval_ms,
                "invalid heartbeat min/max bounds, collapsing to default"
            );
            self.min_interval_ms = d;
            self.max_interval_ms = d;
        }

        if !(self.speedup_factor >= 0.0) || !(self.slowdown_factor >= 0.0) {
            warn!("invalid heartbeat speedup/slowdown factor, resetting to defaults");
            self.speedup_factor = 1.0;
            self.slowdown_factor = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_zero_default() {
        let mut p = HeartbeatPacing {
            default_interval_ms: 0,
            min_interval_ms: 500,
            max_interval_ms: 5000,
            speedup_factor: 1.0,
            slowdown_factor: 1.0,
            scaling_enabled: true,
        };
        p.sanitize();
        assert_eq!(p.default_interval_ms, DEFAULT_HEARTBEAT_INTERVAL_MS);
    }

    #[test]
    fn test_sanitize_bad_bounds_collapses_to_default() {
        let mut p = HeartbeatPacing {
            default_interval_ms: 1000,
            min_interval_ms: 2000, // min > default: invalid
            max_interval_ms: 5000,
            speedup_factor: 1.0,
            slowdown_factor: 1.0,
            scaling_enabled: true,
        };
        p.sanitize();
        assert_eq!(p.min_interval_ms, 1000);
        assert_eq!(p.max_interval_ms, 1000);
    }

    #[test]
    fn test_sanitize_negative_factors() {
        let mut p = HeartbeatPacing {
            default_interval_ms: 1000,
            min_interval_ms: 500,
            max_interval_ms: 5000,
            speedup_factor: -1.0,
            slowdown_factor: 2.0,
            scaling_enabled: true,
        };
        p.sanitize();
        assert_eq!(p.speedup_factor, 1.0);
        assert_eq!(p.slowdown_factor, 1.0);
    }

    #[test]
    fn test_sanitize_valid_config_untouched() {
        let mut p = HeartbeatPacing {
            default_interval_ms: 1000,
            min_interval_ms: 500,
            max_interval_ms: 5000,
            speedup_factor: 0.5,
            slowdown_factor: 1.5,
            scaling_enabled: true,
        };
        let before = p.clone();
        p.sanitize();
        assert_eq!(p, before);
    }
}
