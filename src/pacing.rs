//! Heartbeat Pacing Controller. The mapping from per-node signals to the
//! chosen interval is bound to `[min, max]`, pure, and unit-testable,
//! driven by how many container updates are pending versus how many
//! consecutive idle ticks the node has reported. The exact formula is
//! recorded in DESIGN.md.

use std::time::Duration;

use crate::types::HeartbeatPacing;

/// Per-node signal consulted by the pacing controller, read off the node
/// record's most recent heartbeat.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacingSignal {
    /// Container updates the agent has queued to report.
    pub pending_container_updates: u32,
    /// Consecutive heartbeats with nothing new to report.
    pub idle_ticks: u32,
}

/// Number of pending updates at which the interval reaches `min`.
const SPEEDUP_SATURATION: u32 = 10;
/// Number of idle ticks at which the interval reaches `max`.
const SLOWDOWN_SATURATION: u32 = 20;

/// Compute the next heartbeat interval for a node. When pacing is
/// disabled, always returns `default_interval_ms` unconditionally.
pub fn calculate_next_interval(pacing: &HeartbeatPacing, signal: PacingSignal) -> Duration {
    if !pacing.scaling_enabled {
        return Duration::from_millis(pacing.default_interval_ms);
    }

    let default = pacing.default_interval_ms as f64;
    let min = pacing.min_interval_ms as f64;
    let max = pacing.max_interval_ms as f64;

    let interval_ms = if signal.pending_container_updates > 0 {
        // Speed up: shrink from default toward min as pending work grows.
        let urgency = (signal.pending_container_updates.min(SPEEDUP_SATURATION) as f64)
            / SPEEDUP_SATURATION as f64;
        let shrink = (default - min) * urgency * pacing.speedup_factor.min(1.0).max(0.0);
        (default - shrink).max(min)
    } else if signal.idle_ticks > 0 {
        // Slow down: grow from default toward max as idle ticks accrue.
        let laziness =
            (signal.idle_ticks.min(SLOWDOWN_SATURATION) as f64) / SLOWDOWN_SATURATION as f64;
        let grow = (max - default) * laziness * pacing.slowdown_factor.min(1.0).max(0.0);
        (default + grow).min(max)
    } else {
        default
    };

    Duration::from_millis(interval_ms.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacing(scaling_enabled: bool) -> HeartbeatPacing {
        HeartbeatPacing {
            default_interval_ms: 1000,
            min_interval_ms: 200,
            max_interval_ms: 5000,
            speedup_factor: 1.0,
            slowdown_factor: 1.0,
            scaling_enabled,
        }
    }

    #[test]
    fn test_disabled_always_returns_default() {
        let p = pacing(false);
        let interval = calculate_next_interval(
            &p,
            PacingSignal {
                pending_container_updates: 1000,
                idle_ticks: 0,
            },
        );
        assert_eq!(interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_no_signal_returns_default() {
        let p = pacing(true);
        let interval = calculate_next_interval(&p, PacingSignal::default());
        assert_eq!(interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_pending_updates_speeds_up_toward_min() {
        let p = pacing(true);
        let interval = calculate_next_interval(
            &p,
            PacingSignal {
                pending_container_updates: SPEEDUP_SATURATION * 2,
                idle_ticks: 0,
            },
        );
        assert_eq!(interval, Duration::from_millis(200));
    }

    #[test]
    fn test_idle_slows_down_toward_max() {
        let p = pacing(true);
        let interval = calculate_next_interval(
            &p,
            PacingSignal {
                pending_container_updates: 0,
                idle_ticks: SLOWDOWN_SATURATION * 2,
            },
        );
        assert_eq!(interval, Duration::from_millis(5000));
    }

    #[test]
    fn test_result_always_bounded() {
        let p = pacing(true);
        for pending in [0, 1, 5, 50, 1000] {
            let interval = calculate_next_interval(
                &p,
                PacingSignal {
                    pending_container_updates: pending,
                    idle_ticks: 0,
                },
            );
            assert!(interval.as_millis() as u64 >= p.min_interval_ms);
            assert!(interval.as_millis() as u64 <= p.max_interval_ms);
        }
    }
}
