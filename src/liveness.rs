//! Liveness Monitor: tracks last-ping time per registered node and
//! expires nodes past a deadline. Contract to the rest of NTS is exactly
//! three verbs: `register`, `unregister`, `received_ping`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use metrics::counter;
use tracing::{debug, warn};

use crate::events::{EventDispatcher, NodeEvent};
use crate::registry::NodeRegistry;
use crate::types::NodeId;

#[derive(Debug)]
struct Deadline {
    expires_at: Instant,
    node_id: NodeId,
    /// Monotonically increasing per-node generation. A `received_ping`
    /// bumps the generation so stale heap entries from before the ping
    /// can be recognized and discarded during a scan instead of acted on.
    generation: u64,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.expires_at == other.expires_at
    }
}
impl Eq for Deadline {}
impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.expires_at.cmp(&other.expires_at)
    }
}

struct Inner {
    heap: BinaryHeap<Reverse<Deadline>>,
    generations: std::collections::HashMap<NodeId, u64>,
}

pub struct LivenessMonitor {
    timeout: Duration,
    inner: Mutex<Inner>,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                generations: std::collections::HashMap::new(),
            }),
        }
    }

    pub fn register(&self, node_id: &NodeId) {
        self.schedule(node_id.clone());
    }

    pub fn unregister(&self, node_id: &NodeId) {
        let mut inner = self.inner.lock().unwrap();
        inner.generations.remove(node_id);
    }

    pub fn received_ping(&self, node_id: &NodeId) {
        self.schedule(node_id.clone());
    }

    fn schedule(&self, node_id: NodeId) {
        let mut inner = self.inner.lock().unwrap();
        let generation = inner.generations.entry(node_id.clone()).or_insert(0);
        *generation += 1;
        let generation = *generation;
        inner.heap.push(Reverse(Deadline {
            expires_at: Instant::now() + self.timeout,
            node_id,
            generation,
        }));
    }

    /// Scan for nodes whose most recent schedule has passed its deadline.
    /// Called by the background expiry task; returns the ids that expired
    /// this scan (and have been unregistered internally).
    fn scan_expired(&self, now: Instant) -> Vec<NodeId> {
        let mut inner = self.inner.lock().unwrap();
        let mut expired = Vec::new();
        while let Some(Reverse(top)) = inner.heap.peek() {
            if top.expires_at > now {
                break;
            }
            let Reverse(deadline) = inner.heap.pop().unwrap();
            let current_generation = inner.generations.get(&deadline.node_id).copied();
            if current_generation == Some(deadline.generation) {
                inner.generations.remove(&deadline.node_id);
                expired.push(deadline.node_id);
            }
            // else: a newer ping superseded this entry, discard silently.
        }
        expired
    }

    /// Drive the background scan loop. Runs until the process exits;
    /// intended to be spawned once at server start.
    pub async fn run_expiry_loop(
        self: std::sync::Arc<Self>,
        registry: std::sync::Arc<NodeRegistry>,
        events: std::sync::Arc<dyn EventDispatcher>,
        scan_interval: Duration,
    ) {
        let mut ticker = tokio::time::interval(scan_interval);
        loop {
            ticker.tick().await;
            let expired = self.scan_expired(Instant::now());
            for node_id in expired {
                if registry.remove(&node_id).is_some() {
                    warn!(node_id = %node_id, "node expired: no heartbeat within timeout");
                    counter!("nts_nodes_expired_total", 1);
                    events.handle(NodeEvent::Expire {
                        node_id: node_id.clone(),
                    });
                } else {
                    debug!(node_id = %node_id, "expiry fired for already-removed node");
                }
            }
        }
    }
}

impl std::fmt::Debug for LivenessMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessMonitor")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_before_deadline_prevents_expiry() {
        let monitor = LivenessMonitor::new(Duration::from_millis(50));
        let id = NodeId::new("h1", 1);
        monitor.register(&id);
        std::thread::sleep(Duration::from_millis(10));
        monitor.received_ping(&id);

        // The original deadline would have passed by now relative to
        // register(), but the later ping superseded it.
        let expired = monitor.scan_expired(Instant::now());
        assert!(expired.is_empty());
    }

    #[test]
    fn test_expiry_after_timeout() {
        let monitor = LivenessMonitor::new(Duration::from_millis(10));
        let id = NodeId::new("h1", 1);
        monitor.register(&id);
        std::thread::sleep(Duration::from_millis(30));

        let expired = monitor.scan_expired(Instant::now());
        assert_eq!(expired, vec![id]);
    }

    #[test]
    fn test_unregister_prevents_expiry() {
        let monitor = LivenessMonitor::new(Duration::from_millis(10));
        let id = NodeId::new("h1", 1);
        monitor.register(&id);
        monitor.unregister(&id);
        std::thread::sleep(Duration::from_millis(30));

        let expired = monitor.scan_expired(Instant::now());
        assert!(expired.is_empty());
    }
}
