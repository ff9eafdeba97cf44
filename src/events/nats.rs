use tracing::{debug, warn};

use super::{EventDispatcher, NodeEvent};

/// Production `EventDispatcher`: publishes every event as JSON onto a NATS
/// subject using a fire-and-forget publish pattern. Publish failures are
/// logged and swallowed - never propagated into the calling handler.
pub struct NatsEventDispatcher {
    client: async_nats::Client,
    subject_prefix: String,
    runtime: tokio::runtime::Handle,
}

impl NatsEventDispatcher {
    pub async fn connect(nats_url: &str, subject_prefix: impl Into<String>) -> anyhow::Result<Self> {
        let client = async_nats::connect(nats_url).await?;
        Ok(Self {
            client,
            subject_prefix: subject_prefix.into(),
            runtime: tokio::runtime::Handle::current(),
        })
    }

    fn subject_for(&self, event: &NodeEvent) -> String {
        let kind = match event {
            NodeEvent::NodeStarted { .. } => "node_started",
            NodeEvent::NodeReconnect { .. } => "node_reconnect",
            NodeEvent::NodeStatus { .. } => "node_status",
            NodeEvent::NodeStatusEvent { .. } => "node_status_event",
            NodeEvent::NodeRemoved { .. } => "node_removed",
            NodeEvent::ContainerFinished { .. } => "container_finished",
            NodeEvent::Expire { .. } => "node_expire",
        };
        format!("{}.{}", self.subject_prefix, kind)
    }
}

impl EventDispatcher for NatsEventDispatcher {
    fn handle(&self, event: NodeEvent) {
        let subject = self.subject_for(&event);
        let payload = match serde_json::to_vec(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to serialize node event, dropping");
                return;
            }
        };

        let client = self.client.clone();
        self.runtime.spawn(async move {
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                warn!(error = %e, subject = %subject, "failed to publish node event to NATS");
            } else {
                debug!(subject = %subject, "published node event");
            }
        });
    }
}
