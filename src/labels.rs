//! Label & Attribute Propagation. Two mutually exclusive label modes,
//! and an attributes path that is always distributed and always
//! prefix-filtered.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::config::LabelPropagationMode;
use crate::types::{NodeAttribute, NodeId};

pub const DISTRIBUTED_ATTRIBUTE_PREFIX: &str = "nts.distributed.";

#[derive(Debug, Clone)]
pub struct LabelUpdateOutcome {
    pub accepted: bool,
    pub diagnostic: Option<String>,
}

/// Distributed-labels collaborator: `replaceLabelsOnNode`.
pub trait NodeLabelManager: Send + Sync {
    fn replace_labels_on_node(
        &self,
        updates: &HashMap<NodeId, Vec<String>>,
    ) -> Result<(), String>;
}

/// Delegated-centralized collaborator.
pub trait DelegatedNodeLabelsUpdater: Send + Sync {
    fn update_node_labels(&self, node_id: &NodeId) -> Result<(), String>;
}

/// Attributes collaborator.
pub trait NodeAttributesManager: Send + Sync {
    fn get_attributes_for_node(&self, host: &str) -> Vec<NodeAttribute>;
    fn replace(&self, prefix: &str, host: &str, attributes: Vec<NodeAttribute>) -> Result<(), String>;
}

/// Run the label half of propagation for one request, returning whether
/// the RM accepted the labels and any diagnostic text to fold into the
/// response.
pub fn propagate_labels(
    mode: LabelPropagationMode,
    node_id: &NodeId,
    labels: Option<&[String]>,
    label_manager: &dyn NodeLabelManager,
    delegated_updater: &dyn DelegatedNodeLabelsUpdater,
) -> LabelUpdateOutcome {
    match mode {
        LabelPropagationMode::Distributed => {
            let Some(labels) = labels else {
                return LabelUpdateOutcome {
                    accepted: true,
                    diagnostic: None,
                };
            };
            let mut updates = HashMap::new();
            updates.insert(node_id.clone(), labels.to_vec());
            match label_manager.replace_labels_on_node(&updates) {
                Ok(()) => LabelUpdateOutcome {
                    accepted: true,
                    diagnostic: None,
                },
                Err(message) => LabelUpdateOutcome {
                    accepted: false,
                    diagnostic: Some(message),
                },
            }
        }
        LabelPropagationMode::Delegated => match delegated_updater.update_node_labels(node_id) {
            Ok(()) => LabelUpdateOutcome {
                accepted: true,
                diagnostic: None,
            },
            Err(message) => LabelUpdateOutcome {
                accepted: false,
                diagnostic: Some(message),
            },
        },
    }
}

/// Run the attributes half of propagation. Attributes are always distributed and
/// always filtered to `DISTRIBUTED_ATTRIBUTE_PREFIX`; any attribute whose
/// prefix does not match that reserved value rejects the whole batch.
pub fn propagate_attributes(
    node_id: &NodeId,
    attributes: Option<&[NodeAttribute]>,
    attributes_manager: &dyn NodeAttributesManager,
) -> LabelUpdateOutcome {
    let Some(attributes) = attributes else {
        return LabelUpdateOutcome {
            accepted: true,
            diagnostic: None,
        };
    };

    if let Some(bad) = attributes
        .iter()
        .find(|a| a.prefix != DISTRIBUTED_ATTRIBUTE_PREFIX)
    {
        return LabelUpdateOutcome {
            accepted: false,
            diagnostic: Some(format!(
                "attribute {} uses non-distributed prefix {}",
                bad.name, bad.prefix
            )),
        };
    }

    let incoming: HashSet<(String, String)> = attributes
        .iter()
        .map(|a| (a.name.clone(), a.value.clone()))
        .collect();
    let current: HashSet<(String, String)> = attributes_manager
        .get_attributes_for_node(&node_id.host)
        .into_iter()
        .map(|a| (a.name, a.value))
        .collect();

    if incoming == current {
        return LabelUpdateOutcome {
            accepted: true,
            diagnostic: None,
        };
    }

    match attributes_manager.replace(
        DISTRIBUTED_ATTRIBUTE_PREFIX,
        &node_id.host,
        attributes.to_vec(),
    ) {
        Ok(()) => LabelUpdateOutcome {
            accepted: true,
            diagnostic: None,
        },
        Err(message) => LabelUpdateOutcome {
            accepted: false,
            diagnostic: Some(message),
        },
    }
}

// ---------------------------------------------------------------------
// In-memory default implementations, for tests and single-process runs.
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryLabelManager {
    labels: Mutex<HashMap<NodeId, Vec<String>>>,
    fail_next: Mutex<Option<String>>,
}

impl InMemoryLabelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_call(&self, message: impl Into<String>) {
        *self.fail_next.lock().unwrap() = Some(message.into());
    }

    pub fn labels_for(&self, node_id: &NodeId) -> Option<Vec<String>> {
        self.labels.lock().unwrap().get(node_id).cloned()
    }
}

impl NodeLabelManager for InMemoryLabelManager {
    fn replace_labels_on_node(&self, updates: &HashMap<NodeId, Vec<String>>) -> Result<(), String> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(message);
        }
        self.labels.lock().unwrap().extend(updates.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryDelegatedUpdater {
    calls: Mutex<Vec<NodeId>>,
}

impl InMemoryDelegatedUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<NodeId> {
        self.calls.lock().unwrap().clone()
    }
}

impl DelegatedNodeLabelsUpdater for InMemoryDelegatedUpdater {
    fn update_node_labels(&self, node_id: &NodeId) -> Result<(), String> {
        self.calls.lock().unwrap().push(node_id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAttributesManager {
    attributes: Mutex<HashMap<String, Vec<NodeAttribute>>>,
    replace_calls: Mutex<u32>,
}

impl InMemoryAttributesManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_call_count(&self) -> u32 {
        *self.replace_calls.lock().unwrap()
    }
}

impl NodeAttributesManager for InMemoryAttributesManager {
    fn get_attributes_for_node(&self, host: &str) -> Vec<NodeAttribute> {
        self.attributes
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_default()
    }

    fn replace(&self, _prefix: &str, host: &str, attributes: Vec<NodeAttribute>) -> Result<(), String> {
        *self.replace_calls.lock().unwrap() += 1;
        self.attributes
            .lock()
            .unwrap()
            .insert(host.to_string(), attributes);
        Ok(())
    }
}
