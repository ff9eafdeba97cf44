use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node agent: the `(host, port)` pair it registered with.
///
/// `NodeId` is a value type - two ids with the same host/port compare
/// equal and hash equal regardless of when they were constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub host: String,
    pub port: u32,
}

impl NodeId {
    pub fn new(host: impl Into<String>, port: u32) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
