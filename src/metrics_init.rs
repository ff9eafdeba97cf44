//! Prometheus metric descriptions, installed once at startup: a flat list
//! of `describe_counter!`/`describe_gauge!` calls naming every series the
//! handlers and background tasks record against.

use metrics::{describe_counter, describe_gauge};

pub fn initialize_metrics() {
    describe_counter!(
        "nts_registrations_total",
        "Total number of successful node registrations"
    );
    describe_counter!(
        "nts_reconnects_total",
        "Total number of node re-registrations treated as reconnects"
    );
    describe_counter!(
        "nts_registrations_rejected_total",
        "Total number of registrations rejected by the admission policy"
    );
    describe_counter!(
        "nts_heartbeats_total",
        "Total number of heartbeats processed"
    );
    describe_counter!(
        "nts_heartbeats_unknown_node_total",
        "Total number of heartbeats received for an unregistered node"
    );
    describe_counter!(
        "nts_heartbeats_duplicate_total",
        "Total number of heartbeats detected as a duplicate of the previous one"
    );
    describe_counter!(
        "nts_heartbeats_resync_total",
        "Total number of heartbeats answered with a RESYNC action"
    );
    describe_counter!(
        "nts_nodes_expired_total",
        "Total number of nodes expired by the liveness monitor"
    );
    describe_counter!(
        "nts_nodes_decommissioned_total",
        "Total number of nodes that completed decommissioning"
    );
    describe_counter!(
        "nts_nodes_unregistered_total",
        "Total number of voluntary node unregistrations"
    );
    describe_gauge!(
        "nts_registered_nodes",
        "Current number of nodes held in the registry"
    );
    describe_gauge!(
        "nts_running_nodes",
        "Current number of nodes in the RUNNING state"
    );
    describe_gauge!(
        "nts_decommissioning_nodes",
        "Current number of nodes in the DECOMMISSIONING state"
    );
}
