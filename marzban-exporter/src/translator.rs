//! Translation of control-plane resources into a [`MetricSet`].

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::client::{ControlPlane, Resource};
use crate::error::FetchError;
use crate::mapping::{flag, label, number, records};
use crate::metrics::{self, MetricSet};

/// Builds a fresh metric set per scrape from an injected control plane.
pub struct Translator<C> {
    client: C,
}

/// Shareable translator handle.
pub type SharedTranslator<C> = Arc<Translator<C>>;

impl<C: ControlPlane> Translator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetch all five resources in order and map them.
    ///
    /// The first failed fetch aborts the scrape; no partial set is returned.
    pub async fn render(&self) -> Result<MetricSet, FetchError> {
        let started = Instant::now();
        let mut set = MetricSet::new();

        let nodes = self.client.fetch(Resource::Nodes).await?;
        map_nodes(&nodes, &mut set);

        let usage = self.client.fetch(Resource::NodesUsage).await?;
        map_nodes_usage(&usage, &mut set);

        let system = self.client.fetch(Resource::System).await?;
        map_system(&system, &mut set);

        let core = self.client.fetch(Resource::Core).await?;
        map_core(&core, &mut set);

        let users = self.client.fetch(Resource::Users).await?;
        map_users(&users, &mut set);

        debug!(
            samples = set.sample_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scrape translated"
        );

        Ok(set)
    }
}

/// `/nodes`: usage coefficient and the node_info presence metric.
pub fn map_nodes(document: &Value, set: &mut MetricSet) {
    for node in records(document, "nodes") {
        let node_name = label(node, "name");

        set.add(
            &metrics::NODE_USAGE_COEFFICIENT,
            vec![node_name.clone()],
            number(node, "usage_coefficient"),
        );
        set.add(
            &metrics::NODE_INFO,
            vec![
                node_name,
                label(node, "address"),
                label(node, "port"),
                label(node, "api_port"),
                label(node, "xray_version"),
                label(node, "status"),
            ],
            1.0,
        );
    }
}

/// `/nodes/usage`: per-node traffic. Not joined with `/nodes`.
pub fn map_nodes_usage(document: &Value, set: &mut MetricSet) {
    for usage in records(document, "usages") {
        let node_name = label(usage, "node_name");

        set.add(
            &metrics::NODE_UPLINK_BYTES,
            vec![node_name.clone()],
            number(usage, "uplink"),
        );
        set.add(
            &metrics::NODE_DOWNLINK_BYTES,
            vec![node_name],
            number(usage, "downlink"),
        );
    }
}

/// `/system`: singleton gauges.
pub fn map_system(document: &Value, set: &mut MetricSet) {
    set.set(&metrics::SYSTEM_VERSION, 1.0);
    set.set(&metrics::SYSTEM_MEMORY_TOTAL_BYTES, number(document, "mem_total"));
    set.set(&metrics::SYSTEM_MEMORY_USED_BYTES, number(document, "mem_used"));
    set.set(&metrics::SYSTEM_CPU_USAGE_PERCENT, number(document, "cpu_usage"));
    set.set(&metrics::SYSTEM_TOTAL_USERS, number(document, "total_user"));
    set.set(&metrics::SYSTEM_ACTIVE_USERS, number(document, "users_active"));
    set.set(
        &metrics::SYSTEM_INCOMING_BANDWIDTH_BYTES,
        number(document, "incoming_bandwidth"),
    );
    set.set(
        &metrics::SYSTEM_OUTGOING_BANDWIDTH_BYTES,
        number(document, "outgoing_bandwidth"),
    );
}

/// `/core`: started flag.
pub fn map_core(document: &Value, set: &mut MetricSet) {
    set.set(&metrics::CORE_STARTED, flag(document, "started"));
}

/// `/users`: user count and per-user lifetime traffic.
pub fn map_users(document: &Value, set: &mut MetricSet) {
    let users = records(document, "users");
    set.set(&metrics::TOTAL_USERS, users.len() as f64);

    for user in users {
        set.add(
            &metrics::USER_LIFETIME_USED_TRAFFIC_BYTES,
            vec![label(user, "username")],
            number(user, "lifetime_used_traffic"),
        );
    }
}
