//! In-memory control plane for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Value, json};

use crate::client::{ControlPlane, Resource};
use crate::error::FetchError;

/// Serves canned documents and records every fetch.
pub struct StaticControlPlane {
    documents: HashMap<Resource, Value>,
    failing: Option<(Resource, u16)>,
    calls: Mutex<Vec<Resource>>,
}

impl StaticControlPlane {
    pub fn new(documents: HashMap<Resource, Value>) -> Self {
        Self {
            documents,
            failing: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// One node, one usage record and one user.
    pub fn fixture() -> Self {
        Self::new(fixture_documents())
    }

    /// Make `resource` answer with `status`.
    pub fn failing(mut self, resource: Resource, status: u16) -> Self {
        self.failing = Some((resource, status));
        self
    }

    /// Replace one document.
    pub fn with(mut self, resource: Resource, document: Value) -> Self {
        self.documents.insert(resource, document);
        self
    }

    pub fn calls(&self) -> Vec<Resource> {
        self.calls.lock().unwrap().clone()
    }
}

impl ControlPlane for StaticControlPlane {
    async fn fetch(&self, resource: Resource) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(resource);

        if let Some((failing, status)) = self.failing
            && failing == resource
        {
            return Err(FetchError::status(resource, status));
        }

        Ok(self.documents.get(&resource).cloned().unwrap_or(Value::Null))
    }
}

pub fn fixture_documents() -> HashMap<Resource, Value> {
    HashMap::from([
        (
            Resource::Nodes,
            json!([{
                "name": "n1",
                "usage_coefficient": 2.5,
                "address": "1.2.3.4",
                "port": 443,
                "api_port": 62050,
                "xray_version": "1.8",
                "status": "connected"
            }]),
        ),
        (
            Resource::NodesUsage,
            json!({"usages": [{"node_name": "n1", "uplink": 100, "downlink": 200}]}),
        ),
        (
            Resource::System,
            json!({
                "mem_total": 1000,
                "mem_used": 500,
                "cpu_usage": 10,
                "total_user": 5,
                "users_active": 3,
                "incoming_bandwidth": 700,
                "outgoing_bandwidth": 300
            }),
        ),
        (Resource::Core, json!({"started": true})),
        (
            Resource::Users,
            json!({"users": [{"username": "alice", "lifetime_used_traffic": 12345}]}),
        ),
    ])
}
