//! The metric schema and the per-scrape metric set.

/// Static description of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyDesc {
    /// Metric name.
    pub name: &'static str,
    /// HELP text.
    pub help: &'static str,
    /// Label names, in the order sample label values are given.
    pub labels: &'static [&'static str],
}

impl FamilyDesc {
    const fn new(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self { name, help, labels }
    }
}

pub const NODE_USAGE_COEFFICIENT: FamilyDesc = FamilyDesc::new(
    "node_usage_coefficient",
    "Node usage coefficient",
    &["node_name"],
);

/// Presence metric carrying node details as labels. Always 1.
pub const NODE_INFO: FamilyDesc = FamilyDesc::new(
    "node_info",
    "Node address, port, API port, xray version, and status",
    &[
        "node_name",
        "address",
        "port",
        "api_port",
        "xray_version",
        "status",
    ],
);

pub const NODE_UPLINK_BYTES: FamilyDesc = FamilyDesc::new(
    "node_uplink_bytes",
    "Node uplink traffic in bytes",
    &["node_name"],
);

pub const NODE_DOWNLINK_BYTES: FamilyDesc = FamilyDesc::new(
    "node_downlink_bytes",
    "Node downlink traffic in bytes",
    &["node_name"],
);

/// Always 1; the version itself is not exported.
pub const SYSTEM_VERSION: FamilyDesc = FamilyDesc::new("system_version", "System version", &[]);

pub const SYSTEM_MEMORY_TOTAL_BYTES: FamilyDesc = FamilyDesc::new(
    "system_memory_total_bytes",
    "Total system memory in bytes",
    &[],
);

pub const SYSTEM_MEMORY_USED_BYTES: FamilyDesc = FamilyDesc::new(
    "system_memory_used_bytes",
    "Used system memory in bytes",
    &[],
);

pub const SYSTEM_CPU_USAGE_PERCENT: FamilyDesc = FamilyDesc::new(
    "system_cpu_usage_percent",
    "System CPU usage percentage",
    &[],
);

pub const SYSTEM_TOTAL_USERS: FamilyDesc = FamilyDesc::new(
    "system_total_users",
    "Total number of users in the system",
    &[],
);

pub const SYSTEM_ACTIVE_USERS: FamilyDesc = FamilyDesc::new(
    "system_active_users",
    "Number of active users in the system",
    &[],
);

pub const SYSTEM_INCOMING_BANDWIDTH_BYTES: FamilyDesc = FamilyDesc::new(
    "system_incoming_bandwidth_bytes",
    "Total incoming bandwidth in bytes",
    &[],
);

pub const SYSTEM_OUTGOING_BANDWIDTH_BYTES: FamilyDesc = FamilyDesc::new(
    "system_outgoing_bandwidth_bytes",
    "Total outgoing bandwidth in bytes",
    &[],
);

pub const CORE_STARTED: FamilyDesc = FamilyDesc::new("core_started", "Core started status", &[]);

pub const TOTAL_USERS: FamilyDesc = FamilyDesc::new("total_users", "Total number of users", &[]);

pub const USER_LIFETIME_USED_TRAFFIC_BYTES: FamilyDesc = FamilyDesc::new(
    "user_lifetime_used_traffic_bytes",
    "Lifetime used traffic per user in bytes",
    &["username"],
);

/// Every exported family, in exposition order.
pub const FAMILIES: [FamilyDesc; 15] = [
    NODE_USAGE_COEFFICIENT,
    NODE_INFO,
    NODE_UPLINK_BYTES,
    NODE_DOWNLINK_BYTES,
    SYSTEM_VERSION,
    SYSTEM_MEMORY_TOTAL_BYTES,
    SYSTEM_MEMORY_USED_BYTES,
    SYSTEM_CPU_USAGE_PERCENT,
    SYSTEM_TOTAL_USERS,
    SYSTEM_ACTIVE_USERS,
    SYSTEM_INCOMING_BANDWIDTH_BYTES,
    SYSTEM_OUTGOING_BANDWIDTH_BYTES,
    CORE_STARTED,
    TOTAL_USERS,
    USER_LIFETIME_USED_TRAFFIC_BYTES,
];

/// One labeled value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Label values, positionally matching [`FamilyDesc::labels`].
    pub label_values: Vec<String>,
    pub value: f64,
}

impl Sample {
    /// Label pairs, in declaration order.
    pub fn labels<'a>(&'a self, desc: &'a FamilyDesc) -> impl Iterator<Item = (&'a str, &'a str)> {
        desc.labels
            .iter()
            .copied()
            .zip(self.label_values.iter().map(String::as_str))
    }
}

/// A family together with the samples gathered for it.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub desc: FamilyDesc,
    pub samples: Vec<Sample>,
}

/// All samples produced by one scrape.
///
/// Built fresh for every request and discarded after serialization.
#[derive(Debug, Clone)]
pub struct MetricSet {
    families: Vec<MetricFamily>,
}

impl MetricSet {
    /// Create a set with every family of the schema and no samples.
    pub fn new() -> Self {
        Self {
            families: FAMILIES
                .iter()
                .map(|desc| MetricFamily {
                    desc: *desc,
                    samples: Vec::new(),
                })
                .collect(),
        }
    }

    /// Add a sample to a family.
    ///
    /// `label_values` must line up with the family's label names.
    pub fn add(&mut self, desc: &FamilyDesc, label_values: Vec<String>, value: f64) {
        debug_assert_eq!(
            desc.labels.len(),
            label_values.len(),
            "label arity mismatch for {}",
            desc.name
        );

        let sample = Sample {
            label_values,
            value,
        };

        match self.families.iter_mut().find(|f| f.desc.name == desc.name) {
            Some(family) => family.samples.push(sample),
            None => self.families.push(MetricFamily {
                desc: *desc,
                samples: vec![sample],
            }),
        }
    }

    /// Add an unlabeled sample.
    pub fn set(&mut self, desc: &FamilyDesc, value: f64) {
        self.add(desc, Vec::new(), value);
    }

    /// Families in exposition order.
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    /// Samples recorded for the named family.
    pub fn samples(&self, name: &str) -> &[Sample] {
        self.families
            .iter()
            .find(|f| f.desc.name == name)
            .map(|f| f.samples.as_slice())
            .unwrap_or(&[])
    }

    /// Value of the first sample of `name` whose label values equal `labels`.
    pub fn value(&self, name: &str, labels: &[&str]) -> Option<f64> {
        self.samples(name)
            .iter()
            .find(|s| s.label_values.iter().map(String::as_str).eq(labels.iter().copied()))
            .map(|s| s.value)
    }

    /// Total number of samples across all families.
    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|f| f.samples.len()).sum()
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::new()
    }
}
