use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use kndu_types::{NodeCondition, NodeRecord, ResourceSummary};

/// Convert a k8s Node to a NodeRecord
pub(crate) fn node_to_record(node: Node) -> NodeRecord {
    let name = node.metadata.name.unwrap_or_default();
    let created = node.metadata.creation_timestamp.map(|t| t.0);

    let status = node.status.unwrap_or_default();
    let resources = ResourceSummary {
        cpu_allocatable: quantity(status.allocatable.as_ref(), "cpu"),
        cpu_capacity: quantity(status.capacity.as_ref(), "cpu"),
        memory_allocatable: quantity(status.allocatable.as_ref(), "memory"),
        memory_capacity: quantity(status.capacity.as_ref(), "memory"),
    };
    let conditions = status
        .conditions
        .unwrap_or_default()
        .into_iter()
        .map(|c| NodeCondition::new(c.type_, c.status))
        .collect();
    let info = status.node_info.unwrap_or_default();

    let mut record = NodeRecord::new(
        name,
        info.operating_system,
        info.architecture,
        info.container_runtime_version,
    )
    .with_resources(resources)
    .with_conditions(conditions);
    record.created = created;
    record
}

fn quantity(resources: Option<&BTreeMap<String, Quantity>>, key: &str) -> Option<String> {
    resources.and_then(|r| r.get(key)).map(|q| q.0.clone())
}
