//! Shared types for kndu
//!
//! This crate contains the node records, display options and print snapshots
//! passed between the fetcher, the poll scheduler and the renderer.

use chrono::{DateTime, Utc};

// ============================================================================
// Node Types
// ============================================================================

/// Allocatable and capacity quantities reported by a node
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceSummary {
    pub cpu_allocatable: Option<String>,
    pub cpu_capacity: Option<String>,
    pub memory_allocatable: Option<String>,
    pub memory_capacity: Option<String>,
}

/// One entry of a node's status conditions, e.g. `Ready: True`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeCondition {
    pub kind: String,
    pub status: String,
}

impl NodeCondition {
    pub fn new(kind: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            status: status.into(),
        }
    }
}

/// A single cluster node as seen in one poll cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRecord {
    pub name: String,
    pub operating_system: String,
    pub architecture: String,
    pub container_runtime_version: String,
    pub created: Option<DateTime<Utc>>,
    pub resources: ResourceSummary,
    pub conditions: Vec<NodeCondition>,
}

impl NodeRecord {
    pub fn new(
        name: impl Into<String>,
        operating_system: impl Into<String>,
        architecture: impl Into<String>,
        container_runtime_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            operating_system: operating_system.into(),
            architecture: architecture.into(),
            container_runtime_version: container_runtime_version.into(),
            created: None,
            resources: ResourceSummary::default(),
            conditions: Vec::new(),
        }
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn with_resources(mut self, resources: ResourceSummary) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<NodeCondition>) -> Self {
        self.conditions = conditions;
        self
    }
}

// ============================================================================
// Display Types
// ============================================================================

/// Display switches taken from the command line at startup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Set with `--all-namespaces`; nodes are cluster scoped so this has no
    /// effect on the node table.
    pub show_namespace: bool,
    /// Append an AGE column
    pub show_times: bool,
    /// Append allocatable/capacity columns for cpu and memory
    pub show_resource_limits: bool,
}

/// What a poll cycle produced for the node table
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeView {
    /// The fetch succeeded and returned at least one node
    HasNodes(Vec<NodeRecord>),
    /// The fetch succeeded and the cluster reported no nodes
    Empty,
    /// The fetch failed; there is nothing to draw
    FetchFailed,
}

impl NodeView {
    pub fn from_nodes(nodes: Vec<NodeRecord>) -> Self {
        if nodes.is_empty() {
            Self::Empty
        } else {
            Self::HasNodes(nodes)
        }
    }

    /// Nodes to draw, `None` when the fetch failed
    pub fn nodes(&self) -> Option<&[NodeRecord]> {
        match self {
            Self::HasNodes(nodes) => Some(nodes),
            Self::Empty => Some(&[]),
            Self::FetchFailed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::FetchFailed)
    }
}

/// Immutable result of one poll cycle, ready for rendering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrintSnapshot {
    /// Namespace header; empty means all namespaces
    pub namespace: String,
    pub options: DisplayOptions,
    pub nodes: NodeView,
    /// When the snapshot was built, used for relative ages
    pub taken_at: DateTime<Utc>,
}

impl PrintSnapshot {
    /// Build a snapshot from a fetch result.
    ///
    /// Nodes keep the order the fetcher returned them in. A failed fetch
    /// produces [`NodeView::FetchFailed`]; the error itself is reported by
    /// the caller.
    pub fn build<E>(
        namespace: &str,
        options: DisplayOptions,
        fetched: Result<Vec<NodeRecord>, E>,
    ) -> Self {
        let nodes = match fetched {
            Ok(nodes) => NodeView::from_nodes(nodes),
            Err(_) => NodeView::FetchFailed,
        };

        Self {
            namespace: namespace.to_string(),
            options,
            nodes,
            taken_at: Utc::now(),
        }
    }

    pub fn with_taken_at(mut self, taken_at: DateTime<Utc>) -> Self {
        self.taken_at = taken_at;
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure to obtain the node list from the cluster
#[derive(Debug, thiserror::Error)]
#[error("fetch failed: {message}")]
pub struct FetchError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
