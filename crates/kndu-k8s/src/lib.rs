//! Kubernetes client for kndu
//!
//! This crate loads cluster credentials from a kubeconfig and lists the
//! cluster's nodes as [`NodeRecord`]s.

mod client;
mod convert;
mod fetcher;

pub use client::{ConfigError, ConnectOptions, KubeClient};
pub use fetcher::NodeFetcher;

// Re-export types that are used in our public API
pub use kndu_types::{FetchError, NodeCondition, NodeRecord, ResourceSummary};
