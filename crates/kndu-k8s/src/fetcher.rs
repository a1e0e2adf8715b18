use futures::FutureExt;
use futures::future::BoxFuture;
use k8s_openapi::api::core::v1::Node;
use kube::Api;
use kube::api::ListParams;

use crate::client::KubeClient;
use crate::convert::node_to_record;
use kndu_types::{FetchError, NodeRecord};

/// Source of node inventory for the poll scheduler
pub trait NodeFetcher: Send + Sync {
    /// List every node currently known to the cluster.
    ///
    /// `namespace` is carried through for display only: nodes are cluster
    /// scoped, so it never narrows the query.
    fn fetch<'a>(
        &'a self,
        namespace: &'a str,
    ) -> BoxFuture<'a, Result<Vec<NodeRecord>, FetchError>>;
}

impl NodeFetcher for KubeClient {
    fn fetch<'a>(
        &'a self,
        namespace: &'a str,
    ) -> BoxFuture<'a, Result<Vec<NodeRecord>, FetchError>> {
        async move {
            tracing::trace!(namespace = %namespace, "getting nodes...");

            let nodes: Api<Node> = Api::all(self.client.clone());
            let list = nodes
                .list(&ListParams::default())
                .await
                .map_err(|e| FetchError::with_source("failed to list nodes", e))?;

            tracing::debug!(count = list.items.len(), "listed nodes");

            Ok(list.items.into_iter().map(node_to_record).collect())
        }
        .boxed()
    }
}
