//! Cluster access seam.
//!
//! Every cluster read and mutation the harness performs goes through
//! [`ClusterOps`], so the disruptor/orchestrator/recovery logic runs
//! unchanged against the real API server ([`KubeCluster`]) or an in-memory
//! fake in tests.

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams};
use kube::{Client, ResourceExt};
use tracing::debug;
use velero_api::OperationRef;

use crate::error::HarnessError;

/// Workload controllers whose self-healing the recovery gate verifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    DaemonSet,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployment => f.write_str("Deployment"),
            Self::DaemonSet => f.write_str("DaemonSet"),
        }
    }
}

/// Observed replica counts of one workload controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadStatus {
    pub name: String,
    pub desired: i32,
    pub ready: i32,
}

impl WorkloadStatus {
    /// Whether the controller has restored its managed pod count.
    pub fn converged(&self) -> bool {
        self.ready == self.desired
    }
}

/// Cluster operations consumed by the harness.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Names of pods in `namespace` whose name starts with `prefix`.
    async fn list_pods(&self, namespace: &str, prefix: &str)
        -> Result<Vec<String>, HarnessError>;

    /// Delete one pod. Already-absent must be treated as success.
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), HarnessError>;

    /// Current phase of a tracked backup/restore, `None` before the operator
    /// writes a status.
    async fn operation_phase(&self, op: &OperationRef) -> Result<Option<String>, HarnessError>;

    /// Replica counts of prefix-matched controllers of the given kind.
    async fn workload_status(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<WorkloadStatus>, HarnessError>;
}

/// [`ClusterOps`] backed by the real Kubernetes API.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterOps for KubeCluster {
    async fn list_pods(
        &self,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<String>, HarnessError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api.list(&ListParams::default()).await?;
        Ok(pods
            .items
            .iter()
            .map(ResourceExt::name_any)
            .filter(|name| name.starts_with(prefix))
            .collect())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), HarnessError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(pod = name, "pod already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn operation_phase(&self, op: &OperationRef) -> Result<Option<String>, HarnessError> {
        Ok(velero_api::get_phase(&self.client, op).await?)
    }

    async fn workload_status(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<WorkloadStatus>, HarnessError> {
        match kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                let list = api.list(&ListParams::default()).await?;
                Ok(list
                    .items
                    .iter()
                    .filter(|d| d.name_any().starts_with(prefix))
                    .map(|d| WorkloadStatus {
                        name: d.name_any(),
                        desired: d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
                        ready: d
                            .status
                            .as_ref()
                            .and_then(|s| s.ready_replicas)
                            .unwrap_or(0),
                    })
                    .collect())
            }
            WorkloadKind::DaemonSet => {
                let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), namespace);
                let list = api.list(&ListParams::default()).await?;
                Ok(list
                    .items
                    .iter()
                    .filter(|d| d.name_any().starts_with(prefix))
                    .map(|d| WorkloadStatus {
                        name: d.name_any(),
                        desired: d
                            .status
                            .as_ref()
                            .map_or(0, |s| s.desired_number_scheduled),
                        ready: d.status.as_ref().map_or(0, |s| s.number_ready),
                    })
                    .collect())
            }
        }
    }
}
