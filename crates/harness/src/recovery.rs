//! Post-disruption recovery gate.
//!
//! After the disruptor stops, the owning controllers must restore their
//! managed pod counts on their own. Non-convergence within the bound is a
//! test failure, not cleanup noise, so it propagates as an error.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::cluster::{ClusterOps, WorkloadKind, WorkloadStatus};
use crate::constants::{RECOVERY_BACKOFF_CAP, RECOVERY_BACKOFF_INITIAL};
use crate::error::HarnessError;

/// Wait until every prefix-matched controller of every kind reports
/// `ready == desired`, polling with doubling backoff up to `timeout`.
///
/// API errors propagate immediately: a recovery check that cannot observe
/// the cluster proves nothing.
pub async fn wait_for_workload_recovery(
    cluster: &dyn ClusterOps,
    kinds: &[WorkloadKind],
    namespace: &str,
    pod_prefix: &str,
    timeout: Duration,
) -> Result<(), HarnessError> {
    let deadline = Instant::now() + timeout;
    let mut backoff = RECOVERY_BACKOFF_INITIAL;

    loop {
        let mut pending: Vec<(WorkloadKind, WorkloadStatus)> = Vec::new();
        for kind in kinds {
            for status in cluster.workload_status(*kind, namespace, pod_prefix).await? {
                if status.converged() {
                    debug!(kind = %kind, name = %status.name, "workload converged");
                } else {
                    pending.push((*kind, status));
                }
            }
        }

        if pending.is_empty() {
            info!(namespace, prefix = pod_prefix, "all workloads recovered");
            return Ok(());
        }

        if Instant::now() >= deadline {
            let (kind, status) = pending.swap_remove(0);
            return Err(HarnessError::RecoveryIncomplete {
                kind,
                namespace: namespace.to_string(),
                name: status.name,
                ready: status.ready,
                desired: status.desired,
            });
        }

        info!(
            namespace,
            pending = pending.len(),
            next_check = ?backoff,
            "workloads still recovering"
        );
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(RECOVERY_BACKOFF_CAP);
    }
}
