//! Supervision of a backup/restore while pods are being deleted.
//!
//! The central correctness property: the disruptor's stop signal is set
//! before [`supervise_operation`] returns, on every path. The polling result
//! is captured (never `?`-propagated) until after the stop and bounded join,
//! and [`PodDisruptor`]'s `Drop` covers cancellation of the supervising
//! future itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use velero_api::OperationRef;

use crate::cluster::ClusterOps;
use crate::constants::{POLL_INTERVAL, TIMEOUT_10MIN, TIMEOUT_1MIN};
use crate::disruptor::{DisruptionConfig, DisruptionReport, PodDisruptor};
use crate::error::HarnessError;

/// How the observation loop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The operation reached a member of its terminal-phase set.
    Terminal(String),
    /// The wall-clock timeout fired without a terminal phase. Reported, not
    /// raised; pass/fail policy belongs to the calling test.
    TimedOut,
}

impl OperationOutcome {
    /// Terminal phase, if one was observed.
    pub fn phase(&self) -> Option<&str> {
        match self {
            Self::Terminal(phase) => Some(phase),
            Self::TimedOut => None,
        }
    }
}

/// Result of a supervised run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupervisedRun {
    pub outcome: OperationOutcome,
    pub disruption: DisruptionReport,
}

/// Knobs for [`supervise_operation`].
#[derive(Clone, Debug)]
pub struct SuperviseSettings {
    /// Delay between phase samples.
    pub poll_interval: Duration,
    /// Wall-clock bound on the observation loop.
    pub timeout: Duration,
    /// Bound on waiting for the disruption task after stopping it.
    pub join_grace: Duration,
}

impl Default for SuperviseSettings {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            timeout: TIMEOUT_10MIN,
            join_grace: TIMEOUT_1MIN,
        }
    }
}

/// Run a disruption job while polling the tracked operation to completion.
///
/// Starts the disruptor, polls `op`'s phase until it is terminal or
/// `settings.timeout` elapses, then stops and joins the disruptor. An API
/// error from the polling loop propagates only after the disruptor has been
/// stopped and joined.
pub async fn supervise_operation(
    cluster: Arc<dyn ClusterOps>,
    op: &OperationRef,
    disruption: DisruptionConfig,
    settings: &SuperviseSettings,
) -> Result<SupervisedRun, HarnessError> {
    let disruptor = PodDisruptor::spawn(Arc::clone(&cluster), disruption)?;
    info!(operation = %op, "supervising operation under pod disruption");

    let polled =
        poll_until_terminal(cluster.as_ref(), op, settings.poll_interval, settings.timeout).await;

    // Stop before inspecting the poll result so the error path cannot leak a
    // running disruptor.
    disruptor.stop();
    let disruption = disruptor.join(settings.join_grace).await;

    let outcome = polled?;
    match &outcome {
        OperationOutcome::Terminal(phase) => {
            info!(operation = %op, %phase, "operation reached terminal phase");
        }
        OperationOutcome::TimedOut => {
            warn!(operation = %op, timeout = ?settings.timeout, "operation did not reach a terminal phase");
        }
    }

    Ok(SupervisedRun {
        outcome,
        disruption,
    })
}

async fn poll_until_terminal(
    cluster: &dyn ClusterOps,
    op: &OperationRef,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<OperationOutcome, HarnessError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(phase) = cluster.operation_phase(op).await? {
            debug!(operation = %op, %phase, "observed phase");
            if op.is_terminal(&phase) {
                return Ok(OperationOutcome::Terminal(phase));
            }
        }
        if Instant::now() >= deadline {
            return Ok(OperationOutcome::TimedOut);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockClusterOps;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn backup_op() -> OperationRef {
        OperationRef::backup("backup-1", "velero")
    }

    #[tokio::test]
    async fn poll_returns_immediately_on_terminal_phase() {
        let mut cluster = MockClusterOps::new();
        cluster
            .expect_operation_phase()
            .times(1)
            .returning(|_| Ok(Some("Completed".to_string())));

        let outcome = poll_until_terminal(
            &cluster,
            &backup_op(),
            Duration::from_secs(5),
            Duration::from_secs(600),
        )
        .await
        .unwrap();
        assert_eq!(outcome, OperationOutcome::Terminal("Completed".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_walks_phase_sequence_to_partially_failed() {
        let sequence = ["New", "InProgress", "InProgress", "PartiallyFailed"];
        let calls = AtomicUsize::new(0);
        let mut cluster = MockClusterOps::new();
        cluster.expect_operation_phase().returning(move |_| {
            let i = calls.fetch_add(1, Ordering::SeqCst).min(sequence.len() - 1);
            Ok(Some(sequence[i].to_string()))
        });

        let outcome = poll_until_terminal(
            &cluster,
            &backup_op(),
            Duration::from_secs(5),
            Duration::from_secs(600),
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            OperationOutcome::Terminal("PartiallyFailed".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn poll_times_out_without_terminal_phase() {
        let mut cluster = MockClusterOps::new();
        cluster
            .expect_operation_phase()
            .returning(|_| Ok(Some("InProgress".to_string())));

        let outcome = poll_until_terminal(
            &cluster,
            &backup_op(),
            Duration::from_secs(5),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
        assert_eq!(outcome, OperationOutcome::TimedOut);
    }

    #[tokio::test]
    async fn poll_propagates_api_errors() {
        let mut cluster = MockClusterOps::new();
        cluster
            .expect_operation_phase()
            .returning(|_| Err(HarnessError::Other("connection refused".to_string())));

        let err = poll_until_terminal(
            &cluster,
            &backup_op(),
            Duration::from_secs(5),
            Duration::from_secs(60),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HarnessError::Other(_)));
    }

    #[test]
    fn timed_out_carries_no_phase() {
        assert_eq!(OperationOutcome::TimedOut.phase(), None);
        assert_eq!(
            OperationOutcome::Terminal("Completed".into()).phase(),
            Some("Completed")
        );
    }
}
