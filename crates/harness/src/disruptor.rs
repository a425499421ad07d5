//! Background pod-deletion disruptor.
//!
//! Spawns a task that, once per interval, lists pods matching a name prefix
//! and deletes a ratio of them, until it observes the stop signal or its
//! maximum duration elapses. Individual deletion failures are chaos-side
//! noise: logged, counted, never fatal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cluster::ClusterOps;
use crate::error::HarnessError;

/// Parameters of one disruption job.
#[derive(Clone, Debug)]
pub struct DisruptionConfig {
    /// Namespace holding the target pods. Must be disposable: the disruptor
    /// deletes live pods.
    pub namespace: String,
    /// Pods whose name starts with this prefix are candidates.
    pub pod_prefix: String,
    /// Fraction of candidates deleted per cycle, in (0, 1].
    pub ratio: f64,
    /// Sleep between deletion cycles. Also the worst-case stop latency.
    pub interval: Duration,
    /// The job self-terminates once this much time has passed.
    pub max_duration: Duration,
}

impl DisruptionConfig {
    fn validate(&self) -> Result<(), HarnessError> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(HarnessError::InvalidConfig(format!(
                "ratio must be in (0, 1], got {}",
                self.ratio
            )));
        }
        if self.interval.is_zero() {
            return Err(HarnessError::InvalidConfig(
                "interval must be nonzero".to_string(),
            ));
        }
        if self.max_duration.is_zero() {
            return Err(HarnessError::InvalidConfig(
                "max_duration must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tallies from a finished disruption job.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisruptionReport {
    /// Deletion cycles attempted.
    pub cycles: u64,
    /// Pods successfully deleted.
    pub deleted: u64,
    /// Individual deletions that failed and were skipped.
    pub delete_failures: u64,
}

/// Handle to a running disruption job.
///
/// Dropping the handle sets the stop signal, so an orchestrator unwinding
/// early still leaves the background task a bounded lifetime.
pub struct PodDisruptor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<DisruptionReport>>,
}

impl PodDisruptor {
    /// Validate the config and start the deletion loop.
    pub fn spawn(
        cluster: Arc<dyn ClusterOps>,
        config: DisruptionConfig,
    ) -> Result<Self, HarnessError> {
        config.validate()?;
        let stop = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(disruption_loop(cluster, config, Arc::clone(&stop)));
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Set the stop signal. Idempotent; returns whether this call performed
    /// the transition.
    pub fn stop(&self) -> bool {
        self.stop
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the stop signal has been set.
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the job and wait for the task to finish, bounded by `grace`.
    /// A task that overruns the grace period is aborted.
    pub async fn join(mut self, grace: Duration) -> DisruptionReport {
        self.stop();
        let Some(handle) = self.handle.take() else {
            return DisruptionReport::default();
        };
        let abort = handle.abort_handle();
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                error!(error = %err, "disruption task failed");
                DisruptionReport::default()
            }
            Err(_) => {
                warn!(grace = ?grace, "disruption task did not stop within grace period, aborting");
                abort.abort();
                DisruptionReport::default()
            }
        }
    }
}

impl Drop for PodDisruptor {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Pods to delete from a candidate set of size `candidates`: `ceil(ratio *
/// candidates)`, clamped to the set size, zero for an empty set.
fn victim_count(ratio: f64, candidates: usize) -> usize {
    if candidates == 0 {
        return 0;
    }
    ((ratio * candidates as f64).ceil() as usize).min(candidates)
}

async fn disruption_loop(
    cluster: Arc<dyn ClusterOps>,
    config: DisruptionConfig,
    stop: Arc<AtomicBool>,
) -> DisruptionReport {
    let deadline = Instant::now() + config.max_duration;
    let mut report = DisruptionReport::default();
    info!(
        namespace = %config.namespace,
        prefix = %config.pod_prefix,
        ratio = config.ratio,
        "pod disruption started"
    );

    while !stop.load(Ordering::Acquire) && Instant::now() < deadline {
        match cluster.list_pods(&config.namespace, &config.pod_prefix).await {
            Ok(pods) => {
                let count = victim_count(config.ratio, pods.len());
                let victims: Vec<String> = {
                    let mut rng = rand::thread_rng();
                    pods.choose_multiple(&mut rng, count).cloned().collect()
                };
                for name in &victims {
                    match cluster.delete_pod(&config.namespace, name).await {
                        Ok(()) => {
                            debug!(pod = %name, "deleted pod");
                            report.deleted += 1;
                        }
                        Err(err) => {
                            warn!(pod = %name, error = %err, "pod deletion failed, skipping");
                            report.delete_failures += 1;
                        }
                    }
                }
            }
            Err(err) => warn!(error = %err, "pod listing failed, skipping cycle"),
        }
        report.cycles += 1;
        tokio::time::sleep(config.interval).await;
    }

    info!(
        cycles = report.cycles,
        deleted = report.deleted,
        failures = report.delete_failures,
        "pod disruption stopped"
    );
    report
}
