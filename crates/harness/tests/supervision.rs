//! End-to-end scenarios for the disruptor/orchestrator pair against an
//! in-memory cluster. Clock-sensitive cases run on tokio's paused clock so
//! intervals and deadlines are exact.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chaos_harness::{
    supervise_operation, ClusterOps, DisruptionConfig, HarnessError, OperationOutcome,
    PodDisruptor, SuperviseSettings, WorkloadKind, WorkloadStatus,
};
use velero_api::OperationRef;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_test_writer()
        .try_init();
}

/// In-memory stand-in for the cluster: a mutable pod set, a scripted phase
/// sequence (last entry repeats), and an optional poll index at which phase
/// reads start failing.
#[derive(Default)]
struct FakeCluster {
    pods: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    phases: Vec<String>,
    phase_polls: AtomicUsize,
    fail_phase_from: Option<usize>,
}

impl FakeCluster {
    fn with_pods(names: &[&str]) -> Self {
        Self {
            pods: Mutex::new(names.iter().map(ToString::to_string).collect()),
            ..Self::default()
        }
    }

    fn with_phases(mut self, phases: &[&str]) -> Self {
        self.phases = phases.iter().map(ToString::to_string).collect();
        self
    }

    fn failing_phase_from(mut self, poll: usize) -> Self {
        self.fail_phase_from = Some(poll);
        self
    }

    fn deleted_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }

    fn polls(&self) -> usize {
        self.phase_polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn list_pods(&self, _namespace: &str, prefix: &str) -> Result<Vec<String>, HarnessError> {
        Ok(self
            .pods
            .lock()
            .unwrap()
            .iter()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_pod(&self, _namespace: &str, name: &str) -> Result<(), HarnessError> {
        let mut pods = self.pods.lock().unwrap();
        // already-absent is success, like the real API adapter
        pods.retain(|p| p != name);
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn operation_phase(&self, _op: &OperationRef) -> Result<Option<String>, HarnessError> {
        let poll = self.phase_polls.fetch_add(1, Ordering::SeqCst);
        if self.fail_phase_from.is_some_and(|from| poll >= from) {
            return Err(HarnessError::Other("phase read failed".to_string()));
        }
        if self.phases.is_empty() {
            return Ok(None);
        }
        let idx = poll.min(self.phases.len() - 1);
        Ok(Some(self.phases[idx].clone()))
    }

    async fn workload_status(
        &self,
        _kind: WorkloadKind,
        _namespace: &str,
        _prefix: &str,
    ) -> Result<Vec<WorkloadStatus>, HarnessError> {
        Ok(vec![])
    }
}

fn disruption(interval_secs: u64, max_secs: u64) -> DisruptionConfig {
    DisruptionConfig {
        namespace: "chaos-oadp".to_string(),
        pod_prefix: "velero".to_string(),
        ratio: 0.5,
        interval: Duration::from_secs(interval_secs),
        max_duration: Duration::from_secs(max_secs),
    }
}

#[tokio::test(start_paused = true)]
async fn half_ratio_deletes_two_of_four_in_first_cycle() {
    init_tracing();
    let cluster = Arc::new(FakeCluster::with_pods(&[
        "velero-7d5f9",
        "velero-8c2ka",
        "velero-node-agent-x1",
        "velero-node-agent-x2",
    ]));

    // one-cycle run: interval == max_duration; grace must cover one interval
    let disruptor = PodDisruptor::spawn(cluster.clone(), disruption(60, 60)).unwrap();
    // let the loop run its first cycle before join sets the stop signal
    tokio::task::yield_now().await;
    assert_eq!(cluster.deleted_count(), 2);
    let report = disruptor.join(Duration::from_secs(70)).await;

    assert_eq!(report.cycles, 1);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.delete_failures, 0);
    assert_eq!(cluster.deleted_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_candidate_set_deletes_nothing() {
    init_tracing();
    let cluster = Arc::new(FakeCluster::with_pods(&[]));

    let disruptor = PodDisruptor::spawn(cluster.clone(), disruption(60, 60)).unwrap();
    tokio::task::yield_now().await;
    let report = disruptor.join(Duration::from_secs(70)).await;

    assert_eq!(report.cycles, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(cluster.deleted_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn disruptor_self_terminates_at_max_duration() {
    init_tracing();
    let cluster = Arc::new(FakeCluster::with_pods(&["velero-a", "velero-b"]));

    let disruptor = PodDisruptor::spawn(cluster.clone(), disruption(5, 30)).unwrap();
    tokio::time::sleep(Duration::from_secs(31)).await;

    // exited on its own; nobody set the stop signal
    assert!(disruptor.is_finished());
    assert!(!disruptor.is_stopped());

    let report = disruptor.join(Duration::from_secs(10)).await;
    // cycles at t = 0, 5, 10, 15, 20, 25; deadline check stops the one at 30
    assert_eq!(report.cycles, 6);
}

#[tokio::test(start_paused = true)]
async fn stop_halts_within_one_poll_interval() {
    init_tracing();
    let cluster = Arc::new(FakeCluster::with_pods(&["velero-a"]));

    let disruptor = PodDisruptor::spawn(cluster.clone(), disruption(5, 1000)).unwrap();
    tokio::time::sleep(Duration::from_secs(12)).await;

    assert!(disruptor.stop(), "first stop call performs the transition");
    assert!(!disruptor.stop(), "second stop call is a no-op");

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(
        disruptor.is_finished(),
        "loop must observe the stop signal within one interval"
    );

    let report = disruptor.join(Duration::from_secs(10)).await;
    assert_eq!(report.cycles, 3);
}

#[tokio::test(start_paused = true)]
async fn orchestrator_reports_terminal_phase_and_stops_disruption() {
    init_tracing();
    let cluster = Arc::new(
        FakeCluster::with_pods(&["velero-a", "velero-b"]).with_phases(&[
            "New",
            "InProgress",
            "InProgress",
            "PartiallyFailed",
        ]),
    );
    let op = OperationRef::backup("backup-20260825-101500", "openshift-adp");
    let settings = SuperviseSettings {
        poll_interval: Duration::from_secs(5),
        timeout: Duration::from_secs(600),
        join_grace: Duration::from_secs(60),
    };

    let run = supervise_operation(cluster.clone(), &op, disruption(5, 600), &settings)
        .await
        .unwrap();

    assert_eq!(
        run.outcome,
        OperationOutcome::Terminal("PartiallyFailed".to_string())
    );
    assert_eq!(cluster.polls(), 4, "terminal phase ends the sampling loop");
    assert!(run.disruption.cycles >= 1);

    // the disruption job must not outlive the observation loop
    let deleted_after_return = cluster.deleted_count();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(cluster.deleted_count(), deleted_after_return);
}

#[tokio::test(start_paused = true)]
async fn orchestrator_times_out_without_terminal_phase() {
    init_tracing();
    let cluster =
        Arc::new(FakeCluster::with_pods(&["velero-a"]).with_phases(&["New", "InProgress"]));
    let op = OperationRef::restore("restore-backup-1", "openshift-adp");
    let settings = SuperviseSettings {
        poll_interval: Duration::from_secs(5),
        timeout: Duration::from_secs(60),
        join_grace: Duration::from_secs(60),
    };

    let run = supervise_operation(cluster.clone(), &op, disruption(5, 600), &settings)
        .await
        .unwrap();

    assert_eq!(run.outcome, OperationOutcome::TimedOut);
    assert_eq!(run.outcome.phase(), None);

    let deleted_after_return = cluster.deleted_count();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(cluster.deleted_count(), deleted_after_return);
}

#[tokio::test(start_paused = true)]
async fn poll_error_still_stops_disruption() {
    init_tracing();
    let cluster = Arc::new(
        FakeCluster::with_pods(&["velero-a", "velero-b"])
            .with_phases(&["InProgress"])
            .failing_phase_from(2),
    );
    let op = OperationRef::backup("backup-1", "openshift-adp");
    let settings = SuperviseSettings {
        poll_interval: Duration::from_secs(5),
        timeout: Duration::from_secs(600),
        join_grace: Duration::from_secs(60),
    };

    let err = supervise_operation(cluster.clone(), &op, disruption(5, 600), &settings)
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Other(_)));

    // stop signal was set before the error propagated
    let deleted_after_return = cluster.deleted_count();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(cluster.deleted_count(), deleted_after_return);
}

#[tokio::test(start_paused = true)]
async fn invalid_ratio_is_rejected_before_anything_runs() {
    init_tracing();
    let cluster = Arc::new(FakeCluster::with_pods(&["velero-a"]));
    let mut config = disruption(5, 600);
    config.ratio = 0.0;
    let op = OperationRef::backup("backup-1", "openshift-adp");

    let err = supervise_operation(cluster.clone(), &op, config, &SuperviseSettings::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::InvalidConfig(_)));
    assert_eq!(cluster.polls(), 0);
    assert_eq!(cluster.deleted_count(), 0);
}
