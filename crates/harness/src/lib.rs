//! # Chaos harness
//!
//! Building blocks for resilience tests that run a Velero backup or restore
//! while pods belonging to the operation are being deleted underneath it:
//!
//! - [`disruptor`] — background task deleting a ratio of prefix-matched pods
//!   per cycle, bounded by a stop signal and a maximum duration.
//! - [`orchestrator`] — drives the tracked operation to a terminal phase (or
//!   timeout) while the disruptor runs, and guarantees the disruptor is
//!   stopped on every exit path.
//! - [`recovery`] — gate asserting that workload controllers re-converged to
//!   their desired replica counts after the disruption.
//! - [`cleanup`] — namespace and virtual-machine teardown between runs.
//!
//! All cluster access goes through the [`cluster::ClusterOps`] trait so the
//! coordination logic is testable without an API server.

pub mod cleanup;
pub mod cluster;
pub mod constants;
pub mod disruptor;
pub mod error;
pub mod orchestrator;
pub mod recovery;

pub use cluster::{ClusterOps, KubeCluster, WorkloadKind, WorkloadStatus};
pub use disruptor::{DisruptionConfig, DisruptionReport, PodDisruptor};
pub use error::HarnessError;
pub use orchestrator::{
    supervise_operation, OperationOutcome, SupervisedRun, SuperviseSettings,
};
pub use recovery::wait_for_workload_recovery;
