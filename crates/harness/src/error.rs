//! Error taxonomy for the harness.
//!
//! Disruption-side failures (individual pod deletions) are logged and
//! counted, never surfaced here; recovery- and cleanup-side failures are
//! fatal and carry enough context for the failing test to be actionable.

use thiserror::Error;

use crate::cluster::WorkloadKind;

/// Errors that can occur while orchestrating a chaos run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("kubernetes api error: {0}")]
    Api(#[from] kube::Error),

    #[error("velero api error: {0}")]
    Velero(#[from] velero_api::VeleroError),

    #[error("invalid disruption config: {0}")]
    InvalidConfig(String),

    #[error("{kind} {namespace}/{name} not recovered: {ready}/{desired} replicas ready")]
    RecoveryIncomplete {
        kind: WorkloadKind,
        namespace: String,
        name: String,
        ready: i32,
        desired: i32,
    },

    #[error("cleanup failed for namespace {namespace}: {reason}")]
    Cleanup { namespace: String, reason: String },

    #[error("cluster error: {0}")]
    Other(String),
}
