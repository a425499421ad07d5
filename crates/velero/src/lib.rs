//! # Velero resource modeling
//!
//! Typed structs for the Velero custom resources this test suite drives
//! (`Backup`, `Restore`), their phase enumerations with terminal sets, and
//! thin client helpers for server-side apply and phase polling. Everything
//! goes through `DynamicObject` so no CRD schema generation is required.

pub mod backup;
pub mod client;
pub mod phase;
pub mod resource;
pub mod restore;

pub use backup::{Backup, BackupSpec, BackupStatus};
pub use client::{
    apply_resource, delete_resource, get_phase, timestamped_name, wait_for_phase, VeleroError,
    VELERO_NAMESPACE,
};
pub use phase::{BackupPhase, OperationKind, OperationRef, RestorePhase};
pub use resource::{ObjectMeta, VeleroResource, LABEL_MANAGED_BY, MANAGED_BY_VALUE};
pub use restore::{Restore, RestoreSpec, RestoreStatus};
