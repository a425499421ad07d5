//! Velero `Backup` resource.

use serde::{Deserialize, Serialize};

use crate::phase::{BackupPhase, OperationRef};
use crate::resource::{ObjectMeta, VeleroResource};

/// Velero Backup custom resource.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default = "Backup::default_api_version")]
    pub api_version: String,
    #[serde(default = "Backup::default_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: BackupSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BackupStatus>,
}

impl VeleroResource for Backup {
    const KIND: &'static str = "Backup";
}

impl Backup {
    fn default_api_version() -> String {
        Self::api_version()
    }
    fn default_kind() -> String {
        <Self as VeleroResource>::KIND.to_string()
    }

    pub fn new(name: impl Into<String>, namespace: impl Into<String>, spec: BackupSpec) -> Self {
        Self {
            api_version: Self::default_api_version(),
            kind: Self::default_kind(),
            metadata: ObjectMeta::new(name, namespace),
            spec,
            status: None,
        }
    }

    /// Handle for polling this backup's phase.
    pub fn operation_ref(&self) -> OperationRef {
        OperationRef::backup(&self.metadata.name, &self.metadata.namespace)
    }
}

/// Backup spec, restricted to the fields the chaos fixtures set.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    /// Namespaces captured by the backup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_namespaces: Vec<String>,
    /// BackupStorageLocation name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    /// Move snapshot data through the DataMover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_move_data: Option<bool>,
    /// Backup retention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

/// Backup status as written by the Velero operator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<BackupPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
}
