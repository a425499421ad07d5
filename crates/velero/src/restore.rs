//! Velero `Restore` resource.

use serde::{Deserialize, Serialize};

use crate::phase::{OperationRef, RestorePhase};
use crate::resource::{ObjectMeta, VeleroResource};

/// Velero Restore custom resource.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Restore {
    #[serde(default = "Restore::default_api_version")]
    pub api_version: String,
    #[serde(default = "Restore::default_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: RestoreSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RestoreStatus>,
}

impl VeleroResource for Restore {
    const KIND: &'static str = "Restore";
}

impl Restore {
    fn default_api_version() -> String {
        Self::api_version()
    }
    fn default_kind() -> String {
        <Self as VeleroResource>::KIND.to_string()
    }

    pub fn new(name: impl Into<String>, namespace: impl Into<String>, spec: RestoreSpec) -> Self {
        Self {
            api_version: Self::default_api_version(),
            kind: Self::default_kind(),
            metadata: ObjectMeta::new(name, namespace),
            spec,
            status: None,
        }
    }

    /// Restore named after the backup it replays, in the same namespace.
    pub fn for_backup(backup_name: &str, namespace: impl Into<String>) -> Self {
        Self::new(
            format!("restore-{backup_name}"),
            namespace,
            RestoreSpec {
                backup_name: backup_name.to_string(),
                ..RestoreSpec::default()
            },
        )
    }

    /// Handle for polling this restore's phase.
    pub fn operation_ref(&self) -> OperationRef {
        OperationRef::restore(&self.metadata.name, &self.metadata.namespace)
    }
}

/// Restore spec, restricted to the fields the chaos fixtures set.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSpec {
    /// Name of the Velero Backup to restore from
    pub backup_name: String,
    /// Namespaces restored from the backup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_namespaces: Vec<String>,
    /// Restore persistent volumes
    #[serde(rename = "restorePVs", default, skip_serializing_if = "Option::is_none")]
    pub restore_pvs: Option<bool>,
}

/// Restore status as written by the Velero operator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<RestorePhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
}
