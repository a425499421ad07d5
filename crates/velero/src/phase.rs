//! Backup and restore phase enumerations and the operation handle the
//! harness polls against.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backup::Backup;
use crate::resource::VeleroResource;
use crate::restore::Restore;
use kube::core::ApiResource;

/// Phases reported by the Velero backup controller.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackupPhase {
    New,
    FailedValidation,
    InProgress,
    WaitingForPluginOperations,
    WaitingForPluginOperationsPartiallyFailed,
    Finalizing,
    FinalizingPartiallyFailed,
    Completed,
    PartiallyFailed,
    Failed,
    Deleting,
}

impl BackupPhase {
    /// Phases after which the backup controller makes no further progress.
    pub const TERMINAL: &'static [&'static str] = &["Completed", "Failed", "PartiallyFailed"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::FailedValidation => "FailedValidation",
            Self::InProgress => "InProgress",
            Self::WaitingForPluginOperations => "WaitingForPluginOperations",
            Self::WaitingForPluginOperationsPartiallyFailed => {
                "WaitingForPluginOperationsPartiallyFailed"
            }
            Self::Finalizing => "Finalizing",
            Self::FinalizingPartiallyFailed => "FinalizingPartiallyFailed",
            Self::Completed => "Completed",
            Self::PartiallyFailed => "PartiallyFailed",
            Self::Failed => "Failed",
            Self::Deleting => "Deleting",
        }
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self.as_str())
    }
}

impl fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phases reported by the Velero restore controller.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RestorePhase {
    New,
    FailedValidation,
    InProgress,
    WaitingForPluginOperations,
    Completed,
    PartiallyFailed,
    Failed,
}

impl RestorePhase {
    /// Phases after which the restore controller makes no further progress.
    pub const TERMINAL: &'static [&'static str] = &["Completed", "Failed"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::FailedValidation => "FailedValidation",
            Self::InProgress => "InProgress",
            Self::WaitingForPluginOperations => "WaitingForPluginOperations",
            Self::Completed => "Completed",
            Self::PartiallyFailed => "PartiallyFailed",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self.as_str())
    }
}

impl fmt::Display for RestorePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which Velero controller owns the tracked operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Backup,
    Restore,
}

impl OperationKind {
    pub fn api_resource(self) -> ApiResource {
        match self {
            Self::Backup => Backup::api_resource(),
            Self::Restore => Restore::api_resource(),
        }
    }

    pub fn terminal_phases(self) -> &'static [&'static str] {
        match self {
            Self::Backup => BackupPhase::TERMINAL,
            Self::Restore => RestorePhase::TERMINAL,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup => f.write_str("Backup"),
            Self::Restore => f.write_str("Restore"),
        }
    }
}

/// Handle to an in-flight backup or restore.
///
/// The phase is owned and mutated by the Velero operator; the harness only
/// ever reads it through this reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationRef {
    pub kind: OperationKind,
    pub name: String,
    pub namespace: String,
}

impl OperationRef {
    pub fn backup(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Backup,
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn restore(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Restore,
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn terminal_phases(&self) -> &'static [&'static str] {
        self.kind.terminal_phases()
    }

    /// Whether `phase` means the operation will make no further progress.
    pub fn is_terminal(&self, phase: &str) -> bool {
        self.terminal_phases().contains(&phase)
    }
}

impl fmt::Display for OperationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}
