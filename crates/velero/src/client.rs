//! Thin client helpers over `DynamicObject` for the Velero API group.

use std::time::Duration;

use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::Client;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::phase::OperationRef;
use crate::resource::VeleroResource;

/// Namespace the Velero operator watches for Backup/Restore objects.
pub const VELERO_NAMESPACE: &str = "velero";

/// Errors from the Velero client helpers.
#[derive(Debug, Error)]
pub enum VeleroError {
    #[error("kubernetes api error: {0}")]
    Api(#[from] kube::Error),

    #[error("failed to serialize {kind} resource: {source}")]
    Serialize {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} did not reach phase {expected} within {timeout:?} (last observed: {last_observed:?})")]
    PhaseTimeout {
        operation: String,
        expected: String,
        timeout: Duration,
        last_observed: Option<String>,
    },
}

/// `{prefix}-YYYYmmdd-HHMMSS`, the naming scheme the fixtures use for
/// backups and restores so reruns never collide.
pub fn timestamped_name(prefix: &str) -> String {
    format!("{prefix}-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S"))
}

/// Apply a Velero resource using server-side apply via `DynamicObject`.
pub async fn apply_resource<T>(
    client: &Client,
    resource: &T,
    field_manager: &str,
) -> Result<(), VeleroError>
where
    T: serde::Serialize + VeleroResource,
{
    let ar = T::api_resource();
    let value = serde_json::to_value(resource).map_err(|e| VeleroError::Serialize {
        kind: T::KIND,
        source: e,
    })?;

    let name = value
        .pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let namespace = value
        .pointer("/metadata/namespace")
        .and_then(|v| v.as_str())
        .unwrap_or(VELERO_NAMESPACE)
        .to_string();

    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), &namespace, &ar);
    let params = PatchParams::apply(field_manager).force();

    api.patch(&name, &params, &Patch::Apply(&value)).await?;
    info!(kind = T::KIND, name = %name, namespace = %namespace, "applied velero resource");
    Ok(())
}

/// Delete the tracked operation's backing object. Already-absent is success.
pub async fn delete_resource(client: &Client, op: &OperationRef) -> Result<(), VeleroError> {
    let api: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), &op.namespace, &op.kind.api_resource());
    match api.delete(&op.name, &DeleteParams::default()).await {
        Ok(_) => {
            info!(operation = %op, "deleted velero resource");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            debug!(operation = %op, "velero resource already absent");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Read the operation's current phase. `None` until the operator writes a
/// status.
pub async fn get_phase(client: &Client, op: &OperationRef) -> Result<Option<String>, VeleroError> {
    let api: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), &op.namespace, &op.kind.api_resource());
    let obj = api.get(&op.name).await?;
    Ok(obj
        .data
        .pointer("/status/phase")
        .and_then(|v| v.as_str())
        .map(str::to_string))
}

/// Poll until the operation reports `expected`, or fail after `timeout`.
///
/// Explicit deadline loop; one API read per `interval`.
pub async fn wait_for_phase(
    client: &Client,
    op: &OperationRef,
    expected: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), VeleroError> {
    let deadline = Instant::now() + timeout;
    let mut last_observed = None;
    loop {
        let phase = get_phase(client, op).await?;
        if phase.as_deref() == Some(expected) {
            info!(operation = %op, phase = expected, "operation reached expected phase");
            return Ok(());
        }
        if let Some(phase) = phase {
            debug!(operation = %op, %phase, "waiting for phase");
            last_observed = Some(phase);
        }
        if Instant::now() >= deadline {
            return Err(VeleroError::PhaseTimeout {
                operation: op.to_string(),
                expected: expected.to_string(),
                timeout,
                last_observed,
            });
        }
        tokio::time::sleep(interval).await;
    }
}
