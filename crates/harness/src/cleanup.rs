//! Teardown fixtures run between chaos tests.
//!
//! A half-deleted namespace or a lingering virtual machine corrupts every
//! subsequent run, so unlike the disruption path these operations wrap and
//! propagate API failures instead of tolerating them. Only "already absent"
//! is success.

use futures::future::join_all;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::{Client, ResourceExt};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::constants::{POLL_INTERVAL, TIMEOUT_3MIN, TIMEOUT_5MIN};
use crate::error::HarnessError;

fn virtual_machine_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk("kubevirt.io", "v1", "VirtualMachine"))
}

fn cleanup_error(namespace: &str, reason: impl ToString) -> HarnessError {
    HarnessError::Cleanup {
        namespace: namespace.to_string(),
        reason: reason.to_string(),
    }
}

/// Delete every KubeVirt `VirtualMachine` in `namespace` and wait up to
/// [`TIMEOUT_3MIN`] until none remain.
pub async fn delete_virtual_machines_and_wait(
    client: &Client,
    namespace: &str,
) -> Result<(), HarnessError> {
    let timeout = TIMEOUT_3MIN;
    let api: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), namespace, &virtual_machine_resource());

    let vms = api
        .list(&ListParams::default())
        .await
        .map_err(|e| cleanup_error(namespace, e))?;
    if vms.items.is_empty() {
        info!(namespace, "no virtual machines to clean up");
        return Ok(());
    }

    let names: Vec<String> = vms.items.iter().map(ResourceExt::name_any).collect();
    info!(namespace, vms = ?names, "deleting virtual machines");

    let deletions = names.iter().map(|name| {
        let api = api.clone();
        async move {
            match api.delete(name, &DeleteParams::default()).await {
                Ok(_) => Ok(()),
                Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
                Err(e) => Err(e),
            }
        }
    });
    for result in join_all(deletions).await {
        result.map_err(|e| cleanup_error(namespace, e))?;
    }

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = api
            .list(&ListParams::default())
            .await
            .map_err(|e| cleanup_error(namespace, e))?;
        if remaining.items.is_empty() {
            info!(namespace, "all virtual machines deleted");
            return Ok(());
        }
        let names: Vec<String> = remaining.items.iter().map(ResourceExt::name_any).collect();
        if Instant::now() >= deadline {
            return Err(cleanup_error(
                namespace,
                format!("virtual machines still present after {timeout:?}: {names:?}"),
            ));
        }
        debug!(namespace, remaining = ?names, "waiting for virtual machine deletion");
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Delete `namespace` and wait up to [`TIMEOUT_5MIN`] until the API no
/// longer knows it.
pub async fn delete_namespace_and_wait(
    client: &Client,
    namespace: &str,
) -> Result<(), HarnessError> {
    let timeout = TIMEOUT_5MIN;
    let api: Api<Namespace> = Api::all(client.clone());

    match api.delete(namespace, &DeleteParams::default()).await {
        Ok(_) => info!(namespace, "namespace deletion triggered"),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            info!(namespace, "namespace does not exist, skipping delete");
            return Ok(());
        }
        Err(e) => return Err(cleanup_error(namespace, e)),
    }

    let deadline = Instant::now() + timeout;
    loop {
        match api.get(namespace).await {
            Ok(_) => {
                if Instant::now() >= deadline {
                    return Err(cleanup_error(
                        namespace,
                        format!("namespace still present after {timeout:?}"),
                    ));
                }
                debug!(namespace, "namespace still exists");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                info!(namespace, "namespace confirmed removed");
                return Ok(());
            }
            Err(e) => return Err(cleanup_error(namespace, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_machine_resource_targets_kubevirt_group() {
        let ar = virtual_machine_resource();
        assert_eq!(ar.group, "kubevirt.io");
        assert_eq!(ar.kind, "VirtualMachine");
        assert_eq!(ar.plural, "virtualmachines");
    }

    #[test]
    fn cleanup_error_names_namespace() {
        let err = cleanup_error("chaos-oadp", "boom");
        assert!(err.to_string().contains("chaos-oadp"));
        assert!(err.to_string().contains("boom"));
    }
}
