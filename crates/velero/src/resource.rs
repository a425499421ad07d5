//! Common plumbing for Velero API objects.

use std::collections::BTreeMap;

use kube::core::{ApiResource, GroupVersionKind};
use serde::{Deserialize, Serialize};

/// Label key marking objects created by this harness.
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Label value marking objects created by this harness.
pub const MANAGED_BY_VALUE: &str = "oadp-chaos";

/// Static group/version/kind identity for a Velero resource type.
///
/// Implementors get a `DynamicObject`-compatible [`ApiResource`] without any
/// API discovery round trip.
pub trait VeleroResource {
    /// API group of the resource.
    const GROUP: &'static str = "velero.io";
    /// API version of the resource.
    const VERSION: &'static str = "v1";
    /// Resource kind.
    const KIND: &'static str;

    /// `apiVersion` string as it appears on the wire.
    fn api_version() -> String {
        format!("{}/{}", Self::GROUP, Self::VERSION)
    }

    /// Build the [`ApiResource`] used for dynamic API access.
    fn api_resource() -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(Self::GROUP, Self::VERSION, Self::KIND))
    }
}

/// Minimal object metadata carried by the resources this crate creates.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name
    pub name: String,
    /// Object namespace
    pub namespace: String,
    /// Object labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Metadata with the harness managed-by label applied.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;
    impl VeleroResource for Dummy {
        const KIND: &'static str = "Backup";
    }

    #[test]
    fn api_resource_uses_velero_group_and_guessed_plural() {
        let ar = Dummy::api_resource();
        assert_eq!(ar.group, "velero.io");
        assert_eq!(ar.version, "v1");
        assert_eq!(ar.kind, "Backup");
        assert_eq!(ar.plural, "backups");
    }

    #[test]
    fn metadata_carries_managed_by_label() {
        let meta = ObjectMeta::new("backup-1", "velero");
        assert_eq!(
            meta.labels.get(LABEL_MANAGED_BY),
            Some(&MANAGED_BY_VALUE.to_string())
        );
    }
}
