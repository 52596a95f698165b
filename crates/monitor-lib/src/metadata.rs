//! Resource metadata lookups used to clamp query windows

use crate::error::MetadataError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};
use tracing::debug;

/// Source of resource creation times
#[async_trait]
pub trait ResourceMetadataProvider: Send + Sync {
    /// Creation time of `namespace`, or [`MetadataError::NotFound`]
    async fn namespace_creation_time(&self, namespace: &str) -> Result<DateTime<Utc>, MetadataError>;
}

/// Reads namespace creation timestamps from the Kubernetes API
#[derive(Clone)]
pub struct KubeNamespaceProvider {
    api: Api<Namespace>,
}

impl KubeNamespaceProvider {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }

    /// Build a provider from the in-cluster or kubeconfig environment
    pub async fn try_default() -> Result<Self, MetadataError> {
        let client = Client::try_default()
            .await
            .map_err(|e| MetadataError::Api(e.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ResourceMetadataProvider for KubeNamespaceProvider {
    async fn namespace_creation_time(&self, namespace: &str) -> Result<DateTime<Utc>, MetadataError> {
        let not_found = || MetadataError::NotFound {
            kind: "namespace",
            name: namespace.to_string(),
        };

        let ns = self
            .api
            .get_opt(namespace)
            .await
            .map_err(|e| MetadataError::Api(e.to_string()))?
            .ok_or_else(not_found)?;

        let created = ns.metadata.creation_timestamp.ok_or_else(not_found)?.0;
        debug!(namespace = %namespace, created = %created, "namespace creation time");
        Ok(created)
    }
}
