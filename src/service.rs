//! The provider-facing service interface.
//!
//! A plugin harness drives a provider through [`ProviderService`]. Every
//! configuration, plan and state document crosses this boundary as JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::error::ProviderError;

/// Trait that provider implementations implement.
///
/// # Example
///
/// ```ignore
/// use oodle_provider::{OodleProvider, ProviderService};
/// use serde_json::json;
///
/// let provider = OodleProvider::new();
/// provider
///     .configure(json!({
///         "deployment_url": "https://us1.oodle.ai",
///         "instance": "i",
///         "api_key": "k",
///     }))
///     .await?;
/// let state = provider.create("oodle_notifier", plan).await?;
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Metadata
    // =========================================================================

    /// Resource types this provider serves.
    fn metadata(&self) -> ProviderMetadata;

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Diagnostics, ProviderError> {
        let _ = config;
        Ok(Diagnostics::new())
    }

    /// Configure the provider with credentials and settings.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Diagnostics, ProviderError>;

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Diagnostics, ProviderError> {
        let _ = (resource_type, config);
        Ok(Diagnostics::new())
    }

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    ///
    /// `Value::Null` means the resource no longer exists.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}

/// A resource imported from existing infrastructure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names, sorted.
    pub resources: Vec<String>,
}

impl ProviderMetadata {
    /// Whether `resource_type` is served.
    pub fn supports(&self, resource_type: &str) -> bool {
        self.resources.iter().any(|r| r == resource_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("oodle_monitor", json!({"id": "abc"}));
        assert_eq!(imported.resource_type, "oodle_monitor");
        assert_eq!(imported.state["id"], "abc");
    }

    #[test]
    fn test_metadata_supports() {
        let metadata = ProviderMetadata {
            resources: vec!["oodle_monitor".to_string(), "oodle_notifier".to_string()],
        };
        assert!(metadata.supports("oodle_notifier"));
        assert!(!metadata.supports("oodle_widget"));
    }
}
