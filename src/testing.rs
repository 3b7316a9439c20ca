//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] the way a plugin harness
//! would, without a harness. [`MemoryBackend`] stands in for the REST API
//! so controllers and the provider can be exercised without a network.
//!
//! # Example
//!
//! ```
//! use oodle_provider::testing::{memory_backends, ProviderTester};
//! use oodle_provider::OodleProvider;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let tester = ProviderTester::new(OodleProvider::with_backends(memory_backends()));
//! let state = tester
//!     .lifecycle_create("oodle_grafana_folder", json!({"title": "Platform"}))
//!     .await
//!     .unwrap();
//! assert_eq!(state["title"], "Platform");
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::client::Backend;
use crate::diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics};
use crate::error::{ApiError, ProviderError};
use crate::models::{
    ClientModel, GrafanaDashboard, GrafanaFolder, LogMetrics, Monitor, NotificationPolicy,
    Notifier,
};
use crate::provider::Backends;
use crate::service::{ImportedResource, ProviderService};

/// A test harness for provider implementations.
///
/// Wraps a [`ProviderService`] and turns error diagnostics into a
/// [`TestError`] so tests can use `?` and `unwrap`.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Create a resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read a resource. `Value::Null` means it is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import a resource by ID.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Validate, create, then read back.
    ///
    /// Returns the state after the read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate_resource_config(resource_type, config.clone())
            .await?;

        let created = self.create(resource_type, config).await?;
        let current = self.read(resource_type, created).await?;
        if current.is_null() {
            return Err(TestError::Provider(ProviderError::NotFound(format!(
                "{} disappeared right after create",
                resource_type
            ))));
        }
        Ok(current)
    }

    /// Run a full CRUD lifecycle: create → read → update → read → delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, TestError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;

        self.validate_resource_config(resource_type, updated_config.clone())
            .await?;
        let updated = self
            .update(resource_type, created, updated_config)
            .await?;
        let current = self.read(resource_type, updated).await?;

        self.delete(resource_type, current.clone()).await?;
        Ok(current)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Diagnostics) -> Result<(), TestError> {
    let errors = diagnostics.errors();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// In-memory backend
// =========================================================================

type AssignId<M> = Box<dyn Fn(&mut M, Uuid) + Send + Sync>;

/// A [`Backend`] that stores resources in a map keyed by their ID.
///
/// Behaves like the REST API: missing IDs fail with
/// [`ApiError::NotFound`], and create assigns a fresh ID through the hook
/// passed to [`MemoryBackend::with_id`].
pub struct MemoryBackend<M> {
    items: Mutex<BTreeMap<String, M>>,
    assign_id: AssignId<M>,
    failure: Option<(u16, String)>,
}

impl<M: ClientModel> MemoryBackend<M> {
    /// An empty backend; `assign_id` stores the new ID into a created model.
    pub fn with_id(assign_id: impl Fn(&mut M, Uuid) + Send + Sync + 'static) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            assign_id: Box::new(assign_id),
            failure: None,
        }
    }

    /// Seed a stored resource.
    pub fn with_item(mut self, item: M) -> Self {
        self.items.get_mut().insert(item.id(), item);
        self
    }

    /// Fail every call with the given status and body.
    pub fn fail_with(mut self, status: u16, body: impl Into<String>) -> Self {
        self.failure = Some((status, body.into()));
        self
    }

    /// Number of stored resources.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Whether a resource with `id` is stored.
    pub async fn contains(&self, id: &str) -> bool {
        self.items.lock().await.contains_key(id)
    }

    /// A copy of the stored resource.
    pub async fn stored(&self, id: &str) -> Option<M> {
        self.items.lock().await.get(id).cloned()
    }

    fn check_failure(&self) -> Result<(), ApiError> {
        match &self.failure {
            Some((status, body)) => Err(ApiError::Status {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::NotFound {
            path: format!("{}/{}", M::COLLECTION, id),
        }
    }
}

#[async_trait]
impl<M: ClientModel> Backend<M> for MemoryBackend<M> {
    async fn get(&self, id: &str) -> Result<M, ApiError> {
        self.check_failure()?;
        self.stored(id).await.ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, model: &M) -> Result<M, ApiError> {
        self.check_failure()?;
        let mut created = model.clone();
        (self.assign_id)(&mut created, Uuid::new_v4());
        self.items
            .lock()
            .await
            .insert(created.id(), created.clone());
        Ok(created)
    }

    async fn update(&self, model: &M) -> Result<M, ApiError> {
        self.check_failure()?;
        let id = model.id();
        let mut items = self.items.lock().await;
        match items.get_mut(&id) {
            Some(slot) => {
                *slot = model.clone();
                Ok(model.clone())
            },
            None => Err(Self::not_found(&id)),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.check_failure()?;
        match self.items.lock().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(id)),
        }
    }
}

/// In-memory backends for every resource collection.
pub fn memory_backends() -> Backends {
    Backends {
        monitors: Arc::new(MemoryBackend::with_id(|m: &mut Monitor, id| m.id = id)),
        notifiers: Arc::new(MemoryBackend::with_id(|n: &mut Notifier, id| n.id = id)),
        notification_policies: Arc::new(MemoryBackend::with_id(
            |p: &mut NotificationPolicy, id| p.id = id,
        )),
        log_metrics: Arc::new(MemoryBackend::with_id(|l: &mut LogMetrics, id| l.id = id)),
        grafana_folders: Arc::new(MemoryBackend::with_id(|f: &mut GrafanaFolder, id| {
            if f.uid.is_empty() {
                f.uid = id.simple().to_string();
            }
            f.version += 1;
        })),
        grafana_dashboards: Arc::new(MemoryBackend::with_id(|d: &mut GrafanaDashboard, id| {
            if d.id().is_empty() {
                d.uid = id.simple().to_string();
            } else {
                d.uid = d.id();
            }
            d.url = format!("/d/{}", d.uid);
            d.version += 1;
        })),
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that an error diagnostic mentions `substring` in its summary or detail.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let mentions = |d: &Diagnostic| {
        d.summary.contains(substring)
            || d.detail.as_deref().is_some_and(|detail| detail.contains(substring))
    };
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();

    assert!(
        errors.iter().copied().any(mentions),
        "Expected an error mentioning '{}', but none did. Errors: {:?}",
        substring,
        errors
            .iter()
            .map(|d| (&d.summary, &d.detail))
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OodleProvider;
    use serde_json::json;

    fn tester() -> ProviderTester<OodleProvider> {
        ProviderTester::new(OodleProvider::with_backends(memory_backends()))
    }

    #[tokio::test]
    async fn test_tester_resource_types() {
        let types = tester().resource_types();
        assert!(types.contains(&"oodle_monitor".to_string()));
        assert_eq!(types.len(), 6);
    }

    #[tokio::test]
    async fn test_tester_lifecycle_create() {
        let state = tester()
            .lifecycle_create("oodle_grafana_folder", json!({"title": "Platform"}))
            .await
            .unwrap();

        assert_eq!(state["title"], "Platform");
        assert_eq!(state["version"], 1);
        assert_eq!(state["id"], state["uid"]);
    }

    #[tokio::test]
    async fn test_tester_lifecycle_crud() {
        let final_state = tester()
            .lifecycle_crud(
                "oodle_grafana_dashboard",
                json!({"config_json": r#"{"title": "Latency"}"#, "message": "first"}),
                json!({"config_json": r#"{"title": "Latency v2"}"#, "message": "second"}),
            )
            .await
            .unwrap();

        assert_eq!(final_state["config_json"], r#"{"title": "Latency v2"}"#);
        assert_eq!(final_state["message"], "second");
        assert!(final_state["folder"].is_null());
    }

    #[tokio::test]
    async fn test_tester_lifecycle_rejects_invalid_config() {
        let err = tester()
            .lifecycle_create("oodle_grafana_dashboard", json!({"config_json": "[]"}))
            .await
            .unwrap_err();

        let TestError::Diagnostics(diagnostics) = err else {
            panic!("expected diagnostics, got {err}");
        };
        assert_error_contains(&diagnostics, "Invalid JSON");
    }

    #[tokio::test]
    async fn test_memory_backend_reports_missing_ids() {
        let backend = MemoryBackend::with_id(|n: &mut Notifier, id| n.id = id);
        let err = backend.get("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(backend.delete("nope").await.unwrap_err().is_not_found());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_backend_failure() {
        let backend =
            MemoryBackend::with_id(|n: &mut Notifier, id| n.id = id).fail_with(503, "down");
        let err = backend.get("any").await.unwrap_err();
        assert_eq!(err.to_string(), "API request failed with status 503: down");
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_has_errors() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_has_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Missing Oodle API Key")
            .with_detail("Set the api_key value in the configuration")];
        assert_error_contains(&diagnostics, "Missing");
        assert_error_contains(&diagnostics, "api_key value");
    }

    #[test]
    #[should_panic(expected = "Expected an error mentioning")]
    fn test_assert_error_contains_ignores_warnings() {
        let diagnostics = vec![Diagnostic::warning("Read back with warnings")];
        assert_error_contains(&diagnostics, "warnings");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("conditions.warning.for"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("conditions.warning.for"));
        assert!(display.contains("More info"));
    }
}
