//! Generic resource lifecycle.
//!
//! [`ResourceController`] sequences every Create/Read/Update/Delete for one
//! resource type: convert the configuration model to the domain model, make
//! a single backend call, and rebuild state from the response. Nothing is
//! retried. A failure at any step aborts before state is produced.
//!
//! [`ResourceHandler`] is the object-safe, JSON-level view of a controller
//! that the provider dispatches to by resource type name.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::client::Backend;
use crate::diagnostics::Diagnostics;
use crate::error::{Action, ApiError, ProviderError};
use crate::resources::ResourceModel;
use crate::value::{self, Attr, StringAttr};

/// CRUD orchestration for the configuration model `R` of domain model `M`.
pub struct ResourceController<M, R> {
    backend: Arc<dyn Backend<M>>,
    _model: PhantomData<fn() -> R>,
}

impl<M, R> Clone for ResourceController<M, R> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _model: PhantomData,
        }
    }
}

impl<M, R> ResourceController<M, R>
where
    M: Send + Sync + 'static,
    R: ResourceModel<M>,
{
    /// Create a controller over `backend`.
    pub fn new(backend: Arc<dyn Backend<M>>) -> Self {
        Self {
            backend,
            _model: PhantomData,
        }
    }

    /// The resource type name handled by this controller.
    pub fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    /// Create the planned resource and return the resulting state.
    #[instrument(skip(self, plan), name = "resource.create")]
    pub async fn create(&self, plan: &R) -> Result<R, ProviderError> {
        debug!(resource_type = R::TYPE_NAME, "Create called");
        let model = plan.to_domain()?;

        let created = self
            .backend
            .create(&model)
            .await
            .map_err(|e| Self::backend_error(Action::Create, "", e))?;

        let state = Self::state_from(&created, plan)?;
        info!(
            resource_type = R::TYPE_NAME,
            id = %display_id(state.id()),
            "Created"
        );
        Ok(state)
    }

    /// Refresh `state` from the backend.
    ///
    /// Returns `None` when the backend no longer has the resource.
    #[instrument(skip(self, state), name = "resource.read")]
    pub async fn read(&self, state: &R) -> Result<Option<R>, ProviderError> {
        let id = Self::require_id(Action::Read, state.id())?;
        debug!(resource_type = R::TYPE_NAME, id = %id, "Read called");

        match self.backend.get(&id).await {
            Ok(current) => Self::state_from(&current, state).map(Some),
            Err(e) if e.is_not_found() => {
                warn!(
                    resource_type = R::TYPE_NAME,
                    id = %id,
                    "Resource no longer exists, removing from state"
                );
                Ok(None)
            },
            Err(e) => Err(Self::backend_error(Action::Read, &id, e)),
        }
    }

    /// Apply `plan` to the resource recorded in `prior`.
    #[instrument(skip(self, prior, plan), name = "resource.update")]
    pub async fn update(&self, prior: &R, plan: &R) -> Result<R, ProviderError> {
        // The planned id is computed; the prior state holds the real one.
        let mut plan = plan.clone();
        plan.set_id(prior.id().clone());
        let id = Self::require_id(Action::Update, plan.id())?;
        debug!(resource_type = R::TYPE_NAME, id = %id, "Update called");

        let model = plan.to_domain()?;
        let updated = self
            .backend
            .update(&model)
            .await
            .map_err(|e| Self::backend_error(Action::Update, &id, e))?;

        let state = Self::state_from(&updated, &plan)?;
        info!(resource_type = R::TYPE_NAME, id = %id, "Updated");
        Ok(state)
    }

    /// Delete the resource recorded in `state`. A resource that is already
    /// gone counts as deleted.
    #[instrument(skip(self, state), name = "resource.delete")]
    pub async fn delete(&self, state: &R) -> Result<(), ProviderError> {
        let id = Self::require_id(Action::Delete, state.id())?;
        debug!(resource_type = R::TYPE_NAME, id = %id, "Delete called");

        match self.backend.delete(&id).await {
            Ok(()) => {
                info!(resource_type = R::TYPE_NAME, id = %id, "Deleted");
                Ok(())
            },
            Err(e) if e.is_not_found() => {
                warn!(resource_type = R::TYPE_NAME, id = %id, "Resource already deleted");
                Ok(())
            },
            Err(e) => Err(Self::backend_error(Action::Delete, &id, e)),
        }
    }

    /// State carrying only the given ID. A following read fills in the rest.
    pub fn import(&self, id: &str) -> R {
        let mut state = R::default();
        state.set_id(Attr::known(id));
        state
    }

    fn require_id(action: Action, id: &StringAttr) -> Result<String, ProviderError> {
        value::non_empty(id).map(str::to_string).ok_or_else(|| {
            ProviderError::MissingId(format!("ID is required to {} {}", action, R::KIND))
        })
    }

    fn backend_error(action: Action, id: &str, source: ApiError) -> ProviderError {
        error!(
            resource_type = R::TYPE_NAME,
            id = %id,
            action = %action,
            error = %source,
            "Backend request failed"
        );
        ProviderError::backend(action, R::KIND, id, source)
    }

    fn state_from(model: &M, prior: &R) -> Result<R, ProviderError> {
        let mut diagnostics = Diagnostics::new();
        let mut state = R::from_domain(model, &mut diagnostics);
        if diagnostics.has_error() {
            return Err(ProviderError::Diagnostics(diagnostics));
        }
        for diag in diagnostics.iter() {
            warn!(resource_type = R::TYPE_NAME, summary = %diag.summary, "Read back with warnings");
        }
        state.retain_from(prior);
        Ok(state)
    }
}

fn display_id(id: &StringAttr) -> &str {
    value::non_empty(id).unwrap_or("<unset>")
}

// =========================================================================
// JSON dispatch
// =========================================================================

/// A resource type as the provider sees it: JSON state in, JSON state out.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Resource type name, e.g. `oodle_monitor`.
    fn type_name(&self) -> &'static str;

    /// Create from planned state.
    async fn create(&self, planned_state: Value) -> Result<Value, ProviderError>;

    /// Refresh state. Returns `Value::Null` when the resource is gone.
    async fn read(&self, current_state: Value) -> Result<Value, ProviderError>;

    /// Update from prior and planned state.
    async fn update(&self, prior_state: Value, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Delete the resource recorded in state.
    async fn delete(&self, current_state: Value) -> Result<(), ProviderError>;

    /// Read the resource with the given ID as a full state.
    async fn import(&self, id: &str) -> Result<Value, ProviderError>;
}

/// Validate a JSON configuration as the model `R`.
///
/// Needs no backend, so it also runs before the provider is configured.
pub fn validate_json<M, R: ResourceModel<M>>(config: Value) -> Result<Diagnostics, ProviderError> {
    let config: R = decode(config)?;
    let mut diagnostics = Diagnostics::new();
    config.validate(&mut diagnostics);
    Ok(diagnostics)
}

/// Decode a JSON document into a model. A null document is the empty model.
fn decode<R: DeserializeOwned + Default>(value: Value) -> Result<R, ProviderError> {
    if value.is_null() {
        return Ok(R::default());
    }
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl<M, R> ResourceHandler for ResourceController<M, R>
where
    M: Send + Sync + 'static,
    R: ResourceModel<M>,
{
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    async fn create(&self, planned_state: Value) -> Result<Value, ProviderError> {
        let plan: R = decode(planned_state)?;
        let state = ResourceController::create(self, &plan).await?;
        Ok(serde_json::to_value(state)?)
    }

    async fn read(&self, current_state: Value) -> Result<Value, ProviderError> {
        let state: R = decode(current_state)?;
        match ResourceController::read(self, &state).await? {
            Some(state) => Ok(serde_json::to_value(state)?),
            None => Ok(Value::Null),
        }
    }

    async fn update(
        &self,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let prior: R = decode(prior_state)?;
        let plan: R = decode(planned_state)?;
        let state = ResourceController::update(self, &prior, &plan).await?;
        Ok(serde_json::to_value(state)?)
    }

    async fn delete(&self, current_state: Value) -> Result<(), ProviderError> {
        let state: R = decode(current_state)?;
        ResourceController::delete(self, &state).await
    }

    async fn import(&self, id: &str) -> Result<Value, ProviderError> {
        let passthrough = ResourceController::import(self, id);
        match ResourceController::read(self, &passthrough).await? {
            Some(state) => Ok(serde_json::to_value(state)?),
            None => Err(ProviderError::NotFound(format!(
                "{} {} does not exist",
                R::KIND,
                id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notifier::{EmailConfig, NotifierChannel};
    use crate::models::Notifier;
    use crate::resources::notifier::EmailBlock;
    use crate::resources::NotifierModel;
    use crate::testing::MemoryBackend;
    use serde_json::json;
    use uuid::Uuid;

    type NotifierController = ResourceController<Notifier, NotifierModel>;

    fn backend() -> Arc<MemoryBackend<Notifier>> {
        Arc::new(MemoryBackend::with_id(|notifier: &mut Notifier, id| {
            notifier.id = id
        }))
    }

    fn plan(to: &str) -> NotifierModel {
        NotifierModel {
            id: Attr::Unknown,
            name: Attr::known("oncall"),
            notifier_type: Attr::known("email"),
            email_config: Some(EmailBlock {
                send_resolved: Attr::Known(true),
                to: Attr::known(to),
            }),
            ..NotifierModel::default()
        }
    }

    fn stored(id: Uuid, to: &str) -> Notifier {
        Notifier {
            id,
            name: "oncall".to_string(),
            channel: NotifierChannel::Email(EmailConfig {
                send_resolved: true,
                to: to.to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let backend = backend();
        let controller = NotifierController::new(backend.clone());

        let state = controller.create(&plan("a@example.com")).await.unwrap();
        let id = value::non_empty(&state.id).unwrap().to_string();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(state.name, Attr::known("oncall"));
        assert!(backend.contains(&id).await);
    }

    #[tokio::test]
    async fn test_create_conversion_error_skips_backend() {
        let backend = backend();
        let controller = NotifierController::new(backend.clone());

        let mut bad = plan("a@example.com");
        bad.notifier_type = Attr::known("carrier-pigeon");

        let err = controller.create(&bad).await.unwrap_err();
        assert!(matches!(err, ProviderError::Conversion(_)));
        assert_eq!(backend.len().await, 0);
    }

    #[tokio::test]
    async fn test_read_refreshes_state() {
        let id = Uuid::new_v4();
        let backend = Arc::new(
            MemoryBackend::with_id(|n: &mut Notifier, id| n.id = id)
                .with_item(stored(id, "new@example.com")),
        );
        let controller = NotifierController::new(backend);

        let state = controller.import(&id.to_string());
        let refreshed = controller.read(&state).await.unwrap().unwrap();
        assert_eq!(
            refreshed.email_config.unwrap().to,
            Attr::known("new@example.com")
        );
    }

    #[tokio::test]
    async fn test_read_missing_resource_is_none() {
        let controller = NotifierController::new(backend());
        let state = controller.import(&Uuid::new_v4().to_string());
        assert!(controller.read(&state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_requires_id() {
        let controller = NotifierController::new(backend());
        let err = controller.read(&plan("x@example.com")).await.unwrap_err();
        assert_eq!(err.message(), "ID is required to read notifier");
    }

    #[tokio::test]
    async fn test_update_copies_id_from_prior_state() {
        let backend = backend();
        let controller = NotifierController::new(backend.clone());

        let created = controller.create(&plan("a@example.com")).await.unwrap();
        let updated = controller
            .update(&created, &plan("b@example.com"))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(
            updated.email_config.unwrap().to,
            Attr::known("b@example.com")
        );
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_missing_resource_is_an_error() {
        let controller = NotifierController::new(backend());
        let prior = controller.import(&Uuid::new_v4().to_string());

        let err = controller
            .update(&prior, &plan("b@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Backend {
                action: Action::Update,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = backend();
        let controller = NotifierController::new(backend.clone());

        let state = controller.create(&plan("a@example.com")).await.unwrap();
        controller.delete(&state).await.unwrap();
        assert_eq!(backend.len().await, 0);
        controller.delete(&state).await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_failure_names_the_resource() {
        let backend = Arc::new(
            MemoryBackend::with_id(|n: &mut Notifier, id| n.id = id).fail_with(500, "boom"),
        );
        let controller = NotifierController::new(backend);

        let state = controller.import("6a1f0c0e-3f57-4a43-9d4b-4fbc1b6f5f10");
        let err = controller.read(&state).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not read notifier ID 6a1f0c0e-3f57-4a43-9d4b-4fbc1b6f5f10: \
             API request failed with status 500: boom"
        );
    }

    #[test]
    fn test_handler_round_trip_over_json() {
        let controller = NotifierController::new(backend());
        let handler: &dyn ResourceHandler = &controller;

        tokio_test::block_on(async {
            let state = handler
                .create(json!({
                    "name": "oncall",
                    "type": "email",
                    "email_config": {"to": "a@example.com", "send_resolved": true},
                }))
                .await
                .unwrap();
            assert_eq!(state["type"], "email");
            assert!(state["slack_config"].is_null());

            let id = state["id"].as_str().unwrap().to_string();
            let imported = handler.import(&id).await.unwrap();
            assert_eq!(imported, state);

            handler.delete(state).await.unwrap();
            assert_eq!(handler.read(imported).await.unwrap(), Value::Null);
        });
    }

    #[tokio::test]
    async fn test_handler_import_missing_is_not_found() {
        let controller = NotifierController::new(backend());
        let err = ResourceHandler::import(&controller, &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_validate_json_reports_diagnostics() {
        let diagnostics =
            validate_json::<Notifier, NotifierModel>(json!({"name": "n", "type": "email"}))
                .unwrap();
        assert!(diagnostics.has_error());

        let diagnostics = validate_json::<Notifier, NotifierModel>(Value::Null).unwrap();
        assert_eq!(
            diagnostics.iter().next().unwrap().attribute.as_deref(),
            Some("name")
        );
    }
}
