//! The Oodle provider.
//!
//! [`OodleProvider`] serves six resource types:
//!
//! | Resource type              | Collection            |
//! |----------------------------|-----------------------|
//! | `oodle_monitor`            | `monitors`            |
//! | `oodle_notifier`           | `notifiers`           |
//! | `oodle_notification_policy`| `notification_policies` |
//! | `oodle_log_metrics`        | `logmetrics`          |
//! | `oodle_grafana_folder`     | `grafana/folders`     |
//! | `oodle_grafana_dashboard`  | `grafana/dashboards`  |
//!
//! Validation works before the provider is configured. Every other
//! resource operation needs the clients built by
//! [`configure`](ProviderService::configure).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::{ApiClient, Backend, GrafanaDashboardClient, GrafanaFolderClient, ModelClient};
use crate::config::{ProviderConfig, ProviderConfigModel};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ProviderError;
use crate::lifecycle::{self, ResourceController, ResourceHandler};
use crate::models::{
    GrafanaDashboard, GrafanaFolder, LogMetrics, Monitor, NotificationPolicy, Notifier,
};
use crate::resources::{
    GrafanaDashboardModel, GrafanaFolderModel, LogMetricsModel, MonitorModel,
    NotificationPolicyModel, NotifierModel, ResourceModel,
};
use crate::service::{ImportedResource, ProviderMetadata, ProviderService};

type Validator = fn(Value) -> Result<Diagnostics, ProviderError>;

/// Every served type with its configuration validator.
const RESOURCES: &[(&str, Validator)] = &[
    (
        <MonitorModel as ResourceModel<Monitor>>::TYPE_NAME,
        lifecycle::validate_json::<Monitor, MonitorModel>,
    ),
    (
        <NotifierModel as ResourceModel<Notifier>>::TYPE_NAME,
        lifecycle::validate_json::<Notifier, NotifierModel>,
    ),
    (
        <NotificationPolicyModel as ResourceModel<NotificationPolicy>>::TYPE_NAME,
        lifecycle::validate_json::<NotificationPolicy, NotificationPolicyModel>,
    ),
    (
        <LogMetricsModel as ResourceModel<LogMetrics>>::TYPE_NAME,
        lifecycle::validate_json::<LogMetrics, LogMetricsModel>,
    ),
    (
        <GrafanaFolderModel as ResourceModel<GrafanaFolder>>::TYPE_NAME,
        lifecycle::validate_json::<GrafanaFolder, GrafanaFolderModel>,
    ),
    (
        <GrafanaDashboardModel as ResourceModel<GrafanaDashboard>>::TYPE_NAME,
        lifecycle::validate_json::<GrafanaDashboard, GrafanaDashboardModel>,
    ),
];

/// One backend per resource collection.
pub struct Backends {
    /// Monitors.
    pub monitors: Arc<dyn Backend<Monitor>>,
    /// Notifiers.
    pub notifiers: Arc<dyn Backend<Notifier>>,
    /// Notification policies.
    pub notification_policies: Arc<dyn Backend<NotificationPolicy>>,
    /// Log metrics rules.
    pub log_metrics: Arc<dyn Backend<LogMetrics>>,
    /// Grafana folders.
    pub grafana_folders: Arc<dyn Backend<GrafanaFolder>>,
    /// Grafana dashboards.
    pub grafana_dashboards: Arc<dyn Backend<GrafanaDashboard>>,
}

impl Backends {
    /// REST backends sharing one authenticated client.
    pub fn http(api: Arc<ApiClient>) -> Self {
        Self {
            monitors: Arc::new(ModelClient::<Monitor>::new(Arc::clone(&api))),
            notifiers: Arc::new(ModelClient::<Notifier>::new(Arc::clone(&api))),
            notification_policies: Arc::new(ModelClient::<NotificationPolicy>::new(Arc::clone(
                &api,
            ))),
            log_metrics: Arc::new(ModelClient::<LogMetrics>::new(Arc::clone(&api))),
            grafana_folders: Arc::new(GrafanaFolderClient::new(Arc::clone(&api))),
            grafana_dashboards: Arc::new(GrafanaDashboardClient::new(api)),
        }
    }
}

type Registry = BTreeMap<&'static str, Arc<dyn ResourceHandler>>;

fn registry(backends: Backends) -> Registry {
    let handlers: Vec<Arc<dyn ResourceHandler>> = vec![
        Arc::new(ResourceController::<Monitor, MonitorModel>::new(backends.monitors)),
        Arc::new(ResourceController::<Notifier, NotifierModel>::new(backends.notifiers)),
        Arc::new(
            ResourceController::<NotificationPolicy, NotificationPolicyModel>::new(
                backends.notification_policies,
            ),
        ),
        Arc::new(ResourceController::<LogMetrics, LogMetricsModel>::new(backends.log_metrics)),
        Arc::new(ResourceController::<GrafanaFolder, GrafanaFolderModel>::new(
            backends.grafana_folders,
        )),
        Arc::new(
            ResourceController::<GrafanaDashboard, GrafanaDashboardModel>::new(
                backends.grafana_dashboards,
            ),
        ),
    ];
    handlers.into_iter().map(|h| (h.type_name(), h)).collect()
}

/// Provider for Oodle monitors, notifiers, notification policies, log
/// metrics and Grafana folders and dashboards.
#[derive(Default)]
pub struct OodleProvider {
    registry: RwLock<Option<Arc<Registry>>>,
}

impl OodleProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider already wired to the given backends.
    pub fn with_backends(backends: Backends) -> Self {
        Self {
            registry: RwLock::new(Some(Arc::new(registry(backends)))),
        }
    }

    /// Whether resource operations can run.
    pub async fn is_configured(&self) -> bool {
        self.registry.read().await.is_some()
    }

    fn validator(resource_type: &str) -> Result<Validator, ProviderError> {
        RESOURCES
            .iter()
            .find(|(name, _)| *name == resource_type)
            .map(|(_, validate)| *validate)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    async fn handler(
        &self,
        resource_type: &str,
    ) -> Result<Arc<dyn ResourceHandler>, ProviderError> {
        Self::validator(resource_type)?;
        let guard = self.registry.read().await;
        let registry = guard
            .as_ref()
            .ok_or_else(|| ProviderError::Configuration("provider is not configured".to_string()))?;
        registry
            .get(resource_type)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }
}

fn parse_config(config: Value) -> Result<ProviderConfigModel, ProviderError> {
    if config.is_null() {
        return Ok(ProviderConfigModel::default());
    }
    Ok(serde_json::from_value(config)?)
}

#[async_trait::async_trait]
impl ProviderService for OodleProvider {
    fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> =
            RESOURCES.iter().map(|(name, _)| name.to_string()).collect();
        resources.sort();
        ProviderMetadata { resources }
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Diagnostics, ProviderError> {
        let model = parse_config(config)?;
        let mut diagnostics = Diagnostics::new();
        if let Some(raw) = model.deployment_url.as_known() {
            if let Err(err) = url::Url::parse(raw) {
                diagnostics.push(
                    Diagnostic::error("Invalid Oodle Deployment")
                        .with_detail(format!("{:?} is not a valid URL: {}", raw, err))
                        .with_attribute("deployment_url"),
                );
            }
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Diagnostics, ProviderError> {
        let model = parse_config(config)?;
        let config = match ProviderConfig::resolve(&model) {
            Ok(config) => config,
            Err(diagnostics) => {
                warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                return Ok(diagnostics);
            },
        };

        let api = Arc::new(ApiClient::new(&config)?);
        debug!(base_url = %api.base_url(), "API client ready");
        *self.registry.write().await = Some(Arc::new(registry(Backends::http(api))));

        info!(
            deployment = %config.deployment_url,
            instance = %config.instance,
            "Provider configured"
        );
        Ok(Diagnostics::new())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Diagnostics, ProviderError> {
        let validate = Self::validator(resource_type)?;
        let diagnostics = validate(config)?;
        if diagnostics.has_error() {
            warn!(
                resource_type = %resource_type,
                diagnostics = diagnostics.len(),
                "ValidateResourceConfig completed with errors"
            );
        }
        Ok(diagnostics)
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.handler(resource_type).await?.create(planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.handler(resource_type).await?.read(current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.handler(resource_type)
            .await?
            .update(prior_state, planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.handler(resource_type).await?.delete(current_state).await
    }

    #[instrument(skip(self), name = "provider.import")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let state = self.handler(resource_type).await?.import(id).await?;
        info!(resource_type = %resource_type, id = %id, "Imported");
        Ok(vec![ImportedResource::new(resource_type, state)])
    }
}
