//! Backend transport for the Oodle REST API.
//!
//! Every resource lives under
//! `{deployment}/v1/api/instance/{instance}/{collection}[/{id}]` and is
//! exchanged as its JSON wire model. Requests carry the API key in the
//! `X-API-KEY` header.
//!
//! Only `200 OK` counts as success. `404` is reported as
//! [`ApiError::NotFound`] so callers can tell a deleted resource apart from
//! a failing backend; every other status is [`ApiError::Status`].

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ProviderConfig;
use crate::error::ApiError;
use crate::models::grafana::{
    DashboardGetResponse, DashboardSaveResponse, FolderUpdateRequest, GrafanaDashboard,
    GrafanaFolder,
};
use crate::models::ClientModel;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

const BODY_PREVIEW_CHARS: usize = 200;

/// CRUD access to one resource collection.
#[async_trait]
pub trait Backend<M>: Send + Sync {
    /// Fetch a resource by ID.
    async fn get(&self, id: &str) -> Result<M, ApiError>;

    /// Create a resource; returns the stored resource with its assigned ID.
    async fn create(&self, model: &M) -> Result<M, ApiError>;

    /// Replace a resource; the ID is taken from `model`.
    async fn update(&self, model: &M) -> Result<M, ApiError>;

    /// Delete a resource by ID.
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

// ============================================================================
// ApiClient
// ============================================================================

/// Authenticated HTTP client bound to one Oodle instance.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client with the API key installed as a default header.
    pub fn new(config: &ProviderConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| ApiError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self {
            http,
            base_url: Self::instance_url(&config.deployment_url, &config.instance),
        })
    }

    /// `{deployment}/v1/api/instance/{instance}/`, keeping any path prefix.
    fn instance_url(deployment: &Url, instance: &str) -> Url {
        let mut url = deployment.clone();
        let prefix = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{prefix}/v1/api/instance/{instance}/"));
        url
    }

    /// The instance base URL every request path is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        Self::handle_response(path, resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_response(path, resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        Self::handle_response(path, resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        let status = resp.status();
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(Self::status_error(path, status, resp).await)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        path: &str,
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Self::status_error(path, status, resp).await);
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
            ApiError::Decode {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    async fn status_error(path: &str, status: StatusCode, resp: reqwest::Response) -> ApiError {
        if status == StatusCode::NOT_FOUND {
            return ApiError::NotFound {
                path: path.to_string(),
            };
        }
        let body = resp.text().await.unwrap_or_default();
        ApiError::Status {
            status: status.as_u16(),
            body: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        }
    }
}

fn item_path(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

// ============================================================================
// ModelClient
// ============================================================================

/// Generic client for a [`ClientModel`] collection.
pub struct ModelClient<M> {
    api: Arc<ApiClient>,
    _model: PhantomData<fn() -> M>,
}

impl<M> ModelClient<M> {
    /// Wrap a shared API client.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            _model: PhantomData,
        }
    }
}

#[async_trait]
impl<M: ClientModel> Backend<M> for ModelClient<M> {
    async fn get(&self, id: &str) -> Result<M, ApiError> {
        self.api.get(&item_path(M::COLLECTION, id)).await
    }

    async fn create(&self, model: &M) -> Result<M, ApiError> {
        self.api.post(M::COLLECTION, model).await
    }

    async fn update(&self, model: &M) -> Result<M, ApiError> {
        self.api.put(&item_path(M::COLLECTION, &model.id()), model).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete(&item_path(M::COLLECTION, id)).await
    }
}

// ============================================================================
// Grafana
// ============================================================================

/// Grafana folders. Updates send only the title and version.
pub struct GrafanaFolderClient {
    inner: ModelClient<GrafanaFolder>,
}

impl GrafanaFolderClient {
    /// Wrap a shared API client.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            inner: ModelClient::new(api),
        }
    }
}

#[async_trait]
impl Backend<GrafanaFolder> for GrafanaFolderClient {
    async fn get(&self, uid: &str) -> Result<GrafanaFolder, ApiError> {
        self.inner.get(uid).await
    }

    async fn create(&self, folder: &GrafanaFolder) -> Result<GrafanaFolder, ApiError> {
        self.inner.create(folder).await
    }

    async fn update(&self, folder: &GrafanaFolder) -> Result<GrafanaFolder, ApiError> {
        let path = item_path(GrafanaFolder::COLLECTION, &folder.uid);
        self.inner
            .api
            .put(&path, &FolderUpdateRequest::from(folder))
            .await
    }

    async fn delete(&self, uid: &str) -> Result<(), ApiError> {
        self.inner.delete(uid).await
    }
}

/// Grafana dashboards. Create and update are both a save; update overwrites.
pub struct GrafanaDashboardClient {
    api: Arc<ApiClient>,
}

impl GrafanaDashboardClient {
    /// Wrap a shared API client.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    async fn save(&self, dashboard: GrafanaDashboard) -> Result<GrafanaDashboard, ApiError> {
        let response: DashboardSaveResponse = self
            .api
            .post(GrafanaDashboard::COLLECTION, &dashboard)
            .await?;
        Ok(dashboard.saved(response))
    }
}

#[async_trait]
impl Backend<GrafanaDashboard> for GrafanaDashboardClient {
    async fn get(&self, uid: &str) -> Result<GrafanaDashboard, ApiError> {
        let response: DashboardGetResponse = self
            .api
            .get(&item_path(GrafanaDashboard::COLLECTION, uid))
            .await?;
        Ok(response.into())
    }

    async fn create(&self, dashboard: &GrafanaDashboard) -> Result<GrafanaDashboard, ApiError> {
        self.save(dashboard.clone()).await
    }

    async fn update(&self, dashboard: &GrafanaDashboard) -> Result<GrafanaDashboard, ApiError> {
        let mut dashboard = dashboard.clone();
        dashboard.overwrite = true;
        if !dashboard.uid.is_empty() {
            if let Value::Object(body) = &mut dashboard.dashboard {
                body.entry("uid")
                    .or_insert_with(|| Value::String(dashboard.uid.clone()));
            }
        }
        self.save(dashboard).await
    }

    async fn delete(&self, uid: &str) -> Result<(), ApiError> {
        self.api
            .delete(&item_path(GrafanaDashboard::COLLECTION, uid))
            .await
    }
}
