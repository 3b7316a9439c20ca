//! Grafana folder and dashboard wire models.
//!
//! Both are keyed by their Grafana `uid` rather than a UUID. A dashboard
//! body is an opaque JSON document, passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{null_default, ClientModel};

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// A Grafana folder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaFolder {
    /// Grafana's numeric ID.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub id: i64,
    /// Stable identifier; assigned by Grafana when empty on create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Folder title.
    #[serde(default)]
    pub title: String,
    /// Folder URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Parent folder UID for nested folders.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_uid: String,
    /// Optimistic-locking version.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: i64,
}

impl ClientModel for GrafanaFolder {
    const COLLECTION: &'static str = "grafana/folders";

    fn id(&self) -> String {
        self.uid.clone()
    }
}

/// Body of a folder update. Grafana only accepts a title change here.
#[derive(Debug, Clone, Serialize)]
pub struct FolderUpdateRequest<'a> {
    /// New title.
    pub title: &'a str,
    /// Version being replaced.
    pub version: i64,
    /// Replace regardless of version.
    pub overwrite: bool,
}

impl<'a> From<&'a GrafanaFolder> for FolderUpdateRequest<'a> {
    fn from(folder: &'a GrafanaFolder) -> Self {
        Self {
            title: &folder.title,
            version: folder.version,
            overwrite: true,
        }
    }
}

/// A Grafana dashboard.
///
/// Serializes as the save request `{dashboard, folderUid, overwrite, message}`.
/// The save and get responses carry the computed `uid`, `url` and `version`
/// and are converted with [`GrafanaDashboard::saved`] and the
/// `From<DashboardGetResponse>` impl.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaDashboard {
    /// Dashboard model JSON.
    #[serde(default)]
    pub dashboard: Value,
    /// Folder to save into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_uid: Option<String>,
    /// Replace an existing dashboard with the same UID or title.
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub overwrite: bool,
    /// Version history message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Dashboard UID.
    #[serde(skip)]
    pub uid: String,
    /// Dashboard URL.
    #[serde(skip)]
    pub url: String,
    /// Dashboard version.
    #[serde(skip)]
    pub version: i64,
}

impl GrafanaDashboard {
    /// The UID embedded in the dashboard body, if any.
    pub fn body_uid(&self) -> Option<&str> {
        self.dashboard.get("uid").and_then(Value::as_str)
    }

    /// Combine the request that was saved with the save response.
    pub fn saved(mut self, response: DashboardSaveResponse) -> Self {
        self.uid = response.uid;
        self.url = response.url;
        self.version = response.version;
        self
    }
}

impl ClientModel for GrafanaDashboard {
    const COLLECTION: &'static str = "grafana/dashboards";

    fn id(&self) -> String {
        if self.uid.is_empty() {
            self.body_uid().unwrap_or_default().to_string()
        } else {
            self.uid.clone()
        }
    }
}

/// Response to a dashboard save.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardSaveResponse {
    /// Numeric ID.
    #[serde(default)]
    pub id: i64,
    /// Dashboard UID.
    #[serde(default)]
    pub uid: String,
    /// Dashboard URL.
    #[serde(default)]
    pub url: String,
    /// Save status, e.g. `success`.
    #[serde(default)]
    pub status: String,
    /// New version.
    #[serde(default)]
    pub version: i64,
}

/// Response to a dashboard get.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardGetResponse {
    /// Dashboard model JSON.
    #[serde(default)]
    pub dashboard: Value,
    /// Dashboard metadata.
    #[serde(default, deserialize_with = "null_default")]
    pub meta: DashboardMeta,
}

/// Metadata returned alongside a dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMeta {
    /// Containing folder UID; empty for the root folder.
    #[serde(default)]
    pub folder_uid: String,
    /// Containing folder title.
    #[serde(default)]
    pub folder_title: String,
    /// Dashboard URL.
    #[serde(default)]
    pub url: String,
    /// Dashboard version.
    #[serde(default)]
    pub version: i64,
}

impl From<DashboardGetResponse> for GrafanaDashboard {
    fn from(response: DashboardGetResponse) -> Self {
        let uid = response
            .dashboard
            .get("uid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let meta = response.meta;
        Self {
            dashboard: response.dashboard,
            folder_uid: Some(meta.folder_uid).filter(|f| !f.is_empty()),
            overwrite: false,
            message: None,
            uid,
            url: meta.url,
            version: meta.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dashboard_request_encoding() {
        let dashboard = GrafanaDashboard {
            dashboard: json!({"uid": "abc", "title": "Latency"}),
            folder_uid: Some("ops".to_string()),
            overwrite: false,
            message: None,
            uid: "abc".to_string(),
            url: "/d/abc".to_string(),
            version: 3,
        };

        assert_eq!(
            serde_json::to_value(&dashboard).unwrap(),
            json!({"dashboard": {"uid": "abc", "title": "Latency"}, "folderUid": "ops"})
        );
    }

    #[test]
    fn test_dashboard_from_get_response() {
        let response: DashboardGetResponse = serde_json::from_value(json!({
            "dashboard": {"uid": "abc", "title": "Latency"},
            "meta": {"folderUid": "", "url": "/d/abc/latency", "version": 7, "slug": "latency"},
        }))
        .unwrap();

        let dashboard = GrafanaDashboard::from(response);
        assert_eq!(dashboard.uid, "abc");
        assert_eq!(dashboard.folder_uid, None);
        assert_eq!(dashboard.version, 7);
        assert_eq!(dashboard.id(), "abc");
    }

    #[test]
    fn test_dashboard_id_falls_back_to_body() {
        let dashboard = GrafanaDashboard {
            dashboard: json!({"uid": "from-body"}),
            ..GrafanaDashboard::default()
        };
        assert_eq!(dashboard.id(), "from-body");
    }

    #[test]
    fn test_folder_encoding() {
        let folder: GrafanaFolder = serde_json::from_value(json!({
            "id": 12, "uid": "ops", "title": "Ops", "url": "/dashboards/f/ops",
            "parentUid": "root", "version": 2, "created": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(folder.parent_uid, "root");
        assert_eq!(folder.id(), "ops");

        let update = serde_json::to_value(FolderUpdateRequest::from(&folder)).unwrap();
        assert_eq!(update, json!({"title": "Ops", "version": 2, "overwrite": true}));
    }
}
