//! `oodle_grafana_dashboard` configuration model.
//!
//! `config_json` holds the dashboard model as JSON text. The backend echoes
//! the document back with its own key order and spacing, so the planned text
//! is kept whenever it parses to the same JSON value. `overwrite` and
//! `message` only apply to the save request and are never read back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ResourceModel;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ConvertError;
use crate::models::GrafanaDashboard;
use crate::validation;
use crate::value::{self, Attr, BoolAttr, IntAttr, StringAttr};

/// A Grafana dashboard. `id` mirrors `uid`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrafanaDashboardModel {
    pub id: StringAttr,
    pub uid: StringAttr,
    pub config_json: StringAttr,
    /// UID of the containing folder; null for the root folder.
    pub folder: StringAttr,
    pub overwrite: BoolAttr,
    pub message: StringAttr,
    pub url: StringAttr,
    pub version: IntAttr,
}

fn parse_config(text: &str) -> Result<Value, ConvertError> {
    serde_json::from_str(text).map_err(|source| ConvertError::InvalidJson {
        path: "config_json".to_string(),
        source,
    })
}

/// Compact JSON text. `serde_json`'s default map keeps keys sorted.
fn render_config(dashboard: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(dashboard)
}

impl ResourceModel<GrafanaDashboard> for GrafanaDashboardModel {
    const TYPE_NAME: &'static str = "oodle_grafana_dashboard";
    const KIND: &'static str = "grafana dashboard";

    fn id(&self) -> &StringAttr {
        &self.id
    }

    fn set_id(&mut self, id: StringAttr) {
        self.id = id;
    }

    fn to_domain(&self) -> Result<GrafanaDashboard, ConvertError> {
        let text = value::required("config_json", &self.config_json)?;
        let uid = value::non_empty(&self.uid).or_else(|| value::non_empty(&self.id));
        Ok(GrafanaDashboard {
            dashboard: parse_config(&text)?,
            folder_uid: value::non_empty(&self.folder).map(str::to_string),
            overwrite: self.overwrite.value_or_default(),
            message: value::non_empty(&self.message).map(str::to_string),
            uid: uid.unwrap_or_default().to_string(),
            url: self.url.value_or_default(),
            version: self.version.value_or_default(),
        })
    }

    fn from_domain(dashboard: &GrafanaDashboard, diagnostics: &mut Diagnostics) -> Self {
        let config_json = match render_config(&dashboard.dashboard) {
            Ok(text) => Attr::Known(text),
            Err(err) => {
                diagnostics.push(
                    Diagnostic::error("Failed to render dashboard JSON")
                        .with_detail(err.to_string())
                        .with_attribute("config_json"),
                );
                Attr::Null
            },
        };

        Self {
            id: Attr::known(dashboard.uid.clone()),
            uid: Attr::known(dashboard.uid.clone()),
            config_json,
            folder: value::string_or_null(dashboard.folder_uid.as_deref()),
            overwrite: Attr::Known(dashboard.overwrite),
            message: value::string_or_null(dashboard.message.as_deref()),
            url: value::string_or_null(Some(&dashboard.url)),
            version: Attr::Known(dashboard.version),
        }
    }

    fn validate(&self, diagnostics: &mut Diagnostics) {
        validation::check_required("config_json", &self.config_json, diagnostics);
        if let Some(text) = self.config_json.as_known() {
            if let Some(parsed) = validation::report(diagnostics, parse_config(text)) {
                if !parsed.is_object() {
                    diagnostics.add_attribute_error(
                        "config_json",
                        "Invalid JSON",
                        format!(
                            "dashboard must be a JSON object, got {}",
                            value::value_type_name(&parsed)
                        ),
                    );
                }
            }
        }
    }

    fn retain_from(&mut self, prior: &Self) {
        self.overwrite = prior.overwrite.clone();
        self.message = prior.message.clone();

        if let (Attr::Known(planned), Attr::Known(current)) =
            (&prior.config_json, &self.config_json)
        {
            let same = match (parse_config(planned), parse_config(current)) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            };
            if same {
                self.config_json = Attr::Known(planned.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dashboard() -> GrafanaDashboard {
        GrafanaDashboard {
            dashboard: json!({
                "uid": "latency",
                "title": "Latency",
                "panels": [{"id": 1, "type": "timeseries", "targets": [{"expr": "up"}]}],
                "schemaVersion": 39,
            }),
            folder_uid: Some("ops".to_string()),
            overwrite: true,
            message: Some("initial".to_string()),
            uid: "latency".to_string(),
            url: "/d/latency/latency".to_string(),
            version: 2,
        }
    }

    #[test]
    fn test_dashboard_round_trips() {
        let dashboard = dashboard();
        let mut diagnostics = Diagnostics::new();
        let model = GrafanaDashboardModel::from_domain(&dashboard, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(model.to_domain().unwrap(), dashboard);
    }

    #[test]
    fn test_config_json_is_compact_and_sorted() {
        let dashboard = GrafanaDashboard {
            dashboard: json!({"title": "T", "panels": [], "editable": true}),
            uid: "t".to_string(),
            ..GrafanaDashboard::default()
        };

        let model = GrafanaDashboardModel::from_domain(&dashboard, &mut Diagnostics::new());
        assert_eq!(
            model.config_json,
            Attr::known(r#"{"editable":true,"panels":[],"title":"T"}"#)
        );
        assert!(model.folder.is_null());
        assert!(model.message.is_null());
        assert!(model.url.is_null());
    }

    #[test]
    fn test_retain_keeps_planned_text_and_write_only_fields() {
        let planned = GrafanaDashboardModel {
            config_json: Attr::known("{\n  \"title\": \"T\",\n  \"editable\": true\n}"),
            overwrite: Attr::Known(true),
            message: Attr::known("tweak"),
            ..GrafanaDashboardModel::default()
        };

        let read_back = GrafanaDashboard {
            dashboard: json!({"editable": true, "title": "T"}),
            uid: "t".to_string(),
            ..GrafanaDashboard::default()
        };
        let mut state = GrafanaDashboardModel::from_domain(&read_back, &mut Diagnostics::new());
        state.retain_from(&planned);

        assert_eq!(state.config_json, planned.config_json);
        assert_eq!(state.overwrite, Attr::Known(true));
        assert_eq!(state.message, Attr::known("tweak"));
        assert_eq!(state.uid, Attr::known("t"));
    }

    #[test]
    fn test_retain_takes_backend_text_on_drift() {
        let planned = GrafanaDashboardModel {
            config_json: Attr::known(r#"{"title": "Old"}"#),
            ..GrafanaDashboardModel::default()
        };

        let read_back = GrafanaDashboard {
            dashboard: json!({"title": "New"}),
            uid: "t".to_string(),
            ..GrafanaDashboard::default()
        };
        let mut state = GrafanaDashboardModel::from_domain(&read_back, &mut Diagnostics::new());
        state.retain_from(&planned);

        assert_eq!(state.config_json, Attr::known(r#"{"title":"New"}"#));
    }

    #[test]
    fn test_invalid_config_json() {
        let model = GrafanaDashboardModel {
            config_json: Attr::known("{not json"),
            ..GrafanaDashboardModel::default()
        };

        let err = model.to_domain().unwrap_err();
        assert_eq!(err.path(), "config_json");
        assert!(matches!(err, ConvertError::InvalidJson { .. }));

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert_eq!(diagnostics.iter().next().unwrap().summary, "Invalid JSON");
    }

    #[test]
    fn test_config_json_must_be_an_object() {
        let model = GrafanaDashboardModel {
            config_json: Attr::known("[1, 2]"),
            ..GrafanaDashboardModel::default()
        };

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        let detail = diagnostics.iter().next().unwrap().detail.clone().unwrap();
        assert!(detail.contains("list"));
    }
}
