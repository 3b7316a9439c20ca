//! `oodle_grafana_folder` configuration model.

use serde::{Deserialize, Serialize};

use super::ResourceModel;
use crate::diagnostics::Diagnostics;
use crate::error::ConvertError;
use crate::models::GrafanaFolder;
use crate::validation;
use crate::value::{self, Attr, IntAttr, StringAttr};

/// A Grafana folder. `id` mirrors `uid`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrafanaFolderModel {
    pub id: StringAttr,
    pub uid: StringAttr,
    pub title: StringAttr,
    pub parent_uid: StringAttr,
    pub url: StringAttr,
    pub version: IntAttr,
}

impl ResourceModel<GrafanaFolder> for GrafanaFolderModel {
    const TYPE_NAME: &'static str = "oodle_grafana_folder";
    const KIND: &'static str = "grafana folder";

    fn id(&self) -> &StringAttr {
        &self.id
    }

    fn set_id(&mut self, id: StringAttr) {
        self.id = id;
    }

    /// Grafana's numeric folder ID is not part of the configuration and stays zero.
    fn to_domain(&self) -> Result<GrafanaFolder, ConvertError> {
        let uid = value::non_empty(&self.uid).or_else(|| value::non_empty(&self.id));
        Ok(GrafanaFolder {
            id: 0,
            uid: uid.unwrap_or_default().to_string(),
            title: value::required("title", &self.title)?,
            url: self.url.value_or_default(),
            parent_uid: self.parent_uid.value_or_default(),
            version: self.version.value_or_default(),
        })
    }

    fn from_domain(folder: &GrafanaFolder, _diagnostics: &mut Diagnostics) -> Self {
        Self {
            id: Attr::known(folder.uid.clone()),
            uid: Attr::known(folder.uid.clone()),
            title: Attr::known(folder.title.clone()),
            parent_uid: value::string_or_null(Some(&folder.parent_uid)),
            url: value::string_or_null(Some(&folder.url)),
            version: Attr::Known(folder.version),
        }
    }

    fn validate(&self, diagnostics: &mut Diagnostics) {
        validation::check_required("title", &self.title, diagnostics);
    }
}
