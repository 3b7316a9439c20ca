//! `oodle_notification_policy` configuration model.

use serde::{Deserialize, Serialize};

use super::ResourceModel;
use crate::diagnostics::Diagnostics;
use crate::error::ConvertError;
use crate::models::notification_policy::NotifiersBySeverity;
use crate::models::NotificationPolicy;
use crate::validation;
use crate::value::{self, join_path, Attr, BoolAttr, ListAttr, StringAttr};

/// Notifiers per severity, optionally applied to every monitor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPolicyModel {
    pub id: StringAttr,
    pub name: StringAttr,
    #[serde(deserialize_with = "crate::models::null_default")]
    pub notifiers: NotifiersModel,
    pub global: BoolAttr,
    pub mute_global: BoolAttr,
    pub mute_non_global: BoolAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifiersModel {
    pub warn: ListAttr,
    pub critical: ListAttr,
}

impl ResourceModel<NotificationPolicy> for NotificationPolicyModel {
    const TYPE_NAME: &'static str = "oodle_notification_policy";
    const KIND: &'static str = "notification policy";

    fn id(&self) -> &StringAttr {
        &self.id
    }

    fn set_id(&mut self, id: StringAttr) {
        self.id = id;
    }

    fn to_domain(&self) -> Result<NotificationPolicy, ConvertError> {
        Ok(NotificationPolicy {
            id: value::parse_id(&self.id)?,
            name: self.name.value_or_default(),
            notifiers: NotifiersBySeverity {
                warn: value::uuid_list("notifiers.warn", &self.notifiers.warn)?,
                critical: value::uuid_list("notifiers.critical", &self.notifiers.critical)?,
            },
            global: self.global.value_or_default(),
            mute_global: self.mute_global.value_or_default(),
            mute_non_global: self.mute_non_global.value_or_default(),
        })
    }

    fn from_domain(policy: &NotificationPolicy, _diagnostics: &mut Diagnostics) -> Self {
        Self {
            id: value::id_attr(&policy.id),
            name: Attr::known(policy.name.clone()),
            notifiers: NotifiersModel {
                warn: value::uuid_list_or_null(&policy.notifiers.warn),
                critical: value::uuid_list_or_null(&policy.notifiers.critical),
            },
            global: Attr::Known(policy.global),
            mute_global: Attr::Known(policy.mute_global),
            mute_non_global: Attr::Known(policy.mute_non_global),
        }
    }

    fn validate(&self, diagnostics: &mut Diagnostics) {
        validation::check_required("name", &self.name, diagnostics);
        let lists = [
            ("warn", &self.notifiers.warn),
            ("critical", &self.notifiers.critical),
        ];
        for (name, ids) in lists {
            validation::check_uuid_list(&join_path("notifiers", name), ids, diagnostics);
        }
    }
}
