//! Notification policy wire model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{is_false, null_default, ClientModel};

/// Notifiers to use per severity, optionally applied to every monitor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationPolicy {
    /// Identity; nil before create.
    #[serde(default)]
    pub id: Uuid,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Notifier IDs by severity.
    #[serde(default, deserialize_with = "null_default")]
    pub notifiers: NotifiersBySeverity,
    /// Apply to all monitors in addition to monitor-specific policies.
    #[serde(default, skip_serializing_if = "is_false")]
    pub global: bool,
    /// Silence this global policy.
    #[serde(default, skip_serializing_if = "is_false")]
    pub mute_global: bool,
    /// Silence every non-global policy. Only valid on a global policy.
    #[serde(default, skip_serializing_if = "is_false")]
    pub mute_non_global: bool,
}

impl ClientModel for NotificationPolicy {
    const COLLECTION: &'static str = "notification_policies";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// Notifier IDs for warning and critical alerts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotifiersBySeverity {
    /// Warning alerts.
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub warn: Vec<Uuid>,
    /// Critical alerts.
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub critical: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_wire_encoding() {
        let warn = Uuid::new_v4();
        let policy = NotificationPolicy {
            id: Uuid::nil(),
            name: "default".to_string(),
            notifiers: NotifiersBySeverity {
                warn: vec![warn],
                critical: vec![],
            },
            global: true,
            mute_global: false,
            mute_non_global: true,
        };

        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "name": "default",
                "notifiers": {"warn": [warn]},
                "global": true,
                "mute_non_global": true,
            })
        );

        let back: NotificationPolicy =
            serde_json::from_value(json!({"name": "default", "notifiers": null})).unwrap();
        assert!(back.notifiers.warn.is_empty());
        assert!(!back.global);
    }
}
