//! Monitor wire model.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::{is_false, null_default, ClientModel, DecodeError};
use crate::duration::prom_opt;

/// A PromQL alerting monitor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "MonitorWire", into = "MonitorWire")]
pub struct Monitor {
    /// Identity; nil before create.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Evaluation interval.
    pub interval: Option<Duration>,
    /// The PromQL expression evaluated each interval.
    pub promql_query: String,
    /// Thresholds per severity.
    pub conditions: ConditionBySeverity,
    /// Labels attached to fired alerts.
    pub labels: BTreeMap<String, String>,
    /// Annotations attached to fired alerts.
    pub annotations: BTreeMap<String, String>,
    /// How alerts are grouped into notifications.
    pub grouping: Option<Grouping>,
    /// Where notifications are sent.
    pub routing: Option<NotificationRouting>,
    /// Wait before the first notification for a new group.
    pub group_wait: Option<Duration>,
    /// Wait between notifications for an existing group.
    pub group_interval: Option<Duration>,
    /// Wait before re-sending a firing alert.
    pub repeat_interval: Option<Duration>,
}

impl ClientModel for Monitor {
    const COLLECTION: &'static str = "monitors";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// Optional warning and critical conditions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionBySeverity {
    /// Warning threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<Condition>,
    /// Critical threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<Condition>,
}

impl ConditionBySeverity {
    /// Whether neither severity is configured.
    pub fn is_empty(&self) -> bool {
        self.warn.is_none() && self.critical.is_none()
    }
}

/// A threshold comparison evaluated against the query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Comparison operator.
    pub op: ConditionOp,
    /// Threshold value.
    pub value: f64,
    /// How long the comparison must hold before firing.
    #[serde(
        rename = "for",
        default,
        with = "prom_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub for_duration: Option<Duration>,
    /// How long to keep firing after the comparison stops holding.
    #[serde(default, with = "prom_opt", skip_serializing_if = "Option::is_none")]
    pub keep_firing_for: Option<Duration>,
    /// Fire when the query returns no data.
    #[serde(default, skip_serializing_if = "is_false")]
    pub alert_on_no_data: bool,
}

macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = ($num:literal, $text:literal)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every accepted configuration spelling, in wire order.
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            /// The configuration spelling.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Parse the configuration spelling.
            pub fn parse(text: &str) -> Option<Self> {
                match text {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn to_wire(self) -> u8 {
                match self {
                    $(Self::$variant => $num),+
                }
            }

            fn from_wire(num: u8) -> Option<Self> {
                match num {
                    $($num => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_u8(self.to_wire())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let num = u8::deserialize(d)?;
                Self::from_wire(num).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        concat!("invalid ", stringify!($name), ": {}"),
                        num
                    ))
                })
            }
        }
    };
}

int_enum! {
    /// Comparison operator of a [`Condition`].
    ConditionOp {
        /// `==`
        Equal = (0, "=="),
        /// `!=`
        NotEqual = (1, "!="),
        /// `>`
        GreaterThan = (2, ">"),
        /// `>=`
        GreaterThanOrEqual = (3, ">="),
        /// `<`
        LessThan = (4, "<"),
        /// `<=`
        LessThanOrEqual = (5, "<="),
    }
}

int_enum! {
    /// Label comparison of a [`LabelMatcher`].
    MatchType {
        /// Exact equality.
        Equal = (0, "="),
        /// Inequality.
        NotEqual = (1, "!="),
        /// Regular expression match.
        Regexp = (2, "=~"),
        /// Negated regular expression match.
        NotRegexp = (3, "!~"),
    }
}

/// How fired alerts are grouped into notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// One group for the whole monitor.
    ByMonitor,
    /// One group per distinct value of these labels.
    ByLabels(Vec<String>),
    /// Every alert notifies on its own.
    Disabled,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GroupingWire {
    #[serde(default, skip_serializing_if = "is_false")]
    by_monitor: bool,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    by_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    disabled: bool,
}

impl From<Option<Grouping>> for GroupingWire {
    fn from(grouping: Option<Grouping>) -> Self {
        match grouping {
            None => Self::default(),
            Some(Grouping::ByMonitor) => Self {
                by_monitor: true,
                ..Self::default()
            },
            Some(Grouping::ByLabels(by_labels)) => Self {
                by_labels,
                ..Self::default()
            },
            Some(Grouping::Disabled) => Self {
                disabled: true,
                ..Self::default()
            },
        }
    }
}

impl TryFrom<GroupingWire> for Option<Grouping> {
    type Error = DecodeError;

    fn try_from(wire: GroupingWire) -> Result<Self, Self::Error> {
        let modes = usize::from(wire.by_monitor)
            + usize::from(!wire.by_labels.is_empty())
            + usize::from(wire.disabled);
        if modes > 1 {
            return Err(DecodeError(
                "grouping: only one of by_monitor, by_labels, disabled may be set".to_string(),
            ));
        }
        Ok(if wire.by_monitor {
            Some(Grouping::ByMonitor)
        } else if wire.disabled {
            Some(Grouping::Disabled)
        } else if !wire.by_labels.is_empty() {
            Some(Grouping::ByLabels(wire.by_labels))
        } else {
            None
        })
    }
}

/// A single label comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatcher {
    /// Comparison kind.
    #[serde(rename = "type")]
    pub match_type: MatchType,
    /// Label name.
    pub name: String,
    /// Value or pattern.
    pub value: String,
}

/// Route alerts whose labels match to a notification policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatcherNotificationPolicy {
    /// All must match.
    #[serde(default, deserialize_with = "null_default")]
    pub matchers: Vec<LabelMatcher>,
    /// Policy to use on match.
    pub notification_policy_id: Uuid,
}

/// Route alerts whose labels match to a set of notifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatcherNotifications {
    /// All must match.
    #[serde(default, deserialize_with = "null_default")]
    pub matchers: Vec<LabelMatcher>,
    /// Notifiers to use on match.
    #[serde(default)]
    pub notifiers: NotifierSet,
}

/// Notifier IDs, either for every severity or bucketed per severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NotifierSetWire", into = "NotifierSetWire")]
pub enum NotifierSet {
    /// Notify these for any severity.
    Any(Vec<Uuid>),
    /// Notify per severity.
    BySeverity {
        /// Warning alerts.
        warn: Vec<Uuid>,
        /// Critical alerts.
        critical: Vec<Uuid>,
        /// No-data alerts.
        no_data: Vec<Uuid>,
    },
}

impl Default for NotifierSet {
    fn default() -> Self {
        Self::BySeverity {
            warn: Vec::new(),
            critical: Vec::new(),
            no_data: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NotifierSetWire {
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    any: Vec<Uuid>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    warn: Vec<Uuid>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    critical: Vec<Uuid>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    no_data: Vec<Uuid>,
}

impl From<NotifierSet> for NotifierSetWire {
    fn from(set: NotifierSet) -> Self {
        match set {
            NotifierSet::Any(any) => Self {
                any,
                ..Self::default()
            },
            NotifierSet::BySeverity {
                warn,
                critical,
                no_data,
            } => Self {
                any: Vec::new(),
                warn,
                critical,
                no_data,
            },
        }
    }
}

impl TryFrom<NotifierSetWire> for NotifierSet {
    type Error = DecodeError;

    fn try_from(wire: NotifierSetWire) -> Result<Self, Self::Error> {
        let per_severity =
            !wire.warn.is_empty() || !wire.critical.is_empty() || !wire.no_data.is_empty();
        if !wire.any.is_empty() && per_severity {
            return Err(DecodeError(
                "notifiers: 'any' cannot be combined with warn, critical or no_data".to_string(),
            ));
        }
        Ok(if wire.any.is_empty() {
            Self::BySeverity {
                warn: wire.warn,
                critical: wire.critical,
                no_data: wire.no_data,
            }
        } else {
            Self::Any(wire.any)
        })
    }
}

/// Where a monitor's notifications go. The two shapes are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationRouting {
    /// Deprecated: a default policy plus ordered label-matcher policy rules.
    Policies {
        /// Policy used when no rule matches.
        default_policy: Option<Uuid>,
        /// Rules evaluated in order; first match wins.
        label_matchers: Vec<LabelMatcherNotificationPolicy>,
    },
    /// Ordered label-matcher notifier rules; first match wins.
    Notifiers(Vec<LabelMatcherNotifications>),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MonitorWire {
    #[serde(default)]
    id: Uuid,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, with = "prom_opt", skip_serializing_if = "Option::is_none")]
    interval: Option<Duration>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    promql_query: String,
    #[serde(default, deserialize_with = "null_default")]
    conditions: ConditionBySeverity,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    labels: BTreeMap<String, String>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    annotations: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_default")]
    grouping: GroupingWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notification_policy_id: Option<Uuid>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    label_matcher_notification_policies: Vec<LabelMatcherNotificationPolicy>,
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    notifications: Vec<LabelMatcherNotifications>,
    #[serde(default, with = "prom_opt", skip_serializing_if = "Option::is_none")]
    group_wait: Option<Duration>,
    #[serde(default, with = "prom_opt", skip_serializing_if = "Option::is_none")]
    group_interval: Option<Duration>,
    #[serde(default, with = "prom_opt", skip_serializing_if = "Option::is_none")]
    repeat_interval: Option<Duration>,
}

impl From<Monitor> for MonitorWire {
    fn from(m: Monitor) -> Self {
        let (notification_policy_id, label_matcher_notification_policies, notifications) =
            match m.routing {
                None => (None, Vec::new(), Vec::new()),
                Some(NotificationRouting::Policies {
                    default_policy,
                    label_matchers,
                }) => (default_policy, label_matchers, Vec::new()),
                Some(NotificationRouting::Notifiers(rules)) => (None, Vec::new(), rules),
            };

        Self {
            id: m.id,
            name: m.name,
            interval: m.interval.filter(|d| !d.is_zero()),
            promql_query: m.promql_query,
            conditions: m.conditions,
            labels: m.labels,
            annotations: m.annotations,
            grouping: m.grouping.into(),
            notification_policy_id,
            label_matcher_notification_policies,
            notifications,
            group_wait: m.group_wait,
            group_interval: m.group_interval,
            repeat_interval: m.repeat_interval,
        }
    }
}

impl TryFrom<MonitorWire> for Monitor {
    type Error = DecodeError;

    fn try_from(w: MonitorWire) -> Result<Self, Self::Error> {
        let deprecated =
            w.notification_policy_id.is_some() || !w.label_matcher_notification_policies.is_empty();
        let routing = match (deprecated, w.notifications.is_empty()) {
            (true, false) => {
                return Err(DecodeError(
                    "monitor: notification_policy_id/label_matcher_notification_policies \
                     cannot be combined with notifications"
                        .to_string(),
                ))
            },
            (true, true) => Some(NotificationRouting::Policies {
                default_policy: w.notification_policy_id,
                label_matchers: w.label_matcher_notification_policies,
            }),
            (false, false) => Some(NotificationRouting::Notifiers(w.notifications)),
            (false, true) => None,
        };

        Ok(Self {
            id: w.id,
            name: w.name,
            interval: w.interval,
            promql_query: w.promql_query,
            conditions: w.conditions,
            labels: w.labels,
            annotations: w.annotations,
            grouping: w.grouping.try_into()?,
            routing,
            group_wait: w.group_wait,
            group_interval: w.group_interval,
            repeat_interval: w.repeat_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_monitor_wire_encoding() {
        let policy = Uuid::new_v4();
        let monitor = Monitor {
            id: Uuid::nil(),
            name: "cpu".to_string(),
            interval: Some(Duration::from_secs(60)),
            promql_query: "avg(cpu) > 0".to_string(),
            conditions: ConditionBySeverity {
                warn: Some(Condition {
                    op: ConditionOp::GreaterThan,
                    value: 90.0,
                    for_duration: Some(Duration::from_secs(300)),
                    keep_firing_for: None,
                    alert_on_no_data: false,
                }),
                critical: None,
            },
            grouping: Some(Grouping::ByLabels(vec!["service".to_string()])),
            routing: Some(NotificationRouting::Policies {
                default_policy: Some(policy),
                label_matchers: vec![],
            }),
            group_wait: Some(Duration::from_secs(30)),
            ..Monitor::default()
        };

        let json = serde_json::to_value(&monitor).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "name": "cpu",
                "interval": "1m",
                "promql_query": "avg(cpu) > 0",
                "conditions": {"warn": {"op": 2, "value": 90.0, "for": "5m"}},
                "grouping": {"by_labels": ["service"]},
                "notification_policy_id": policy.to_string(),
                "group_wait": "30s",
            })
        );

        let back: Monitor = serde_json::from_value(json).unwrap();
        assert_eq!(back, monitor);
    }

    #[test]
    fn test_monitor_decodes_nulls_and_missing_fields() {
        let monitor: Monitor = serde_json::from_value(json!({
            "id": "6f1c1f8e-7d8e-4a55-9f5b-0a3c2b1d4e5f",
            "name": "m",
            "labels": null,
            "conditions": {"critical": {"op": 5, "value": 1.5}},
            "grouping": {},
            "notifications": null,
        }))
        .unwrap();

        assert!(monitor.labels.is_empty());
        assert!(monitor.grouping.is_none());
        assert!(monitor.routing.is_none());
        let critical = monitor.conditions.critical.unwrap();
        assert_eq!(critical.op, ConditionOp::LessThanOrEqual);
        assert_eq!(critical.for_duration, None);
    }

    #[test]
    fn test_conflicting_routing_fails_to_decode() {
        let err = serde_json::from_value::<Monitor>(json!({
            "notification_policy_id": Uuid::new_v4(),
            "notifications": [{"matchers": [], "notifiers": {"any": [Uuid::new_v4()]}}],
        }))
        .unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn test_conflicting_grouping_fails_to_decode() {
        let err = serde_json::from_value::<Monitor>(json!({
            "grouping": {"by_monitor": true, "disabled": true},
        }))
        .unwrap_err();
        assert!(err.to_string().contains("only one of"));
    }

    #[test]
    fn test_notifier_set_encoding() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(NotifierSet::Any(vec![id])).unwrap();
        assert_eq!(json, json!({"any": [id]}));

        let err = serde_json::from_value::<NotifierSet>(json!({"any": [id], "warn": [id]}))
            .unwrap_err();
        assert!(err.to_string().contains("'any'"));
    }

    #[test]
    fn test_enum_spellings() {
        assert_eq!(ConditionOp::parse(">="), Some(ConditionOp::GreaterThanOrEqual));
        assert_eq!(ConditionOp::parse("=>"), None);
        assert_eq!(MatchType::Regexp.as_str(), "=~");
        assert_eq!(serde_json::to_value(MatchType::NotRegexp).unwrap(), json!(3));
        assert!(serde_json::from_value::<ConditionOp>(json!(9)).is_err());
    }
}
