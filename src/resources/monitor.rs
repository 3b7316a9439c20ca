//! `oodle_monitor` configuration model.

use serde::{Deserialize, Serialize};

use super::{blocks_or_null, indexed, ResourceModel};
use crate::diagnostics::Diagnostics;
use crate::error::ConvertError;
use crate::models::monitor::{
    Condition, ConditionBySeverity, ConditionOp, Grouping, LabelMatcher,
    LabelMatcherNotificationPolicy, LabelMatcherNotifications, MatchType, NotificationRouting,
    NotifierSet,
};
use crate::models::Monitor;
use crate::validation;
use crate::value::{self, join_path, Attr, BoolAttr, FloatAttr, ListAttr, MapAttr, StringAttr};

/// A PromQL alerting monitor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorModel {
    pub id: StringAttr,
    pub name: StringAttr,
    pub interval: StringAttr,
    pub promql_query: StringAttr,
    pub conditions: Option<ConditionsModel>,
    pub labels: MapAttr,
    pub annotations: MapAttr,
    pub grouping: Option<GroupingModel>,
    /// Deprecated default policy; conflicts with `notifications`.
    pub notification_policy_id: StringAttr,
    /// Deprecated per-label policies; conflicts with `notifications`.
    pub label_matcher_notification_policies: Option<Vec<LabelMatcherPolicyModel>>,
    pub notifications: Option<Vec<NotificationRuleModel>>,
    pub group_wait: StringAttr,
    pub group_interval: StringAttr,
    pub repeat_interval: StringAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionsModel {
    pub warning: Option<ConditionModel>,
    pub critical: Option<ConditionModel>,
}

/// One alerting threshold.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionModel {
    /// One of `==`, `!=`, `>`, `>=`, `<`, `<=`.
    pub operation: StringAttr,
    pub value: FloatAttr,
    #[serde(rename = "for")]
    pub for_duration: StringAttr,
    pub keep_firing_for: StringAttr,
    pub alert_on_no_data: BoolAttr,
}

/// Alert grouping. Exactly one setting may be non-null.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingModel {
    pub by_monitor: BoolAttr,
    pub by_labels: ListAttr,
    pub disabled: BoolAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelMatcherModel {
    /// One of `=`, `!=`, `=~`, `!~`.
    #[serde(rename = "type")]
    pub match_type: StringAttr,
    pub name: StringAttr,
    pub value: StringAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelMatcherPolicyModel {
    pub matchers: Option<Vec<LabelMatcherModel>>,
    pub notification_policy_id: StringAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationRuleModel {
    pub matchers: Option<Vec<LabelMatcherModel>>,
    pub notifiers: Option<NotifierSetModel>,
}

/// Notifier IDs for a routing rule: `any`, or per severity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierSetModel {
    pub any: ListAttr,
    pub warn: ListAttr,
    pub critical: ListAttr,
    pub no_data: ListAttr,
}

// ============================================================================
// To domain
// ============================================================================

impl ConditionsModel {
    fn to_domain(&self, path: &str) -> Result<ConditionBySeverity, ConvertError> {
        Ok(ConditionBySeverity {
            warn: self
                .warning
                .as_ref()
                .map(|c| c.to_domain(&join_path(path, "warning")))
                .transpose()?,
            critical: self
                .critical
                .as_ref()
                .map(|c| c.to_domain(&join_path(path, "critical")))
                .transpose()?,
        })
    }
}

impl ConditionModel {
    fn to_domain(&self, path: &str) -> Result<Condition, ConvertError> {
        let op_path = join_path(path, "operation");
        let op_text = value::required(&op_path, &self.operation)?;
        let op = ConditionOp::parse(&op_text)
            .ok_or_else(|| ConvertError::choice(&op_path, op_text.as_str(), ConditionOp::NAMES))?;

        Ok(Condition {
            op,
            value: value::required(&join_path(path, "value"), &self.value)?,
            for_duration: value::optional_duration(&join_path(path, "for"), &self.for_duration)?,
            keep_firing_for: value::optional_duration(
                &join_path(path, "keep_firing_for"),
                &self.keep_firing_for,
            )?,
            alert_on_no_data: self.alert_on_no_data.value_or_default(),
        })
    }
}

impl GroupingModel {
    fn to_domain(&self, path: &str) -> Result<Option<Grouping>, ConvertError> {
        let by_labels = value::string_list(&join_path(path, "by_labels"), &self.by_labels)?;
        let mode = validation::at_most_one(
            path,
            &[
                ("by_monitor", validation::flag_is_set(&self.by_monitor)),
                ("by_labels", !by_labels.is_empty()),
                ("disabled", validation::flag_is_set(&self.disabled)),
            ],
        )?;
        Ok(match mode {
            Some("by_monitor") => Some(Grouping::ByMonitor),
            Some("by_labels") => Some(Grouping::ByLabels(by_labels)),
            Some("disabled") => Some(Grouping::Disabled),
            _ => None,
        })
    }
}

impl LabelMatcherModel {
    fn to_domain(&self, path: &str) -> Result<LabelMatcher, ConvertError> {
        let type_path = join_path(path, "type");
        let type_text = value::required(&type_path, &self.match_type)?;
        let match_type = MatchType::parse(&type_text)
            .ok_or_else(|| ConvertError::choice(&type_path, type_text.as_str(), MatchType::NAMES))?;

        Ok(LabelMatcher {
            match_type,
            name: value::required(&join_path(path, "name"), &self.name)?,
            value: value::required(&join_path(path, "value"), &self.value)?,
        })
    }
}

impl LabelMatcherPolicyModel {
    fn to_domain(&self, path: &str) -> Result<LabelMatcherNotificationPolicy, ConvertError> {
        let policy_path = join_path(path, "notification_policy_id");
        let policy = value::required(&policy_path, &self.notification_policy_id)?;
        Ok(LabelMatcherNotificationPolicy {
            matchers: indexed(
                &join_path(path, "matchers"),
                self.matchers.as_ref(),
                |p, m| m.to_domain(p),
            )?,
            notification_policy_id: value::parse_uuid(&policy_path, &policy)?,
        })
    }
}

impl NotificationRuleModel {
    fn to_domain(&self, path: &str) -> Result<LabelMatcherNotifications, ConvertError> {
        Ok(LabelMatcherNotifications {
            matchers: indexed(
                &join_path(path, "matchers"),
                self.matchers.as_ref(),
                |p, m| m.to_domain(p),
            )?,
            notifiers: match &self.notifiers {
                Some(set) => set.to_domain(&join_path(path, "notifiers"))?,
                None => NotifierSet::default(),
            },
        })
    }
}

impl NotifierSetModel {
    fn to_domain(&self, path: &str) -> Result<NotifierSet, ConvertError> {
        let any = value::uuid_list(&join_path(path, "any"), &self.any)?;
        let warn = value::uuid_list(&join_path(path, "warn"), &self.warn)?;
        let critical = value::uuid_list(&join_path(path, "critical"), &self.critical)?;
        let no_data = value::uuid_list(&join_path(path, "no_data"), &self.no_data)?;

        let per_severity = !warn.is_empty() || !critical.is_empty() || !no_data.is_empty();
        validation::notifiers_exclusive(path, !any.is_empty(), per_severity)?;

        Ok(if any.is_empty() {
            NotifierSet::BySeverity {
                warn,
                critical,
                no_data,
            }
        } else {
            NotifierSet::Any(any)
        })
    }
}

impl MonitorModel {
    fn uses_policies(&self) -> bool {
        value::non_empty(&self.notification_policy_id).is_some()
            || self
                .label_matcher_notification_policies
                .as_ref()
                .is_some_and(|p| !p.is_empty())
    }

    fn uses_notifications(&self) -> bool {
        self.notifications.as_ref().is_some_and(|n| !n.is_empty())
    }

    fn routing_to_domain(&self) -> Result<Option<NotificationRouting>, ConvertError> {
        validation::routing_exclusive(
            "notifications",
            self.uses_policies(),
            self.uses_notifications(),
        )?;

        if self.uses_policies() {
            return Ok(Some(NotificationRouting::Policies {
                default_policy: value::optional_uuid(
                    "notification_policy_id",
                    &self.notification_policy_id,
                )?,
                label_matchers: indexed(
                    "label_matcher_notification_policies",
                    self.label_matcher_notification_policies.as_ref(),
                    |p, rule| rule.to_domain(p),
                )?,
            }));
        }
        if self.uses_notifications() {
            return Ok(Some(NotificationRouting::Notifiers(indexed(
                "notifications",
                self.notifications.as_ref(),
                |p, rule| rule.to_domain(p),
            )?)));
        }
        Ok(None)
    }
}

// ============================================================================
// From domain
// ============================================================================

impl ConditionModel {
    fn from_domain(condition: &Condition) -> Self {
        Self {
            operation: Attr::known(condition.op.as_str()),
            value: Attr::Known(condition.value),
            for_duration: value::duration_or_null(condition.for_duration),
            keep_firing_for: value::duration_or_null(condition.keep_firing_for),
            alert_on_no_data: Attr::Known(condition.alert_on_no_data),
        }
    }
}

impl ConditionsModel {
    fn from_domain(conditions: &ConditionBySeverity) -> Option<Self> {
        if conditions.is_empty() {
            return None;
        }
        Some(Self {
            warning: conditions.warn.as_ref().map(ConditionModel::from_domain),
            critical: conditions.critical.as_ref().map(ConditionModel::from_domain),
        })
    }
}

impl GroupingModel {
    fn from_domain(grouping: &Grouping) -> Self {
        match grouping {
            Grouping::ByMonitor => Self {
                by_monitor: Attr::Known(true),
                ..Self::default()
            },
            Grouping::ByLabels(labels) => Self {
                by_labels: value::list_or_null(labels.iter().cloned()),
                ..Self::default()
            },
            Grouping::Disabled => Self {
                disabled: Attr::Known(true),
                ..Self::default()
            },
        }
    }
}

fn matchers_from_domain(matchers: &[LabelMatcher]) -> Option<Vec<LabelMatcherModel>> {
    blocks_or_null(matchers, |m| LabelMatcherModel {
        match_type: Attr::known(m.match_type.as_str()),
        name: Attr::known(m.name.clone()),
        value: Attr::known(m.value.clone()),
    })
}

impl NotifierSetModel {
    fn from_domain(set: &NotifierSet) -> Option<Self> {
        match set {
            NotifierSet::Any(any) => Some(Self {
                any: value::uuid_list_or_null(any),
                ..Self::default()
            }),
            NotifierSet::BySeverity {
                warn,
                critical,
                no_data,
            } if !(warn.is_empty() && critical.is_empty() && no_data.is_empty()) => Some(Self {
                any: Attr::Null,
                warn: value::uuid_list_or_null(warn),
                critical: value::uuid_list_or_null(critical),
                no_data: value::uuid_list_or_null(no_data),
            }),
            NotifierSet::BySeverity { .. } => None,
        }
    }
}

impl ResourceModel<Monitor> for MonitorModel {
    const TYPE_NAME: &'static str = "oodle_monitor";
    const KIND: &'static str = "monitor";

    fn id(&self) -> &StringAttr {
        &self.id
    }

    fn set_id(&mut self, id: StringAttr) {
        self.id = id;
    }

    fn to_domain(&self) -> Result<Monitor, ConvertError> {
        Ok(Monitor {
            id: value::parse_id(&self.id)?,
            name: self.name.value_or_default(),
            interval: value::optional_duration("interval", &self.interval)?,
            promql_query: self.promql_query.value_or_default(),
            conditions: match &self.conditions {
                Some(c) => c.to_domain("conditions")?,
                None => ConditionBySeverity::default(),
            },
            labels: value::string_map("labels", &self.labels)?,
            annotations: value::string_map("annotations", &self.annotations)?,
            grouping: match &self.grouping {
                Some(g) => g.to_domain("grouping")?,
                None => None,
            },
            routing: self.routing_to_domain()?,
            group_wait: value::optional_duration("group_wait", &self.group_wait)?,
            group_interval: value::optional_duration("group_interval", &self.group_interval)?,
            repeat_interval: value::optional_duration("repeat_interval", &self.repeat_interval)?,
        })
    }

    fn from_domain(monitor: &Monitor, _diagnostics: &mut Diagnostics) -> Self {
        let mut model = Self {
            id: value::id_attr(&monitor.id),
            name: Attr::known(monitor.name.clone()),
            interval: value::duration_or_null(monitor.interval),
            promql_query: Attr::known(monitor.promql_query.clone()),
            conditions: ConditionsModel::from_domain(&monitor.conditions),
            labels: value::map_or_null(&monitor.labels),
            annotations: value::map_or_null(&monitor.annotations),
            grouping: monitor.grouping.as_ref().map(GroupingModel::from_domain),
            group_wait: value::duration_or_null(monitor.group_wait),
            group_interval: value::duration_or_null(monitor.group_interval),
            repeat_interval: value::duration_or_null(monitor.repeat_interval),
            ..Self::default()
        };

        match &monitor.routing {
            Some(NotificationRouting::Policies {
                default_policy,
                label_matchers,
            }) => {
                model.notification_policy_id = match default_policy {
                    Some(id) => value::id_attr(id),
                    None => Attr::Null,
                };
                model.label_matcher_notification_policies =
                    blocks_or_null(label_matchers, |rule| LabelMatcherPolicyModel {
                        matchers: matchers_from_domain(&rule.matchers),
                        notification_policy_id: value::id_attr(&rule.notification_policy_id),
                    });
            },
            Some(NotificationRouting::Notifiers(rules)) => {
                model.notifications = blocks_or_null(rules, |rule| NotificationRuleModel {
                    matchers: matchers_from_domain(&rule.matchers),
                    notifiers: NotifierSetModel::from_domain(&rule.notifiers),
                });
            },
            None => {},
        }

        model
    }

    fn validate(&self, diagnostics: &mut Diagnostics) {
        validation::check_promql("promql_query", &self.promql_query, diagnostics);
        validation::check_duration("interval", &self.interval, diagnostics);
        validation::check_duration("group_wait", &self.group_wait, diagnostics);
        validation::check_duration("group_interval", &self.group_interval, diagnostics);
        validation::check_duration("repeat_interval", &self.repeat_interval, diagnostics);
        validation::check_uuid(
            "notification_policy_id",
            &self.notification_policy_id,
            diagnostics,
        );

        if let Some(conditions) = &self.conditions {
            let severities = [
                ("warning", conditions.warning.as_ref()),
                ("critical", conditions.critical.as_ref()),
            ];
            for (severity, condition) in severities {
                if let Some(c) = condition {
                    let path = join_path("conditions", severity);
                    validation::check_choice(
                        &join_path(&path, "operation"),
                        &c.operation,
                        ConditionOp::NAMES,
                        diagnostics,
                    );
                    validation::check_duration(
                        &join_path(&path, "for"),
                        &c.for_duration,
                        diagnostics,
                    );
                    validation::check_duration(
                        &join_path(&path, "keep_firing_for"),
                        &c.keep_firing_for,
                        diagnostics,
                    );
                }
            }
        }

        if let Some(grouping) = &self.grouping {
            validation::report(
                diagnostics,
                validation::exactly_one(
                    "grouping",
                    &[
                        ("by_monitor", !grouping.by_monitor.is_null()),
                        ("by_labels", !grouping.by_labels.is_null()),
                        ("disabled", !grouping.disabled.is_null()),
                    ],
                ),
            );
        }

        validation::report(
            diagnostics,
            validation::routing_exclusive(
                "notifications",
                self.uses_policies(),
                self.uses_notifications(),
            ),
        );

        for (i, rule) in self
            .label_matcher_notification_policies
            .iter()
            .flatten()
            .enumerate()
        {
            let path = join_path("label_matcher_notification_policies", i);
            validation::check_uuid(
                &join_path(&path, "notification_policy_id"),
                &rule.notification_policy_id,
                diagnostics,
            );
            validate_matchers(&path, rule.matchers.as_deref(), diagnostics);
        }

        for (i, rule) in self.notifications.iter().flatten().enumerate() {
            let path = join_path("notifications", i);
            validate_matchers(&path, rule.matchers.as_deref(), diagnostics);
            if let Some(set) = &rule.notifiers {
                let set_path = join_path(&path, "notifiers");
                for (name, ids) in [
                    ("any", &set.any),
                    ("warn", &set.warn),
                    ("critical", &set.critical),
                    ("no_data", &set.no_data),
                ] {
                    validation::check_uuid_list(&join_path(&set_path, name), ids, diagnostics);
                }
                validation::report(
                    diagnostics,
                    validation::notifiers_exclusive(
                        &set_path,
                        validation::list_is_set(&set.any),
                        validation::list_is_set(&set.warn)
                            || validation::list_is_set(&set.critical)
                            || validation::list_is_set(&set.no_data),
                    ),
                );
            }
        }
    }
}

fn validate_matchers(
    path: &str,
    matchers: Option<&[LabelMatcherModel]>,
    diagnostics: &mut Diagnostics,
) {
    for (i, matcher) in matchers.unwrap_or_default().iter().enumerate() {
        let matcher_path = join_path(&join_path(path, "matchers"), i);
        validation::check_choice(
            &join_path(&matcher_path, "type"),
            &matcher.match_type,
            MatchType::NAMES,
            diagnostics,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use uuid::Uuid;

    fn round_trip(monitor: &Monitor) -> Monitor {
        let mut diagnostics = Diagnostics::new();
        let model = MonitorModel::from_domain(monitor, &mut diagnostics);
        assert!(diagnostics.is_empty());
        model.to_domain().unwrap()
    }

    fn matcher(name: &str, value: &str) -> LabelMatcher {
        LabelMatcher {
            match_type: MatchType::Regexp,
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_example_monitor_round_trip() {
        let config: MonitorModel = serde_json::from_value(json!({
            "id": "0d9b3f2a-6c1e-4f0a-9a55-1c2d3e4f5a6b",
            "name": "cpu",
            "promql_query": "avg(cpu_usage)",
            "conditions": {
                "warning": {
                    "operation": ">", "value": 90.0, "for": "5m", "alert_on_no_data": false,
                },
            },
            "grouping": {"by_labels": ["service", "region"]},
            "group_wait": "30s",
        }))
        .unwrap();

        let monitor = config.to_domain().unwrap();
        assert_eq!(
            monitor.grouping,
            Some(Grouping::ByLabels(vec!["service".to_string(), "region".to_string()]))
        );
        assert_eq!(monitor.group_wait, Some(Duration::from_secs(30)));
        let warn = monitor.conditions.warn.as_ref().unwrap();
        assert_eq!(warn.op, ConditionOp::GreaterThan);
        assert_eq!(warn.for_duration, Some(Duration::from_secs(300)));

        let mut diagnostics = Diagnostics::new();
        let back = MonitorModel::from_domain(&monitor, &mut diagnostics);
        assert_eq!(back, config);

        let grouping = back.grouping.unwrap();
        assert!(grouping.by_monitor.is_null());
        assert!(grouping.disabled.is_null());
    }

    #[test]
    fn test_full_monitor_with_policies_round_trips() {
        let monitor = Monitor {
            id: Uuid::new_v4(),
            name: "latency".to_string(),
            interval: Some(Duration::from_secs(90)),
            promql_query: "histogram_quantile(0.99, rate(x[5m]))".to_string(),
            conditions: ConditionBySeverity {
                warn: Some(Condition {
                    op: ConditionOp::GreaterThanOrEqual,
                    value: 0.5,
                    for_duration: Some(Duration::from_secs(60)),
                    keep_firing_for: Some(Duration::from_secs(3600)),
                    alert_on_no_data: true,
                }),
                critical: Some(Condition {
                    op: ConditionOp::GreaterThan,
                    value: 1.0,
                    for_duration: None,
                    keep_firing_for: None,
                    alert_on_no_data: false,
                }),
            },
            labels: BTreeMap::from([("team".to_string(), "core".to_string())]),
            annotations: BTreeMap::from([("runbook".to_string(), "https://x".to_string())]),
            grouping: Some(Grouping::ByMonitor),
            routing: Some(NotificationRouting::Policies {
                default_policy: Some(Uuid::new_v4()),
                label_matchers: vec![
                    LabelMatcherNotificationPolicy {
                        matchers: vec![matcher("env", "prod.*"), matcher("region", "us")],
                        notification_policy_id: Uuid::new_v4(),
                    },
                    LabelMatcherNotificationPolicy {
                        matchers: vec![],
                        notification_policy_id: Uuid::new_v4(),
                    },
                ],
            }),
            group_wait: Some(Duration::from_secs(30)),
            group_interval: Some(Duration::from_secs(300)),
            repeat_interval: Some(Duration::from_secs(4 * 3600)),
        };

        assert_eq!(round_trip(&monitor), monitor);
    }

    #[test]
    fn test_notifications_routing_preserves_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let monitor = Monitor {
            id: Uuid::new_v4(),
            name: "errors".to_string(),
            promql_query: "sum(errors)".to_string(),
            grouping: Some(Grouping::Disabled),
            routing: Some(NotificationRouting::Notifiers(vec![
                LabelMatcherNotifications {
                    matchers: vec![matcher("service", "api")],
                    notifiers: NotifierSet::Any(vec![a, b]),
                },
                LabelMatcherNotifications {
                    matchers: vec![],
                    notifiers: NotifierSet::BySeverity {
                        warn: vec![c],
                        critical: vec![b, a],
                        no_data: vec![],
                    },
                },
            ])),
            ..Monitor::default()
        };

        assert_eq!(round_trip(&monitor), monitor);
    }

    #[test]
    fn test_minimal_monitor_emits_nulls() {
        let monitor = Monitor {
            id: Uuid::new_v4(),
            name: "up".to_string(),
            promql_query: "up".to_string(),
            ..Monitor::default()
        };

        let mut diagnostics = Diagnostics::new();
        let model = MonitorModel::from_domain(&monitor, &mut diagnostics);
        assert!(model.interval.is_null());
        assert!(model.labels.is_null());
        assert!(model.annotations.is_null());
        assert!(model.conditions.is_none());
        assert!(model.grouping.is_none());
        assert!(model.notification_policy_id.is_null());
        assert!(model.notifications.is_none());
        assert!(model.repeat_interval.is_null());

        assert_eq!(model.to_domain().unwrap(), monitor);
    }

    #[test]
    fn test_duration_spellings_canonicalize() {
        for spelling in ["1m0s", "1m", "60s"] {
            let model = MonitorModel {
                group_interval: Attr::known(spelling),
                ..MonitorModel::default()
            };
            let monitor = model.to_domain().unwrap();
            assert_eq!(monitor.group_interval, Some(Duration::from_secs(60)));

            let back = MonitorModel::from_domain(&monitor, &mut Diagnostics::new());
            assert_eq!(back.group_interval, Attr::known("1m"));
        }
    }

    #[test]
    fn test_unset_id_is_nil() {
        let model = MonitorModel {
            id: Attr::Unknown,
            name: Attr::known("x"),
            ..MonitorModel::default()
        };
        assert_eq!(model.to_domain().unwrap().id, Uuid::nil());
    }

    #[test]
    fn test_invalid_duration_names_attribute() {
        let model: MonitorModel = serde_json::from_value(json!({
            "conditions": {"critical": {"operation": "<", "value": 1, "for": "5 minutes"}},
        }))
        .unwrap();

        let err = model.to_domain().unwrap_err();
        assert_eq!(err.path(), "conditions.critical.for");
    }

    #[test]
    fn test_invalid_operation_is_rejected() {
        let model: MonitorModel = serde_json::from_value(json!({
            "conditions": {"warning": {"operation": "~", "value": 1}},
        }))
        .unwrap();

        let err = model.to_domain().unwrap_err();
        assert_eq!(err.path(), "conditions.warning.operation");
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn test_non_string_label_is_rejected() {
        let model: MonitorModel =
            serde_json::from_value(json!({"labels": {"env": "prod", "tier": 3}})).unwrap();

        let err = model.to_domain().unwrap_err();
        assert_eq!(err.path(), "labels.tier");
    }

    #[test]
    fn test_conflicting_routing() {
        let model: MonitorModel = serde_json::from_value(json!({
            "notification_policy_id": Uuid::new_v4(),
            "notifications": [{"notifiers": {"any": [Uuid::new_v4()]}}],
        }))
        .unwrap();

        assert!(model.to_domain().is_err());

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert_eq!(
            diagnostics.iter().next().unwrap().summary,
            validation::CONFLICTING_NOTIFICATIONS
        );
    }

    #[test]
    fn test_any_excludes_per_severity() {
        let model: MonitorModel = serde_json::from_value(json!({
            "notifications": [{"notifiers": {"any": [Uuid::new_v4()], "warn": [Uuid::new_v4()]}}],
        }))
        .unwrap();

        let err = model.to_domain().unwrap_err();
        assert_eq!(err.path(), "notifications.0.notifiers");

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().attribute.as_deref(),
            Some("notifications.0.notifiers")
        );
    }

    #[test]
    fn test_grouping_validation() {
        let two_modes: MonitorModel = serde_json::from_value(json!({
            "grouping": {"by_monitor": true, "disabled": true},
        }))
        .unwrap();
        let mut diagnostics = Diagnostics::new();
        two_modes.validate(&mut diagnostics);
        assert!(diagnostics.has_error());
        assert!(two_modes.to_domain().is_err());

        let empty: MonitorModel = serde_json::from_value(json!({"grouping": {}})).unwrap();
        let mut diagnostics = Diagnostics::new();
        empty.validate(&mut diagnostics);
        assert_eq!(
            diagnostics.iter().next().unwrap().attribute.as_deref(),
            Some("grouping")
        );
    }

    #[test]
    fn test_malformed_query_is_rejected() {
        let model: MonitorModel = serde_json::from_value(json!({
            "name": "bad",
            "promql_query": "sum(rate(errors[5m)",
        }))
        .unwrap();

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.summary, "Invalid promql query");
        assert_eq!(diagnostic.attribute.as_deref(), Some("promql_query"));
    }

    #[test]
    fn test_validate_accepts_well_formed_config() {
        let model: MonitorModel = serde_json::from_value(json!({
            "name": "ok",
            "promql_query": "up",
            "interval": "1m",
            "conditions": {"warning": {"operation": "!=", "value": 1, "for": "2m"}},
            "grouping": {"disabled": true},
            "notifications": [{
                "matchers": [{"type": "!~", "name": "env", "value": "dev"}],
                "notifiers": {"critical": [Uuid::new_v4()]},
            }],
        }))
        .unwrap();

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert!(diagnostics.is_empty(), "{}", diagnostics);
    }
}
