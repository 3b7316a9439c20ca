//! `oodle_log_metrics` configuration model.
//!
//! The filter block is recursive: every node holds exactly one of `match`,
//! `all`, `any` or `not`, and combinator children are filter nodes again.
//! Children keep their configured order in both directions. An `all` or
//! `any` needs at least one child; the backend drops empty lists.

use serde::{Deserialize, Serialize};

use super::{blocks_or_null, indexed, ResourceModel};
use crate::diagnostics::Diagnostics;
use crate::error::ConvertError;
use crate::models::logmetrics::{
    LabelValue, LogFilter, LogMatch, LogMetricsLabel, MatchOperator, MetricDefinition,
    MetricType, NumericExtractor, ValueExtractor,
};
use crate::models::LogMetrics;
use crate::validation;
use crate::value::{self, join_path, Attr, StringAttr};

/// A rule producing Prometheus metrics from logs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogMetricsModel {
    pub id: StringAttr,
    pub name: StringAttr,
    pub labels: Option<Vec<LabelModel>>,
    pub filter: Option<FilterModel>,
    pub metric_definitions: Option<Vec<MetricDefinitionModel>>,
}

/// A label added to every produced metric.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelModel {
    pub name: StringAttr,
    /// Static value. Excludes `value_extractor`.
    pub value: StringAttr,
    pub value_extractor: Option<ValueExtractorModel>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueExtractorModel {
    pub field: StringAttr,
    pub json_path: StringAttr,
    pub regex: StringAttr,
}

/// One node of the filter tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterModel {
    #[serde(rename = "match")]
    pub match_: Option<MatchModel>,
    pub all: Option<Vec<FilterModel>>,
    pub any: Option<Vec<FilterModel>>,
    pub not: Option<Box<FilterModel>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchModel {
    pub field: StringAttr,
    pub json_path: StringAttr,
    /// One of `is`, `contains`, `matches regex`, `exists`.
    pub operator: StringAttr,
    pub value: StringAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricDefinitionModel {
    pub name: StringAttr,
    /// One of `log_count`, `counter`, `gauge`, `histogram`.
    #[serde(rename = "type")]
    pub metric_type: StringAttr,
    pub field: StringAttr,
    pub json_path: StringAttr,
    pub regex: StringAttr,
}

fn parse_operator(path: &str, attr: &StringAttr) -> Result<MatchOperator, ConvertError> {
    let text = value::required(path, attr)?;
    MatchOperator::parse(&text)
        .ok_or_else(|| ConvertError::choice(path, text.as_str(), MatchOperator::NAMES))
}

fn parse_metric_type(path: &str, attr: &StringAttr) -> Result<MetricType, ConvertError> {
    let text = value::required(path, attr)?;
    MetricType::parse(&text)
        .ok_or_else(|| ConvertError::choice(path, text.as_str(), MetricType::NAMES))
}

// ============================================================================
// Labels
// ============================================================================

impl LabelModel {
    fn to_domain(&self, path: &str) -> Result<LogMetricsLabel, ConvertError> {
        self.check_source(path)?;
        let value = match &self.value_extractor {
            Some(extractor) => LabelValue::Extracted(ValueExtractor {
                field: extractor.field.as_known().cloned(),
                json_path: extractor.json_path.as_known().cloned(),
                regex: extractor.regex.as_known().cloned(),
            }),
            None => {
                let text = value::required(&join_path(path, "value"), &self.value)?;
                LabelValue::Static(text)
            },
        };
        Ok(LogMetricsLabel {
            name: value::required(&join_path(path, "name"), &self.name)?,
            value,
        })
    }

    fn from_domain(label: &LogMetricsLabel) -> Self {
        let mut model = Self {
            name: Attr::known(label.name.clone()),
            ..Self::default()
        };
        match &label.value {
            LabelValue::Static(v) => model.value = Attr::known(v.clone()),
            LabelValue::Extracted(e) => {
                model.value_extractor = Some(ValueExtractorModel {
                    field: Attr::from_option(e.field.clone()),
                    json_path: Attr::from_option(e.json_path.clone()),
                    regex: Attr::from_option(e.regex.clone()),
                });
            },
        }
        model
    }

    fn validate(&self, path: &str, diagnostics: &mut Diagnostics) {
        validation::check_required(&join_path(path, "name"), &self.name, diagnostics);
        validation::report(diagnostics, self.check_source(path));
    }

    fn check_source(&self, path: &str) -> Result<&'static str, ConvertError> {
        validation::exactly_one(
            path,
            &[
                ("value", !self.value.is_null()),
                ("value_extractor", self.value_extractor.is_some()),
            ],
        )
    }
}

// ============================================================================
// Filter tree
// ============================================================================

impl FilterModel {
    fn kind(&self, path: &str) -> Result<&'static str, ConvertError> {
        validation::exactly_one(
            path,
            &[
                ("match", self.match_.is_some()),
                ("all", self.all.is_some()),
                ("any", self.any.is_some()),
                ("not", self.not.is_some()),
            ],
        )
    }

    fn check_children(&self, path: &str) -> Result<(), ConvertError> {
        for (name, children) in [("all", &self.all), ("any", &self.any)] {
            if children.as_ref().is_some_and(Vec::is_empty) {
                return Err(ConvertError::union(
                    join_path(path, name),
                    format!("'{}' needs at least one filter node", name),
                ));
            }
        }
        Ok(())
    }

    fn to_domain(&self, path: &str) -> Result<LogFilter, ConvertError> {
        self.kind(path)?;
        self.check_children(path)?;
        if let Some(m) = &self.match_ {
            let match_path = join_path(path, "match");
            return Ok(LogFilter::Match(LogMatch {
                field: value::required(&join_path(&match_path, "field"), &m.field)?,
                json_path: m.json_path.as_known().cloned(),
                operator: parse_operator(&join_path(&match_path, "operator"), &m.operator)?,
                value: m.value.as_known().cloned(),
            }));
        }
        let children = |name: &str, nodes: &Vec<FilterModel>| {
            indexed(&join_path(path, name), Some(nodes), |p, c| c.to_domain(p))
        };
        if let Some(nodes) = &self.all {
            return Ok(LogFilter::All(children("all", nodes)?));
        }
        if let Some(nodes) = &self.any {
            return Ok(LogFilter::Any(children("any", nodes)?));
        }
        match &self.not {
            Some(child) => {
                let child = child.to_domain(&join_path(path, "not"))?;
                Ok(LogFilter::Not(Box::new(child)))
            },
            None => Err(ConvertError::union(path, "filter node is empty")),
        }
    }

    fn from_domain(filter: &LogFilter) -> Self {
        match filter {
            LogFilter::Match(m) => Self {
                match_: Some(MatchModel {
                    field: Attr::known(m.field.clone()),
                    json_path: Attr::from_option(m.json_path.clone()),
                    operator: Attr::known(m.operator.as_str()),
                    value: Attr::from_option(m.value.clone()),
                }),
                ..Self::default()
            },
            LogFilter::All(children) => Self {
                all: Some(children.iter().map(Self::from_domain).collect()),
                ..Self::default()
            },
            LogFilter::Any(children) => Self {
                any: Some(children.iter().map(Self::from_domain).collect()),
                ..Self::default()
            },
            LogFilter::Not(child) => Self {
                not: Some(Box::new(Self::from_domain(child))),
                ..Self::default()
            },
        }
    }

    fn validate(&self, path: &str, diagnostics: &mut Diagnostics) {
        validation::report(diagnostics, self.kind(path));
        validation::report(diagnostics, self.check_children(path));

        if let Some(m) = &self.match_ {
            let match_path = join_path(path, "match");
            validation::check_required(&join_path(&match_path, "field"), &m.field, diagnostics);
            let operator_path = join_path(&match_path, "operator");
            validation::check_required(&operator_path, &m.operator, diagnostics);
            let names = MatchOperator::NAMES;
            validation::check_choice(&operator_path, &m.operator, names, diagnostics);
        }
        for (name, children) in [("all", &self.all), ("any", &self.any)] {
            for (i, child) in children.iter().flatten().enumerate() {
                child.validate(&join_path(&join_path(path, name), i), diagnostics);
            }
        }
        if let Some(child) = &self.not {
            child.validate(&join_path(path, "not"), diagnostics);
        }
    }
}

// ============================================================================
// Metric definitions
// ============================================================================

impl MetricDefinitionModel {
    fn extractor(&self, path: &str) -> Result<Option<NumericExtractor>, ConvertError> {
        let json_path = value::non_empty(&self.json_path);
        let regex = value::non_empty(&self.regex);
        validation::at_most_one(
            path,
            &[("json_path", json_path.is_some()), ("regex", regex.is_some())],
        )?;
        Ok(match (json_path, regex) {
            (Some(p), _) => Some(NumericExtractor::JsonPath(p.to_string())),
            (_, Some(r)) => Some(NumericExtractor::Regex(r.to_string())),
            (None, None) => None,
        })
    }

    fn to_domain(&self, path: &str) -> Result<MetricDefinition, ConvertError> {
        Ok(MetricDefinition {
            name: value::required(&join_path(path, "name"), &self.name)?,
            metric_type: parse_metric_type(&join_path(path, "type"), &self.metric_type)?,
            field: value::non_empty(&self.field).map(str::to_string),
            extractor: self.extractor(path)?,
        })
    }

    fn from_domain(def: &MetricDefinition) -> Self {
        let (json_path, regex) = match &def.extractor {
            Some(NumericExtractor::JsonPath(p)) => (Attr::known(p.clone()), Attr::Null),
            Some(NumericExtractor::Regex(r)) => (Attr::Null, Attr::known(r.clone())),
            None => (Attr::Null, Attr::Null),
        };
        Self {
            name: Attr::known(def.name.clone()),
            metric_type: Attr::known(def.metric_type.as_str()),
            field: value::string_or_null(def.field.as_deref()),
            json_path,
            regex,
        }
    }

    fn validate(&self, path: &str, diagnostics: &mut Diagnostics) {
        let name_path = join_path(path, "name");
        validation::check_required(&name_path, &self.name, diagnostics);
        validation::check_metric_name(&name_path, &self.name, diagnostics);

        let type_path = join_path(path, "type");
        validation::check_required(&type_path, &self.metric_type, diagnostics);
        validation::check_choice(&type_path, &self.metric_type, MetricType::NAMES, diagnostics);
        validation::report(diagnostics, self.extractor(path));

        match self.metric_type.as_known().and_then(|t| MetricType::parse(t)) {
            Some(MetricType::LogCount) => {
                if !self.json_path.is_null() || !self.regex.is_null() {
                    diagnostics.add_attribute_error(
                        path,
                        "Invalid Attribute Combination",
                        "'json_path' and 'regex' are not used by 'log_count' metrics",
                    );
                }
            },
            Some(metric_type) => {
                if self.field.is_null() {
                    diagnostics.add_attribute_error(
                        join_path(path, "field"),
                        "Missing Attribute Value",
                        format!("'{}' metrics need a source 'field'", metric_type.as_str()),
                    );
                }
            },
            None => {},
        }
    }
}

impl ResourceModel<LogMetrics> for LogMetricsModel {
    const TYPE_NAME: &'static str = "oodle_log_metrics";
    const KIND: &'static str = "log metrics";

    fn id(&self) -> &StringAttr {
        &self.id
    }

    fn set_id(&mut self, id: StringAttr) {
        self.id = id;
    }

    fn to_domain(&self) -> Result<LogMetrics, ConvertError> {
        Ok(LogMetrics {
            id: value::parse_id(&self.id)?,
            name: self.name.value_or_default(),
            labels: indexed("labels", self.labels.as_ref(), |p, l| l.to_domain(p))?,
            filter: self
                .filter
                .as_ref()
                .map(|f| f.to_domain("filter"))
                .transpose()?,
            metric_definitions: indexed(
                "metric_definitions",
                self.metric_definitions.as_ref(),
                |p, d| d.to_domain(p),
            )?,
        })
    }

    fn from_domain(metrics: &LogMetrics, _diagnostics: &mut Diagnostics) -> Self {
        Self {
            id: value::id_attr(&metrics.id),
            name: Attr::known(metrics.name.clone()),
            labels: blocks_or_null(&metrics.labels, LabelModel::from_domain),
            filter: metrics.filter.as_ref().map(FilterModel::from_domain),
            metric_definitions: blocks_or_null(
                &metrics.metric_definitions,
                MetricDefinitionModel::from_domain,
            ),
        }
    }

    fn validate(&self, diagnostics: &mut Diagnostics) {
        validation::check_required("name", &self.name, diagnostics);

        for (i, label) in self.labels.iter().flatten().enumerate() {
            label.validate(&join_path("labels", i), diagnostics);
        }
        if let Some(filter) = &self.filter {
            filter.validate("filter", diagnostics);
        }
        match &self.metric_definitions {
            Some(defs) => {
                for (i, def) in defs.iter().enumerate() {
                    def.validate(&join_path("metric_definitions", i), diagnostics);
                }
            },
            None => diagnostics.add_attribute_error(
                "metric_definitions",
                "Missing required attribute 'metric_definitions'",
                "This attribute is required and must be provided",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    fn matcher(field: &str, operator: MatchOperator, value: Option<&str>) -> LogFilter {
        LogFilter::Match(LogMatch {
            field: field.to_string(),
            json_path: None,
            operator,
            value: value.map(str::to_string),
        })
    }

    fn full_rule() -> LogMetrics {
        LogMetrics {
            id: Uuid::new_v4(),
            name: "checkout errors".to_string(),
            labels: vec![
                LogMetricsLabel {
                    name: "team".to_string(),
                    value: LabelValue::Static("payments".to_string()),
                },
                LogMetricsLabel {
                    name: "route".to_string(),
                    value: LabelValue::Extracted(ValueExtractor {
                        field: Some("body".to_string()),
                        json_path: Some("$.http.route".to_string()),
                        regex: None,
                    }),
                },
            ],
            filter: Some(LogFilter::All(vec![
                matcher("service", MatchOperator::Is, Some("checkout")),
                LogFilter::Any(vec![
                    matcher("level", MatchOperator::Is, Some("error")),
                    matcher("msg", MatchOperator::Contains, Some("panic")),
                ]),
                LogFilter::Not(Box::new(LogFilter::Match(LogMatch {
                    field: "body".to_string(),
                    json_path: Some("$.path".to_string()),
                    operator: MatchOperator::MatchesRegex,
                    value: Some("^/health".to_string()),
                }))),
                matcher("trace_id", MatchOperator::Exists, None),
            ])),
            metric_definitions: vec![
                MetricDefinition {
                    name: "oodle_logs_checkout_errors".to_string(),
                    metric_type: MetricType::LogCount,
                    field: None,
                    extractor: None,
                },
                MetricDefinition {
                    name: "oodle_logs_checkout_latency".to_string(),
                    metric_type: MetricType::Histogram,
                    field: Some("msg".to_string()),
                    extractor: Some(NumericExtractor::Regex(r"took (\d+)ms".to_string())),
                },
                MetricDefinition {
                    name: "oodle_logs_cart_size".to_string(),
                    metric_type: MetricType::Gauge,
                    field: Some("body".to_string()),
                    extractor: Some(NumericExtractor::JsonPath("$.cart.items".to_string())),
                },
            ],
        }
    }

    #[test]
    fn test_full_rule_round_trips() {
        let rule = full_rule();
        let mut diagnostics = Diagnostics::new();
        let model = LogMetricsModel::from_domain(&rule, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(model.to_domain().unwrap(), rule);

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert!(diagnostics.is_empty(), "{}", diagnostics);
    }

    #[test]
    fn test_minimal_rule_emits_nulls() {
        let rule = LogMetrics {
            id: Uuid::new_v4(),
            name: "count".to_string(),
            metric_definitions: vec![MetricDefinition {
                name: "oodle_logs_total".to_string(),
                metric_type: MetricType::LogCount,
                field: None,
                extractor: None,
            }],
            ..LogMetrics::default()
        };

        let model = LogMetricsModel::from_domain(&rule, &mut Diagnostics::new());
        assert_eq!(model.labels, None);
        assert_eq!(model.filter, None);
        let def = &model.metric_definitions.as_ref().unwrap()[0];
        assert!(def.field.is_null());
        assert!(def.json_path.is_null());
        assert!(def.regex.is_null());
        assert_eq!(model.to_domain().unwrap(), rule);
    }

    #[test]
    fn test_filter_children_keep_order() {
        let model: LogMetricsModel = serde_json::from_value(json!({
            "name": "r",
            "filter": {"any": [
                {"match": {"field": "c", "operator": "exists"}},
                {"match": {"field": "a", "operator": "is", "value": "1"}},
                {"not": {"match": {"field": "b", "operator": "contains", "value": "x"}}},
            ]},
            "metric_definitions": [{"name": "oodle_logs_r", "type": "log_count"}],
        }))
        .unwrap();

        let domain = model.to_domain().unwrap();
        let Some(LogFilter::Any(children)) = &domain.filter else {
            panic!("expected an any node, got {:?}", domain.filter);
        };
        assert_eq!(children[0], matcher("c", MatchOperator::Exists, None));
        assert_eq!(children[1], matcher("a", MatchOperator::Is, Some("1")));
        assert!(matches!(children[2], LogFilter::Not(_)));

        let back = LogMetricsModel::from_domain(&domain, &mut Diagnostics::new());
        assert_eq!(back.filter, model.filter);
    }

    #[test]
    fn test_filter_node_with_two_kinds_is_rejected() {
        let model: LogMetricsModel = serde_json::from_value(json!({
            "name": "r",
            "filter": {"all": [{
                "match": {"field": "a", "operator": "exists"},
                "not": {"match": {"field": "b", "operator": "exists"}},
            }]},
            "metric_definitions": [{"name": "oodle_logs_r", "type": "log_count"}],
        }))
        .unwrap();

        let err = model.to_domain().unwrap_err();
        assert_eq!(err.path(), "filter.all.0");

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().attribute.as_deref(),
            Some("filter.all.0")
        );
    }

    #[test]
    fn test_empty_filter_node_is_rejected() {
        let model: LogMetricsModel = serde_json::from_value(json!({
            "name": "r",
            "filter": {"not": {}},
            "metric_definitions": [{"name": "oodle_logs_r", "type": "log_count"}],
        }))
        .unwrap();

        let err = model.to_domain().unwrap_err();
        assert_eq!(err.path(), "filter.not");
        assert!(err.to_string().contains("exactly one of"));
    }

    #[test]
    fn test_empty_combinator_is_rejected() {
        let model: LogMetricsModel = serde_json::from_value(json!({
            "name": "r",
            "filter": {"not": {"any": []}},
            "metric_definitions": [{"name": "oodle_logs_r", "type": "log_count"}],
        }))
        .unwrap();

        let err = model.to_domain().unwrap_err();
        assert_eq!(err.path(), "filter.not.any");

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().attribute.as_deref(),
            Some("filter.not.any")
        );
    }

    #[test]
    fn test_empty_match_value_round_trips() {
        let model: LogMetricsModel = serde_json::from_value(json!({
            "name": "r",
            "filter": {"match": {"field": "msg", "operator": "is", "value": ""}},
            "metric_definitions": [{"name": "oodle_logs_r", "type": "log_count"}],
        }))
        .unwrap();

        let domain = model.to_domain().unwrap();
        assert_eq!(domain.filter, Some(matcher("msg", MatchOperator::Is, Some(""))));

        let back = LogMetricsModel::from_domain(&domain, &mut Diagnostics::new());
        assert_eq!(back.filter, model.filter);
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let model: LogMetricsModel = serde_json::from_value(json!({
            "name": "r",
            "labels": [{"name": "team", "value": "a", "value_extractor": {"field": "f"}}],
            "filter": {"match": {"field": "level", "operator": "equals"}},
            "metric_definitions": [
                {"name": "errors", "type": "log_count"},
                {"name": "oodle_logs_x", "type": "gauge", "json_path": "$", "regex": ".*"},
            ],
        }))
        .unwrap();

        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);

        let paths: Vec<_> = diagnostics
            .iter()
            .map(|d| d.attribute.clone().unwrap())
            .collect();
        assert_eq!(
            paths,
            vec![
                "labels.0",
                "filter.match.operator",
                "metric_definitions.0.name",
                "metric_definitions.1",
                "metric_definitions.1.field",
            ]
        );
    }

    #[test]
    fn test_metric_definitions_are_required() {
        let model: LogMetricsModel = serde_json::from_value(json!({"name": "r"})).unwrap();
        let mut diagnostics = Diagnostics::new();
        model.validate(&mut diagnostics);
        assert!(diagnostics.has_error());
        assert_eq!(
            diagnostics.iter().next().unwrap().attribute.as_deref(),
            Some("metric_definitions")
        );
    }
}
