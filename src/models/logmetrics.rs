//! Log metrics wire model.
//!
//! A log metrics rule turns matching log lines into Prometheus metrics.
//! The filter is a recursive tree: each node is a single field match or an
//! `all`/`any`/`not` combinator over child nodes. On the wire a match node
//! carries its fields inline (`{"field": .., "operator": ..}`), and
//! combinators use `{"all": [..]}`, `{"any": [..]}` and `{"not": {..}}`.
//! The backend omits empty combinator lists, so a stored filter of `{}`
//! reads back as no filter.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{null_default, ClientModel, DecodeError};

/// A log-derived metrics rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMetrics {
    /// Identity; nil before create.
    #[serde(default)]
    pub id: Uuid,
    /// Rule name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Labels added to every produced metric, in order.
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub labels: Vec<LogMetricsLabel>,
    /// Which logs are processed. `None` processes all logs.
    #[serde(
        default,
        deserialize_with = "empty_filter_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub filter: Option<LogFilter>,
    /// Metrics produced from each matching log, in order.
    #[serde(
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub metric_definitions: Vec<MetricDefinition>,
}

fn empty_filter_as_none<'de, D>(deserializer: D) -> Result<Option<LogFilter>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Map<String, Value>>::deserialize(deserializer)? {
        Some(node) if !node.is_empty() => LogFilter::deserialize(Value::Object(node))
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

impl ClientModel for LogMetrics {
    const COLLECTION: &'static str = "logmetrics";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// A label and where its value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LabelWire", into = "LabelWire")]
pub struct LogMetricsLabel {
    /// Label name.
    pub name: String,
    /// Label value source.
    pub value: LabelValue,
}

/// A label value: fixed, or extracted from each log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelValue {
    /// The same value on every metric.
    Static(String),
    /// Extracted from a log field.
    Extracted(ValueExtractor),
}

/// Extracts a value from a log field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueExtractor {
    /// Log field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Path into a JSON field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,
    /// Pattern whose match becomes the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelWire {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_extractor: Option<ValueExtractor>,
}

impl From<LogMetricsLabel> for LabelWire {
    fn from(label: LogMetricsLabel) -> Self {
        let (value, value_extractor) = match label.value {
            LabelValue::Static(v) => (Some(v), None),
            LabelValue::Extracted(e) => (None, Some(e)),
        };
        Self {
            name: label.name,
            value,
            value_extractor,
        }
    }
}

impl TryFrom<LabelWire> for LogMetricsLabel {
    type Error = DecodeError;

    fn try_from(w: LabelWire) -> Result<Self, Self::Error> {
        let value = match (w.value, w.value_extractor) {
            (Some(v), None) => LabelValue::Static(v),
            (None, Some(e)) => LabelValue::Extracted(e),
            (Some(_), Some(_)) => {
                return Err(DecodeError(format!(
                    "label {:?}: value and valueExtractor are mutually exclusive",
                    w.name
                )))
            },
            (None, None) => {
                return Err(DecodeError(format!(
                    "label {:?}: one of value or valueExtractor is required",
                    w.name
                )))
            },
        };
        Ok(Self {
            name: w.name,
            value,
        })
    }
}

/// How a match node compares the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOperator {
    /// Exact equality.
    #[serde(rename = "is")]
    Is,
    /// Substring.
    #[serde(rename = "contains")]
    Contains,
    /// Regular expression.
    #[serde(rename = "matches regex")]
    MatchesRegex,
    /// Field presence; `value` is ignored.
    #[serde(rename = "exists")]
    Exists,
}

impl MatchOperator {
    /// Every accepted configuration spelling.
    pub const NAMES: &'static [&'static str] = &["is", "contains", "matches regex", "exists"];

    /// The configuration spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::Contains => "contains",
            Self::MatchesRegex => "matches regex",
            Self::Exists => "exists",
        }
    }

    /// Parse the configuration spelling.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "is" => Some(Self::Is),
            "contains" => Some(Self::Contains),
            "matches regex" => Some(Self::MatchesRegex),
            "exists" => Some(Self::Exists),
            _ => None,
        }
    }
}

/// A leaf filter comparing one log field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMatch {
    /// Log field name.
    pub field: String,
    /// Path into a JSON field; the whole field when absent.
    pub json_path: Option<String>,
    /// Comparison.
    pub operator: MatchOperator,
    /// Value to compare against.
    pub value: Option<String>,
}

/// A node of the log filter tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LogFilterWire", into = "LogFilterWire")]
pub enum LogFilter {
    /// Leaf comparison.
    Match(LogMatch),
    /// Every child must match.
    All(Vec<LogFilter>),
    /// At least one child must match.
    Any(Vec<LogFilter>),
    /// The child must not match.
    Not(Box<LogFilter>),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogFilterWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    json_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<MatchOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    all: Option<Vec<LogFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    any: Option<Vec<LogFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    not: Option<Box<LogFilter>>,
}

impl From<LogFilter> for LogFilterWire {
    fn from(filter: LogFilter) -> Self {
        match filter {
            LogFilter::Match(m) => Self {
                field: Some(m.field).filter(|f| !f.is_empty()),
                json_path: m.json_path,
                operator: Some(m.operator),
                value: m.value,
                ..Self::default()
            },
            LogFilter::All(children) => Self {
                all: Some(children),
                ..Self::default()
            },
            LogFilter::Any(children) => Self {
                any: Some(children),
                ..Self::default()
            },
            LogFilter::Not(child) => Self {
                not: Some(child),
                ..Self::default()
            },
        }
    }
}

impl TryFrom<LogFilterWire> for LogFilter {
    type Error = DecodeError;

    fn try_from(w: LogFilterWire) -> Result<Self, Self::Error> {
        let has_match =
            w.field.is_some() || w.json_path.is_some() || w.operator.is_some() || w.value.is_some();
        let set = usize::from(has_match)
            + usize::from(w.all.is_some())
            + usize::from(w.any.is_some())
            + usize::from(w.not.is_some());
        if set != 1 {
            return Err(DecodeError(format!(
                "log filter node must set exactly one of match, all, any, not (found {})",
                set
            )));
        }

        if has_match {
            let operator = w
                .operator
                .ok_or_else(|| DecodeError("log filter match is missing operator".to_string()))?;
            return Ok(Self::Match(LogMatch {
                field: w.field.unwrap_or_default(),
                json_path: w.json_path,
                operator,
                value: w.value,
            }));
        }
        if let Some(children) = w.all {
            return Ok(Self::All(children));
        }
        if let Some(children) = w.any {
            return Ok(Self::Any(children));
        }
        match w.not {
            Some(child) => Ok(Self::Not(child)),
            None => Err(DecodeError("log filter node is empty".to_string())),
        }
    }
}

/// Kind of metric produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    /// Number of matching logs.
    #[serde(rename = "count", alias = "log_count")]
    LogCount,
    /// Running sum of a numeric field.
    #[serde(rename = "counter")]
    Counter,
    /// Last value of a numeric field.
    #[serde(rename = "gauge")]
    Gauge,
    /// Distribution of a numeric field.
    #[serde(rename = "histogram")]
    Histogram,
}

impl MetricType {
    /// Every accepted configuration spelling.
    pub const NAMES: &'static [&'static str] = &["log_count", "counter", "gauge", "histogram"];

    /// The configuration spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LogCount => "log_count",
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }

    /// Parse the configuration spelling.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "log_count" => Some(Self::LogCount),
            "counter" => Some(Self::Counter),
            "gauge" => Some(Self::Gauge),
            "histogram" => Some(Self::Histogram),
            _ => None,
        }
    }
}

/// How a numeric value is pulled out of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericExtractor {
    /// Path into a JSON field.
    JsonPath(String),
    /// Regex whose first capture is parsed as a number.
    Regex(String),
}

/// A metric produced from matching logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MetricDefinitionWire", into = "MetricDefinitionWire")]
pub struct MetricDefinition {
    /// Prometheus metric name.
    pub name: String,
    /// Metric kind.
    pub metric_type: MetricType,
    /// Source log field.
    pub field: Option<String>,
    /// Numeric extraction from the field.
    pub extractor: Option<NumericExtractor>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricDefinitionWire {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    metric_type: MetricType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    json_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    regex: Option<String>,
}

impl From<MetricDefinition> for MetricDefinitionWire {
    fn from(def: MetricDefinition) -> Self {
        let (json_path, regex) = match def.extractor {
            Some(NumericExtractor::JsonPath(p)) => (Some(p), None),
            Some(NumericExtractor::Regex(r)) => (None, Some(r)),
            None => (None, None),
        };
        Self {
            name: def.name,
            metric_type: def.metric_type,
            field: def.field,
            json_path,
            regex,
        }
    }
}

impl TryFrom<MetricDefinitionWire> for MetricDefinition {
    type Error = DecodeError;

    fn try_from(w: MetricDefinitionWire) -> Result<Self, Self::Error> {
        let extractor = match (w.json_path, w.regex) {
            (Some(_), Some(_)) => {
                return Err(DecodeError(format!(
                    "metric {:?}: jsonPath and regex cannot be used together",
                    w.name
                )))
            },
            (Some(p), None) => Some(NumericExtractor::JsonPath(p)),
            (None, Some(r)) => Some(NumericExtractor::Regex(r)),
            (None, None) => None,
        };
        Ok(Self {
            name: w.name,
            metric_type: w.metric_type,
            field: w.field.filter(|f| !f.is_empty()),
            extractor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_tree_wire_encoding() {
        let filter = LogFilter::All(vec![
            LogFilter::Match(LogMatch {
                field: "level".to_string(),
                json_path: None,
                operator: MatchOperator::Is,
                value: Some("error".to_string()),
            }),
            LogFilter::Not(Box::new(LogFilter::Match(LogMatch {
                field: "msg".to_string(),
                json_path: Some("$.a".to_string()),
                operator: MatchOperator::MatchesRegex,
                value: Some("^health".to_string()),
            }))),
        ]);

        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            json!({"all": [
                {"field": "level", "operator": "is", "value": "error"},
                {"not": {"field": "msg", "jsonPath": "$.a", "operator": "matches regex", "value": "^health"}},
            ]})
        );
        assert_eq!(serde_json::from_value::<LogFilter>(json).unwrap(), filter);
    }

    #[test]
    fn test_filter_node_with_two_kinds_fails() {
        let err = serde_json::from_value::<LogFilter>(json!({
            "field": "a",
            "operator": "exists",
            "any": [],
        }))
        .unwrap_err();
        assert!(err.to_string().contains("exactly one"));

        assert!(serde_json::from_value::<LogFilter>(json!({})).is_err());
    }

    #[test]
    fn test_omitted_filter_echo_reads_as_no_filter() {
        let rule: LogMetrics = serde_json::from_value(json!({
            "id": "6f1c2a4e-0b7d-4c1e-9a3f-2d5e8b7c6a10",
            "name": "r",
            "filter": {},
            "metricDefinitions": [{"name": "oodle_logs_r", "type": "count"}],
        }))
        .unwrap();
        assert_eq!(rule.filter, None);

        let rule: LogMetrics = serde_json::from_value(json!({"name": "r", "filter": null})).unwrap();
        assert_eq!(rule.filter, None);
    }

    #[test]
    fn test_empty_match_value_is_kept() {
        let filter: LogFilter =
            serde_json::from_value(json!({"field": "msg", "operator": "is", "value": ""})).unwrap();
        let LogFilter::Match(m) = &filter else {
            panic!("expected a match node, got {:?}", filter);
        };
        assert_eq!(m.value.as_deref(), Some(""));
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"field": "msg", "operator": "is", "value": ""})
        );
    }

    #[test]
    fn test_metric_type_spellings() {
        let def: MetricDefinition =
            serde_json::from_value(json!({"name": "oodle_logs_total", "type": "log_count"}))
                .unwrap();
        assert_eq!(def.metric_type, MetricType::LogCount);
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({"name": "oodle_logs_total", "type": "count"})
        );
    }

    #[test]
    fn test_metric_extractors_are_exclusive() {
        let err = serde_json::from_value::<MetricDefinition>(json!({
            "name": "m", "type": "gauge", "field": "f", "jsonPath": "$", "regex": ".*",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("cannot be used together"));
    }

    #[test]
    fn test_label_value_sources() {
        let label: LogMetricsLabel = serde_json::from_value(json!({
            "name": "svc",
            "valueExtractor": {"field": "service", "regex": "^(\\w+)"},
        }))
        .unwrap();
        assert_eq!(
            label.value,
            LabelValue::Extracted(ValueExtractor {
                field: Some("service".to_string()),
                json_path: None,
                regex: Some("^(\\w+)".to_string()),
            })
        );

        assert!(serde_json::from_value::<LogMetricsLabel>(json!({"name": "x"})).is_err());
    }
}
