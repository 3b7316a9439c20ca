//! Configuration validation helpers.
//!
//! Mutually exclusive settings appear in several resources: grouping
//! modes, notifier channel blocks, log filter node kinds, the `any`
//! notifier bucket and the two monitor routing shapes. Every such check
//! goes through the helpers here, so the rule and its message live in one
//! place.
//!
//! The `Result` forms ([`exactly_one`], [`at_most_one`], ...) are used by the
//! converters, which must refuse an ambiguous configuration. The `check_*`
//! forms push diagnostics instead and are used by `validate`, which runs
//! before apply and reports every problem at once. Unknown values are
//! skipped by the `check_*` helpers; they are validated once known.
//!
//! # Example
//!
//! ```
//! use oodle_provider::diagnostics::Diagnostics;
//! use oodle_provider::validation;
//! use oodle_provider::value::Attr;
//!
//! let mut diagnostics = Diagnostics::new();
//! validation::check_duration("interval", &Attr::known("1m30s"), &mut diagnostics);
//! assert!(diagnostics.is_empty());
//!
//! validation::check_duration("group_wait", &Attr::known("30"), &mut diagnostics);
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics.iter().next().unwrap().attribute.as_deref(), Some("group_wait"));
//! ```

use crate::diagnostics::Diagnostics;
use crate::error::ConvertError;
use crate::value::{self, join_path, Attr, ListAttr, StringAttr};

/// Summary of the diagnostic raised when both monitor routing shapes are set.
pub const CONFLICTING_NOTIFICATIONS: &str = "Conflicting notification configurations";

/// Required prefix of every log-derived metric name.
pub const METRIC_NAME_PREFIX: &str = "oodle_logs_";

fn quoted(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Require exactly one of the named options to be set; returns its name.
pub fn exactly_one<'a>(path: &str, options: &[(&'a str, bool)]) -> Result<&'a str, ConvertError> {
    match at_most_one(path, options)? {
        Some(name) => Ok(name),
        None => {
            let names: Vec<&str> = options.iter().map(|(n, _)| *n).collect();
            Err(ConvertError::union(
                path,
                format!("exactly one of {} must be set", quoted(&names)),
            ))
        },
    }
}

/// Allow at most one of the named options to be set; returns its name.
pub fn at_most_one<'a>(
    path: &str,
    options: &[(&'a str, bool)],
) -> Result<Option<&'a str>, ConvertError> {
    let set: Vec<&str> = options
        .iter()
        .filter(|(_, is_set)| *is_set)
        .map(|(n, _)| *n)
        .collect();
    match set.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some(*one)),
        many => Err(ConvertError::union(
            path,
            format!("only one of {} may be set", quoted(many)),
        )),
    }
}

/// The `any` bucket excludes the per-severity buckets.
pub fn notifiers_exclusive(path: &str, any: bool, per_severity: bool) -> Result<(), ConvertError> {
    if any && per_severity {
        return Err(ConvertError::union(
            path,
            "'any' cannot be combined with 'warn', 'critical' or 'no_data'",
        ));
    }
    Ok(())
}

/// The policy-based routing fields exclude `notifications`.
pub fn routing_exclusive(
    path: &str,
    policies: bool,
    notifications: bool,
) -> Result<(), ConvertError> {
    if policies && notifications {
        return Err(ConvertError::union(
            path,
            format!(
                "{}: 'notification_policy_id' and 'label_matcher_notification_policies' \
                 cannot be combined with 'notifications'",
                CONFLICTING_NOTIFICATIONS
            ),
        ));
    }
    Ok(())
}

fn summary_for(err: &ConvertError) -> &'static str {
    match err {
        ConvertError::Missing { .. } => "Missing Attribute Value",
        ConvertError::Unknown { .. } => "Unknown Attribute Value",
        ConvertError::InvalidUuid { .. } => "Invalid UUID",
        ConvertError::InvalidDuration { .. } => "Invalid Duration",
        ConvertError::TypeMismatch { .. } => "Invalid Attribute Type",
        ConvertError::InvalidChoice { .. } => "Invalid Attribute Value",
        ConvertError::Union { message, .. } if message.starts_with(CONFLICTING_NOTIFICATIONS) => {
            CONFLICTING_NOTIFICATIONS
        },
        ConvertError::Union { .. } => "Invalid Attribute Combination",
        ConvertError::InvalidJson { .. } => "Invalid JSON",
    }
}

/// Push a failed check as an attribute error and return the success value.
pub fn report<T>(diagnostics: &mut Diagnostics, result: Result<T, ConvertError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(err) => {
            diagnostics.add_attribute_error(
                err.path().to_string(),
                summary_for(&err),
                err.to_string(),
            );
            None
        },
    }
}

/// A required attribute must not be null.
pub fn check_required<T>(path: &str, attr: &Attr<T>, diagnostics: &mut Diagnostics) {
    if attr.is_null() {
        diagnostics.add_attribute_error(
            path,
            format!("Missing required attribute '{}'", path),
            "This attribute is required and must be provided",
        );
    }
}

/// A duration attribute must match the duration grammar.
pub fn check_duration(path: &str, attr: &StringAttr, diagnostics: &mut Diagnostics) {
    report(diagnostics, value::optional_duration(path, attr));
}

/// A string attribute must be one of `names`.
pub fn check_choice(path: &str, attr: &StringAttr, names: &[&str], diagnostics: &mut Diagnostics) {
    if let Attr::Known(text) = attr {
        if !names.contains(&text.as_str()) {
            report::<()>(diagnostics, Err(ConvertError::choice(path, text.as_str(), names)));
        }
    }
}

/// A reference attribute must be a UUID.
pub fn check_uuid(path: &str, attr: &StringAttr, diagnostics: &mut Diagnostics) {
    report(diagnostics, value::optional_uuid(path, attr));
}

/// Every element of a reference list must be a UUID.
pub fn check_uuid_list(path: &str, attr: &ListAttr, diagnostics: &mut Diagnostics) {
    if let Attr::Known(items) = attr {
        for (i, item) in items.iter().enumerate() {
            let item_path = join_path(path, i);
            match value::attr_to_string(&item_path, item) {
                Ok(raw) => {
                    report(diagnostics, value::parse_uuid(&item_path, &raw));
                },
                Err(err) => {
                    report::<()>(diagnostics, Err(err));
                },
            }
        }
    }
}

/// Functions, aggregations and modifiers that may be followed by `(`.
const PROMQL_CALLABLES: &[&str] = &[
    "abs", "absent", "absent_over_time", "acos", "acosh", "and", "asin", "asinh", "atan",
    "atan2", "atanh", "avg", "avg_over_time", "bool", "bottomk", "by", "ceil", "changes",
    "clamp", "clamp_max", "clamp_min", "cos", "cosh", "count", "count_over_time", "count_values", "day_of_month",
    "day_of_week", "day_of_year", "days_in_month", "deg", "delta", "deriv", "exp", "floor",
    "group", "group_left", "group_right", "histogram_avg", "histogram_count",
    "histogram_fraction", "histogram_quantile", "histogram_stddev", "histogram_stdvar",
    "histogram_sum", "holt_winters", "hour", "idelta", "ignoring", "increase", "irate",
    "label_join", "label_replace", "last_over_time", "limitk", "limit_ratio", "ln", "log10",
    "log2", "mad_over_time", "max", "max_over_time", "min", "min_over_time", "minute", "month",
    "on", "or", "predict_linear", "present_over_time", "quantile", "quantile_over_time", "rad",
    "rate", "resets", "round", "scalar", "sgn", "sin", "sinh", "sort", "sort_by_label",
    "sort_by_label_desc", "sort_desc", "sqrt", "stddev", "stddev_over_time", "stdvar",
    "stdvar_over_time", "sum", "sum_over_time", "tan", "tanh", "time", "timestamp", "topk",
    "unless", "vector", "without", "year",
];

/// Check the lexical structure of a PromQL query: brackets balance,
/// strings terminate and every call names a known function.
pub fn promql_syntax(query: &str) -> Result<(), String> {
    if query.trim().is_empty() {
        return Err("query is empty".to_string());
    }

    let chars: Vec<char> = query.chars().collect();
    let mut open: Vec<char> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' | '`' => {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\\' && c != '`' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(format!("unterminated string starting with {}", c));
                }
            },
            '(' | '[' | '{' => open.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if open.pop() != Some(expected) {
                    return Err(format!("unexpected {:?} at offset {}", c, i));
                }
            },
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            },
            c if c.is_ascii_digit() || c == '.' => {
                while chars.get(i + 1).is_some_and(|n| n.is_ascii_alphanumeric() || *n == '.') {
                    i += 1;
                }
            },
            c if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
                let start = i;
                while chars
                    .get(i + 1)
                    .is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_' || *n == ':')
                {
                    i += 1;
                }
                let name: String = chars[start..=i].iter().collect();
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                let in_selector = open.last() == Some(&'{');
                if next == Some(&'(') && !in_selector {
                    let lower = name.to_ascii_lowercase();
                    if !PROMQL_CALLABLES.contains(&lower.as_str()) {
                        return Err(format!("unknown function {:?}", name));
                    }
                }
            },
            _ => {},
        }
        i += 1;
    }

    match open.last() {
        Some(c) => Err(format!("unclosed {:?}", c)),
        None => Ok(()),
    }
}

/// A monitor query must be syntactically valid PromQL.
pub fn check_promql(path: &str, attr: &StringAttr, diagnostics: &mut Diagnostics) {
    if let Attr::Known(query) = attr {
        if let Err(reason) = promql_syntax(query) {
            diagnostics.add_attribute_error(
                path,
                "Invalid promql query",
                format!("{:?} is not a valid promql query: {}", query, reason),
            );
        }
    }
}

/// A log metric name must carry the reserved prefix.
pub fn check_metric_name(path: &str, attr: &StringAttr, diagnostics: &mut Diagnostics) {
    if let Attr::Known(name) = attr {
        if !name.starts_with(METRIC_NAME_PREFIX) {
            diagnostics.add_attribute_error(
                path,
                "Invalid Metric Name",
                format!("metric name {:?} must start with '{}'", name, METRIC_NAME_PREFIX),
            );
        }
    }
}

/// Whether a list attribute holds at least one element.
pub fn list_is_set(attr: &ListAttr) -> bool {
    attr.as_known().is_some_and(|items| !items.is_empty())
}

/// Whether a bool attribute is known and true.
pub fn flag_is_set(attr: &Attr<bool>) -> bool {
    matches!(attr, Attr::Known(true))
}
