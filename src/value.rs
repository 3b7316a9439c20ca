//! Configuration attribute values.
//!
//! Every attribute in plan or state is in one of three states: null (not
//! set), unknown (computed, only known after apply) or known. [`Attr`]
//! keeps those apart so converters never confuse "absent" with an empty
//! string, `false` or an empty list.
//!
//! Lists and maps keep their elements as raw JSON. The conversion helpers
//! ([`attr_to_string`], [`string_list`], [`string_map`]) check each element
//! and report a typed error naming the offending element path.
//!
//! # Example
//!
//! ```
//! use oodle_provider::value::{self, Attr, ListAttr};
//! use serde_json::json;
//!
//! let labels: ListAttr = Attr::Known(vec![json!("service"), json!("region")]);
//! assert_eq!(
//!     value::string_list("grouping.by_labels", &labels).unwrap(),
//!     vec!["service".to_string(), "region".to_string()]
//! );
//!
//! // Empty collections are emitted as null, never as `[]`.
//! assert!(value::list_or_null(Vec::<String>::new()).is_null());
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::duration;
use crate::error::ConvertError;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Attr<T> {
    /// Not set.
    #[default]
    Null,
    /// Computed; not yet known.
    Unknown,
    /// A concrete value.
    Known(T),
}

/// A string attribute.
pub type StringAttr = Attr<String>;
/// A boolean attribute.
pub type BoolAttr = Attr<bool>;
/// A 64-bit float attribute.
pub type FloatAttr = Attr<f64>;
/// A 64-bit integer attribute.
pub type IntAttr = Attr<i64>;
/// A list attribute with untyped elements.
pub type ListAttr = Attr<Vec<Value>>;
/// A map attribute with untyped elements.
pub type MapAttr = Attr<BTreeMap<String, Value>>;

impl<T> Attr<T> {
    /// Wrap a known value.
    pub fn known(value: impl Into<T>) -> Self {
        Self::Known(value.into())
    }

    /// `Some(v)` becomes known, `None` becomes null.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Known(v),
            None => Self::Null,
        }
    }

    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The known value, if any.
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Default + Clone> Attr<T> {
    /// The known value, or the type's zero value for null and unknown.
    pub fn value_or_default(&self) -> T {
        self.as_known().cloned().unwrap_or_default()
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => v.serialize(serializer),
            Self::Null | Self::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from_option)
    }
}

/// Join an attribute path with a child name or index.
pub fn join_path(base: &str, name: impl std::fmt::Display) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

/// The JSON type name of a value, for error messages.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Extract a string element from a list or map attribute.
pub fn attr_to_string(path: &str, value: &Value) -> Result<String, ConvertError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(ConvertError::TypeMismatch {
            path: path.to_string(),
            expected: "string",
            actual: value_type_name(other),
        }),
    }
}

/// Extract a list of strings. Null yields an empty list.
pub fn string_list(path: &str, attr: &ListAttr) -> Result<Vec<String>, ConvertError> {
    match attr {
        Attr::Null => Ok(Vec::new()),
        Attr::Unknown => Err(ConvertError::Unknown {
            path: path.to_string(),
        }),
        Attr::Known(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| attr_to_string(&join_path(path, i), v))
            .collect(),
    }
}

/// Extract a map of strings. Null yields an empty map.
pub fn string_map(path: &str, attr: &MapAttr) -> Result<BTreeMap<String, String>, ConvertError> {
    match attr {
        Attr::Null => Ok(BTreeMap::new()),
        Attr::Unknown => Err(ConvertError::Unknown {
            path: path.to_string(),
        }),
        Attr::Known(items) => items
            .iter()
            .map(|(k, v)| Ok((k.clone(), attr_to_string(&join_path(path, k), v)?)))
            .collect(),
    }
}

/// Build a list attribute; an empty input becomes null.
pub fn list_or_null<I, S>(items: I) -> ListAttr
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let values: Vec<Value> = items.into_iter().map(|s| Value::String(s.into())).collect();
    if values.is_empty() {
        Attr::Null
    } else {
        Attr::Known(values)
    }
}

/// Build a map attribute; an empty input becomes null.
pub fn map_or_null(items: &BTreeMap<String, String>) -> MapAttr {
    if items.is_empty() {
        return Attr::Null;
    }
    Attr::Known(
        items
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// The known, non-empty string value of an attribute.
pub fn non_empty(attr: &StringAttr) -> Option<&str> {
    attr.as_known().map(String::as_str).filter(|s| !s.is_empty())
}

/// A string attribute that is null when the input is absent or empty.
pub fn string_or_null(value: Option<&str>) -> StringAttr {
    match value {
        Some(s) if !s.is_empty() => Attr::Known(s.to_string()),
        _ => Attr::Null,
    }
}

/// Require a known value.
pub fn required<T: Clone>(path: &str, attr: &Attr<T>) -> Result<T, ConvertError> {
    match attr {
        Attr::Known(v) => Ok(v.clone()),
        Attr::Null => Err(ConvertError::Missing {
            path: path.to_string(),
        }),
        Attr::Unknown => Err(ConvertError::Unknown {
            path: path.to_string(),
        }),
    }
}

/// Parse a UUID string.
pub fn parse_uuid(path: &str, raw: &str) -> Result<Uuid, ConvertError> {
    Uuid::parse_str(raw).map_err(|source| ConvertError::InvalidUuid {
        path: path.to_string(),
        value: raw.to_string(),
        source,
    })
}

/// Parse an optional UUID. Null, unknown and empty are all absent.
pub fn optional_uuid(path: &str, attr: &StringAttr) -> Result<Option<Uuid>, ConvertError> {
    non_empty(attr).map(|raw| parse_uuid(path, raw)).transpose()
}

/// Parse a resource identity. Absent identities are the nil UUID.
pub fn parse_id(attr: &StringAttr) -> Result<Uuid, ConvertError> {
    Ok(optional_uuid("id", attr)?.unwrap_or_else(Uuid::nil))
}

/// Render a resource identity.
pub fn id_attr(id: &Uuid) -> StringAttr {
    Attr::Known(id.to_string())
}

/// Extract a list of UUIDs.
pub fn uuid_list(path: &str, attr: &ListAttr) -> Result<Vec<Uuid>, ConvertError> {
    string_list(path, attr)?
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_uuid(&join_path(path, i), raw))
        .collect()
}

/// Build a UUID list attribute; empty becomes null.
pub fn uuid_list_or_null(ids: &[Uuid]) -> ListAttr {
    list_or_null(ids.iter().map(Uuid::to_string))
}

/// Parse an optional duration. Null, unknown and empty are all absent.
pub fn optional_duration(path: &str, attr: &StringAttr) -> Result<Option<Duration>, ConvertError> {
    non_empty(attr)
        .map(|raw| {
            duration::parse(raw).map_err(|source| ConvertError::InvalidDuration {
                path: path.to_string(),
                source,
            })
        })
        .transpose()
}

/// Render an optional duration in short form; absent and zero become null.
pub fn duration_or_null(value: Option<Duration>) -> StringAttr {
    match value {
        Some(d) if !d.is_zero() => Attr::Known(duration::short(d)),
        _ => Attr::Null,
    }
}
