//! Domain models: the backend's JSON representation of each resource.
//!
//! These types are strongly typed. Tagged unions are Rust enums and
//! durations are [`std::time::Duration`]. Their serde encoding matches the
//! backend wire format exactly, and invalid combinations (two channel
//! configs on one notifier, two grouping modes) fail to decode.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod grafana;
pub mod logmetrics;
pub mod monitor;
pub mod notification_policy;
pub mod notifier;

pub use grafana::{GrafanaDashboard, GrafanaFolder};
pub use logmetrics::LogMetrics;
pub use monitor::Monitor;
pub use notification_policy::NotificationPolicy;
pub use notifier::Notifier;

/// A resource the backend stores under a collection path.
pub trait ClientModel: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection path segment, e.g. `monitors`.
    const COLLECTION: &'static str;

    /// The identifier used in `{collection}/{id}` paths.
    fn id(&self) -> String;
}

/// A wire payload that decoded as JSON but violates a model invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

/// Deserialize `null` as the type's default value.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
