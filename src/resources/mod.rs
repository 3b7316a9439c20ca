//! Configuration models: the provider-facing shape of each resource.
//!
//! A configuration model mirrors a resource's attribute schema. Every
//! scalar is an [`Attr`](crate::value::Attr) so null and unknown survive
//! the trip, nested blocks are `Option`s and repeated blocks are
//! `Option<Vec<_>>` (an absent list is null, never `[]`).
//!
//! Each model converts to its domain model with
//! [`ResourceModel::to_domain`] and is rebuilt from a backend response with
//! [`ResourceModel::from_domain`]. The two are inverses:
//! `to_domain(from_domain(d)) == d` for every well-formed domain value.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::error::ConvertError;
use crate::value::{join_path, StringAttr};

pub mod grafana_dashboard;
pub mod grafana_folder;
pub mod logmetrics;
pub mod monitor;
pub mod notification_policy;
pub mod notifier;

pub use grafana_dashboard::GrafanaDashboardModel;
pub use grafana_folder::GrafanaFolderModel;
pub use logmetrics::LogMetricsModel;
pub use monitor::MonitorModel;
pub use notification_policy::NotificationPolicyModel;
pub use notifier::NotifierModel;

/// A configuration model paired with its domain model `M`.
pub trait ResourceModel<M>:
    Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static
{
    /// Resource type name, e.g. `oodle_monitor`.
    const TYPE_NAME: &'static str;

    /// Human readable kind used in messages, e.g. `monitor`.
    const KIND: &'static str;

    /// The `id` attribute.
    fn id(&self) -> &StringAttr;

    /// Replace the `id` attribute.
    fn set_id(&mut self, id: StringAttr);

    /// Build the domain model. Never mutates `self`.
    fn to_domain(&self) -> Result<M, ConvertError>;

    /// Build a fresh configuration model from a backend response.
    ///
    /// Absent optional values become null. Problems that do not prevent
    /// conversion are reported through `diagnostics`.
    fn from_domain(model: &M, diagnostics: &mut Diagnostics) -> Self;

    /// Check configuration-time invariants, pushing one diagnostic per problem.
    fn validate(&self, _diagnostics: &mut Diagnostics) {}

    /// Carry write-only attributes over from `prior` after a read.
    fn retain_from(&mut self, _prior: &Self) {}
}

/// Convert each element of an optional block list, naming it by index.
pub(crate) fn indexed<T, U>(
    path: &str,
    items: Option<&Vec<T>>,
    convert: impl Fn(&str, &T) -> Result<U, ConvertError>,
) -> Result<Vec<U>, ConvertError> {
    items
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, item)| convert(&join_path(path, i), item))
        .collect()
}

/// Rebuild a block list from domain items; an empty list is null.
pub(crate) fn blocks_or_null<T, U>(items: &[T], convert: impl Fn(&T) -> U) -> Option<Vec<U>> {
    if items.is_empty() {
        None
    } else {
        Some(items.iter().map(convert).collect())
    }
}
