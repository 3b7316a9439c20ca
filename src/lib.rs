//! Oodle Provider
//!
//! Manages [Oodle](https://oodle.ai) observability objects as declarative
//! resources: monitors, notifiers, notification policies, log metrics rules
//! and Grafana folders and dashboards.
//!
//! # Overview
//!
//! Each resource type has two models:
//!
//! - a **configuration model** ([`resources`]) that mirrors the attribute
//!   schema, keeping null and unknown values apart from empty ones;
//! - a **domain model** ([`models`]) that is exactly what the Oodle REST
//!   API sends and receives.
//!
//! The converters between them are inverses, so a resource read back from
//! the backend produces the same configuration it was created from and no
//! spurious diff. A generic [`ResourceController`] sequences every
//! Create/Read/Update/Delete through a [`Backend`], and [`OodleProvider`]
//! dispatches [`ProviderService`] calls to the controller for each type.
//!
//! # Quick Start
//!
//! ```ignore
//! use oodle_provider::{init_logging, OodleProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = OodleProvider::new();
//!     let diagnostics = provider
//!         .configure(json!({
//!             "deployment_url": "https://us1.oodle.ai",
//!             "instance": "inst-1",
//!             // api_key falls back to OODLE_API_KEY
//!         }))
//!         .await?;
//!     assert!(!diagnostics.has_error());
//!
//!     let state = provider
//!         .create("oodle_notifier", json!({
//!             "name": "oncall",
//!             "type": "email",
//!             "email_config": {"to": "oncall@example.com", "send_resolved": true},
//!         }))
//!         .await?;
//!     println!("created notifier {}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Resource Types
//!
//! - `oodle_monitor`: PromQL alert rule with per-severity conditions
//! - `oodle_notifier`: email, PagerDuty, Slack, OpsGenie, webhook or Google Chat channel
//! - `oodle_notification_policy`: per-severity notifier routing
//! - `oodle_log_metrics`: metrics derived from logs through a filter tree
//! - `oodle_grafana_folder`: Grafana folder
//! - `oodle_grafana_dashboard`: Grafana dashboard from JSON

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod duration;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod provider;
// Attribute fields mirror the resource schemas and are documented there.
#[allow(missing_docs)]
pub mod resources;
pub mod service;
pub mod testing;
pub mod validation;
pub mod value;

// Re-export main types at crate root
pub use client::{ApiClient, Backend};
pub use config::ProviderConfig;
pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics};
pub use error::{ApiError, ConvertError, ProviderError};
pub use lifecycle::{ResourceController, ResourceHandler};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{Backends, OodleProvider};
pub use resources::ResourceModel;
pub use service::{ImportedResource, ProviderMetadata, ProviderService};
pub use value::Attr;

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
