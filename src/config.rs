//! Provider-level configuration.
//!
//! Every setting may be given in the provider block or through an
//! environment variable. A configured value wins over the environment.
//!
//! | Setting          | Environment variable |
//! |------------------|----------------------|
//! | `deployment_url` | `OODLE_DEPLOYMENT`   |
//! | `instance`       | `OODLE_INSTANCE`     |
//! | `api_key`        | `OODLE_API_KEY`      |

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::value::{Attr, StringAttr};

/// Environment fallback for `deployment_url`.
pub const DEPLOYMENT_ENV: &str = "OODLE_DEPLOYMENT";
/// Environment fallback for `instance`.
pub const INSTANCE_ENV: &str = "OODLE_INSTANCE";
/// Environment fallback for `api_key`.
pub const API_KEY_ENV: &str = "OODLE_API_KEY";

/// The provider block as written in configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfigModel {
    /// Base URL of the Oodle deployment, e.g. `https://us1.oodle.ai`.
    pub deployment_url: StringAttr,
    /// Instance identifier.
    pub instance: StringAttr,
    /// API key. Sensitive.
    pub api_key: StringAttr,
}

/// Resolved settings used to build the API client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Deployment base URL.
    pub deployment_url: Url,
    /// Instance identifier.
    pub instance: String,
    /// API key.
    pub api_key: SecretString,
}

struct Setting {
    attribute: &'static str,
    env: &'static str,
    label: &'static str,
    value_name: &'static str,
}

const DEPLOYMENT: Setting = Setting {
    attribute: "deployment_url",
    env: DEPLOYMENT_ENV,
    label: "Deployment",
    value_name: "Oodle deployment",
};

const INSTANCE: Setting = Setting {
    attribute: "instance",
    env: INSTANCE_ENV,
    label: "Instance",
    value_name: "Oodle instance",
};

const API_KEY: Setting = Setting {
    attribute: "api_key",
    env: API_KEY_ENV,
    label: "API Key",
    value_name: "Oodle API key",
};

impl Setting {
    fn resolve(
        &self,
        attr: &StringAttr,
        lookup: &impl Fn(&str) -> Option<String>,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        let value = match attr {
            Attr::Unknown => {
                diagnostics.push(
                    Diagnostic::error(format!("Unknown Oodle {}", self.label))
                        .with_detail(format!(
                            "The provider cannot create the Oodle API client as there is an \
                             unknown configuration value for the {}. Either target apply the \
                             source of the value first, set the value statically in the \
                             configuration, or use the {} environment variable.",
                            self.value_name, self.env
                        ))
                        .with_attribute(self.attribute),
                );
                return None;
            },
            Attr::Known(v) => Some(v.clone()),
            Attr::Null => lookup(self.env),
        };

        match value {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                diagnostics.push(
                    Diagnostic::error(format!("Missing Oodle {}", self.label))
                        .with_detail(format!(
                            "The provider cannot create the Oodle API client as there is a \
                             missing or empty value for the {}. Set the {} value in the \
                             configuration or use the {} environment variable. If either is \
                             already set, ensure the value is not empty.",
                            self.value_name, self.attribute, self.env
                        ))
                        .with_attribute(self.attribute),
                );
                None
            },
        }
    }
}

impl ProviderConfig {
    /// Build a config from literal values.
    pub fn new(
        deployment_url: &str,
        instance: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            deployment_url: Url::parse(deployment_url)?,
            instance: instance.into(),
            api_key: SecretString::from(api_key.into()),
        })
    }

    /// Resolve against the process environment.
    pub fn resolve(model: &ProviderConfigModel) -> Result<Self, Diagnostics> {
        Self::resolve_with(model, |name| std::env::var(name).ok())
    }

    /// Resolve, reading fallbacks through `lookup`.
    ///
    /// Reports every unknown or missing setting at once.
    pub fn resolve_with(
        model: &ProviderConfigModel,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let deployment = DEPLOYMENT.resolve(&model.deployment_url, &lookup, &mut diagnostics);
        let instance = INSTANCE.resolve(&model.instance, &lookup, &mut diagnostics);
        let api_key = API_KEY.resolve(&model.api_key, &lookup, &mut diagnostics);

        let (Some(deployment), Some(instance), Some(api_key)) = (deployment, instance, api_key)
        else {
            return Err(diagnostics);
        };

        match Self::new(&deployment, instance, api_key) {
            Ok(config) => Ok(config),
            Err(err) => {
                diagnostics.push(
                    Diagnostic::error("Invalid Oodle Deployment")
                        .with_detail(format!("{:?} is not a valid URL: {}", deployment, err))
                        .with_attribute(DEPLOYMENT.attribute),
                );
                Err(diagnostics)
            },
        }
    }
}
