//! `oodle_notifier` configuration model.
//!
//! The `type` attribute selects which `<type>_config` block carries the
//! channel settings. Exactly that block must be present.

use serde::{Deserialize, Serialize};

use super::ResourceModel;
use crate::diagnostics::Diagnostics;
use crate::error::ConvertError;
use crate::models::notifier::{
    EmailConfig, GoogleChatConfig, NotifierChannel, NotifierType, OpsGenieConfig,
    PagerdutyConfig, SlackConfig, WebhookConfig,
};
use crate::models::Notifier;
use crate::validation;
use crate::value::{self, Attr, BoolAttr, StringAttr};

/// A notification channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierModel {
    pub id: StringAttr,
    pub name: StringAttr,
    /// One of `email`, `pagerduty`, `slack`, `opsgenie`, `webhook`, `googlechat`.
    #[serde(rename = "type")]
    pub notifier_type: StringAttr,
    pub email_config: Option<EmailBlock>,
    pub pagerduty_config: Option<PagerdutyBlock>,
    pub slack_config: Option<SlackBlock>,
    pub opsgenie_config: Option<OpsGenieBlock>,
    pub webhook_config: Option<WebhookBlock>,
    pub googlechat_config: Option<GoogleChatBlock>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailBlock {
    pub send_resolved: BoolAttr,
    pub to: StringAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerdutyBlock {
    pub send_resolved: BoolAttr,
    pub service_key: StringAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackBlock {
    pub send_resolved: BoolAttr,
    pub api_url: StringAttr,
    pub channel: StringAttr,
    pub title_link: StringAttr,
    pub text: StringAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsGenieBlock {
    pub send_resolved: BoolAttr,
    pub api_key: StringAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookBlock {
    pub send_resolved: BoolAttr,
    pub url: StringAttr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleChatBlock {
    pub send_resolved: BoolAttr,
    pub url: StringAttr,
    pub threading: BoolAttr,
}

fn block<'a, T>(block: &'a Option<T>, key: &str) -> Result<&'a T, ConvertError> {
    block.as_ref().ok_or_else(|| ConvertError::Missing {
        path: key.to_string(),
    })
}

impl NotifierModel {
    fn parse_type(&self) -> Result<NotifierType, ConvertError> {
        let text = value::required("type", &self.notifier_type)?;
        NotifierType::parse(&text)
            .ok_or_else(|| ConvertError::choice("type", text.as_str(), NotifierType::NAMES))
    }

    /// Exactly one channel block may be present, and it must match `notifier_type`.
    fn check_blocks(&self, notifier_type: NotifierType) -> Result<(), ConvertError> {
        let expected = notifier_type.config_key();
        let present = validation::exactly_one(
            expected,
            &[
                ("email_config", self.email_config.is_some()),
                ("pagerduty_config", self.pagerduty_config.is_some()),
                ("slack_config", self.slack_config.is_some()),
                ("opsgenie_config", self.opsgenie_config.is_some()),
                ("webhook_config", self.webhook_config.is_some()),
                ("googlechat_config", self.googlechat_config.is_some()),
            ],
        )?;
        if present != expected {
            return Err(ConvertError::union(
                expected,
                format!(
                    "notifier type '{}' requires '{}', but '{}' is set",
                    notifier_type.as_str(),
                    expected,
                    present
                ),
            ));
        }
        Ok(())
    }

    fn channel_to_domain(
        &self,
        notifier_type: NotifierType,
    ) -> Result<NotifierChannel, ConvertError> {
        self.check_blocks(notifier_type)?;
        let key = notifier_type.config_key();
        Ok(match notifier_type {
            NotifierType::Email => {
                let b = block(&self.email_config, key)?;
                NotifierChannel::Email(EmailConfig {
                    send_resolved: b.send_resolved.value_or_default(),
                    to: b.to.value_or_default(),
                })
            },
            NotifierType::Pagerduty => {
                let b = block(&self.pagerduty_config, key)?;
                NotifierChannel::Pagerduty(PagerdutyConfig {
                    send_resolved: b.send_resolved.value_or_default(),
                    service_key: b.service_key.value_or_default(),
                })
            },
            NotifierType::Slack => {
                let b = block(&self.slack_config, key)?;
                NotifierChannel::Slack(SlackConfig {
                    send_resolved: b.send_resolved.value_or_default(),
                    api_url: b.api_url.value_or_default(),
                    channel: b.channel.value_or_default(),
                    title_link: b.title_link.value_or_default(),
                    text: b.text.value_or_default(),
                })
            },
            NotifierType::OpsGenie => {
                let b = block(&self.opsgenie_config, key)?;
                NotifierChannel::OpsGenie(OpsGenieConfig {
                    send_resolved: b.send_resolved.value_or_default(),
                    api_key: b.api_key.value_or_default(),
                })
            },
            NotifierType::Webhook => {
                let b = block(&self.webhook_config, key)?;
                NotifierChannel::Webhook(WebhookConfig {
                    send_resolved: b.send_resolved.value_or_default(),
                    url: b.url.value_or_default(),
                })
            },
            NotifierType::GoogleChat => {
                let b = block(&self.googlechat_config, key)?;
                NotifierChannel::GoogleChat(GoogleChatConfig {
                    send_resolved: b.send_resolved.value_or_default(),
                    url: b.url.value_or_default(),
                    threading: b.threading.value_or_default(),
                })
            },
        })
    }
}

impl ResourceModel<Notifier> for NotifierModel {
    const TYPE_NAME: &'static str = "oodle_notifier";
    const KIND: &'static str = "notifier";

    fn id(&self) -> &StringAttr {
        &self.id
    }

    fn set_id(&mut self, id: StringAttr) {
        self.id = id;
    }

    fn to_domain(&self) -> Result<Notifier, ConvertError> {
        let notifier_type = self.parse_type()?;
        Ok(Notifier {
            id: value::parse_id(&self.id)?,
            name: self.name.value_or_default(),
            channel: self.channel_to_domain(notifier_type)?,
        })
    }

    fn from_domain(notifier: &Notifier, _diagnostics: &mut Diagnostics) -> Self {
        let mut model = Self {
            id: value::id_attr(&notifier.id),
            name: Attr::known(notifier.name.clone()),
            notifier_type: Attr::known(notifier.channel.notifier_type().as_str()),
            ..Self::default()
        };

        match &notifier.channel {
            NotifierChannel::Email(c) => {
                model.email_config = Some(EmailBlock {
                    send_resolved: Attr::Known(c.send_resolved),
                    to: Attr::known(c.to.clone()),
                });
            },
            NotifierChannel::Pagerduty(c) => {
                model.pagerduty_config = Some(PagerdutyBlock {
                    send_resolved: Attr::Known(c.send_resolved),
                    service_key: Attr::known(c.service_key.clone()),
                });
            },
            NotifierChannel::Slack(c) => {
                model.slack_config = Some(SlackBlock {
                    send_resolved: Attr::Known(c.send_resolved),
                    api_url: Attr::known(c.api_url.clone()),
                    channel: Attr::known(c.channel.clone()),
                    title_link: Attr::known(c.title_link.clone()),
                    text: Attr::known(c.text.clone()),
                });
            },
            NotifierChannel::OpsGenie(c) => {
                model.opsgenie_config = Some(OpsGenieBlock {
                    send_resolved: Attr::Known(c.send_resolved),
                    api_key: Attr::known(c.api_key.clone()),
                });
            },
            NotifierChannel::Webhook(c) => {
                model.webhook_config = Some(WebhookBlock {
                    send_resolved: Attr::Known(c.send_resolved),
                    url: Attr::known(c.url.clone()),
                });
            },
            NotifierChannel::GoogleChat(c) => {
                model.googlechat_config = Some(GoogleChatBlock {
                    send_resolved: Attr::Known(c.send_resolved),
                    url: Attr::known(c.url.clone()),
                    threading: Attr::Known(c.threading),
                });
            },
        }

        model
    }

    fn validate(&self, diagnostics: &mut Diagnostics) {
        validation::check_required("name", &self.name, diagnostics);
        validation::check_choice("type", &self.notifier_type, NotifierType::NAMES, diagnostics);
        let parsed = self.notifier_type.as_known().and_then(|t| NotifierType::parse(t));
        if let Some(notifier_type) = parsed {
            validation::report(diagnostics, self.check_blocks(notifier_type));
        }
    }
}
