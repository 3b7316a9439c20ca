//! Notifier wire model.
//!
//! On the wire a notifier carries an integer `type` tag and exactly one
//! `<kind>_config` object. In Rust the pair is a single [`NotifierChannel`]
//! enum, so a tag/config mismatch cannot be represented.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{is_false, ClientModel, DecodeError};

/// A notification target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NotifierWire", into = "NotifierWire")]
pub struct Notifier {
    /// Identity; nil before create.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Channel and its settings.
    pub channel: NotifierChannel,
}

impl ClientModel for Notifier {
    const COLLECTION: &'static str = "notifiers";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// The channel kind of a notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifierType {
    /// Email.
    Email,
    /// PagerDuty.
    Pagerduty,
    /// Slack.
    Slack,
    /// OpsGenie.
    OpsGenie,
    /// Generic webhook.
    Webhook,
    /// Google Chat.
    GoogleChat,
}

impl NotifierType {
    /// Every accepted configuration spelling.
    pub const NAMES: &'static [&'static str] = &[
        "email",
        "pagerduty",
        "slack",
        "opsgenie",
        "webhook",
        "googlechat",
    ];

    /// The configuration spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Pagerduty => "pagerduty",
            Self::Slack => "slack",
            Self::OpsGenie => "opsgenie",
            Self::Webhook => "webhook",
            Self::GoogleChat => "googlechat",
        }
    }

    /// Parse the configuration spelling.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "email" => Some(Self::Email),
            "pagerduty" => Some(Self::Pagerduty),
            "slack" => Some(Self::Slack),
            "opsgenie" => Some(Self::OpsGenie),
            "webhook" => Some(Self::Webhook),
            "googlechat" => Some(Self::GoogleChat),
            _ => None,
        }
    }

    /// The config block name used both on the wire and in configuration.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Email => "email_config",
            Self::Pagerduty => "pagerduty_config",
            Self::Slack => "slack_config",
            Self::OpsGenie => "opsgenie_config",
            Self::Webhook => "webhook_config",
            Self::GoogleChat => "googlechat_config",
        }
    }

    fn to_wire(self) -> i16 {
        match self {
            Self::Email => 0,
            Self::Pagerduty => 1,
            Self::Slack => 2,
            Self::OpsGenie => 3,
            Self::Webhook => 4,
            Self::GoogleChat => 5,
        }
    }

    fn from_wire(value: i16) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::Email),
            1 => Ok(Self::Pagerduty),
            2 => Ok(Self::Slack),
            3 => Ok(Self::OpsGenie),
            4 => Ok(Self::Webhook),
            5 => Ok(Self::GoogleChat),
            other => Err(DecodeError(format!("invalid notifier type: {}", other))),
        }
    }
}

/// Email settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Notify on resolution too.
    #[serde(default, skip_serializing_if = "is_false")]
    pub send_resolved: bool,
    /// Recipient address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
}

/// PagerDuty settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PagerdutyConfig {
    /// Notify on resolution too.
    #[serde(default, skip_serializing_if = "is_false")]
    pub send_resolved: bool,
    /// Integration key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_key: String,
}

/// Slack settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Notify on resolution too.
    #[serde(default, skip_serializing_if = "is_false")]
    pub send_resolved: bool,
    /// Incoming webhook URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_url: String,
    /// Target channel.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    /// Message title link template.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_link: String,
    /// Message text template.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

/// OpsGenie settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpsGenieConfig {
    /// Notify on resolution too.
    #[serde(default, skip_serializing_if = "is_false")]
    pub send_resolved: bool,
    /// API key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
}

/// Webhook settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Notify on resolution too.
    #[serde(default, skip_serializing_if = "is_false")]
    pub send_resolved: bool,
    /// URL receiving the POST.
    #[serde(default)]
    pub url: String,
}

/// Google Chat settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoogleChatConfig {
    /// Notify on resolution too.
    #[serde(default, skip_serializing_if = "is_false")]
    pub send_resolved: bool,
    /// Space webhook URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Thread messages per alert group.
    #[serde(default, skip_serializing_if = "is_false")]
    pub threading: bool,
}

/// A notifier's channel and settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierChannel {
    /// Email.
    Email(EmailConfig),
    /// PagerDuty.
    Pagerduty(PagerdutyConfig),
    /// Slack.
    Slack(SlackConfig),
    /// OpsGenie.
    OpsGenie(OpsGenieConfig),
    /// Webhook.
    Webhook(WebhookConfig),
    /// Google Chat.
    GoogleChat(GoogleChatConfig),
}

impl NotifierChannel {
    /// The channel kind.
    pub fn notifier_type(&self) -> NotifierType {
        match self {
            Self::Email(_) => NotifierType::Email,
            Self::Pagerduty(_) => NotifierType::Pagerduty,
            Self::Slack(_) => NotifierType::Slack,
            Self::OpsGenie(_) => NotifierType::OpsGenie,
            Self::Webhook(_) => NotifierType::Webhook,
            Self::GoogleChat(_) => NotifierType::GoogleChat,
        }
    }

    /// Whether resolved alerts are also sent.
    pub fn send_resolved(&self) -> bool {
        match self {
            Self::Email(c) => c.send_resolved,
            Self::Pagerduty(c) => c.send_resolved,
            Self::Slack(c) => c.send_resolved,
            Self::OpsGenie(c) => c.send_resolved,
            Self::Webhook(c) => c.send_resolved,
            Self::GoogleChat(c) => c.send_resolved,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct NotifierWire {
    #[serde(default)]
    id: Uuid,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(rename = "type")]
    notifier_type: i16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email_config: Option<EmailConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pagerduty_config: Option<PagerdutyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slack_config: Option<SlackConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    opsgenie_config: Option<OpsGenieConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    webhook_config: Option<WebhookConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    googlechat_config: Option<GoogleChatConfig>,
}

impl From<Notifier> for NotifierWire {
    fn from(n: Notifier) -> Self {
        let mut wire = NotifierWire {
            id: n.id,
            name: n.name,
            notifier_type: n.channel.notifier_type().to_wire(),
            email_config: None,
            pagerduty_config: None,
            slack_config: None,
            opsgenie_config: None,
            webhook_config: None,
            googlechat_config: None,
        };
        match n.channel {
            NotifierChannel::Email(c) => wire.email_config = Some(c),
            NotifierChannel::Pagerduty(c) => wire.pagerduty_config = Some(c),
            NotifierChannel::Slack(c) => wire.slack_config = Some(c),
            NotifierChannel::OpsGenie(c) => wire.opsgenie_config = Some(c),
            NotifierChannel::Webhook(c) => wire.webhook_config = Some(c),
            NotifierChannel::GoogleChat(c) => wire.googlechat_config = Some(c),
        }
        wire
    }
}

impl TryFrom<NotifierWire> for Notifier {
    type Error = DecodeError;

    fn try_from(w: NotifierWire) -> Result<Self, Self::Error> {
        let notifier_type = NotifierType::from_wire(w.notifier_type)?;
        let populated = [
            w.email_config.is_some(),
            w.pagerduty_config.is_some(),
            w.slack_config.is_some(),
            w.opsgenie_config.is_some(),
            w.webhook_config.is_some(),
            w.googlechat_config.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if populated > 1 {
            return Err(DecodeError(format!(
                "notifier of type {} carries more than one channel config",
                notifier_type.as_str()
            )));
        }

        let missing = || DecodeError(format!("missing {}", notifier_type.config_key()));
        let channel = match notifier_type {
            NotifierType::Email => NotifierChannel::Email(w.email_config.ok_or_else(missing)?),
            NotifierType::Pagerduty => {
                NotifierChannel::Pagerduty(w.pagerduty_config.ok_or_else(missing)?)
            },
            NotifierType::Slack => NotifierChannel::Slack(w.slack_config.ok_or_else(missing)?),
            NotifierType::OpsGenie => {
                NotifierChannel::OpsGenie(w.opsgenie_config.ok_or_else(missing)?)
            },
            NotifierType::Webhook => {
                NotifierChannel::Webhook(w.webhook_config.ok_or_else(missing)?)
            },
            NotifierType::GoogleChat => {
                NotifierChannel::GoogleChat(w.googlechat_config.ok_or_else(missing)?)
            },
        };

        Ok(Self {
            id: w.id,
            name: w.name,
            channel,
        })
    }
}
