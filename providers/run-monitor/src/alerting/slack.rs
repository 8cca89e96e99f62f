use super::{AlertError, AlertOutcome, AlertSink};
use crate::config::MonitorConfig;
use crate::http::{build_client, send_json};
use async_trait::async_trait;
use reqwest::{Client, Method};
use run_result_common::{Freshness, LogLevel, Message, StatusColor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Slack incoming-webhook payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackPayload {
    pub attachments: Vec<SlackAttachment>,
}

/// Legacy message attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackAttachment {
    pub color: String,
    pub fallback: String,
    pub title: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<f64>,
    pub fields: Vec<SlackField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl SlackField {
    fn short(title: &str, value: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            value: value.into(),
            short: true,
        }
    }
}

/// Priority shown on the alert
pub fn priority_for(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Critical | LogLevel::Error => "High",
        LogLevel::Warning => "Warning",
        _ => "Normal",
    }
}

fn freshness_fields(freshness: &Freshness) -> [SlackField; 2] {
    [
        SlackField::short("Loader", freshness.loader.clone()),
        SlackField::short("Age", format!("{:?} {}s", freshness.age, freshness.unit)),
    ]
}

/// Alert sink posting attachments to a Slack webhook
pub struct SlackAlert {
    http_client: Client,
    url: String,
    env: String,
    footer: Option<String>,
    success_alerts: bool,
    min_level: LogLevel,
    service_name: String,
}

impl SlackAlert {
    pub fn new(url: String, config: &MonitorConfig) -> Result<Self, AlertError> {
        Ok(Self {
            http_client: build_client(config.alert_timeout)?,
            url,
            env: config.env.clone(),
            footer: config.engine_footer(),
            success_alerts: config.success_alerts,
            min_level: config.alert_min_level,
            service_name: config.service_name.clone(),
        })
    }

    /// Whether a message at `level` is sent at all
    pub fn should_send(&self, level: LogLevel) -> bool {
        self.success_alerts || level >= self.min_level
    }

    /// Build the webhook payload for one message
    pub fn build_payload(&self, message: &Message) -> SlackPayload {
        let mut fields = vec![
            SlackField::short("Priority", priority_for(message.level)),
            SlackField::short("Environment", self.env.clone()),
        ];

        let reporting = message.reporting.as_ref();
        if let Some(freshness) = reporting.and_then(|r| r.freshness.as_ref()) {
            fields.extend(freshness_fields(freshness));
        }
        if let Some(path) = message.context.get_str("path") {
            fields.push(SlackField::short("Path", path));
        }
        if let Some(tags) = message.context.get_str("tags") {
            fields.push(SlackField::short("Tags", tags));
        }

        let text = match &message.error {
            Some(error) => format!("{}\n ```{}```", message.message, error),
            None => message.message.clone(),
        };

        SlackPayload {
            attachments: vec![SlackAttachment {
                color: StatusColor::for_level(message.level).hex().to_string(),
                fallback: message.title.clone(),
                title: message.title.clone(),
                text,
                ts: reporting.and_then(|r| r.execution_timestamp()),
                fields,
                footer: self.footer.clone(),
            }],
        }
    }
}

#[async_trait]
impl AlertSink for SlackAlert {
    async fn alert(&self, message: &Message) -> Result<AlertOutcome, AlertError> {
        if !self.should_send(message.level) {
            debug!(level = %message.level, title = %message.title, "Alert suppressed");
            return Ok(AlertOutcome::Suppressed);
        }

        let payload = self.build_payload(message);
        send_json(
            &self.http_client,
            Method::POST,
            &self.url,
            &payload,
            &self.service_name,
        )
        .await?;

        Ok(AlertOutcome::Delivered)
    }
}
