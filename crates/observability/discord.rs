use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use url::Url;

use super::{AlertSink, config::ServiceContext};

const DISCORD_CONTENT_LIMIT: usize = 2000;

/// Posts operational alerts to a Discord channel webhook.
pub struct DiscordAlerter {
    webhook_url: Url,
    client: Client,
    service_context: ServiceContext,
}

impl DiscordAlerter {
    pub(crate) fn new(webhook_url: Url, service_context: ServiceContext) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(3)).build()?;
        Ok(Self {
            webhook_url,
            client,
            service_context,
        })
    }

    fn format_content(&self, title: &str, body: &str) -> String {
        let header = format!(
            "**{}** `{}` `{}`\n> {}",
            self.service_context.service_name,
            self.service_context.environment,
            self.service_context.component,
            title.trim()
        );
        let content = if body.trim().is_empty() {
            header
        } else {
            format!("{header}\n{}", body.trim())
        };
        truncate_for_discord(content)
    }
}

#[async_trait]
impl AlertSink for DiscordAlerter {
    async fn alert(&self, title: &str, body: &str) -> Result<()> {
        send_discord_webhook(
            &self.client,
            self.webhook_url.clone(),
            self.format_content(title, body),
        )
        .await
    }
}

pub(crate) async fn send_discord_webhook(
    client: &Client,
    webhook_url: Url,
    content: String,
) -> Result<()> {
    let response = client
        .post(webhook_url)
        .json(&json!({ "content": content }))
        .send()
        .await
        .map_err(sanitize_reqwest_error)?;

    if response.status().is_success() {
        return Ok(());
    }

    Err(anyhow!(
        "discord webhook returned non-success status: {}",
        response.status()
    ))
}

// reqwest errors embed the URL, which carries the webhook token.
fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("discord webhook request timed out");
    }
    if error.is_connect() {
        return anyhow!("discord webhook connection failed");
    }
    anyhow!("discord webhook request failed")
}

fn truncate_for_discord(content: String) -> String {
    const SUFFIX: &str = "\n… (truncated)";

    if content.chars().count() <= DISCORD_CONTENT_LIMIT {
        return content;
    }

    let allowed = DISCORD_CONTENT_LIMIT - SUFFIX.chars().count();
    let mut truncated: String = content.chars().take(allowed).collect();
    truncated.push_str(SUFFIX);
    truncated
}
