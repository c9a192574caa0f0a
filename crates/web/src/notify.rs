use std::{fmt::Write, time::Duration};

use anyhow::{Result, bail};
use stamper_core::{
    config::MailgunConfig,
    models::{HookResponse, Issue},
};

/// Sends a Mailgun summary of a finished batch. Best-effort: every
/// failure is logged and swallowed, the hook response is never
/// affected.
pub struct Notifier {
    client: reqwest::Client,
    config: Option<MailgunConfig>,
}

impl Notifier {
    pub fn new(config: Option<MailgunConfig>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self { client, config }
    }

    pub async fn send(
        &self,
        response: &HookResponse,
        host: &str,
        build_number: u32,
        issues: &[Issue],
        origin: &str,
    ) {
        if let Err(err) = self.try_send(response, host, build_number, issues, origin).await {
            tracing::warn!("Failed to send batch result notification: {err}");
        }
    }

    async fn try_send(
        &self,
        response: &HookResponse,
        host: &str,
        build_number: u32,
        issues: &[Issue],
        origin: &str,
    ) -> Result<()> {
        let Some(config) = &self.config else {
            bail!("mailgun integration is not configured");
        };

        let project = issues.first().map(|issue| issue.project.name.as_str()).unwrap_or("unknown");
        let subject = format!("Redmine Hooks Results: build #{build_number} ({project})");
        let mut body = format!("Stamped {} issue(s) from {origin} snapshot\n", issues.len());
        body.push_str("Success:\n");
        for id in &response.success {
            let _ = writeln!(body, "{host}/issues/{id}");
        }
        body.push_str("Failures:\n");
        for id in &response.failures {
            let _ = writeln!(body, "{host}/issues/{id}");
        }

        let url = format!("https://api.mailgun.net/v3/{}/messages", config.domain);
        let params = [
            ("from", config.sender.as_str()),
            ("to", config.recipient.as_str()),
            ("subject", subject.as_str()),
            ("text", body.as_str()),
        ];
        let result = self
            .client
            .post(&url)
            .basic_auth("api", Some(&config.api_key))
            .form(&params)
            .send()
            .await?;
        let status = result.status();
        if status.as_u16() >= 400 {
            bail!("mailgun rejected the message with status {status}");
        }
        Ok(())
    }
}
