use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::{FinalReport, Notifier};

/// Posts the final report as JSON to the configured callback endpoint.
/// A single attempt per report; the queue owns the overall timeout.
pub struct CallbackNotifier {
    url: Option<String>,
    client: Client,
}

impl CallbackNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("build callback http client")?;
        Ok(Self {
            url: (!url.trim().is_empty()).then_some(url),
            client,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait::async_trait]
impl Notifier for CallbackNotifier {
    async fn send(&self, report: &FinalReport) -> Result<()> {
        let Some(url) = &self.url else {
            tracing::debug!(target: "notify", "callback disabled (empty CALLBACK_URL)");
            return Ok(());
        };

        self.client
            .post(url)
            .json(report)
            .send()
            .await
            .context("callback post")?
            .error_for_status()
            .context("callback non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "callback"
    }
}
