use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::{info, warn};

use crate::contact::form::ContactForm;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// Honeypot was filled. The sender is told it worked; nothing is relayed.
    Suppressed,
}

/// Forwards contact submissions to a third-party form relay.
pub struct ContactRelay {
    http_client: Client,
    endpoint: String,
}

impl ContactRelay {
    pub fn new(http_client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }

    pub async fn submit(&self, form: &ContactForm) -> Result<SubmitOutcome> {
        if form.is_spam() {
            warn!("Contact submission dropped: honeypot filled");
            return Ok(SubmitOutcome::Suppressed);
        }

        form.validate()?;
        let payload = form.payload();

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Relay { status, body });
        }

        info!("Contact message relayed ({})", payload.reason);
        Ok(SubmitOutcome::Sent)
    }
}
