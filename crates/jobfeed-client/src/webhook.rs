use std::time::Duration;

use jobfeed_core::error::AppError;
use jobfeed_core::models::{Destination, Job};
use jobfeed_core::traits::Messenger;
use reqwest::Client;
use serde::Serialize;

const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);
/// Chat webhooks accept at most ten embeds per message.
pub const MAX_EMBEDS: usize = 10;
const EMBED_COLOR: u32 = 0x3498db;

/// Posts jobs to chat webhooks as rich embeds.
///
/// The destination's `endpoint` is the webhook URL. Text becomes a
/// `{"content": ...}` message, job batches an `{"embeds": [...]}` message.
#[derive(Clone)]
pub struct WebhookMessenger {
    client: Client,
    timeout_secs: u64,
}

impl WebhookMessenger {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    async fn post<T: Serialize>(&self, destination: &Destination, body: &T) -> Result<(), AppError> {
        let response = self
            .client
            .post(&destination.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::DeliveryError(format!(
                        "webhook for '{}' timed out after {}s",
                        destination.id, self.timeout_secs
                    ))
                } else {
                    AppError::DeliveryError(format!("webhook for '{}': {e}", destination.id))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::DeliveryError(format!(
                "HTTP {} from webhook for '{}': {}",
                status.as_u16(),
                destination.id,
                body.trim()
            )));
        }
        Ok(())
    }
}

// ---- Webhook payload types ----

#[derive(Serialize)]
struct TextMessage<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct EmbedMessage {
    embeds: Vec<Embed>,
}

#[derive(Serialize)]
struct Embed {
    title: String,
    url: String,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<Thumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<Footer>,
}

#[derive(Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

#[derive(Serialize)]
struct Thumbnail {
    url: String,
}

#[derive(Serialize)]
struct Footer {
    text: String,
}

impl Embed {
    fn from_job(job: &Job) -> Self {
        let fields = [
            ("Company", &job.company),
            ("Location", &job.location),
            ("Qualification", &job.qualification),
            ("Experience", &job.experience),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value.as_ref().map(|v| EmbedField {
                name,
                value: v.clone(),
                inline: true,
            })
        })
        .collect();

        let footer = url::Url::parse(&job.link)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .map(|text| Footer { text });

        Self {
            title: job.title.clone(),
            url: job.link.clone(),
            color: EMBED_COLOR,
            fields,
            thumbnail: job.image_url.clone().map(|url| Thumbnail { url }),
            footer,
        }
    }
}

impl Messenger for WebhookMessenger {
    fn max_batch_size(&self) -> usize {
        MAX_EMBEDS
    }

    async fn send_text(&self, destination: &Destination, text: &str) -> Result<(), AppError> {
        tracing::debug!(destination = %destination.id, "Posting text message");
        self.post(destination, &TextMessage { content: text }).await
    }

    async fn send_jobs(&self, destination: &Destination, jobs: &[Job]) -> Result<(), AppError> {
        if jobs.is_empty() {
            return Ok(());
        }
        if jobs.len() > MAX_EMBEDS {
            return Err(AppError::DeliveryError(format!(
                "batch of {} exceeds {MAX_EMBEDS} embeds",
                jobs.len()
            )));
        }
        let message = EmbedMessage {
            embeds: jobs.iter().map(Embed::from_job).collect(),
        };
        tracing::debug!(destination = %destination.id, count = jobs.len(), "Posting job embeds");
        self.post(destination, &message).await
    }
}
