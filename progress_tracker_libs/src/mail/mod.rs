use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::json;
use thiserror::Error;
use tokio::time::Duration;

type Result<T> = std::result::Result<T, MailError>;

pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to request to mail api")]
    RequestError(#[from] reqwest::Error),
    #[error("mail api rejected the message: {0}")]
    Rejected(String),
    #[error("invalid mail api url given")]
    InvalidUrlError(#[from] url::ParseError),
}

/// Outbound transactional mail delivery.
#[async_trait]
pub trait Mailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Delivery over the SendGrid v3 `mail/send` endpoint.
#[derive(Debug, Clone)]
pub struct SendGridMailer {
    url: Url,
    client: Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(api_key: &str, from: &str) -> Result<Self> {
        Self::with_api_url(SENDGRID_API_URL, api_key, from)
    }

    pub fn with_api_url(api_url: &str, api_key: &str, from: &str) -> Result<Self> {
        Ok(SendGridMailer {
            url: Url::parse(api_url)?,
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key: String::from(api_key),
            from: String::from(from),
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from },
            "subject": subject,
            "content": [{ "type": "text/html", "value": body }],
        });

        let res = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        if let Err(e) = res.error_for_status_ref() {
            let detail = res.text().await.unwrap_or_default();
            tracing::error!("mail api rejected the message for {}: {} [{}]", to, e, detail);
            return Err(MailError::Rejected(detail));
        }

        tracing::info!("mail delivered to {}", to);
        Ok(())
    }
}
