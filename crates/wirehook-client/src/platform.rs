//! The messaging platform's webhook-subscription REST API.
//!
//! The platform owns the subscription record; this module is the client for
//! the three operations the tunnel needs. [`PlatformClient`] is the seam the
//! controller is tested through; [`HttpPlatformClient`] is the real thing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wirehook_core::events::WebhookEventType;
use wirehook_core::ids::SubscriptionId;

/// A webhook subscription as held by the platform.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: SubscriptionId,
    pub target_url: String,
    pub subscribed_events: Vec<WebhookEventType>,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Returned once at creation; absent on later reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_secret: Option<String>,
}

/// Fields accepted by the update call. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SubscriptionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed_events: Option<Vec<WebhookEventType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Failures talking to the platform.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The request never produced a usable response.
    #[error("platform request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("platform rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Remote operations on webhook subscriptions.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn create_subscription(
        &self,
        target_url: &str,
        events: &[WebhookEventType],
    ) -> Result<WebhookSubscription, PlatformError>;

    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        update: SubscriptionUpdate,
    ) -> Result<WebhookSubscription, PlatformError>;

    async fn delete_subscription(&self, id: &SubscriptionId) -> Result<(), PlatformError>;
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    target_url: &'a str,
    subscribed_events: &'a [WebhookEventType],
}

/// reqwest-backed client for `/v3/webhook-subscriptions`.
pub struct HttpPlatformClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpPlatformClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    fn subscriptions_url(&self) -> String {
        format!("{}/v3/webhook-subscriptions", self.base_url)
    }

    fn subscription_url(&self, id: &SubscriptionId) -> String {
        format!("{}/v3/webhook-subscriptions/{}", self.base_url, id)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PlatformError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn create_subscription(
        &self,
        target_url: &str,
        events: &[WebhookEventType],
    ) -> Result<WebhookSubscription, PlatformError> {
        let response = self
            .http
            .post(self.subscriptions_url())
            .bearer_auth(&self.token)
            .json(&CreateRequest {
                target_url,
                subscribed_events: events,
            })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        update: SubscriptionUpdate,
    ) -> Result<WebhookSubscription, PlatformError> {
        let response = self
            .http
            .put(self.subscription_url(id))
            .bearer_auth(&self.token)
            .json(&update)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_subscription(&self, id: &SubscriptionId) -> Result<(), PlatformError> {
        let response = self
            .http
            .delete(self.subscription_url(id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let _ = Self::check(response).await?;
        Ok(())
    }
}
