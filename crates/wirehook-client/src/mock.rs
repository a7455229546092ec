//! In-memory platform client for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use wirehook_core::events::WebhookEventType;
use wirehook_core::ids::SubscriptionId;

use crate::platform::{PlatformClient, PlatformError, SubscriptionUpdate, WebhookSubscription};

/// A recorded platform call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformCall {
    Create {
        target_url: String,
    },
    Update {
        id: SubscriptionId,
        target_url: Option<String>,
    },
    Delete {
        id: SubscriptionId,
    },
}

/// Records every call and answers from in-memory state.
///
/// Individual operations can be switched to fail, which they do with a
/// synthetic 500 rejection.
#[derive(Clone, Default)]
pub struct MockPlatformClient {
    calls: Arc<Mutex<Vec<PlatformCall>>>,
    fail_create: Arc<AtomicBool>,
    fail_update: Arc<AtomicBool>,
    fail_delete: Arc<AtomicBool>,
    next_id: Arc<AtomicU64>,
}

impl MockPlatformClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    /// Number of delete calls made so far.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, PlatformCall::Delete { .. }))
            .count()
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::Relaxed);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::Relaxed);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::Relaxed);
    }

    fn rejection() -> PlatformError {
        PlatformError::Rejected {
            status: 500,
            body: "mock failure".into(),
        }
    }

    fn subscription(
        id: SubscriptionId,
        target_url: String,
        events: Vec<WebhookEventType>,
    ) -> WebhookSubscription {
        WebhookSubscription {
            id,
            target_url,
            subscribed_events: events,
            is_active: true,
            created_at: None,
            updated_at: None,
            signing_secret: None,
        }
    }
}

#[async_trait]
impl PlatformClient for MockPlatformClient {
    async fn create_subscription(
        &self,
        target_url: &str,
        events: &[WebhookEventType],
    ) -> Result<WebhookSubscription, PlatformError> {
        self.calls.lock().push(PlatformCall::Create {
            target_url: target_url.to_owned(),
        });
        if self.fail_create.load(Ordering::Relaxed) {
            return Err(Self::rejection());
        }
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Self::subscription(
            SubscriptionId::from(format!("wh_mock{n}")),
            target_url.to_owned(),
            events.to_vec(),
        ))
    }

    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        update: SubscriptionUpdate,
    ) -> Result<WebhookSubscription, PlatformError> {
        self.calls.lock().push(PlatformCall::Update {
            id: id.clone(),
            target_url: update.target_url.clone(),
        });
        if self.fail_update.load(Ordering::Relaxed) {
            return Err(Self::rejection());
        }
        Ok(Self::subscription(
            id.clone(),
            update.target_url.unwrap_or_default(),
            update.subscribed_events.unwrap_or_default(),
        ))
    }

    async fn delete_subscription(&self, id: &SubscriptionId) -> Result<(), PlatformError> {
        self.calls.lock().push(PlatformCall::Delete { id: id.clone() });
        if self.fail_delete.load(Ordering::Relaxed) {
            return Err(Self::rejection());
        }
        Ok(())
    }
}
