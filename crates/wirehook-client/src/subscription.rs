//! Webhook subscription lifecycle: one remote record per controller run.

use tracing::{info, warn};

use wirehook_core::events::WebhookEventType;
use wirehook_core::ids::{ConnectionId, SubscriptionId};

use crate::platform::{PlatformClient, PlatformError, SubscriptionUpdate};

/// Owns the remote webhook subscription for the life of one controller run
/// and keeps its delivery target pointed at the live connection id.
pub struct SubscriptionManager<C> {
    client: C,
    relay_url: String,
    events: Vec<WebhookEventType>,
    adopt: Option<SubscriptionId>,
    keep_on_teardown: bool,
    current: Option<SubscriptionId>,
    created: bool,
}

impl<C: PlatformClient> SubscriptionManager<C> {
    pub fn new(
        client: C,
        relay_url: impl Into<String>,
        events: Vec<WebhookEventType>,
    ) -> Self {
        let relay_url = relay_url.into().trim_end_matches('/').to_owned();
        Self {
            client,
            relay_url,
            events,
            adopt: None,
            keep_on_teardown: false,
            current: None,
            created: false,
        }
    }

    /// Update an existing subscription instead of creating a fresh one.
    /// Adopted subscriptions are never deleted at teardown.
    #[must_use]
    pub fn adopt(mut self, id: SubscriptionId) -> Self {
        self.adopt = Some(id);
        self
    }

    /// Preserve the subscription at teardown even if this run created it.
    #[must_use]
    pub fn keep_on_teardown(mut self, keep: bool) -> Self {
        self.keep_on_teardown = keep;
        self
    }

    /// The delivery URL for a connection id.
    #[must_use]
    pub fn target_url(&self, connection_id: &ConnectionId) -> String {
        format!("{}/relay/{}", self.relay_url, connection_id)
    }

    /// Whether a subscription is in place.
    #[must_use]
    pub fn has_subscription(&self) -> bool {
        self.current.is_some()
    }

    /// The current subscription id, once one is in place.
    #[must_use]
    pub fn subscription_id(&self) -> Option<&SubscriptionId> {
        self.current.as_ref()
    }

    /// Point the remote subscription at `connection_id`, creating it (or
    /// adopting the configured one) on the first call.
    ///
    /// Errors here abort the run: a listener with no working subscription
    /// has nothing to listen to.
    pub async fn activate(&mut self, connection_id: &ConnectionId) -> Result<(), PlatformError> {
        let target = self.target_url(connection_id);
        let sub = match self.adopt.clone() {
            Some(id) => {
                let sub = self
                    .client
                    .update_subscription(
                        &id,
                        SubscriptionUpdate {
                            target_url: Some(target),
                            subscribed_events: Some(self.events.clone()),
                            is_active: Some(true),
                        },
                    )
                    .await?;
                self.created = false;
                info!(
                    subscription_id = %sub.id,
                    target_url = %sub.target_url,
                    "webhook subscription updated"
                );
                sub
            }
            None => {
                let sub = self
                    .client
                    .create_subscription(&target, &self.events)
                    .await?;
                self.created = true;
                info!(
                    subscription_id = %sub.id,
                    target_url = %sub.target_url,
                    events = sub.subscribed_events.len(),
                    "webhook subscription created"
                );
                sub
            }
        };
        self.current = Some(sub.id);
        Ok(())
    }

    /// Repoint the subscription after a reconnect. Best-effort: on failure
    /// the stale target stays in place and the next reconnect tries again.
    pub async fn retarget(&mut self, connection_id: &ConnectionId) {
        let Some(id) = self.current.clone() else {
            return;
        };
        let target = self.target_url(connection_id);
        let update = SubscriptionUpdate {
            target_url: Some(target.clone()),
            is_active: Some(true),
            ..Default::default()
        };
        match self.client.update_subscription(&id, update).await {
            Ok(_) => info!(
                subscription_id = %id,
                target_url = %target,
                "webhook subscription retargeted"
            ),
            Err(e) => warn!(
                subscription_id = %id,
                error = %e,
                "failed to retarget webhook subscription, continuing with stale target"
            ),
        }
    }

    /// Tear down the subscription on shutdown.
    ///
    /// Deletes only what this run created, unless configured to keep it;
    /// failures are swallowed. Safe to call more than once — the first call
    /// takes the subscription id, so a second call is a no-op.
    pub async fn teardown(&mut self) {
        let Some(id) = self.current.take() else {
            return;
        };
        if !self.created || self.keep_on_teardown {
            info!(subscription_id = %id, "webhook subscription preserved");
            return;
        }
        match self.client.delete_subscription(&id).await {
            Ok(()) => info!(subscription_id = %id, "webhook subscription deleted"),
            Err(e) => warn!(
                subscription_id = %id,
                error = %e,
                "failed to delete webhook subscription"
            ),
        }
    }
}
