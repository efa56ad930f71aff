//! Webhook forwarding: validate, format, fan out to both channels.

use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;
use uuid::Uuid;

use crate::channels::{DeliveryResult, NotifyChannel};
use crate::config::MemosConfig;
use crate::error::{Error, Result};
use crate::format::{FormattedMessage, MessageFormatter};
use crate::memo::{NotificationPayload, last_segment};

/// Relays one webhook payload to the push and messaging channels.
///
/// Stateless between calls; cheap to share behind `Arc`.
pub struct Forwarder {
    memos: Arc<MemosConfig>,
    formatter: MessageFormatter,
    push: Arc<dyn NotifyChannel>,
    messaging: Arc<dyn NotifyChannel>,
}

impl Forwarder {
    pub fn new(
        memos: Arc<MemosConfig>,
        push: Arc<dyn NotifyChannel>,
        messaging: Arc<dyn NotifyChannel>,
    ) -> Self {
        Self {
            formatter: MessageFormatter::new(Arc::clone(&memos)),
            memos,
            push,
            messaging,
        }
    }

    /// Forward a payload. Delivery outcomes are logged, never returned:
    /// recipients failing do not make this call fail. Only a channel task
    /// that dies before producing a result surfaces as an error.
    pub async fn forward(&self, payload: &NotificationPayload) -> Result<()> {
        let span = tracing::info_span!("forward", delivery_id = %Uuid::new_v4());
        self.forward_inner(payload).instrument(span).await
    }

    async fn forward_inner(&self, payload: &NotificationPayload) -> Result<()> {
        let Some(memo) = payload.memo.as_ref() else {
            tracing::warn!(
                activity_type = %payload.activity_type,
                "Received webhook payload without memo content"
            );
            return Ok(());
        };

        let memo_url = self.memos.memo_url(&memo.name);
        let creator_name = self.memos.display_name(&payload.creator);
        let message = self.formatter.format(payload, memo);

        tracing::info!(
            activity_type = %payload.activity_type,
            creator = %creator_name,
            creator_id = %last_segment(&payload.creator),
            "Forwarding memo"
        );

        let push = spawn_send(
            Arc::clone(&self.push),
            message.clone(),
            payload.creator.clone(),
            memo_url.clone(),
        );
        let messaging = spawn_send(
            Arc::clone(&self.messaging),
            message,
            payload.creator.clone(),
            memo_url,
        );
        let (push, messaging) = tokio::join!(push, messaging);

        let push = finish(self.push.name(), push);
        let messaging = finish(self.messaging.name(), messaging);
        push?;
        messaging?;

        Ok(())
    }
}

/// Run one channel's fan-out on its own task, inside the caller's span.
fn spawn_send(
    channel: Arc<dyn NotifyChannel>,
    message: FormattedMessage,
    creator: String,
    url: String,
) -> JoinHandle<DeliveryResult> {
    tokio::spawn(
        async move { channel.send(&message, &creator, Some(url.as_str())).await }
            .in_current_span(),
    )
}

fn finish(channel: &str, joined: std::result::Result<DeliveryResult, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => {
            tracing::debug!(
                channel,
                total = result.total,
                success = result.success,
                failed = result.failure,
                "Channel delivery finished"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(channel, error = %e, "Channel task failed");
            Err(Error::Dispatch {
                channel: channel.to_string(),
                reason: e.to_string(),
            })
        }
    }
}
