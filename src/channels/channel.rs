//! Outbound notification channel trait and shared delivery types.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::format::FormattedMessage;

/// Per-channel outcome of one forwarding call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryResult {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
}

impl DeliveryResult {
    /// Tally per-recipient outcomes (`true` = delivered).
    pub fn from_outcomes(outcomes: &[bool]) -> Self {
        let total = outcomes.len();
        let success = outcomes.iter().filter(|ok| **ok).count();
        Self {
            total,
            success,
            failure: total - success,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// A downstream channel that fans a formatted memo out to its recipients.
///
/// Implementations never fail as a whole: disabled or misconfigured channels
/// return an empty result, and per-recipient failures are only counted.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    /// Deliver to every recipient except those owned by `creator`
    /// (a resource name such as `users/1`, or a bare id).
    async fn send(
        &self,
        message: &FormattedMessage,
        creator: &str,
        url: Option<&str>,
    ) -> DeliveryResult;
}

/// Build the HTTP client a channel reuses for all of its sends.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ChannelError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ChannelError::Http(e.to_string()))
}

/// Turn a response into `Ok` on 2xx, or a `SendFailed` carrying status and body.
pub(crate) async fn check_response(
    channel: &str,
    response: reqwest::Response,
) -> Result<(), ChannelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::SendFailed {
        name: channel.to_string(),
        reason: format!("{status} - {body}"),
    })
}
