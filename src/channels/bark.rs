//! Bark channel — pushes notifications to iOS devices through a Bark server.
//!
//! One form-encoded `POST {server}/push` per device key, all issued
//! concurrently. Self-hosted servers behind basic auth are supported.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use secrecy::ExposeSecret;

use crate::channels::{DeliveryResult, NotifyChannel, check_response};
use crate::config::BarkConfig;
use crate::error::ChannelError;
use crate::format::FormattedMessage;

const CHANNEL_NAME: &str = "bark";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Push-notification channel backed by a Bark server.
pub struct BarkChannel {
    config: Arc<BarkConfig>,
    client: reqwest::Client,
}

impl BarkChannel {
    pub fn new(config: Arc<BarkConfig>, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn push_url(&self) -> String {
        format!("{}/push", self.config.server_url.trim_end_matches('/'))
    }

    /// Form fields for one device. Optional fields are only sent when set.
    fn form_fields(
        &self,
        title: &str,
        body: &str,
        device_key: &str,
        url: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("title", title.to_string()),
            ("body", body.to_string()),
            ("device_key", device_key.to_string()),
        ];

        let optional = [
            ("group", self.config.group.as_deref()),
            ("icon", self.config.icon.as_deref()),
            ("sound", self.config.sound.as_deref()),
            ("url", url),
        ];
        for (key, value) in optional {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                fields.push((key, v.to_string()));
            }
        }

        fields
    }

    /// One push request, with basic auth when configured.
    fn build_request(
        &self,
        device_key: &str,
        title: &str,
        body: &str,
        url: Option<&str>,
    ) -> Result<reqwest::Request, ChannelError> {
        let mut builder = self
            .client
            .post(self.push_url())
            .form(&self.form_fields(title, body, device_key, url));

        if let Some((username, password)) =
            self.config.auth.as_ref().and_then(|auth| auth.credentials())
        {
            builder = builder.basic_auth(username, Some(password.expose_secret()));
        }

        let mut request = builder
            .build()
            .map_err(|e| ChannelError::Http(e.to_string()))?;
        // `.form()` sets the content type without a charset
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        Ok(request)
    }

    async fn send_to_device(
        &self,
        device_key: &str,
        title: &str,
        body: &str,
        url: Option<&str>,
    ) -> Result<(), ChannelError> {
        let request = self.build_request(device_key, title, body, url)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        check_response(CHANNEL_NAME, response).await
    }
}

#[async_trait]
impl NotifyChannel for BarkChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(
        &self,
        message: &FormattedMessage,
        creator: &str,
        url: Option<&str>,
    ) -> DeliveryResult {
        if !self.config.enabled {
            tracing::debug!("Bark notification is disabled");
            return DeliveryResult::default();
        }

        let device_keys = self.config.device_keys.resolve(creator);
        if device_keys.is_empty() {
            tracing::debug!(creator = %creator, "No Bark devices configured for notification");
            return DeliveryResult::default();
        }

        let sends = device_keys.iter().map(|device_key| async move {
            match self
                .send_to_device(device_key, &message.title, &message.body, url)
                .await
            {
                Ok(()) => {
                    tracing::debug!(device_key = %device_key, "Bark notification sent");
                    true
                }
                Err(e @ ChannelError::SendFailed { .. }) => {
                    tracing::warn!(device_key = %device_key, error = %e, "Bark notification rejected");
                    false
                }
                Err(e) => {
                    tracing::error!(device_key = %device_key, error = %e, "Error sending Bark notification");
                    false
                }
            }
        });
        let outcomes = join_all(sends).await;

        let result = DeliveryResult::from_outcomes(&outcomes);
        tracing::info!(
            total = result.total,
            success = result.success,
            failed = result.failure,
            "Bark notification fan-out complete"
        );
        result
    }
}
