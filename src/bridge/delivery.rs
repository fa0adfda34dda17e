//! Event delivery to the remote consumer over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::event::ChannelMessageEvent;
use crate::error::DeliveryError;

/// Destination for channel message events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Hand one event over. Called at most once per event.
    async fn deliver(&self, event: &ChannelMessageEvent) -> Result<(), DeliveryError>;
}

/// `event_callback` envelope as the consumer expects it.
#[derive(Debug, Serialize)]
struct EventCallback<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    event: MessageEvent<'a>,
}

#[derive(Debug, Serialize)]
struct MessageEvent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    channel: &'a str,
    user: &'a str,
    text: &'a str,
}

impl<'a> From<&'a ChannelMessageEvent> for EventCallback<'a> {
    fn from(event: &'a ChannelMessageEvent) -> Self {
        Self {
            kind: "event_callback",
            event: MessageEvent {
                kind: "message",
                channel: &event.channel,
                user: &event.originator,
                text: &event.text,
            },
        }
    }
}

/// POSTs each event as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpEventSink {
    client: reqwest::Client,
    url: String,
}

impl HttpEventSink {
    /// `timeout` bounds the whole exchange, response body included.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn deliver(&self, event: &ChannelMessageEvent) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(&EventCallback::from(event))?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(DeliveryError::Request)?;

        let status = response.status();
        // The body is read even on success so the exchange completes.
        let body = response.bytes().await.map_err(DeliveryError::Body)?;
        if status != reqwest::StatusCode::OK {
            tracing::debug!(status = status.as_u16(), body = %String::from_utf8_lossy(&body), "Event rejected");
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }
}
