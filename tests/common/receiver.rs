//! Fake event consumer.
//!
//! Accepts event callbacks over HTTP and hands the JSON bodies to the test.

use axum::{Json, Router, extract::State, routing::post};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;

pub struct EventReceiver {
    url: String,
    events: Mutex<mpsc::UnboundedReceiver<serde_json::Value>>,
}

async fn event_handler(
    State(tx): State<mpsc::UnboundedSender<serde_json::Value>>,
    Json(body): Json<serde_json::Value>,
) -> &'static str {
    let _ = tx.send(body);
    "ok"
}

#[allow(dead_code)]
impl EventReceiver {
    /// Serve `POST /event` on an ephemeral port.
    pub async fn spawn() -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new()
            .route("/event", post(event_handler))
            .with_state(tx);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}/event", listener.local_addr()?);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            url,
            events: Mutex::new(rx),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Next event body, or `None` if nothing arrives within `dur`.
    pub async fn next_event(&self, dur: Duration) -> Option<serde_json::Value> {
        let mut events = self.events.lock().await;
        timeout(dur, events.recv()).await.ok().flatten()
    }
}
