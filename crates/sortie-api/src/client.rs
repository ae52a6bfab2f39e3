use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::notifications::{Ack, Notification, NotificationQuery, UnreadCount};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the notification endpoints.
///
/// Stateless with respect to credentials: every call takes the bearer token,
/// so whoever owns the session decides which token goes out. No retries and no
/// caching happen here; callers get exactly one answer per call.
#[derive(Debug, Clone)]
pub struct NotificationClient {
    client: reqwest::Client,
    base_url: String,
}

impl NotificationClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("Sortie/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a page of notifications
    pub async fn fetch(
        &self,
        token: &str,
        query: &NotificationQuery,
    ) -> Result<Vec<Notification>> {
        ensure_token(token)?;
        let url = format!("{}/notifications", self.base_url);

        let request = self.client.get(&url).bearer_auth(token).query(&[
            ("unreadOnly", query.unread_only.to_string()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ]);

        let notifications: Vec<Notification> = send_json(request).await?;
        debug!("Fetched {} notifications", notifications.len());
        Ok(notifications)
    }

    /// Mark a single notification as read on the server
    pub async fn acknowledge(&self, token: &str, notification_id: &str) -> Result<Ack> {
        ensure_token(token)?;
        let url = format!(
            "{}/notifications/{}/read",
            self.base_url,
            urlencoding::encode(notification_id)
        );

        send_json(self.client.patch(&url).bearer_auth(token)).await
    }

    /// Mark everything as read
    pub async fn acknowledge_all(&self, token: &str) -> Result<Ack> {
        ensure_token(token)?;
        let url = format!("{}/notifications/read-all", self.base_url);

        send_json(self.client.patch(&url).bearer_auth(token)).await
    }

    pub async fn unread_count(&self, token: &str) -> Result<u64> {
        ensure_token(token)?;
        let url = format!("{}/notifications/unread-count", self.base_url);

        let count: UnreadCount = send_json(self.client.get(&url).bearer_auth(token)).await?;
        Ok(count.count)
    }
}

// An empty bearer header would just earn a 401 anyway, skip the round trip
fn ensure_token(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(ApiError::Auth("No auth token".to_string()));
    }
    Ok(())
}

/// Send the request and sort the response into the error taxonomy
async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Auth(server_message(status, &body)));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Server {
            status: status.as_u16(),
            message: server_message(status, &body),
        });
    }

    Ok(response.json().await?)
}

/// Pull a human readable message out of an error body.
/// The backend uses `{"message": ..}` mostly, `{"error": ..}` in a few places.
fn server_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string()
}
