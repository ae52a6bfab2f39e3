use async_trait::async_trait;
use sortie_api::{Ack, Notification, NotificationClient, NotificationQuery, Result};

/// The three notification calls the poller needs.
///
/// `NotificationClient` is the real implementation; tests swap in fakes so the
/// loop can be driven without a server.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn fetch(&self, token: &str, query: &NotificationQuery) -> Result<Vec<Notification>>;
    async fn acknowledge(&self, token: &str, notification_id: &str) -> Result<Ack>;
    async fn unread_count(&self, token: &str) -> Result<u64>;
}

#[async_trait]
impl NotificationRepository for NotificationClient {
    async fn fetch(&self, token: &str, query: &NotificationQuery) -> Result<Vec<Notification>> {
        NotificationClient::fetch(self, token, query).await
    }

    async fn acknowledge(&self, token: &str, notification_id: &str) -> Result<Ack> {
        NotificationClient::acknowledge(self, token, notification_id).await
    }

    async fn unread_count(&self, token: &str) -> Result<u64> {
        NotificationClient::unread_count(self, token).await
    }
}
