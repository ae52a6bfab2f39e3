use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification as the backend sends it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: NotificationData,
}

/// What triggered the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    NewPublication,       // Someone you follow posted
    ChatMessage,          // New message in a conversation
    NewSortie,            // A sortie was created nearby or by a friend
    ParticipationAccepted,
    ParticipationRejected,
    Test,                 // Sent from the admin panel
    // Newer servers may add kinds; don't throw away the whole page for it
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::NewPublication => write!(f, "Publication"),
            NotificationType::ChatMessage => write!(f, "Message"),
            NotificationType::NewSortie => write!(f, "Sortie"),
            NotificationType::ParticipationAccepted => write!(f, "Accepted"),
            NotificationType::ParticipationRejected => write!(f, "Rejected"),
            NotificationType::Test => write!(f, "Test"),
            NotificationType::Unknown => write!(f, "Other"),
        }
    }
}

/// Cross references used by whoever renders the notification.
/// Which fields are present depends on the notification type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortie_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortie_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

/// Response of the mark-as-read endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: u64,
}

/// Paging and filtering for the notification list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationQuery {
    /// Only return notifications that haven't been read yet
    pub unread_only: bool,
    pub limit: NonZeroU32,
    pub offset: u32,
}

const DEFAULT_PAGE_SIZE: NonZeroU32 = match NonZeroU32::new(20) {
    Some(n) => n,
    None => unreachable!(),
};

impl Default for NotificationQuery {
    fn default() -> Self {
        Self {
            unread_only: true,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl NotificationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_read(mut self) -> Self {
        self.unread_only = false;
        self
    }

    pub fn limit(mut self, limit: NonZeroU32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}
