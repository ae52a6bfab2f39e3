// HTTP client for the notification endpoints of the Sortie backend
pub mod client;
pub mod error;
pub mod notifications;

// Re-export common types
pub use client::NotificationClient;
pub use error::{ApiError, Result};
pub use notifications::{
    Ack, Notification, NotificationData, NotificationQuery, NotificationType, UnreadCount,
};
