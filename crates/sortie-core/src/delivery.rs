use sortie_api::Notification;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Surfaces a notification to the user.
///
/// Called from the polling task, once per notification and in server order.
/// Implementations should return quickly; anything slow belongs on the other
/// side of a channel.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification);
}

/// Prints one line per notification, good enough for a terminal
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for ConsoleSink {
    fn deliver(&self, notification: &Notification) {
        println!("{}", render_line(notification));
    }
}

/// `[Message] 09:15 New message - Are we still on? (from Maya)`
pub fn render_line(notification: &Notification) -> String {
    let mut line = format!(
        "[{}] {} {} - {}",
        notification.kind,
        notification.created_at.format("%Y-%m-%d %H:%M"),
        notification.title,
        notification.body
    );

    if let Some(sender) = &notification.data.sender_name {
        line.push_str(&format!(" (from {})", sender));
    } else if let Some(sortie) = &notification.data.sortie_title {
        line.push_str(&format!(" ({})", sortie));
    }

    line
}

/// Hands notifications to another task, typically a UI event loop
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn deliver(&self, notification: &Notification) {
        if self.tx.send(notification.clone()).is_err() {
            // Nobody listening anymore; polling keeps going regardless
            warn!("Dropping notification {}: receiver closed", notification.id);
        } else {
            debug!("Queued notification {} for display", notification.id);
        }
    }
}
