// Everything between the HTTP client and whoever shows notifications to the user
pub mod config;
pub mod delivery;
pub mod error;
pub mod poller;
pub mod preferences;
pub mod repository;

pub use config::Config;
pub use delivery::{ChannelSink, ConsoleSink, NotificationSink};
pub use error::Error;
pub use poller::NotificationPoller;
pub use preferences::{CredentialProvider, PreferencesStore};
pub use repository::NotificationRepository;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
