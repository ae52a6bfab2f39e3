use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use sortie_api::{NotificationClient, NotificationQuery};
use sortie_core::delivery::render_line;
use sortie_core::{Config, ConsoleSink, CredentialProvider, NotificationPoller, PreferencesStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sortie")]
#[command(version, long_about = None)]
#[command(about = "Notifications for your Sortie account, from the terminal")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Store the session token issued by the app
    Login {
        /// Bearer token
        #[arg(long)]
        token: String,
        /// Your user id
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// List notifications
    List {
        /// Include notifications that were already read
        #[arg(long)]
        all: bool,
        #[arg(long, default_value = "20")]
        limit: NonZeroU32,
        #[arg(long, default_value = "0")]
        offset: u32,
    },
    /// Show how many notifications are unread
    Unread,
    /// Mark notifications as read
    Read {
        /// Notification id
        #[arg(required_unless_present = "all")]
        id: Option<String>,
        /// Mark everything as read
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// Poll once and show anything new
    Check,
    /// Keep polling until Ctrl-C
    Watch {
        /// Seconds between polls
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "sortie=debug" } else { "sortie=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    let prefs = Arc::new(PreferencesStore::open_default()?);
    let client = NotificationClient::with_timeout(&config.api.base_url, config.api.timeout())?;

    match cli.command {
        Commands::Login { token, user_id } => {
            prefs.set_session(&token, user_id.as_deref())?;
            println!("Session saved to {}", prefs.path().display());
        }
        Commands::Logout => {
            prefs.clear()?;
            println!("Logged out");
        }
        Commands::List { all, limit, offset } => {
            let token = require_token(&prefs)?;
            let mut query = NotificationQuery::new().limit(limit).offset(offset);
            if all {
                query = query.include_read();
            }

            let notifications = client.fetch(&token, &query).await?;
            if notifications.is_empty() {
                println!("Nothing here");
            }
            for n in &notifications {
                let marker = if n.is_read { " " } else { "*" };
                println!("{} {}  {}", marker, n.id, render_line(n));
            }
        }
        Commands::Unread => {
            let token = require_token(&prefs)?;
            let count = client.unread_count(&token).await?;
            println!("{} unread", count);
        }
        Commands::Read { id, all } => {
            let token = require_token(&prefs)?;
            let ack = match id {
                Some(id) if !all => client.acknowledge(&token, &id).await?,
                _ => client.acknowledge_all(&token).await?,
            };
            if !ack.message.is_empty() {
                println!("{}", ack.message);
            }
        }
        Commands::Check => {
            let poller = build_poller(client, &prefs, &config);
            let delivered = poller.poll_now().await?;
            poller.flush().await;
            if delivered.is_empty() {
                println!("No new notifications");
            }
        }
        Commands::Watch { interval } => {
            require_token(&prefs)?;
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.polling.interval());

            let poller = build_poller(client, &prefs, &config);
            let mut status = poller.subscribe();
            poller.start(interval);

            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for Ctrl-C")?;
                    tracing::info!("Interrupted, stopping");
                }
                _ = status.wait_for(|running| !*running) => {
                    tracing::warn!("Polling stopped, run `sortie login` to refresh your session");
                }
            }

            poller.shutdown().await;
        }
    }

    Ok(())
}

fn require_token(prefs: &PreferencesStore) -> anyhow::Result<String> {
    match prefs.auth_token() {
        Some(token) => Ok(token),
        None => bail!("Not logged in. Run `sortie login --token <TOKEN>` first"),
    }
}

fn build_poller(
    client: NotificationClient,
    prefs: &Arc<PreferencesStore>,
    config: &Config,
) -> NotificationPoller {
    NotificationPoller::new(
        Arc::new(client),
        Arc::clone(prefs) as Arc<dyn CredentialProvider>,
        Arc::new(ConsoleSink::new()),
        config.polling.query(),
    )
}
