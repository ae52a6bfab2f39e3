//! Background notification polling.
//!
//! One loop per poller: fetch, hand every notification to the sink, fire off
//! the mark-as-read calls, sleep, repeat. The sleep is measured from the end
//! of a poll, so a slow server stretches the cadence instead of stacking up
//! requests.
//!
//! Server errors and network failures are logged and retried on the next
//! tick. A rejected or missing token stops the loop for good; starting it
//! again is up to whoever owns the session.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sortie_api::{ApiError, Notification, NotificationQuery};
use tokio::sync::{watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::delivery::NotificationSink;
use crate::preferences::CredentialProvider;
use crate::repository::NotificationRepository;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Anything shorter would hammer the server
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

const NO_TOKEN: &str = "No auth token stored";

/// Handle to the polling controller. Cheap to clone; all clones drive the
/// same loop.
#[derive(Clone)]
pub struct NotificationPoller {
    shared: Arc<Shared>,
}

struct Shared {
    repository: Arc<dyn NotificationRepository>,
    credentials: Arc<dyn CredentialProvider>,
    sink: Arc<dyn NotificationSink>,
    query: NotificationQuery,
    state: Mutex<PollState>,
    /// Mark-as-read calls in flight. Outlive the tick that spawned them,
    /// aborted when the loop stops.
    acks: Mutex<JoinSet<()>>,
    pending: Arc<PendingAcks>,
    status: watch::Sender<bool>,
}

/// Number of acks still running, so `flush` can wait without taking them
/// out of the task group.
#[derive(Default)]
struct PendingAcks {
    count: AtomicUsize,
    idle: Notify,
}

/// Held by each ack task; dropped when it finishes or is aborted
struct PendingGuard(Arc<PendingAcks>);

impl PendingGuard {
    fn new(pending: &Arc<PendingAcks>) -> Self {
        pending.count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(pending))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[derive(Default)]
struct PollState {
    active: Option<ActiveLoop>,
    next_generation: u64,
}

struct ActiveLoop {
    /// Lets a loop that stops itself avoid tearing down its successor
    generation: u64,
    interval: Duration,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl NotificationPoller {
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        credentials: Arc<dyn CredentialProvider>,
        sink: Arc<dyn NotificationSink>,
        query: NotificationQuery,
    ) -> Self {
        let (status, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                repository,
                credentials,
                sink,
                query,
                state: Mutex::new(PollState::default()),
                acks: Mutex::new(JoinSet::new()),
                pending: Arc::new(PendingAcks::default()),
                status,
            }),
        }
    }

    /// Start polling every `interval`. The first poll happens right away.
    ///
    /// Returns `false` if a loop is already running, in which case nothing
    /// changes, including its interval. Intervals below `MIN_POLL_INTERVAL`
    /// are raised to it. Must be called inside a Tokio runtime.
    pub fn start(&self, interval: Duration) -> bool {
        let mut state = self.shared.state.lock();

        if let Some(active) = &state.active {
            debug!(
                "Polling already running every {:?}, ignoring start({:?})",
                active.interval, interval
            );
            return false;
        }

        let interval = if interval < MIN_POLL_INTERVAL {
            warn!("Poll interval {:?} too short, using {:?}", interval, MIN_POLL_INTERVAL);
            MIN_POLL_INTERVAL
        } else {
            interval
        };

        let generation = state.next_generation;
        state.next_generation += 1;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            generation,
            interval,
            cancel.clone(),
        ));

        state.active = Some(ActiveLoop {
            generation,
            interval,
            cancel,
            handle,
        });
        self.shared.status.send_replace(true);

        info!("Started notification polling every {:?}", interval);
        true
    }

    /// Stop polling. No-op when nothing is running.
    ///
    /// A poll already waiting on the server finishes in the background, but
    /// its result is thrown away.
    pub fn stop(&self) {
        if self.shared.halt(None).is_some() {
            info!("Stopped notification polling");
        }
    }

    /// Stop and wait for the loop task to wind down
    pub async fn shutdown(&self) {
        if let Some(handle) = self.shared.halt(None) {
            info!("Shutting down notification polling");
            if let Err(e) = handle.await {
                warn!("Polling task ended abnormally: {}", e);
            }
        }
    }

    /// Wait for outstanding mark-as-read calls, e.g. before a one-shot
    /// `poll_now` caller exits.
    ///
    /// The acks stay in the task group while we wait, so a concurrent `stop`
    /// still aborts them (and `flush` then returns).
    pub async fn flush(&self) {
        let pending = &self.shared.pending;
        loop {
            let idle = pending.idle.notified();
            tokio::pin!(idle);
            // Register before checking the count so a wakeup can't slip by
            idle.as_mut().enable();

            if pending.count.load(Ordering::SeqCst) == 0 {
                break;
            }
            idle.await;
        }
        self.shared.reap_acks();
    }

    pub fn is_active(&self) -> bool {
        self.shared.state.lock().active.is_some()
    }

    /// Interval of the running loop, if any
    pub fn interval(&self) -> Option<Duration> {
        self.shared.state.lock().active.as_ref().map(|a| a.interval)
    }

    /// Watch Running (`true`) / Stopped (`false`) transitions, including the
    /// loop stopping itself after an auth failure.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.status.subscribe()
    }

    /// Run one poll right now, outside the timer.
    ///
    /// Delivers and acknowledges exactly like a scheduled tick and returns
    /// what the server sent. Never starts or stops the loop.
    pub async fn poll_now(&self) -> sortie_api::Result<Vec<Notification>> {
        // Nobody else holds this token, so the result is never discarded
        let never_cancelled = CancellationToken::new();
        self.shared
            .poll_once(&never_cancelled)
            .await
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

impl Shared {
    /// Tear down the active loop. With `Some(generation)` only that loop is
    /// stopped, so a late self-stop can't kill a newer loop.
    fn halt(&self, generation: Option<u64>) -> Option<JoinHandle<()>> {
        let mut state = self.state.lock();

        let matches = match (&state.active, generation) {
            (Some(active), Some(g)) => active.generation == g,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return None;
        }

        let active = state.active.take()?;
        active.cancel.cancel();
        self.acks.lock().abort_all();
        self.status.send_replace(false);
        Some(active.handle)
    }

    /// One poll. `None` means the loop was cancelled while the request was in
    /// flight or while delivering, and the rest of the result was dropped.
    async fn poll_once(
        &self,
        cancel: &CancellationToken,
    ) -> Option<sortie_api::Result<Vec<Notification>>> {
        let Some(token) = self.credentials.auth_token() else {
            debug!("No auth token, skipping poll");
            return Some(Err(ApiError::Auth(NO_TOKEN.to_string())));
        };

        let result = self.repository.fetch(&token, &self.query).await;

        if cancel.is_cancelled() {
            debug!("Polling stopped mid-request, discarding result");
            return None;
        }

        let notifications = match result {
            Ok(notifications) => notifications,
            Err(e) => return Some(Err(e)),
        };

        for notification in &notifications {
            // A sink or another thread may stop us halfway through the page
            if cancel.is_cancelled() {
                debug!("Polling stopped mid-delivery, dropping the rest");
                return None;
            }
            self.sink.deliver(notification);
            self.spawn_ack(&token, &notification.id, cancel);
        }

        Some(Ok(notifications))
    }

    fn spawn_ack(&self, token: &str, notification_id: &str, cancel: &CancellationToken) {
        let mut acks = self.acks.lock();

        // halt() cancels before it aborts the set, so checking under the
        // lock means no ack can slip in after the abort
        if cancel.is_cancelled() {
            return;
        }

        let repository = Arc::clone(&self.repository);
        let token = token.to_string();
        let id = notification_id.to_string();
        let guard = PendingGuard::new(&self.pending);

        acks.spawn(async move {
            let _guard = guard;
            match repository.acknowledge(&token, &id).await {
                Ok(_) => debug!("Marked notification {} as read", id),
                // Not retried: worst case the server hands it to us again
                Err(e) => warn!("Failed to mark notification {} as read: {}", id, e),
            }
        });
    }

    fn reap_acks(&self) {
        let mut acks = self.acks.lock();
        while acks.try_join_next().is_some() {}
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    generation: u64,
    interval: Duration,
    cancel: CancellationToken,
) {
    debug!("Polling loop {} running", generation);

    loop {
        match shared.poll_once(&cancel).await {
            None => break,
            Some(Ok(notifications)) => {
                if !notifications.is_empty() {
                    info!("Delivered {} notification(s)", notifications.len());
                }
            }
            Some(Err(e)) if e.is_auth() => {
                warn!("Stopping notification polling: {}", e);
                shared.halt(Some(generation));
                break;
            }
            Some(Err(e)) => {
                warn!("Notification poll failed, retrying in {:?}: {}", interval, e);
            }
        }

        shared.reap_acks();

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    debug!("Polling loop {} exited", generation);
}
