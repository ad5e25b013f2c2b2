//! The job sync task and its handle.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use harvest_domain::{
    ClientConfig, ConnectionState, JobId, JobListQuery, JobRecord, JobTable, JobUpdate,
    PushMessage,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use super::{Interest, ReconnectBackoff};
use crate::api::JobsApi;
use crate::auth::{LogoutBroadcaster, SessionEvent, SessionStore};
use crate::error::{ApiError, SyncError};
use crate::gateway::AuthenticatedGateway;
use crate::ports::{PushSource, PushStream};

const EVENT_CAPACITY: usize = 256;

/// Timing of the sync channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSyncConfig {
    /// Interval of the reconciling poll.
    pub poll_interval: Duration,
    /// First reconnection delay.
    pub reconnect_initial: Duration,
    /// Reconnection delay ceiling.
    pub reconnect_max: Duration,
}

impl From<&ClientConfig> for JobSyncConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            reconnect_initial: config.reconnect_initial(),
            reconnect_max: config.reconnect_max(),
        }
    }
}

impl Default for JobSyncConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

/// Whether the reconciling poll is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    /// Every followed job is terminal; no poll requests are made.
    #[default]
    Idle,
    /// At least one followed job may still change; polling on the interval.
    Polling,
}

/// Why the sync channel stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Closed by its owner, or every handle was dropped.
    Closed,
    /// The session ended.
    LoggedOut,
}

/// Notifications from the sync channel.
#[derive(Debug, Clone, PartialEq)]
pub enum JobSyncEvent {
    /// A followed job changed; carries the record now in the table.
    JobUpdated(JobRecord),
    /// The push subscription changed state.
    ConnectionChanged(ConnectionState),
    /// The channel stopped; no further events follow.
    Stopped(StopReason),
}

#[derive(Debug)]
enum Command {
    Track(Vec<JobId>),
    TrackAll,
    TrackRecord(JobRecord),
    Replace(JobRecord),
    Untrack(JobId),
}

/// Handle to a running sync channel.
///
/// Clones share the channel. The channel stops when [`Self::close`] is
/// called, when the last clone is dropped, or when the session ends.
#[derive(Clone)]
pub struct JobSyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<JobSyncEvent>,
    table: Arc<RwLock<JobTable>>,
    poll_state: watch::Receiver<PollState>,
    connection: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
    _guard: Arc<DropGuard>,
}

impl std::fmt::Debug for JobSyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSyncHandle")
            .field("poll_state", &*self.poll_state.borrow())
            .field("connection", &*self.connection.borrow())
            .finish_non_exhaustive()
    }
}

impl JobSyncHandle {
    /// Starts a sync channel following `interest`.
    #[must_use]
    pub fn spawn(
        gateway: AuthenticatedGateway,
        push: Arc<dyn PushSource>,
        session: Arc<SessionStore>,
        logout: &LogoutBroadcaster,
        config: JobSyncConfig,
        interest: Interest,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (poll_tx, poll_state) = watch::channel(PollState::Idle);
        let (connection_tx, connection) = watch::channel(ConnectionState::Disconnected);
        let table = Arc::new(RwLock::new(JobTable::new()));
        let cancel = CancellationToken::new();

        let worker = SyncWorker {
            jobs: JobsApi::new(gateway),
            push,
            session,
            table: table.clone(),
            interest,
            events: events.clone(),
            poll_state: poll_tx,
            connection: connection_tx,
            backoff: ReconnectBackoff::new(config.reconnect_initial, config.reconnect_max),
            reconnect_at: None,
            poll_interval: config.poll_interval,
        };
        let session_events = logout.subscribe();
        let task = tokio::spawn(worker.run(command_rx, session_events, cancel.clone()));

        Self {
            commands,
            events,
            table,
            poll_state,
            connection,
            _guard: Arc::new(cancel.clone().drop_guard()),
            cancel,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Starts following the given jobs.
    pub fn track<I: IntoIterator<Item = JobId>>(&self, ids: I) {
        self.send(Command::Track(ids.into_iter().collect()));
    }

    /// Follows every job, including ones created later.
    pub fn track_all(&self) {
        self.send(Command::TrackAll);
    }

    /// Follows a job and applies a record already fetched for it.
    pub fn track_record(&self, record: JobRecord) {
        self.send(Command::TrackRecord(record));
    }

    /// Replaces a job's record regardless of its state.
    ///
    /// Used after a retry, which restarts a possibly terminal job.
    pub fn replace_record(&self, record: JobRecord) {
        self.send(Command::Replace(record));
    }

    /// Stops following a job. Already applied state is kept.
    pub fn untrack(&self, id: JobId) {
        self.send(Command::Untrack(id));
    }

    /// Subscribes to channel events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<JobSyncEvent> {
        self.events.subscribe()
    }

    /// Every known job, newest first.
    pub async fn snapshot(&self) -> Vec<JobRecord> {
        self.table.read().await.snapshot()
    }

    /// The stored record of one job.
    pub async fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.table.read().await.get(id).cloned()
    }

    /// Whether the reconciling poll is running.
    #[must_use]
    pub fn poll_state(&self) -> PollState {
        *self.poll_state.borrow()
    }

    /// State of the push subscription.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Returns true once the channel has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Stops the channel and waits until the subscription and the poll
    /// timer are released.
    pub async fn close(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "job sync task failed");
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("job sync channel already stopped");
        }
    }
}

struct SyncWorker {
    jobs: JobsApi,
    push: Arc<dyn PushSource>,
    session: Arc<SessionStore>,
    table: Arc<RwLock<JobTable>>,
    interest: Interest,
    events: broadcast::Sender<JobSyncEvent>,
    poll_state: watch::Sender<PollState>,
    connection: watch::Sender<ConnectionState>,
    backoff: ReconnectBackoff,
    reconnect_at: Option<Instant>,
    poll_interval: Duration,
}

impl SyncWorker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        session_events: broadcast::Receiver<SessionEvent>,
        cancel: CancellationToken,
    ) {
        info!(all = self.interest.is_all(), "job sync started");
        let mut shutdown = Shutdown {
            cancel,
            session_events,
            session: self.session.clone(),
        };
        let mut stream = None;

        let reason = self.drive(&mut stream, &mut commands, &mut shutdown).await;

        drop(stream);
        commands.close();
        self.set_connection(ConnectionState::Disconnected);
        self.poll_state.send_replace(PollState::Idle);
        info!(?reason, "job sync stopped");
        self.emit(JobSyncEvent::Stopped(reason));
    }

    /// Runs until the channel has to stop. Network work is abandoned as
    /// soon as the channel is closed or the session ends.
    async fn drive(
        &mut self,
        stream: &mut Option<PushStream>,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        shutdown: &mut Shutdown,
    ) -> StopReason {
        self.set_connection(ConnectionState::Connecting);
        match shutdown.guard(self.connect()).await {
            Ok(connected) => *stream = connected,
            Err(reason) => return reason,
        }
        if let Err(reason) = shutdown.guard(self.reconcile()).await {
            return reason;
        }

        let mut interval = time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polling = self.update_poll_state().await;

        loop {
            tokio::select! {
                biased;
                reason = shutdown.signal() => return reason,
                command = commands.recv() => match command {
                    Some(command) => {
                        if let Err(reason) = shutdown.guard(self.handle(command)).await {
                            return reason;
                        }
                    }
                    None => return StopReason::Closed,
                },
                message = next_message(stream) => {
                    if !self.on_message(message).await {
                        *stream = None;
                    }
                }
                () = wait_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    match shutdown.guard(self.connect()).await {
                        Ok(connected) => *stream = connected,
                        Err(reason) => return reason,
                    }
                }
                _ = interval.tick(), if polling => {
                    if let Err(reason) = shutdown.guard(self.reconcile()).await {
                        return reason;
                    }
                }
            }

            let now_polling = self.update_poll_state().await;
            if now_polling && !polling {
                interval.reset();
            }
            polling = now_polling;
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Track(ids) => {
                for id in ids {
                    debug!(job_id = %id, "tracking job");
                    self.interest.track(id);
                }
            }
            Command::TrackAll => {
                if !self.interest.is_all() {
                    self.interest.track_all();
                    self.reconcile().await;
                }
            }
            Command::TrackRecord(record) => {
                self.interest.track(record.id.clone());
                self.apply_record(record).await;
            }
            Command::Replace(record) => {
                self.interest.track(record.id.clone());
                self.table.write().await.replace(record.clone());
                debug!(job_id = %record.id, status = %record.status, "job replaced");
                self.emit(JobSyncEvent::JobUpdated(record));
            }
            Command::Untrack(id) => {
                debug!(job_id = %id, "untracking job");
                self.interest.untrack(&id);
            }
        }
    }

    /// Returns false when the stream is gone.
    async fn on_message(&mut self, message: Option<Result<PushMessage, SyncError>>) -> bool {
        match message {
            Some(Ok(PushMessage::JobUpdated(update))) => {
                self.apply_update(&update).await;
                true
            }
            Some(Ok(PushMessage::Unknown)) => {
                debug!("ignoring unknown push message");
                true
            }
            Some(Err(e)) => {
                warn!(error = %e, "push connection failed");
                self.schedule_reconnect();
                false
            }
            None => {
                info!("push connection closed by server");
                self.schedule_reconnect();
                false
            }
        }
    }

    async fn connect(&mut self) -> Option<PushStream> {
        let Some(token) = self.session.access_token().await else {
            debug!("no access credential, push connection deferred");
            self.schedule_reconnect();
            return None;
        };
        match self.push.connect(Some(token)).await {
            Ok(stream) => {
                debug!("push connection established");
                self.backoff.reset();
                self.set_connection(ConnectionState::Connected);
                Some(stream)
            }
            Err(e) => {
                warn!(error = %e, "push connection failed");
                self.schedule_reconnect();
                None
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.backoff.next_delay();
        debug!(backoff_ms = delay.as_millis(), "scheduling reconnect");
        self.reconnect_at = Some(Instant::now() + delay);
        self.set_connection(ConnectionState::Reconnecting);
    }

    async fn reconcile(&mut self) {
        let mut fetched: Vec<JobRecord> = Vec::new();
        if self.interest.is_all() {
            match self.jobs.list(&JobListQuery::default()).await {
                Ok(records) => fetched = records,
                Err(e) => warn!(error = %e, "job list poll failed"),
            }
        }

        // Rows the list did not cover (older pages, push-only jobs) are
        // fetched one by one.
        let pending = {
            let table = self.table.read().await;
            self.interest.pending_ids(&table)
        };
        for id in pending {
            if fetched.iter().any(|record| record.id == id) {
                continue;
            }
            if !self.session.is_authenticated().await {
                debug!("session ended, poll abandoned");
                return;
            }
            match self.jobs.get(&id).await {
                Ok(record) => fetched.push(record),
                Err(ApiError::Server { status: 404, .. }) => {
                    info!(job_id = %id, "job no longer exists, stopped following it");
                    self.interest.untrack(&id);
                }
                Err(e) => warn!(job_id = %id, error = %e, "job poll failed"),
            }
        }

        for record in fetched {
            if self.interest.includes(&record.id) {
                self.apply_record(record).await;
            }
        }
    }

    async fn apply_update(&self, update: &JobUpdate) {
        if !self.interest.includes(&update.id) {
            debug!(job_id = %update.id, "ignoring update for untracked job");
            return;
        }
        let stored = {
            let mut table = self.table.write().await;
            table
                .apply_update(update)
                .changed()
                .then(|| table.get(&update.id).cloned())
                .flatten()
        };
        if let Some(record) = stored {
            debug!(job_id = %record.id, status = %record.status, sequence = record.sequence, "job updated from push");
            self.emit(JobSyncEvent::JobUpdated(record));
        }
    }

    async fn apply_record(&self, record: JobRecord) {
        let id = record.id.clone();
        let stored = {
            let mut table = self.table.write().await;
            table
                .apply_record(record)
                .changed()
                .then(|| table.get(&id).cloned())
                .flatten()
        };
        if let Some(record) = stored {
            debug!(job_id = %record.id, status = %record.status, sequence = record.sequence, "job updated from poll");
            self.emit(JobSyncEvent::JobUpdated(record));
        }
    }

    async fn update_poll_state(&self) -> bool {
        let polling = {
            let table = self.table.read().await;
            self.interest.has_pending(&table)
        };
        let state = if polling {
            PollState::Polling
        } else {
            PollState::Idle
        };
        self.poll_state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(?state, "poll state changed");
            *current = state;
            true
        });
        polling
    }

    fn set_connection(&self, state: ConnectionState) {
        let changed = self.connection.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            self.emit(JobSyncEvent::ConnectionChanged(state));
        }
    }

    fn emit(&self, event: JobSyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Stop conditions of the worker: an explicit close, or the end of the
/// session.
struct Shutdown {
    cancel: CancellationToken,
    session_events: broadcast::Receiver<SessionEvent>,
    session: Arc<SessionStore>,
}

impl Shutdown {
    /// Resolves once the worker has to stop.
    async fn signal(&mut self) -> StopReason {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return StopReason::Closed,
                event = self.session_events.recv() => match event {
                    Ok(SessionEvent::LoggedOut { .. }) => return StopReason::LoggedOut,
                    Err(RecvError::Closed) => return StopReason::Closed,
                    Err(RecvError::Lagged(_)) => {
                        if !self.session.is_authenticated().await {
                            return StopReason::LoggedOut;
                        }
                    }
                    Ok(_) => {}
                },
            }
        }
    }

    /// Runs `work` unless the worker has to stop first.
    async fn guard<F: Future>(&mut self, work: F) -> Result<F::Output, StopReason> {
        tokio::select! {
            biased;
            reason = self.signal() => Err(reason),
            output = work => Ok(output),
        }
    }
}

async fn next_message(stream: &mut Option<PushStream>) -> Option<Result<PushMessage, SyncError>> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
