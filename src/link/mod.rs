//! Connection Manager.
//!
//! One supervised worker task per [`LinkManager`] owns the transport's read
//! side and runs `connect → read → disconnect → delay → reconnect` until
//! stopped. Everything else talks to the connection through a cheap
//! [`LinkHandle`]:
//!
//! ```text
//! send(text) ─► truncate(client budget) ─► throttle ─► truncate(server budget) ─► write + CRLF
//! ```

mod codec;
mod state;
mod worker;

pub use codec::{RawLineCodec, MAX_INBOUND_LINE};
pub use state::{IrcUser, LinkState, Session};

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use slirc_wire::caps::IDENTIFY_MSG;
use slirc_wire::{CRLF, Normalizer, OutboundRequest, SERVER_BUDGET, client_budget, truncate};
use tokio::io::{AsyncWriteExt, BufWriter, WriteHalf};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::message::Lifecycle;
use crate::negotiation::Pipeline;
use crate::router::{PipelineRouter, Router};
use crate::throttle::Throttler;
use crate::transport::{BoxedStream, TransportFactory};

type Writer = BufWriter<WriteHalf<BoxedStream>>;

static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    /// Id of the link whose worker runs on this task.
    static WORKER_OF: u64;
}

/// The worker task and the token that ends it.
struct WorkerControl {
    shutdown: CancellationToken,
    /// Closes when the worker task is gone.
    exited: watch::Receiver<()>,
}

impl WorkerControl {
    fn is_alive(&self) -> bool {
        self.exited.has_changed().is_ok()
    }
}

/// Resolve once the worker behind `exited` has finished.
async fn wait_exited(mut exited: watch::Receiver<()>) {
    while exited.changed().await.is_ok() {}
}

/// The current transport's cancellation, tagged with its generation.
struct Connection {
    generation: u64,
    token: CancellationToken,
}

/// The last line written.
#[derive(Debug, Clone)]
pub struct LastSent {
    /// Line text, with redactions applied.
    pub text: String,
    pub at: DateTime<Utc>,
}

/// State shared between the worker, the manager and every handle.
struct Shared {
    id: u64,
    config: Arc<LinkConfig>,
    factory: Arc<dyn TransportFactory>,
    throttler: Throttler,
    writer: tokio::sync::Mutex<Option<Writer>>,
    session: RwLock<Session>,
    state: watch::Sender<LinkState>,
    start_time: Mutex<Option<DateTime<Utc>>>,
    last_sent: Mutex<Option<LastSent>>,
    pending: Mutex<VecDeque<Lifecycle>>,
    generation: AtomicU64,
    connection: Mutex<Option<Connection>>,
    worker: Mutex<Option<WorkerControl>>,
}

/// Cloneable access to a connection.
///
/// Handed to every listener and to the router; safe to use from any task.
#[derive(Clone)]
pub struct LinkHandle {
    shared: Arc<Shared>,
}

impl LinkHandle {
    fn new(config: Arc<LinkConfig>, factory: Arc<dyn TransportFactory>) -> Self {
        let (state, _) = watch::channel(LinkState::Idle);
        let throttler = Throttler::new(config.burst, config.rate);
        Self {
            shared: Arc::new(Shared {
                id: NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed),
                config,
                factory,
                throttler,
                writer: tokio::sync::Mutex::new(None),
                session: RwLock::new(Session::default()),
                state,
                start_time: Mutex::new(None),
                last_sent: Mutex::new(None),
                pending: Mutex::new(VecDeque::new()),
                generation: AtomicU64::new(0),
                connection: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.shared.config
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Send a line that other clients may see relayed.
    ///
    /// The text is cut to what survives the server prefixing our hostmask
    /// (and the `identify-msg` marker, when enabled). Returns the number of
    /// characters written.
    pub async fn send(&self, request: impl Into<OutboundRequest>) -> Result<usize, LinkError> {
        let limit = {
            let session = self.shared.session.read();
            client_budget(
                session.user.host_mask().len(),
                session.has_cap(IDENTIFY_MSG),
            )
        };
        let request = truncate(request.into(), limit)?;
        self.send_raw(request).await
    }

    /// Send a line cut only to the server's own budget.
    ///
    /// Gives up with [`LinkError::NotConnected`] as soon as the connection is
    /// closed, even while waiting on the throttle or a stalled peer.
    pub async fn send_raw(&self, request: impl Into<OutboundRequest>) -> Result<usize, LinkError> {
        let request = request.into();
        let connection = self.connection_token().ok_or(LinkError::NotConnected)?;
        let buffered = self.is_worker();

        let send = async {
            if self.shared.writer.lock().await.is_none() {
                return Err(LinkError::NotConnected);
            }
            self.shared
                .throttler
                .throttle(|| self.write_line(request, buffered))
                .await
        };
        tokio::select! {
            biased;
            _ = connection.cancelled() => Err(LinkError::NotConnected),
            sent = send => sent,
        }
    }

    async fn write_line(&self, request: OutboundRequest, buffered: bool) -> Result<usize, LinkError> {
        let request = truncate(request, SERVER_BUDGET)?;
        let text = request.text().unwrap_or_default();

        let mut guard = self.shared.writer.lock().await;
        let writer = guard.as_mut().ok_or(LinkError::NotConnected)?;

        let mut written = writer.write_all(text.as_bytes()).await;
        if written.is_ok() {
            written = writer.write_all(CRLF.as_bytes()).await;
        }
        if written.is_ok() && !buffered {
            written = writer.flush().await;
        }
        if let Err(e) = written {
            warn!(error = %e, "write failed, closing connection");
            *guard = None;
            drop(guard);
            self.close_connection();
            return Err(LinkError::Io(e));
        }

        debug!(direction = "out", line = %request.log_text());
        *self.shared.last_sent.lock() = Some(LastSent {
            text: request.log_text().to_owned(),
            at: Utc::now(),
        });
        Ok(text.chars().count())
    }

    /// Flush writes buffered by the worker.
    ///
    /// Returns early if the connection is closed while the peer isn't reading.
    pub(crate) async fn flush(&self) {
        let Some(connection) = self.connection_token() else {
            return;
        };
        let flush = async {
            let mut guard = self.shared.writer.lock().await;
            if let Some(writer) = guard.as_mut() {
                if let Err(e) = writer.flush().await {
                    warn!(error = %e, "flush failed, closing connection");
                    *guard = None;
                    drop(guard);
                    self.close_connection();
                }
            }
        };
        tokio::select! {
            biased;
            _ = connection.cancelled() => {}
            _ = flush => {}
        }
    }

    /// `JOIN` a list of channels in one line.
    pub async fn join_channels<S: AsRef<str>>(&self, channels: &[S]) -> Result<usize, LinkError> {
        self.channel_command("JOIN", channels).await
    }

    /// `PART` a list of channels in one line.
    pub async fn part_channels<S: AsRef<str>>(&self, channels: &[S]) -> Result<usize, LinkError> {
        self.channel_command("PART", channels).await
    }

    async fn channel_command<S: AsRef<str>>(
        &self,
        command: &str,
        channels: &[S],
    ) -> Result<usize, LinkError> {
        if channels.is_empty() {
            return Ok(0);
        }
        let list: Vec<&str> = channels.iter().map(AsRef::as_ref).collect();
        self.send(format!("{command} {}", list.join(","))).await
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stop the connection.
    ///
    /// Non-permanent: drop the current transport and let the worker reconnect.
    /// Permanent: end the worker and wait for it to exit, unless called from
    /// the worker itself, in which case this returns right after signalling.
    /// Concurrent permanent stops all wait for the same exit.
    pub async fn stop(&self, permanent: bool) {
        if !permanent {
            self.close_connection();
            return;
        }

        let control = self
            .shared
            .worker
            .lock()
            .as_ref()
            .map(|w| (w.shutdown.clone(), w.exited.clone()));
        let Some((shutdown, exited)) = control else {
            self.close_connection();
            return;
        };

        shutdown.cancel();
        self.close_connection();

        if self.is_worker() {
            debug!("stop requested from the worker");
            return;
        }
        wait_exited(exited).await;
    }

    /// Interrupt the current transport, if any.
    fn close_connection(&self) {
        if let Some(connection) = self.shared.connection.lock().as_ref() {
            connection.token.cancel();
        }
    }

    fn connection_token(&self) -> Option<CancellationToken> {
        self.shared
            .connection
            .lock()
            .as_ref()
            .map(|c| c.token.clone())
    }

    /// Whether the caller is running on one of this link's workers, including
    /// one still winding down after a stop.
    fn is_worker(&self) -> bool {
        WORKER_OF
            .try_with(|id| *id == self.shared.id)
            .unwrap_or(false)
    }

    /// Whether a worker task is alive, including one still winding down.
    pub fn is_running(&self) -> bool {
        self.shared
            .worker
            .lock()
            .as_ref()
            .is_some_and(WorkerControl::is_alive)
    }

    pub fn state(&self) -> LinkState {
        *self.shared.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<LinkState> {
        self.shared.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: LinkState) {
        let previous = self.shared.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "state change");
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Our identity as negotiated with the server.
    pub fn user(&self) -> IrcUser {
        self.shared.session.read().user.clone()
    }

    /// Capabilities the server acknowledged.
    pub fn capabilities(&self) -> HashSet<String> {
        self.shared.session.read().caps.clone()
    }

    pub fn channels(&self) -> BTreeSet<String> {
        self.shared.session.read().channels.clone()
    }

    /// When the current transport was opened.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        *self.shared.start_time.lock()
    }

    /// The last line written, and when.
    pub fn last_sent(&self) -> Option<LastSent> {
        self.shared.last_sent.lock().clone()
    }

    /// Read the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.shared.session.read())
    }

    /// Modify the session.
    pub fn update_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.shared.session.write())
    }

    /// Queue a synthetic event; the worker dispatches it right after the
    /// current message.
    pub fn queue_synthetic(&self, event: Lifecycle) {
        self.shared.pending.lock().push_back(event);
    }

    pub(crate) fn take_synthetic(&self) -> Option<Lifecycle> {
        self.shared.pending.lock().pop_front()
    }

    /// Tell the transport factory registration went through.
    pub fn logical_success(&self) {
        self.shared.factory.logical_success();
    }

    // ========================================================================
    // Worker plumbing
    // ========================================================================

    pub(crate) fn factory(&self) -> &dyn TransportFactory {
        self.shared.factory.as_ref()
    }

    /// Register the token for a new connection; returns its generation.
    pub(crate) fn begin_connection(&self, token: CancellationToken) -> u64 {
        let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.shared.pending.lock().clear();
        *self.shared.connection.lock() = Some(Connection { generation, token });
        generation
    }

    pub(crate) async fn install_writer(&self, writer: Writer) {
        *self.shared.writer.lock().await = Some(writer);
        *self.shared.start_time.lock() = Some(Utc::now());
    }

    /// Drop the write half of connection `generation`; with the read half
    /// gone this closes the transport. A newer connection is left alone.
    pub(crate) async fn release_writer(&self, generation: u64) {
        let mut writer = self.shared.writer.lock().await;
        let mut connection = self.shared.connection.lock();
        if connection.as_ref().is_some_and(|c| c.generation == generation) {
            connection.take();
            writer.take();
        }
    }
}

/// Owns the worker and the negotiation pipeline for one connection.
pub struct LinkManager {
    handle: LinkHandle,
    pipeline: Arc<Pipeline>,
    router: Arc<dyn Router>,
}

impl LinkManager {
    /// Manager with the standard pipeline, dispatching to the pipeline only.
    pub fn new(config: LinkConfig, factory: Arc<dyn TransportFactory>) -> Self {
        Self::with_router(config, factory, Arc::new(PipelineRouter))
    }

    /// Manager with the standard pipeline and a custom router.
    pub fn with_router(
        config: LinkConfig,
        factory: Arc<dyn TransportFactory>,
        router: Arc<dyn Router>,
    ) -> Self {
        let pipeline = Pipeline::standard(&config);
        Self::with_pipeline(config, factory, pipeline, router)
    }

    pub fn with_pipeline(
        config: LinkConfig,
        factory: Arc<dyn TransportFactory>,
        pipeline: Pipeline,
        router: Arc<dyn Router>,
    ) -> Self {
        Self {
            handle: LinkHandle::new(Arc::new(config), factory),
            pipeline: Arc::new(pipeline),
            router,
        }
    }

    /// Spawn the worker. No-op while it's running.
    ///
    /// If a stopped worker is still winding down, the new one waits for it to
    /// exit before connecting. Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut worker = self.handle.shared.worker.lock();
        let previous = match worker.as_ref() {
            Some(w) if w.is_alive() && !w.shutdown.is_cancelled() => {
                debug!("start ignored, already running");
                return;
            }
            Some(w) if w.is_alive() => {
                debug!("previous worker still stopping, queueing start");
                Some(w.exited.clone())
            }
            _ => None,
        };

        let config = self.handle.config();
        let normalizer = Normalizer::for_label(&config.fallback_encoding).unwrap_or_else(|| {
            warn!(
                label = %config.fallback_encoding,
                "unknown fallback encoding, using default"
            );
            Normalizer::default()
        });
        let span = info_span!(
            "link",
            connector = %config.connector,
            metadata = ?config.metadata,
        );

        let shutdown = CancellationToken::new();
        let (exited_tx, exited) = watch::channel(());
        let run = worker::run(
            self.handle.clone(),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.router),
            normalizer,
            config.reconnect_delay(),
            shutdown.clone(),
        );
        let task = async move {
            let _exited = exited_tx;
            if let Some(previous) = previous {
                wait_exited(previous).await;
            }
            run.await;
        };
        tokio::spawn(WORKER_OF.scope(self.handle.shared.id, task).instrument(span));
        *worker = Some(WorkerControl { shutdown, exited });
    }

    /// See [`LinkHandle::stop`].
    pub async fn stop(&self, permanent: bool) {
        self.handle.stop(permanent).await;
    }

    pub async fn send(&self, request: impl Into<OutboundRequest>) -> Result<usize, LinkError> {
        self.handle.send(request).await
    }

    pub async fn send_raw(&self, request: impl Into<OutboundRequest>) -> Result<usize, LinkError> {
        self.handle.send_raw(request).await
    }

    pub async fn join_channels<S: AsRef<str>>(&self, channels: &[S]) -> Result<usize, LinkError> {
        self.handle.join_channels(channels).await
    }

    pub async fn part_channels<S: AsRef<str>>(&self, channels: &[S]) -> Result<usize, LinkError> {
        self.handle.part_channels(channels).await
    }

    pub fn user(&self) -> IrcUser {
        self.handle.user()
    }

    pub fn capabilities(&self) -> HashSet<String> {
        self.handle.capabilities()
    }

    pub fn channels(&self) -> BTreeSet<String> {
        self.handle.channels()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.handle.start_time()
    }

    pub fn last_sent(&self) -> Option<LastSent> {
        self.handle.last_sent()
    }

    pub fn state(&self) -> LinkState {
        self.handle.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LinkState> {
        self.handle.subscribe_state()
    }

    /// A handle for collaborators.
    pub fn handle(&self) -> LinkHandle {
        self.handle.clone()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
