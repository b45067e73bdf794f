//! Log stream session management.
//!
//! One client owns at most one active session. The session's whole lifecycle
//! runs inside a single driver task: dialing, the framed read loop, the
//! heartbeat cadence, and the retry wait. That makes the heartbeat and the
//! retry timer mutually exclusive by construction and keeps surface callbacks
//! from ever overlapping each other.

use crate::buffer::{LogBuffer, LogRecord};
use crate::config::StreamConfig;
use crate::error::{ClientError, Result};
use crate::export::{LogExport, render_export};
use crate::lifecycle::{ReconnectDecision, StreamLifecycle, StreamState};
use crate::protocol::{FeedMessage, HEARTBEAT_PROBE, LogLevel, TaskId, parse_feed_message};
use crate::surface::{LogSurface, ScrollMetrics, ScrollTracker};
use chrono::Local;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde_json::Map;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{Instant, interval_at, sleep, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Reconnecting client for one task's live log feed.
pub struct LogStreamClient {
    config: StreamConfig,
    buffer: LogBuffer,
    tracker: ScrollTracker,
    lifecycle: Arc<Mutex<StreamLifecycle>>,
    session: Mutex<Option<StreamSession>>,
}

struct StreamSession {
    task_id: TaskId,
    surface: Arc<dyn LogSurface>,
    writer: Arc<Mutex<Option<WsWriter>>>,
    driver: tokio::task::JoinHandle<()>,
}

impl LogStreamClient {
    pub fn new(config: StreamConfig) -> Self {
        let buffer = LogBuffer::new(config.max_rendered_records);
        let tracker = ScrollTracker::new(config.history_threshold_px);
        let lifecycle = Arc::new(Mutex::new(StreamLifecycle::new(
            config.reconnect_delay(),
            config.max_reconnect_attempts,
        )));
        Self {
            config,
            buffer,
            tracker,
            lifecycle,
            session: Mutex::new(None),
        }
    }

    /// Bind the client to a task's feed and start streaming into `surface`.
    ///
    /// Any prior session is torn down first. Returns immediately after
    /// spawning the driver; connection progress arrives through
    /// `LogSurface::set_status`. Errors only for invalid input or
    /// configuration, never for transport conditions.
    pub async fn attach(&self, task_id: TaskId, surface: Arc<dyn LogSurface>) -> Result<()> {
        if task_id == 0 {
            return Err(ClientError::InvalidRequest(
                "task id must be positive".to_string(),
            ));
        }
        let url = self.config.feed_url(task_id)?;

        let mut session_guard = self.session.lock().await;
        if let Some(previous) = session_guard.take() {
            teardown_session(previous).await;
        }

        self.buffer.clear().await;
        self.tracker.reset();
        self.lifecycle.lock().await.reset();

        surface.initialize(task_id);

        let writer: Arc<Mutex<Option<WsWriter>>> = Arc::new(Mutex::new(None));
        let driver = tokio::spawn(run_stream(StreamContext {
            task_id,
            url,
            config: self.config.clone(),
            surface: Arc::clone(&surface),
            buffer: self.buffer.clone(),
            tracker: self.tracker.clone(),
            lifecycle: Arc::clone(&self.lifecycle),
            writer: Arc::clone(&writer),
        }));

        *session_guard = Some(StreamSession {
            task_id,
            surface,
            writer,
            driver,
        });
        Ok(())
    }

    /// Tear down the active session. Safe to call when none exists.
    ///
    /// Once this returns, no further surface callback is made, even if the
    /// server was mid-send.
    pub async fn detach(&self) {
        let mut session_guard = self.session.lock().await;
        if let Some(session) = session_guard.take() {
            teardown_session(session).await;
            self.lifecycle.lock().await.mark_detached();
        }
    }

    /// Drop all buffered records and empty the surface's record region.
    /// The connection is unaffected.
    pub async fn clear(&self) {
        self.buffer.clear().await;
        if let Some(session) = self.session.lock().await.as_ref() {
            session.surface.clear_records();
        }
    }

    /// Render the current buffer to a text artifact.
    pub async fn export(&self) -> Result<LogExport> {
        let session_guard = self.session.lock().await;
        let session = session_guard.as_ref().ok_or(ClientError::NotAttached)?;
        let records = self.buffer.snapshot().await;
        render_export(session.task_id, &records, Local::now())
    }

    /// Feed fresh viewport geometry from the embedder's scroll handler.
    /// Lock-free; callable from any context.
    pub fn observe_scroll(&self, metrics: ScrollMetrics) {
        self.tracker.observe(metrics);
    }

    /// Current connection lifecycle state.
    pub async fn state(&self) -> StreamState {
        self.lifecycle.lock().await.state()
    }

    /// Task id of the active session, if any.
    pub async fn task_id(&self) -> Option<TaskId> {
        self.session.lock().await.as_ref().map(|s| s.task_id)
    }

    /// Number of records currently buffered.
    pub async fn buffered_records(&self) -> usize {
        self.buffer.len().await
    }
}

/// Stop the driver, then retire the socket.
///
/// The driver is joined, not just aborted, so no callback can still be in
/// flight when teardown returns.
async fn teardown_session(mut session: StreamSession) {
    session.driver.abort();
    match (&mut session.driver).await {
        Ok(()) => {}
        Err(error) if error.is_cancelled() => {}
        Err(error) => {
            warn!(
                "log stream driver for task {} ended abnormally: {}",
                session.task_id, error
            );
        }
    }

    if let Some(mut writer) = session.writer.lock().await.take() {
        if let Err(error) = writer.send(Message::Close(None)).await {
            debug!(
                "close frame for task {} not delivered: {}",
                session.task_id, error
            );
        }
    }
}

struct StreamContext {
    task_id: TaskId,
    url: Url,
    config: StreamConfig,
    surface: Arc<dyn LogSurface>,
    buffer: LogBuffer,
    tracker: ScrollTracker,
    lifecycle: Arc<Mutex<StreamLifecycle>>,
    writer: Arc<Mutex<Option<WsWriter>>>,
}

async fn run_stream(ctx: StreamContext) {
    ctx.surface.set_status(StreamState::Connecting);

    loop {
        {
            let mut lifecycle = ctx.lifecycle.lock().await;
            lifecycle.mark_connecting();
            debug!(
                "opening log stream for task {} (attempt {})",
                ctx.task_id,
                lifecycle.connect_attempts()
            );
        }

        match timeout(
            ctx.config.connect_timeout(),
            connect_async(ctx.url.as_str()),
        )
        .await
        {
            Ok(Ok((stream, _response))) => {
                ctx.lifecycle.lock().await.mark_connected();
                ctx.surface.set_status(StreamState::Connected);
                debug!("log stream connected for task {}", ctx.task_id);

                let (writer, reader) = stream.split();
                *ctx.writer.lock().await = Some(writer);

                read_until_close(&ctx, reader).await;

                // The dead connection's handle is gone before any reconnect
                // bookkeeping starts.
                ctx.writer.lock().await.take();
            }
            Ok(Err(error)) => {
                warn!("log stream open failed for task {}: {}", ctx.task_id, error);
            }
            Err(_elapsed) => {
                warn!(
                    "log stream open timed out for task {} after {:?}",
                    ctx.task_id,
                    ctx.config.connect_timeout()
                );
            }
        }

        ctx.surface.set_status(StreamState::Disconnected);
        let decision = ctx.lifecycle.lock().await.mark_disconnected();
        match decision {
            ReconnectDecision::Retry(plan) => {
                debug!(
                    "scheduling reconnect attempt {}/{} for task {} in {:?}",
                    plan.attempt, ctx.config.max_reconnect_attempts, ctx.task_id, plan.delay
                );
                ctx.surface.set_status(StreamState::Connecting);
                sleep(plan.delay).await;
            }
            ReconnectDecision::GiveUp => {
                warn!(
                    "log stream for task {} failed after {} attempts",
                    ctx.task_id, ctx.config.max_reconnect_attempts
                );
                ctx.surface.set_status(StreamState::Failed);
                return;
            }
        }
    }
}

/// Pump frames until the connection dies, probing liveness on a fixed
/// cadence. Returning from here stops the heartbeat with the connection.
async fn read_until_close(ctx: &StreamContext, mut reader: WsReader) {
    let heartbeat_period = ctx.config.heartbeat_interval();
    let mut heartbeat = interval_at(Instant::now() + heartbeat_period, heartbeat_period);

    loop {
        tokio::select! {
            frame = reader.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match parse_feed_message(text.as_str()) {
                        Ok(Some(message)) => apply_feed_message(ctx, message).await,
                        Ok(None) => {}
                        Err(error) => {
                            warn!(
                                "dropping malformed feed payload for task {}: {}",
                                ctx.task_id, error
                            );
                        }
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        debug!(
                            "received ping for task {} ({} bytes)",
                            ctx.task_id,
                            payload.len()
                        );
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("log stream closed for task {}", ctx.task_id);
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(error)) => {
                        warn!("log stream read error for task {}: {}", ctx.task_id, error);
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if !send_heartbeat(ctx).await {
                    break;
                }
            }
        }
    }
}

async fn send_heartbeat(ctx: &StreamContext) -> bool {
    let mut writer_guard = ctx.writer.lock().await;
    match writer_guard.as_mut() {
        Some(writer) => match writer.send(Message::Text(HEARTBEAT_PROBE.into())).await {
            Ok(()) => {
                debug!("heartbeat probe sent for task {}", ctx.task_id);
                true
            }
            Err(error) => {
                warn!("heartbeat probe failed for task {}: {}", ctx.task_id, error);
                false
            }
        },
        None => false,
    }
}

async fn apply_feed_message(ctx: &StreamContext, message: FeedMessage) {
    match message {
        FeedMessage::Connected { task_id, message } => {
            debug!(
                "log stream acknowledged for task {}",
                task_id.unwrap_or(ctx.task_id)
            );
            append_record(ctx, LogRecord::new(LogLevel::Info, message, Map::new())).await;
        }
        FeedMessage::Log {
            level,
            message,
            extra,
        } => {
            append_record(ctx, LogRecord::new(level, message, extra)).await;
        }
        FeedMessage::Pong => {}
    }
}

async fn append_record(ctx: &StreamContext, record: LogRecord) {
    ctx.surface.append_record(&record);
    let evicted = ctx.buffer.push(record).await;
    if evicted {
        ctx.surface.evict_oldest();
    }
    if !ctx.tracker.is_viewing_history() {
        ctx.surface.scroll_to_tail();
    }
}
