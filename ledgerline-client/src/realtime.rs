//! Realtime listener: pushes server events into the query cache.
//!
//! The listener keeps one WebSocket open for the lifetime of a session,
//! reconnecting with jittered exponential backoff. Every frame is decoded to a
//! [`RealtimeEvent`](ledgerline_events::RealtimeEvent) and its invalidation
//! tags are applied to the cache. A frame that cannot be decoded is logged and
//! skipped; it never stops the listener.

use crate::api_client::WsClient;
use crate::cache::QueryCache;
use crate::session::Session;
use futures_util::StreamExt;
use ledgerline_events::RealtimeFrame;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// Waiting out the backoff before the next connection attempt.
    Reconnecting,
}

#[derive(Clone)]
pub struct RealtimeListener {
    ws: WsClient,
    cache: QueryCache,
}

impl RealtimeListener {
    pub fn new(ws: WsClient, cache: QueryCache) -> Self {
        Self { ws, cache }
    }

    /// Start listening on behalf of `session`. Returns `None` without a
    /// session; the listener only runs while someone is logged in.
    pub fn attach(&self, session: Option<&Session>) -> Option<ListenerHandle> {
        let session = session?;
        self.ws.auth().set_token(session.token.as_str());

        let state = Arc::new(watch::Sender::new(ConnectionState::Disconnected));
        let task = tokio::spawn(run(self.ws.clone(), self.cache.clone(), Arc::clone(&state)));
        info!(user_id = %session.user.id, endpoint = %self.ws.endpoint(), "Realtime listener attached");
        Some(ListenerHandle { task, state })
    }
}

/// Owns the listener task. Dropping it detaches the listener.
pub struct ListenerHandle {
    task: JoinHandle<()>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl ListenerHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Stop the listener and close its connection.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
        self.state.send_replace(ConnectionState::Disconnected);
        debug!("Realtime listener detached");
    }
}

/// Decode one text frame and invalidate its tags. Returns the number of
/// refetches started; malformed frames start none.
pub fn apply_frame(cache: &QueryCache, text: &str) -> usize {
    let frame = match RealtimeFrame::parse(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(error = %err, "Skipping undecodable realtime frame");
            return 0;
        }
    };
    let event = frame.into_event();
    let tags = event.invalidation_tags();
    debug!(event_name = event.name(), tag_count = tags.len(), "Realtime event");
    cache.invalidate_tags(tags.as_slice())
}

async fn run(ws: WsClient, cache: QueryCache, state: Arc<watch::Sender<ConnectionState>>) {
    let reconnect = ws.reconnect_config().clone();
    let mut backoff = reconnect.initial_ms;
    loop {
        match ws.connect().await {
            Ok(mut stream) => {
                state.send_replace(ConnectionState::Connected);
                info!(endpoint = %ws.endpoint(), "Realtime connected");
                backoff = reconnect.initial_ms;

                while let Some(message) = stream.next().await {
                    match message {
                        Ok(Message::Text(text)) => {
                            apply_frame(&cache, &text);
                        }
                        Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                            Ok(text) => {
                                apply_frame(&cache, text);
                            }
                            Err(_) => warn!(len = bytes.len(), "Skipping non-UTF-8 binary frame"),
                        },
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(err) => {
                            warn!(error = %err, "Realtime stream error");
                            break;
                        }
                    }
                }
                info!("Realtime connection closed");
            }
            Err(err) => {
                warn!(error = %err, backoff_ms = backoff, "Realtime connection failed");
            }
        }

        state.send_replace(ConnectionState::Reconnecting);
        let delay = jittered_backoff(backoff, reconnect.jitter_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let next = (backoff as f64 * reconnect.multiplier) as u64;
        backoff = next.min(reconnect.max_ms);
    }
}

fn jittered_backoff(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_nanos(0))
        .subsec_nanos() as u64;
    base_ms.saturating_add(nanos % jitter_ms)
}
