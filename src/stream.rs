//! Live notification stream client.
//!
//! [`NotificationStreamClient`] keeps one logical connection to the
//! notification endpoint, fans every inbound [`NotificationRecord`] out to
//! its subscribers, and reconnects on its own when the server drops the
//! connection.
//!
//! # States
//!
//! ```text
//!                 connect()            open ok
//!  Disconnected ────────────▶ Connecting ───────▶ Connected
//!       ▲                         │                   │ closed by peer
//!       │ disconnect()            │ open failed       ▼
//!       └─────────────────────────┴─────────── Retrying { attempt }
//!                                                     │ attempt > max
//!                                                     ▼
//!                                                   GaveUp
//! ```
//!
//! # Reconnection
//!
//! Only a session that was established and then closed by the peer is
//! retried. Attempt `n` (starting at 1) waits `n × reconnect_delay` before
//! opening again. A successful open resets the counter. Once
//! `max_reconnect_attempts` attempts have failed the client settles in
//! [`ConnectionState::GaveUp`] until [`connect`](NotificationStreamClient::connect)
//! is called again. Errors during background attempts are logged, never
//! returned.
//!
//! A failed *initial* `connect()` is returned to the caller and not retried.
//!
//! [`disconnect`](NotificationStreamClient::disconnect) raises an
//! explicit-close flag. A retry timer that is already sleeping is not
//! cancelled; it checks the flag when it fires and stops there.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use doc_catalog_core::broadcast::{Broadcaster, Subscription};
use doc_catalog_core::toast::NotificationRecord;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

use crate::config::StreamConfig;

/// Inbound text frames of one session. The end of the stream is the end of
/// the session.
pub type MessageStream = BoxStream<'static, String>;

/// Opens sessions to the notification endpoint.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open(&self, url: &str) -> Result<MessageStream>;
}

/// [`StreamTransport`] over a WebSocket connection.
///
/// Text frames are passed through. Ping, pong and binary frames are ignored.
/// A close frame or a protocol error ends the session.
pub struct WebSocketTransport;

#[async_trait]
impl StreamTransport for WebSocketTransport {
    async fn open(&self, url: &str) -> Result<MessageStream> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        tracing::debug!(%url, "websocket handshake complete");

        let frames = stream::unfold(ws, |mut ws| async move {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => return Some((text.as_str().to_owned(), ws)),
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "websocket closed by peer");
                        return None;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::warn!("websocket error: {}", e);
                        return None;
                    }
                    None => return None,
                }
            }
        });
        Ok(frames.boxed())
    }
}

/// Connection state as observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting for, or performing, reconnection attempt `attempt`.
    Retrying { attempt: u32 },
    /// Every reconnection attempt failed.
    GaveUp,
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("connection to {url} was superseded by a newer connect or disconnect")]
    Superseded { url: String },
}

struct SessionState {
    connection: ConnectionState,
    attempt: u32,
    manually_closed: bool,
    /// Bumped by every `connect()` and `disconnect()`. A supervisor whose
    /// generation is no longer current must stop.
    generation: u64,
    close_tx: Option<oneshot::Sender<()>>,
}

struct Inner {
    url: String,
    base_delay: Duration,
    max_attempts: u32,
    transport: Arc<dyn StreamTransport>,
    handlers: Broadcaster<NotificationRecord>,
    state: Mutex<SessionState>,
}

/// Reconnecting client for the notification stream.
///
/// Dropping the client disconnects it.
pub struct NotificationStreamClient {
    inner: Arc<Inner>,
}

impl NotificationStreamClient {
    pub fn new(config: &StreamConfig, transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                url: config.url.clone(),
                base_delay: config.reconnect_delay(),
                max_attempts: config.max_reconnect_attempts,
                transport,
                handlers: Broadcaster::new("notifications"),
                state: Mutex::new(SessionState {
                    connection: ConnectionState::Disconnected,
                    attempt: 0,
                    manually_closed: false,
                    generation: 0,
                    close_tx: None,
                }),
            }),
        }
    }

    /// Client speaking WebSocket to `config.url`.
    pub fn websocket(config: &StreamConfig) -> Self {
        Self::new(config, Arc::new(WebSocketTransport))
    }

    /// Open the connection. Replaces any session that is still running.
    pub async fn connect(&self) -> Result<(), StreamError> {
        let inner = &self.inner;
        let generation = {
            let mut s = inner.lock();
            s.manually_closed = false;
            s.generation += 1;
            if let Some(tx) = s.close_tx.take() {
                let _ = tx.send(());
            }
            s.connection = ConnectionState::Connecting;
            s.generation
        };
        tracing::info!(url = %inner.url, "connecting to notification stream");

        match inner.transport.open(&inner.url).await {
            Ok(stream) => match inner.install_session(generation) {
                Some(close_rx) => {
                    tracing::info!(url = %inner.url, "notification stream connected");
                    tokio::spawn(supervise(inner.clone(), generation, stream, close_rx));
                    Ok(())
                }
                None => Err(StreamError::Superseded {
                    url: inner.url.clone(),
                }),
            },
            Err(e) => {
                {
                    let mut s = inner.lock();
                    if s.generation == generation {
                        s.connection = ConnectionState::Disconnected;
                    }
                }
                tracing::error!(url = %inner.url, "notification stream connection failed: {:#}", e);
                Err(StreamError::Connect {
                    url: inner.url.clone(),
                    reason: format!("{:#}", e),
                })
            }
        }
    }

    /// Close the connection and suppress any pending reconnection.
    pub fn disconnect(&self) {
        let mut s = self.inner.lock();
        s.manually_closed = true;
        s.generation += 1;
        if let Some(tx) = s.close_tx.take() {
            let _ = tx.send(());
        }
        if s.connection != ConnectionState::Disconnected {
            tracing::info!(url = %self.inner.url, "notification stream disconnected");
        }
        s.connection = ConnectionState::Disconnected;
    }

    /// Register a handler for inbound notifications.
    ///
    /// Handlers run in registration order. One failing (or panicking)
    /// handler does not stop the others.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(NotificationRecord) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.handlers.subscribe(move |records| {
            for record in records {
                handler(record)?;
            }
            Ok(())
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().connection
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Number of consecutive failed reconnection attempts so far.
    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.lock().attempt
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.listener_count()
    }
}

impl Drop for NotificationStreamClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stale(&self, generation: u64) -> bool {
        let s = self.lock();
        s.generation != generation || s.manually_closed
    }

    /// Mark a freshly opened session as live. Returns `None` when the
    /// session was superseded while it was being opened.
    fn install_session(&self, generation: u64) -> Option<oneshot::Receiver<()>> {
        let mut s = self.lock();
        if s.generation != generation || s.manually_closed {
            return None;
        }
        let (close_tx, close_rx) = oneshot::channel();
        s.connection = ConnectionState::Connected;
        s.attempt = 0;
        s.close_tx = Some(close_tx);
        Some(close_rx)
    }

    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<NotificationRecord>(text) {
            Ok(record) => {
                tracing::debug!(document_id = %record.document_id, "notification received");
                self.handlers.publish(&[record]);
            }
            Err(e) => tracing::warn!("ignoring malformed notification: {}", e),
        }
    }

    /// Deliver messages until the peer closes (`false`) or a close is
    /// requested locally (`true`).
    async fn pump(&self, stream: &mut MessageStream, close_rx: &mut oneshot::Receiver<()>) -> bool {
        loop {
            tokio::select! {
                _ = &mut *close_rx => return true,
                next = stream.next() => match next {
                    Some(text) => self.dispatch(&text),
                    None => return false,
                },
            }
        }
    }

    /// Linear-backoff reconnection. Returns the new session, or `None` when
    /// the client gave up or was told to stop.
    async fn reconnect(&self, generation: u64) -> Option<(MessageStream, oneshot::Receiver<()>)> {
        loop {
            let attempt = {
                let mut s = self.lock();
                if s.generation != generation || s.manually_closed {
                    return None;
                }
                if s.attempt >= self.max_attempts {
                    s.connection = ConnectionState::GaveUp;
                    tracing::warn!(
                        url = %self.url,
                        attempts = s.attempt,
                        "giving up on notification stream"
                    );
                    return None;
                }
                s.attempt += 1;
                s.connection = ConnectionState::Retrying { attempt: s.attempt };
                s.attempt
            };

            let delay = self.base_delay * attempt;
            tracing::info!(attempt, ?delay, "scheduling notification stream reconnect");
            tokio::time::sleep(delay).await;

            if self.is_stale(generation) {
                tracing::debug!(attempt, "reconnect cancelled");
                return None;
            }

            match self.transport.open(&self.url).await {
                Ok(stream) => {
                    let close_rx = self.install_session(generation)?;
                    tracing::info!(attempt, "notification stream reconnected");
                    return Some((stream, close_rx));
                }
                Err(e) => tracing::warn!(attempt, "reconnection failed: {:#}", e),
            }
        }
    }
}

/// Owns the live session: pumps messages, and on an unexpected close runs
/// the reconnection loop and carries on with the new session.
async fn supervise(
    inner: Arc<Inner>,
    generation: u64,
    mut stream: MessageStream,
    mut close_rx: oneshot::Receiver<()>,
) {
    loop {
        if inner.pump(&mut stream, &mut close_rx).await {
            tracing::debug!("session closed locally");
            return;
        }

        {
            let mut s = inner.lock();
            if s.generation != generation || s.manually_closed {
                return;
            }
            s.connection = ConnectionState::Disconnected;
            s.close_tx = None;
        }
        tracing::warn!(url = %inner.url, "notification stream closed unexpectedly");

        match inner.reconnect(generation).await {
            Some((next_stream, next_close_rx)) => {
                stream = next_stream;
                close_rx = next_close_rx;
            }
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    enum Outcome {
        Accept(mpsc::UnboundedReceiver<String>),
        Refuse,
    }

    /// Transport that plays back a fixed sequence of open results and
    /// refuses once the script runs out.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Outcome>>,
        opens: AtomicUsize,
        opened_at: Mutex<Vec<tokio::time::Instant>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Outcome>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                opens: AtomicUsize::new(0),
                opened_at: Mutex::new(Vec::new()),
            })
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        /// Time elapsed before each open after the first.
        fn gaps(&self) -> Vec<Duration> {
            let opened_at = self.opened_at.lock().unwrap();
            opened_at.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    #[async_trait]
    impl StreamTransport for ScriptedTransport {
        async fn open(&self, _url: &str) -> Result<MessageStream> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.opened_at.lock().unwrap().push(tokio::time::Instant::now());
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Outcome::Accept(rx)) => Ok(stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|m| (m, rx))
                })
                .boxed()),
                Some(Outcome::Refuse) | None => anyhow::bail!("connection refused"),
            }
        }
    }

    fn session() -> (mpsc::UnboundedSender<String>, Outcome) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Outcome::Accept(rx))
    }

    fn config(delay_ms: u64) -> StreamConfig {
        StreamConfig {
            enabled: true,
            url: "ws://test/notifications".to_string(),
            reconnect_delay_ms: delay_ms,
            max_reconnect_attempts: 5,
        }
    }

    async fn wait_for(client: &NotificationStreamClient, pred: impl Fn(ConnectionState) -> bool) {
        for _ in 0..300 {
            if pred(client.state()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting; state = {:?}", client.state());
    }

    fn notification(title: &str) -> String {
        format!(
            r#"{{"Timestamp":"2024-01-01T00:00:00Z","UserId":"u1","UserName":"Ada","DocumentID":"d1","DocumentTitle":"{}"}}"#,
            title
        )
    }

    #[tokio::test]
    async fn test_initial_connect_failure_is_returned_and_not_retried() {
        let transport = ScriptedTransport::new(vec![Outcome::Refuse]);
        let client = NotificationStreamClient::new(&config(5), transport.clone());

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, StreamError::Connect { .. }));
        assert_eq!(client.state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.opens(), 1);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_messages_fan_out_in_order_with_isolation() {
        let (tx, accept) = session();
        let transport = ScriptedTransport::new(vec![accept]);
        let client = NotificationStreamClient::new(&config(5), transport);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let _failing = client.subscribe(|_| anyhow::bail!("handler broke"));
        let sink = seen.clone();
        let _recording = client.subscribe(move |record| {
            sink.lock().unwrap().push(record.document_title);
            Ok(())
        });

        client.connect().await.unwrap();
        assert!(client.is_connected());

        tx.send(notification("First")).unwrap();
        tx.send("{ not json".to_string()).unwrap();
        tx.send(notification("Second")).unwrap();

        for _ in 0..100 {
            if seen.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*seen.lock().unwrap(), vec!["First", "Second"]);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_gives_up_after_five_failed_reconnects() {
        let (tx, accept) = session();
        let mut script = vec![accept];
        script.extend((0..10).map(|_| Outcome::Refuse));
        let transport = ScriptedTransport::new(script);
        let client = NotificationStreamClient::new(&config(5), transport.clone());

        client.connect().await.unwrap();
        drop(tx);

        wait_for(&client, |s| s == ConnectionState::GaveUp).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(transport.opens(), 1 + 5);
        assert_eq!(client.reconnect_attempt(), 5);
        assert_eq!(client.state(), ConnectionState::GaveUp);
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_delay_grows_linearly() {
        let (tx, accept) = session();
        let mut script = vec![accept];
        script.extend((0..5).map(|_| Outcome::Refuse));
        let transport = ScriptedTransport::new(script);
        let client = NotificationStreamClient::new(&config(100), transport.clone());

        client.connect().await.unwrap();
        drop(tx);
        wait_for(&client, |s| s == ConnectionState::GaveUp).await;

        let gaps = transport.gaps();
        assert_eq!(gaps.len(), 5);
        for (i, gap) in gaps.iter().enumerate() {
            let expected = Duration::from_millis(100 * (i as u64 + 1));
            assert!(
                *gap >= expected && *gap < expected + Duration::from_millis(5),
                "retry {} waited {:?}, expected {:?}",
                i + 1,
                gap,
                expected
            );
        }
    }

    #[tokio::test]
    async fn test_reconnect_success_resets_attempts() {
        let (tx1, first) = session();
        let (tx2, second) = session();
        let transport = ScriptedTransport::new(vec![first, Outcome::Refuse, second]);
        let client = NotificationStreamClient::new(&config(5), transport.clone());

        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let _sub = client.subscribe(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        client.connect().await.unwrap();
        drop(tx1);

        wait_for(&client, |s| s == ConnectionState::Retrying { attempt: 2 }).await;
        wait_for(&client, |s| s == ConnectionState::Connected).await;
        assert_eq!(client.reconnect_attempt(), 0);
        assert_eq!(transport.opens(), 3);

        tx2.send(notification("After reconnect")).unwrap();
        for _ in 0..100 {
            if seen.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnect_prevents_reconnect() {
        let (tx, accept) = session();
        let transport = ScriptedTransport::new(vec![accept]);
        let client = NotificationStreamClient::new(&config(5), transport.clone());

        client.connect().await.unwrap();
        client.disconnect();
        drop(tx);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(transport.opens(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_during_backoff_stops_pending_retry() {
        let (tx, accept) = session();
        let transport = ScriptedTransport::new(vec![accept]);
        let client = NotificationStreamClient::new(&config(80), transport.clone());

        client.connect().await.unwrap();
        drop(tx);
        wait_for(&client, |s| matches!(s, ConnectionState::Retrying { attempt: 1 })).await;

        client.disconnect();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(transport.opens(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_after_giving_up() {
        let (tx, first) = session();
        let (_tx2, second) = session();
        let mut script = vec![first];
        script.extend((0..5).map(|_| Outcome::Refuse));
        script.push(second);
        let transport = ScriptedTransport::new(script);
        let client = NotificationStreamClient::new(&config(2), transport.clone());

        client.connect().await.unwrap();
        drop(tx);
        wait_for(&client, |s| s == ConnectionState::GaveUp).await;

        client.connect().await.unwrap();
        assert!(client.is_connected());
        assert_eq!(client.reconnect_attempt(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribed_handler_stops_receiving() {
        let (tx, accept) = session();
        let transport = ScriptedTransport::new(vec![accept]);
        let client = NotificationStreamClient::new(&config(5), transport);

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let mut sub = client.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(client.handler_count(), 1);
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(client.handler_count(), 0);

        client.connect().await.unwrap();
        tx.send(notification("Ignored")).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
