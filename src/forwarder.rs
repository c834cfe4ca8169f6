//! Forwarders - drain a [`QueueAdapter`] into an external sender.
//!
//! For embedding the bridge in an existing server: the engine emits into a
//! queue, a forwarder task pulls events out, reshapes them and hands them to
//! whatever delivers them (a WebSocket handler, an HTTP push, a log).
//!
//! Both loops wait on the queue with a timeout so a stop request is observed
//! promptly; the batching variant flushes its partial batch before exiting.
//! A transform or sender that errors or panics is logged and that event (or
//! batch) is skipped; the loop keeps going.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::adapters::{QueueAdapter, UiAdapter};
use crate::bridge::recovery::panic_message;
use crate::schema::UiEvent;
use crate::types::{ForwarderConfig, Result};

/// Reshapes an event's wire form before it is sent.
pub type ForwardTransform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Destination of forwarded events, given their JSON wire form.
#[async_trait]
pub trait EventSender: Send + Sync {
    async fn send(&self, event: Value) -> Result<()>;

    /// Sequential `send` unless overridden.
    async fn send_batch(&self, events: Vec<Value>) -> Result<()> {
        for event in events {
            self.send(event).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<F, Fut> EventSender for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn send(&self, event: Value) -> Result<()> {
        self(event).await
    }
}

/// State shared by both forwarder flavours.
struct Pipe {
    adapter: Arc<QueueAdapter>,
    sender: Arc<dyn EventSender>,
    transform: Option<ForwardTransform>,
    cancel: CancellationToken,
    running: AtomicBool,
}

impl Pipe {
    fn new(adapter: Arc<QueueAdapter>, sender: Arc<dyn EventSender>) -> Self {
        Self {
            adapter,
            sender,
            transform: None,
            cancel: CancellationToken::new(),
            running: AtomicBool::new(false),
        }
    }

    fn shape(&self, event: &UiEvent) -> Option<Value> {
        let value = match event.to_value() {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(event_type = %event.event_type, error = %err, "Failed to encode event");
                return None;
            }
        };
        let Some(transform) = &self.transform else {
            return Some(value);
        };
        match std::panic::catch_unwind(AssertUnwindSafe(|| transform(value))) {
            Ok(shaped) => Some(shaped),
            Err(payload) => {
                tracing::error!(
                    event_type = %event.event_type,
                    panic = %panic_message(payload.as_ref()),
                    "Forward transform panicked, skipping event"
                );
                None
            }
        }
    }

    /// Run one sender future, logging an error or panic.
    async fn deliver<F>(&self, who: &'static str, count: usize, send: F)
    where
        F: Future<Output = Result<()>>,
    {
        match AssertUnwindSafe(send).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(forwarder = who, count, error = %err, "Forward send failed");
            }
            Err(payload) => {
                tracing::error!(
                    forwarder = who,
                    count,
                    panic = %panic_message(payload.as_ref()),
                    "Forward sender panicked"
                );
            }
        }
    }

    /// Mark the pipe running until the returned guard drops.
    fn mark_running(&self) -> RunningGuard<'_> {
        self.running.store(true, Ordering::SeqCst);
        RunningGuard(&self.running)
    }

    /// Next event, or `Err(())` once the queue can never produce again.
    async fn poll(&self, wait: Duration) -> std::result::Result<Option<UiEvent>, ()> {
        match tokio::time::timeout(wait, self.adapter.next_event()).await {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => Err(()),
            Err(_elapsed) => Ok(None),
        }
    }
}

/// Clears the running flag however the loop exits.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("adapter", &self.adapter.name())
            .field("has_transform", &self.transform.is_some())
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Forwards events one at a time.
#[derive(Debug)]
pub struct EventForwarder {
    pipe: Pipe,
    poll_interval: Duration,
}

impl EventForwarder {
    pub fn new(adapter: Arc<QueueAdapter>, sender: Arc<dyn EventSender>) -> Self {
        Self {
            pipe: Pipe::new(adapter, sender),
            poll_interval: ForwarderConfig::default().poll_interval,
        }
    }

    pub fn with_transform(mut self, transform: ForwardTransform) -> Self {
        self.pipe.transform = Some(transform);
        self
    }

    pub fn with_config(mut self, config: &ForwarderConfig) -> Self {
        self.poll_interval = config.poll_interval;
        self
    }

    /// Consume and forward until [`stop`](Self::stop) is called.
    pub async fn run(&self) {
        let running = self.pipe.mark_running();
        tracing::debug!("EventForwarder started");

        loop {
            tokio::select! {
                biased;
                _ = self.pipe.cancel.cancelled() => break,
                polled = self.pipe.poll(self.poll_interval) => match polled {
                    Ok(Some(event)) => {
                        let Some(value) = self.pipe.shape(&event) else { continue };
                        self.pipe
                            .deliver("EventForwarder", 1, self.pipe.sender.send(value))
                            .await;
                    }
                    Ok(None) => continue,
                    Err(()) => break,
                },
            }
        }

        drop(running);
        tracing::debug!("EventForwarder stopped");
    }

    /// Signal the loop to exit. A stopped forwarder cannot be restarted.
    pub fn stop(&self) {
        self.pipe.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.pipe.running.load(Ordering::SeqCst)
    }
}

/// Forwards events in batches of up to `batch_size`, waiting at most
/// `batch_timeout` after the first event of a batch.
#[derive(Debug)]
pub struct BatchEventForwarder {
    pipe: Pipe,
    poll_interval: Duration,
    batch_size: usize,
    batch_timeout: Duration,
}

impl BatchEventForwarder {
    pub fn new(adapter: Arc<QueueAdapter>, sender: Arc<dyn EventSender>) -> Self {
        Self::new_with_config(adapter, sender, &ForwarderConfig::default())
    }

    pub fn new_with_config(
        adapter: Arc<QueueAdapter>,
        sender: Arc<dyn EventSender>,
        config: &ForwarderConfig,
    ) -> Self {
        Self {
            pipe: Pipe::new(adapter, sender),
            poll_interval: config.poll_interval,
            batch_size: config.batch_size.max(1),
            batch_timeout: config.batch_timeout,
        }
    }

    pub fn with_transform(mut self, transform: ForwardTransform) -> Self {
        self.pipe.transform = Some(transform);
        self
    }

    /// Consume and forward until [`stop`](Self::stop) is called, then flush.
    pub async fn run(&self) {
        let running = self.pipe.mark_running();
        tracing::debug!(batch_size = self.batch_size, "BatchEventForwarder started");

        let mut batch: Vec<Value> = Vec::with_capacity(self.batch_size);
        let mut started: Option<Instant> = None;

        loop {
            if started.is_some_and(|s| s.elapsed() >= self.batch_timeout) {
                self.flush(&mut batch).await;
                started = None;
            }
            let wait = match started {
                Some(s) => self.batch_timeout.saturating_sub(s.elapsed()),
                None => self.poll_interval,
            };

            tokio::select! {
                biased;
                _ = self.pipe.cancel.cancelled() => break,
                polled = self.pipe.poll(wait) => match polled {
                    Ok(Some(event)) => {
                        let Some(value) = self.pipe.shape(&event) else { continue };
                        if batch.is_empty() {
                            started = Some(Instant::now());
                        }
                        batch.push(value);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                            started = None;
                        }
                    }
                    Ok(None) => {
                        if !batch.is_empty() {
                            self.flush(&mut batch).await;
                            started = None;
                        }
                    }
                    Err(()) => break,
                },
            }
        }

        self.flush(&mut batch).await;
        drop(running);
        tracing::debug!("BatchEventForwarder stopped");
    }

    async fn flush(&self, batch: &mut Vec<Value>) {
        if batch.is_empty() {
            return;
        }
        let events = std::mem::take(batch);
        let count = events.len();
        self.pipe
            .deliver("BatchEventForwarder", count, self.pipe.sender.send_batch(events))
            .await;
    }

    pub fn stop(&self) {
        self.pipe.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.pipe.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Error;
    use serde_json::json;
    use std::sync::Mutex;

    type Sink = Arc<Mutex<Vec<Value>>>;

    fn collecting_sender() -> (Arc<dyn EventSender>, Sink) {
        let sink: Sink = Arc::new(Mutex::new(Vec::new()));
        let target = sink.clone();
        let sender = move |event: Value| {
            let target = target.clone();
            async move {
                target.lock().unwrap().push(event);
                Ok::<(), Error>(())
            }
        };
        (Arc::new(sender), sink)
    }

    /// Records each batch as one array value.
    struct BatchRecorder(Sink);

    #[async_trait]
    impl EventSender for BatchRecorder {
        async fn send(&self, event: Value) -> Result<()> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }

        async fn send_batch(&self, events: Vec<Value>) -> Result<()> {
            self.0.lock().unwrap().push(Value::Array(events));
            Ok(())
        }
    }

    async fn wait_until(sink: &Sink, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while sink.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_forwards_with_transform() {
        let adapter = Arc::new(QueueAdapter::new("fwd", 10));
        let (sender, sink) = collecting_sender();
        let forwarder = Arc::new(
            EventForwarder::new(adapter.clone(), sender).with_transform(Arc::new(|mut v: Value| {
                v["conversationId"] = json!("conv-1");
                v
            })),
        );

        let task = tokio::spawn({
            let forwarder = forwarder.clone();
            async move { forwarder.run().await }
        });

        adapter.emit(&UiEvent::new("tool_start", json!({"tool_name": "bash"}))).await;
        wait_until(&sink, 1).await;
        assert!(forwarder.is_running());

        forwarder.stop();
        task.await.unwrap();
        assert!(!forwarder.is_running());

        let sent = sink.lock().unwrap().clone();
        assert_eq!(sent[0]["type"], "tool_start");
        assert_eq!(sent[0]["conversationId"], "conv-1");
    }

    #[tokio::test]
    async fn test_sender_errors_do_not_stop_loop() {
        let adapter = Arc::new(QueueAdapter::new("fwd", 10));
        let sink: Sink = Arc::new(Mutex::new(Vec::new()));
        let target = sink.clone();
        let sender = move |event: Value| {
            let target = target.clone();
            async move {
                target.lock().unwrap().push(event.clone());
                if event["type"] == "bad" {
                    return Err(Error::transport("peer gone"));
                }
                Ok(())
            }
        };
        let forwarder = Arc::new(EventForwarder::new(adapter.clone(), Arc::new(sender)));
        let task = tokio::spawn({
            let forwarder = forwarder.clone();
            async move { forwarder.run().await }
        });

        adapter.emit(&UiEvent::new("bad", json!({}))).await;
        adapter.emit(&UiEvent::new("good", json!({}))).await;
        wait_until(&sink, 2).await;

        forwarder.stop();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_transform_skips_event() {
        let adapter = Arc::new(QueueAdapter::new("fwd", 10));
        let (sender, sink) = collecting_sender();
        let forwarder = Arc::new(EventForwarder::new(adapter.clone(), sender).with_transform(
            Arc::new(|v: Value| {
                if v["type"] == "bad" {
                    panic!("transform blew up");
                }
                v
            }),
        ));
        let task = tokio::spawn({
            let forwarder = forwarder.clone();
            async move { forwarder.run().await }
        });

        adapter.emit(&UiEvent::new("bad", json!({}))).await;
        adapter.emit(&UiEvent::new("good", json!({}))).await;
        wait_until(&sink, 1).await;
        assert!(forwarder.is_running());

        forwarder.stop();
        task.await.unwrap();
        assert!(!forwarder.is_running());

        let sent = sink.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["type"], "good");
    }

    /// Panics on any batch holding a "bad" event.
    struct PanickingBatchSender(Sink);

    #[async_trait]
    impl EventSender for PanickingBatchSender {
        async fn send(&self, event: Value) -> Result<()> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }

        async fn send_batch(&self, events: Vec<Value>) -> Result<()> {
            if events.iter().any(|e| e["type"] == "bad") {
                panic!("sender blew up");
            }
            self.0.lock().unwrap().push(Value::Array(events));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_panicking_sender_skips_batch() {
        let adapter = Arc::new(QueueAdapter::new("batch", 100));
        let sink: Sink = Arc::new(Mutex::new(Vec::new()));
        let config = ForwarderConfig {
            batch_size: 1,
            ..ForwarderConfig::default()
        };
        let forwarder = Arc::new(BatchEventForwarder::new_with_config(
            adapter.clone(),
            Arc::new(PanickingBatchSender(sink.clone())),
            &config,
        ));
        let task = tokio::spawn({
            let forwarder = forwarder.clone();
            async move { forwarder.run().await }
        });

        adapter.emit(&UiEvent::new("bad", json!({}))).await;
        adapter.emit(&UiEvent::new("good", json!({}))).await;
        wait_until(&sink, 1).await;

        forwarder.stop();
        task.await.unwrap();
        assert!(!forwarder.is_running());

        let batches = sink.lock().unwrap().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0]["type"], "good");
    }

    #[tokio::test]
    async fn test_batches_by_size() {
        let adapter = Arc::new(QueueAdapter::new("batch", 100));
        let sink: Sink = Arc::new(Mutex::new(Vec::new()));
        let config = ForwarderConfig {
            batch_size: 3,
            batch_timeout: Duration::from_secs(60),
            ..ForwarderConfig::default()
        };
        let forwarder = Arc::new(BatchEventForwarder::new_with_config(
            adapter.clone(),
            Arc::new(BatchRecorder(sink.clone())),
            &config,
        ));

        for i in 0..3 {
            adapter.emit(&UiEvent::new("x", json!({"i": i}))).await;
        }
        let task = tokio::spawn({
            let forwarder = forwarder.clone();
            async move { forwarder.run().await }
        });

        wait_until(&sink, 1).await;
        forwarder.stop();
        task.await.unwrap();

        let batches = sink.lock().unwrap().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_partial_batch_sent_after_timeout() {
        let adapter = Arc::new(QueueAdapter::new("batch", 100));
        let sink: Sink = Arc::new(Mutex::new(Vec::new()));
        let config = ForwarderConfig {
            batch_size: 10,
            batch_timeout: Duration::from_millis(20),
            ..ForwarderConfig::default()
        };
        let forwarder = Arc::new(BatchEventForwarder::new_with_config(
            adapter.clone(),
            Arc::new(BatchRecorder(sink.clone())),
            &config,
        ));
        let task = tokio::spawn({
            let forwarder = forwarder.clone();
            async move { forwarder.run().await }
        });

        adapter.emit(&UiEvent::new("a", json!({}))).await;
        adapter.emit(&UiEvent::new("b", json!({}))).await;
        wait_until(&sink, 1).await;

        forwarder.stop();
        task.await.unwrap();
        let total: usize = sink
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.as_array().map_or(0, Vec::len))
            .sum();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_stop_flushes_partial_batch() {
        let adapter = Arc::new(QueueAdapter::new("batch", 100));
        let sink: Sink = Arc::new(Mutex::new(Vec::new()));
        let config = ForwarderConfig {
            batch_size: 10,
            batch_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(10),
        };
        let forwarder = Arc::new(BatchEventForwarder::new_with_config(
            adapter.clone(),
            Arc::new(BatchRecorder(sink.clone())),
            &config,
        ));
        let task = tokio::spawn({
            let forwarder = forwarder.clone();
            async move { forwarder.run().await }
        });

        adapter.emit(&UiEvent::new("only", json!({}))).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while !adapter.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(sink.lock().unwrap().is_empty());

        forwarder.stop();
        task.await.unwrap();

        let batches = sink.lock().unwrap().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0]["type"], "only");
    }
}
