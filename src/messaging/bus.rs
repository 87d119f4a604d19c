//! In-process publish/subscribe bus with request/reply.
//!
//! # Responsibilities
//! - Deliver requests published on a topic to one registered responder
//! - Correlate replies through unique `_INBOX.<uuid>` subjects
//! - Bound every request by a timeout
//!
//! # Design Decisions
//! - Responders on the same topic form a queue group: each request goes to
//!   exactly one of them, round-robin
//! - Pending replies live in a `DashMap` keyed by inbox; the entry is removed
//!   by a guard on reply, timeout or when the waiting future is dropped
//! - A reply carrying an `error-code` header is surfaced as a remote error
//! - Responder tasks hold the bus weakly; dropping the last `MessageBus`
//!   closes their queues and ends them

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::messaging::transport::{Message, MessageHeaders, Transport, TransportError};

/// Prefix of reply subjects.
pub const INBOX_PREFIX: &str = "_INBOX.";

/// Reply header naming a remote failure code.
pub const ERROR_CODE_HEADER: &str = "error-code";
/// Reply header describing a remote failure.
pub const ERROR_MESSAGE_HEADER: &str = "error-message";

const RESPONDER_QUEUE_DEPTH: usize = 256;

struct Delivery {
    message: Message,
    reply_to: Option<String>,
}

/// Waiters for in-flight requests, keyed by inbox subject.
#[derive(Default)]
pub struct PendingReplies {
    waiters: DashMap<String, oneshot::Sender<Message>>,
}

impl PendingReplies {
    fn register(self: &Arc<Self>, inbox: String) -> (PendingGuard, oneshot::Receiver<Message>) {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(inbox.clone(), tx);
        let guard = PendingGuard {
            pending: Arc::clone(self),
            inbox,
        };
        (guard, rx)
    }

    /// Hand `message` to the waiter on `inbox`. Late replies are dropped.
    fn complete(&self, inbox: &str, message: Message) -> bool {
        match self.waiters.remove(inbox) {
            Some((_, tx)) => tx.send(message).is_ok(),
            None => {
                tracing::debug!(inbox = %inbox, "Discarding reply for unknown or expired request");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

struct PendingGuard {
    pending: Arc<PendingReplies>,
    inbox: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.waiters.remove(&self.inbox);
    }
}

struct Subscribers {
    senders: Vec<mpsc::Sender<Delivery>>,
    next: AtomicUsize,
}

#[derive(Default)]
struct BusInner {
    subscriptions: DashMap<String, Subscribers>,
    pending: Arc<PendingReplies>,
}

/// Cloneable handle to a shared in-process bus.
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

/// A registered responder. Dropping it leaves the responder running.
pub struct Responder {
    topic: String,
    task: JoinHandle<()>,
}

impl Responder {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Stop serving; queued requests are abandoned.
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve requests published on `topic` with `handler`.
    ///
    /// Each request is handled on its own task; the returned message is sent
    /// back on the request's reply subject.
    pub fn respond<F, Fut>(&self, topic: &str, handler: F) -> Responder
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Message> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Delivery>(RESPONDER_QUEUE_DEPTH);
        self.inner
            .subscriptions
            .entry(topic.to_string())
            .or_insert_with(|| Subscribers {
                senders: Vec::new(),
                next: AtomicUsize::new(0),
            })
            .senders
            .push(tx);

        let handler = Arc::new(handler);
        let inner = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                let handler = Arc::clone(&handler);
                let inner = Weak::clone(&inner);
                tokio::spawn(async move {
                    let reply = (*handler)(delivery.message).await;
                    let Some(reply_to) = delivery.reply_to else { return };
                    match inner.upgrade() {
                        Some(inner) => {
                            MessageBus { inner }.deliver(&reply_to, reply, None);
                        }
                        None => tracing::debug!(inbox = %reply_to, "Bus dropped before reply"),
                    }
                });
            }
        });

        tracing::debug!(topic = %topic, "Responder registered");
        Responder {
            topic: topic.to_string(),
            task,
        }
    }

    /// Fire-and-forget publish. Returns whether anybody received it.
    pub fn publish(&self, topic: &str, message: Message) -> bool {
        self.deliver(topic, message, None)
    }

    /// Number of live responders on `topic`.
    pub fn responders(&self, topic: &str) -> usize {
        self.inner
            .subscriptions
            .get(topic)
            .map(|subs| subs.senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    /// Requests currently waiting for a reply.
    pub fn pending(&self) -> &PendingReplies {
        &self.inner.pending
    }

    fn deliver(&self, topic: &str, message: Message, reply_to: Option<String>) -> bool {
        if topic.starts_with(INBOX_PREFIX) {
            return self.inner.pending.complete(topic, message);
        }

        let Some(mut subs) = self.inner.subscriptions.get_mut(topic) else {
            return false;
        };
        subs.senders.retain(|s| !s.is_closed());
        if subs.senders.is_empty() {
            return false;
        }

        let mut delivery = Delivery { message, reply_to };
        for _ in 0..subs.senders.len() {
            let index = subs.next.fetch_add(1, Ordering::Relaxed) % subs.senders.len();
            match subs.senders[index].try_send(delivery) {
                Ok(()) => return true,
                Err(mpsc::error::TrySendError::Full(returned))
                | Err(mpsc::error::TrySendError::Closed(returned)) => {
                    delivery = returned;
                }
            }
        }
        tracing::warn!(topic = %topic, "All responders are saturated");
        false
    }

    async fn request_inner(
        &self,
        topic: &str,
        payload: String,
        timeout: Duration,
        headers: MessageHeaders,
    ) -> Result<Message, TransportError> {
        let inbox = format!("{}{}", INBOX_PREFIX, Uuid::new_v4().simple());
        let (_guard, rx) = self.inner.pending.register(inbox.clone());

        let message = Message { payload, headers };
        if !self.deliver(topic, message, Some(inbox)) {
            return Err(TransportError::NoResponders {
                topic: topic.to_string(),
            });
        }

        let reply = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(TransportError::Closed),
            Err(_) => {
                return Err(TransportError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };

        match remote_failure(&reply) {
            Some(e) => Err(e),
            None => Ok(reply),
        }
    }
}

/// The remote error a reply reports through its `error-code` header, if any.
pub(crate) fn remote_failure(reply: &Message) -> Option<TransportError> {
    let code = reply.header(ERROR_CODE_HEADER)?;
    Some(TransportError::Remote {
        code: code.to_string(),
        message: reply
            .header(ERROR_MESSAGE_HEADER)
            .unwrap_or_default()
            .to_string(),
    })
}

impl Transport for MessageBus {
    fn request<'a>(
        &'a self,
        topic: &'a str,
        payload: String,
        timeout: Duration,
        headers: MessageHeaders,
    ) -> BoxFuture<'a, Result<Message, TransportError>> {
        self.request_inner(topic, payload, timeout, headers).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn test_request_reply() {
        let bus = MessageBus::new();
        let _responder = bus.respond("api.echo", |msg: Message| async move {
            Message::new(format!("echo:{}", msg.payload))
                .with_header("content-type", msg.header("content-type").unwrap_or_default())
        });

        let mut headers = MessageHeaders::new();
        headers.insert("content-type".into(), "text/plain".into());
        let reply = bus
            .request("api.echo", "hi".into(), TIMEOUT, headers)
            .await
            .unwrap();
        assert_eq!(reply.payload, "echo:hi");
        assert_eq!(reply.header("content-type"), Some("text/plain"));
        assert!(bus.pending().is_empty());
    }

    #[tokio::test]
    async fn test_no_responders() {
        let bus = MessageBus::new();
        let err = bus
            .request("api.nobody", "{}".into(), TIMEOUT, MessageHeaders::new())
            .await
            .unwrap_err();
        assert!(err.is_service_unavailable());
        assert!(bus.pending().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_releases_pending_entry() {
        let bus = MessageBus::new();
        let _responder = bus.respond("api.slow", |_msg: Message| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Message::new("late")
        });

        let err = bus
            .request("api.slow", "{}".into(), Duration::from_millis(50), MessageHeaders::new())
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout { timeout_ms: 50 });
        assert!(bus.pending().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_request_releases_pending_entry() {
        let bus = MessageBus::new();
        let _responder = bus.respond("api.slow", |_msg: Message| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Message::new("late")
        });

        let request = bus.request("api.slow", "{}".into(), TIMEOUT, MessageHeaders::new());
        let _ = tokio::time::timeout(Duration::from_millis(20), request).await;
        assert!(bus.pending().is_empty());
    }

    #[tokio::test]
    async fn test_remote_error_header() {
        let bus = MessageBus::new();
        let _responder = bus.respond("api.broken", |_msg: Message| async move {
            Message::new("")
                .with_header(ERROR_CODE_HEADER, "503")
                .with_header(ERROR_MESSAGE_HEADER, "draining")
        });

        let err = bus
            .request("api.broken", "{}".into(), TIMEOUT, MessageHeaders::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::Remote {
                code: "503".into(),
                message: "draining".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unsubscribed_responder_stops_receiving() {
        let bus = MessageBus::new();
        let responder = bus.respond("api.once", |_msg: Message| async move { Message::new("ok") });
        assert_eq!(bus.responders("api.once"), 1);
        assert_eq!(responder.topic(), "api.once");

        responder.unsubscribe();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(bus.responders("api.once"), 0);

        let err = bus
            .request("api.once", "{}".into(), TIMEOUT, MessageHeaders::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NoResponders { .. }));
    }

    #[tokio::test]
    async fn test_dropping_bus_ends_responders() {
        let bus = MessageBus::new();
        let responder = bus.respond("api.echo", |msg: Message| async move { msg });
        let inner = Arc::downgrade(&bus.inner);

        drop(bus);
        assert!(inner.upgrade().is_none());

        tokio::time::timeout(Duration::from_secs(1), async {
            while !responder.task.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = MessageBus::new();
        assert!(!bus.publish("api.nothing", Message::new("x")));
    }
}
