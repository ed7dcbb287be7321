//! Event fabric ports and the channel-backed default adapter.
//!
//! The core depends on [`Emitter`] only; UIs depend on [`Subscriber`]. The
//! default adapter pairs them over a bounded tokio mpsc channel —
//! [`channel`] returns both ends. Emission failures are swallowed by design
//! constraint: observability must not mask functional outcomes, so a closed
//! or full subscriber never fails a turn.
//!
//! Event wire shapes live in the `agent-event` crate and are re-exported
//! here.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub use agent_event::{Event, EventPayload};

/// Outbound port: post one event toward whatever UI is listening.
#[async_trait]
pub trait Emitter: Send + Sync {
    async fn emit(&self, event: Event);

    /// Stamps `payload` with the current time and emits it.
    async fn emit_payload(&self, payload: EventPayload) {
        self.emit(Event::now(payload)).await;
    }
}

/// Inbound port: the UI side of the fabric.
#[async_trait]
pub trait Subscriber: Send {
    /// Next event, or `None` once the emitter side is gone.
    async fn next_event(&mut self) -> Option<Event>;

    /// Stops accepting further events; buffered events remain readable.
    fn close(&mut self);
}

/// Builds the default channel-backed emitter/subscriber pair.
pub fn channel(capacity: usize) -> (ChannelEmitter, ChannelSubscriber) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelEmitter { tx }, ChannelSubscriber { rx })
}

/// Default emitter: forwards onto a bounded mpsc channel.
#[derive(Clone)]
pub struct ChannelEmitter {
    tx: mpsc::Sender<Event>,
}

#[async_trait]
impl Emitter for ChannelEmitter {
    async fn emit(&self, event: Event) {
        if let Err(err) = self.tx.send(event).await {
            tracing::debug!("event dropped, subscriber gone: {}", err.0.payload.kind());
        }
    }
}

/// Default subscriber: reads the channel's receive side.
pub struct ChannelSubscriber {
    rx: mpsc::Receiver<Event>,
}

impl ChannelSubscriber {
    /// Consumes the subscriber into a `Stream` of events.
    pub fn into_stream(self) -> ReceiverStream<Event> {
        ReceiverStream::new(self.rx)
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn next_event(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    fn close(&mut self) {
        self.rx.close();
    }
}
