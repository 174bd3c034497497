// Transport module
// Byte-stream connection that delivers PCM frames to the player

pub mod websocket;

use tokio::sync::mpsc;

use crate::error::Result;

pub use websocket::WsTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(Vec<u8>),
    Close,
    Error(String),
}

/// An event stamped with the connection it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: TransportEvent,
}

/// Where a connection reports its lifecycle. Events keep arrival order.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the player side has gone away
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(TaggedEvent { generation: self.generation, event })
            .is_ok()
    }
}

/// A live connection; closing it must not block
pub trait TransportHandle: Send {
    fn close(&mut self);
}

pub trait Transport {
    /// Start connecting to `endpoint` without blocking. Progress arrives
    /// through `events`.
    fn open(&mut self, endpoint: &str, events: EventSink) -> Result<Box<dyn TransportHandle>>;
}
