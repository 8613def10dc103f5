#![cfg(feature = "std")]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::transport::{Connector, Transport};

/// In-process link. `drop_every = n` discards every n-th outgoing datagram.
pub struct InMemoryTransport {
    tx: UnboundedSender<Vec<u8>>,
    rx: UnboundedReceiver<Vec<u8>>,
    drop_every: u64,
    sent: AtomicU64,
    shutdown: Arc<AtomicBool>,
}

impl InMemoryTransport {
    pub fn pair() -> (Self, Self) {
        Self::lossy_pair(0)
    }

    pub fn lossy_pair(drop_every: u64) -> (Self, Self) {
        let (tx1, rx1) = unbounded_channel();
        let (tx2, rx2) = unbounded_channel();
        (
            Self::new(tx1, rx2, drop_every),
            Self::new(tx2, rx1, drop_every),
        )
    }

    fn new(tx: UnboundedSender<Vec<u8>>, rx: UnboundedReceiver<Vec<u8>>, drop_every: u64) -> Self {
        Self {
            tx,
            rx,
            drop_every,
            sent: AtomicU64::new(0),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Take this end down; both directions report closed afterwards.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Datagrams handed to `send`, including dropped ones.
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, datagram: &[u8]) -> anyhow::Result<()> {
        if self.is_shutdown() {
            return Err(anyhow::anyhow!("Transport is shut down"));
        }
        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        if self.drop_every > 0 && n % self.drop_every == 0 {
            log::debug!("in-memory link dropped datagram {}", n);
            return Ok(());
        }
        self.tx
            .send(datagram.to_vec())
            .map_err(|_| anyhow::anyhow!("Channel closed"))
    }

    async fn recv(&mut self) -> anyhow::Result<Vec<u8>> {
        if self.is_shutdown() {
            return Err(anyhow::anyhow!("Transport is shut down"));
        }
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Channel closed"))
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        self.shutdown();
        self.rx.close();
        Ok(())
    }
}

/// Hands out pre-built transports, one per `connect` call.
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    ready: Arc<Mutex<VecDeque<InMemoryTransport>>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transport for the next `connect`.
    pub fn push(&self, transport: InMemoryTransport) {
        if let Ok(mut ready) = self.ready.lock() {
            ready.push_back(transport);
        }
    }
}

#[async_trait::async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&mut self, peer_hint: &str) -> anyhow::Result<Box<dyn Transport>> {
        let next = self
            .ready
            .lock()
            .map_err(|_| anyhow::anyhow!("Connector lock poisoned"))?
            .pop_front();
        match next {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(anyhow::anyhow!("No peer reachable at {}", peer_hint)),
        }
    }
}
