/// Point-to-point datagram link to the peer.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&mut self, datagram: &[u8]) -> anyhow::Result<()>;

    /// Next whole datagram. Must be cancel-safe: dropping the future loses no bytes.
    async fn recv(&mut self) -> anyhow::Result<Vec<u8>>;

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Opens new links, used for the first connection and for reconnects.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&mut self, peer_hint: &str) -> anyhow::Result<Box<dyn Transport>>;
}

#[cfg(feature = "std")]
pub mod tcp;
#[cfg(feature = "std")]
pub mod in_memory;
#[cfg(all(feature = "std", feature = "ble"))]
pub mod ble;
