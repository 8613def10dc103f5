#![cfg(feature = "std")]

//! The link to the one peer of a match.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::Mutex;

use crate::protocol::{codec, Packet};
use crate::transport::{Connector, Transport};

/// A connect attempt running apart from the session. See [`PeerSession::redial`].
pub type Redial = Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn Transport>>> + Send>>;

type SharedConnector = Arc<Mutex<Box<dyn Connector>>>;

/// Owns the current transport and can replace it through a [`Connector`].
pub struct PeerSession {
    transport: Option<Box<dyn Transport>>,
    connector: Option<SharedConnector>,
    peer_hint: String,
    connect_timeout: Duration,
}

impl PeerSession {
    /// Session over an already connected transport, without reconnects.
    pub fn from_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
            connector: None,
            peer_hint: String::new(),
            connect_timeout: Duration::from_secs(2),
        }
    }

    /// Session that dials `peer_hint` and may redial after a drop.
    pub fn with_connector(connector: Box<dyn Connector>, peer_hint: impl Into<String>) -> Self {
        Self {
            transport: None,
            connector: Some(Arc::new(Mutex::new(connector))),
            peer_hint: peer_hint.into(),
            connect_timeout: Duration::from_secs(2),
        }
    }

    /// Attach a connector used only for reconnects.
    pub fn reconnect_via(mut self, connector: Box<dyn Connector>, peer_hint: impl Into<String>) -> Self {
        self.connector = Some(Arc::new(Mutex::new(connector)));
        self.peer_hint = peer_hint.into();
        self
    }

    pub fn set_connect_timeout(&mut self, connect_timeout: Duration) {
        self.connect_timeout = connect_timeout;
    }

    pub fn peer_hint(&self) -> &str {
        &self.peer_hint
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn can_reconnect(&self) -> bool {
        self.connector.is_some()
    }

    /// Dial the peer unless already connected.
    pub async fn connect(&mut self) -> anyhow::Result<()> {
        if self.transport.is_some() {
            return Ok(());
        }
        let connector = self
            .connector
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No connector configured"))?;
        let transport = dial(connector, self.peer_hint.clone(), self.connect_timeout).await?;
        self.install(transport);
        Ok(())
    }

    /// Connect attempt that does not borrow the session, so the caller can
    /// keep using it while the attempt runs. Hand the result to
    /// [`PeerSession::install`]. `None` without a connector.
    pub fn redial(&self, limit: Duration) -> Option<Redial> {
        let connector = self.connector.clone()?;
        Some(Box::pin(dial(connector, self.peer_hint.clone(), limit)))
    }

    /// Adopt a freshly connected transport, replacing any current one.
    pub fn install(&mut self, transport: Box<dyn Transport>) {
        info!("connected to peer {}", self.peer_hint);
        self.transport = Some(transport);
    }

    /// Drop the current link and dial again.
    pub async fn reconnect(&mut self) -> anyhow::Result<()> {
        if let Some(mut old) = self.transport.take() {
            let _ = old.disconnect().await;
        }
        self.connect().await
    }

    pub async fn send_packet(&mut self, packet: &Packet) -> anyhow::Result<()> {
        let bytes = codec::encode(packet)?;
        self.send(&bytes).await
    }

    pub async fn send(&mut self, datagram: &[u8]) -> anyhow::Result<()> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Not connected"))?;
        let result = transport.send(datagram).await;
        if result.is_err() {
            self.transport = None;
        }
        result
    }

    /// Next datagram from the peer. A failed read drops the link.
    pub async fn recv(&mut self) -> anyhow::Result<Vec<u8>> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Not connected"))?;
        let result = transport.recv().await;
        if let Err(e) = &result {
            warn!("peer link failed: {}", e);
            self.transport = None;
        }
        result
    }

    pub async fn disconnect(&mut self) -> anyhow::Result<()> {
        match self.transport.take() {
            Some(mut transport) => transport.disconnect().await,
            None => Ok(()),
        }
    }
}

async fn dial(
    connector: SharedConnector,
    peer_hint: String,
    limit: Duration,
) -> anyhow::Result<Box<dyn Transport>> {
    let mut connector = connector.lock_owned().await;
    tokio::time::timeout(limit, connector.connect(&peer_hint))
        .await
        .map_err(|_| anyhow::anyhow!("Connect timeout after {:?}", limit))?
}
