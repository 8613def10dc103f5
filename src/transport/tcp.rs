#![cfg(feature = "std")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::protocol::codec::MAX_DATAGRAM_LEN;
use crate::transport::{Connector, Transport};

/// Default timeout for writes and connection attempts.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Length prefix size.
const FRAME_HEADER: usize = 4;

/// Datagrams over a TCP stream, each prefixed by its length (u32, big-endian).
pub struct TcpTransport {
    stream: TcpStream,
    timeout_duration: Duration,
    max_frame_len: u32,
    recv_buf: Vec<u8>,
    shutdown: Arc<AtomicBool>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_timeout(stream, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(stream: TcpStream, timeout_duration: Duration) -> Self {
        let _ = stream.set_nodelay(true);
        Self {
            stream,
            timeout_duration,
            max_frame_len: MAX_DATAGRAM_LEN as u32,
            recv_buf: Vec::with_capacity(MAX_DATAGRAM_LEN * 4),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = timeout(DEFAULT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| anyhow::anyhow!("Connect timeout after {:?}", DEFAULT_TIMEOUT))??;
        Ok(Self::new(stream))
    }

    /// Request graceful shutdown of the transport.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Pop one complete frame from the buffer, if present.
    fn take_frame(&mut self) -> anyhow::Result<Option<Vec<u8>>> {
        if self.recv_buf.len() < FRAME_HEADER {
            return Ok(None);
        }
        let mut len_bytes = [0u8; FRAME_HEADER];
        len_bytes.copy_from_slice(&self.recv_buf[..FRAME_HEADER]);
        let len = u32::from_be_bytes(len_bytes);
        if len == 0 {
            return Err(anyhow::anyhow!("Invalid frame length: 0"));
        }
        if len > self.max_frame_len {
            return Err(anyhow::anyhow!(
                "Frame too large: {} bytes (max: {})",
                len,
                self.max_frame_len
            ));
        }
        let end = FRAME_HEADER + len as usize;
        if self.recv_buf.len() < end {
            return Ok(None);
        }
        let frame = self.recv_buf[FRAME_HEADER..end].to_vec();
        self.recv_buf.drain(..end);
        Ok(Some(frame))
    }
}

fn map_io(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
            anyhow::anyhow!("Connection closed by peer")
        }
        std::io::ErrorKind::UnexpectedEof => anyhow::anyhow!("Connection closed by peer"),
        _ => anyhow::anyhow!("I/O error: {}", e),
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, datagram: &[u8]) -> anyhow::Result<()> {
        if self.is_shutdown() {
            return Err(anyhow::anyhow!("Transport is shut down"));
        }
        if datagram.is_empty() || datagram.len() > self.max_frame_len as usize {
            return Err(anyhow::anyhow!(
                "Datagram length {} outside 1..={}",
                datagram.len(),
                self.max_frame_len
            ));
        }
        let mut frame = Vec::with_capacity(FRAME_HEADER + datagram.len());
        frame.extend_from_slice(&(datagram.len() as u32).to_be_bytes());
        frame.extend_from_slice(datagram);

        timeout(self.timeout_duration, self.stream.write_all(&frame))
            .await
            .map_err(|_| anyhow::anyhow!("Send timeout after {:?}", self.timeout_duration))?
            .map_err(map_io)
    }

    async fn recv(&mut self) -> anyhow::Result<Vec<u8>> {
        loop {
            if self.is_shutdown() {
                return Err(anyhow::anyhow!("Transport is shut down"));
            }
            if let Some(frame) = self.take_frame()? {
                return Ok(frame);
            }
            // read_buf only appends what it read, so cancelling here loses nothing.
            let n = self.stream.read_buf(&mut self.recv_buf).await.map_err(map_io)?;
            if n == 0 {
                return Err(anyhow::anyhow!("Connection closed by peer"));
            }
        }
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        self.shutdown();
        self.stream.shutdown().await.map_err(map_io)
    }
}

/// Hosting side: each `connect` waits for the next incoming connection.
pub struct TcpAcceptor {
    listener: tokio::net::TcpListener,
}

impl TcpAcceptor {
    pub fn new(listener: tokio::net::TcpListener) -> Self {
        Self { listener }
    }

    pub async fn bind<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        Ok(Self::new(tokio::net::TcpListener::bind(addr).await?))
    }

    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait::async_trait]
impl Connector for TcpAcceptor {
    async fn connect(&mut self, _peer_hint: &str) -> anyhow::Result<Box<dyn Transport>> {
        let (stream, addr) = self.listener.accept().await?;
        log::info!("peer connected from {}", addr);
        Ok(Box::new(TcpTransport::new(stream)))
    }
}

/// Dials the address given as the peer hint.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector;

#[async_trait::async_trait]
impl Connector for TcpConnector {
    async fn connect(&mut self, peer_hint: &str) -> anyhow::Result<Box<dyn Transport>> {
        let transport = TcpTransport::connect(peer_hint).await?;
        Ok(Box::new(transport))
    }
}
