#![cfg(all(feature = "std", feature = "ble"))]

use crate::protocol::codec::MAX_DATAGRAM_LEN;
use crate::transport::Transport;

/// Maximum payload size for a single BLE packet.
pub const BLE_MTU: usize = 20;

/// The radio link underneath a [`BleTransport`].
#[async_trait::async_trait]
pub trait BleConnection: Send + Sync {
    /// Send a single chunk of at most [`BLE_MTU`] bytes.
    async fn write(&mut self, data: &[u8]) -> anyhow::Result<()>;

    /// Receive the next chunk.
    async fn read(&mut self) -> anyhow::Result<Vec<u8>>;
}

/// Datagrams split into MTU-sized chunks behind a one-byte length prefix.
pub struct BleTransport<C: BleConnection> {
    conn: C,
    recv_buf: Vec<u8>,
}

impl<C: BleConnection> BleTransport<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            recv_buf: Vec::new(),
        }
    }

    pub fn into_inner(self) -> C {
        self.conn
    }
}

#[async_trait::async_trait]
impl<C: BleConnection> Transport for BleTransport<C> {
    async fn send(&mut self, datagram: &[u8]) -> anyhow::Result<()> {
        if datagram.is_empty() || datagram.len() > MAX_DATAGRAM_LEN {
            return Err(anyhow::anyhow!(
                "Datagram length {} outside 1..={}",
                datagram.len(),
                MAX_DATAGRAM_LEN
            ));
        }
        let mut frame = Vec::with_capacity(1 + datagram.len());
        frame.push(datagram.len() as u8);
        frame.extend_from_slice(datagram);
        for chunk in frame.chunks(BLE_MTU) {
            self.conn.write(chunk).await?;
        }
        Ok(())
    }

    async fn recv(&mut self) -> anyhow::Result<Vec<u8>> {
        loop {
            if let Some(&len) = self.recv_buf.first() {
                let len = len as usize;
                if len == 0 || len > MAX_DATAGRAM_LEN {
                    self.recv_buf.clear();
                    return Err(anyhow::anyhow!("Invalid BLE frame length: {}", len));
                }
                if self.recv_buf.len() > len {
                    let datagram = self.recv_buf[1..=len].to_vec();
                    self.recv_buf.drain(..=len);
                    return Ok(datagram);
                }
            }
            let chunk = self.conn.read().await?;
            self.recv_buf.extend_from_slice(&chunk);
        }
    }
}
