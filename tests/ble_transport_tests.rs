#![cfg(feature = "ble")]

use async_trait::async_trait;
use dogfight::protocol::codec;
use dogfight::transport::ble::{BleConnection, BleTransport, BLE_MTU};
use dogfight::transport::Transport;
use dogfight::{DirectionalUpdate, Packet, PacketBody, Vec2};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::task::yield_now;

struct MockBle {
    recv_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    send_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl MockBle {
    fn pair() -> (Self, Self) {
        let q1 = Arc::new(Mutex::new(VecDeque::new()));
        let q2 = Arc::new(Mutex::new(VecDeque::new()));
        (
            Self {
                recv_queue: q1.clone(),
                send_queue: q2.clone(),
            },
            Self {
                recv_queue: q2,
                send_queue: q1,
            },
        )
    }

    fn inject(&self, chunk: &[u8]) {
        self.recv_queue.lock().unwrap().push_back(chunk.to_vec());
    }
}

#[async_trait]
impl BleConnection for MockBle {
    async fn write(&mut self, data: &[u8]) -> anyhow::Result<()> {
        assert!(data.len() <= BLE_MTU);
        self.send_queue.lock().unwrap().push_back(data.to_vec());
        Ok(())
    }

    async fn read(&mut self) -> anyhow::Result<Vec<u8>> {
        loop {
            if let Some(chunk) = {
                let mut q = self.recv_queue.lock().unwrap();
                q.pop_front()
            } {
                return Ok(chunk);
            }
            if Arc::strong_count(&self.recv_queue) == 1 {
                return Err(anyhow::anyhow!("Channel closed"));
            }
            yield_now().await;
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn small_packet_fits_one_chunk() -> anyhow::Result<()> {
    let (dev1, dev2) = MockBle::pair();
    let mut t1 = BleTransport::new(dev1);
    let mut t2 = BleTransport::new(dev2);

    let bytes = codec::encode(&Packet::new(1, PacketBody::Heartbeat))?;
    t1.send(&bytes).await?;
    assert_eq!(t2.recv().await?, bytes);

    let dev1 = t1.into_inner();
    assert!(dev1.send_queue.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn large_packet_is_chunked_and_reassembled() -> anyhow::Result<()> {
    let (dev1, dev2) = MockBle::pair();
    let delivered = dev2.recv_queue.clone();
    let mut t1 = BleTransport::new(dev1);
    let mut t2 = BleTransport::new(dev2);

    let packet = Packet::new(
        77,
        PacketBody::DirectionalUpdate(DirectionalUpdate {
            heading: 12.5,
            speed: 40.0,
            position: Vec2::new(100.0, 200.0),
            rotation: 12.5,
        }),
    );
    let bytes = codec::encode(&packet)?;
    t1.send(&bytes).await?;
    // One length byte plus 25 payload bytes.
    assert_eq!(delivered.lock().unwrap().len(), 2);

    let received = t2.recv().await?;
    assert_eq!(codec::decode(&received)?, packet);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn back_to_back_frames_in_one_chunk() -> anyhow::Result<()> {
    let (dev1, dev2) = MockBle::pair();
    let mut t2 = BleTransport::new(dev2);
    dev1.send_queue.lock().unwrap().push_back(vec![2, 10, 11, 1, 12]);

    assert_eq!(t2.recv().await?, vec![10, 11]);
    assert_eq!(t2.recv().await?, vec![12]);
    drop(dev1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_length_byte_is_rejected() -> anyhow::Result<()> {
    let (dev1, dev2) = MockBle::pair();
    dev2.inject(&[200, 1, 2]);
    let mut t2 = BleTransport::new(dev2);
    assert!(t2.recv().await.is_err());

    let mut t1 = BleTransport::new(dev1);
    assert!(t1.send(&[]).await.is_err());
    assert!(t1.send(&[0; 65]).await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_link_ends_recv() {
    let (dev1, dev2) = MockBle::pair();
    let mut t2 = BleTransport::new(dev2);
    drop(dev1);
    assert!(t2.recv().await.is_err());
}
