use dogfight::protocol::codec;
use dogfight::transport::in_memory::{InMemoryConnector, InMemoryTransport};
use dogfight::transport::{Connector, Transport};
use dogfight::{Packet, PacketBody, PeerSession};

#[tokio::test]
async fn datagrams_arrive_in_order() -> anyhow::Result<()> {
    let (mut a, mut b) = InMemoryTransport::pair();
    a.send(&[1, 2, 3]).await?;
    a.send(&[4]).await?;
    assert_eq!(b.recv().await?, vec![1, 2, 3]);
    assert_eq!(b.recv().await?, vec![4]);

    b.send(&[9]).await?;
    assert_eq!(a.recv().await?, vec![9]);
    Ok(())
}

#[tokio::test]
async fn lossy_pair_drops_every_nth_datagram() -> anyhow::Result<()> {
    let (mut a, mut b) = InMemoryTransport::lossy_pair(3);
    for i in 1..=6u8 {
        a.send(&[i]).await?;
    }
    assert_eq!(a.sent_count(), 6);
    let mut got = Vec::new();
    for _ in 0..4 {
        got.push(b.recv().await?[0]);
    }
    assert_eq!(got, vec![1, 2, 4, 5]);
    Ok(())
}

#[tokio::test]
async fn disconnect_closes_the_link() -> anyhow::Result<()> {
    let (mut a, mut b) = InMemoryTransport::pair();
    a.disconnect().await?;
    assert!(a.is_shutdown());
    assert!(a.send(&[1]).await.is_err());
    assert!(a.recv().await.is_err());

    let err = b.send(&[1]).await.unwrap_err();
    assert!(err.to_string().contains("Channel closed"));
    Ok(())
}

#[tokio::test]
async fn dropped_peer_ends_recv() {
    let (a, mut b) = InMemoryTransport::pair();
    drop(a);
    assert!(b.recv().await.is_err());
}

#[tokio::test]
async fn connector_hands_out_queued_links() -> anyhow::Result<()> {
    let mut connector = InMemoryConnector::new();
    let (a, mut b) = InMemoryTransport::pair();
    connector.push(a);

    let mut link = connector.connect("peer").await?;
    link.send(&[7]).await?;
    assert_eq!(b.recv().await?, vec![7]);

    let err = connector.connect("peer").await.err().unwrap();
    assert!(err.to_string().contains("No peer reachable at peer"));
    Ok(())
}

#[tokio::test]
async fn session_encodes_packets() -> anyhow::Result<()> {
    let (a, mut b) = InMemoryTransport::pair();
    let mut session = PeerSession::from_transport(Box::new(a));
    assert!(session.is_connected());
    assert!(!session.can_reconnect());

    let packet = Packet::new(3, PacketBody::NewGameLength { seconds: 45 });
    session.send_packet(&packet).await?;
    let bytes = b.recv().await?;
    assert_eq!(codec::decode(&bytes)?, packet);
    Ok(())
}

#[tokio::test]
async fn session_drops_a_failed_link_and_reconnects() -> anyhow::Result<()> {
    let (a, mut b) = InMemoryTransport::pair();
    let connector = InMemoryConnector::new();
    let mut session =
        PeerSession::from_transport(Box::new(a)).reconnect_via(Box::new(connector.clone()), "peer");

    b.disconnect().await?;
    assert!(session.send(&[1]).await.is_err());
    assert!(!session.is_connected());
    assert!(session.send(&[1]).await.is_err());

    assert!(session.reconnect().await.is_err());

    let (fresh, mut far) = InMemoryTransport::pair();
    connector.push(fresh);
    session.reconnect().await?;
    assert!(session.is_connected());
    session.send(&[5]).await?;
    assert_eq!(far.recv().await?, vec![5]);
    Ok(())
}

#[tokio::test]
async fn session_with_no_reachable_peer_stays_down() {
    let connector = InMemoryConnector::new();
    let mut session = PeerSession::with_connector(Box::new(connector), "nobody");
    assert!(!session.is_connected());
    assert_eq!(session.peer_hint(), "nobody");
    assert!(session.connect().await.is_err());
    assert!(session.recv().await.is_err());
}
