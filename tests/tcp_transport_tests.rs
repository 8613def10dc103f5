use dogfight::protocol::codec::MAX_DATAGRAM_LEN;
use dogfight::transport::tcp::{TcpAcceptor, TcpConnector, TcpTransport};
use dogfight::transport::{Connector, Transport};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

async fn connected_pair() -> anyhow::Result<(TcpTransport, TcpTransport)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        TcpTransport::new(socket)
    });
    let client = TcpTransport::connect(addr).await?;
    Ok((server.await?, client))
}

#[tokio::test(flavor = "multi_thread")]
async fn frames_round_trip() -> anyhow::Result<()> {
    let (mut server, mut client) = connected_pair().await?;
    client.send(&[1, 2, 3]).await?;
    client.send(&[4; MAX_DATAGRAM_LEN]).await?;
    assert_eq!(server.recv().await?, vec![1, 2, 3]);
    assert_eq!(server.recv().await?, vec![4; MAX_DATAGRAM_LEN]);

    server.send(&[9]).await?;
    assert_eq!(client.recv().await?, vec![9]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_and_empty_datagrams_are_refused() -> anyhow::Result<()> {
    let (_server, mut client) = connected_pair().await?;
    assert!(client.send(&[0; MAX_DATAGRAM_LEN + 1]).await.is_err());
    assert!(client.send(&[]).await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn split_writes_reassemble() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let writer = tokio::spawn(async move {
        let mut raw = TcpStream::connect(addr).await.unwrap();
        raw.write_all(&[0, 0]).await.unwrap();
        raw.flush().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        raw.write_all(&[0, 2, 7]).await.unwrap();
        raw.flush().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        raw.write_all(&[8, 0, 0, 0, 1, 5]).await.unwrap();
        raw
    });
    let (socket, _) = listener.accept().await?;
    let mut transport = TcpTransport::new(socket);
    assert_eq!(transport.recv().await?, vec![7, 8]);
    assert_eq!(transport.recv().await?, vec![5]);
    drop(writer.await?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_length_prefix_is_an_error() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let writer = tokio::spawn(async move {
        let mut raw = TcpStream::connect(addr).await.unwrap();
        raw.write_all(&1000u32.to_be_bytes()).await.unwrap();
        raw
    });
    let (socket, _) = listener.accept().await?;
    let mut transport = TcpTransport::new(socket);
    let err = transport.recv().await.unwrap_err();
    assert!(err.to_string().contains("Frame too large"));
    drop(writer.await?);

    let writer = tokio::spawn(async move {
        let mut raw = TcpStream::connect(addr).await.unwrap();
        raw.write_all(&0u32.to_be_bytes()).await.unwrap();
        raw
    });
    let (socket, _) = listener.accept().await?;
    let mut transport = TcpTransport::new(socket);
    assert!(transport.recv().await.is_err());
    drop(writer.await?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn peer_close_is_reported() -> anyhow::Result<()> {
    let (mut server, client) = connected_pair().await?;
    drop(client);
    let err = server.recv().await.unwrap_err();
    assert!(err.to_string().contains("Connection closed by peer"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn shut_down_transport_refuses_io() -> anyhow::Result<()> {
    let (mut server, _client) = connected_pair().await?;
    server.shutdown();
    assert!(server.is_shutdown());
    assert!(server.send(&[1]).await.is_err());
    assert!(server.recv().await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn acceptor_and_connector_meet() -> anyhow::Result<()> {
    let mut acceptor = TcpAcceptor::bind("127.0.0.1:0").await?;
    let addr = acceptor.local_addr()?.to_string();
    let host = tokio::spawn(async move {
        let mut link = acceptor.connect("").await.unwrap();
        let got = link.recv().await.unwrap();
        link.send(&got).await.unwrap();
    });

    let mut connector = TcpConnector;
    let mut link = connector.connect(&addr).await?;
    link.send(&[42, 17]).await?;
    assert_eq!(link.recv().await?, vec![42, 17]);
    host.await?;
    Ok(())
}
