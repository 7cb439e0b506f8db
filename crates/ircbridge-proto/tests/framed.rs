//! Framed transport tests over an in-memory duplex stream.

use futures_util::{SinkExt, StreamExt};
use ircbridge_proto::{Command, IrcCodec, Message, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::codec::Framed;

#[tokio::test]
async fn reads_server_lines_and_writes_client_lines() {
    let (client, mut server) = tokio::io::duplex(1024);
    let mut framed = Framed::new(client, IrcCodec::new());

    server
        .write_all(b":irc.test 001 teamcity :Welcome\r\n:irc.test 433 * teamcity :Nickname is already in use\r\n")
        .await
        .unwrap();

    let welcome = framed.next().await.unwrap().unwrap();
    assert!(matches!(welcome.command, Command::Response(Response::RPL_WELCOME, _)));

    let in_use = framed.next().await.unwrap().unwrap();
    assert!(matches!(in_use.command, Command::Response(Response::ERR_NICKNAMEINUSE, _)));

    framed.send(Message::nick("teamcity_")).await.unwrap();
    framed.send(Message::join("#ci")).await.unwrap();

    let mut buf = vec![0u8; 64];
    let n = server.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"NICK teamcity_\r\nJOIN #ci\r\n");
}

#[tokio::test]
async fn stream_ends_when_peer_closes() {
    let (client, server) = tokio::io::duplex(64);
    let mut framed = Framed::new(client, IrcCodec::new());
    drop(server);
    assert!(framed.next().await.is_none());
}
