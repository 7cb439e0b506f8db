//! Fake IRC server.
//!
//! Accepts bridge connections on an ephemeral port and lets a test read and
//! write raw lines on each one.

use ircbridge_proto::{Command, Message};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FakeIrcServer {
    listener: TcpListener,
}

impl FakeIrcServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|a| a.port())
            .unwrap_or_default()
    }

    /// Wait for the next bridge connection.
    pub async fn accept(&self) -> anyhow::Result<ServerPeer> {
        let (stream, _) = timeout(RECV_TIMEOUT, self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(ServerPeer {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }
}

/// One accepted connection, seen from the server side.
pub struct ServerPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl ServerPeer {
    /// Send a raw line to the bridge.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive the next message from the bridge. Fails on EOF.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        let mut line = String::new();
        let read = timeout(RECV_TIMEOUT, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("connection closed");
        }
        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("parse error: {e}"))
    }

    /// Receive until `predicate` matches; returns every message read.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<Message>>
    where
        F: FnMut(&Message) -> bool,
    {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = predicate(&msg);
            messages.push(msg);
            if done {
                return Ok(messages);
            }
        }
    }

    /// Read the registration burst and welcome the bridge. Returns the
    /// channels it joins afterwards.
    pub async fn register(&mut self, nick: &str, channels: usize) -> anyhow::Result<Vec<String>> {
        self.recv_until(|m| matches!(m.command, Command::USER(..)))
            .await?;
        self.send_raw(&format!(":irc.test 001 {nick} :Welcome")).await?;

        let mut joined = Vec::new();
        while joined.len() < channels {
            if let Command::JOIN(channel, _) = self.recv().await?.command {
                joined.push(channel);
            }
        }
        Ok(joined)
    }

    /// True when the bridge closes the connection within the receive timeout.
    pub async fn closed(&mut self) -> bool {
        let mut line = String::new();
        loop {
            line.clear();
            match timeout(RECV_TIMEOUT, self.reader.read_line(&mut line)).await {
                Ok(Ok(0)) | Ok(Err(_)) => return true,
                Ok(Ok(_)) => continue,
                Err(_) => return false,
            }
        }
    }
}
