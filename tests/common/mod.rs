//! Integration test infrastructure.
//!
//! A scripted IRC server: tests accept the agent's connection, read the lines
//! it sends and answer with canned server lines.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use slircbot::Config;
use slirc_proto::LineCodec;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Listening side of the fake network.
pub struct FakeServer {
    listener: TcpListener,
}

impl FakeServer {
    pub async fn bind() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .expect("listener has an address")
            .port()
    }

    /// Wait for the agent to connect.
    pub async fn accept(&self) -> Peer {
        let (stream, _) = tokio::time::timeout(RECV_TIMEOUT, self.listener.accept())
            .await
            .expect("agent did not connect in time")
            .expect("accept failed");
        Peer {
            framed: Framed::new(stream, LineCodec::new()),
        }
    }
}

/// One accepted agent connection.
pub struct Peer {
    framed: Framed<TcpStream, LineCodec>,
}

impl Peer {
    /// Next line from the agent.
    pub async fn recv(&mut self) -> String {
        tokio::time::timeout(RECV_TIMEOUT, self.framed.next())
            .await
            .expect("timed out waiting for the agent")
            .expect("agent closed the connection")
            .expect("bad line from agent")
    }

    /// Assert the next line from the agent.
    pub async fn expect(&mut self, line: &str) {
        assert_eq!(self.recv().await, line);
    }

    pub async fn send(&mut self, line: &str) {
        self.framed
            .send(line.to_string())
            .await
            .expect("failed to write to agent");
    }

    /// Write a line straight to the socket, bypassing the codec's length cap.
    pub async fn send_raw(&mut self, line: &str) {
        let stream = self.framed.get_mut();
        stream
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("failed to write to agent");
    }

    /// Send lines in order.
    pub async fn send_all(&mut self, lines: &[&str]) {
        for line in lines {
            self.send(line).await;
        }
    }

    /// Round-trip a PING so everything sent before it has been handled.
    pub async fn sync(&mut self, token: &str) {
        self.send(&format!("PING {token}")).await;
        loop {
            let line = self.recv().await;
            if line == format!("PONG {token}") {
                return;
            }
        }
    }

    /// Walk the agent through registration up to the ready state.
    pub async fn register(&mut self, nick: &str) {
        self.expect("USER botuser 0 * :Test Bot").await;
        self.expect(&format!("NICK {nick}")).await;
        self.send(&format!(":irc.test 001 {nick} :Welcome to the test network"))
            .await;
        self.expect(&format!("WHOIS {nick}")).await;
        self.send(&format!(
            ":irc.test 311 {nick} {nick} botuser host.test * :Test Bot"
        ))
        .await;
    }
}

/// Agent config pointing at the fake server.
pub fn config(port: u16, channels: &[&str]) -> Config {
    let channels = channels
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    toml::from_str(&format!(
        r#"
channels = [{channels}]

[server]
host = "127.0.0.1"
port = {port}

[identity]
nick = "bot"
username = "botuser"
realname = "Test Bot"

[connection]
pacing = false
"#
    ))
    .expect("test config parses")
}
