//! Scripted fake IRC server.
//!
//! Accepts one client at a time and lets the test read and write raw lines.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::time::timeout;

/// A listening fake server on an ephemeral port.
pub struct FakeIrcServer {
    listener: TcpListener,
}

impl FakeIrcServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    /// `host:port` of the listener.
    pub fn address(&self) -> String {
        self.listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_default()
    }

    /// Accept the next client.
    pub async fn accept(&self) -> anyhow::Result<ServerPeer> {
        let (stream, _) = timeout(Duration::from_secs(5), self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(ServerPeer {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }
}

/// Server side of one accepted client.
pub struct ServerPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[allow(dead_code)]
impl ServerPeer {
    /// Send one line; CRLF is appended.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line from the client without its CRLF.
    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        self.recv_line_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_line_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("client closed the connection");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// True once the client has closed its side.
    pub async fn at_eof(&mut self) -> bool {
        let mut line = String::new();
        matches!(
            timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await,
            Ok(Ok(0))
        )
    }

    /// Consume the NICK/USER/JOIN burst and check it.
    pub async fn expect_registration(&mut self, nick: &str, channel: &str) {
        assert_eq!(
            self.recv_line().await.expect("Missing NICK"),
            format!("NICK {nick}")
        );
        assert_eq!(
            self.recv_line().await.expect("Missing USER"),
            format!("USER {nick} {nick} 0 {nick}")
        );
        assert_eq!(
            self.recv_line().await.expect("Missing JOIN"),
            format!("JOIN {channel}")
        );
    }

    /// Drop the connection from the server side.
    pub async fn disconnect(mut self) {
        let _ = self.writer.shutdown().await;
    }

    /// Abort the connection with a TCP reset instead of a clean FIN.
    pub fn reset(self) -> anyhow::Result<()> {
        let stream = self.reader.into_inner().reunite(self.writer)?;
        socket2::SockRef::from(&stream).set_linger(Some(Duration::ZERO))?;
        drop(stream);
        Ok(())
    }
}
