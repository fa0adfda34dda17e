//! Integration test common infrastructure.
//!
//! Provides a scripted fake IRC server, a fake event consumer, and helpers
//! to open a registered connection against them.

pub mod receiver;
pub mod server;

#[allow(unused_imports)]
pub use receiver::EventReceiver;
#[allow(unused_imports)]
pub use server::{FakeIrcServer, ServerPeer};

use slirc_bridge::network::{Connection, ConnectionOptions};
use slirc_proto::RegistrationConfig;
use std::time::Duration;

/// Short deadlines so failure paths finish quickly.
#[allow(dead_code)]
pub fn test_options() -> ConnectionOptions {
    ConnectionOptions {
        connect_timeout: Duration::from_secs(2),
        handshake_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_secs(5),
        write_timeout: Duration::from_secs(2),
        queue_capacity: 16,
    }
}

/// Open a connection as `nick` in `channel` and complete registration.
#[allow(dead_code)]
pub async fn connect_registered(
    server: &FakeIrcServer,
    nick: &str,
    channel: &str,
) -> (Connection, ServerPeer) {
    connect_registered_with(server, nick, channel, test_options()).await
}

/// [`connect_registered`] with custom deadlines or queue sizes.
#[allow(dead_code)]
pub async fn connect_registered_with(
    server: &FakeIrcServer,
    nick: &str,
    channel: &str,
    options: ConnectionOptions,
) -> (Connection, ServerPeer) {
    let addr = server.address();
    let registration = RegistrationConfig::new(nick, channel);
    let open = tokio::spawn(async move { Connection::open(&addr, registration, options).await });

    let mut peer = server.accept().await.expect("Client did not connect");
    peer.expect_registration(nick, channel).await;
    peer.send_raw(&format!(":irc.test 001 {nick} :Welcome"))
        .await
        .expect("Failed to send welcome");

    let conn = open
        .await
        .expect("Open task panicked")
        .expect("Registration failed");
    (conn, peer)
}
