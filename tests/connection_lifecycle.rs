//! Integration tests for the protocol connection lifecycle.
//!
//! Tests dialing, registration, ordered writes, shutdown and the ways a
//! connection can end, against a scripted fake server.

mod common;

use common::{FakeIrcServer, connect_registered, connect_registered_with, test_options};
use slirc_bridge::error::ConnectionError;
use slirc_bridge::network::{Connection, ConnectionOptions};
use slirc_proto::{ConnectionState, HandshakeError, Message, RegistrationConfig};
use std::time::{Duration, Instant};
use tokio::time::timeout;

#[tokio::test]
async fn test_basic_registration() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let (conn, _peer) = connect_registered(&server, "bot", "#test").await;

    assert_eq!(conn.state(), ConnectionState::Ready);
    assert_eq!(conn.addr(), server.address());
    conn.close().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_notices_before_welcome_are_skipped() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let addr = server.address();
    let open = tokio::spawn(async move {
        Connection::open(&addr, RegistrationConfig::new("bot", "#test"), test_options()).await
    });

    let mut peer = server.accept().await.expect("Client did not connect");
    peer.expect_registration("bot", "#test").await;
    peer.send_raw(":irc.test NOTICE * :*** Looking up your hostname")
        .await
        .unwrap();
    peer.send_raw(":irc.test NOTICE * :*** Found your hostname")
        .await
        .unwrap();
    peer.send_raw(":irc.test 001 bot :Welcome").await.unwrap();

    let conn = open.await.unwrap().expect("Registration failed");
    assert_eq!(conn.state(), ConnectionState::Ready);
    conn.close().await;
}

#[tokio::test]
async fn test_registration_with_channel_key() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let addr = server.address();
    let mut registration = RegistrationConfig::new("bot", "#secret");
    registration.channel_key = Some("hunter2".to_string());
    let open =
        tokio::spawn(async move { Connection::open(&addr, registration, test_options()).await });

    let mut peer = server.accept().await.expect("Client did not connect");
    assert_eq!(peer.recv_line().await.unwrap(), "NICK bot");
    assert_eq!(peer.recv_line().await.unwrap(), "USER bot bot 0 bot");
    assert_eq!(peer.recv_line().await.unwrap(), "JOIN #secret hunter2");
    peer.send_raw(":irc.test 001 bot :Welcome").await.unwrap();

    let conn = open.await.unwrap().expect("Registration failed");
    conn.close().await;
}

#[tokio::test]
async fn test_registration_timeout() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let addr = server.address();
    let options = ConnectionOptions {
        handshake_timeout: Duration::from_millis(200),
        ..test_options()
    };
    let open = tokio::spawn(async move {
        let started = Instant::now();
        let result =
            Connection::open(&addr, RegistrationConfig::new("bot", "#test"), options).await;
        (result, started.elapsed())
    });

    let mut peer = server.accept().await.expect("Client did not connect");
    peer.expect_registration("bot", "#test").await;

    let (result, elapsed) = open.await.unwrap();
    assert!(
        elapsed >= Duration::from_millis(200),
        "gave up early: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(1500),
        "gave up late: {elapsed:?}"
    );
    assert!(
        matches!(
            result,
            Err(ConnectionError::Handshake(HandshakeError::Timeout))
        ),
        "unexpected result: {:?}",
        result.err()
    );
    assert!(peer.at_eof().await, "socket should be closed after failure");
}

#[tokio::test]
async fn test_unexpected_message_fails_registration() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let addr = server.address();
    let options = ConnectionOptions {
        handshake_timeout: Duration::from_secs(10),
        ..test_options()
    };
    let open = tokio::spawn(async move {
        let started = Instant::now();
        let result =
            Connection::open(&addr, RegistrationConfig::new("bot", "#test"), options).await;
        (result, started.elapsed())
    });

    let mut peer = server.accept().await.expect("Client did not connect");
    peer.expect_registration("bot", "#test").await;
    peer.send_raw(":irc.test 433 * bot :Nickname is already in use")
        .await
        .unwrap();

    let (result, elapsed) = open.await.unwrap();
    // Fails on the reply, not at the deadline.
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    match result {
        Err(ConnectionError::Handshake(HandshakeError::Unexpected(line))) => {
            assert!(line.contains("433"), "{line}");
        }
        other => panic!("Expected unexpected-message failure, got {:?}", other.err()),
    }
    assert!(peer.at_eof().await);
}

#[tokio::test]
async fn test_server_closes_during_registration() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let addr = server.address();
    let open = tokio::spawn(async move {
        Connection::open(&addr, RegistrationConfig::new("bot", "#test"), test_options()).await
    });

    let mut peer = server.accept().await.expect("Client did not connect");
    peer.expect_registration("bot", "#test").await;
    peer.disconnect().await;

    let result = open.await.unwrap();
    assert!(matches!(
        result,
        Err(ConnectionError::Handshake(HandshakeError::ConnectionClosed))
    ));
}

#[tokio::test]
async fn test_connect_refused() {
    // Grab a free port, then release it so nothing is listening.
    let addr = {
        let server = FakeIrcServer::bind().await.expect("Failed to bind");
        server.address()
    };

    let result = Connection::open(&addr, RegistrationConfig::new("bot", "#test"), test_options()).await;
    match result {
        Err(e @ ConnectionError::Connect { .. }) => assert_eq!(e.error_code(), "connect"),
        other => panic!("Expected connect failure, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_writes_arrive_in_order() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let (conn, mut peer) = connect_registered(&server, "bot", "#test").await;

    let handle = conn.handle();
    let writer = tokio::spawn(async move {
        for i in 0..100 {
            handle
                .send(Message::privmsg("#test", format!("line {i}")))
                .await
                .expect("send failed");
        }
    });

    for i in 0..100 {
        assert_eq!(
            peer.recv_line().await.unwrap(),
            format!("PRIVMSG #test :line {i}")
        );
    }
    writer.await.unwrap();
    conn.close().await;
}

#[tokio::test]
async fn test_rejected_message_is_skipped() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let (conn, mut peer) = connect_registered(&server, "bot", "#test").await;

    conn.send(Message::privmsg("#test", "x".repeat(600)))
        .await
        .unwrap();
    conn.send(Message::privmsg("#test", "after")).await.unwrap();

    assert_eq!(peer.recv_line().await.unwrap(), "PRIVMSG #test :after");
    assert_eq!(conn.state(), ConnectionState::Ready);
    conn.close().await;
}

#[tokio::test]
async fn test_receive_in_order() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let (conn, mut peer) = connect_registered(&server, "bot", "#test").await;

    peer.send_raw(":alice!u@h PRIVMSG #test :one").await.unwrap();
    peer.send_raw("").await.unwrap();
    peer.send_raw(":alice!u@h PRIVMSG #test :two").await.unwrap();

    let first = conn.receive().await.expect("first message");
    let second = conn.receive().await.expect("second message");
    assert_eq!(first.param(1), Some("one"));
    assert_eq!(second.param(1), Some("two"));
    conn.close().await;
}

#[tokio::test]
async fn test_close_drains_queued_messages() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let (conn, mut peer) = connect_registered(&server, "bot", "#test").await;

    for i in 0..3 {
        conn.send(Message::privmsg("#test", format!("bye {i}")))
            .await
            .unwrap();
    }
    conn.close().await;

    for i in 0..3 {
        assert_eq!(
            peer.recv_line().await.unwrap(),
            format!("PRIVMSG #test :bye {i}")
        );
    }
    assert!(peer.at_eof().await);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let (conn, _peer) = connect_registered(&server, "bot", "#test").await;

    tokio::join!(conn.close(), conn.close());
    conn.close().await;

    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(conn.receive().await.is_none());
    assert!(matches!(
        conn.send(Message::ping("late")).await,
        Err(ConnectionError::Closed)
    ));
    assert!(conn.handle().is_closed());
}

#[tokio::test]
async fn test_peer_disconnect_closes_receive() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let (conn, mut peer) = connect_registered(&server, "bot", "#test").await;
    let mut state = conn.subscribe_state();

    peer.send_raw("PING :last").await.unwrap();
    peer.disconnect().await;

    // Lines read before EOF are still delivered.
    let msg = conn.receive().await.expect("queued message");
    assert!(msg.is_command("PING"));
    assert!(conn.receive().await.is_none());

    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == ConnectionState::Closed),
    )
    .await
    .expect("state did not reach Closed")
    .unwrap();
    conn.close().await;
}

#[tokio::test]
async fn test_read_timeout_fails_connection() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let addr = server.address();
    let options = ConnectionOptions {
        read_timeout: Duration::from_millis(300),
        ..test_options()
    };
    let open = tokio::spawn(async move {
        Connection::open(&addr, RegistrationConfig::new("bot", "#test"), options).await
    });

    let mut peer = server.accept().await.expect("Client did not connect");
    peer.expect_registration("bot", "#test").await;
    peer.send_raw(":irc.test 001 bot :Welcome").await.unwrap();
    let conn = open.await.unwrap().expect("Registration failed");

    assert!(conn.receive().await.is_none());
    assert!(matches!(conn.state(), ConnectionState::Failed(_)));
    conn.close().await;
    // Failure is sticky.
    assert!(matches!(conn.state(), ConnectionState::Failed(_)));
}

#[tokio::test]
async fn test_parse_error_fails_connection() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let (conn, mut peer) = connect_registered(&server, "bot", "#test").await;

    peer.send_raw(":alice!u@h PRIVMSG #test :before").await.unwrap();
    peer.send_raw("12 nope").await.unwrap();

    let msg = conn.receive().await.expect("message before the bad line");
    assert_eq!(msg.param(1), Some("before"));
    assert!(conn.receive().await.is_none());
    match conn.state() {
        ConnectionState::Failed(reason) => assert!(reason.contains("protocol error"), "{reason}"),
        other => panic!("Expected Failed, got {:?}", other),
    }
    conn.close().await;
}

#[tokio::test]
async fn test_overlong_line_is_truncated_not_fatal() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let (conn, mut peer) = connect_registered(&server, "bot", "#test").await;

    peer.send_raw(&format!(":alice!u@h PRIVMSG #test :{}", "a".repeat(9000)))
        .await
        .unwrap();
    peer.send_raw(":alice!u@h PRIVMSG #test :after").await.unwrap();

    let first = conn.receive().await.expect("truncated message");
    assert!(first.is_command("PRIVMSG"));
    let text = first.param(1).expect("text survives truncation");
    assert!(!text.is_empty() && text.len() < 510, "{} bytes", text.len());
    assert!(text.bytes().all(|b| b == b'a'));

    let second = conn.receive().await.expect("line after the long one");
    assert_eq!(second.param(1), Some("after"));
    assert_eq!(conn.state(), ConnectionState::Ready);
    conn.close().await;
}

#[tokio::test]
async fn test_receive_backpressure_drops_nothing() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let options = ConnectionOptions {
        queue_capacity: 2,
        ..test_options()
    };
    let (conn, mut peer) = connect_registered_with(&server, "bot", "#test", options).await;

    for i in 0..50 {
        peer.send_raw(&format!(":alice!u@h PRIVMSG #test :msg {i}"))
            .await
            .unwrap();
    }
    // Nobody is receiving; the read loop waits on the full queue.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(conn.state(), ConnectionState::Ready);

    for i in 0..50 {
        let msg = timeout(Duration::from_secs(5), conn.receive())
            .await
            .expect("receive stalled")
            .expect("queue ended early");
        assert_eq!(msg.param(1), Some(format!("msg {i}").as_str()));
    }
    conn.close().await;
}

/// Keep sending until the connection refuses.
fn spawn_flood(conn: &Connection, tag: usize) -> tokio::task::JoinHandle<()> {
    let handle = conn.handle();
    tokio::spawn(async move {
        let filler = "x".repeat(400);
        for i in 0u64.. {
            let msg = Message::privmsg("#test", format!("{tag} {i} {filler}"));
            if handle.send(msg).await.is_err() {
                return;
            }
        }
    })
}

#[tokio::test]
async fn test_peer_reset_releases_blocked_senders() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let options = ConnectionOptions {
        queue_capacity: 2,
        ..test_options()
    };
    let (conn, peer) = connect_registered_with(&server, "bot", "#test", options).await;
    let mut state = conn.subscribe_state();

    // The peer never reads, so socket buffers and then the queue fill up.
    let senders: Vec<_> = (0..4).map(|tag| spawn_flood(&conn, tag)).collect();
    tokio::time::sleep(Duration::from_millis(300)).await;
    peer.reset().expect("Failed to reset");

    for sender in senders {
        timeout(Duration::from_secs(5), sender)
            .await
            .expect("sender still blocked after reset")
            .unwrap();
    }
    timeout(
        Duration::from_secs(2),
        state.wait_for(|s| matches!(s, ConnectionState::Failed(_))),
    )
    .await
    .expect("state did not reach Failed")
    .unwrap();
    assert!(conn.handle().is_closed());

    timeout(Duration::from_secs(5), conn.close())
        .await
        .expect("close hung after write failure");
    assert!(matches!(conn.state(), ConnectionState::Failed(_)));
}

#[tokio::test]
async fn test_write_failure_keeps_receiving() {
    let server = FakeIrcServer::bind().await.expect("Failed to bind");
    let options = ConnectionOptions {
        write_timeout: Duration::from_millis(300),
        queue_capacity: 4,
        ..test_options()
    };
    let (conn, mut peer) = connect_registered_with(&server, "bot", "#test", options).await;

    // The peer never reads, so a write eventually misses its deadline.
    let sender = spawn_flood(&conn, 0);
    timeout(Duration::from_secs(10), sender)
        .await
        .expect("sender never saw the write failure")
        .unwrap();
    match conn.state() {
        ConnectionState::Failed(reason) => assert!(reason.contains("write"), "{reason}"),
        other => panic!("Expected Failed, got {:?}", other),
    }
    assert!(matches!(
        conn.send(Message::ping("late")).await,
        Err(ConnectionError::Closed)
    ));

    // Only the write side is gone.
    peer.send_raw(":alice!u@h PRIVMSG #test :still here")
        .await
        .unwrap();
    let msg = timeout(Duration::from_secs(5), conn.receive())
        .await
        .expect("receive stalled")
        .expect("receive ended with the write side");
    assert_eq!(msg.param(1), Some("still here"));

    conn.close().await;
}
