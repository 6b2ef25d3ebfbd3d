//! Integration tests for the supervised connection lifecycle.
//!
//! Covers reconnection after failed opens, permanent and non-permanent stop,
//! stopping from inside the worker, and stopping while the peer has stopped
//! reading.

mod common;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{FakeServer, MockFactory, WAIT, eventually, test_config, wait_for_state};
use slirc_link::{
    LinkError, LinkHandle, LinkManager, LinkState, Listener, ListenerError, Message, Pipeline,
    PipelineRouter,
};
use tokio::time::timeout;

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_failed_opens() {
    let factory = MockFactory::new();
    for _ in 0..3 {
        factory.fail(io::ErrorKind::ConnectionRefused);
    }
    let mut server = factory.serve();

    let mut config = test_config();
    config.reconnect_delay = 15;
    let manager = LinkManager::new(config, factory.clone());
    let mut state = manager.subscribe_state();
    manager.start();

    wait_for_state(&mut state, LinkState::Active).await;

    let attempts = factory.attempts();
    assert_eq!(attempts.len(), 4, "3 failures + 1 success");
    for pair in attempts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(15));
    }
    assert!(manager.start_time().is_some());

    server.expect("CAP LS 302").await;
    manager.stop(true).await;
    assert_eq!(manager.state(), LinkState::Terminated);
    server.assert_closed().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_opens_dont_dispatch_disconnection() {
    let factory = MockFactory::new();
    factory.fail(io::ErrorKind::HostUnreachable);
    factory.fail(io::ErrorKind::ConnectionReset);
    let _server = factory.serve();

    let router = common::RecordingRouter::new();
    let manager = LinkManager::with_router(test_config(), factory.clone(), router.clone());
    let mut state = manager.subscribe_state();
    manager.start();

    wait_for_state(&mut state, LinkState::Active).await;
    common::eventually("connection dispatched", || !router.seen().is_empty()).await;
    assert_eq!(router.seen(), vec!["connection"]);

    manager.stop(true).await;
}

#[tokio::test]
async fn test_non_permanent_stop_reconnects() {
    let factory = MockFactory::new();
    let mut first = factory.serve();
    let mut second = factory.serve();

    let manager = LinkManager::new(test_config(), factory.clone());
    manager.start();

    first.expect("CAP LS 302").await;
    manager.stop(false).await;
    first.assert_closed().await;

    second.expect("CAP LS 302").await;
    assert_eq!(factory.attempts().len(), 2);
    assert!(manager.handle().is_running());

    manager.stop(true).await;
    assert_eq!(manager.state(), LinkState::Terminated);
}

#[tokio::test]
async fn test_server_close_reconnects() {
    let factory = MockFactory::new();
    let mut first = factory.serve();
    let mut second = factory.serve();

    let manager = LinkManager::new(test_config(), factory.clone());
    manager.start();

    first.register().await;
    assert!(manager.handle().with_session(|s| s.logged_in));
    drop(first);

    second.expect("CAP LS 302").await;
    // Session state starts over on the new connection.
    common::eventually("session reset", || {
        !manager.handle().with_session(|s| s.logged_in)
    })
    .await;

    manager.stop(true).await;
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let factory = MockFactory::new();
    let mut server = factory.serve();

    let manager = LinkManager::new(test_config(), factory.clone());
    let mut state = manager.subscribe_state();
    manager.start();
    manager.start();

    wait_for_state(&mut state, LinkState::Active).await;
    server.expect("CAP LS 302").await;
    server.sync().await;
    assert_eq!(factory.attempts().len(), 1);

    manager.stop(true).await;
    assert!(!manager.handle().is_running());
}

#[tokio::test]
async fn test_stop_before_start() {
    let manager = LinkManager::new(test_config(), MockFactory::new());
    manager.stop(true).await;
    assert_eq!(manager.state(), LinkState::Idle);
}

#[tokio::test]
async fn test_restart_after_permanent_stop() {
    let factory = MockFactory::new();
    let mut first = factory.serve();
    let mut second = factory.serve();

    let manager = LinkManager::new(test_config(), factory.clone());
    manager.start();
    first.expect("CAP LS 302").await;
    manager.stop(true).await;
    first.assert_closed().await;

    manager.start();
    second.expect("CAP LS 302").await;
    manager.stop(true).await;
}

/// Stops the link for good on `die`, stalls on `stall`; either way it then
/// holds the worker for `linger`.
struct DieListener {
    linger: Duration,
}

impl DieListener {
    fn pipeline(linger: Duration) -> Pipeline {
        Pipeline::new(vec![Arc::new(DieListener { linger })])
    }
}

#[async_trait]
impl Listener for DieListener {
    fn name(&self) -> &'static str {
        "die"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        match message.line().and_then(|l| l.trailing()) {
            Some("die") => link.stop(true).await,
            Some("stall") => {}
            _ => return Ok(()),
        }
        tokio::time::sleep(self.linger).await;
        Ok(())
    }
}

fn die_manager(factory: Arc<MockFactory>, linger: Duration) -> LinkManager {
    LinkManager::with_pipeline(
        test_config(),
        factory,
        DieListener::pipeline(linger),
        Arc::new(PipelineRouter),
    )
}

#[tokio::test]
async fn test_self_stop_from_worker() {
    let factory = MockFactory::new();
    let mut server: FakeServer = factory.serve();

    let manager = die_manager(factory.clone(), Duration::ZERO);
    let mut state = manager.subscribe_state();
    manager.start();
    wait_for_state(&mut state, LinkState::Active).await;

    server.send(":admin!a@h PRIVMSG bot :die").await;

    wait_for_state(&mut state, LinkState::Terminated).await;
    server.assert_closed().await;
    let handle = manager.handle();
    eventually("worker exit", || !handle.is_running()).await;
    assert_eq!(factory.attempts().len(), 1);

    // Already stopped: returns straight away.
    manager.stop(true).await;
}

#[tokio::test]
async fn test_restart_while_self_stop_winds_down() {
    let factory = MockFactory::new();
    let mut first = factory.serve();
    let mut second = factory.serve();

    let manager = die_manager(factory.clone(), Duration::from_millis(300));
    let mut state = manager.subscribe_state();
    manager.start();
    wait_for_state(&mut state, LinkState::Active).await;

    first.send(":admin!a@h PRIVMSG bot :die").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The old worker is still inside the listener.
    assert!(manager.handle().is_running());
    manager.start();
    assert!(manager.handle().is_running());
    first.assert_closed().await;

    eventually("second connection", || factory.attempts().len() == 2).await;
    wait_for_state(&mut state, LinkState::Active).await;
    assert_eq!(manager.send_raw("PRIVMSG #chan :back").await.unwrap(), 19);
    second.expect("PRIVMSG #chan :back").await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(manager.state(), LinkState::Active);
    assert!(manager.send_raw("PRIVMSG #chan :still here").await.is_ok());
    second.expect("PRIVMSG #chan :still here").await;

    manager.stop(true).await;
    assert_eq!(manager.state(), LinkState::Terminated);
    assert!(!manager.handle().is_running());
}

#[tokio::test]
async fn test_concurrent_permanent_stops_wait_for_exit() {
    let factory = MockFactory::new();
    let mut server = factory.serve();

    let manager = die_manager(factory.clone(), Duration::from_millis(300));
    let mut state = manager.subscribe_state();
    manager.start();
    wait_for_state(&mut state, LinkState::Active).await;

    server.send(":admin!a@h PRIVMSG bot :stall").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let handle = manager.handle();
    let first = tokio::spawn(async move { handle.stop(true).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    manager.stop(true).await;
    assert!(!manager.handle().is_running());
    assert_eq!(manager.state(), LinkState::Terminated);
    first.await.unwrap();
}

#[tokio::test]
async fn test_permanent_stop_unblocks_stalled_peer() {
    let factory = MockFactory::new();
    // Never read: the registration burst fills the pipe and the flush stalls.
    let _server = factory.serve_with_capacity(16);

    let manager = LinkManager::new(test_config(), factory.clone());
    let mut state = manager.subscribe_state();
    manager.start();
    wait_for_state(&mut state, LinkState::Active).await;

    let handle = manager.handle();
    let blocked = tokio::spawn(async move { handle.send_raw("PRIVMSG #chan :stuck").await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished());

    timeout(WAIT, manager.stop(true))
        .await
        .expect("stop(true) hung behind a blocked write");
    assert_eq!(manager.state(), LinkState::Terminated);
    assert!(matches!(blocked.await.unwrap(), Err(LinkError::NotConnected)));
}
