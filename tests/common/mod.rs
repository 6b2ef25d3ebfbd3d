//! Integration test common infrastructure.
//!
//! Provides a scripted transport factory, the server end of an in-memory
//! connection, and recording routers/listeners for asserting on dispatch.

#![allow(dead_code)]

pub mod factory;
pub mod recorder;
pub mod server;

use std::time::Duration;

use slirc_link::{LinkConfig, LinkState};
use tokio::sync::watch;
use tokio::time::timeout;

#[allow(unused_imports)]
pub use factory::MockFactory;
#[allow(unused_imports)]
pub use recorder::{RecordingListener, RecordingRouter};
#[allow(unused_imports)]
pub use server::FakeServer;

/// How long any single wait in a test may take.
pub const WAIT: Duration = Duration::from_secs(5);

/// State waits may span several reconnect delays on a paused clock.
pub const STATE_WAIT: Duration = Duration::from_secs(120);

/// Defaults, with a short reconnect delay.
pub fn test_config() -> LinkConfig {
    let mut config = LinkConfig::new("mock");
    config.reconnect_delay = 1;
    config
}

/// Wait until the manager reports `state`.
pub async fn wait_for_state(rx: &mut watch::Receiver<LinkState>, state: LinkState) {
    timeout(STATE_WAIT, rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state}"))
        .expect("state channel closed");
}

/// Poll `cond` until it holds.
pub async fn eventually(what: &str, cond: impl Fn() -> bool) {
    let polled = timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}
