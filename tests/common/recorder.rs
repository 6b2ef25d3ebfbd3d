//! Recording router and listener.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use slirc_link::{LinkHandle, Listener, ListenerError, Message, Pipeline, Router};

/// Short label for a message: lifecycle name or raw line.
pub fn label(message: &Message) -> String {
    match message {
        Message::Inbound(inbound) => inbound.raw.clone(),
        Message::Synthetic(event) => event.as_str().to_string(),
    }
}

/// Runs the pipeline, then records the message.
#[derive(Default)]
pub struct RecordingRouter {
    seen: Mutex<Vec<String>>,
    busy: AtomicBool,
    overlapped: AtomicBool,
    delay: Duration,
}

impl RecordingRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold every dispatch for `delay` after the pipeline ran.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    /// Whether a dispatch ever started while another was running.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Router for RecordingRouter {
    async fn dispatch(&self, message: &Message, pipeline: &Pipeline, link: &LinkHandle) {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        pipeline.observe(message, link).await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.seen.lock().push(label(message));
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Records every message it observes.
#[derive(Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Listener for RecordingListener {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn observe(&self, message: &Message, _link: &LinkHandle) -> Result<(), ListenerError> {
        self.seen.lock().push(label(message));
        Ok(())
    }
}
