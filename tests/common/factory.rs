//! Scripted transport factory.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use slirc_link::{BoxedStream, TransportFactory};
use tokio::io::DuplexStream;
use tokio::time::Instant;

use super::FakeServer;

enum Outcome {
    Fail(io::ErrorKind),
    Serve(DuplexStream),
}

/// Hands out scripted outcomes, one per `open`, then refuses.
#[derive(Default)]
pub struct MockFactory {
    script: Mutex<VecDeque<Outcome>>,
    attempts: Mutex<Vec<Instant>>,
    successes: AtomicUsize,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a failed open.
    pub fn fail(&self, kind: io::ErrorKind) {
        self.script.lock().push_back(Outcome::Fail(kind));
    }

    /// Queue a successful open; returns the server end.
    pub fn serve(&self) -> FakeServer {
        self.serve_with_capacity(64 * 1024)
    }

    /// Like [`serve`](Self::serve), with a pipe that holds only `capacity`
    /// unread bytes in each direction.
    pub fn serve_with_capacity(&self, capacity: usize) -> FakeServer {
        let (client, server) = tokio::io::duplex(capacity);
        self.script.lock().push_back(Outcome::Serve(client));
        FakeServer::new(server)
    }

    /// When each `open` was called.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    pub fn logical_successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn open(&self) -> io::Result<BoxedStream> {
        self.attempts.lock().push(Instant::now());
        let next = self.script.lock().pop_front();
        match next {
            Some(Outcome::Serve(stream)) => Ok(Box::new(stream)),
            Some(Outcome::Fail(kind)) => Err(io::Error::from(kind)),
            None => Err(io::Error::from(io::ErrorKind::ConnectionRefused)),
        }
    }

    fn logical_success(&self) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
