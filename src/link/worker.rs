//! The supervised connect/read loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, StreamExt};
use slirc_wire::Normalizer;
use tokio::io::BufWriter;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{LinkHandle, LinkState, RawLineCodec};
use crate::error::DisconnectReason;
use crate::message::{Lifecycle, Message};
use crate::negotiation::Pipeline;
use crate::router::Router;

/// Run until `shutdown` is cancelled.
///
/// Nothing that happens inside a connection, panics included, ends this loop.
pub(super) async fn run(
    link: LinkHandle,
    pipeline: Arc<Pipeline>,
    router: Arc<dyn Router>,
    normalizer: Normalizer,
    delay: Duration,
    shutdown: CancellationToken,
) {
    info!("link worker started");
    let mut attempt: u64 = 0;

    while !shutdown.is_cancelled() {
        attempt += 1;
        link.set_state(LinkState::Connecting);
        let connection = shutdown.child_token();
        let generation = link.begin_connection(connection.clone());

        let outcome = AssertUnwindSafe(connect_and_read(
            &link,
            &pipeline,
            router.as_ref(),
            normalizer,
            &connection,
        ))
        .catch_unwind()
        .await;

        let reason = outcome.unwrap_or_else(|panic| {
            DisconnectReason::Unexpected(panic_message(panic.as_ref()))
        });
        log_disconnect(&reason, attempt);

        if link.state() == LinkState::Active {
            link.set_state(LinkState::Closing);
            let notified = AssertUnwindSafe(dispatch(
                &link,
                &pipeline,
                router.as_ref(),
                Lifecycle::Disconnection.into(),
            ))
            .catch_unwind()
            .await;
            if let Err(panic) = notified {
                error!(
                    reason = %panic_message(panic.as_ref()),
                    "panic while dispatching disconnection"
                );
            }
        } else {
            link.set_state(LinkState::Closing);
        }
        link.release_writer(generation).await;

        if shutdown.is_cancelled() {
            break;
        }
        debug!(delay_secs = delay.as_secs(), "waiting before reconnect");
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    link.set_state(LinkState::Terminated);
    info!("link worker stopped");
}

/// One connection, from open to the end of the read loop.
async fn connect_and_read(
    link: &LinkHandle,
    pipeline: &Pipeline,
    router: &dyn Router,
    normalizer: Normalizer,
    connection: &CancellationToken,
) -> DisconnectReason {
    let target = link.factory().describe();
    debug!(target = %target, "connecting");

    let stream = tokio::select! {
        _ = connection.cancelled() => return DisconnectReason::Stopped,
        opened = link.factory().open() => match opened {
            Ok(stream) => stream,
            Err(e) => return DisconnectReason::classify(e),
        },
    };

    let (read, write) = tokio::io::split(stream);
    link.install_writer(BufWriter::new(write)).await;
    link.set_state(LinkState::Active);
    info!(target = %target, "connected");

    dispatch(link, pipeline, router, Lifecycle::Connection.into()).await;
    link.flush().await;

    let mut lines = FramedRead::new(read, RawLineCodec::new());
    loop {
        let next = tokio::select! {
            biased;
            _ = connection.cancelled() => return DisconnectReason::Stopped,
            next = lines.next() => next,
        };

        let bytes = match next {
            None => return DisconnectReason::Closed,
            Some(Err(e)) => return DisconnectReason::classify(e),
            Some(Ok(bytes)) => bytes,
        };

        let text = normalizer.normalize(&bytes);
        if text.trim().is_empty() {
            continue;
        }
        debug!(direction = "in", line = %text);

        dispatch(link, pipeline, router, Message::inbound(text.into_owned())).await;
        link.flush().await;
    }
}

/// Route `message`, then anything the listeners queued while handling it.
async fn dispatch(link: &LinkHandle, pipeline: &Pipeline, router: &dyn Router, message: Message) {
    router.dispatch(&message, pipeline, link).await;
    while let Some(event) = link.take_synthetic() {
        router.dispatch(&Message::Synthetic(event), pipeline, link).await;
    }
}

fn log_disconnect(reason: &DisconnectReason, attempt: u64) {
    let code = reason.code();
    match reason {
        DisconnectReason::Stopped => info!(code, attempt, "connection stopped"),
        DisconnectReason::Closed => info!(code, attempt, "{}", reason),
        DisconnectReason::Unexpected(_) => error!(code, attempt, "{}", reason),
        _ => warn!(code, attempt, "{}", reason),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
