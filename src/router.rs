//! Router seam.
//!
//! The worker hands every message, together with the negotiation pipeline, to
//! a [`Router`]. A router must let the pipeline observe the message before any
//! of its own subscribers do.

use async_trait::async_trait;

use crate::link::LinkHandle;
use crate::message::Message;
use crate::negotiation::Pipeline;

/// Final dispatch of inbound and synthetic messages.
#[async_trait]
pub trait Router: Send + Sync + 'static {
    /// Handle one message. The worker won't read the next line until this
    /// returns.
    async fn dispatch(&self, message: &Message, pipeline: &Pipeline, link: &LinkHandle);
}

/// Runs the negotiation pipeline and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineRouter;

#[async_trait]
impl Router for PipelineRouter {
    async fn dispatch(&self, message: &Message, pipeline: &Pipeline, link: &LinkHandle) {
        pipeline.observe(message, link).await;
    }
}
