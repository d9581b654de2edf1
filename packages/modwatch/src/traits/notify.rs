//! Notification sink contract.
//!
//! The pipeline decides *what* to show and *when* to re-render; a gateway
//! implementation owns transmission. Delivery failures are surfaced as
//! [`NotifyError`](crate::error::NotifyError) and logged by callers — they
//! never roll back registry state.

use async_trait::async_trait;

use crate::error::NotifyResult;
use crate::types::message::{MessageHandle, RenderableMessage, ThreadHandle};

/// Delivers renderable messages to the chat platform.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver a message to a channel, returning a handle for later edits.
    async fn send(&self, channel_id: &str, message: RenderableMessage)
        -> NotifyResult<MessageHandle>;

    /// Replace a previously delivered message in place.
    async fn edit(&self, handle: &MessageHandle, message: RenderableMessage) -> NotifyResult<()>;

    /// Spawn a discussion thread off a delivered message.
    async fn create_thread(
        &self,
        handle: &MessageHandle,
        title: &str,
    ) -> NotifyResult<ThreadHandle>;
}
