//! Message dispatch port trait

use async_trait::async_trait;

use crate::error::DispatchError;

/// Delivers one text to one recipient on the outreach channel
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    async fn dispatch(&self, recipient: &str, text: &str) -> Result<(), DispatchError>;
}
