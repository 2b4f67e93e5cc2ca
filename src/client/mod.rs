//! Reporting service client.
//!
//! Every call returns immediately. Start calls hand back the id of the new
//! item right away, and every call hands back a [`PendingOp`] that settles
//! once the service has answered. Implementations keep creation order: a child
//! is never sent before its parent exists.

pub mod error;
pub mod http;
pub mod recording;
pub mod request;

pub use error::ClientError;
pub use http::{HttpClient, HttpClientConfig};
pub use recording::{ClientCall, RecordingClient};
pub use request::{
    Attachment, FinishLaunchRq, FinishTestItemRq, Issue, ItemAttribute, ItemStatus, ItemType,
    LaunchFinished, LaunchMode, LogLevel, SaveLogRq, StartLaunchRq, StartTestItemRq,
};

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Identifier of a launch or a test item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to an in-flight call
#[must_use = "pending operations must be awaited or handed to the reporter"]
pub struct PendingOp<T = ()> {
    inner: BoxFuture<'static, Result<T, ClientError>>,
}

impl<T: Send + 'static> PendingOp<T> {
    pub fn new(fut: impl Future<Output = Result<T, ClientError>> + Send + 'static) -> Self {
        Self { inner: fut.boxed() }
    }

    /// Operation that has already settled
    pub fn ready(result: Result<T, ClientError>) -> Self {
        Self::new(futures::future::ready(result))
    }
}

impl<T> Future for PendingOp<T> {
    type Output = Result<T, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T> fmt::Debug for PendingOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOp").finish_non_exhaustive()
    }
}

/// Result of a start call
#[derive(Debug)]
pub struct Started {
    pub id: ItemId,
    pub pending: PendingOp,
}

/// Remote reporting service operations
pub trait ReportingClient: Send + Sync {
    /// Start a launch, or adopt the one named by `rq.id`
    fn start_launch(&self, rq: StartLaunchRq) -> Started;

    /// Start an item under `parent`, or at the launch root when there is none
    fn start_test_item(
        &self,
        rq: StartTestItemRq,
        launch_id: &ItemId,
        parent_id: Option<&ItemId>,
    ) -> Started;

    fn finish_test_item(&self, item_id: &ItemId, rq: FinishTestItemRq) -> PendingOp;

    fn send_log(&self, item_id: &ItemId, rq: SaveLogRq, file: Option<Attachment>) -> PendingOp;

    fn finish_launch(&self, launch_id: &ItemId, rq: FinishLaunchRq) -> PendingOp<LaunchFinished>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_op_ready() {
        let op: PendingOp<u32> = PendingOp::ready(Ok(7));
        assert_eq!(op.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_pending_op_error() {
        let op: PendingOp = PendingOp::ready(Err(ClientError::Aborted("gone".to_string())));
        assert!(matches!(op.await, Err(ClientError::Aborted(_))));
    }

    #[test]
    fn test_item_id_display() {
        assert_eq!(ItemId::new("step-3").to_string(), "step-3");
    }
}
