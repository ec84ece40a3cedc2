//! Per-request operation contexts.
//!
//! axum drops a handler future when its client disconnects. The
//! [`RequestContext`] guard lives inside that future, so dropping it before
//! [`RequestContext::finish`] cancels whatever the service is still doing on
//! the request's behalf: a store call, or a pending verifier reply.

use shared_types::{CancelHandle, OperationContext};
use std::time::Duration;
use tracing::debug;

/// Operation context owned by one HTTP request.
pub struct RequestContext {
    ctx: OperationContext,
    handle: CancelHandle,
    finished: bool,
}

impl RequestContext {
    /// Derive a context from the server-wide `root` with its own deadline.
    pub fn new(root: &OperationContext, timeout: Duration) -> Self {
        let (handle, ctx) = root.linked(timeout);
        Self {
            ctx,
            handle,
            finished: false,
        }
    }

    pub fn ctx(&self) -> &OperationContext {
        &self.ctx
    }

    /// Mark the request as answered.
    pub fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Request abandoned before completion, cancelling its operation");
        }
        // Always release anything still listening on the context.
        self.handle.cancel();
    }
}
