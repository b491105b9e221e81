//! Cancellation and deadline scope for a single call.
//!
//! # Design
//! A `Context` pairs a `CancellationToken` with an optional deadline. Derived
//! contexts use child tokens, so cancelling a parent reaches every child but
//! not the other way round, and a child never outlives its parent's deadline.
//! The executor races its network work against `Context::done`.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A child context, cancelled together with `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// A child context that also expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut ctx = self.child();
        ctx.deadline = Some(match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        });
        ctx
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `None` while the context is live.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(at) if at <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => ContextError::Canceled,
            _ = expire(self.deadline) => ContextError::DeadlineExceeded,
        }
    }

    /// Drives `fut` until it completes or the context finishes, whichever
    /// comes first. The losing future is dropped.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
