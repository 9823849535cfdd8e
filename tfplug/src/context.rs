//! Request-scoped context
//!
//! Every trait method receives a `Context` first. It carries the host's
//! cancellation signal and an optional deadline. Providers may check it
//! between remote calls; nothing in the framework cancels work on its own.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done_tx: watch::Sender<bool>,
    done: watch::Receiver<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_deadline(None)
    }

    /// Context that reports cancellation once `timeout` has elapsed.
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let ctx = Self::with_deadline(Some(deadline));

        let done_tx = ctx.inner.done_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline.into()).await;
            let _ = done_tx.send(true);
        });

        ctx
    }

    fn with_deadline(deadline: Option<Instant>) -> Self {
        let (done_tx, done) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline,
                done_tx,
                done,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Receiver that flips to `true` when work should stop
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::with_timeout(Duration::from_millis(50));

        assert!(!ctx.is_cancelled());
        sleep(Duration::from_millis(120)).await;
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel_is_shared_by_clones() {
        let ctx = Context::new();
        let clone = ctx.clone();

        clone.cancel();

        assert!(ctx.is_cancelled());
        assert!(*ctx.done().borrow());
    }

    #[tokio::test]
    async fn context_deadline() {
        assert!(Context::new().deadline().is_none());
        assert!(Context::with_timeout(Duration::from_secs(1))
            .deadline()
            .is_some());
    }

    #[test]
    fn done_receiver_observes_cancel() {
        let ctx = Context::new();
        let mut done = ctx.done();

        tokio_test::block_on(async {
            ctx.cancel();
            done.changed().await.unwrap();
        });

        assert!(*done.borrow());
    }
}
