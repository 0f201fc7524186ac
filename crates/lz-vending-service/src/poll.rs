//! Cancellable, bounded polling.
//!
//! Every wait inside a step goes through [`Cancellation::pause`], so a cancelled
//! invocation stops at its next sleep instead of finishing its schedule.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use lz_vending_core::{ProvisionError, Result, RetryPolicy};

/// Sending half of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every [`Cancellation`] cloned from this handle's pair.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// A fresh receiver for this signal.
    #[must_use]
    pub fn token(&self) -> Cancellation {
        Cancellation {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving half of a cancellation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle and token.
#[must_use]
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancellation { rx })
}

impl Cancellation {
    /// A token that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // The handle is gone without cancelling.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Fail with [`ProvisionError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` for `operation` when the token is cancelled.
    pub fn check(&self, operation: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(ProvisionError::Cancelled { operation });
        }
        Ok(())
    }

    /// Sleep for `delay`, waking early with an error on cancellation.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` for `operation` when the token fires first.
    pub async fn pause(&self, delay: Duration, operation: &'static str) -> Result<()> {
        self.check(operation)?;
        let mut rx = self.clone();
        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            () = rx.cancelled() => Err(ProvisionError::Cancelled { operation }),
        }
    }
}

/// What one attempt observed.
#[derive(Debug)]
pub enum Attempt<T> {
    /// Terminal success.
    Done(T),
    /// Transitional state; the description is kept for diagnostics.
    Pending(String),
    /// Terminal failure.
    Failed(ProvisionError),
}

/// Run `attempt` until it is terminal, the schedule runs out, or `cancel` fires.
///
/// `attempt` receives the 1-based attempt number.
///
/// # Errors
///
/// Returns the attempt's own failure, `RetriesExhausted` carrying the last
/// pending observation, or `Cancelled`.
pub async fn poll_until<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &Cancellation,
    operation: &'static str,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut number = 1;
    loop {
        cancel.check(operation)?;
        match attempt(number).await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Failed(err) => return Err(err),
            Attempt::Pending(observed) => {
                if !policy.allows_after(number) {
                    return Err(ProvisionError::RetriesExhausted {
                        operation,
                        attempts: number,
                        last_error: observed,
                    });
                }
                let delay = policy.delay_after(number);
                debug!(operation, attempt = number, ?delay, %observed, "Not terminal yet");
                cancel.pause(delay, operation).await?;
                number += 1;
            }
        }
    }
}
