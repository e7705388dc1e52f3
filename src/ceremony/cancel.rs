//! Cooperative cancellation and deadlines for ceremony steps

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use super::errors::{CeremonyError, CeremonyStep};

/// Receiving side of a cancellation request
///
/// Cloning is cheap; every clone observes the same request.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

/// Sending side of a cancellation request
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Create a linked cancel handle and signal
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx: Some(rx) })
}

impl CancelHandle {
    /// Request cancellation of every ceremony observing the linked signal
    pub fn cancel(&self) {
        // send_replace never fails, even with no receivers left
        self.tx.send_replace(true);
    }
}

impl CancelSignal {
    /// A signal that never fires
    #[must_use]
    pub fn never() -> Self {
        Self { rx: None }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is requested
    ///
    /// Dropping the handle without cancelling leaves this pending forever.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Run one ceremony step under a deadline and a cancellation signal
pub(crate) async fn bounded<T, F>(
    step: CeremonyStep,
    deadline: Duration,
    cancel: &CancelSignal,
    fut: F,
) -> Result<T, CeremonyError>
where
    F: Future<Output = Result<T, CeremonyError>>,
{
    if cancel.is_cancelled() {
        return Err(CeremonyError::Cancelled { step });
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CeremonyError::Cancelled { step }),
        result = tokio::time::timeout(deadline, fut) => match result {
            Ok(inner) => inner,
            Err(_) => Err(CeremonyError::Timeout { step, after: deadline }),
        },
    }
}
