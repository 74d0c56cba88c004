//! One-shot completion bridge between backend workers and blocking callers.
//!
//! Every backend operation completes exactly once, on an arbitrary worker
//! thread owned by the backend implementation. The bridge marshals that
//! single result back to the issuing thread: the worker holds a
//! [`Completer`], the caller blocks on the matching [`Completion`]. One
//! channel per call, used exactly once.
//!
//! There is no cancellation. Dropping a [`Completion`] abandons the result
//! but the operation still runs; dropping a [`Completer`] without answering
//! surfaces [`Error::OperationCanceled`] to the waiter instead of hanging it.

use tokio::sync::oneshot;

use crate::error::Error;

/// Producer half: completes the operation exactly once, by move.
pub struct Completer<T> {
    tx: oneshot::Sender<Result<T, Error>>,
}

/// Consumer half: blocks the calling thread until the result arrives.
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T, Error>>,
}

/// Allocate a fresh completer/completion pair for one operation.
pub fn completion<T>() -> (Completer<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, Completion { rx })
}

impl<T> Completer<T> {
    /// Deliver a successful result.
    pub fn succeed(self, value: T) {
        // Receiver may have been abandoned; the result is then discarded
        let _ = self.tx.send(Ok(value));
    }

    /// Deliver a failure.
    pub fn fail(self, error: Error) {
        let _ = self.tx.send(Err(error));
    }

    /// Deliver an already-formed result.
    pub fn complete(self, result: Result<T, Error>) {
        let _ = self.tx.send(result);
    }
}

impl<T> Completion<T> {
    /// Build a completion that is already resolved.
    ///
    /// For backend paths that fail synchronously, before any worker is
    /// involved; the channel is still allocated and consumed exactly once,
    /// so nothing leaks.
    pub fn resolved(result: Result<T, Error>) -> Self {
        let (completer, completion) = completion();
        completer.complete(result);
        completion
    }

    /// Suspend the calling thread until the worker delivers the result.
    ///
    /// Only this thread suspends; completion delivery happens on whatever
    /// thread the backend uses.
    ///
    /// # Errors
    ///
    /// - [`Error::OperationCanceled`] if the completer was dropped without
    ///   ever delivering a result
    /// - otherwise, whatever the worker delivered
    pub fn wait(self) -> Result<T, Error> {
        self.rx.blocking_recv().unwrap_or_else(|_| {
            Err(Error::OperationCanceled(
                "operation dropped before delivering a result".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn result_crosses_threads() {
        let (completer, completion) = completion();

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            completer.succeed(42u32);
        });

        assert_eq!(completion.wait(), Ok(42));
    }

    #[test]
    fn failure_crosses_threads() {
        let (completer, completion) = completion::<()>();

        thread::spawn(move || {
            completer.fail(Error::NetworkError("unreachable".to_string()));
        });

        assert_eq!(completion.wait(), Err(Error::NetworkError("unreachable".to_string())));
    }

    #[test]
    fn dropped_completer_yields_canceled_not_hang() {
        let (completer, completion) = completion::<u32>();
        drop(completer);

        assert!(matches!(completion.wait(), Err(Error::OperationCanceled(_))));
    }

    #[test]
    fn abandoned_completion_does_not_block_the_worker() {
        let (completer, completion) = completion();
        drop(completion);

        // send on a closed one-shot discards the value without blocking
        completer.succeed(7u32);
    }

    #[test]
    fn resolved_completion_waits_immediately() {
        let completion = Completion::resolved(Ok("done"));
        assert_eq!(completion.wait(), Ok("done"));

        let completion: Completion<()> =
            Completion::resolved(Err(Error::InvalidArgument("bad".to_string())));
        assert!(matches!(completion.wait(), Err(Error::InvalidArgument(_))));
    }
}
