//! Credit-based sliding window for chunked transfers.

use std::collections::VecDeque;
use std::future::Future;
use tokio::task::JoinHandle;

use crate::envelope::Fault;

/// Keeps at most `limit` transfer calls in flight.
///
/// [`Window::push`] starts a call and, once the window is full, waits for the
/// oldest outstanding call before returning its result. Results therefore come
/// back in submission order. Dropping the window aborts whatever is still in
/// flight, which is how a failed transfer abandons its remaining chunks.
pub struct Window<T> {
    limit: usize,
    in_flight: VecDeque<JoinHandle<Result<T, Fault>>>,
}

impl<T: Send + 'static> Window<T> {
    /// Creates a window; a zero limit is treated as one.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            in_flight: VecDeque::with_capacity(limit.max(1)),
        }
    }

    /// Number of calls currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Starts `call`; when that fills the window, awaits the oldest call.
    ///
    /// # Errors
    ///
    /// Returns the oldest call's fault, or [`Fault::Invocation`] if its task panicked.
    pub async fn push<F>(&mut self, call: F) -> Result<Option<T>, Fault>
    where
        F: Future<Output = Result<T, Fault>> + Send + 'static,
    {
        self.in_flight.push_back(tokio::spawn(call));
        if self.in_flight.len() >= self.limit {
            return self.pop_oldest().await;
        }
        Ok(None)
    }

    /// Awaits every remaining call in submission order.
    ///
    /// # Errors
    ///
    /// Returns the first fault encountered; later calls are aborted.
    pub async fn drain(mut self) -> Result<Vec<T>, Fault> {
        let mut results = Vec::with_capacity(self.in_flight.len());
        while let Some(result) = self.pop_oldest().await? {
            results.push(result);
        }
        Ok(results)
    }

    async fn pop_oldest(&mut self) -> Result<Option<T>, Fault> {
        let Some(handle) = self.in_flight.pop_front() else {
            return Ok(None);
        };
        match handle.await {
            Ok(result) => result.map(Some),
            Err(e) => Err(Fault::Invocation(format!("transfer task failed: {e}"))),
        }
    }
}

impl<T> Drop for Window<T> {
    fn drop(&mut self) {
        for handle in &self.in_flight {
            handle.abort();
        }
    }
}
