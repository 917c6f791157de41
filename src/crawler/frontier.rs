//! Frontier queue
//!
//! The bounded mailbox of URLs waiting to be fetched. It is the only hand-off
//! between the revisit filter and the fetcher, and its capacity is the single
//! admission-control bound of the crawl loop.

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Bounded, cancellable queue of pending URLs
///
/// The frontier keeps its own sender alive, so the queue never closes; consumers
/// only stop when their cancellation token fires or their count is reached.
pub struct Frontier {
    tx: mpsc::Sender<String>,
    rx: Mutex<mpsc::Receiver<String>>,
}

impl Frontier {
    /// Creates a frontier holding at most `capacity` URLs
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Moves up to `count` URLs from `source` into the queue
    ///
    /// Suspends while the queue is full. Stops early when `source` ends or
    /// `cancel` fires.
    ///
    /// # Returns
    ///
    /// The number of URLs transferred
    pub async fn push<S>(&self, cancel: &CancellationToken, count: usize, mut source: S) -> usize
    where
        S: Stream<Item = String> + Unpin,
    {
        let mut pushed = 0;

        while pushed < count {
            let link = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = source.next() => match next {
                    Some(link) => link,
                    None => break,
                },
            };

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Frontier push cancelled while full, {} not queued", link);
                    break;
                }
                permit = self.tx.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            permit.send(link);
            pushed += 1;
        }

        pushed
    }

    /// Returns a stream of up to `count` URLs taken from the queue
    ///
    /// The stream suspends while the queue is empty and ends as soon as
    /// `cancel` fires. Concurrent poppers take turns on the receiver.
    pub fn pop<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        count: usize,
    ) -> impl Stream<Item = String> + 'a {
        stream::unfold(0usize, move |taken| async move {
            if taken >= count {
                return None;
            }

            let mut rx = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                rx = self.rx.lock() => rx,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                link = rx.recv() => link.map(|link| (link, taken + 1)),
            }
        })
    }

    /// Number of URLs currently queued
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}
