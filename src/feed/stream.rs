//! Cancellable release streams
//!
//! A feed hands the consumer a [`ReleaseStream`] and keeps the matching
//! [`ReleaseSender`] inside a spawned producer task. The channel between them
//! holds a single item, so the producer never runs more than one release
//! ahead of the consumer. Cancellation is broadcast through a watch channel
//! that the producer races against every send.

use crate::error::{Error, Result};
use crate::types::Release;
use std::future::Future;
use tokio::sync::{mpsc, watch};

/// Consumer half of a release stream
#[derive(Debug)]
pub struct ReleaseStream {
    rx: mpsc::Receiver<Result<Release>>,
    cancel: watch::Sender<bool>,
}

/// Producer half of a release stream
#[derive(Debug)]
pub struct ReleaseSender {
    tx: mpsc::Sender<Result<Release>>,
    cancelled: watch::Receiver<bool>,
    remaining: Option<usize>,
}

impl ReleaseStream {
    /// Create a connected sender/stream pair
    ///
    /// `limit` caps how many releases the sender will deliver.
    pub fn channel(limit: Option<usize>) -> (ReleaseSender, Self) {
        let (tx, rx) = mpsc::channel(1);
        let (cancel, cancelled) = watch::channel(false);
        (
            ReleaseSender {
                tx,
                cancelled,
                remaining: limit,
            },
            Self { rx, cancel },
        )
    }

    /// Run `producer` on the runtime and return the stream it feeds
    pub fn spawn<F, Fut>(limit: Option<usize>, producer: F) -> Self
    where
        F: FnOnce(ReleaseSender) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, stream) = Self::channel(limit);
        tokio::spawn(producer(tx));
        stream
    }

    /// A stream that yields the given releases in order
    pub fn from_releases(releases: Vec<Release>) -> Self {
        Self::spawn(None, |mut tx| async move {
            for release in releases {
                if !tx.send(release).await {
                    return;
                }
            }
        })
    }

    /// A stream that fails immediately with `err`
    pub fn failed(err: Error) -> Self {
        Self::spawn(None, |tx| async move {
            tx.fail(err).await;
        })
    }

    /// Receive the next release
    ///
    /// Returns `None` once the producer is done or the stream was cancelled.
    pub async fn next(&mut self) -> Option<Result<Release>> {
        if self.is_cancelled() {
            return None;
        }
        self.rx.recv().await
    }

    /// Ask the producer to stop; safe to call more than once
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
        tracing::trace!("release stream cancelled");
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

impl Drop for ReleaseStream {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

impl ReleaseSender {
    /// Deliver one release
    ///
    /// Returns `false` when the producer should stop: the consumer cancelled
    /// or went away, or the limit has been reached.
    pub async fn send(&mut self, release: Release) -> bool {
        if self.remaining == Some(0) || self.is_cancelled() {
            return false;
        }

        tokio::select! {
            biased;
            _ = self.cancelled.wait_for(|c| *c) => return false,
            sent = self.tx.send(Ok(release)) => {
                if sent.is_err() {
                    return false;
                }
            }
        }

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                return false;
            }
        }
        true
    }

    /// Deliver a terminal error; nothing can be sent afterwards
    pub async fn fail(mut self, err: Error) {
        if self.is_cancelled() {
            return;
        }
        tokio::select! {
            biased;
            _ = self.cancelled.wait_for(|c| *c) => {}
            _ = self.tx.send(Err(err)) => {}
        }
    }

    /// Whether the consumer has cancelled
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow() || self.tx.is_closed()
    }
}
