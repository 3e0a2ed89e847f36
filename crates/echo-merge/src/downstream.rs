// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Downstream side of a merge: demand signalling and delivery.
//!
//! The consumer grants credit with [`Downstream::request`], receives
//! [`Delivery`] values, and may withdraw permanently with
//! [`Downstream::cancel`]. It never pushes elements back.

use tokio::sync::mpsc;

use crate::error::MergeError;

/// Signals flowing from the consumer to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DownstreamSignal {
    /// Grants `n` more elements of credit.
    Request(u64),
    /// Permanently withdraws demand.
    Cancel,
}

/// What the driver hands to the consumer.
#[derive(Debug)]
pub enum Delivery<T> {
    /// One merged element.
    Element(T),
    /// The merge finished normally; nothing follows.
    Complete,
    /// The merge failed; nothing follows.
    Error(MergeError),
}

/// Downstream credit owned by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Demand(u64);

impl Demand {
    /// Remaining credit.
    #[inline]
    pub fn remaining(self) -> u64 {
        self.0
    }

    /// True when at least one element may be emitted.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Adds credit, saturating at `u64::MAX`.
    #[inline]
    pub fn grant(&mut self, n: u64) {
        self.0 = self.0.saturating_add(n);
    }

    /// Consumes one unit of credit. Returns false if none was left.
    #[inline]
    pub fn consume(&mut self) -> bool {
        match self.0.checked_sub(1) {
            Some(rest) => {
                self.0 = rest;
                true
            }
            None => false,
        }
    }
}

/// Handle the embedding system uses to cancel a merge it does not consume.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    signals: mpsc::UnboundedSender<DownstreamSignal>,
}

impl CancelHandle {
    /// Requests cancellation. Has no effect once the merge has terminated.
    pub fn cancel(&self) {
        let _ = self.signals.send(DownstreamSignal::Cancel);
    }
}

/// Consumer end of a merge.
#[derive(Debug)]
pub struct Downstream<T> {
    signals: mpsc::UnboundedSender<DownstreamSignal>,
    deliveries: mpsc::UnboundedReceiver<Delivery<T>>,
    cancelled: bool,
}

/// Driver-side ends of the downstream channels.
pub(crate) struct DownstreamLink<T> {
    pub(crate) signals: mpsc::UnboundedReceiver<DownstreamSignal>,
    pub(crate) deliveries: mpsc::UnboundedSender<Delivery<T>>,
}

pub(crate) fn link<T>() -> (Downstream<T>, DownstreamLink<T>) {
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
    (
        Downstream {
            signals: signal_tx,
            deliveries: delivery_rx,
            cancelled: false,
        },
        DownstreamLink {
            signals: signal_rx,
            deliveries: delivery_tx,
        },
    )
}

impl<T> Downstream<T> {
    /// Grants `n` more elements of demand. Zero is ignored.
    pub fn request(&self, n: u64) {
        if n == 0 || self.cancelled {
            return;
        }
        let _ = self.signals.send(DownstreamSignal::Request(n));
    }

    /// Permanently withdraws demand. Calling it again, or after the merge
    /// terminated, has no further effect.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        let _ = self.signals.send(DownstreamSignal::Cancel);
    }

    /// True once [`Downstream::cancel`] has been called.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Returns a handle that can cancel the merge from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            signals: self.signals.clone(),
        }
    }

    /// Waits for the next delivery. `None` means the driver is gone without a
    /// terminal signal (cancelled or dropped).
    pub async fn recv(&mut self) -> Option<Delivery<T>> {
        self.deliveries.recv().await
    }

    /// Returns a delivery that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Delivery<T>> {
        self.deliveries.try_recv().ok()
    }

    /// Drains the merge, requesting `batch` elements at a time, and returns
    /// everything it produced.
    ///
    /// A merge that ends without a terminal signal (cancelled elsewhere)
    /// yields the elements received so far.
    pub async fn collect(mut self, batch: u64) -> Result<Vec<T>, MergeError> {
        let batch = batch.max(1);
        let mut out = Vec::new();
        let mut outstanding = 0_u64;
        loop {
            if outstanding == 0 {
                self.request(batch);
                outstanding = batch;
            }
            match self.recv().await {
                Some(Delivery::Element(element)) => {
                    out.push(element);
                    outstanding = outstanding.saturating_sub(1);
                }
                Some(Delivery::Complete) | None => return Ok(out),
                Some(Delivery::Error(err)) => return Err(err),
            }
        }
    }
}
