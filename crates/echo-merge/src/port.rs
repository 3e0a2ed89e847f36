// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Upstream ports: demand-gated element sources owned by a merge driver.
//!
//! A port wraps one upstream stream and buffers at most one signal pulled from
//! it (an element, a completion, or a failure). The buffer is the port's
//! "availability": the driver only polls a port whose buffer is empty, so an
//! upstream never runs more than one element ahead of the merge.

use std::fmt;
use std::task::{Context, Poll};

use futures_util::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::UpstreamError;

/// Boxed upstream source. `Ok` items are elements, `Err` terminates the port
/// as failed, and the end of the stream terminates it as completed.
pub type Upstream<T> = BoxStream<'static, Result<T, UpstreamError>>;

/// Wraps an infallible stream as an [`Upstream`].
pub fn upstream<S>(source: S) -> Upstream<S::Item>
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    source.map(Ok).boxed()
}

/// Wraps a fallible stream as an [`Upstream`].
pub fn try_upstream<S, T>(source: S) -> Upstream<T>
where
    S: Stream<Item = Result<T, UpstreamError>> + Send + 'static,
{
    source.boxed()
}

/// Builds an upstream that yields every item of `items` and then completes.
pub fn upstream_from_iter<I>(items: I) -> Upstream<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    upstream(stream::iter(items))
}

/// Stable handle of a port for the lifetime of a merge.
///
/// The handle is the index of the upstream in the list handed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(pub usize);

impl PortId {
    /// Index of the port in the driver's port table.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in{}", self.0)
    }
}

/// Lifecycle of a port. Every status other than `Open` is terminal.
#[derive(Debug, Clone)]
pub enum PortStatus {
    /// Upstream may still deliver elements.
    Open,
    /// Upstream exhausted normally.
    Completed,
    /// Upstream reported an error.
    Failed(UpstreamError),
    /// Released by the strategy or the driver before it terminated.
    Cancelled,
}

impl PortStatus {
    /// True for every status except [`PortStatus::Open`].
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// One signal pulled from an upstream.
#[derive(Debug)]
pub enum PortEvent<T> {
    /// An element is available.
    Element(T),
    /// The upstream completed.
    Completed,
    /// The upstream failed.
    Failed(UpstreamError),
}

impl<T> PortEvent<T> {
    /// True for completion and failure signals.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Element(_))
    }
}

/// A single upstream input of a merge.
pub struct Port<T> {
    id: PortId,
    upstream: Option<Upstream<T>>,
    buffered: Option<PortEvent<T>>,
    status: PortStatus,
    pulls: u64,
}

impl<T> Port<T> {
    /// Creates an open port over `upstream`.
    pub fn new(id: PortId, upstream: Upstream<T>) -> Self {
        Self {
            id,
            upstream: Some(upstream),
            buffered: None,
            status: PortStatus::Open,
            pulls: 0,
        }
    }

    /// Handle of this port.
    #[inline]
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Current lifecycle status.
    #[inline]
    pub fn status(&self) -> &PortStatus {
        &self.status
    }

    /// True while the port may still deliver signals.
    #[inline]
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Number of times the upstream has been polled and produced a signal.
    #[inline]
    pub fn pulls(&self) -> u64 {
        self.pulls
    }

    /// True when an element is buffered and can be taken without waiting.
    #[inline]
    pub fn has_element(&self) -> bool {
        matches!(self.buffered, Some(PortEvent::Element(_)))
    }

    /// True when a completion or failure signal is buffered.
    #[inline]
    pub fn has_terminal(&self) -> bool {
        self.buffered.as_ref().is_some_and(PortEvent::is_terminal)
    }

    /// Takes the buffered element, if any. Never blocks.
    pub fn try_take(&mut self) -> Option<T> {
        match self.buffered.take() {
            Some(PortEvent::Element(element)) => Some(element),
            other => {
                self.buffered = other;
                None
            }
        }
    }

    /// Takes whatever signal is buffered and applies terminal status if the
    /// signal ends the port.
    pub(crate) fn take_event(&mut self) -> Option<PortEvent<T>> {
        let event = self.buffered.take()?;
        match &event {
            PortEvent::Element(_) => {}
            PortEvent::Completed => self.terminate(PortStatus::Completed),
            PortEvent::Failed(cause) => self.terminate(PortStatus::Failed(cause.clone())),
        }
        Some(event)
    }

    /// Polls the upstream once if the buffer is empty.
    ///
    /// Returns `Ready(())` when a signal is buffered after the call.
    pub(crate) fn poll_fill(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.buffered.is_some() {
            return Poll::Ready(());
        }
        let Some(upstream) = self.upstream.as_mut() else {
            return Poll::Pending;
        };
        match upstream.poll_next_unpin(cx) {
            Poll::Ready(item) => {
                self.pulls += 1;
                self.buffered = Some(match item {
                    Some(Ok(element)) => PortEvent::Element(element),
                    Some(Err(cause)) => PortEvent::Failed(cause),
                    None => PortEvent::Completed,
                });
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }

    /// Releases the port: drops the upstream and any buffered signal.
    ///
    /// Idempotent; an already terminal port keeps its status. Returns true if
    /// this call released a live upstream.
    pub fn release(&mut self) -> bool {
        self.buffered = None;
        if self.is_open() {
            self.status = PortStatus::Cancelled;
        }
        self.upstream.take().is_some()
    }

    fn terminate(&mut self, status: PortStatus) {
        self.status = status;
        self.upstream = None;
    }
}

impl<T> fmt::Debug for Port<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("buffered", &self.buffered.as_ref().map(PortEvent::is_terminal))
            .field("pulls", &self.pulls)
            .finish_non_exhaustive()
    }
}
