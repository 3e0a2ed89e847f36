// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use echo_merge::{upstream, Upstream};
use futures_util::{Stream, StreamExt};

/// Counters shared with a [`Metered`] upstream.
#[derive(Debug, Default)]
pub struct Meter {
    polls: AtomicUsize,
    yielded: AtomicUsize,
    finished: AtomicBool,
    drops: AtomicUsize,
}

impl Meter {
    /// Number of `poll_next` calls, ready or not.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Number of elements the upstream handed out.
    pub fn yielded(&self) -> usize {
        self.yielded.load(Ordering::SeqCst)
    }

    /// True once the upstream reported its end.
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Number of times the upstream was dropped (released).
    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

/// Stream wrapper that records how the merge consumed it.
pub struct Metered<S> {
    inner: S,
    meter: Arc<Meter>,
}

impl<S: Stream + Unpin> Stream for Metered<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        self.meter.polls.fetch_add(1, Ordering::SeqCst);
        let polled = self.inner.poll_next_unpin(cx);
        match &polled {
            Poll::Ready(Some(_)) => {
                self.meter.yielded.fetch_add(1, Ordering::SeqCst);
            }
            Poll::Ready(None) => self.meter.finished.store(true, Ordering::SeqCst),
            Poll::Pending => {}
        }
        polled
    }
}

impl<S> Drop for Metered<S> {
    fn drop(&mut self) {
        self.meter.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wraps `source` as an upstream and returns its meter.
pub fn metered<S>(source: S) -> (Upstream<S::Item>, Arc<Meter>)
where
    S: Stream + Unpin + Send + 'static,
    S::Item: Send + 'static,
{
    let meter = Arc::new(Meter::default());
    let stream = Metered {
        inner: source,
        meter: Arc::clone(&meter),
    };
    (upstream(stream), meter)
}

/// Endless stream of `value` that is pending on every other poll, starting
/// pending. It wakes itself, so the merge sees it flip between not ready and
/// ready.
pub struct Flicker<T> {
    value: T,
    ready: bool,
}

impl<T: Clone + Unpin> Stream for Flicker<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let ready = self.ready;
        self.ready = !ready;
        if ready {
            Poll::Ready(Some(self.value.clone()))
        } else {
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Upstream over [`Flicker`].
pub fn flicker<T>(value: T) -> Upstream<T>
where
    T: Clone + Unpin + Send + 'static,
{
    upstream(Flicker {
        value,
        ready: false,
    })
}

/// Lets spawned tasks on the current-thread runtime make progress.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
