// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The merge driver: a cooperative event loop that owns the ports, the active
//! state, the active completion policy, and the downstream demand.
//!
//! Loop invariants:
//! - upstreams are only polled while downstream demand is positive, and each
//!   port buffers at most one signal;
//! - at most one emitted element is outstanding between a transition and its
//!   delivery downstream;
//! - a transition (new state, policy swap, port releases) is fully applied
//!   before the next event is dispatched.
//!
//! Event order within one iteration: an element already buffered on a selected
//! port first, then a buffered completion or failure on any open port, then
//! completions or failures observed by polling ports the active selector does
//! not name, then the selected ports polled in preference order.

use std::future::poll_fn;
use std::task::{Context, Poll};

use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, instrument, warn};

use crate::completion::CompletionPolicy;
use crate::config::MergeConfig;
use crate::context::{Effects, MergeContext, Termination};
use crate::downstream::{self, Delivery, Demand, Downstream, DownstreamLink, DownstreamSignal};
use crate::error::MergeError;
use crate::logic::MergeLogic;
use crate::port::{Port, PortEvent, PortId, Upstream};
use crate::selector::ReadSelector;

/// How a merge ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Every port terminated (or the strategy completed the merge) and all
    /// emitted elements were delivered.
    Completed,
    /// Downstream or the embedding system withdrew demand permanently.
    Cancelled,
}

enum Step {
    Continue,
    Finish(Result<MergeOutcome, MergeError>),
}

/// Runs one merge instance.
pub struct MergeDriver<L: MergeLogic> {
    name: String,
    config: MergeConfig,
    logic: L,
    handles: Vec<PortId>,
    ports: Vec<Port<L::In>>,
    state: L::State,
    completion: CompletionPolicy<L::Policy>,
    demand: Demand,
    cursor: usize,
    pending: Option<L::Out>,
    link: DownstreamLink<L::Out>,
    dispatched: u64,
}

impl<L: MergeLogic> MergeDriver<L> {
    /// Sets up a merge of `upstreams` under `logic` with default settings.
    ///
    /// See [`MergeDriver::with_config`].
    pub fn new(
        logic: L,
        upstreams: Vec<Upstream<L::In>>,
    ) -> Result<(Self, Downstream<L::Out>), MergeError> {
        Self::with_config(MergeConfig::default(), logic, upstreams)
    }

    /// Sets up a merge of `upstreams` under `logic`.
    ///
    /// The strategy validates the number of connected upstreams first; on
    /// [`MergeError::Configuration`] the upstreams are dropped without ever
    /// being polled.
    pub fn with_config(
        config: MergeConfig,
        mut logic: L,
        upstreams: Vec<Upstream<L::In>>,
    ) -> Result<(Self, Downstream<L::Out>), MergeError> {
        let count = upstreams.len();
        let handles = logic.input_handles(count)?;
        validate_handles(logic.name(), &handles, count)?;

        let ports = upstreams
            .into_iter()
            .enumerate()
            .map(|(index, upstream)| Port::new(PortId(index), upstream))
            .collect();
        let (downstream, link) = downstream::link();
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| logic.name().to_owned());

        let driver = Self {
            name,
            config,
            state: logic.initial_state(),
            completion: logic.initial_completion(),
            logic,
            handles,
            ports,
            demand: Demand::default(),
            cursor: 0,
            pending: None,
            link,
            dispatched: 0,
        };
        Ok((driver, downstream))
    }

    /// Name used for the tracing span.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered port handles returned by the strategy at setup.
    pub fn handles(&self) -> &[PortId] {
        &self.handles
    }

    /// Runs the merge to a terminal outcome.
    ///
    /// On completion the downstream receives [`Delivery::Complete`]; on
    /// failure it receives [`Delivery::Error`] with the same error returned
    /// here. Cancellation sends nothing. Every port still open at the end is
    /// released exactly once.
    #[instrument(name = "merge", skip(self), fields(merge = %self.name, inputs = self.ports.len()))]
    pub async fn run(mut self) -> Result<MergeOutcome, MergeError> {
        info!(policy = self.completion.label(), "merge started");
        let result = self.drive().await;
        let released = self.release_all();
        match &result {
            Ok(MergeOutcome::Completed) => {
                let _ = self.link.deliveries.send(Delivery::Complete);
                info!(dispatched = self.dispatched, released, "merge completed");
            }
            Ok(MergeOutcome::Cancelled) => {
                info!(
                    dispatched = self.dispatched,
                    released,
                    demand = self.demand.remaining(),
                    "merge cancelled"
                );
            }
            Err(err) => {
                warn!(%err, dispatched = self.dispatched, released, "merge failed");
                let _ = self.link.deliveries.send(Delivery::Error(err.clone()));
            }
        }
        result
    }

    async fn drive(&mut self) -> Result<MergeOutcome, MergeError> {
        loop {
            if self.pending.is_some() && !(self.await_demand().await && self.flush()) {
                return Ok(MergeOutcome::Cancelled);
            }
            if self.ports.iter().all(|port| !port.is_open()) {
                return Ok(MergeOutcome::Completed);
            }
            if !self.await_demand().await {
                return Ok(MergeOutcome::Cancelled);
            }

            let selector = self.logic.selector(self.state);
            selector.validate(self.ports.len())?;
            let candidates = {
                let ports = &self.ports;
                selector.candidates(self.cursor, |id| {
                    ports.get(id.index()).is_some_and(Port::is_open)
                })
            };
            if candidates.is_empty() {
                let open = self.ports.iter().filter(|port| port.is_open()).count();
                warn!(state = ?self.state, open, "selector names only terminated ports");
                return Err(MergeError::Protocol(format!(
                    "state {:?} reads only terminated ports while {open} inputs are still open",
                    self.state
                )));
            }

            let Some((port, event)) = self.next_event(&candidates).await else {
                return Ok(MergeOutcome::Cancelled);
            };
            if !event.is_terminal() && rotates(&selector, port) {
                self.cursor = port.index() + 1;
            }

            match self.dispatch(port, event) {
                Step::Continue => {}
                Step::Finish(Ok(MergeOutcome::Completed)) => {
                    if self.pending.is_some() && !(self.await_demand().await && self.flush()) {
                        return Ok(MergeOutcome::Cancelled);
                    }
                    return Ok(MergeOutcome::Completed);
                }
                Step::Finish(other) => return other,
            }
        }
    }

    /// Suspends until demand is positive. Returns false on cancellation.
    async fn await_demand(&mut self) -> bool {
        loop {
            match self.link.signals.try_recv() {
                Ok(signal) => {
                    if !self.apply_signal(signal) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
        while !self.demand.is_positive() {
            match self.link.signals.recv().await {
                Some(signal) => {
                    if !self.apply_signal(signal) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    fn apply_signal(&mut self, signal: DownstreamSignal) -> bool {
        match signal {
            DownstreamSignal::Request(n) => {
                self.demand.grant(n);
                true
            }
            DownstreamSignal::Cancel => false,
        }
    }

    /// Waits for the next port signal while still listening to downstream.
    async fn next_event(
        &mut self,
        candidates: &[PortId],
    ) -> Option<(PortId, PortEvent<L::In>)> {
        let Self {
            ports,
            link,
            demand,
            ..
        } = self;
        loop {
            tokio::select! {
                biased;
                signal = link.signals.recv() => match signal {
                    Some(DownstreamSignal::Request(n)) => demand.grant(n),
                    Some(DownstreamSignal::Cancel) | None => return None,
                },
                event = poll_fn(|cx| poll_event(ports, candidates, cx)) => return Some(event),
            }
        }
    }

    fn dispatch(&mut self, port: PortId, event: PortEvent<L::In>) -> Step {
        let kind = match &event {
            PortEvent::Element(_) => "element",
            PortEvent::Completed => "completed",
            PortEvent::Failed(_) => "failed",
        };
        let from = self.state;
        let mut effects = Effects::default();
        let mut ctx = MergeContext::new(&mut effects, self.ports.len());
        let next = match event {
            PortEvent::Element(element) => self.logic.on_input(&mut ctx, from, port, element),
            PortEvent::Completed => match self.completion {
                CompletionPolicy::Default => from,
                CompletionPolicy::EagerClose => {
                    ctx.complete();
                    from
                }
                CompletionPolicy::Custom(policy) => {
                    self.logic.on_complete(&mut ctx, policy, from, port)
                }
            },
            PortEvent::Failed(cause) => match self.completion {
                CompletionPolicy::Default | CompletionPolicy::EagerClose => {
                    ctx.error(cause);
                    from
                }
                CompletionPolicy::Custom(policy) => {
                    self.logic.on_error(&mut ctx, policy, from, port, cause)
                }
            },
        };
        self.dispatched += 1;
        if self.config.trace_transitions {
            let pulls = self.ports.get(port.index()).map_or(0, Port::pulls);
            debug!(%port, event = kind, pulls, ?from, to = ?next, "transition");
        }

        if let Some(violation) = effects.violation {
            warn!(%port, state = ?from, "{violation}");
            return Step::Finish(Err(MergeError::Protocol(violation)));
        }
        if let Some(policy) = effects.completion {
            debug!(policy = policy.label(), "completion policy replaced");
            self.completion = policy;
        }
        self.state = next;
        for id in effects.cancelled {
            match self.ports.get_mut(id.index()) {
                Some(cancelled) => {
                    cancelled.release();
                }
                None => warn!(port = %id, "cancel requested for unregistered port"),
            }
        }
        if let Some(element) = effects.emitted {
            self.pending = Some(element);
        }
        match effects.termination {
            None => Step::Continue,
            Some(Termination::Complete) => Step::Finish(Ok(MergeOutcome::Completed)),
            Some(Termination::Fail(err)) => Step::Finish(Err(err)),
        }
    }

    /// Delivers the pending element. Demand must be positive. Returns false
    /// when the consumer is gone.
    fn flush(&mut self) -> bool {
        let Some(element) = self.pending.take() else {
            return true;
        };
        self.demand.consume();
        self.link.deliveries.send(Delivery::Element(element)).is_ok()
    }

    fn release_all(&mut self) -> usize {
        self.ports
            .iter_mut()
            .map(Port::release)
            .filter(|released| *released)
            .count()
    }
}

/// True when serving `port` advances the rotating preference. The preferred
/// port of a `Preferred` selector is served outside the rotation.
fn rotates(selector: &ReadSelector, port: PortId) -> bool {
    match selector {
        ReadSelector::One(_) => false,
        ReadSelector::Any(_) => true,
        ReadSelector::Preferred { preferred, .. } => port != *preferred,
    }
}

/// Ordered handles must be a permutation of `0..count`.
fn validate_handles(merge: &str, handles: &[PortId], count: usize) -> Result<(), MergeError> {
    let mut seen = vec![false; count];
    for handle in handles {
        match seen.get_mut(handle.index()) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(MergeError::configuration(
                    merge,
                    format!("{merge} lists input handle {handle} twice"),
                ))
            }
            None => {
                return Err(MergeError::configuration(
                    merge,
                    format!("{merge} declares input handle {handle}, which is not connected ({count} inputs)"),
                ))
            }
        }
    }
    if handles.len() != count {
        return Err(MergeError::configuration(
            merge,
            format!(
                "{merge} declares {} input handles for {count} connected inputs",
                handles.len()
            ),
        ));
    }
    Ok(())
}

fn poll_event<T>(
    ports: &mut [Port<T>],
    candidates: &[PortId],
    cx: &mut Context<'_>,
) -> Poll<(PortId, PortEvent<T>)> {
    for id in candidates {
        if let Some(element) = ports.get_mut(id.index()).and_then(Port::try_take) {
            return Poll::Ready((*id, PortEvent::Element(element)));
        }
    }
    if let Some(port) = ports.iter_mut().find(|p| p.is_open() && p.has_terminal()) {
        if let Some(event) = port.take_event() {
            return Poll::Ready((port.id(), event));
        }
    }
    for port in ports
        .iter_mut()
        .filter(|p| p.is_open() && !candidates.contains(&p.id()))
    {
        if port.poll_fill(cx).is_ready() && port.has_terminal() {
            if let Some(event) = port.take_event() {
                return Poll::Ready((port.id(), event));
            }
        }
    }
    for id in candidates {
        let Some(port) = ports.get_mut(id.index()) else {
            continue;
        };
        if port.poll_fill(cx).is_ready() {
            if let Some(event) = port.take_event() {
                return Poll::Ready((*id, event));
            }
        }
    }
    Poll::Pending
}
