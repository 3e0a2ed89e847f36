// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Capability handed to the transition that is currently executing.
//!
//! The context only borrows the driver's effect record for the duration of a
//! single transition, so a stale state cannot emit or terminate the merge
//! after it has been replaced.

use crate::completion::CompletionPolicy;
use crate::error::{MergeError, UpstreamError};
use crate::port::PortId;

/// How a transition asked the merge to end.
#[derive(Debug, Clone)]
pub(crate) enum Termination {
    Complete,
    Fail(MergeError),
}

/// Side effects recorded by one transition, applied by the driver afterwards.
#[derive(Debug)]
pub(crate) struct Effects<Out, P> {
    pub(crate) emitted: Option<Out>,
    pub(crate) violation: Option<String>,
    pub(crate) termination: Option<Termination>,
    pub(crate) completion: Option<CompletionPolicy<P>>,
    pub(crate) cancelled: Vec<PortId>,
}

impl<Out, P> Default for Effects<Out, P> {
    fn default() -> Self {
        Self {
            emitted: None,
            violation: None,
            termination: None,
            completion: None,
            cancelled: Vec::new(),
        }
    }
}

/// Lets a transition emit downstream, terminate the merge, release a port, or
/// replace the active completion policy.
#[derive(Debug)]
pub struct MergeContext<'a, Out, P> {
    effects: &'a mut Effects<Out, P>,
    port_count: usize,
}

impl<'a, Out, P> MergeContext<'a, Out, P> {
    pub(crate) fn new(effects: &'a mut Effects<Out, P>, port_count: usize) -> Self {
        Self {
            effects,
            port_count,
        }
    }

    /// Queues `element` for downstream delivery.
    ///
    /// At most one element may be emitted per transition; a second call is a
    /// protocol violation that fails the merge.
    pub fn emit(&mut self, element: Out) {
        if self.effects.emitted.is_some() {
            self.effects.violation =
                Some("more than one element emitted in a single transition".to_owned());
            return;
        }
        self.effects.emitted = Some(element);
    }

    /// Terminates the merge with `cause`.
    pub fn error(&mut self, cause: UpstreamError) {
        self.fail(MergeError::Upstream(cause));
    }

    /// Terminates the merge with an arbitrary merge error.
    pub fn fail(&mut self, error: MergeError) {
        if self.effects.termination.is_none() {
            self.effects.termination = Some(Termination::Fail(error));
        }
    }

    /// Completes the merge normally once any emission of this transition has
    /// been delivered. Remaining open ports are released.
    pub fn complete(&mut self) {
        if self.effects.termination.is_none() {
            self.effects.termination = Some(Termination::Complete);
        }
    }

    /// Releases `port` without any further callbacks for it.
    pub fn cancel(&mut self, port: PortId) {
        if !self.effects.cancelled.contains(&port) {
            self.effects.cancelled.push(port);
        }
    }

    /// Replaces the active completion policy before the next event.
    pub fn change_completion(&mut self, policy: CompletionPolicy<P>) {
        self.effects.completion = Some(policy);
    }

    /// Number of ports registered with the merge.
    #[inline]
    pub fn port_count(&self) -> usize {
        self.port_count
    }
}
