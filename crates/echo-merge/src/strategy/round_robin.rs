// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Strict round-robin over two inputs.
//!
//! `Read1` and `Read2` alternate. When either input completes, the policy
//! falls back to the default and the merge drains the survivor exclusively.

use std::marker::PhantomData;

use crate::completion::CompletionPolicy;
use crate::error::MergeError;
use crate::logic::{sequential_handles, LogicContext, MergeLogic};
use crate::port::PortId;
use crate::selector::{read, ReadSelector};

const FIRST: PortId = PortId(0);
const SECOND: PortId = PortId(1);

/// States of [`StrictRoundRobin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundRobinState {
    /// Waits for the first input.
    Read1,
    /// Waits for the second input.
    Read2,
    /// Reads only the given input; the other one is done.
    Drain(PortId),
}

/// Custom completion policy of [`StrictRoundRobin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundRobinPolicy {
    /// On the first completion, drain the other input.
    EmitOtherOnClose,
}

/// Alternates strictly between two same-typed inputs.
pub struct StrictRoundRobin<T> {
    _elements: PhantomData<fn(T) -> T>,
}

impl<T> StrictRoundRobin<T> {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self {
            _elements: PhantomData,
        }
    }
}

impl<T> Default for StrictRoundRobin<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn other(port: PortId) -> PortId {
    if port == FIRST {
        SECOND
    } else {
        FIRST
    }
}

impl<T: Send> MergeLogic for StrictRoundRobin<T> {
    type In = T;
    type Out = T;
    type State = RoundRobinState;
    type Policy = RoundRobinPolicy;

    fn name(&self) -> &str {
        "StrictRoundRobin"
    }

    fn input_handles(&mut self, input_count: usize) -> Result<Vec<PortId>, MergeError> {
        sequential_handles(self.name(), input_count, 2, Some(2))
    }

    fn initial_state(&self) -> RoundRobinState {
        RoundRobinState::Read1
    }

    fn initial_completion(&self) -> CompletionPolicy<RoundRobinPolicy> {
        CompletionPolicy::Custom(RoundRobinPolicy::EmitOtherOnClose)
    }

    fn selector(&self, state: RoundRobinState) -> ReadSelector {
        match state {
            RoundRobinState::Read1 => read(FIRST),
            RoundRobinState::Read2 => read(SECOND),
            RoundRobinState::Drain(port) => read(port),
        }
    }

    fn on_input(
        &mut self,
        ctx: &mut LogicContext<'_, Self>,
        state: RoundRobinState,
        _port: PortId,
        element: T,
    ) -> RoundRobinState {
        ctx.emit(element);
        match state {
            RoundRobinState::Read1 => RoundRobinState::Read2,
            RoundRobinState::Read2 => RoundRobinState::Read1,
            drain @ RoundRobinState::Drain(_) => drain,
        }
    }

    fn on_complete(
        &mut self,
        ctx: &mut LogicContext<'_, Self>,
        policy: RoundRobinPolicy,
        _state: RoundRobinState,
        port: PortId,
    ) -> RoundRobinState {
        match policy {
            RoundRobinPolicy::EmitOtherOnClose => {
                ctx.change_completion(CompletionPolicy::Default);
                RoundRobinState::Drain(other(port))
            }
        }
    }
}
