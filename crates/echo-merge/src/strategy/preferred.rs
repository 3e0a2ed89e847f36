// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Preferred merge: input 0 wins whenever it has an element ready.

use std::convert::Infallible;
use std::marker::PhantomData;

use crate::error::MergeError;
use crate::logic::{sequential_handles, LogicContext, MergeLogic};
use crate::port::PortId;
use crate::selector::{read_preferred, ReadSelector};

/// Single state of [`PreferredMerge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredState {
    /// Reads the preferred input first, then the secondaries.
    ReadPreferred,
}

/// Merges a preferred input with N-1 secondary inputs.
///
/// The secondaries share the remaining capacity fairly among themselves. A
/// preferred input that is always ready starves them.
pub struct PreferredMerge<T> {
    secondaries: Vec<PortId>,
    _elements: PhantomData<fn(T) -> T>,
}

impl<T> PreferredMerge<T> {
    /// Creates the strategy; input 0 is preferred.
    pub fn new() -> Self {
        Self {
            secondaries: Vec::new(),
            _elements: PhantomData,
        }
    }
}

impl<T> Default for PreferredMerge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> MergeLogic for PreferredMerge<T> {
    type In = T;
    type Out = T;
    type State = PreferredState;
    type Policy = Infallible;

    fn name(&self) -> &str {
        "PreferredMerge"
    }

    fn input_handles(&mut self, input_count: usize) -> Result<Vec<PortId>, MergeError> {
        let handles = sequential_handles(self.name(), input_count, 2, None)?;
        self.secondaries = handles[1..].to_vec();
        Ok(handles)
    }

    fn initial_state(&self) -> PreferredState {
        PreferredState::ReadPreferred
    }

    fn selector(&self, _state: PreferredState) -> ReadSelector {
        read_preferred(PortId(0), self.secondaries.iter().copied())
    }

    fn on_input(
        &mut self,
        ctx: &mut LogicContext<'_, Self>,
        state: PreferredState,
        _port: PortId,
        element: T,
    ) -> PreferredState {
        ctx.emit(element);
        state
    }
}
