// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fair merge: forward whatever any input has, with no input starved.

use std::convert::Infallible;
use std::marker::PhantomData;

use crate::error::MergeError;
use crate::logic::{sequential_handles, LogicContext, MergeLogic};
use crate::port::PortId;
use crate::selector::{read_any, ReadSelector};

/// Single state of [`FairMerge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FairState {
    /// Reads any open input.
    ReadAny,
}

/// Merges N same-typed inputs in arrival order.
///
/// Elements pass through unchanged. The merge completes once every input has
/// completed; the first failure fails it. When several inputs are ready the
/// driver's rotating preference serves each of them within one round.
pub struct FairMerge<T> {
    inputs: Vec<PortId>,
    _elements: PhantomData<fn(T) -> T>,
}

impl<T> FairMerge<T> {
    /// Creates the strategy; inputs are bound at setup.
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            _elements: PhantomData,
        }
    }
}

impl<T> Default for FairMerge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> MergeLogic for FairMerge<T> {
    type In = T;
    type Out = T;
    type State = FairState;
    type Policy = Infallible;

    fn name(&self) -> &str {
        "FairMerge"
    }

    fn input_handles(&mut self, input_count: usize) -> Result<Vec<PortId>, MergeError> {
        self.inputs = sequential_handles(self.name(), input_count, 1, None)?;
        Ok(self.inputs.clone())
    }

    fn initial_state(&self) -> FairState {
        FairState::ReadAny
    }

    fn selector(&self, _state: FairState) -> ReadSelector {
        read_any(self.inputs.iter().copied())
    }

    fn on_input(
        &mut self,
        ctx: &mut LogicContext<'_, Self>,
        state: FairState,
        _port: PortId,
        element: T,
    ) -> FairState {
        ctx.emit(element);
        state
    }
}
