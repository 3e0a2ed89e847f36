// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Zip: pair one element of `A` with one element of `B`, in order.

use std::convert::Infallible;
use std::marker::PhantomData;

use futures_util::StreamExt;

use crate::completion::CompletionPolicy;
use crate::error::MergeError;
use crate::logic::{LogicContext, MergeLogic};
use crate::port::{PortId, Upstream};
use crate::selector::{read, ReadSelector};

const PORT_A: PortId = PortId(0);
const PORT_B: PortId = PortId(1);

/// Element arriving at a [`Zip`] merge: tagged with its side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZipInput<A, B> {
    /// From the `A` input (port 0).
    A(A),
    /// From the `B` input (port 1).
    B(B),
}

/// States of [`Zip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipState {
    /// Waits for the next `A`.
    ReadA,
    /// Holds an `A` and waits for its `B`.
    ReadB,
}

/// Pairs elements of two differently-typed inputs.
///
/// Uses eager close: the first completion or failure of either input ends the
/// merge, dropping any unpaired `A`.
pub struct Zip<A, B> {
    last_a: Option<A>,
    _b: PhantomData<fn(B) -> B>,
}

impl<A, B> Zip<A, B> {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self {
            last_a: None,
            _b: PhantomData,
        }
    }
}

impl<A, B> Default for Zip<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, B> Zip<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    /// Tags two upstreams into the port list a zip merge expects.
    pub fn upstreams(a: Upstream<A>, b: Upstream<B>) -> Vec<Upstream<ZipInput<A, B>>> {
        vec![
            a.map(|item| item.map(ZipInput::A)).boxed(),
            b.map(|item| item.map(ZipInput::B)).boxed(),
        ]
    }
}

impl<A: Send, B: Send> MergeLogic for Zip<A, B> {
    type In = ZipInput<A, B>;
    type Out = (A, B);
    type State = ZipState;
    type Policy = Infallible;

    fn name(&self) -> &str {
        "Zip"
    }

    fn input_handles(&mut self, input_count: usize) -> Result<Vec<PortId>, MergeError> {
        if input_count != 2 {
            return Err(MergeError::configuration(
                self.name(),
                format!("Zip must have exactly two connected inputs, was {input_count}"),
            ));
        }
        Ok(vec![PORT_A, PORT_B])
    }

    fn initial_state(&self) -> ZipState {
        ZipState::ReadA
    }

    fn initial_completion(&self) -> CompletionPolicy<Infallible> {
        CompletionPolicy::EagerClose
    }

    fn selector(&self, state: ZipState) -> ReadSelector {
        match state {
            ZipState::ReadA => read(PORT_A),
            ZipState::ReadB => read(PORT_B),
        }
    }

    fn on_input(
        &mut self,
        ctx: &mut LogicContext<'_, Self>,
        state: ZipState,
        port: PortId,
        element: ZipInput<A, B>,
    ) -> ZipState {
        match (state, element) {
            (ZipState::ReadA, ZipInput::A(a)) => {
                self.last_a = Some(a);
                ZipState::ReadB
            }
            (ZipState::ReadB, ZipInput::B(b)) => match self.last_a.take() {
                Some(a) => {
                    ctx.emit((a, b));
                    ZipState::ReadA
                }
                None => {
                    ctx.fail(MergeError::Protocol("zip paired a B without an A".to_owned()));
                    state
                }
            },
            _ => {
                ctx.fail(MergeError::Protocol(format!(
                    "zip received an element of the wrong side on {port}"
                )));
                state
            }
        }
    }
}
