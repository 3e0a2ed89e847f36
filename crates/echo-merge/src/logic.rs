// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The strategy seam: a merge policy expressed as a state machine.
//!
//! A strategy names its state nodes with a small `Copy` tag type
//! ([`MergeLogic::State`]). Each tag maps to a [`ReadSelector`] through
//! [`MergeLogic::selector`] and to a transition through
//! [`MergeLogic::on_input`]; together they form one merge state. Transitions
//! return the tag of the next state, so states never own each other and
//! cycles (alternation, self-loops) cost nothing.
//!
//! Per-merge scratch data lives in the logic value itself and is reached
//! through `&mut self`, which keeps ownership with the single driver task.

use std::fmt;

use crate::completion::CompletionPolicy;
use crate::context::MergeContext;
use crate::error::{MergeError, UpstreamError};
use crate::port::PortId;
use crate::selector::ReadSelector;

/// Context type seen by the transitions of `L`.
pub type LogicContext<'a, L> =
    MergeContext<'a, <L as MergeLogic>::Out, <L as MergeLogic>::Policy>;

/// A merge strategy.
pub trait MergeLogic: Send + Sized {
    /// Element type accepted from every port.
    type In: Send;
    /// Element type emitted downstream.
    type Out: Send;
    /// Tag of a state node.
    type State: Copy + Eq + fmt::Debug + Send;
    /// Strategy-defined completion policies, used with
    /// [`CompletionPolicy::Custom`].
    type Policy: Copy + fmt::Debug + Send;

    /// Name used in configuration errors and tracing spans.
    fn name(&self) -> &str;

    /// Returns the ordered handles of the participating ports for a merge
    /// with `input_count` connected upstreams. Called once, before any other
    /// method; strategies may record the handles for their selectors.
    ///
    /// Fails with [`MergeError::Configuration`] when the strategy cannot work
    /// with that many inputs.
    fn input_handles(&mut self, input_count: usize) -> Result<Vec<PortId>, MergeError>;

    /// State the merge starts in.
    fn initial_state(&self) -> Self::State;

    /// Completion policy the merge starts with.
    fn initial_completion(&self) -> CompletionPolicy<Self::Policy> {
        CompletionPolicy::Default
    }

    /// Ports `state` is willing to read from.
    fn selector(&self, state: Self::State) -> ReadSelector;

    /// Handles an element delivered from `port` while in `state`.
    fn on_input(
        &mut self,
        ctx: &mut LogicContext<'_, Self>,
        state: Self::State,
        port: PortId,
        element: Self::In,
    ) -> Self::State;

    /// Handles completion of `port` under the custom `policy`.
    ///
    /// Only called while a [`CompletionPolicy::Custom`] policy is active.
    fn on_complete(
        &mut self,
        ctx: &mut LogicContext<'_, Self>,
        policy: Self::Policy,
        state: Self::State,
        port: PortId,
    ) -> Self::State {
        let _ = (ctx, policy, port);
        state
    }

    /// Handles failure of `port` under the custom `policy`.
    ///
    /// The default fails the merge with `cause`.
    fn on_error(
        &mut self,
        ctx: &mut LogicContext<'_, Self>,
        policy: Self::Policy,
        state: Self::State,
        port: PortId,
        cause: UpstreamError,
    ) -> Self::State {
        let _ = (policy, port);
        ctx.error(cause);
        state
    }
}

/// Ports `0..count`, failing when `count` is outside `min..=max`.
///
/// Shared arity check for the built-in strategies.
pub fn sequential_handles(
    merge: &str,
    count: usize,
    min: usize,
    max: Option<usize>,
) -> Result<Vec<PortId>, MergeError> {
    let too_many = max.is_some_and(|max| count > max);
    if count < min || too_many {
        let expected = match max {
            Some(max) if max == min => format!("exactly {min}"),
            Some(max) => format!("between {min} and {max}"),
            None => format!("at least {min}"),
        };
        return Err(MergeError::configuration(
            merge,
            format!("{merge} must have {expected} connected inputs, was {count}"),
        ));
    }
    Ok((0..count).map(PortId).collect())
}
