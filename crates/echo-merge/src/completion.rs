// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Completion policies: how the end of one port affects the whole merge.

/// The active completion policy of a merge.
///
/// Exactly one policy is active at a time. A transition may swap it through
/// [`MergeContext::change_completion`](crate::MergeContext::change_completion);
/// the swap takes effect before the next event is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy<P> {
    /// Keep reading until every port is terminal. A failure terminates the
    /// merge with its cause.
    #[default]
    Default,
    /// The first completion or failure of any port terminates the merge.
    EagerClose,
    /// Strategy-defined handling, dispatched to
    /// [`MergeLogic::on_complete`](crate::MergeLogic::on_complete) and
    /// [`MergeLogic::on_error`](crate::MergeLogic::on_error).
    Custom(P),
}

impl<P> CompletionPolicy<P> {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::EagerClose => "eager-close",
            Self::Custom(_) => "custom",
        }
    }
}
