// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Built-in merge strategies.
//!
//! Each strategy is an independent [`MergeLogic`](crate::MergeLogic)
//! implementation; the driver only needs its handles, initial state, and
//! initial completion policy.

mod fair;
mod preferred;
mod round_robin;
mod zip;

pub use fair::{FairMerge, FairState};
pub use preferred::{PreferredMerge, PreferredState};
pub use round_robin::{RoundRobinPolicy, RoundRobinState, StrictRoundRobin};
pub use zip::{Zip, ZipInput, ZipState};
