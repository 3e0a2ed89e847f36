// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-merge: backpressured multi-input merges driven by pluggable state
//! machines.
//!
//! A merge reads from N upstream [`Port`]s and emits into one [`Downstream`].
//! The policy lives in a [`MergeLogic`] implementation: a set of state tags,
//! each with a [`ReadSelector`] naming the ports it will read and a transition
//! run per element. A [`CompletionPolicy`] decides what the end or failure of
//! a single port means for the whole merge.
//!
//! [`MergeDriver`] runs one merge as a single async task. It polls upstreams
//! only while downstream demand is positive, holds at most one emitted element
//! in flight, and rotates its read preference so no ready input starves.
//!
//! ```no_run
//! use echo_merge::{upstream_from_iter, FairMerge, MergeDriver};
//!
//! # async fn demo() -> Result<(), echo_merge::MergeError> {
//! let inputs = vec![upstream_from_iter(vec![1, 2]), upstream_from_iter(vec![3])];
//! let (driver, downstream) = MergeDriver::new(FairMerge::new(), inputs)?;
//! let run = tokio::spawn(driver.run());
//! let merged = downstream.collect(16).await?;
//! assert_eq!(merged.len(), 3);
//! # let _ = run.await;
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod completion;
/// Merge settings and named profiles.
pub mod config;
mod context;
mod downstream;
mod driver;
mod error;
mod logic;
mod port;
mod selector;
/// Built-in strategies: fair, strict round-robin, zip, preferred.
pub mod strategy;

pub use completion::CompletionPolicy;
pub use config::{ConfigError, ConfigStore, MergeConfig, ProfileStore};
pub use context::MergeContext;
pub use downstream::{CancelHandle, Delivery, Demand, Downstream};
pub use driver::{MergeDriver, MergeOutcome};
pub use error::{MergeError, UpstreamError};
pub use logic::{sequential_handles, LogicContext, MergeLogic};
pub use port::{
    try_upstream, upstream, upstream_from_iter, Port, PortEvent, PortId, PortStatus, Upstream,
};
pub use selector::{read, read_any, read_preferred, ReadSelector};
pub use strategy::{
    FairMerge, PreferredMerge, RoundRobinPolicy, StrictRoundRobin, Zip, ZipInput, ZipState,
};
