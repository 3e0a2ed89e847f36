// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
mod common;

use common::{metered, settle};
use echo_merge::{
    try_upstream, upstream_from_iter, Delivery, FairMerge, MergeConfig, MergeDriver, MergeError,
    MergeOutcome, UpstreamError,
};
use futures_util::stream;

#[tokio::test]
async fn zero_demand_means_zero_reads() {
    let (a, meter_a) = metered(stream::repeat(1_u8));
    let (b, meter_b) = metered(stream::repeat(2_u8));
    let (driver, mut downstream) = MergeDriver::new(FairMerge::new(), vec![a, b]).expect("setup");
    let run = tokio::spawn(driver.run());

    settle().await;
    assert_eq!(meter_a.polls() + meter_b.polls(), 0, "no demand, no reads");
    assert!(downstream.try_recv().is_none());

    downstream.request(1);
    assert!(matches!(downstream.recv().await, Some(Delivery::Element(_))));
    settle().await;
    assert_eq!(
        meter_a.yielded() + meter_b.yielded(),
        1,
        "one unit of demand pulls exactly one element"
    );

    downstream.cancel();
    assert_eq!(run.await.expect("join").expect("run"), MergeOutcome::Cancelled);
}

#[tokio::test]
async fn demand_is_honoured_exactly() {
    let (a, meter_a) = metered(stream::repeat('x'));
    let (driver, mut downstream) = MergeDriver::new(FairMerge::new(), vec![a]).expect("setup");
    let run = tokio::spawn(driver.run());

    downstream.request(3);
    for _ in 0..3 {
        assert!(matches!(downstream.recv().await, Some(Delivery::Element('x'))));
    }
    settle().await;
    assert!(downstream.try_recv().is_none());
    assert_eq!(meter_a.yielded(), 3);

    downstream.cancel();
    run.await.expect("join").expect("run");
}

#[tokio::test]
async fn cancellation_is_idempotent() {
    let (a, meter_a) = metered(stream::pending::<u8>());
    let (b, meter_b) = metered(stream::pending::<u8>());
    let (driver, mut downstream) = MergeDriver::new(FairMerge::new(), vec![a, b]).expect("setup");
    let handle = downstream.cancel_handle();
    let run = tokio::spawn(driver.run());

    downstream.request(5);
    settle().await;
    downstream.cancel();
    downstream.cancel();
    handle.cancel();

    assert_eq!(run.await.expect("join").expect("run"), MergeOutcome::Cancelled);
    handle.cancel();
    downstream.cancel();
    assert!(downstream.recv().await.is_none(), "cancellation sends no terminal signal");
    assert_eq!(meter_a.drops(), 1);
    assert_eq!(meter_b.drops(), 1);
}

#[tokio::test]
async fn cancel_after_completion_has_no_effect() {
    let (a, meter_a) = metered(stream::iter(vec![1_u8, 2]));
    let (driver, mut downstream) = MergeDriver::new(FairMerge::new(), vec![a]).expect("setup");
    let handle = downstream.cancel_handle();
    let run = tokio::spawn(driver.run());

    downstream.request(8);
    let mut seen = Vec::new();
    loop {
        match downstream.recv().await {
            Some(Delivery::Element(x)) => seen.push(x),
            Some(Delivery::Complete) => break,
            other => unreachable!("unexpected delivery {other:?}"),
        }
    }
    assert_eq!(seen, vec![1, 2]);
    assert_eq!(run.await.expect("join").expect("run"), MergeOutcome::Completed);

    downstream.cancel();
    handle.cancel();
    assert!(downstream.recv().await.is_none());
    assert!(meter_a.finished());
    assert_eq!(meter_a.drops(), 1);
}

#[tokio::test]
async fn dropping_the_downstream_cancels_the_merge() {
    let (a, meter_a) = metered(stream::repeat(0_u16));
    let (driver, downstream) = MergeDriver::new(FairMerge::new(), vec![a]).expect("setup");
    let run = tokio::spawn(driver.run());
    drop(downstream);
    assert_eq!(run.await.expect("join").expect("run"), MergeOutcome::Cancelled);
    assert_eq!(meter_a.drops(), 1);
}

#[tokio::test]
async fn upstream_failure_terminates_and_releases_the_rest() {
    let failing = try_upstream(stream::iter(vec![
        Ok(1_u32),
        Err(UpstreamError::msg("disk on fire")),
    ]));
    let (quiet, meter_quiet) = metered(stream::pending::<u32>());
    let (driver, downstream) =
        MergeDriver::new(FairMerge::new(), vec![failing, quiet]).expect("setup");
    let run = tokio::spawn(driver.run());

    let err = downstream.collect(4).await.expect_err("failure must surface");
    match &err {
        MergeError::Upstream(cause) => assert_eq!(cause.to_string(), "disk on fire"),
        other => unreachable!("unexpected error {other}"),
    }
    let returned = run.await.expect("join").expect_err("run fails too");
    assert_eq!(returned.to_string(), err.to_string());
    assert_eq!(meter_quiet.drops(), 1);
}

#[tokio::test]
async fn config_names_the_merge() {
    let config = MergeConfig::default()
        .named("orders")
        .with_trace_transitions(true);
    let (driver, downstream) = MergeDriver::with_config(
        config,
        FairMerge::new(),
        vec![upstream_from_iter(vec!["o-1", "o-2"])],
    )
    .expect("setup");
    assert_eq!(driver.name(), "orders");
    assert_eq!(driver.handles().len(), 1);
    let run = tokio::spawn(driver.run());
    assert_eq!(downstream.collect(1).await.expect("merge"), vec!["o-1", "o-2"]);
    run.await.expect("join").expect("run");
}
