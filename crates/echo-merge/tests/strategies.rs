// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
mod common;

use common::{flicker, metered};
use echo_merge::{
    try_upstream, upstream, upstream_from_iter, Delivery, FairMerge, MergeDriver, MergeError,
    MergeOutcome, PreferredMerge, StrictRoundRobin, UpstreamError, Zip, ZipInput,
};
use futures_util::stream;

#[tokio::test]
async fn fair_merge_emits_every_element_exactly_once() {
    let inputs = vec![
        upstream_from_iter(vec!['a', 'b', 'c', 'd']),
        upstream_from_iter(vec!['e', 'f']),
    ];
    let (driver, downstream) = MergeDriver::new(FairMerge::new(), inputs).expect("setup");
    let run = tokio::spawn(driver.run());

    let mut merged = downstream.collect(3).await.expect("merge");
    assert_eq!(merged.len(), 6);
    merged.sort_unstable();
    assert_eq!(merged, vec!['a', 'b', 'c', 'd', 'e', 'f']);
    assert_eq!(run.await.expect("join").expect("run"), MergeOutcome::Completed);
}

#[tokio::test]
async fn fair_merge_keeps_reading_the_surviving_input() {
    let inputs = vec![
        upstream_from_iter(Vec::<u32>::new()),
        upstream_from_iter(vec![1, 2, 3]),
        upstream_from_iter(vec![4]),
    ];
    let (driver, downstream) = MergeDriver::new(FairMerge::new(), inputs).expect("setup");
    let run = tokio::spawn(driver.run());
    let mut merged = downstream.collect(1).await.expect("merge");
    merged.sort_unstable();
    assert_eq!(merged, vec![1, 2, 3, 4]);
    assert_eq!(run.await.expect("join").expect("run"), MergeOutcome::Completed);
}

#[tokio::test]
async fn fair_merge_preserves_order_within_each_input() {
    let inputs = vec![
        upstream_from_iter(vec![10, 11, 12, 13]),
        upstream_from_iter(vec![20, 21]),
    ];
    let (driver, downstream) = MergeDriver::new(FairMerge::new(), inputs).expect("setup");
    let run = tokio::spawn(driver.run());
    let merged = downstream.collect(8).await.expect("merge");
    let first: Vec<_> = merged.iter().copied().filter(|x| *x < 20).collect();
    let second: Vec<_> = merged.iter().copied().filter(|x| *x >= 20).collect();
    assert_eq!(first, vec![10, 11, 12, 13]);
    assert_eq!(second, vec![20, 21]);
    run.await.expect("join").expect("run");
}

#[tokio::test]
async fn strict_round_robin_alternates_then_drains() {
    let inputs = vec![
        upstream_from_iter(vec!['a', 'b', 'c', 'd']),
        upstream_from_iter(vec!['e', 'f']),
    ];
    let (driver, downstream) = MergeDriver::new(StrictRoundRobin::new(), inputs).expect("setup");
    let run = tokio::spawn(driver.run());
    let merged = downstream.collect(2).await.expect("merge");
    assert_eq!(merged, vec!['a', 'e', 'b', 'f', 'c', 'd']);
    assert_eq!(run.await.expect("join").expect("run"), MergeOutcome::Completed);
}

#[tokio::test]
async fn strict_round_robin_drains_the_second_input_when_the_first_ends() {
    let inputs = vec![
        upstream_from_iter(vec![1]),
        upstream_from_iter(vec![2, 3, 4]),
    ];
    let (driver, downstream) = MergeDriver::new(StrictRoundRobin::new(), inputs).expect("setup");
    let run = tokio::spawn(driver.run());
    assert_eq!(downstream.collect(1).await.expect("merge"), vec![1, 2, 3, 4]);
    run.await.expect("join").expect("run");
}

#[tokio::test]
async fn strict_round_robin_fails_fast_on_either_input() {
    let failing = try_upstream(stream::iter(vec![
        Ok('e'),
        Err(UpstreamError::msg("socket reset")),
    ]));
    let inputs = vec![upstream_from_iter(vec!['a', 'b', 'c']), failing];
    let (driver, downstream) = MergeDriver::new(StrictRoundRobin::new(), inputs).expect("setup");
    let run = tokio::spawn(driver.run());
    let err = downstream.collect(4).await.expect_err("merge must fail");
    assert!(matches!(&err, MergeError::Upstream(cause) if cause.to_string() == "socket reset"));
    assert!(run.await.expect("join").is_err());
}

#[tokio::test]
async fn zip_pairs_in_order_and_never_reads_past_the_shorter_side() {
    let (a, meter_a) = metered(stream::iter(vec![1_u32, 2, 3, 4]));
    let b = upstream_from_iter(vec!['a', 'b', 'c']);
    let (driver, downstream) = MergeDriver::new(Zip::new(), Zip::upstreams(a, b)).expect("setup");
    let run = tokio::spawn(driver.run());

    let pairs = downstream.collect(8).await.expect("merge");
    assert_eq!(pairs, vec![(1, 'a'), (2, 'b'), (3, 'c')]);
    assert_eq!(run.await.expect("join").expect("run"), MergeOutcome::Completed);
    assert_eq!(meter_a.yielded(), 3, "element 4 must never be read");
    assert_eq!(meter_a.drops(), 1);
}

#[tokio::test]
async fn zip_closes_eagerly_when_a_ends_first() {
    let a = upstream_from_iter(vec![1_u8]);
    let (b, meter_b) = metered(stream::iter(vec!["x", "y", "z"]));
    let (driver, downstream) = MergeDriver::new(Zip::new(), Zip::upstreams(a, b)).expect("setup");
    let run = tokio::spawn(driver.run());
    assert_eq!(downstream.collect(8).await.expect("merge"), vec![(1, "x")]);
    run.await.expect("join").expect("run");
    assert!(meter_b.yielded() <= 2);
}

#[tokio::test]
async fn zip_fails_when_either_side_fails() {
    let a = upstream_from_iter(vec![1_u8, 2]);
    let b = try_upstream(stream::iter(vec![Err::<char, _>(UpstreamError::msg("decode"))]));
    let (driver, mut downstream) =
        MergeDriver::new(Zip::new(), Zip::upstreams(a, b)).expect("setup");
    let run = tokio::spawn(driver.run());
    downstream.request(4);
    match downstream.recv().await {
        Some(Delivery::Error(MergeError::Upstream(cause))) => assert_eq!(cause.to_string(), "decode"),
        other => unreachable!("unexpected delivery {other:?}"),
    }
    assert!(run.await.expect("join").is_err());
}

#[tokio::test]
async fn zip_rejects_wrong_arity_without_reading() {
    for count in [1_usize, 3] {
        let mut meters = Vec::new();
        let mut inputs = Vec::new();
        for _ in 0..count {
            let (input, meter) = metered(stream::iter(vec![ZipInput::<u8, char>::A(1)]));
            inputs.push(input);
            meters.push(meter);
        }
        let err = match MergeDriver::new(Zip::new(), inputs) {
            Ok(_) => unreachable!("zip accepted {count} inputs"),
            Err(err) => err,
        };
        assert!(err.is_configuration());
        assert!(err
            .to_string()
            .contains(&format!("Zip must have exactly two connected inputs, was {count}")));
        for meter in meters {
            assert_eq!(meter.polls(), 0);
            assert_eq!(meter.drops(), 1);
        }
    }
}

#[tokio::test]
async fn preferred_merge_serves_the_preferred_input_first() {
    let inputs = vec![
        upstream_from_iter(vec![1, 2, 3]),
        upstream_from_iter(vec![10, 20]),
        upstream_from_iter(vec![30]),
    ];
    let (driver, downstream) = MergeDriver::new(PreferredMerge::new(), inputs).expect("setup");
    let run = tokio::spawn(driver.run());
    let merged = downstream.collect(16).await.expect("merge");
    assert_eq!(&merged[..3], &[1, 2, 3]);
    let mut rest = merged[3..].to_vec();
    rest.sort_unstable();
    assert_eq!(rest, vec![10, 20, 30]);
    run.await.expect("join").expect("run");
}

#[tokio::test]
async fn preferred_merge_rotates_secondaries_while_the_preferred_input_flickers() {
    let inputs = vec![
        flicker(0_u8),
        upstream(stream::repeat(1_u8)),
        upstream(stream::repeat(2_u8)),
    ];
    let (driver, mut downstream) = MergeDriver::new(PreferredMerge::new(), inputs).expect("setup");
    let run = tokio::spawn(driver.run());
    downstream.request(40);
    let mut merged = Vec::new();
    while merged.len() < 40 {
        let delivery = downstream.recv().await;
        let Some(Delivery::Element(value)) = delivery else {
            unreachable!("merge ended early: {delivery:?}");
        };
        merged.push(value);
    }
    downstream.cancel();

    // Every secondary gets a turn within 2 * (N - 1) reads.
    for window in merged.windows(4) {
        for secondary in [1, 2] {
            assert!(
                window.contains(&secondary),
                "secondary input {secondary} starved in {merged:?}"
            );
        }
    }
    assert!(merged.contains(&0));
    assert_eq!(run.await.expect("join").expect("run"), MergeOutcome::Cancelled);
}

#[tokio::test]
async fn preferred_merge_needs_two_inputs() {
    let result = MergeDriver::new(PreferredMerge::new(), vec![upstream_from_iter(vec![1])]);
    assert!(matches!(result, Err(MergeError::Configuration { .. })));
}
