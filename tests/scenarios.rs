//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end scenarios for the search-and-shrink pipeline, run through
//! the top-level [`conjecture::check`] entry point rather than any one
//! module in isolation.

use std::time::{Duration, Instant};

use conjecture::config::Config;
use conjecture::db::{DirectoryDatabase, NoOpDatabase};
use conjecture::errors::{TestCaseError, TestCaseResult};
use conjecture::possibility::{Integers, Pairs, Vectors};
use conjecture::result::RunResult;
use conjecture::rng::Seed;
use conjecture::scope;

fn config_with_seed(cases: u32, seed: u64) -> Config {
    let mut config = Config::with_cases(cases);
    config.rng_seed = Seed::Fixed(seed);
    config.db = Box::new(NoOpDatabase);
    config
}

/// S1: a vector of integers in `[0, 10_000]` whose sum exceeds 1000
/// shrinks towards a minimal 2-element witness.
#[test]
fn s1_vector_sum_shrinks_to_a_minimal_witness() {
    let possibility = Vectors::new(Integers::<i64>::new(0, 10_000), 0, 1000);
    let property = |v: &Vec<i64>| -> TestCaseResult {
        if v.iter().sum::<i64>() > 1000 {
            Err(TestCaseError::fail("sum exceeded 1000"))
        } else {
            Ok(())
        }
    };

    let result = conjecture::check(
        config_with_seed(500, 11),
        "scenarios",
        "s1_vector_sum",
        possibility,
        property,
    );

    match result {
        RunResult::Fail { example, .. } => {
            assert!(example.iter().sum::<i64>() > 1000);
            assert!(
                example.len() <= 2,
                "expected a near-minimal vector, got {example:?}",
                example = example
            );
        }
        other => panic!("expected Fail, got {other:?}", other = other),
    }
}

/// S2: two integers in `[0, 1000]` summing to more than 1000 shrinks
/// towards `(1, 1000)` or an equivalent minimal pair.
#[test]
fn s2_two_integers_shrink_to_a_minimal_pair() {
    let possibility = Pairs::new(Integers::<i64>::new(0, 1000), Integers::<i64>::new(0, 1000));
    let property = |(a, b): &(i64, i64)| -> TestCaseResult {
        if a + b > 1000 {
            Err(TestCaseError::fail("sum exceeded 1000"))
        } else {
            Ok(())
        }
    };

    let result = conjecture::check(
        config_with_seed(500, 5),
        "scenarios",
        "s2_pair_sum",
        possibility,
        property,
    );

    match result {
        RunResult::Fail { example: (a, b), .. } => {
            assert!(a + b > 1000);
            assert!(
                a.min(b) <= 1,
                "expected one side near 0 or 1, got ({a}, {b})",
                a = a,
                b = b
            );
        }
        other => panic!("expected Fail, got {other:?}", other = other),
    }
}

/// S3: targeting a fixed value via `target(-|RANDOM_TARGET - n|)` finds
/// it in far fewer than 10,000 attempts.
#[test]
fn s3_targeting_finds_a_fixed_value_quickly() {
    const RANDOM_TARGET: i64 = 8321;
    let possibility = Integers::<i64>::new(0, 100_000);
    let property = |n: &i64| -> TestCaseResult {
        scope::target(-((RANDOM_TARGET - n).abs() as f64));
        if *n == RANDOM_TARGET {
            Err(TestCaseError::fail("hit the target"))
        } else {
            Ok(())
        }
    };

    let mut config = config_with_seed(10_000, 0);
    config.buffer_size = 64;
    let result = conjecture::check(config, "scenarios", "s3_target", possibility, property);

    match result {
        RunResult::Fail { example, stats, .. } => {
            assert_eq!(example, RANDOM_TARGET);
            assert!(
                stats.attempts < 10_000,
                "expected far fewer than 10,000 attempts, used {attempts}",
                attempts = stats.attempts
            );
        }
        other => panic!("expected Fail, got {other:?}", other = other),
    }
}

/// S4: a panic raised when `i >= -5` reports the minimal example and
/// attributes the error to the property body.
#[test]
fn s4_panic_reports_minimal_example_and_attributes_to_the_property() {
    let possibility = Integers::<i8>::new(-128, 127);
    let property = |i: &i8| -> TestCaseResult {
        assert!(*i > -5, "i={i} must be greater than -5", i = i);
        Ok(())
    };

    let result = conjecture::check(
        config_with_seed(500, 0),
        "scenarios",
        "s4_panic",
        possibility,
        property,
    );

    match result {
        RunResult::Error { example, reason, .. } => {
            assert_eq!(example, -5);
            assert!(reason.message().contains("i=-5"));
        }
        other => panic!("expected Error, got {other:?}", other = other),
    }
}

/// S5: a property that sleeps past a short deadline reports Pass with
/// fewer than the configured example budget and doesn't run far past
/// the deadline.
#[test]
fn s5_deadline_bounds_total_runtime() {
    let possibility = Integers::<i32>::new(0, 10);
    let property = |_n: &i32| -> TestCaseResult {
        std::thread::sleep(Duration::from_millis(10));
        Ok(())
    };

    let mut config = config_with_seed(100, 19);
    config.timeout = Some(Duration::from_millis(100));

    let start = Instant::now();
    let result = conjecture::check(config, "scenarios", "s5_deadline", possibility, property);
    let elapsed = start.elapsed();

    match result {
        RunResult::Pass { stats, .. } => {
            assert!(stats.acceptions < 100);
            assert!(
                elapsed <= Duration::from_millis(100 + 50),
                "expected to stop near the deadline, took {elapsed:?}",
                elapsed = elapsed
            );
        }
        other => panic!("expected Pass, got {other:?}", other = other),
    }
}

/// A previously persisted failure replays as the same example on the
/// next run, even with a budget too small to rediscover it by fresh
/// search (`max_examples = 1`).
#[test]
fn replay_reproduces_a_persisted_failure() {
    let dir = tempfile::tempdir().unwrap();
    let possibility = || Integers::<i64>::new(0, 1_000_000);
    let property = |n: &i64| -> TestCaseResult {
        if *n > 123_456 {
            Err(TestCaseError::fail("n exceeded 123456"))
        } else {
            Ok(())
        }
    };

    let mut first_config = Config::with_cases(2000);
    first_config.rng_seed = Seed::Fixed(29);
    first_config.db = Box::new(DirectoryDatabase::new(dir.path()));
    let first = conjecture::check(
        first_config,
        "scenarios",
        "replay_reproduces",
        possibility(),
        property,
    );
    let first_example = match first {
        RunResult::Fail { example, .. } => example,
        other => panic!("expected Fail on first run, got {other:?}", other = other),
    };

    let mut second_config = Config::with_cases(1);
    second_config.rng_seed = Seed::Fixed(31);
    second_config.db = Box::new(DirectoryDatabase::new(dir.path()));
    let second = conjecture::check(
        second_config,
        "scenarios",
        "replay_reproduces",
        possibility(),
        property,
    );

    match second {
        RunResult::Fail { example, .. } => assert_eq!(example, first_example),
        other => panic!("expected Fail on replay, got {other:?}", other = other),
    }
}

/// S6: a property that always rejects its input passes vacuously, with
/// zero acceptions and at least one rejection.
#[test]
fn s6_always_rejecting_property_passes_vacuously() {
    let possibility = Integers::<i32>::new(0, 10);
    let property = |_n: &i32| -> TestCaseResult { scope::reject() };

    let result = conjecture::check(
        config_with_seed(100, 23),
        "scenarios",
        "s6_vacuous",
        possibility,
        property,
    );

    match result {
        RunResult::Pass { stats, .. } => {
            assert_eq!(stats.acceptions, 0);
            assert!(stats.rejections > 0);
        }
        other => panic!("expected Pass, got {other:?}", other = other),
    }
}
