//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The generator loop (§4.4): replay a persisted failure first if one
//! exists, then draw fresh `TestCase`s until the run should stop, handing
//! off to targeted search once half the example budget is spent and a
//! `best_scoring` example exists.
//!
//! Simplified from Hypothesis's own Rust engine prototype
//! (`conjecture-rust/src/engine.rs`'s `MainGenerationLoop`), which drives
//! this same loop but across worker threads connected by channels; spec
//! §5 mandates a single-threaded, non-multiplexing engine, so this is a
//! direct synchronous call path instead.

use std::time::Instant;

use rand::RngCore;
use rand_chacha::ChaCha8Rng;

use crate::evaluator;
use crate::possibility::Possibility;
use crate::rng::Seed;
#[cfg(test)]
use crate::scope;
use crate::targeting;
use crate::test_case::TestCase;
use crate::test_state::TestState;

/// §4.4's stopping condition: keep drawing fresh examples while none of
/// these hold.
pub fn should_keep_generating(ts: &TestState, start: Instant) -> bool {
    if ts.test_is_trivial {
        return false;
    }
    if ts.has_interesting_example() {
        return false;
    }
    if let Some(max_examples) = ts.config.max_examples.as_bound() {
        if ts.stats.acceptions >= max_examples {
            return false;
        }
        if ts.stats.attempts >= 10 * max_examples {
            return false;
        }
    }
    if let Some(timeout) = ts.config.timeout {
        if start.elapsed() >= timeout {
            return false;
        }
    }
    true
}

fn derive_seed(master: &mut ChaCha8Rng) -> Seed {
    Seed::Fixed(master.next_u64())
}

/// Run the whole search: replay, fresh generation, and (if a scoring
/// target turns up) targeted search, leaving the final interesting
/// example (if any) in `ts.result`/`ts.target_err`.
pub fn generate<T>(
    ts: &mut TestState,
    possibility: &impl Possibility<T>,
    property: impl Fn(&T) -> crate::errors::TestCaseResult,
) {
    let start = Instant::now();
    let max_size = ts.config.max_choices_per_draw();

    if let Some(persisted) = ts.config.db.get(&ts.db_key) {
        let mut tc = TestCase::with_prefix(
            persisted.choices.clone(),
            ts.config.rng_seed,
            max_size,
            0,
            0,
        );
        evaluator::test_function(ts, &mut tc, possibility, &property);
    }

    let mut master = ts.config.rng_seed.to_rng();
    let half_budget = ts
        .config
        .max_examples
        .as_bound()
        .map(|n| (n / 2).max(1))
        .unwrap_or(u64::MAX);
    let mut generation = 0usize;

    while should_keep_generating(ts, start) {
        if ts.best_scoring.is_some() && ts.stats.acceptions >= half_budget {
            break;
        }

        generation += 1;
        let seed = derive_seed(&mut master);
        let mut tc = TestCase::new(seed, max_size, generation, 0);
        evaluator::test_function(ts, &mut tc, possibility, &property);
    }

    if ts.best_scoring.is_some() && !ts.has_interesting_example() {
        targeting::hill_climb(ts, possibility, &property, start);
    }

    ts.stats.wall_time = start.elapsed();

    if let Some(db_key) = Some(ts.db_key.clone()) {
        if let Some(result) = &ts.result {
            ts.config.db.put(&db_key, result);
        } else if let Some(target_err) = &ts.target_err {
            ts.config.db.put(&db_key, &target_err.attempt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::errors::TestCaseError;
    use crate::possibility::Integers;

    #[test]
    fn finds_a_failing_integer_above_five() {
        let possibility = Integers::<i32>::new(-100, 100);
        let property = |n: &i32| -> crate::errors::TestCaseResult {
            if *n > 5 {
                Err(TestCaseError::fail("n exceeded five"))
            } else {
                Ok(())
            }
        };

        let mut ts = TestState::new(Config::with_cases(500), "generator::tests::above_five");
        ts.config.rng_seed = Seed::Fixed(3);
        ts.config.db = Box::new(crate::db::NoOpDatabase);
        generate(&mut ts, &possibility, property);

        assert!(ts.result.is_some());
    }

    #[test]
    fn vacuous_property_passes_with_no_acceptions() {
        let possibility = Integers::<i32>::new(0, 10);
        let property =
            |_n: &i32| -> crate::errors::TestCaseResult { scope::reject() };

        let mut ts = TestState::new(Config::with_cases(50), "generator::tests::vacuous");
        ts.config.db = Box::new(crate::db::NoOpDatabase);
        generate(&mut ts, &possibility, property);

        assert!(!ts.has_interesting_example());
        assert_eq!(ts.stats.acceptions, 0);
        assert!(ts.stats.rejections > 0);
    }
}
