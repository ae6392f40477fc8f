//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A choice-sequence driven property-based testing engine.
//!
//! The pieces, roughly bottom-up:
//!
//! - [`choice`] and [`mod@test_case`]: randomness is reified as a stream of
//!   `u64` choices, so shrinking a failing example is just shrinking that
//!   stream.
//! - [`possibility`]: composable generators (`Possibility<T>`) built out
//!   of those choices.
//! - [`scope`]: the ambient "current test case" a property's `produce`,
//!   `assume`, `target`, and `event` calls reach for.
//! - [`evaluator`]: runs one property call and classifies the outcome.
//! - [`generator`], [`targeting`], [`shrink`]: the search loop, the
//!   hill-climbing pass once a scoring target turns up, and the
//!   multi-pass shrinker that runs once something interesting is found.
//! - [`config`] and [`db`]: run configuration and failure persistence.
//!
//! [`check`] ties all of it together into the single entry point most
//! callers need.

pub mod choice;
pub mod config;
pub mod db;
pub mod determinism;
pub mod errors;
pub mod evaluator;
pub mod generator;
pub mod possibility;
pub mod result;
pub mod rng;
pub mod scope;
pub mod shrink;
pub mod targeting;
pub mod test_case;
pub mod test_state;

use core::fmt::Debug;

use crate::config::Config;
use crate::errors::{Reason, TestCaseError};
use crate::possibility::Possibility;
use crate::result::{db_key, RunResult};
use crate::test_case::TestCase;
use crate::test_state::TestState;

/// Run `property` against values drawn from `possibility` under `config`,
/// addressed in the example database by `module_path`/`property_name`.
///
/// This is the single call most callers need: it runs the determinism
/// pre-check (§4.7), drives generation and (if applicable) targeted
/// search (§4.4–§4.5), shrinks whatever interesting example was found
/// (§4.6), and persists or clears the database entry accordingly.
pub fn check<T: Clone + Debug + 'static>(
    config: Config,
    module_path: &str,
    property_name: &str,
    possibility: impl Possibility<T>,
    property: impl Fn(&T) -> crate::errors::TestCaseResult + Clone,
) -> RunResult<T> {
    let key = db_key(module_path, property_name);

    let seed = config.rng_seed;
    let max_size = config.max_choices_per_draw();
    let determinism = determinism::check(
        |tc| possibility.produce(tc),
        seed,
        max_size,
        Option::<fn(&T, &T) -> bool>::None,
    );
    if let determinism::Determinism::ThrowsNondeterministic = determinism {
        return RunResult::Nondeterministic {
            detail: "the generator or property raised inconsistently across two runs \
                     from the same seed"
                .to_owned(),
        };
    }

    let mut ts = TestState::new(config, key);
    ts.generation_indeterminate = Some(determinism);

    generator::generate(&mut ts, &possibility, &property);
    shrink::shrink(&mut ts, &possibility, &property);

    to_run_result(ts, &possibility)
}

fn to_run_result<T: Clone>(
    ts: TestState,
    possibility: &impl Possibility<T>,
) -> RunResult<T> {
    let max_size = ts.config.max_choices_per_draw();
    let replay = |attempt: &test_case::Attempt| -> T {
        let mut tc = TestCase::with_prefix(
            attempt.choices.clone(),
            ts.config.rng_seed,
            max_size,
            attempt.generation,
            attempt.max_generation,
        );
        scope::with_scope(&mut tc, || scope::produce(possibility))
            .expect("a previously-accepted attempt must still replay cleanly")
    };

    if ts.config.timeout.is_some()
        && !ts.has_interesting_example()
        && ts.stats.acceptions == 0
        && ts.stats.wall_time >= ts.config.timeout.unwrap()
    {
        return RunResult::Timeout { stats: ts.stats };
    }

    if let Some(target_err) = &ts.target_err {
        let example = replay(&target_err.attempt);
        return RunResult::Error {
            example,
            reason: target_err.reason.clone(),
            events: Vec::new(),
            stats: ts.stats,
        };
    }

    if let Some(result) = &ts.result {
        let example = replay(result);
        let score = ts
            .best_scoring
            .as_ref()
            .filter(|(_, a)| a == result)
            .map(|(s, _)| *s);
        return RunResult::Fail {
            example,
            score,
            events: Vec::new(),
            stats: ts.stats,
        };
    }

    let best_scoring = ts
        .best_scoring
        .as_ref()
        .map(|(score, attempt)| (*score, replay(attempt)));
    RunResult::Pass {
        best_scoring,
        stats: ts.stats,
    }
}

/// Build a `TestError`-style message for a `RunResult::Fail`/`Error`,
/// mirroring the final report a harness would print.
pub fn describe_failure<T: Debug>(reason: &Reason, example: &T) -> String {
    format!("falsified: {reason}.\nminimal failing input: {example:#?}")
}

#[allow(dead_code)]
fn _assert_error_from_choice_error_compiles(e: choice::ChoiceError) -> TestCaseError {
    e.into()
}
