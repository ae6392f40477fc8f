//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Hill-climbing targeted search (§4.5): once an initial `best_scoring`
//! example exists, mutate one of its choices at a time, probing larger
//! and larger steps while the score keeps improving, then refine by
//! halving back down once a probe overshoots. The direction (`+`/`-`)
//! and index are picked independently each round.

use rand::Rng;

use crate::choice::Choice;
use crate::evaluator;
use crate::generator::should_keep_generating;
use crate::possibility::Possibility;
use crate::rng;
#[cfg(test)]
use crate::scope;
use crate::test_case::TestCase;
use crate::test_state::TestState;
use std::time::Instant;

/// Run hill-climbing probes against `ts.best_scoring` until
/// `should_keep_generating` says to stop.
pub fn hill_climb<T>(
    ts: &mut TestState,
    possibility: &impl Possibility<T>,
    property: &impl Fn(&T) -> crate::errors::TestCaseResult,
    start: Instant,
) {
    while should_keep_generating(ts, start) {
        let Some((_, best)) = ts.best_scoring.clone() else {
            return;
        };
        if best.choices.is_empty() {
            return;
        }

        let index = rng::with_task_rng(|r| r.gen_range(0..best.choices.len()));
        let ascend = rng::with_task_rng(|r| r.gen_bool(0.5));

        climb_one_direction(ts, possibility, property, index, ascend, start);
    }
}

/// Probe `+1, +2, +4, +8, ...` (or the mirrored `-1, -2, -4, -8, ...`)
/// while the score improves, then halve the last step back down to
/// refine between the last-good and first-bad probe.
fn climb_one_direction<T>(
    ts: &mut TestState,
    possibility: &impl Possibility<T>,
    property: &impl Fn(&T) -> crate::errors::TestCaseResult,
    index: usize,
    ascend: bool,
    start: Instant,
) {
    let mut step: i128 = 1;
    let mut last_good_step: i128 = 0;

    loop {
        if !should_keep_generating(ts, start) {
            return;
        }
        let signed_step = if ascend { step } else { -step };
        if !probe(ts, possibility, property, index, signed_step) {
            break;
        }
        last_good_step = step;
        step = step.saturating_mul(2);
        if step > u32::MAX as i128 {
            break;
        }
    }

    // Refine: binary search between the last accepted step and the
    // first rejected one.
    let mut lo = last_good_step;
    let mut hi = step;
    while hi - lo > 1 {
        if !should_keep_generating(ts, start) {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let signed_mid = if ascend { mid } else { -mid };
        if probe(ts, possibility, property, index, signed_mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
}

/// Try nudging `best_scoring`'s choice at `index` by `delta`, clamped to
/// `Choice`'s range. Returns whether the probe strictly improved the
/// score (and, if so, it has already replaced `ts.best_scoring`, since
/// `test_function` does that bookkeeping).
fn probe<T>(
    ts: &mut TestState,
    possibility: &impl Possibility<T>,
    property: &impl Fn(&T) -> crate::errors::TestCaseResult,
    index: usize,
    delta: i128,
) -> bool {
    let Some((score_before, best)) = ts.best_scoring.clone() else {
        return false;
    };
    let mut choices = best.choices.clone();
    let current = choices[index] as i128;
    let nudged = (current + delta).clamp(0, Choice::MAX as i128) as Choice;
    if nudged == choices[index] {
        return false;
    }
    choices[index] = nudged;

    let max_size = ts.config.max_choices_per_draw();
    let mut tc = TestCase::with_prefix(
        choices,
        ts.config.rng_seed,
        max_size,
        best.generation,
        best.max_generation,
    );
    evaluator::test_function(ts, &mut tc, possibility, property);

    match &ts.best_scoring {
        Some((score_after, _)) => *score_after > score_before,
        None => false,
    }
}
