//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Attempt`] and [`TestCase`]: the core data model that every
//! [`Possibility`](crate::possibility::Possibility) draws against.

use core::cmp::Ordering;

use rand::Rng;

use crate::choice::{Choice, ChoiceError, ChoiceResult};
use crate::rng::{self, Seed};

/// An ordered choice sequence, plus the metadata needed to reproduce and
/// rank it.
///
/// Equality and hashing consider only the choice sequence; the generation
/// bookkeeping is informational. Ordering is lexicographic in the sense
/// used throughout this crate: shorter sequences are smaller, and
/// same-length sequences compare element-wise.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// The choices made during this draw, in order.
    pub choices: Vec<Choice>,
    /// How-many-th draw this is, 0-based.
    pub generation: usize,
    /// The highest generation index this run expects to reach.
    pub max_generation: usize,
}

impl Attempt {
    /// An attempt with no choices, generation 0.
    pub fn empty() -> Self {
        Attempt {
            choices: Vec::new(),
            generation: 0,
            max_generation: 0,
        }
    }

    /// Construct an attempt from a raw choice sequence, outside of any
    /// particular generation run (used when replaying a persisted attempt).
    pub fn from_choices(choices: Vec<Choice>) -> Self {
        Attempt {
            choices,
            generation: 0,
            max_generation: 0,
        }
    }
}

impl PartialEq for Attempt {
    fn eq(&self, other: &Self) -> bool {
        self.choices == other.choices
    }
}
impl Eq for Attempt {}

impl PartialOrd for Attempt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Attempt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.choices
            .len()
            .cmp(&other.choices.len())
            .then_with(|| self.choices.cmp(&other.choices))
    }
}

/// One in-progress draw.
///
/// A `TestCase` is created fresh for every call into the generator, lives
/// exactly as long as that one draw (and the property body that consumes
/// it), and is discarded once the draw's `Attempt` has been copied out by
/// the evaluator.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Choices to replay before randomness takes over, if any.
    prefix: Vec<Choice>,
    /// How far into `prefix` we've replayed.
    prefix_pos: usize,
    /// The PRNG state this draw is seeded from. Stored so the evaluator can
    /// copy it into the recorded `Attempt` and so the ambient RNG can be
    /// reseeded from it before user code runs.
    pub rng_seed: Seed,
    /// Upper bound on the number of choices this draw may make.
    pub max_size: usize,
    /// The choices made so far, plus generation bookkeeping.
    pub attempt: Attempt,
    /// A scalar for hill climbing; writable at most once per draw.
    targeting_score: Option<f64>,
    /// Labelled values recorded with `event()` during this draw.
    pub events: Vec<(String, String)>,
}

impl TestCase {
    /// Start a fresh draw with no prefix.
    pub fn new(rng_seed: Seed, max_size: usize, generation: usize, max_generation: usize) -> Self {
        rng::reseed_task_rng(rng_seed);
        TestCase {
            prefix: Vec::new(),
            prefix_pos: 0,
            rng_seed,
            max_size,
            attempt: Attempt {
                choices: Vec::new(),
                generation,
                max_generation,
            },
            targeting_score: None,
            events: Vec::new(),
        }
    }

    /// Start a draw that replays `prefix` before falling back to randomness.
    pub fn with_prefix(
        prefix: Vec<Choice>,
        rng_seed: Seed,
        max_size: usize,
        generation: usize,
        max_generation: usize,
    ) -> Self {
        rng::reseed_task_rng(rng_seed);
        TestCase {
            prefix,
            prefix_pos: 0,
            rng_seed,
            max_size,
            attempt: Attempt {
                choices: Vec::new(),
                generation,
                max_generation,
            },
            targeting_score: None,
            events: Vec::new(),
        }
    }

    /// Whether this draw is still replaying its prefix.
    pub fn in_prefix(&self) -> bool {
        self.prefix_pos < self.prefix.len()
    }

    /// Append `n` unconditionally. Fails with `Overrun` if the budget is
    /// exhausted.
    pub fn forced(&mut self, n: Choice) -> ChoiceResult<Choice> {
        if self.attempt.choices.len() >= self.max_size {
            return Err(ChoiceError::Overrun);
        }
        self.attempt.choices.push(n);
        Ok(n)
    }

    /// Draw a value in `[0, hi]`.
    pub fn choice(&mut self, hi: Choice) -> ChoiceResult<Choice> {
        if self.in_prefix() {
            let v = self.prefix[self.prefix_pos];
            self.prefix_pos += 1;
            if v > hi {
                return Err(ChoiceError::Invalid);
            }
            return self.forced(v);
        }

        let v = if hi == 0 {
            0
        } else {
            rng::with_task_rng(|r| r.gen_range(0..=hi))
        };
        self.forced(v)
    }

    /// Draw a boolean with probability `p` of being `true`.
    pub fn weighted(&mut self, p: f64) -> ChoiceResult<bool> {
        if self.in_prefix() {
            let v = self.prefix[self.prefix_pos];
            self.prefix_pos += 1;
            if v > 1 {
                return Err(ChoiceError::Invalid);
            }
            self.forced(v)?;
            return Ok(v != 0);
        }

        let b = rng::with_task_rng(|r| r.gen_bool(p.clamp(0.0, 1.0)));
        self.forced(b as u64)?;
        Ok(b)
    }

    /// Record a scalar for hill climbing. Subsequent writes in the same
    /// draw overwrite the previous value and emit a warning, per the
    /// "at-most-one-write" contract.
    pub fn target(&mut self, score: f64) {
        if self.targeting_score.is_some() {
            eprintln!(
                "conjecture: target() called more than once in the same \
                 test case; using the latest value ({score})."
            );
        }
        self.targeting_score = Some(score);
    }

    /// The targeting score recorded so far, if any.
    pub fn targeting_score(&self) -> Option<f64> {
        self.targeting_score
    }

    /// Append a labelled value to this draw's event log.
    pub fn event(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.events.push((label.into(), value.into()));
    }

    /// Whether this draw consumed zero choices so far.
    pub fn is_trivial(&self) -> bool {
        self.attempt.choices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_ordering_is_length_then_elementwise() {
        let shorter = Attempt::from_choices(vec![9, 9]);
        let longer = Attempt::from_choices(vec![0, 0, 0]);
        assert!(shorter < longer);

        let a = Attempt::from_choices(vec![1, 2]);
        let b = Attempt::from_choices(vec![1, 3]);
        assert!(a < b);
    }

    #[test]
    fn forced_respects_max_size() {
        let mut tc = TestCase::new(Seed::Fixed(1), 1, 0, 0);
        assert_eq!(tc.forced(5), Ok(5));
        assert_eq!(tc.forced(6), Err(ChoiceError::Overrun));
    }

    #[test]
    fn choice_replays_prefix_then_falls_back_to_rng() {
        let mut tc = TestCase::with_prefix(vec![2], Seed::Fixed(1), 8, 0, 0);
        assert_eq!(tc.choice(5), Ok(2));
        // past the prefix now; should not error for a valid range
        assert!(tc.choice(5).is_ok());
    }

    #[test]
    fn prefix_value_exceeding_bound_is_invalid() {
        let mut tc = TestCase::with_prefix(vec![9], Seed::Fixed(1), 8, 0, 0);
        assert_eq!(tc.choice(3), Err(ChoiceError::Invalid));
    }

    #[test]
    fn target_overwrites_and_is_idempotent_in_value() {
        let mut tc = TestCase::new(Seed::Fixed(1), 8, 0, 0);
        tc.target(1.0);
        tc.target(2.0);
        assert_eq!(tc.targeting_score(), Some(2.0));
    }
}
