//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The determinism pre-check (§4.7): run the generator twice from the
//! same initial RNG state before searching, and classify whether it's
//! safe to assume replaying a choice sequence reproduces the same value.

use core::any::Any;
use core::fmt::Debug;

use crate::choice::ChoiceResult;
use crate::rng::Seed;
use crate::test_case::TestCase;

/// Classification of a generator (and, transitively, the property built
/// on top of it) produced by running it twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Determinism {
    /// Both runs produced equal values (or bit-identical ones, for types
    /// with no real equality). Safe to search and shrink normally.
    Deterministic,
    /// Both runs produced equal-typed values but no meaningful equality
    /// is available to compare them; proceed anyway.
    Indeterminate,
    /// The two runs drew values of different Rust types. Cannot happen in
    /// this crate's statically-typed `Possibility<T>`, kept for parity
    /// with the taxonomy the spec defines for dynamically-typed hosts.
    GenTypeNondeterministic,
    /// One run raised while the other didn't, or the two raised
    /// different errors, or produced different values.
    ThrowsNondeterministic,
}

/// Draw from `gen` twice from the same seed and classify the result.
/// `values_match` should report whether two produced values should be
/// considered equal; pass `None` when `T` has no meaningful equality, in
/// which case two non-erroring draws are reported `Indeterminate`.
pub fn check<T>(
    produce: impl Fn(&mut TestCase) -> ChoiceResult<T>,
    seed: Seed,
    max_size: usize,
    values_match: Option<impl Fn(&T, &T) -> bool>,
) -> Determinism
where
    T: Any,
{
    let mut first_tc = TestCase::new(seed, max_size, 0, 0);
    let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| produce(&mut first_tc)));

    let mut second_tc = TestCase::new(seed, max_size, 0, 0);
    let second = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| produce(&mut second_tc)));

    match (first, second) {
        (Ok(Ok(a)), Ok(Ok(b))) => match values_match {
            Some(eq) => {
                if eq(&a, &b) {
                    Determinism::Deterministic
                } else {
                    Determinism::ThrowsNondeterministic
                }
            }
            None => Determinism::Indeterminate,
        },
        (Ok(Err(e1)), Ok(Err(e2))) => {
            if e1 == e2 {
                Determinism::Deterministic
            } else {
                Determinism::ThrowsNondeterministic
            }
        }
        (Err(_), Err(_)) => Determinism::ThrowsNondeterministic,
        _ => Determinism::ThrowsNondeterministic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::possibility::{Integers, Possibility};

    #[test]
    fn stable_generator_is_deterministic() {
        let gen = Integers::<i32>::new(0, 1000);
        let outcome = check(
            |tc| gen.produce(tc),
            Seed::Fixed(7),
            64,
            Some(|a: &i32, b: &i32| a == b),
        );
        assert_eq!(outcome, Determinism::Deterministic);
    }

    #[test]
    fn generator_that_panics_once_is_nondeterministic() {
        use core::cell::Cell;
        let calls = Cell::new(0);
        let outcome = check(
            |tc| {
                let n = calls.get();
                calls.set(n + 1);
                if n == 0 {
                    panic!("boom")
                }
                tc.choice(10)
            },
            Seed::Fixed(1),
            64,
            Some(|a: &u64, b: &u64| a == b),
        );
        assert_eq!(outcome, Determinism::ThrowsNondeterministic);
    }
}
