//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use core::hash::Hash;
use std::collections::HashMap;
use std::convert::TryInto;

use crate::choice::{ChoiceError, ChoiceResult};
use crate::possibility::Possibility;
use crate::test_case::TestCase;

/// The probability of continuing to produce another element, once we're
/// past `min` and below `max`. Biased towards continuing so collections
/// come out with a natural (non-degenerate) length distribution, while
/// still letting the "Remove k" shrink pass cleanly truncate by forcing
/// the bit to 0.
const CONTINUE_BIAS: f64 = 0.85;

/// Draws a `Vec<T>` of length in `[min, max]`. A weighted "continue?" bit
/// is drawn before each element: forced to 1 below `min`, forced to 0 at
/// `max`, otherwise biased towards continuing. Encoding length this way
/// (rather than drawing the length up front) is what lets the "Remove k"
/// shrink pass delete a run of elements by flipping one bit, without
/// having to reinterpret the rest of the stream.
pub struct Vectors<T, P> {
    elem: P,
    min: usize,
    max: usize,
    _marker: core::marker::PhantomData<T>,
}

impl<T, P: Possibility<T>> Vectors<T, P> {
    /// Build a possibility producing vectors of length in `[min, max]`.
    pub fn new(elem: P, min: usize, max: usize) -> Self {
        assert!(min <= max, "Vectors: min must be <= max");
        Vectors {
            elem,
            min,
            max,
            _marker: core::marker::PhantomData,
        }
    }
}

impl<T, P: Possibility<T>> Possibility<Vec<T>> for Vectors<T, P> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<Vec<T>> {
        let mut out = Vec::new();
        loop {
            let keep_going = if out.len() < self.min {
                tc.forced(1)?;
                true
            } else if out.len() >= self.max {
                tc.forced(0)?;
                false
            } else {
                tc.weighted(CONTINUE_BIAS)?
            };

            if !keep_going {
                break;
            }
            out.push(self.elem.produce(tc)?);
        }
        Ok(out)
    }
}

/// Draws a `(A, B)` by producing each possibility in sequence.
pub struct Pairs<A, B> {
    first: A,
    second: B,
}

impl<A, B> Pairs<A, B> {
    /// Build a possibility over pairs from two component possibilities.
    pub fn new(first: A, second: B) -> Self {
        Pairs { first, second }
    }
}

impl<T, U, A: Possibility<T>, B: Possibility<U>> Possibility<(T, U)> for Pairs<A, B> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<(T, U)> {
        let a = self.first.produce(tc)?;
        let b = self.second.produce(tc)?;
        Ok((a, b))
    }
}

/// Draws a `HashMap<K, V>` with `min_size <= len <= max_size`, trying up
/// to `max_size` key/value draws before rejecting with `Invalid` if it
/// still hasn't reached `min_size` (duplicate keys don't grow the map but
/// do count against this budget).
pub struct Dicts<K, V, PK, PV> {
    key: PK,
    value: PV,
    min_size: usize,
    max_size: usize,
    _marker: core::marker::PhantomData<(K, V)>,
}

impl<K, V, PK: Possibility<K>, PV: Possibility<V>> Dicts<K, V, PK, PV> {
    /// Build a possibility over maps with `min_size <= len <= max_size`.
    pub fn new(key: PK, value: PV, min_size: usize, max_size: usize) -> Self {
        assert!(min_size <= max_size, "Dicts: min_size must be <= max_size");
        Dicts {
            key,
            value,
            min_size,
            max_size,
            _marker: core::marker::PhantomData,
        }
    }
}

impl<K: Eq + Hash, V, PK: Possibility<K>, PV: Possibility<V>> Possibility<HashMap<K, V>>
    for Dicts<K, V, PK, PV>
{
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<HashMap<K, V>> {
        let mut out = HashMap::new();
        for _ in 0..self.max_size {
            if out.len() >= self.max_size {
                break;
            }
            let k = self.key.produce(tc)?;
            let v = self.value.produce(tc)?;
            out.insert(k, v);
        }
        if out.len() < self.min_size {
            return Err(ChoiceError::Invalid);
        }
        Ok(out)
    }
}

/// Draws `[T; N]` by producing `N` independent values from `elem`.
///
/// Not named in the distilled spec, but a natural low-cost addition given
/// `Vectors` already exists for the variable-length case (grounds
/// `arbitrary/arrays.rs` in the teacher crate).
pub struct Arrays<T, P, const N: usize> {
    elem: P,
    _marker: core::marker::PhantomData<T>,
}

impl<T, P: Possibility<T>, const N: usize> Arrays<T, P, N> {
    /// Build a possibility over fixed-size arrays.
    pub fn new(elem: P) -> Self {
        Arrays {
            elem,
            _marker: core::marker::PhantomData,
        }
    }
}

impl<T, P: Possibility<T>, const N: usize> Possibility<[T; N]> for Arrays<T, P, N> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<[T; N]> {
        let mut buf: Vec<T> = Vec::with_capacity(N);
        for _ in 0..N {
            buf.push(self.elem.produce(tc)?);
        }
        match buf.try_into() {
            Ok(arr) => Ok(arr),
            Err(_) => unreachable!("buf always has exactly N elements"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::possibility::numbers::Integers;
    use crate::rng::Seed;

    #[test]
    fn vectors_respect_length_bounds() {
        let mut tc = TestCase::new(Seed::Fixed(3), 512, 0, 0);
        let gen = Vectors::new(Integers::<i32>::new(0, 10), 2, 5);
        for _ in 0..30 {
            let v = gen.produce(&mut tc).unwrap();
            assert!(v.len() >= 2 && v.len() <= 5, "len={}", v.len());
        }
    }

    #[test]
    fn vectors_below_min_force_continuation() {
        // Two forced-continue bits, then a forced-stop bit: exactly 2 elements.
        let mut tc = TestCase::with_prefix(vec![5, 5, 0], Seed::Fixed(1), 16, 0, 0);
        let gen = Vectors::new(Integers::<i32>::new(0, 10), 2, 4);
        assert_eq!(gen.produce(&mut tc), Ok(vec![5, 5]));
    }

    #[test]
    fn dicts_reject_when_min_size_unreachable() {
        let mut tc = TestCase::new(Seed::Fixed(1), 512, 0, 0);
        // A key space of one value makes it impossible to reach min_size=3,
        // no matter how high max_size is.
        let gen = Dicts::new(ConstOf(0i32), ConstOf(1i32), 3, 5);
        assert_eq!(gen.produce(&mut tc), Err(ChoiceError::Invalid));
    }

    struct ConstOf<T>(T);
    impl<T: Clone> Possibility<T> for ConstOf<T> {
        fn produce(&self, _tc: &mut TestCase) -> ChoiceResult<T> {
            Ok(self.0.clone())
        }
    }
}
