//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The possibility library: composable generators that consume from a
//! [`TestCase`] to produce typed values. Every primitive here is built
//! purely out of [`TestCase::forced`]/[`choice`]/[`weighted`] so that
//! shrinking the underlying choice sequence shrinks whatever value was
//! produced.
//!
//! [`choice`]: crate::test_case::TestCase::choice
//! [`weighted`]: crate::test_case::TestCase::weighted

mod bool_;
mod char_string;
mod collection;
mod float;
mod numbers;
mod recursive;
mod sample;

pub use bool_::Booleans;
pub use char_string::{AsciiCharacters, Characters, Text, UnicodeCharacters};
pub use collection::{Arrays, Dicts, Pairs, Vectors};
pub use float::Floats;
pub use numbers::{Integers, NonZeroIntegers, WeightedNumbers};
pub use recursive::Recursive;
pub use sample::{Just, SampledFrom, WeightedSample};

use std::marker::PhantomData;
use std::rc::Rc;

use crate::choice::ChoiceResult;
use crate::test_case::TestCase;

/// A generator that produces a `T` by consuming choices from a
/// [`TestCase`].
///
/// The only side effect a `Possibility` may have is consuming from the
/// `TestCase` (which may also record `event`s); it must never reach for an
/// ambient source of randomness directly, or shrinking the choice sequence
/// would stop corresponding to shrinking the produced value.
pub trait Possibility<T> {
    /// Draw a value, consuming some choices from `tc`.
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<T>;

    /// Transform produced values with a pure function.
    fn map<U, F>(self, f: F) -> Map<Self, F, T>
    where
        Self: Sized,
        F: Fn(T) -> U,
    {
        Map {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }

    /// Keep only values satisfying `pred`, retrying up to a small fixed
    /// number of times before giving up with `Invalid`.
    fn filter<F>(self, pred: F) -> Filter<Self, F>
    where
        Self: Sized,
        F: Fn(&T) -> bool,
    {
        Filter { inner: self, pred }
    }

    /// Use a produced value to pick the next possibility.
    fn bind<U, P2, F>(self, f: F) -> Bind<Self, F, T>
    where
        Self: Sized,
        P2: Possibility<U>,
        F: Fn(T) -> P2,
    {
        Bind {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }

    /// Erase this possibility's concrete type behind an `Rc`, so it can be
    /// stored alongside others of the same `T` (used by `OneOf` and
    /// `Recursive`).
    fn boxed(self) -> BoxedPossibility<T>
    where
        Self: Sized + 'static,
        T: 'static,
    {
        Rc::new(self)
    }
}

/// A possibility whose concrete generator has been erased.
pub type BoxedPossibility<T> = Rc<dyn Possibility<T>>;

impl<T, P: Possibility<T> + ?Sized> Possibility<T> for Rc<P> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<T> {
        (**self).produce(tc)
    }
}

/// See [`Possibility::map`].
pub struct Map<P, F, T> {
    inner: P,
    f: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, U, P: Possibility<T>, F: Fn(T) -> U> Possibility<U> for Map<P, F, T> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<U> {
        self.inner.produce(tc).map(&self.f)
    }
}

/// See [`Possibility::filter`]. Retries up to this many times before
/// rejecting the draw; matches the value the source implementation uses
/// (spec.md's open question on whether to make this configurable is
/// resolved by just fixing it, as the source does).
const FILTER_MAX_RETRIES: u32 = 3;

/// See [`Possibility::filter`].
pub struct Filter<P, F> {
    inner: P,
    pred: F,
}

impl<T, P: Possibility<T>, F: Fn(&T) -> bool> Possibility<T> for Filter<P, F> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<T> {
        for _ in 0..FILTER_MAX_RETRIES {
            let v = self.inner.produce(tc)?;
            if (self.pred)(&v) {
                return Ok(v);
            }
        }
        Err(crate::choice::ChoiceError::Invalid)
    }
}

/// See [`Possibility::bind`].
pub struct Bind<P, F, T> {
    inner: P,
    f: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, U, P: Possibility<T>, P2: Possibility<U>, F: Fn(T) -> P2> Possibility<U>
    for Bind<P, F, T>
{
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<U> {
        let v = self.inner.produce(tc)?;
        (self.f)(v).produce(tc)
    }
}

/// Picks uniformly among several possibilities of the same type, then
/// produces from the chosen branch.
pub struct OneOf<T> {
    branches: Vec<BoxedPossibility<T>>,
}

impl<T> OneOf<T> {
    /// Build a `OneOf` over the given branches. Panics if `branches` is
    /// empty, since there would be nothing to produce.
    pub fn new(branches: Vec<BoxedPossibility<T>>) -> Self {
        assert!(!branches.is_empty(), "OneOf requires at least one branch");
        OneOf { branches }
    }
}

impl<T> Possibility<T> for OneOf<T> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<T> {
        let i = tc.choice((self.branches.len() - 1) as u64)? as usize;
        self.branches[i].produce(tc)
    }
}

/// Build a [`OneOf`] from a list of boxed possibilities.
pub fn one_of<T: 'static>(branches: Vec<BoxedPossibility<T>>) -> OneOf<T> {
    OneOf::new(branches)
}
