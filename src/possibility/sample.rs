//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::choice::{ChoiceError, ChoiceResult};
use crate::possibility::numbers::WeightedNumbers;
use crate::possibility::Possibility;
use crate::test_case::TestCase;

/// Always produces a clone of the same value, consuming no choices at
/// all.
pub struct Just<T>(T);

impl<T> Just<T> {
    /// Wrap a constant value as a possibility.
    pub fn new(value: T) -> Self {
        Just(value)
    }
}

impl<T: Clone> Possibility<T> for Just<T> {
    fn produce(&self, _tc: &mut TestCase) -> ChoiceResult<T> {
        Ok(self.0.clone())
    }
}

/// Draws uniformly from a fixed, non-empty list of values.
pub struct SampledFrom<T> {
    values: Vec<T>,
}

impl<T: Clone> SampledFrom<T> {
    /// Build a possibility sampling uniformly from `values`. Panics if
    /// `values` is empty.
    pub fn new(values: Vec<T>) -> Self {
        assert!(!values.is_empty(), "SampledFrom requires at least one value");
        SampledFrom { values }
    }
}

impl<T: Clone> Possibility<T> for SampledFrom<T> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<T> {
        let i = tc.choice((self.values.len() - 1) as u64)? as usize;
        Ok(self.values[i].clone())
    }
}

/// Draws from a fixed list of values, each with its own relative weight.
pub struct WeightedSample<T> {
    values: Vec<T>,
    picker: WeightedNumbers,
}

impl<T: Clone> WeightedSample<T> {
    /// Build from `(weight, value)` pairs. Panics if `pairs` is empty or
    /// the total weight is non-positive.
    pub fn new(pairs: Vec<(f64, T)>) -> Self {
        assert!(!pairs.is_empty(), "WeightedSample requires at least one value");
        let weights = pairs.iter().map(|(w, _)| *w).collect();
        let values = pairs.into_iter().map(|(_, v)| v).collect();
        WeightedSample {
            values,
            picker: WeightedNumbers::new(weights),
        }
    }
}

impl<T: Clone> Possibility<T> for WeightedSample<T> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<T> {
        let i = self.picker.produce(tc)?;
        self.values
            .get(i)
            .cloned()
            .ok_or(ChoiceError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Seed;

    #[test]
    fn just_never_consumes_choices() {
        let mut tc = TestCase::with_prefix(vec![], Seed::Fixed(1), 0, 0, 0);
        assert_eq!(Just::new(42).produce(&mut tc), Ok(42));
    }

    #[test]
    fn sampled_from_stays_in_set() {
        let mut tc = TestCase::new(Seed::Fixed(3), 256, 0, 0);
        let gen = SampledFrom::new(vec!["a", "b", "c"]);
        for _ in 0..20 {
            let v = gen.produce(&mut tc).unwrap();
            assert!(["a", "b", "c"].contains(&v));
        }
    }

    #[test]
    fn weighted_sample_heavily_favors_dominant_weight() {
        let mut tc = TestCase::new(Seed::Fixed(5), 4096, 0, 0);
        let gen = WeightedSample::new(vec![(0.01, "rare"), (0.99, "common")]);
        let mut common_count = 0;
        for _ in 0..200 {
            if gen.produce(&mut tc).unwrap() == "common" {
                common_count += 1;
            }
        }
        assert!(common_count > 150, "common_count={common_count}", common_count = common_count);
    }
}
