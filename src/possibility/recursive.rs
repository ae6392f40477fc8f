//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::rc::Rc;

use crate::choice::ChoiceResult;
use crate::possibility::{BoxedPossibility, Possibility};
use crate::test_case::TestCase;

/// Draws recursively-structured values (trees, nested JSON, and the
/// like) without the `Possibility` graph itself being cyclic. A weighted
/// "go deeper?" bit is drawn, forced to 0 once `max_layers` is reached,
/// to pick how many times to apply `wrap` to `base` before producing
/// from the result — building the tree top-down from a depth decided up
/// front, rather than having `wrap` call back into `Recursive::produce`
/// (which the spec's design notes rule out, to avoid a `Possibility`
/// that references itself).
pub struct Recursive<T> {
    base: BoxedPossibility<T>,
    wrap: Rc<dyn Fn(BoxedPossibility<T>) -> BoxedPossibility<T>>,
    max_layers: u32,
}

impl<T: 'static> Recursive<T> {
    /// Build a recursive possibility: `base` is the non-recursive case,
    /// `wrap` builds one more layer around an already-built possibility,
    /// and `max_layers` bounds how many times `wrap` is applied.
    pub fn new(
        base: BoxedPossibility<T>,
        wrap: impl Fn(BoxedPossibility<T>) -> BoxedPossibility<T> + 'static,
        max_layers: u32,
    ) -> Self {
        Recursive {
            base,
            wrap: Rc::new(wrap),
            max_layers,
        }
    }
}

impl<T: 'static> Possibility<T> for Recursive<T> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<T> {
        let mut depth = 0u32;
        loop {
            let keep_going = if depth >= self.max_layers {
                tc.forced(0)?;
                false
            } else {
                tc.weighted(0.5)?
            };
            if !keep_going {
                break;
            }
            depth += 1;
        }

        let mut current = self.base.clone();
        for _ in 0..depth {
            current = (self.wrap)(current);
        }
        current.produce(tc)
    }
}
