//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The ambient "current `TestCase`" scope.
//!
//! The user-visible primitives in §6.2 (`produce`, `assume`, `reject`,
//! `target`, `event`) don't take a `TestCase` explicitly — the surface
//! macro that would normally thread one through is out of scope here, so
//! instead they reach for whichever `TestCase` is currently being
//! evaluated. That state is scoped and stackable (pushed on entry to
//! `test_function`, popped on exit via a RAII guard) rather than a lazy
//! global singleton, so nested evaluation (shrinking re-entering the
//! evaluator while targeting is also in progress) never leaks context
//! from one draw into another.

use core::cell::RefCell;

use crate::errors::{TestCaseError, TestCaseResult};
use crate::possibility::Possibility;
use crate::test_case::TestCase;

thread_local! {
    static STACK: RefCell<Vec<*mut TestCase>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard popping the scope stack on drop, including on unwind.
struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        STACK.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// Run `f` with `tc` as the ambient current test case.
pub fn with_scope<R>(tc: &mut TestCase, f: impl FnOnce() -> R) -> R {
    STACK.with(|s| s.borrow_mut().push(tc as *mut TestCase));
    let _guard = ScopeGuard;
    f()
}

fn with_current<R>(f: impl FnOnce(&mut TestCase) -> R) -> R {
    let ptr = STACK.with(|s| {
        *s.borrow()
            .last()
            .expect("called outside of a property evaluation")
    });
    // SAFETY: the pointer was pushed by `with_scope` from a `&mut TestCase`
    // that outlives this call (the guard popping it runs only after `f`
    // returns in `with_scope`), and the scope stack is thread-local so no
    // other thread can alias it.
    let tc = unsafe { &mut *ptr };
    f(tc)
}

/// Draw from `p` using the ambient current test case.
pub fn produce<T>(p: &impl Possibility<T>) -> crate::choice::ChoiceResult<T> {
    with_current(|tc| p.produce(tc))
}

/// Reject this draw unless `cond` holds.
pub fn assume(cond: bool) -> TestCaseResult {
    if cond {
        Ok(())
    } else {
        Err(TestCaseError::reject("assume(false)"))
    }
}

/// Unconditionally reject this draw.
pub fn reject() -> TestCaseResult {
    Err(TestCaseError::reject("reject()"))
}

/// Unconditionally fail the property by panicking, for callers that want
/// to signal failure without threading a `TestCaseResult` back out.
///
/// This is the one "built-in error helper" §4.3.1 has in mind: its sole
/// job is to raise, so the evaluator's source-frame attribution skips
/// this frame and attributes the error to whichever frame called it.
pub fn fail_now(message: impl Into<String>) -> ! {
    panic!("{}", message.into());
}

/// Record a scalar for hill climbing on the ambient current test case.
pub fn target(score: f64) {
    with_current(|tc| tc.target(score));
}

/// Append a labelled value to the ambient current test case's event log.
pub fn event(label: impl Into<String>, value: impl Into<String>) {
    with_current(|tc| tc.event(label, value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::possibility::{Booleans, Integers};
    use crate::rng::Seed;

    #[test]
    fn produce_reaches_the_scoped_test_case() {
        let mut tc = TestCase::with_prefix(vec![1], Seed::Fixed(1), 8, 0, 0);
        let v = with_scope(&mut tc, || produce(&Booleans));
        assert_eq!(v, Ok(true));
    }

    #[test]
    fn target_and_event_touch_the_scoped_test_case() {
        let mut tc = TestCase::new(Seed::Fixed(1), 8, 0, 0);
        with_scope(&mut tc, || {
            target(3.0);
            event("label", "value");
        });
        assert_eq!(tc.targeting_score(), Some(3.0));
        assert_eq!(tc.events, vec![("label".to_owned(), "value".to_owned())]);
    }

    #[test]
    #[should_panic(expected = "outside of a property evaluation")]
    fn produce_outside_scope_panics() {
        let _ = produce(&Integers::<i32>::new(0, 1));
    }
}
