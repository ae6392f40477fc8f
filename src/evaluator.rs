//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `test_function`: the single point at which a property runs (§4.3).

use core::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::errors::{Reason, TestCaseError, TestCaseResult};
use crate::possibility::Possibility;
use crate::result::TargetError;
use crate::scope;
use crate::test_case::TestCase;
use crate::test_state::TestState;

/// An exception captured from a property's panic, with just enough
/// structure to drive §4.3's "is this the same error as before"
/// comparison.
#[derive(Debug, Clone)]
pub struct CapturedError {
    pub reason: Reason,
    /// A coarse stand-in for "exception type": Rust panics don't carry a
    /// type hierarchy the way exceptions in languages with a real
    /// exception class do, so this distinguishes only the handful of
    /// payload shapes `panic!` and friends actually produce.
    pub kind: &'static str,
    /// Symbolicated backtrace frames, outermost (closest to the panic)
    /// first. Empty if the `backtrace` feature is disabled or the
    /// platform/build didn't retain symbols.
    pub frames: Vec<String>,
}

impl CapturedError {
    /// The frame §4.3.1 attributes this error to.
    pub fn source_frame(&self) -> Option<String> {
        attribute_source_frame(&self.frames, HELPER_FRAME_MARKERS)
    }

    /// How many user frames precede the attributed source frame — the
    /// "user-stack depth" used to rank competing errors in §4.3 step 6.
    pub fn user_stack_depth(&self) -> usize {
        self.frames
            .iter()
            .position(|f| {
                Some(f.as_str()) == attribute_source_frame(&self.frames, HELPER_FRAME_MARKERS)
                    .as_deref()
            })
            .unwrap_or(0)
    }
}

/// Symbol substrings identifying this crate's own "sole job is to raise"
/// helpers, so a panic routed through one of them is attributed to its
/// caller instead. `scope::fail_now` is the one helper this crate
/// provides for that purpose.
const HELPER_FRAME_MARKERS: &[&str] = &["conjecture::scope::fail_now"];

/// Given symbolicated frames (outermost first), pick the one the error
/// should be attributed to: the top frame, unless it matches a known
/// "built-in error helper", in which case the frame below it.
fn attribute_source_frame(frames: &[String], helper_markers: &[&str]) -> Option<String> {
    let top = frames.first()?;
    if frames.len() >= 2 && helper_markers.iter().any(|m| top.contains(m)) {
        Some(frames[1].clone())
    } else {
        Some(top.clone())
    }
}

thread_local! {
    static LAST_PANIC: RefCell<Option<(String, &'static str)>> = const { RefCell::new(None) };
}

#[allow(clippy::incompatible_msrv)]
fn record_panic_payload(info: &panic::PanicHookInfo<'_>) {
    let payload = info.payload();
    let (message, kind) = if let Some(s) = payload.downcast_ref::<&'static str>() {
        (s.to_string(), "str")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        (s.clone(), "string")
    } else {
        ("<non-string panic payload>".to_owned(), "unknown")
    };
    let message = match info.location() {
        Some(loc) => format!("{message} at {loc}"),
        None => message,
    };
    LAST_PANIC.with(|cell| *cell.borrow_mut() = Some((message, kind)));
}

fn backtrace_frames() -> Vec<String> {
    if !cfg!(feature = "backtrace") {
        return Vec::new();
    }
    let bt = std::backtrace::Backtrace::force_capture();
    bt.to_string()
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
                trimmed.split_once(':').map(|x| x.1).map(|s| s.trim().to_owned())
            } else {
                None
            }
        })
        .collect()
}

/// Run `f` under `tc`, catching panics rather than letting them unwind
/// past the evaluator. Generic over the return type so it can wrap
/// either the generation phase (drawing a value) or the property phase
/// (checking it), which `test_function` times separately.
fn run_caught<R>(f: impl FnOnce() -> R) -> Result<R, CapturedError> {
    let prev_hook = panic::take_hook();
    panic::set_hook(Box::new(record_panic_payload));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    panic::set_hook(prev_hook);

    match outcome {
        Ok(result) => Ok(result),
        Err(_) => {
            let frames = backtrace_frames();
            let (message, kind) = LAST_PANIC
                .with(|cell| cell.borrow_mut().take())
                .unwrap_or_else(|| ("<unknown panic>".to_owned(), "unknown"));
            Err(CapturedError {
                reason: Reason::new(message),
                kind,
                frames,
            })
        }
    }
}

/// What running the property on one `TestCase` amounted to.
#[derive(Debug)]
pub enum Evaluation {
    /// Returned `Ok(())`: held for this input.
    NotInteresting,
    /// Returned `Err(TestCaseError::Fail(..))`: a counterexample, no
    /// panic involved.
    Interesting(Reason),
    /// The draw exceeded its choice budget.
    Overrun,
    /// The draw was explicitly rejected, or a replay was inconsistent.
    Invalid,
    /// The property panicked.
    Error(CapturedError),
}

/// Draw a value from `possibility` and run `property` on it, both under
/// `tc`, update `ts` per §4.3, and report `(was_more_interesting,
/// was_better)`.
///
/// The draw and the property call are timed separately, feeding
/// `ts.stats.generation_time` and `ts.stats.run_time` respectively (§6.4):
/// a draw that overruns or the property rejecting never reaches the
/// property-timing phase, so `run_time` stays empty for that call.
pub fn test_function<T>(
    ts: &mut TestState,
    tc: &mut TestCase,
    possibility: &impl Possibility<T>,
    property: impl FnOnce(&T) -> TestCaseResult,
) -> (bool, bool) {
    ts.stats.attempts += 1;

    let gen_started = Instant::now();
    let generated = scope::with_scope(tc, || {
        run_caught(|| scope::produce(possibility).map_err(TestCaseError::from))
    });
    let generation_time = gen_started.elapsed().as_secs_f64();

    let (caught, run_time) = match generated {
        Err(captured) => (Err(captured), 0.0),
        Ok(Err(e)) => (Ok(Err(e)), 0.0),
        Ok(Ok(value)) => {
            let run_started = Instant::now();
            let caught = scope::with_scope(tc, || run_caught(|| property(&value)));
            (caught, run_started.elapsed().as_secs_f64())
        }
    };

    ts.test_is_trivial = tc.is_trivial();

    let evaluation = match caught {
        Err(captured) => Evaluation::Error(captured),
        Ok(Ok(())) => Evaluation::NotInteresting,
        Ok(Err(TestCaseError::Fail(why))) => Evaluation::Interesting(why),
        Ok(Err(TestCaseError::Reject(_))) => Evaluation::Invalid,
        Ok(Err(TestCaseError::Overrun)) => Evaluation::Overrun,
    };

    match &evaluation {
        Evaluation::Overrun => {
            ts.stats.overruns += 1;
            return (false, false);
        }
        Evaluation::Invalid => {
            ts.stats.rejections += 1;
            return (false, false);
        }
        _ => {
            ts.stats.acceptions += 1;
            ts.stats.invocations += 1;
            ts.stats.generation_time.push(generation_time);
            ts.stats.run_time.push(run_time);
        }
    }

    let mut was_more_interesting = false;
    let mut was_better = false;

    match evaluation {
        Evaluation::NotInteresting => {
            if let Some(score) = tc.targeting_score() {
                if ts.best_scoring.as_ref().map(|(s, _)| score > *s).unwrap_or(true) {
                    ts.best_scoring = Some((score, tc.attempt.clone()));
                    ts.stats.improvements += 1;
                    was_better = true;
                }
            }
        }
        Evaluation::Interesting(_why) => {
            was_more_interesting = true;
            let replace = match &ts.result {
                None => true,
                Some(existing) => tc.attempt < *existing,
            };
            if replace {
                ts.result = Some(tc.attempt.clone());
            }
            if let Some(score) = tc.targeting_score() {
                let better = match &ts.best_scoring {
                    None => true,
                    Some((s, existing)) => {
                        score > *s || (score == *s && tc.attempt > *existing)
                    }
                };
                if better {
                    ts.best_scoring = Some((score, tc.attempt.clone()));
                    ts.stats.improvements += 1;
                    was_better = true;
                }
            }
        }
        Evaluation::Error(captured) => {
            was_more_interesting = true;
            let source_frame = captured.source_frame();
            let user_stack_depth = captured.user_stack_depth();

            let is_same = ts
                .target_err
                .as_ref()
                .map(|prior| prior.kind == captured.kind && prior.source_frame == source_frame)
                .unwrap_or(false);

            let is_new_kind = ts.target_err.is_none();

            if is_new_kind {
                ts.target_err = Some(TargetError {
                    attempt: tc.attempt.clone(),
                    reason: captured.reason.clone(),
                    kind: captured.kind,
                    user_stack_depth,
                    source_frame,
                });
            } else if is_same {
                let prior = ts.target_err.as_ref().unwrap();
                let better = user_stack_depth < prior.user_stack_depth
                    || (user_stack_depth == prior.user_stack_depth
                        && tc.attempt < prior.attempt);
                if better {
                    ts.target_err = Some(TargetError {
                        attempt: tc.attempt.clone(),
                        reason: captured.reason.clone(),
                        kind: captured.kind,
                        user_stack_depth,
                        source_frame,
                    });
                }
            } else {
                let frame_label = source_frame.clone().unwrap_or_else(|| "<unknown>".to_owned());
                if ts.error_cache.warn_once(captured.kind, &frame_label) {
                    eprintln!(
                        "conjecture: a second, distinct error kind was observed \
                         ({} at {frame_label}); keeping the first one found.",
                        captured.kind
                    );
                }
            }
        }
        Evaluation::Overrun | Evaluation::Invalid => unreachable!("handled above"),
    }

    (was_more_interesting, was_better)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::possibility::Just;
    use crate::rng::Seed;
    use crate::test_state::TestState;

    fn fresh(max_size: usize) -> (TestState, TestCase) {
        (
            TestState::new(Config::with_cases(10), "evaluator::tests"),
            TestCase::new(Seed::Fixed(1), max_size, 0, 0),
        )
    }

    #[test]
    fn passing_property_is_not_interesting() {
        let (mut ts, mut tc) = fresh(8);
        let possibility = Just::new(());
        let (interesting, _) = test_function(&mut ts, &mut tc, &possibility, |_| Ok(()));
        assert!(!interesting);
        assert_eq!(ts.stats.acceptions, 1);
        assert_eq!(ts.stats.generation_time.count(), 1);
        assert_eq!(ts.stats.run_time.count(), 1);
    }

    #[test]
    fn explicit_fail_is_interesting_and_recorded() {
        let (mut ts, mut tc) = fresh(8);
        let possibility = Just::new(());
        let (interesting, _) =
            test_function(&mut ts, &mut tc, &possibility, |_| Err(TestCaseError::fail("nope")));
        assert!(interesting);
        assert!(ts.result.is_some());
    }

    #[test]
    fn reject_is_discarded_and_counted() {
        let (mut ts, mut tc) = fresh(8);
        let possibility = Just::new(());
        let (interesting, _) =
            test_function(&mut ts, &mut tc, &possibility, |_| scope::reject());
        assert!(!interesting);
        assert_eq!(ts.stats.rejections, 1);
        assert!(ts.result.is_none());
    }

    #[test]
    fn panic_is_captured_as_an_error() {
        let (mut ts, mut tc) = fresh(8);
        let possibility = Just::new(());
        let (interesting, _) = test_function(&mut ts, &mut tc, &possibility, |_| {
            panic!("boom");
        });
        assert!(interesting);
        assert!(ts.target_err.is_some());
        assert!(ts.result.is_none());
    }

    #[test]
    fn attribution_skips_a_recognized_helper_frame() {
        let frames = vec![
            "conjecture::scope::fail_now".to_owned(),
            "my_crate::my_property".to_owned(),
            "core::ops::function::FnOnce::call_once".to_owned(),
        ];
        let attributed = attribute_source_frame(&frames, HELPER_FRAME_MARKERS);
        assert_eq!(attributed.as_deref(), Some("my_crate::my_property"));
    }

    #[test]
    fn attribution_uses_top_frame_when_not_a_helper() {
        let frames = vec!["my_crate::my_property".to_owned()];
        let attributed = attribute_source_frame(&frames, HELPER_FRAME_MARKERS);
        assert_eq!(attributed.as_deref(), Some("my_crate::my_property"));
    }
}
