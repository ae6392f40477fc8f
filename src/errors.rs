//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error and outcome types threaded through the evaluator.

use core::fmt;

/// A human-readable explanation of why a draw was rejected or a property
/// failed, with an optional backtrace captured at the point of construction.
#[derive(Clone)]
pub struct Reason {
    message: String,
    backtrace: Option<std::sync::Arc<std::backtrace::Backtrace>>,
}

impl Reason {
    /// Build a reason from a message with no backtrace.
    pub fn new(message: impl Into<String>) -> Self {
        Reason {
            message: message.into(),
            backtrace: None,
        }
    }

    /// Build a reason from a message, capturing a backtrace if the
    /// `backtrace` feature is enabled.
    pub fn captured(message: impl Into<String>) -> Self {
        let backtrace = if cfg!(feature = "backtrace") {
            let bt = std::backtrace::Backtrace::capture();
            if bt.status() == std::backtrace::BacktraceStatus::Captured {
                Some(std::sync::Arc::new(bt))
            } else {
                None
            }
        } else {
            None
        };
        Reason {
            message: message.into(),
            backtrace,
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The captured backtrace, if any.
    pub fn backtrace(&self) -> Option<&std::backtrace::Backtrace> {
        self.backtrace.as_deref()
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Reason").field(&self.message).finish()
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl PartialEq for Reason {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}
impl Eq for Reason {}

impl From<&'static str> for Reason {
    fn from(s: &'static str) -> Self {
        Reason::new(s)
    }
}

impl From<String> for Reason {
    fn from(s: String) -> Self {
        Reason::new(s)
    }
}

/// How a single call into a property can signal a non-pass outcome.
///
/// Panics raised by the property body are caught by the evaluator
/// directly (see `crate::evaluator`), so they never need to unwind
/// through a `TestCaseError` — this type only covers the two outcomes a
/// property can signal without panicking, plus the budget exceeded case
/// a `Possibility` draw converts into automatically via `?`.
#[derive(Debug, Clone)]
pub enum TestCaseError {
    /// The draw was rejected, via `assume`/`reject` or a replay mismatch.
    /// Discarded; does not count as a test failure.
    Reject(Reason),
    /// The property failed for this input, without panicking.
    Fail(Reason),
    /// The `TestCase` exceeded its choice budget mid-draw. Discarded;
    /// does not count as a test failure.
    Overrun,
}

impl TestCaseError {
    /// Build a `Reject` from anything convertible to a `Reason`.
    pub fn reject(reason: impl Into<Reason>) -> Self {
        TestCaseError::Reject(reason.into())
    }

    /// Build a `Fail` from anything convertible to a `Reason`.
    pub fn fail(reason: impl Into<Reason>) -> Self {
        TestCaseError::Fail(reason.into())
    }
}

impl fmt::Display for TestCaseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TestCaseError::Reject(why) => write!(f, "input rejected: {why}"),
            TestCaseError::Fail(why) => write!(f, "case failed: {why}"),
            TestCaseError::Overrun => write!(f, "choice budget exceeded"),
        }
    }
}

impl From<crate::choice::ChoiceError> for TestCaseError {
    fn from(e: crate::choice::ChoiceError) -> Self {
        match e {
            crate::choice::ChoiceError::Overrun => TestCaseError::Overrun,
            crate::choice::ChoiceError::Invalid => {
                TestCaseError::Reject(Reason::new("draw rejected"))
            }
        }
    }
}

/// Convenience alias for the `Result` a property body returns.
pub type TestCaseResult = Result<(), TestCaseError>;

/// A whole-run failure, carrying the minimal reproducer found.
#[derive(Debug, Clone)]
pub enum TestError<T> {
    /// The run was aborted, e.g. too many draws were rejected.
    Abort(Reason),
    /// A minimal falsifying (or error-raising) example was found.
    Fail(Reason, T),
}

impl<T: fmt::Debug> fmt::Display for TestError<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TestError::Abort(why) => write!(f, "run aborted: {why}"),
            TestError::Fail(why, what) => {
                writeln!(f, "falsified: {why}.")?;
                write!(f, "minimal failing input: {what:#?}")
            }
        }
    }
}
