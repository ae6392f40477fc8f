//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`TestState`]: the state owned by one run of `generate`, threaded
//! through every evaluation, shrink, and targeting probe.

use crate::config::Config;
use crate::determinism::Determinism;
use crate::result::{ErrorCache, Stats, TargetError};
use crate::test_case::Attempt;

/// Everything one run of the search accumulates, per §3.
#[derive(Debug)]
pub struct TestState {
    pub config: Config,
    pub stats: Stats,
    /// The smallest Attempt whose property evaluated to "interesting"
    /// with no error.
    pub result: Option<Attempt>,
    /// The `(score, Attempt)` pair maximizing the last-recorded
    /// `targeting_score`.
    pub best_scoring: Option<(f64, Attempt)>,
    /// The smallest-known error-raising Attempt, with enough heuristic
    /// data to judge whether a later error is "the same" one.
    pub target_err: Option<TargetError>,
    pub error_cache: ErrorCache,
    pub test_is_trivial: bool,
    pub generation_indeterminate: Option<Determinism>,
    /// The property's stable DB key, used for persistence lookups.
    pub db_key: String,
}

impl TestState {
    /// Start a fresh run under `config`, addressed in the DB by `db_key`.
    pub fn new(config: Config, db_key: impl Into<String>) -> Self {
        TestState {
            config,
            stats: Stats::default(),
            result: None,
            best_scoring: None,
            target_err: None,
            error_cache: ErrorCache::default(),
            test_is_trivial: false,
            generation_indeterminate: None,
            db_key: db_key.into(),
        }
    }

    /// Whether the run has found anything worth shrinking: either a
    /// falsifying example or a reproducible error.
    pub fn has_interesting_example(&self) -> bool {
        self.result.is_some() || self.target_err.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_no_interesting_example() {
        let ts = TestState::new(Config::default(), "my::prop");
        assert!(!ts.has_interesting_example());
    }
}
