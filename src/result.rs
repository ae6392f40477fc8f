//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Run-level statistics and the final result taxonomy (§4.10).

use core::time::Duration;
use std::collections::BTreeMap;

use crate::errors::Reason;
use crate::test_case::Attempt;

/// Online mean/variance via Welford's method, so per-call durations don't
/// need to be retained to report statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Welford {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    /// Fold one more sample in.
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    /// Number of samples folded in so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Running mean, or 0 if no samples yet.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Running (population) variance, or 0 if fewer than 2 samples.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }
}

/// Per-run counters and timing statistics, per §6.4.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Every call into the evaluator, regardless of outcome.
    pub attempts: u64,
    /// Draws accepted as valid (not Overrun/Invalid).
    pub acceptions: u64,
    /// Draws discarded as Invalid.
    pub rejections: u64,
    /// Draws discarded as Overrun.
    pub overruns: u64,
    /// Times the property body actually ran to completion or panicked
    /// (i.e. excludes draws that never reached user code).
    pub invocations: u64,
    /// Successful shrink steps across the whole run.
    pub shrinks: u64,
    /// Times a targeting probe improved on the current best score.
    pub improvements: u64,
    /// Online stats for the time spent drawing each example.
    pub generation_time: Welford,
    /// Online stats for the time spent running the property body.
    pub run_time: Welford,
    /// Wall-clock time for the whole run.
    pub wall_time: Duration,
}

/// The final outcome of a run, per §4.10.
#[derive(Debug, Clone)]
pub enum RunResult<Args> {
    /// No interesting example found.
    Pass {
        /// The best-scoring example seen, if targeting was used.
        best_scoring: Option<(f64, Args)>,
        stats: Stats,
    },
    /// A non-throwing counterexample was found and shrunk.
    Fail {
        /// The minimized falsifying arguments.
        example: Args,
        /// The targeting score at the point of failure, if any.
        score: Option<f64>,
        events: Vec<(String, String)>,
        stats: Stats,
    },
    /// A panic was raised and shrunk towards a minimal reproducer.
    Error {
        example: Args,
        reason: Reason,
        events: Vec<(String, String)>,
        stats: Stats,
    },
    /// The configured deadline was reached before any example concluded.
    Timeout { stats: Stats },
    /// Generation or the property itself was not reproducible (§4.7).
    Nondeterministic { detail: String },
}

/// A stable textual key for a property, used by the Example DB. Grounds
/// the normative layout in §6.5: one directory per module, one file per
/// property.
pub fn db_key(module_path: &str, property_name: &str) -> String {
    format!("{module_path}::{property_name}")
}

/// The smallest-known Attempt that raised an error, paired with the
/// heuristic data needed to decide whether a later error is "the same"
/// one (§4.3 step 6).
#[derive(Debug, Clone)]
pub struct TargetError {
    pub attempt: Attempt,
    pub reason: Reason,
    /// A coarse stand-in for "exception type" (Rust panics don't carry a
    /// rich type hierarchy the way exceptions in other languages do):
    /// which built-in payload type the panic carried.
    pub kind: &'static str,
    pub user_stack_depth: usize,
    pub source_frame: Option<String>,
}

/// Per-error-kind warning suppression: once a (kind, source_frame) pair
/// has been reported, further instances are ignored rather than spamming
/// the same warning on every divergent-error shrink attempt.
#[derive(Debug, Clone, Default)]
pub struct ErrorCache {
    seen: BTreeMap<(&'static str, String), ()>,
}

impl ErrorCache {
    /// Record `(kind, source_frame)` as having been warned about, and
    /// report whether this is the first time.
    pub fn warn_once(&mut self, kind: &'static str, source_frame: &str) -> bool {
        let key = (kind, source_frame.to_owned());
        if let std::collections::btree_map::Entry::Vacant(e) = self.seen.entry(key) {
            e.insert(());
            true
        } else {
            false
        }
    }
}
