//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Run configuration, with environment-variable overrides following the
//! same `CONJECTURE_*` convention proptest uses for `PROPTEST_*`.

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use crate::db::{Database, DirectoryDatabase, NoOpDatabase};
use crate::rng::Seed;

/// Upper bound on accepted draws (§6.3), or no bound at all. The
/// environment-variable and on-disk representation is a plain integer,
/// `-1` meaning unbounded; this type exists so the rest of the engine
/// never has to treat `-1` as a magic sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxExamples {
    /// Stop once this many valid, non-trivial draws have been accepted.
    Bounded(u32),
    /// Never stop on example count alone; rely on an interesting example,
    /// a configured timeout, or a trivial property to end the run.
    Unbounded,
}

impl MaxExamples {
    /// `self` as a `u64` bound, or `None` if unbounded.
    pub fn as_bound(self) -> Option<u64> {
        match self {
            MaxExamples::Bounded(n) => Some(n as u64),
            MaxExamples::Unbounded => None,
        }
    }
}

impl fmt::Display for MaxExamples {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MaxExamples::Bounded(n) => write!(f, "{n}"),
            MaxExamples::Unbounded => write!(f, "-1"),
        }
    }
}

impl FromStr for MaxExamples {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: i64 = s.parse()?;
        Ok(if n < 0 {
            MaxExamples::Unbounded
        } else {
            MaxExamples::Bounded(n.min(u32::MAX as i64) as u32)
        })
    }
}

/// Override the config fields from environment variables, if any are set.
#[cfg(feature = "std")]
pub fn contextualize_config(mut result: Config) -> Config {
    use std::env;
    use std::str::FromStr;

    const CASES: &str = "CONJECTURE_CASES";
    const BUFFER_SIZE: &str = "CONJECTURE_BUFFER_SIZE";
    const VERBOSE: &str = "CONJECTURE_VERBOSE";
    const TIMEOUT_MS: &str = "CONJECTURE_TIMEOUT_MS";
    const RNG_SEED: &str = "CONJECTURE_RNG_SEED";
    const DISABLE_DB: &str = "CONJECTURE_DISABLE_DB";

    fn parse_or_warn<T: FromStr + fmt::Display>(
        src: &str,
        dst: &mut T,
        typ: &str,
        var: &str,
    ) {
        if let Ok(value) = src.parse() {
            *dst = value;
        } else {
            eprintln!(
                "conjecture: the env-var {var}={src} can't be parsed as \
                 {typ}, using default of {dst}."
            );
        }
    }

    for (var, value) in env::vars() {
        match var.as_str() {
            CASES => parse_or_warn(&value, &mut result.max_examples, "i64 (-1 = unbounded)", CASES),
            BUFFER_SIZE => {
                parse_or_warn(&value, &mut result.buffer_size, "usize", BUFFER_SIZE)
            }
            VERBOSE => parse_or_warn(&value, &mut result.verbose, "u32", VERBOSE),
            TIMEOUT_MS => {
                let mut millis = result.timeout.map(|d| d.as_millis() as u64).unwrap_or(0);
                parse_or_warn(&value, &mut millis, "u64", TIMEOUT_MS);
                result.timeout = if millis == 0 {
                    None
                } else {
                    Some(Duration::from_millis(millis))
                };
            }
            RNG_SEED => {
                if let Some(seed) = Seed::from_persistence(&value) {
                    result.rng_seed = seed;
                } else {
                    eprintln!(
                        "conjecture: the env-var {RNG_SEED}={value} isn't a \
                         valid seed, ignoring."
                    );
                }
            }
            DISABLE_DB
                if (value == "1" || value.eq_ignore_ascii_case("true")) => {
                    result.db = Box::new(NoOpDatabase);
                }
            other if other.starts_with("CONJECTURE_") => {
                eprintln!("conjecture: ignoring unknown env-var {other}.");
            }
            _ => {}
        }
    }

    result
}

#[cfg(not(feature = "std"))]
pub fn contextualize_config(result: Config) -> Config {
    result
}

fn default_default_config() -> Config {
    Config {
        max_examples: MaxExamples::Bounded(100),
        buffer_size: 8 * 1024,
        timeout: None,
        record: true,
        verbose: 0,
        broken: false,
        db: Box::new(DirectoryDatabase::default_location()),
        rng_seed: Seed::from_entropy(),
        _non_exhaustive: (),
    }
}

#[cfg(feature = "std")]
lazy_static::lazy_static! {
    static ref DEFAULT_CONFIG: Config = contextualize_config(default_default_config());
}

/// Configuration for a single property's search.
pub struct Config {
    /// Upper bound on the number of accepted (valid, non-trivial) draws;
    /// this does not count replays of a persisted failure. `-1` from
    /// `CONJECTURE_CASES` or [`Config::unbounded`] lifts the bound
    /// entirely.
    pub max_examples: MaxExamples,
    /// Maximum number of choices a single draw may make. The effective
    /// buffer handed to each `TestCase` is `buffer_size * 8`, per the
    /// generator loop's bound in §4.4.
    pub buffer_size: usize,
    /// Optional wall-clock deadline for the whole search.
    pub timeout: Option<Duration>,
    /// Whether this run's outcome should be reported into a parent
    /// test-set. Left to the (out-of-scope) host integration; stored here
    /// only so it threads through configuration plumbing uniformly.
    pub record: bool,
    /// 0 = silent; 1 = log failures and targeting improvements; 2 = trace
    /// low-level generation/shrink detail.
    pub verbose: u32,
    /// If true, a `Pass` outcome is itself reported as an error: the
    /// property is expected to currently fail.
    pub broken: bool,
    /// Where persisted failures are read from and written to.
    pub db: Box<dyn Database>,
    /// Seed for the run's PRNG.
    pub rng_seed: Seed,
    #[doc(hidden)]
    pub _non_exhaustive: (),
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Config {
            max_examples: self.max_examples,
            buffer_size: self.buffer_size,
            timeout: self.timeout,
            record: self.record,
            verbose: self.verbose,
            broken: self.broken,
            db: self.db.box_clone(),
            rng_seed: self.rng_seed,
            _non_exhaustive: (),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("max_examples", &self.max_examples)
            .field("buffer_size", &self.buffer_size)
            .field("timeout", &self.timeout)
            .field("record", &self.record)
            .field("verbose", &self.verbose)
            .field("broken", &self.broken)
            .field("rng_seed", &self.rng_seed)
            .finish()
    }
}

impl Config {
    /// A config only differing from `default()` in `max_examples`.
    pub fn with_cases(max_examples: u32) -> Self {
        Config {
            max_examples: MaxExamples::Bounded(max_examples),
            ..Config::default()
        }
    }

    /// A config only differing from `default()` in lifting the
    /// `max_examples` bound entirely (the `-1` option from §6.3).
    pub fn unbounded() -> Self {
        Config {
            max_examples: MaxExamples::Unbounded,
            ..Config::default()
        }
    }

    /// A config only differing from `default()` in `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Config {
            timeout: Some(timeout),
            ..Config::default()
        }
    }

    /// The effective per-draw choice budget: `buffer_size * 8`.
    pub fn max_choices_per_draw(&self) -> usize {
        self.buffer_size.saturating_mul(8)
    }
}

#[cfg(feature = "std")]
impl Default for Config {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

#[cfg(not(feature = "std"))]
impl Default for Config {
    fn default() -> Self {
        default_default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_cases_only_changes_cases() {
        let c = Config::with_cases(7);
        assert_eq!(c.max_examples, MaxExamples::Bounded(7));
        assert_eq!(c.buffer_size, Config::default().buffer_size);
    }

    #[test]
    fn unbounded_lifts_the_cases_limit() {
        let c = Config::unbounded();
        assert_eq!(c.max_examples, MaxExamples::Unbounded);
        assert_eq!(c.max_examples.as_bound(), None);
    }

    #[test]
    fn max_examples_parses_negative_one_as_unbounded() {
        assert_eq!("-1".parse::<MaxExamples>(), Ok(MaxExamples::Unbounded));
        assert_eq!("42".parse::<MaxExamples>(), Ok(MaxExamples::Bounded(42)));
    }

    #[test]
    fn max_choices_per_draw_is_eight_times_buffer() {
        let c = Config {
            buffer_size: 10,
            ..Config::default()
        };
        assert_eq!(c.max_choices_per_draw(), 80);
    }
}
