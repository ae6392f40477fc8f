//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::choice::{ChoiceError, ChoiceResult};
use crate::possibility::collection::Vectors;
use crate::possibility::numbers::Integers;
use crate::possibility::Possibility;
use crate::test_case::TestCase;

/// Draws a `char` by sampling a `u32` code point in `[lo, hi]` and
/// rejecting surrogate values (which are valid `u32`s but not valid
/// `char`s). Grounds the "SampledFrom an appropriate code-point range,
/// optionally filtering for validity" behavior the spec calls for.
pub struct Characters {
    lo: u32,
    hi: u32,
}

impl Characters {
    /// Build a possibility over characters whose code point falls in
    /// `[lo, hi]` (inclusive).
    pub fn new(lo: char, hi: char) -> Self {
        assert!(lo <= hi, "Characters: lo must be <= hi");
        Characters {
            lo: lo as u32,
            hi: hi as u32,
        }
    }

    /// Every ASCII printable-or-not code point, `0x00..=0x7F`.
    pub fn ascii() -> Self {
        Characters::new('\0', '\u{7F}')
    }

    /// The full Unicode scalar value range.
    pub fn unicode() -> Self {
        Characters::new('\0', char::MAX)
    }
}

impl Possibility<char> for Characters {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<char> {
        let codepoints = Integers::<u32>::new(self.lo, self.hi);
        for _ in 0..8 {
            let cp = codepoints.produce(tc)?;
            if let Some(c) = char::from_u32(cp) {
                return Ok(c);
            }
        }
        Err(ChoiceError::Invalid)
    }
}

/// `Characters::ascii()`, as its own type for use in `Text`'s default
/// alphabet.
pub struct AsciiCharacters(Characters);

impl AsciiCharacters {
    /// Build the ASCII character possibility.
    pub fn new() -> Self {
        AsciiCharacters(Characters::ascii())
    }
}

impl Default for AsciiCharacters {
    fn default() -> Self {
        AsciiCharacters::new()
    }
}

impl Possibility<char> for AsciiCharacters {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<char> {
        self.0.produce(tc)
    }
}

/// `Characters::unicode()`, as its own type.
pub struct UnicodeCharacters(Characters);

impl UnicodeCharacters {
    /// Build the full-range Unicode character possibility.
    pub fn new() -> Self {
        UnicodeCharacters(Characters::unicode())
    }
}

impl Default for UnicodeCharacters {
    fn default() -> Self {
        UnicodeCharacters::new()
    }
}

impl Possibility<char> for UnicodeCharacters {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<char> {
        self.0.produce(tc)
    }
}

/// Draws a `String` of length in `[min_len, max_len]` by drawing
/// `alphabet` that many times and joining the result — a `Vectors<char,
/// _>` with the elements collected into a `String` instead of a `Vec`.
pub struct Text<P> {
    chars: Vectors<char, P>,
}

impl<P: Possibility<char>> Text<P> {
    /// Build a possibility over strings of length `[min_len, max_len]`
    /// drawn from `alphabet`.
    pub fn new(alphabet: P, min_len: usize, max_len: usize) -> Self {
        Text {
            chars: Vectors::new(alphabet, min_len, max_len),
        }
    }
}

impl<P: Possibility<char>> Possibility<String> for Text<P> {
    fn produce(&self, tc: &mut TestCase) -> ChoiceResult<String> {
        self.chars.produce(tc).map(|cs| cs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Seed;

    #[test]
    fn characters_stay_in_range() {
        let mut tc = TestCase::new(Seed::Fixed(7), 512, 0, 0);
        let gen = Characters::new('a', 'z');
        for _ in 0..50 {
            let c = gen.produce(&mut tc).unwrap();
            assert!(c.is_ascii_lowercase());
        }
    }

    #[test]
    fn characters_skip_surrogate_range() {
        // Surrogates make up only a small slice of this range, so the
        // retry-on-invalid loop in `produce` comfortably finds a valid
        // code point within its retry budget.
        let gen = Characters::new('\u{D000}', '\u{10000}');
        let mut tc = TestCase::new(Seed::Fixed(1), 4096, 0, 0);
        for _ in 0..200 {
            let c = gen.produce(&mut tc).unwrap();
            let cp = c as u32;
            assert!(!(0xD800..=0xDFFF).contains(&cp));
        }
    }

    #[test]
    fn text_respects_length_bounds() {
        let mut tc = TestCase::new(Seed::Fixed(2), 2048, 0, 0);
        let gen = Text::new(AsciiCharacters::new(), 3, 6);
        for _ in 0..20 {
            let s = gen.produce(&mut tc).unwrap();
            assert!(s.chars().count() >= 3 && s.chars().count() <= 6);
            assert!(s.is_ascii());
        }
    }
}
