//! Divisible numbers hidden in free text.
//!
//! [`divisible`] reads a string left to right, treats every contiguous run of
//! ASCII digits as a source of numbers, and collects each substring of a run
//! whose value is divisible by the divisor but whose decimal form does not
//! contain the divisor's decimal form.
//!
//! Runs may be arbitrarily long. Candidates are tracked as a start offset and
//! a remainder modulo the divisor, so no value is ever materialized as a
//! bounded integer.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// A non-negative integer of any length, kept as canonical decimal digits.
///
/// Canonical means no leading zeros (zero itself is `"0"`). Ordering is
/// numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DigitNumber(String);

impl DigitNumber {
    /// Canonical form of an all-digit string.
    fn from_digits(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            Self("0".to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Decimal digits without leading zeros.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal digits.
    pub fn digits(&self) -> usize {
        self.0.len()
    }

    /// The value as a `u128`, if it fits.
    pub fn to_u128(&self) -> Option<u128> {
        self.0.parse().ok()
    }
}

impl From<u128> for DigitNumber {
    fn from(value: u128) -> Self {
        Self(value.to_string())
    }
}

impl Ord for DigitNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for DigitNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DigitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Last character was not a digit
    Outside,
    /// Inside a run of digits
    InRun,
}

/// Substring of the current run, by byte offset, and its value mod the divisor.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    remainder: u128,
}

/// Every number in `s` divisible by `divisor` that does not contain it.
///
/// A number is any substring of a digit run, read in base ten (leading zeros
/// allowed, so `"05"` is 5). Returns an empty set if `divisor < 1`.
///
/// ```
/// use basket::digits::divisible;
///
/// let found: Vec<String> = divisible("a1x20-05", 5)
///     .iter()
///     .map(ToString::to_string)
///     .collect();
/// assert_eq!(found, ["0", "20"]);
/// ```
pub fn divisible(s: &str, divisor: i64) -> BTreeSet<DigitNumber> {
    let mut found = BTreeSet::new();
    let Ok(divisor) = u128::try_from(divisor) else {
        return found;
    };
    if divisor == 0 {
        return found;
    }
    let pattern = divisor.to_string();

    let mut state = State::Outside;
    let mut run = String::new();
    let mut in_flight: Vec<Candidate> = Vec::new();

    for ch in s.chars() {
        state = match (state, ch.to_digit(10).map(u128::from)) {
            (_, None) => {
                run.clear();
                in_flight.clear();
                State::Outside
            }
            (State::Outside, Some(digit)) => {
                run.push(ch);
                in_flight.push(Candidate {
                    start: 0,
                    remainder: digit % divisor,
                });
                State::InRun
            }
            (State::InRun, Some(digit)) => {
                // divisor < 2^63, so remainder * 10 + digit stays far below u128::MAX
                for candidate in &mut in_flight {
                    candidate.remainder = (candidate.remainder * 10 + digit) % divisor;
                }
                in_flight.push(Candidate {
                    start: run.len(),
                    remainder: digit % divisor,
                });
                run.push(ch);
                State::InRun
            }
        };

        if state == State::InRun {
            found.extend(
                in_flight
                    .iter()
                    .filter(|c| c.remainder == 0)
                    .map(|c| DigitNumber::from_digits(&run[c.start..]))
                    .filter(|n| !n.as_str().contains(&pattern)),
            );
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    fn set(values: &[u128]) -> BTreeSet<DigitNumber> {
        values.iter().copied().map(DigitNumber::from).collect()
    }

    /// Every substring of every digit run, parsed directly.
    fn brute_force(s: &str, divisor: u128) -> BTreeSet<DigitNumber> {
        let pattern = divisor.to_string();
        let mut found = BTreeSet::new();
        for run in s.split(|c: char| !c.is_ascii_digit()) {
            for i in 0..run.len() {
                for j in i + 1..=run.len() {
                    let n: u128 = run[i..j].parse().unwrap();
                    if n % divisor == 0 && !n.to_string().contains(&pattern) {
                        found.insert(DigitNumber::from(n));
                    }
                }
            }
        }
        found
    }

    #[test]
    fn test_divisor_excluded_from_its_own_multiples() {
        // 111 contains "111"; 11211 = 111 * 101 does not
        assert_eq!(divisible("111211", 111), set(&[11211]));
    }

    #[rstest]
    #[case("13", 13)]
    #[case("tothemoon", 1)]
    #[case("1782931", 1_894_792)]
    #[case("", 7)]
    #[case("Jennychangeyournumber8675309", 0)]
    #[case("8675309", -3)]
    fn test_empty_results(#[case] s: &str, #[case] divisor: i64) {
        assert!(divisible(s, divisor).is_empty());
    }

    #[test]
    fn test_runs_reset_on_non_digits() {
        // joined, "1245" would also yield 24 and 1245
        assert_eq!(divisible("12-45", 3), set(&[12, 45]));
        assert_eq!(divisible("1a2", 12), BTreeSet::new());
    }

    #[test]
    fn test_zero_and_leading_zeros() {
        assert_eq!(divisible("05", 5), set(&[0]));
        assert_eq!(divisible("a30b", 3), set(&[0]));
        assert_eq!(divisible("a60b", 3), set(&[0, 6, 60]));
        assert_eq!(divisible("0042", 3), set(&[0, 42]));
    }

    #[test]
    fn test_divisor_one_keeps_numbers_without_a_one() {
        assert_eq!(divisible("203", 1), set(&[0, 2, 3, 20, 203]));
    }

    #[test]
    fn test_long_run_keeps_every_length() {
        let found = divisible(&"2".repeat(40), 1);
        assert_eq!(found.len(), 40);

        let largest = found.last().unwrap();
        assert_eq!(largest.digits(), 40);
        assert_eq!(largest.as_str(), "2".repeat(40));
        assert_eq!(largest.to_u128(), None);
        assert_eq!(found.first().unwrap().to_u128(), Some(2));
    }

    #[test]
    fn test_long_run_divisibility() {
        // every run of nines is a multiple of 3
        let found = divisible(&"9".repeat(45), 3);
        assert_eq!(found.len(), 45);

        // 10^k + 1 is a multiple of 11 exactly when k is odd
        let odd = format!("1{}1", "0".repeat(40));
        assert!(divisible(&odd, 11).contains(&DigitNumber::from_digits(&odd)));
        let even = format!("1{}1", "0".repeat(41));
        assert!(!divisible(&even, 11).contains(&DigitNumber::from_digits(&even)));
    }

    #[test]
    fn test_numeric_ordering() {
        let found: Vec<String> = divisible("100-25-9", 1)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(found, ["0", "2", "5", "9", "25"]);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(2024);
        let alphabet: Vec<char> = "0123456789ab-".chars().collect();

        for _ in 0..200 {
            let len = rng.gen_range(0..30);
            let s: String = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();
            let divisor = rng.gen_range(1..200i64);

            assert_eq!(
                divisible(&s, divisor),
                brute_force(&s, divisor as u128),
                "input {s:?} / {divisor}"
            );
        }
    }
}
