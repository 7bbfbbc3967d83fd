//! Numeric range algebra for describing achievable device settings.
//!
//! A [`Range`] is a closed interval with an optional step; a [`MetaRange`]
//! is an ordered union of ranges. Hardware controls are often a small
//! discrete set (sample rate tables, gain steps) rather than a continuum,
//! and both shapes are expressed with the same types.
//!
//! # Example
//!
//! ```
//! use sdrlib_core::{MetaRange, Range};
//!
//! let mut rates = MetaRange::new();
//! rates += Range::point(20_000.0);
//! rates += Range::point(50_000.0);
//! rates += Range::point(100_000.0);
//!
//! assert!(rates.contains(50_000.0));
//! assert_eq!(rates.clip(60_000.0), Some(50_000.0));
//! ```

use std::fmt;
use std::ops::AddAssign;

/// Relative tolerance used when testing whether a value lies on a step.
const STEP_TOLERANCE: f64 = 1e-9;

/// A closed interval `[start, stop]` with an optional step.
///
/// A step of `0.0` means every value in the interval is achievable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    start: f64,
    stop: f64,
    step: f64,
}

impl Range {
    /// Create a range. Bounds are reordered if `start > stop`; a negative
    /// or NaN step is treated as continuous. A NaN bound takes the value of
    /// the other bound. A range with both bounds NaN contains nothing and
    /// clips every value to NaN.
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Range {
            start: start.min(stop),
            stop: start.max(stop),
            step: step.max(0.0),
        }
    }

    /// A continuous range over `[start, stop]`.
    pub fn continuous(start: f64, stop: f64) -> Self {
        Range::new(start, stop, 0.0)
    }

    /// A degenerate range holding exactly one value.
    pub fn point(value: f64) -> Self {
        Range::new(value, value, 0.0)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Whether `value` lies in the interval and, for a stepped range, on a
    /// step boundary (within floating tolerance).
    pub fn contains(&self, value: f64) -> bool {
        if !(self.start..=self.stop).contains(&value) {
            return false;
        }
        if self.step <= 0.0 {
            return true;
        }
        let steps = (value - self.start) / self.step;
        (steps - steps.round()).abs() <= STEP_TOLERANCE * steps.abs().max(1.0)
    }

    /// Project `value` onto the range: clamp to the bounds, then round to
    /// the nearest step multiple for a stepped range.
    pub fn clip(&self, value: f64) -> f64 {
        if self.start.is_nan() {
            return f64::NAN;
        }
        let clamped = value.clamp(self.start, self.stop);
        if self.step <= 0.0 {
            return clamped;
        }
        let snapped = self.start + ((clamped - self.start) / self.step).round() * self.step;
        if snapped > self.stop {
            snapped - self.step
        } else {
            snapped
        }
    }
}

impl From<f64> for Range {
    fn from(value: f64) -> Self {
        Range::point(value)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.stop {
            write!(f, "{}", self.start)
        } else if self.step > 0.0 {
            write!(f, "[{}, {}] step {}", self.start, self.stop, self.step)
        } else {
            write!(f, "[{}, {}]", self.start, self.stop)
        }
    }
}

/// An ordered union of [`Range`]s.
///
/// Ranges are kept in insertion order and are never merged or sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaRange {
    ranges: Vec<Range>,
}

impl MetaRange {
    pub fn new() -> Self {
        MetaRange { ranges: Vec::new() }
    }

    /// Append a range without merging.
    pub fn push(&mut self, range: Range) {
        self.ranges.push(range);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Range> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Smallest start across all member ranges.
    pub fn start(&self) -> Option<f64> {
        self.ranges.iter().map(Range::start).reduce(f64::min)
    }

    /// Largest stop across all member ranges.
    pub fn stop(&self) -> Option<f64> {
        self.ranges.iter().map(Range::stop).reduce(f64::max)
    }

    /// Whether any member range contains `value`.
    pub fn contains(&self, value: f64) -> bool {
        self.ranges.iter().any(|r| r.contains(value))
    }

    /// The achievable value nearest to `value`.
    ///
    /// Every member range is considered; on an exact tie in distance the
    /// range inserted first wins. Returns `None` for an empty set or when
    /// no member range yields a number.
    pub fn clip(&self, value: f64) -> Option<f64> {
        let mut best: Option<(f64, f64)> = None;
        for range in &self.ranges {
            let candidate = range.clip(value);
            if candidate.is_nan() {
                continue;
            }
            let distance = (candidate - value).abs();
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((candidate, distance)),
            }
        }
        best.map(|(candidate, _)| candidate)
    }
}

impl AddAssign<Range> for MetaRange {
    fn add_assign(&mut self, range: Range) {
        self.push(range);
    }
}

impl From<Vec<Range>> for MetaRange {
    fn from(ranges: Vec<Range>) -> Self {
        MetaRange { ranges }
    }
}

impl FromIterator<Range> for MetaRange {
    fn from_iter<I: IntoIterator<Item = Range>>(iter: I) -> Self {
        MetaRange {
            ranges: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MetaRange {
    type Item = &'a Range;
    type IntoIter = std::slice::Iter<'a, Range>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

impl fmt::Display for MetaRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}
