use core::{fmt, str::FromStr};

use crate::{Error, Result};

/// A closed interval `[from, to]` of raw counter values that must never be
/// handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExclusionRange {
    from: u64,
    to: u64,
}

impl ExclusionRange {
    /// Creates a range, rejecting `from > to`.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] when the bounds are inverted.
    pub fn new(from: u64, to: u64) -> Result<Self> {
        if from > to {
            return Err(Error::configuration(format!(
                "exclusion range lower bound {from} is greater than upper bound {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Lower bound (inclusive).
    pub const fn from(&self) -> u64 {
        self.from
    }

    /// Upper bound (inclusive).
    pub const fn to(&self) -> u64 {
        self.to
    }

    /// Returns `true` if `counter` lies within the range.
    pub const fn contains(&self, counter: u64) -> bool {
        self.from <= counter && counter <= self.to
    }
}

impl fmt::Display for ExclusionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.from, self.to)
    }
}

/// Zero or more closed ranges of raw counters to skip.
///
/// Ranges are kept sorted and merged, so overlapping or adjacent inputs
/// collapse into a single range and lookups are a binary search.
///
/// # Example
/// ```
/// use revkey::ExclusionRangeSet;
///
/// let set = ExclusionRangeSet::parse("[1,1000]").unwrap();
/// assert!(set.is_excluded(500));
/// assert!(!set.is_excluded(1001));
/// assert_eq!(set.next_allowed(1), Some(1001));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct ExclusionRangeSet {
    ranges: Vec<ExclusionRange>,
}

impl ExclusionRangeSet {
    /// Separator between ranges in the textual form.
    pub const DELIMITER: char = ';';

    /// An empty set; nothing is excluded.
    pub const fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Builds a set from arbitrary ranges, merging overlaps.
    pub fn from_ranges(ranges: impl IntoIterator<Item = ExclusionRange>) -> Self {
        let mut ranges: Vec<_> = ranges.into_iter().collect();
        ranges.sort_unstable();

        let mut merged: Vec<ExclusionRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.from <= last.to.saturating_add(1) => {
                    last.to = last.to.max(range.to);
                }
                _ => merged.push(range),
            }
        }
        Self { ranges: merged }
    }

    /// Parses the textual form `"[from,to]"`, or several such pairs separated
    /// by `;`. A blank string is the empty set.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if a range is not enclosed in square
    /// brackets (including an empty segment between separators), does not
    /// hold exactly two elements, has a negative or non-numeric bound, or has
    /// `from > to`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(Self::empty());
        }

        let ranges = spec
            .split(Self::DELIMITER)
            .map(str::trim)
            .map(parse_range)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_ranges(ranges))
    }

    /// Returns `true` if `counter` lies within any configured range.
    pub fn is_excluded(&self, counter: u64) -> bool {
        self.range_containing(counter).is_some()
    }

    /// Returns `counter` if it is allowed, otherwise the smallest allowed
    /// value greater than every range containing it.
    ///
    /// Returns `None` when every value from `counter` up to `u64::MAX` is
    /// excluded.
    pub fn next_allowed(&self, counter: u64) -> Option<u64> {
        let mut candidate = counter;
        while let Some(range) = self.range_containing(candidate) {
            candidate = range.to.checked_add(1)?;
        }
        Some(candidate)
    }

    /// Smallest lower bound and largest upper bound across all ranges.
    pub fn bounds(&self) -> Option<(u64, u64)> {
        let first = self.ranges.first()?;
        let last = self.ranges.last()?;
        Some((first.from, last.to))
    }

    /// The merged ranges in ascending order.
    pub fn ranges(&self) -> &[ExclusionRange] {
        &self.ranges
    }

    /// Returns `true` if nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn range_containing(&self, counter: u64) -> Option<&ExclusionRange> {
        let idx = self.ranges.partition_point(|range| range.to < counter);
        self.ranges.get(idx).filter(|range| range.contains(counter))
    }
}

fn parse_range(part: &str) -> Result<ExclusionRange> {
    let invalid = |why: &str| {
        Error::configuration(format!(
            "invalid exclusion range '{part}': {why}; ranges must be given between \
             square brackets, e.g. '[1,1000]'"
        ))
    };

    let inner = part
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| invalid("range is not enclosed between '[' and ']'"))?;

    let mut bounds = inner.split(',').map(str::trim);
    let (Some(from), Some(to), None) = (bounds.next(), bounds.next(), bounds.next()) else {
        return Err(invalid("range does not contain exactly two elements"));
    };

    let parse_bound = |text: &str| -> Result<u64> {
        if text.starts_with('-') {
            return Err(invalid("bounds must be non-negative"));
        }
        text.parse::<u64>()
            .map_err(|e| invalid(&format!("'{text}' is not a valid bound ({e})")))
    };

    let from = parse_bound(from)?;
    let to = parse_bound(to)?;
    ExclusionRange::new(from, to).map_err(|_| invalid("lower bound is greater than upper bound"))
}

impl FromStr for ExclusionRangeSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExclusionRangeSet {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ExclusionRangeSet> for String {
    fn from(value: ExclusionRangeSet) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ExclusionRangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", Self::DELIMITER)?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}
