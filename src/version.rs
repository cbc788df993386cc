//! Dotted-decimal version ordering.
//!
//! `"1.10"` is newer than `"1.9"` and `"10.0"` is newer than `"9.0"`. Segments
//! are compared numerically left to right; missing trailing segments count
//! as zero, so `"1.2"` and `"1.2.0"` are equal. A leading `v` is ignored and
//! a segment's non-numeric suffix (`"3rc1"`) is dropped.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone)]
pub struct DottedVersion {
    raw: String,
    segments: Vec<u64>,
}

impl DottedVersion {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        let segments = body
            .split('.')
            .map(|segment| {
                let digits: String = segment.trim().chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .collect();
        Self {
            raw: trimmed.to_string(),
            segments,
        }
    }

    fn segment(&self, i: usize) -> u64 {
        self.segments.get(i).copied().unwrap_or(0)
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compare two version strings: negative, zero or positive like `strcmp`.
pub fn compare(a: &str, b: &str) -> i32 {
    match DottedVersion::parse(a).cmp(&DottedVersion::parse(b)) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}
