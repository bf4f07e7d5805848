//! Dotted version strings.

use std::cmp::Ordering;
use std::fmt;

/// A dotted numeric version such as `2.3.0`.
///
/// Segments that are not integers count as 0, and a missing segment equals 0,
/// so `2.0` and `2.0.0` compare equal.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<i64>,
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .trim()
            .split('.')
            .map(|segment| segment.trim().parse().unwrap_or(0))
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[i64] {
        &self.segments
    }

    fn segment(&self, index: usize) -> i64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// True when `candidate` is strictly greater than `reference`.
///
/// An empty candidate is never newer.
pub fn is_newer(candidate: &str, reference: &str) -> bool {
    if candidate.trim().is_empty() {
        return false;
    }
    Version::parse(candidate) > Version::parse(reference)
}
