use std::{cmp::Ordering, fmt};

/// A chain height, scoped to a revision so that hard forks don't collide
/// with each other's block numbers.
///
/// Heights compare lexicographically: revision number first, then revision
/// height. `Height::zero()` means "unset" and must never be used as a real
/// proof height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Height {
    pub revision_number: u64,
    pub revision_height: u64,
}

impl Height {
    pub const fn new(revision_number: u64, revision_height: u64) -> Self {
        Self { revision_number, revision_height }
    }

    pub const fn zero() -> Self {
        Self { revision_number: 0, revision_height: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.revision_number == 0 && self.revision_height == 0
    }

    /// The height at which a proof rooted at `self` must be queried: app
    /// hash committing block H is only included in block H+1's header.
    pub fn query_height(&self) -> Height {
        Height::new(self.revision_number, self.revision_height.saturating_sub(1))
    }

    pub fn increment(&self) -> Height {
        Height::new(self.revision_number, self.revision_height + 1)
    }
}

impl PartialOrd for Height {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Height {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.revision_number, self.revision_height).cmp(&(other.revision_number, other.revision_height))
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_revision_then_height() {
        assert!(Height::new(0, 10) < Height::new(1, 0));
        assert!(Height::new(1, 5) < Height::new(1, 6));
    }

    #[test]
    fn query_height_is_one_less() {
        assert_eq!(Height::new(0, 100).query_height(), Height::new(0, 99));
    }

    #[test]
    fn query_height_never_underflows() {
        assert_eq!(Height::new(0, 0).query_height(), Height::new(0, 0));
    }

    #[test]
    fn zero_is_unset() {
        assert!(Height::zero().is_zero());
        assert!(!Height::new(0, 1).is_zero());
    }
}
