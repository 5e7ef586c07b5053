//! Scan-scoped element claims.
//!
//! One [`ClaimTracker`] is created per scan and handed to every classifier
//! invocation. Once an element is claimed, later classifiers in the same
//! scan skip it. The tracker is dropped with the scan; nothing carries
//! over between scans.

use std::collections::HashSet;

use crate::domain::models::ElementId;

/// Set of elements already owned by a classifier in the current scan.
#[derive(Debug, Default)]
pub struct ClaimTracker {
    claimed: HashSet<ElementId>,
}

impl ClaimTracker {
    /// An empty claim set for one scan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an element. Returns `false` if it was already claimed.
    pub fn claim(&mut self, element: ElementId) -> bool {
        self.claimed.insert(element)
    }

    /// Whether a classifier already owns `element`.
    pub fn is_claimed(&self, element: ElementId) -> bool {
        self.claimed.contains(&element)
    }

    /// Claim every element in `elements`; used when a classifier takes
    /// ownership of a whole widget (a form and its fields).
    pub fn claim_all(&mut self, elements: impl IntoIterator<Item = ElementId>) {
        self.claimed.extend(elements);
    }

    /// Number of claimed elements.
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// Whether nothing has been claimed yet.
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_fails() {
        let mut claims = ClaimTracker::new();
        assert!(claims.claim(ElementId(4)));
        assert!(!claims.claim(ElementId(4)));
        assert!(claims.is_claimed(ElementId(4)));
        assert!(!claims.is_claimed(ElementId(5)));
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_claim_all() {
        let mut claims = ClaimTracker::new();
        claims.claim_all([ElementId(1), ElementId(2)]);
        assert!(!claims.claim(ElementId(2)));
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn test_trackers_are_independent() {
        let mut first = ClaimTracker::new();
        first.claim(ElementId(1));
        let second = ClaimTracker::new();
        assert!(second.is_empty());
    }
}
