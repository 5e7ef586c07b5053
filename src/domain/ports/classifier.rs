//! Classifier plugin port.

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Category, DocumentRoot, ScanArena};
use crate::services::claim_tracker::ClaimTracker;

/// Default upper bound on candidates one classifier may emit per root.
pub const DEFAULT_EMISSION_CAP: usize = 50;

/// A per-category capability classifier.
///
/// Classifiers are independent values held by the
/// [`ClassifierRegistry`](crate::services::ClassifierRegistry). Each
/// invocation receives the claim set of the current scan and must claim an
/// element before emitting a capability for it, so a later classifier
/// cannot emit the same control again.
pub trait Classifier: Send + Sync {
    /// Category of the capabilities this classifier emits.
    fn category(&self) -> Category;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Run order; lower runs first.
    fn priority(&self) -> u8;

    /// Maximum candidates kept from one invocation.
    fn emission_cap(&self) -> usize {
        DEFAULT_EMISSION_CAP
    }

    /// Classify the elements under `root`.
    ///
    /// Recoverable conditions should produce fewer candidates, not errors.
    fn scan(
        &self,
        root: DocumentRoot<'_>,
        arena: &ScanArena<'_>,
        claims: &mut ClaimTracker,
    ) -> DomainResult<Vec<Capability>>;
}
