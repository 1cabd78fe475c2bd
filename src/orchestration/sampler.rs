//! Pure worklist sampling for dry-run mode.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::WorkItem;

/// Draw `sample_size` items uniformly at random without replacement.
///
/// Asking for more items than exist returns the full list unchanged. The
/// caller supplies the RNG, so a seeded `StdRng` makes sampling
/// deterministic in tests.
pub fn sample_items<R: Rng + ?Sized>(
    items: Vec<WorkItem>,
    sample_size: usize,
    rng: &mut R,
) -> Vec<WorkItem> {
    if sample_size >= items.len() {
        return items;
    }
    items
        .choose_multiple(rng, sample_size)
        .cloned()
        .collect()
}
