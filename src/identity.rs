//! Identity Assigner.
//!
//! Feature ids on a layer are always exactly `{1..N}`.  The map surface only tells
//! us which shapes remain after a delete, so the deleted id is inferred from the gap
//! in the surviving ids and everything above it shifts down.

use crate::Feature;

/// Outcome of comparing the surviving ids with the stored feature count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionInference {
    /// The feature with this id is gone.
    Deleted(u32),
    /// Survivors and store agree; nothing was deleted.
    Unchanged,
}

/// The id for a new feature: one past the largest existing id, or 1 on an empty layer.
pub fn next_id<I>(existing: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    existing.into_iter().max().map(|max| max + 1).unwrap_or(1)
}

/// Closes the gap left by `deleted_id`.
///
/// Every feature whose id is above the gap moves down by one, lowest first.  If a
/// feature already holds `deleted_id` the set has stabilised and nothing changes.
/// Returns how many features were renumbered.
pub fn renumber_on_delete(features: &mut [Feature], deleted_id: u32) -> usize {
    if features.iter().any(|feature| feature.id == deleted_id) {
        return 0;
    }
    features.sort_by_key(|feature| feature.id);
    let mut renumbered = 0;
    for feature in features.iter_mut().filter(|feature| feature.id > deleted_id) {
        feature.id -= 1;
        renumbered += 1;
    }
    renumbered
}

/// Infers which id disappeared, given the ids still on the map.
///
/// The first gap in the ascending survivor ids is the deleted id.  Without a gap the
/// former maximum (`len + 1`) is gone, which also covers deleting the last feature.
pub fn infer_deleted_id(survivor_ids: &[u32], stored_count: usize) -> DeletionInference {
    if survivor_ids.len() >= stored_count {
        return DeletionInference::Unchanged;
    }
    let mut sorted = survivor_ids.to_vec();
    sorted.sort_unstable();
    for (index, id) in sorted.iter().enumerate() {
        let expected = index as u32 + 1;
        if *id != expected {
            return DeletionInference::Deleted(expected);
        }
    }
    DeletionInference::Deleted(sorted.len() as u32 + 1)
}

/// True when the ids are exactly `{1..n}`.
pub fn is_dense<I>(ids: I) -> bool
where
    I: IntoIterator<Item = u32>,
{
    let mut ids: Vec<u32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.iter()
        .enumerate()
        .all(|(index, id)| *id == index as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FeatureHandle, Geometry, LayerKind, default_attributes};

    fn wells(ids: &[u32]) -> Vec<Feature> {
        ids.iter()
            .map(|id| Feature {
                handle: FeatureHandle(*id as u64 * 10),
                id: *id,
                geometry: Geometry::Point([*id as f64, 0.0]),
                attributes: default_attributes(LayerKind::Wells, *id),
            })
            .collect()
    }

    fn ids(features: &[Feature]) -> Vec<u32> {
        features.iter().map(|f| f.id).collect()
    }

    #[test]
    fn next_id_starts_at_one() {
        assert_eq!(next_id(Vec::new()), 1);
        assert_eq!(next_id(vec![1, 2, 3]), 4);
        assert_eq!(next_id(vec![3, 1]), 4);
    }

    #[test]
    fn renumber_closes_the_gap() {
        let mut features = wells(&[1, 3, 4]);
        assert_eq!(renumber_on_delete(&mut features, 2), 2);
        assert_eq!(ids(&features), vec![1, 2, 3]);
        // Labels stay with their features.
        assert_eq!(features[1].label(), "Well_3");
    }

    #[test]
    fn renumber_is_idempotent() {
        let mut features = wells(&[1, 3, 4]);
        renumber_on_delete(&mut features, 2);
        assert_eq!(renumber_on_delete(&mut features, 2), 0);
        assert_eq!(ids(&features), vec![1, 2, 3]);
    }

    #[test]
    fn renumber_after_deleting_the_maximum_is_a_no_op() {
        let mut features = wells(&[1, 2]);
        assert_eq!(renumber_on_delete(&mut features, 3), 0);
        assert_eq!(ids(&features), vec![1, 2]);
    }

    #[test]
    fn inference_finds_first_gap() {
        assert_eq!(infer_deleted_id(&[1, 3], 3), DeletionInference::Deleted(2));
        assert_eq!(infer_deleted_id(&[3, 2], 3), DeletionInference::Deleted(1));
    }

    #[test]
    fn inference_without_gap_picks_former_maximum() {
        assert_eq!(infer_deleted_id(&[1, 2], 3), DeletionInference::Deleted(3));
    }

    #[test]
    fn inference_on_emptied_layer_is_one() {
        assert_eq!(infer_deleted_id(&[], 1), DeletionInference::Deleted(1));
    }

    #[test]
    fn inference_with_matching_counts_is_unchanged() {
        assert_eq!(infer_deleted_id(&[1, 2, 3], 3), DeletionInference::Unchanged);
        assert_eq!(infer_deleted_id(&[], 0), DeletionInference::Unchanged);
    }

    #[test]
    fn density() {
        assert!(is_dense(Vec::new()));
        assert!(is_dense(vec![2, 1, 3]));
        assert!(!is_dense(vec![1, 3]));
        assert!(!is_dense(vec![1, 1]));
    }
}
