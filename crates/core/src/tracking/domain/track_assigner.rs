//! Box-to-track association.
//!
//! A fresh detection is only trusted when it yields exactly one box per
//! speaker slot. Anything else freezes every track at its previous box.

use std::collections::HashSet;

use crate::shared::bounding_box::BoundingBox;
use crate::tracking::domain::track_error::TrackError;

/// How full detections are matched to tracks after the first frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssignmentPolicy {
    /// Each candidate independently goes to the track whose last box it
    /// overlaps most (ties to the lowest slot). Not a bijection: two
    /// candidates can pick the same track, in which case the later one in
    /// detector order wins and a track left without a candidate keeps its
    /// previous box.
    #[default]
    IndependentArgmax,
    /// Greedy matching by descending IoU, each track and candidate used
    /// once. Always a bijection.
    OneToOne,
}

/// What happened to the tracks on one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionKind {
    /// First frame: slots seeded in detector order.
    Seeded,
    /// Full detection matched against track history.
    Associated,
    /// Previous boxes carried over, either by schedule or after a miss.
    Frozen,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    /// One box per slot, in slot order.
    pub boxes: Vec<BoundingBox>,
    pub kind: ResolutionKind,
}

#[derive(Clone, Debug)]
pub struct TrackAssigner {
    speakers: usize,
    head_scale: f64,
    policy: AssignmentPolicy,
}

impl TrackAssigner {
    pub fn new(speakers: usize, head_scale: f64, policy: AssignmentPolicy) -> Self {
        Self {
            speakers,
            head_scale,
            policy,
        }
    }

    pub fn speakers(&self) -> usize {
        self.speakers
    }

    pub fn policy(&self) -> AssignmentPolicy {
        self.policy
    }

    /// Resolves one box per slot from raw detector boxes.
    ///
    /// `previous` is `None` on the first frame. Candidates are expanded to
    /// head regions before any matching.
    pub fn assign(
        &self,
        candidates: &[BoundingBox],
        previous: Option<&[BoundingBox]>,
    ) -> Result<Resolution, TrackError> {
        if candidates.len() != self.speakers {
            log::debug!(
                "detection count mismatch: got {}, expected {}",
                candidates.len(),
                self.speakers
            );
            return match previous {
                Some(prev) => Ok(Self::freeze(prev)),
                None => Err(TrackError::FirstFrameMiss {
                    found: candidates.len(),
                    expected: self.speakers,
                }),
            };
        }

        let heads: Vec<BoundingBox> = candidates
            .iter()
            .map(|c| c.to_head_region(self.head_scale))
            .collect();

        let Some(prev) = previous else {
            return Ok(Resolution {
                boxes: heads,
                kind: ResolutionKind::Seeded,
            });
        };

        let boxes = match self.policy {
            AssignmentPolicy::IndependentArgmax => associate_independent(&heads, prev),
            AssignmentPolicy::OneToOne => associate_one_to_one(&heads, prev),
        };
        Ok(Resolution {
            boxes,
            kind: ResolutionKind::Associated,
        })
    }

    /// Carries every track's previous box over unchanged.
    pub fn freeze(previous: &[BoundingBox]) -> Resolution {
        Resolution {
            boxes: previous.to_vec(),
            kind: ResolutionKind::Frozen,
        }
    }
}

/// Index of the track whose box overlaps `candidate` most; first wins ties.
fn best_track(candidate: &BoundingBox, previous: &[BoundingBox]) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (slot, last) in previous.iter().enumerate() {
        let score = candidate.iou(last);
        if score > best_score {
            best = slot;
            best_score = score;
        }
    }
    best
}

fn associate_independent(heads: &[BoundingBox], previous: &[BoundingBox]) -> Vec<BoundingBox> {
    let mut resolved = previous.to_vec();
    for head in heads {
        let slot = best_track(head, previous);
        resolved[slot] = *head;
    }
    resolved
}

/// Greedy IoU matching: pairs sorted by descending IoU, ties by slot then
/// candidate order, each side used at most once.
fn associate_one_to_one(heads: &[BoundingBox], previous: &[BoundingBox]) -> Vec<BoundingBox> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::with_capacity(previous.len() * heads.len());
    for (slot, last) in previous.iter().enumerate() {
        for (ci, head) in heads.iter().enumerate() {
            pairs.push((slot, ci, head.iou(last)));
        }
    }
    pairs.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });

    let mut resolved = previous.to_vec();
    let mut used_slots = HashSet::new();
    let mut used_candidates = HashSet::new();
    for (slot, ci, _) in pairs {
        if used_slots.contains(&slot) || used_candidates.contains(&ci) {
            continue;
        }
        used_slots.insert(slot);
        used_candidates.insert(ci);
        resolved[slot] = heads[ci];
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    /// Assigner with scale 1.0 on square inputs, so heads equal candidates.
    fn assigner(speakers: usize, policy: AssignmentPolicy) -> TrackAssigner {
        TrackAssigner::new(speakers, 1.0, policy)
    }

    fn left() -> BoundingBox {
        bbox(0.0, 0.0, 100.0, 100.0)
    }

    fn right() -> BoundingBox {
        bbox(300.0, 0.0, 400.0, 100.0)
    }

    // ── Seeding ──────────────────────────────────────────────────────

    #[test]
    fn test_first_frame_seeds_in_detector_order() {
        let a = assigner(2, AssignmentPolicy::IndependentArgmax);
        let res = a.assign(&[right(), left()], None).unwrap();
        assert_eq!(res.kind, ResolutionKind::Seeded);
        assert_eq!(res.boxes, vec![right(), left()]);
    }

    #[test]
    fn test_candidates_are_expanded_to_head_regions() {
        let a = TrackAssigner::new(1, 1.5, AssignmentPolicy::IndependentArgmax);
        let res = a.assign(&[bbox(100.0, 100.0, 200.0, 160.0)], None).unwrap();
        assert_eq!(res.boxes, vec![bbox(75.0, 55.0, 225.0, 205.0)]);
    }

    #[test]
    fn test_first_frame_miss_is_an_error() {
        let a = assigner(2, AssignmentPolicy::IndependentArgmax);
        let err = a.assign(&[left()], None).unwrap_err();
        assert!(matches!(
            err,
            TrackError::FirstFrameMiss {
                found: 1,
                expected: 2
            }
        ));
    }

    // ── Freeze policy ────────────────────────────────────────────────

    #[test]
    fn test_too_few_candidates_freezes_tracks() {
        let a = assigner(2, AssignmentPolicy::IndependentArgmax);
        let prev = [left(), right()];
        let res = a.assign(&[bbox(10.0, 0.0, 110.0, 100.0)], Some(&prev)).unwrap();
        assert_eq!(res.kind, ResolutionKind::Frozen);
        assert_eq!(res.boxes, prev.to_vec());
    }

    #[test]
    fn test_too_many_candidates_freezes_tracks() {
        let a = assigner(1, AssignmentPolicy::IndependentArgmax);
        let prev = [left()];
        let res = a.assign(&[left(), right()], Some(&prev)).unwrap();
        assert_eq!(res.kind, ResolutionKind::Frozen);
        assert_eq!(res.boxes, prev.to_vec());
    }

    #[test]
    fn test_empty_detection_freezes_tracks() {
        let a = assigner(2, AssignmentPolicy::OneToOne);
        let prev = [left(), right()];
        let res = a.assign(&[], Some(&prev)).unwrap();
        assert_eq!(res.boxes, prev.to_vec());
    }

    // ── Association ──────────────────────────────────────────────────

    #[test]
    fn test_swapped_detection_order_keeps_identity() {
        let moved_left = bbox(5.0, 0.0, 105.0, 100.0);
        let moved_right = bbox(295.0, 0.0, 395.0, 100.0);
        let prev = [left(), right()];
        for policy in [AssignmentPolicy::IndependentArgmax, AssignmentPolicy::OneToOne] {
            let res = assigner(2, policy)
                .assign(&[moved_right, moved_left], Some(&prev))
                .unwrap();
            assert_eq!(res.kind, ResolutionKind::Associated);
            assert_eq!(res.boxes, vec![moved_left, moved_right], "{policy:?}");
        }
    }

    #[test]
    fn test_tie_goes_to_lowest_slot() {
        // candidate equidistant from two identical previous boxes
        let prev = [left(), left()];
        assert_eq!(best_track(&left(), &prev), 0);
    }

    #[test]
    fn test_no_overlap_anywhere_goes_to_slot_zero() {
        let prev = [left(), right()];
        assert_eq!(best_track(&bbox(900.0, 900.0, 950.0, 950.0), &prev), 0);
    }

    #[test]
    fn test_independent_argmax_can_double_assign() {
        // Both candidates overlap track 0 most and miss track 1 entirely.
        let prev = [left(), right()];
        let c1 = bbox(10.0, 0.0, 110.0, 100.0);
        let c2 = bbox(-10.0, 0.0, 90.0, 100.0);
        let res = assigner(2, AssignmentPolicy::IndependentArgmax)
            .assign(&[c1, c2], Some(&prev))
            .unwrap();
        // Later candidate overwrites slot 0; slot 1 keeps its previous box.
        assert_eq!(res.boxes, vec![c2, right()]);
    }

    #[test]
    fn test_one_to_one_resolves_double_assignment() {
        let prev = [left(), right()];
        let c1 = bbox(10.0, 0.0, 110.0, 100.0);
        let c2 = bbox(-30.0, 0.0, 70.0, 100.0);
        let res = assigner(2, AssignmentPolicy::OneToOne)
            .assign(&[c1, c2], Some(&prev))
            .unwrap();
        // c1 overlaps track 0 more, so it takes slot 0; c2 is left for slot 1.
        assert_eq!(res.boxes, vec![c1, c2]);
    }

    #[test]
    fn test_freeze_copies_previous() {
        let prev = [left(), right()];
        let res = TrackAssigner::freeze(&prev);
        assert_eq!(res.kind, ResolutionKind::Frozen);
        assert_eq!(res.boxes, prev.to_vec());
    }
}
