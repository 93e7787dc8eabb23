//! Candidate ranking for hand-tracking slot allocation.
//!
//! Each candidate skeleton gets a weighted linear score:
//!
//! | term                 | value                                  | weight |
//! |----------------------|----------------------------------------|--------|
//! | engaged bonus        | 1 if the id is the engaged user        | 100    |
//! | tracked bonus        | 1 if the id was tracked last update    | 50     |
//! | angle from center    | `1 - |2·atan(x/z)/π|` when `z > 0`     | 1.30   |
//! | distance from camera | `(4.0 - z) / 4.0`, unclamped           | 1.15   |
//! | stillness            | `1 - activity_level`, 0 with no record | 0.05   |
//!
//! The positional terms together stay far below the tracked bonus for any
//! depth the sensor reports, so engaged and tracked identities always keep
//! their slots ahead of newcomers.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::types::{ActivityRecord, SkeletonSample, TrackingId};

/// Depth in meters at which the distance term reaches zero.
const MAX_PREFERRED_DEPTH: f64 = 4.0;

/// Weights of the ranking terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    pub engaged: f64,
    pub tracked: f64,
    pub angle: f64,
    pub distance: f64,
    pub stillness: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            engaged: 100.0,
            tracked: 50.0,
            angle: 1.30,
            distance: 1.15,
            stillness: 0.05,
        }
    }
}

/// A scored candidate with its per-term breakdown (unweighted).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub tracking_id: TrackingId,
    pub is_engaged: bool,
    pub is_tracked: bool,
    pub angle: f64,
    pub distance: f64,
    pub stillness: f64,
    pub score: f64,
}

/// Unweighted angle term: 1 on the optical axis, falling to 0 at ±90°.
pub fn angle_from_center(x: f64, z: f64) -> f64 {
    if z > 0.0 {
        1.0 - (2.0 * (x / z).atan() / PI).abs()
    } else {
        0.0
    }
}

/// Unweighted distance term. Negative beyond 4 m, above 1 for negative depth.
pub fn distance_from_camera(z: f64) -> f64 {
    (MAX_PREFERRED_DEPTH - z) / MAX_PREFERRED_DEPTH
}

/// Unweighted stillness term.
pub fn stillness(record: Option<&ActivityRecord>) -> f64 {
    record.map_or(0.0, |r| 1.0 - r.activity_level)
}

/// Scores a single candidate.
pub fn score_candidate(
    weights: &RankingWeights,
    skeleton: &SkeletonSample,
    is_engaged: bool,
    is_tracked: bool,
    record: Option<&ActivityRecord>,
) -> RankedCandidate {
    let position = skeleton.position;
    let angle = angle_from_center(position.x, position.z);
    let distance = distance_from_camera(position.z);
    let stillness = stillness(record);

    let flag = |set: bool| if set { 1.0 } else { 0.0 };
    let score = weights.stillness.mul_add(
        stillness,
        weights.distance.mul_add(
            distance,
            weights.angle.mul_add(
                angle,
                weights
                    .engaged
                    .mul_add(flag(is_engaged), weights.tracked * flag(is_tracked)),
            ),
        ),
    );

    RankedCandidate {
        tracking_id: skeleton.tracking_id,
        is_engaged,
        is_tracked,
        angle,
        distance,
        stillness,
        score,
    }
}

/// Sorts candidates by descending score.
///
/// The sort is stable: candidates with equal scores keep the order in which
/// they were discovered.
pub fn sort_candidates(candidates: &mut [RankedCandidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Writes ranked ids into `slots`, padding with [`TrackingId::INVALID`].
pub fn fill_slots(candidates: &[RankedCandidate], slots: &mut [TrackingId]) {
    for (index, slot) in slots.iter_mut().enumerate() {
        *slot = candidates
            .get(index)
            .map_or(TrackingId::INVALID, |c| c.tracking_id);
    }
}
