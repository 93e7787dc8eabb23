//! Engagement coordination.
//!
//! Decides, frame by frame, which visible people are tracked, which one is
//! engaged (driving interaction) and which one is primary (owns the active
//! hand pointer), and notifies subscribers when any of that changes.
//!
//! # Per-frame flow
//!
//! 1. [`EngagementCoordinator::choose_tracked_users`] ranks this frame's
//!    skeletons so the caller can allocate hand-tracking resources
//! 2. [`EngagementCoordinator::update_user_information`] consumes the
//!    resulting hand-pointer details and advances the state machine
//!
//! # Thread Safety
//!
//! Every mutating operation serializes through one lock for its whole
//! duration. Events raised by a mutation are delivered after the lock is
//! released, on the calling thread, so handlers may call back into any
//! public operation. Readers ([`user_states`](EngagementCoordinator::user_states),
//! [`primary_user`](EngagementCoordinator::primary_user),
//! [`snapshot`](EngagementCoordinator::snapshot)) never take the mutation lock
//! and always see the state as of the end of a completed mutation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activity::{ActivityMeter, ActivityMeterConfig, UserActivityMeter};
use crate::buffer::DoubleBuffer;
use crate::events::{EventChannel, UserStateEntry, UserStateEvent};
use crate::guard::ScopedMutation;
use crate::ranking::{RankedCandidate, RankingWeights, fill_slots, score_candidate, sort_candidates};
use crate::types::{SkeletonSample, TrackingId, UserInfo, UserState, ValidationError};

/// Published interaction state per tracked identity.
pub type UserStateMap = BTreeMap<TrackingId, UserState>;

/// Errors from engagement operations.
#[derive(Debug, Error)]
pub enum EngagementError {
    /// The configuration failed validation.
    #[error("invalid engagement configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
}

/// Configuration for engagement coordination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// How long an identity must have been still before it qualifies as a
    /// tracking candidate. Default: 500 ms.
    pub inactive_hysteresis_ms: i64,

    /// Candidate ranking weights.
    pub ranking: RankingWeights,

    /// Settings for the default activity meter.
    pub activity: ActivityMeterConfig,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            inactive_hysteresis_ms: 500,
            ranking: RankingWeights::default(),
            activity: ActivityMeterConfig::default(),
        }
    }
}

impl EngagementConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.inactive_hysteresis_ms < 0 {
            return Err(ValidationError::NegativeDuration {
                field: "inactive_hysteresis_ms",
                value: self.inactive_hysteresis_ms,
            });
        }
        self.activity.validate()
    }
}

/// Read-only view of the coordinator as of its last completed mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStateSnapshot {
    pub primary_user: TrackingId,
    pub engaged_user: TrackingId,
    pub user_states: Arc<UserStateMap>,
}

/// State owned by the coordinator and only touched under its lock.
#[derive(Debug)]
struct CoordinatorState<M> {
    meter: M,
    /// Front: tracked this update. Back: tracked the update before.
    tracked: DoubleBuffer<HashSet<TrackingId>>,
    engaged: TrackingId,
    primary: TrackingId,
    /// Front: last published map. Back: scratch accumulator.
    states: DoubleBuffer<UserStateMap>,
}

impl<M: ActivityMeter> CoordinatorState<M> {
    fn is_inactive(&self, id: TrackingId, timestamp: i64, min_still_ms: i64) -> bool {
        self.meter.activity_record(id).is_some_and(|record| {
            !record.is_active
                && timestamp.saturating_sub(record.state_transition_timestamp) >= min_still_ms
        })
    }

    /// Picks the primary user for this frame.
    ///
    /// The engaged user wins if its hand is primary, then the current primary
    /// if it still holds a primary hand, then the first other user with one.
    fn determine_primary(&self, user_infos: &[UserInfo]) -> TrackingId {
        let mut still_primary = false;
        let mut engaged_is_primary = false;
        let mut first_candidate = TrackingId::INVALID;

        for info in user_infos.iter().filter(|u| u.tracking_id.is_valid()) {
            if !info.has_primary_hand() {
                continue;
            }
            let id = info.tracking_id;
            if id == self.primary {
                still_primary = true;
            } else if !first_candidate.is_valid() {
                first_candidate = id;
            }
            if id == self.engaged {
                engaged_is_primary = true;
            }
        }

        if engaged_is_primary {
            self.engaged
        } else if still_primary {
            self.primary
        } else {
            first_candidate
        }
    }

    /// Sets the engaged user if `id` is currently tracked.
    fn engage(&mut self, id: TrackingId) -> bool {
        if !id.is_valid() || !self.tracked.front().contains(&id) {
            return false;
        }
        if self.engaged != id {
            tracing::debug!(tracking_id = %id, previous = %self.engaged, "user engaged");
            self.engaged = id;
        }
        true
    }

    /// Rebuilds the accumulator and flips it to the front if it differs from
    /// the published map. Returns whether a flip happened.
    fn rebuild_user_states(&mut self) -> bool {
        let accumulator = self.states.back_mut();
        accumulator.clear();
        accumulator.extend(
            self.tracked
                .front()
                .iter()
                .map(|id| (*id, UserState::Tracked)),
        );
        if self.engaged.is_valid() {
            accumulator.insert(self.engaged, UserState::Engaged);
        }

        let changed = self.states.back() != self.states.front();
        if changed {
            self.states.flip();
        }
        changed
    }
}

/// Tracks engagement across frames for one sensor.
pub struct EngagementCoordinator<M = UserActivityMeter> {
    config: EngagementConfig,
    state: Mutex<CoordinatorState<M>>,
    published: RwLock<UserStateSnapshot>,
    events: EventChannel,
}

impl EngagementCoordinator<UserActivityMeter> {
    /// Creates a coordinator backed by the default [`UserActivityMeter`].
    pub fn new(config: EngagementConfig) -> Result<Self, EngagementError> {
        let meter = UserActivityMeter::new(config.activity.clone())?;
        Self::with_meter(config, meter)
    }
}

impl<M: ActivityMeter> EngagementCoordinator<M> {
    /// Creates a coordinator that reads activity from `meter`.
    pub fn with_meter(config: EngagementConfig, meter: M) -> Result<Self, EngagementError> {
        config.validate()?;
        Ok(Self {
            config,
            state: Mutex::new(CoordinatorState {
                meter,
                tracked: DoubleBuffer::default(),
                engaged: TrackingId::INVALID,
                primary: TrackingId::INVALID,
                states: DoubleBuffer::default(),
            }),
            published: RwLock::new(UserStateSnapshot::default()),
            events: EventChannel::new(),
        })
    }

    pub const fn config(&self) -> &EngagementConfig {
        &self.config
    }

    /// Channel on which state changes are announced.
    pub const fn events(&self) -> &EventChannel {
        &self.events
    }

    /// Current published (id, state) map.
    pub fn user_states(&self) -> Arc<UserStateMap> {
        Arc::clone(&self.published.read().user_states)
    }

    pub fn primary_user(&self) -> TrackingId {
        self.published.read().primary_user
    }

    pub fn engaged_user(&self) -> TrackingId {
        self.published.read().engaged_user
    }

    /// Primary user, engaged user and states, all from the same mutation.
    pub fn snapshot(&self) -> UserStateSnapshot {
        self.published.read().clone()
    }

    /// Ranks this frame's skeletons and writes the best `slots.len()` ids
    /// into `slots`, padding with [`TrackingId::INVALID`].
    ///
    /// Also advances the activity meter with the candidate skeletons, even
    /// when `slots` is empty.
    pub fn choose_tracked_users(
        &self,
        skeletons: &[SkeletonSample],
        timestamp: i64,
        slots: &mut [TrackingId],
    ) {
        let ranked = self.rank_candidates(skeletons, timestamp);
        fill_slots(&ranked, slots);
    }

    /// Scores every candidate skeleton, best first.
    ///
    /// Skeletons with the sentinel id or without usable tracking are skipped,
    /// as are identities the activity meter has no record for. Equal scores
    /// keep their input order.
    pub fn rank_candidates(
        &self,
        skeletons: &[SkeletonSample],
        timestamp: i64,
    ) -> Vec<RankedCandidate> {
        let mut scope = self.lock();
        let candidates: Vec<SkeletonSample> = skeletons
            .iter()
            .filter(|s| s.is_candidate())
            .copied()
            .collect();
        scope.meter.update(&candidates, timestamp);

        let state = &*scope;
        let mut ranked: Vec<RankedCandidate> = candidates
            .iter()
            .filter_map(|skeleton| {
                let id = skeleton.tracking_id;
                let record = state.meter.activity_record(id)?;
                Some(score_candidate(
                    &self.config.ranking,
                    skeleton,
                    id == state.engaged,
                    state.tracked.front().contains(&id),
                    Some(&record),
                ))
            })
            .collect();
        sort_candidates(&mut ranked);

        for candidate in &ranked {
            tracing::trace!(
                tracking_id = %candidate.tracking_id,
                score = candidate.score,
                "ranked candidate"
            );
        }
        ranked
    }

    /// Advances the engagement state machine with this frame's hand details.
    ///
    /// An identity is tracked this frame if it is the engaged user, or if it
    /// has a tracked hand and was either tracked last frame or has been still
    /// for at least `inactive_hysteresis_ms`. The engaged user is dropped when
    /// absent. The primary user then pre-empts the engaged user; with nobody
    /// engaged, the first newly tracked identity is engaged instead.
    pub fn update_user_information(&self, user_infos: &[UserInfo], timestamp: i64) {
        let mut scope = self.lock();
        let min_still_ms = self.config.inactive_hysteresis_ms;

        let state = &mut *scope;
        state.tracked.flip();
        state.tracked.front_mut().clear();

        let mut engaged_present = false;
        let mut first_tracked = TrackingId::INVALID;
        for info in user_infos.iter().filter(|u| u.tracking_id.is_valid()) {
            let id = info.tracking_id;
            if id == state.engaged {
                state.tracked.front_mut().insert(id);
                engaged_present = true;
            } else if info.has_tracked_hands()
                && (state.tracked.back().contains(&id)
                    || state.is_inactive(id, timestamp, min_still_ms))
            {
                state.tracked.front_mut().insert(id);
                if !first_tracked.is_valid() {
                    first_tracked = id;
                }
            }
        }

        if !engaged_present && state.engaged.is_valid() {
            tracing::debug!(tracking_id = %state.engaged, "engaged user lost");
            state.engaged = TrackingId::INVALID;
        }

        let primary = state.determine_primary(user_infos);
        self.set_primary(&mut scope, primary);

        let candidate = if scope.primary.is_valid() {
            scope.primary
        } else {
            first_tracked
        };
        if candidate.is_valid()
            && candidate != scope.engaged
            && (!scope.engaged.is_valid() || candidate == scope.primary)
        {
            scope.engage(candidate);
        }

        self.publish_user_states(&mut scope);
    }

    /// Makes `id` the engaged user if it is currently tracked.
    ///
    /// Returns false, changing nothing, for the sentinel or an untracked id.
    pub fn promote_candidate_to_engaged(&self, id: TrackingId) -> bool {
        let mut scope = self.lock();
        if !scope.engage(id) {
            tracing::debug!(tracking_id = %id, "promotion refused: not tracked");
            return false;
        }
        self.publish_user_states(&mut scope);
        true
    }

    /// Returns to the initial state, discarding activity history.
    pub fn reset(&self) {
        let mut scope = self.lock();
        scope.meter.clear();
        scope.tracked.for_each_mut(HashSet::clear);
        scope.engaged = TrackingId::INVALID;
        self.set_primary(&mut scope, TrackingId::INVALID);
        self.publish_user_states(&mut scope);
        tracing::debug!("engagement state reset");
    }

    fn lock(&self) -> ScopedMutation<'_, CoordinatorState<M>> {
        ScopedMutation::acquire(&self.state)
    }

    fn emit<'a>(&'a self, scope: &mut ScopedMutation<'a, CoordinatorState<M>>, event: UserStateEvent) {
        let events = &self.events;
        scope.defer(move || events.publish(&event));
    }

    fn set_primary<'a>(&'a self, scope: &mut ScopedMutation<'a, CoordinatorState<M>>, id: TrackingId) {
        let old_id = scope.primary;
        if old_id == id {
            return;
        }
        scope.primary = id;
        tracing::debug!(old = %old_id, new = %id, "primary user changed");
        self.emit(scope, UserStateEvent::PrimaryUserChanged { old_id, new_id: id });
    }

    /// Publishes the (id, state) map if it changed and refreshes the read
    /// snapshot. Runs last in every mutation.
    fn publish_user_states<'a>(&'a self, scope: &mut ScopedMutation<'a, CoordinatorState<M>>) {
        let changed = scope.rebuild_user_states();

        {
            let mut published = self.published.write();
            published.primary_user = scope.primary;
            published.engaged_user = scope.engaged;
            if changed {
                published.user_states = Arc::new(scope.states.front().clone());
            }
        }

        if changed {
            let states: Vec<UserStateEntry> = scope
                .states
                .front()
                .iter()
                .map(|(id, user_state)| UserStateEntry {
                    id: *id,
                    user_state: *user_state,
                })
                .collect();
            tracing::debug!(count = states.len(), "user states changed");
            self.emit(scope, UserStateEvent::UserStatesChanged { states });
        }
    }
}

impl<M> std::fmt::Debug for EngagementCoordinator<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngagementCoordinator")
            .field("config", &self.config)
            .field("published", &*self.published.read())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
