//! Core domain logic for the user engagement tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Activity: turning skeleton position history into a still/active signal
//! - Ranking: choosing which visible people get hand-tracking resources
//! - Engagement: deciding who is tracked, engaged and primary across frames
//! - Events: notifying subscribers when that decision changes

pub mod activity;
mod buffer;
pub mod engagement;
pub mod events;
mod guard;
pub mod ranking;
pub mod types;

pub use activity::{ActivityMeter, ActivityMeterConfig, UserActivityMeter};
pub use engagement::{
    EngagementConfig, EngagementCoordinator, EngagementError, UserStateMap, UserStateSnapshot,
};
pub use events::{
    EventChannel, EventEnvelope, SubscriptionId, USER_STATE_CATEGORY, UserStateEntry,
    UserStateEvent,
};
pub use ranking::{RankedCandidate, RankingWeights};
pub use types::{
    ActivityRecord, HandPointerInfo, HandType, Position, SkeletonSample, SkeletonTrackingState,
    TrackingId, UserInfo, UserState, ValidationError,
};
