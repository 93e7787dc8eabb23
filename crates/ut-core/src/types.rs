//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A fraction-valued field was outside its allowed range.
    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    FractionOutOfRange { field: &'static str, value: f64 },

    /// A field that must be strictly positive was not.
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    /// A duration field was negative.
    #[error("{field} cannot be negative, got {value}")]
    NegativeDuration { field: &'static str, value: i64 },

    /// The deactivation threshold was above the activation threshold.
    #[error(
        "deactivation threshold {deactivation} must not exceed activation threshold {activation}"
    )]
    InvertedThresholds { activation: f64, deactivation: f64 },

    /// Invalid user state name.
    #[error("invalid user state: {value}")]
    InvalidUserState { value: String },
}

/// Identifier assigned by the sensor to a visible person.
///
/// Stable across frames while the person stays in view. The value `0` is
/// reserved as [`TrackingId::INVALID`] and is never produced for a real
/// identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TrackingId(i32);

impl TrackingId {
    /// Sentinel meaning "no identity".
    pub const INVALID: Self = Self(0);

    /// Wraps a raw sensor tracking id.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw sensor value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// True unless this is the sentinel.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for TrackingId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

/// How well the sensor resolved a skeleton this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonTrackingState {
    /// Not tracked at all; the sample carries no usable data.
    NotTracked,
    /// Only the overall position is known.
    PositionOnly,
    /// Full joint tracking.
    Tracked,
}

impl SkeletonTrackingState {
    /// Whether a skeleton in this state can be considered for tracking.
    #[must_use]
    pub const fn is_candidate(self) -> bool {
        matches!(self, Self::PositionOnly | Self::Tracked)
    }
}

/// A camera-space position in meters. `z` is the distance from the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dz.mul_add(dz, dx.mul_add(dx, dy * dy)).sqrt()
    }
}

/// One frame's pose sample for a visible person.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkeletonSample {
    pub tracking_id: TrackingId,
    pub tracking_state: SkeletonTrackingState,
    pub position: Position,
}

impl SkeletonSample {
    /// Whether this sample names a real identity in a usable tracking state.
    #[must_use]
    pub const fn is_candidate(&self) -> bool {
        self.tracking_id.is_valid() && self.tracking_state.is_candidate()
    }
}

/// Which hand a pointer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandType {
    #[default]
    None,
    Left,
    Right,
}

/// Per-hand interaction signal supplied by the hand-tracking pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandPointerInfo {
    #[serde(default)]
    pub hand_type: HandType,
    /// The hand is currently being tracked.
    #[serde(default)]
    pub is_tracked: bool,
    /// The hand is this user's active control pointer.
    #[serde(default)]
    pub is_primary_for_user: bool,
}

/// Hand interaction details for one identity in one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserInfo {
    pub tracking_id: TrackingId,
    #[serde(default)]
    pub hand_pointers: Vec<HandPointerInfo>,
}

impl UserInfo {
    /// At least one hand pointer is tracked.
    #[must_use]
    pub fn has_tracked_hands(&self) -> bool {
        self.hand_pointers.iter().any(|hand| hand.is_tracked)
    }

    /// At least one hand pointer is flagged primary. An empty collection
    /// means no primary hand.
    #[must_use]
    pub fn has_primary_hand(&self) -> bool {
        self.hand_pointers.iter().any(|hand| hand.is_primary_for_user)
    }
}

/// Movement history summary for one identity, owned by an activity meter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub last_position: Position,
    /// Normalized recent movement in \[0.0, 1.0\]. 0 is still.
    pub activity_level: f64,
    pub is_active: bool,
    /// Timestamp (ms) of the last active/inactive transition.
    pub state_transition_timestamp: i64,
    /// Timestamp (ms) of the last refresh.
    pub last_update_timestamp: i64,
}

/// Interaction state published for a tracked identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Tracked,
    Engaged,
}

impl UserState {
    /// Name used in published notifications.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tracked => "tracked",
            Self::Engaged => "engaged",
        }
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tracked" => Ok(Self::Tracked),
            "engaged" => Ok(Self::Engaged),
            _ => Err(ValidationError::InvalidUserState {
                value: s.to_string(),
            }),
        }
    }
}
