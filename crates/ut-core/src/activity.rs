//! Per-identity movement tracking.
//!
//! The engagement coordinator only consumes the [`ActivityMeter`] trait. The
//! [`UserActivityMeter`] implementation turns skeleton position history into a
//! smoothed activity level and an active/still decision.
//!
//! # Algorithm Summary
//!
//! 1. Speed is the displacement since the previous sample divided by the elapsed time
//! 2. Speed is normalized against `full_activity_speed` and capped at 1.0
//! 3. The level is an exponential moving average of the normalized speed
//! 4. Active/still flips use separate activation and deactivation thresholds

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{ActivityRecord, SkeletonSample, TrackingId, ValidationError};

/// Source of movement history for visible identities.
///
/// This trait allows the coordinator to work with different activity
/// sources (e.g., [`UserActivityMeter`], or scripted test fixtures).
pub trait ActivityMeter: Send {
    /// Refreshes or creates records for the given skeletons.
    ///
    /// Records for identities not present in `skeletons` may be dropped.
    fn update(&mut self, skeletons: &[SkeletonSample], timestamp: i64);

    /// Returns the record for `id`, or `None` if the meter has never seen it.
    fn activity_record(&self, id: TrackingId) -> Option<ActivityRecord>;

    /// Discards all history.
    fn clear(&mut self);
}

/// Configuration for [`UserActivityMeter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityMeterConfig {
    /// Weight kept from the previous level on each update. Default: 0.9.
    pub decay: f64,

    /// Speed in meters per second that counts as full activity. Default: 0.5.
    pub full_activity_speed: f64,

    /// Level at or above which a still identity becomes active. Default: 0.1.
    pub activation_threshold: f64,

    /// Level below which an active identity becomes still. Default: 0.05.
    pub deactivation_threshold: f64,
}

impl Default for ActivityMeterConfig {
    fn default() -> Self {
        Self {
            decay: 0.9,
            full_activity_speed: 0.5,
            activation_threshold: 0.1,
            deactivation_threshold: 0.05,
        }
    }
}

impl ActivityMeterConfig {
    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..1.0).contains(&self.decay) {
            return Err(ValidationError::FractionOutOfRange {
                field: "activity.decay",
                value: self.decay,
            });
        }
        if self.full_activity_speed.is_nan() || self.full_activity_speed <= 0.0 {
            return Err(ValidationError::NotPositive {
                field: "activity.full_activity_speed",
                value: self.full_activity_speed,
            });
        }
        for (field, value) in [
            ("activity.activation_threshold", self.activation_threshold),
            ("activity.deactivation_threshold", self.deactivation_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::FractionOutOfRange { field, value });
            }
        }
        if self.deactivation_threshold > self.activation_threshold {
            return Err(ValidationError::InvertedThresholds {
                activation: self.activation_threshold,
                deactivation: self.deactivation_threshold,
            });
        }
        Ok(())
    }
}

/// Default [`ActivityMeter`] driven by skeleton positions.
#[derive(Debug, Default)]
pub struct UserActivityMeter {
    config: ActivityMeterConfig,
    records: HashMap<TrackingId, ActivityRecord>,
}

impl UserActivityMeter {
    /// Creates a meter after validating its configuration.
    pub fn new(config: ActivityMeterConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            config,
            records: HashMap::new(),
        })
    }

    /// Number of identities with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn refresh(
        config: &ActivityMeterConfig,
        record: &mut ActivityRecord,
        sample: &SkeletonSample,
        timestamp: i64,
    ) {
        let elapsed_ms = timestamp.saturating_sub(record.last_update_timestamp);
        #[expect(
            clippy::cast_precision_loss,
            reason = "frame intervals are far below f64 integer precision"
        )]
        let speed = if elapsed_ms > 0 {
            record.last_position.distance_to(&sample.position) / (elapsed_ms as f64 / 1000.0)
        } else {
            0.0
        };
        let instant = (speed / config.full_activity_speed).min(1.0);

        record.activity_level = record
            .activity_level
            .mul_add(config.decay, instant * (1.0 - config.decay))
            .clamp(0.0, 1.0);
        record.last_position = sample.position;
        record.last_update_timestamp = timestamp;

        let now_active = if record.is_active {
            record.activity_level >= config.deactivation_threshold
        } else {
            record.activity_level >= config.activation_threshold
        };
        if now_active != record.is_active {
            record.is_active = now_active;
            record.state_transition_timestamp = timestamp;
        }
    }
}

impl ActivityMeter for UserActivityMeter {
    fn update(&mut self, skeletons: &[SkeletonSample], timestamp: i64) {
        self.records
            .retain(|id, _| skeletons.iter().any(|s| s.tracking_id == *id));

        for sample in skeletons.iter().filter(|s| s.tracking_id.is_valid()) {
            match self.records.get_mut(&sample.tracking_id) {
                Some(record) => Self::refresh(&self.config, record, sample, timestamp),
                None => {
                    self.records.insert(
                        sample.tracking_id,
                        ActivityRecord {
                            last_position: sample.position,
                            activity_level: 0.0,
                            is_active: false,
                            state_transition_timestamp: timestamp,
                            last_update_timestamp: timestamp,
                        },
                    );
                }
            }
        }
    }

    fn activity_record(&self, id: TrackingId) -> Option<ActivityRecord> {
        self.records.get(&id).copied()
    }

    fn clear(&mut self) {
        self.records.clear();
    }
}
