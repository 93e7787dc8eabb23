//! Replay recorded frames through the engagement coordinator.
//!
//! Input is JSON lines, one frame per line:
//!
//! ```json
//! {"timestamp": 600, "skeletons": [...], "users": [...]}
//! ```
//!
//! Each frame is ranked with `choose_tracked_users`, then fed to
//! `update_user_information`. Every resulting event is written as one JSON
//! line.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use ut_core::ranking::fill_slots;
use ut_core::{
    EngagementCoordinator, RankedCandidate, SkeletonSample, TrackingId, UserInfo, UserStateEvent,
};

use crate::Config;

/// One recorded sensor frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame time in milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub skeletons: Vec<SkeletonSample>,
    #[serde(default)]
    pub users: Vec<UserInfo>,
}

/// Options for a replay run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Overrides `tracked_slots` from the config.
    pub slots: Option<usize>,
    pub show_ranking: bool,
}

/// Summary of a replay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayStats {
    pub frames: usize,
    pub events: usize,
}

#[derive(Serialize)]
struct RankingLine<'a> {
    category: &'static str,
    timestamp: i64,
    slots: &'a [TrackingId],
    candidates: &'a [RankedCandidate],
}

/// Replays the frames at `path` (or stdin for `-`).
pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    path: &Path,
    options: ReplayOptions,
) -> Result<ReplayStats> {
    if path.as_os_str() == "-" {
        replay(writer, config, std::io::stdin().lock(), options)
    } else {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        replay(writer, config, BufReader::new(file), options)
    }
}

/// Replays frames read from `input`.
pub fn replay<W: Write, R: BufRead>(
    writer: &mut W,
    config: &Config,
    input: R,
    options: ReplayOptions,
) -> Result<ReplayStats> {
    let width = options.slots.unwrap_or(config.tracked_slots);
    let coordinator = EngagementCoordinator::new(config.engagement.clone())
        .context("failed to create engagement coordinator")?;

    let (tx, rx) = mpsc::channel::<UserStateEvent>();
    coordinator.events().subscribe(move |event| {
        // Only fails once the receiver is gone, after the replay loop.
        let _ = tx.send(event.clone());
    });

    let mut slots = vec![TrackingId::INVALID; width];
    let mut stats = ReplayStats::default();

    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| format!("failed to read line {line_number}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: Frame = serde_json::from_str(&line)
            .with_context(|| format!("invalid frame on line {line_number}"))?;

        if options.show_ranking {
            let ranked = coordinator.rank_candidates(&frame.skeletons, frame.timestamp);
            fill_slots(&ranked, &mut slots);
            let ranking = RankingLine {
                category: "ranking",
                timestamp: frame.timestamp,
                slots: &slots,
                candidates: &ranked,
            };
            writeln!(writer, "{}", serde_json::to_string(&ranking)?)?;
        } else {
            coordinator.choose_tracked_users(&frame.skeletons, frame.timestamp, &mut slots);
        }
        tracing::debug!(timestamp = frame.timestamp, ?slots, "chose tracked users");

        coordinator.update_user_information(&frame.users, frame.timestamp);
        stats.frames += 1;

        for event in rx.try_iter() {
            writeln!(writer, "{}", serde_json::to_string(&event.envelope())?)?;
            stats.events += 1;
        }
    }

    tracing::info!(frames = stats.frames, events = stats.events, "replay finished");
    Ok(stats)
}
