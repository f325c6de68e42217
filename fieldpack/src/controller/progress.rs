//! Progress mapping for the download and removal pipelines.
//!
//! The visible bar is split by stage, not by bytes: the style load fills
//! `0..=90`, the tile load reports `0..=100`, validation sits at 95 and
//! completion at 100. Removal reports 40 after the tile step and 80 after the
//! style step.
//!
//! Event streams never go backwards, so tile progress only becomes visible
//! once it passes the style stage's 90, and it is held just below the
//! validation mark until the tile load reports success.

use crate::assets::LoadProgress;

pub const STYLE_PROGRESS_CAP: u8 = 90;
pub const TILE_PROGRESS_CAP: u8 = 100;
pub const VALIDATING_PROGRESS: u8 = 95;
pub const TILES_REMOVED_PROGRESS: u8 = 40;
pub const STYLE_REMOVED_PROGRESS: u8 = 80;
pub const COMPLETE_PROGRESS: u8 = 100;

/// Highest value an in-flight load may show.
pub const DOWNLOAD_PROGRESS_CEILING: u8 = VALIDATING_PROGRESS - 1;

/// Map style load counters into `0..=90`.
pub fn style_progress(progress: LoadProgress) -> u8 {
    scaled(progress, STYLE_PROGRESS_CAP)
}

/// Map tile load counters into `0..=100`.
pub fn tile_progress(progress: LoadProgress) -> u8 {
    scaled(progress, TILE_PROGRESS_CAP)
}

fn scaled(progress: LoadProgress, cap: u8) -> u8 {
    if progress.required == 0 {
        return 0;
    }
    let value = progress.completed.saturating_mul(cap as u64) / progress.required;
    value.min(cap as u64) as u8
}
