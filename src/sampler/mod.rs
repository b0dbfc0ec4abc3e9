//! Frame sampling: converts the live feed into discrete decode attempts.
//!
//! Naive per-frame full-resolution decoding is the dominant cost center in
//! this pipeline. The sampler crops a centered region of interest, hashes it
//! coarsely, and skips ticks whose content barely changed, forcing a decode
//! after a bounded run of skips so a static-but-valid code is never starved.

pub mod enhance;
pub mod hash;

use crate::config::SamplerConfig;
use crate::types::FrameData;
use hash::FrameHash;
use image::GrayImage;

/// Per-tick sampling decision state. The decision core is synchronous and
/// side-effect free; the owning service drives it from its timer loop.
pub struct FrameSampler {
    config: SamplerConfig,
    last_hash: Option<FrameHash>,
    skip_streak: u32,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            last_hash: None,
            skip_streak: 0,
        }
    }

    /// Process one tick's frame. Returns the enhanced ROI bitmap when a
    /// decode attempt is warranted, None when the tick should be skipped.
    pub fn process(&mut self, frame: &FrameData) -> Option<GrayImage> {
        let roi = enhance::luma_roi(frame, self.config.roi_fraction);
        let current = FrameHash::compute(&roi);

        let skip = match self.last_hash.as_ref() {
            Some(previous) => {
                let change = current.change_ratio(previous);
                change < self.config.change_threshold
                    && self.skip_streak < self.config.max_consecutive_skips
            }
            None => false,
        };

        self.last_hash = Some(current);

        if skip {
            self.skip_streak += 1;
            log::trace!("Frame skipped ({} consecutive)", self.skip_streak);
            return None;
        }

        self.skip_streak = 0;
        Some(enhance::enhance(&roi))
    }

    /// Forget sampling history; the next frame always decodes.
    pub fn reset(&mut self) {
        self.last_hash = None;
        self.skip_streak = 0;
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }
}
