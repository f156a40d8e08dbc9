// Per-frame chroma-key pass: wherever the live pixel is the cloak colour,
// show the captured background instead.
//
// The live buffer is composited in place; the caller owns it exclusively for the tick.

use crate::background::BackgroundStore;
use crate::color::rgb_to_hsl;
use crate::matcher::ThresholdConfig;
use crate::types::{CHANNELS, FrameBuffer};
use rayon::prelude::*;

/// What happened to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    /// No background captured yet; frame untouched.
    Passthrough,
    /// Live and background sizes differ; frame untouched.
    DimensionMismatch {
        live: (usize, usize),
        background: (usize, usize),
    },
    /// Keying applied; `replaced` pixels now show the background.
    Keyed { replaced: usize },
}

pub struct FrameCompositor {
    parallel: bool, // split the pass across rows with rayon
}

impl FrameCompositor {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Replace every matching pixel's RGB with the background's RGB at the same index.
    /// Alpha is never touched.
    pub fn process(
        &self,
        live: &mut FrameBuffer,
        cfg: &ThresholdConfig,
        store: &BackgroundStore,
    ) -> Composite {
        let Some(bg) = store.get() else {
            return Composite::Passthrough;
        };

        if !live.same_size(bg) || live.pixels.len() != bg.pixels.len() {
            return Composite::DimensionMismatch {
                live: (live.width, live.height),
                background: (bg.width, bg.height),
            };
        }

        let row_bytes = live.width * CHANNELS;
        if row_bytes == 0 {
            return Composite::Keyed { replaced: 0 };
        }

        let replaced = if self.parallel {
            live.pixels
                .par_chunks_mut(row_bytes)
                .zip(bg.pixels.par_chunks(row_bytes))
                .map(|(live_row, bg_row)| key_row(live_row, bg_row, cfg))
                .sum::<usize>()
        } else {
            key_row(&mut live.pixels, &bg.pixels, cfg)
        };

        Composite::Keyed { replaced }
    }

    /// Debug view: matched pixels white, everything else black (alpha kept).
    pub fn paint_match_mask(&self, frame: &mut FrameBuffer, cfg: &ThresholdConfig) {
        let row_bytes = frame.width * CHANNELS;
        if row_bytes == 0 {
            return;
        }
        if self.parallel {
            frame
                .pixels
                .par_chunks_mut(row_bytes)
                .for_each(|row| mask_row(row, cfg));
        } else {
            mask_row(&mut frame.pixels, cfg);
        }
    }
}

impl Default for FrameCompositor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[inline]
fn key_row(live: &mut [u8], bg: &[u8], cfg: &ThresholdConfig) -> usize {
    let mut replaced = 0;
    for (px, bg_px) in live.chunks_exact_mut(CHANNELS).zip(bg.chunks_exact(CHANNELS)) {
        if cfg.matches(rgb_to_hsl(px[0], px[1], px[2])) {
            px[..3].copy_from_slice(&bg_px[..3]);
            replaced += 1;
        }
    }
    replaced
}

#[inline]
fn mask_row(row: &mut [u8], cfg: &ThresholdConfig) {
    for px in row.chunks_exact_mut(CHANNELS) {
        let v = if cfg.matches(rgb_to_hsl(px[0], px[1], px[2])) { 255 } else { 0 };
        px[..3].fill(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn red_cloak() -> ThresholdConfig {
        ThresholdConfig::new()
            .with_target_hue(0.0)
            .with_hue_tolerance(15.0)
            .with_saturation_floor(40.0)
            .with_lightness_floor(20.0)
    }

    /// A busy little scene: gradients in every channel, no two rows alike.
    fn scene(w: usize, h: usize) -> FrameBuffer {
        let mut fb = FrameBuffer::filled(w, h, [0, 0, 0, 255]);
        for y in 0..h {
            for x in 0..w {
                let r = ((x * 37 + y * 11) % 256) as u8;
                let g = ((x * 5 + y * 53) % 256) as u8;
                let b = ((x * 19 + y * 3) % 256) as u8;
                fb.set_rgba(y * w + x, [r, g, b, (x % 256) as u8]);
            }
        }
        fb
    }

    #[test]
    fn empty_store_is_passthrough() {
        let live = scene(16, 9);
        let mut out = live.clone();
        let result = FrameCompositor::default().process(&mut out, &red_cloak(), &BackgroundStore::new());
        assert_eq!(result, Composite::Passthrough);
        assert_eq!(out, live);
    }

    #[test]
    fn red_pixel_becomes_background_blue() {
        let (w, h, k) = (8, 6, 19);
        let mut store = BackgroundStore::new();
        store.capture(&FrameBuffer::filled(w, h, BLUE));

        let gray = [90, 90, 90, 255];
        let mut live = FrameBuffer::filled(w, h, gray);
        live.set_rgba(k, RED);

        let result = FrameCompositor::new(false).process(&mut live, &red_cloak(), &store);
        assert_eq!(result, Composite::Keyed { replaced: 1 });
        for i in 0..w * h {
            let expected = if i == k { BLUE } else { gray };
            assert_eq!(live.rgba(i), expected, "pixel {i}");
        }
    }

    #[test]
    fn alpha_is_never_replaced() {
        let mut store = BackgroundStore::new();
        store.capture(&FrameBuffer::filled(2, 1, [0, 0, 255, 10]));
        let mut live = FrameBuffer::filled(2, 1, [255, 0, 0, 200]);
        FrameCompositor::default().process(&mut live, &red_cloak(), &store);
        assert_eq!(live.rgba(0), [0, 0, 255, 200]);
        assert_eq!(live.rgba(1), [0, 0, 255, 200]);
    }

    #[test]
    fn size_mismatch_leaves_frame_alone() {
        let mut store = BackgroundStore::new();
        store.capture(&FrameBuffer::filled(4, 4, BLUE));
        let live = FrameBuffer::filled(4, 3, RED);
        let mut out = live.clone();
        let result = FrameCompositor::default().process(&mut out, &red_cloak(), &store);
        assert_eq!(
            result,
            Composite::DimensionMismatch { live: (4, 3), background: (4, 4) }
        );
        assert_eq!(out, live);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let (w, h) = (64, 48);
        let mut store = BackgroundStore::new();
        store.capture(&FrameBuffer::filled(w, h, [12, 200, 34, 255]));
        let cfg = ThresholdConfig::new().with_hue_tolerance(40.0).with_saturation_floor(20.0);

        let mut seq = scene(w, h);
        let mut par = seq.clone();
        let a = FrameCompositor::new(false).process(&mut seq, &cfg, &store);
        let b = FrameCompositor::new(true).process(&mut par, &cfg, &store);

        assert_eq!(a, b);
        assert_eq!(seq, par);
        assert!(matches!(a, Composite::Keyed { replaced } if replaced > 0));
    }

    #[test]
    fn zero_sized_frames_do_not_panic() {
        let mut store = BackgroundStore::new();
        store.capture(&FrameBuffer::filled(0, 0, BLUE));
        let mut live = FrameBuffer::filled(0, 0, RED);
        let result = FrameCompositor::default().process(&mut live, &red_cloak(), &store);
        assert_eq!(result, Composite::Keyed { replaced: 0 });
    }

    #[test]
    fn mask_view_marks_matches() {
        let mut frame = FrameBuffer::filled(3, 1, [40, 40, 40, 77]);
        frame.set_rgba(1, [250, 10, 10, 77]);
        FrameCompositor::default().paint_match_mask(&mut frame, &red_cloak());
        assert_eq!(frame.rgba(0), [0, 0, 0, 77]);
        assert_eq!(frame.rgba(1), [255, 255, 255, 77]);
        assert_eq!(frame.rgba(2), [0, 0, 0, 77]);
    }
}
