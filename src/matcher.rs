// Decides, per pixel, whether its colour is the "cloak" colour.

use crate::types::Hsl;
use derivative::Derivative;
use derive_setters::Setters;

/// Pixels brighter than this (percent lightness) never match; blown-out highlights
/// carry no usable hue.
pub const LIGHTNESS_CEILING: f64 = 95.0;

pub const DEFAULT_TARGET_HUE: f64 = 0.0; // red
pub const DEFAULT_HUE_TOLERANCE: f64 = 15.0;
pub const DEFAULT_SATURATION_FLOOR: f64 = 40.0;
pub const DEFAULT_LIGHTNESS_FLOOR: f64 = 20.0;

pub const MAX_HUE_TOLERANCE: f64 = 180.0;

/// Which colour to key out and how strict to be about it.
/// Read once per frame by the compositor; edits land on the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
pub struct ThresholdConfig {
    #[derivative(Default(value = "DEFAULT_TARGET_HUE"))]
    pub target_hue: f64, // [0, 360)

    #[derivative(Default(value = "DEFAULT_HUE_TOLERANCE"))]
    pub hue_tolerance: f64, // [0, 180]

    #[derivative(Default(value = "DEFAULT_SATURATION_FLOOR"))]
    pub saturation_floor: f64, // [0, 100]

    #[derivative(Default(value = "DEFAULT_LIGHTNESS_FLOOR"))]
    pub lightness_floor: f64, // [0, 100]
}

impl ThresholdConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the hue into [0,360) and clamp everything else into its declared range.
    pub fn normalized(self) -> Self {
        Self {
            target_hue: self.target_hue.rem_euclid(360.0),
            hue_tolerance: self.hue_tolerance.clamp(0.0, MAX_HUE_TOLERANCE),
            saturation_floor: self.saturation_floor.clamp(0.0, 100.0),
            lightness_floor: self.lightness_floor.clamp(0.0, 100.0),
        }
    }

    /// True when a pixel with this colour should be replaced by the background.
    #[inline]
    pub fn matches(&self, hsl: Hsl) -> bool {
        // Near-gray, near-black and blown-out pixels never match
        if hsl.s < self.saturation_floor
            || hsl.l < self.lightness_floor
            || hsl.l > LIGHTNESS_CEILING
        {
            return false;
        }

        hue_distance(hsl.h, self.target_hue) <= self.hue_tolerance
    }
}

/// Shortest distance between two hues on the colour wheel, in [0,180].
#[inline]
pub fn hue_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    diff.min(360.0 - diff)
}
