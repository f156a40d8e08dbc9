// Keyboard actions and how they move the threshold sliders.

use crate::matcher::ThresholdConfig;

pub const HUE_STEP: f64 = 5.0;
pub const TOLERANCE_STEP: f64 = 1.0;
pub const FLOOR_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    CaptureBackground, // capture, or retake when one exists
    Reset,
    HueDown,
    HueUp,
    ToleranceDown,
    ToleranceUp,
    SaturationDown,
    SaturationUp,
    LightnessDown,
    LightnessUp,
    PresetRed,
    PresetGreen,
    PresetBlue,
    ToggleMask,
    AnalyzeScene,
    ExplainTechnology,
}

/// Apply a threshold control to `cfg`. Returns whether `cfg` changed;
/// non-threshold controls always return false.
pub fn apply_to_config(control: Control, cfg: &mut ThresholdConfig) -> bool {
    let before = *cfg;
    let mut next = before;

    match control {
        Control::HueDown => next.target_hue -= HUE_STEP,
        Control::HueUp => next.target_hue += HUE_STEP,
        Control::ToleranceDown => next.hue_tolerance -= TOLERANCE_STEP,
        Control::ToleranceUp => next.hue_tolerance += TOLERANCE_STEP,
        Control::SaturationDown => next.saturation_floor -= FLOOR_STEP,
        Control::SaturationUp => next.saturation_floor += FLOOR_STEP,
        Control::LightnessDown => next.lightness_floor -= FLOOR_STEP,
        Control::LightnessUp => next.lightness_floor += FLOOR_STEP,
        Control::PresetRed => next.target_hue = 0.0,
        Control::PresetGreen => next.target_hue = 120.0,
        Control::PresetBlue => next.target_hue = 240.0,
        _ => return false,
    }

    *cfg = next.normalized();
    *cfg != before
}
