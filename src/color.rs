// sRGB <-> HSL conversion.
// `rgb_to_hsl` runs once per pixel per frame, so it stays branch-light and allocation-free.

use crate::types::Hsl;

/// Convert an sRGB triple to HSL (h in [0,360), s and l in [0,100]).
///
/// When two channels tie for the maximum, red wins over green and green over blue,
/// so e.g. pure yellow (255,255,0) takes the red branch and lands on 60°.
#[inline]
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> Hsl {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        // Achromatic: any gray, black or white
        return Hsl { h: 0.0, s: 0.0, l: l * 100.0 };
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };

    // Hue in "sixths" of the colour wheel, [0,6), then as a fraction of the turn.
    // Keep this order: hues sitting on a tolerance edge depend on the rounding.
    let mut h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    h /= 6.0;

    Hsl { h: h * 360.0, s: s * 100.0, l: l * 100.0 }
}

/// Inverse of [`rgb_to_hsl`]; used to paint the target-colour swatch on the HUD.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    let s = (s / 100.0).clamp(0.0, 1.0);
    let l = (l / 100.0).clamp(0.0, 1.0);

    if s == 0.0 {
        let v = to_u8(l);
        return [v, v, v];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = h.rem_euclid(360.0) / 360.0;

    [
        to_u8(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_u8(hue_to_channel(p, q, h)),
        to_u8(hue_to_channel(p, q, h - 1.0 / 3.0)),
    ]
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[inline]
fn to_u8(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    fn assert_hsl(hsl: Hsl, h: f64, s: f64, l: f64) {
        assert!(
            approx_eq(hsl.h, h) && approx_eq(hsl.s, s) && approx_eq(hsl.l, l),
            "got {hsl:?}, expected ({h}, {s}, {l})"
        );
    }

    #[test]
    fn primaries() {
        assert_hsl(rgb_to_hsl(255, 0, 0), 0.0, 100.0, 50.0);
        assert_hsl(rgb_to_hsl(0, 255, 0), 120.0, 100.0, 50.0);
        assert_hsl(rgb_to_hsl(0, 0, 255), 240.0, 100.0, 50.0);
    }

    #[test]
    fn grays_have_no_hue_or_saturation() {
        for v in [0u8, 1, 64, 128, 200, 255] {
            let hsl = rgb_to_hsl(v, v, v);
            assert_eq!(hsl.h, 0.0);
            assert_eq!(hsl.s, 0.0);
            assert!(approx_eq(hsl.l, v as f64 / 255.0 * 100.0));
        }
    }

    #[test]
    fn ties_pick_the_first_branch() {
        // yellow: red and green tie, red branch gives 60
        assert_hsl(rgb_to_hsl(255, 255, 0), 60.0, 100.0, 50.0);
        // cyan: green and blue tie, green branch gives 180
        assert_hsl(rgb_to_hsl(0, 255, 255), 180.0, 100.0, 50.0);
        // magenta: red and blue tie, red branch wraps to 300
        assert_hsl(rgb_to_hsl(255, 0, 255), 300.0, 100.0, 50.0);
    }

    #[test]
    fn high_lightness_uses_the_other_saturation_formula() {
        // pink: l > 0.5
        let hsl = rgb_to_hsl(255, 128, 128);
        assert!(hsl.l > 50.0);
        assert!(approx_eq(hsl.s, 100.0));
        assert!(approx_eq(hsl.h, 0.0));
    }

    #[test]
    fn output_stays_in_range() {
        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(15) {
                for b in (0..=255u16).step_by(15) {
                    let hsl = rgb_to_hsl(r as u8, g as u8, b as u8);
                    assert!((0.0..360.0).contains(&hsl.h), "{r},{g},{b} -> {hsl:?}");
                    assert!((0.0..=100.0 + 1e-3).contains(&hsl.s), "{r},{g},{b} -> {hsl:?}");
                    assert!((0.0..=100.0 + 1e-3).contains(&hsl.l), "{r},{g},{b} -> {hsl:?}");
                }
            }
        }
    }

    #[test]
    fn swatch_colours() {
        assert_eq!(hsl_to_rgb(0.0, 100.0, 50.0), [255, 0, 0]);
        assert_eq!(hsl_to_rgb(120.0, 100.0, 50.0), [0, 255, 0]);
        assert_eq!(hsl_to_rgb(240.0, 100.0, 50.0), [0, 0, 255]);
        assert_eq!(hsl_to_rgb(360.0, 100.0, 50.0), [255, 0, 0]);
        assert_eq!(hsl_to_rgb(42.0, 0.0, 50.0), [128, 128, 128]);
    }

    #[test]
    fn inverse_recovers_saturated_colours() {
        for rgb in [[200u8, 30, 40], [10, 180, 90], [60, 60, 220], [250, 200, 20]] {
            let hsl = rgb_to_hsl(rgb[0], rgb[1], rgb[2]);
            let back = hsl_to_rgb(hsl.h, hsl.s, hsl.l);
            for c in 0..3 {
                assert!((back[c] as i16 - rgb[c] as i16).abs() <= 1, "{rgb:?} -> {back:?}");
            }
        }
    }
}
