//! Compositing operators and color math
//!
//! Every operator takes `(dst, src, t)` where `t` is a *transparency* with
//! an inverted convention: `t = 0` applies the source fully, `t = 255`
//! leaves the destination untouched. [`Blend::keep_lum`] is the exception:
//! its second argument is a target luminance, not a weight.

pub mod color;
pub mod gamma;

pub use color::{
    clamp_channel, get_a, get_b, get_g, get_r, hsv_to_rgb, luminance, make_rgb, make_rgba,
    rgb_to_hsv, rgb_to_yuv, yuv_to_rgb, HUE_RANGE,
};

use serde::{Deserialize, Serialize};

/// Operator applied by blended Bitmap writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Linear interpolation
    #[default]
    Trans,
    /// Interpolation in linear light
    Gamma,
    /// Per-channel maximum
    Lighten,
    /// Per-channel minimum
    Darken,
    /// Source hue and saturation, destination luminance
    Colorize,
    /// Source luminance, destination chroma
    Luminosity,
    /// Raise destination alpha
    AlphaAdd,
    /// Lower destination alpha
    AlphaSub,
    /// Blur toward the 3x3 neighborhood (resolved by the Bitmap)
    Smooth,
}

impl BlendMode {
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Trans,
            BlendMode::Gamma,
            BlendMode::Lighten,
            BlendMode::Darken,
            BlendMode::Colorize,
            BlendMode::Luminosity,
            BlendMode::AlphaAdd,
            BlendMode::AlphaSub,
            BlendMode::Smooth,
        ]
    }
}

/// Stateless operator set
pub struct Blend;

impl Blend {
    /// Dispatch on the active mode.
    ///
    /// `Smooth` needs the destination neighborhood, which only the Bitmap
    /// has; given two colors it behaves like `trans`.
    #[inline]
    pub fn current(mode: BlendMode, dst: u32, src: u32, t: i32) -> u32 {
        match mode {
            BlendMode::Trans | BlendMode::Smooth => Self::trans(dst, src, t),
            BlendMode::Gamma => Self::gamma(dst, src, t),
            BlendMode::Lighten => Self::lighten(dst, src, t),
            BlendMode::Darken => Self::darken(dst, src, t),
            BlendMode::Colorize => Self::colorize(dst, src, t),
            BlendMode::Luminosity => Self::luminosity(dst, src, t),
            BlendMode::AlphaAdd => Self::alpha_add(dst, src, t),
            BlendMode::AlphaSub => Self::alpha_sub(dst, src, t),
        }
    }

    /// `src + (dst - src) * t / 255` on all four channels
    #[inline]
    pub fn trans(dst: u32, src: u32, t: i32) -> u32 {
        let t = t.clamp(0, 255);
        let mix = |d: i32, s: i32| s + t * (d - s) / 255;

        make_rgba(
            mix(get_r(dst), get_r(src)),
            mix(get_g(dst), get_g(src)),
            mix(get_b(dst), get_b(src)),
            mix(get_a(dst), get_a(src)),
        )
    }

    /// `trans` on gamma-linearized color channels; alpha stays linear
    pub fn gamma(dst: u32, src: u32, t: i32) -> u32 {
        let t = t.clamp(0, 255);
        if dst == src || t == 255 {
            return dst;
        }
        if t == 0 {
            return src;
        }

        let mix = |d: i32, s: i32| {
            let (d, s) = (gamma::fix(d), gamma::fix(s));
            gamma::unfix(s + t * (d - s) / 255)
        };

        make_rgba(
            mix(get_r(dst), get_r(src)),
            mix(get_g(dst), get_g(src)),
            mix(get_b(dst), get_b(src)),
            get_a(src) + t * (get_a(dst) - get_a(src)) / 255,
        )
    }

    pub fn lighten(dst: u32, src: u32, t: i32) -> u32 {
        let c = make_rgba(
            get_r(dst).max(get_r(src)),
            get_g(dst).max(get_g(src)),
            get_b(dst).max(get_b(src)),
            get_a(src),
        );
        Self::trans(dst, c, t)
    }

    pub fn darken(dst: u32, src: u32, t: i32) -> u32 {
        let c = make_rgba(
            get_r(dst).min(get_r(src)),
            get_g(dst).min(get_g(src)),
            get_b(dst).min(get_b(src)),
            get_a(src),
        );
        Self::trans(dst, c, t)
    }

    /// Paste the source's hue and saturation onto the destination's luminance
    pub fn colorize(dst: u32, src: u32, t: i32) -> u32 {
        Self::trans(dst, Self::keep_lum(src, luminance(dst)), t)
    }

    /// Paste the source's luminance onto the destination's chroma
    pub fn luminosity(dst: u32, src: u32, t: i32) -> u32 {
        Self::trans(dst, Self::keep_lum(dst, luminance(src)), t)
    }

    /// Replace the luminance of `c` with `lum`, keeping chroma and alpha.
    ///
    /// Used by every "preserve luminosity" option.
    pub fn keep_lum(c: u32, lum: i32) -> u32 {
        let (_, u, v) = rgb_to_yuv(get_r(c), get_g(c), get_b(c));
        let (r, g, b) = yuv_to_rgb(clamp_channel(lum), u, v);
        make_rgba(r, g, b, get_a(c))
    }

    /// Raise the destination alpha by the source alpha, weighted by `t`
    pub fn alpha_add(dst: u32, src: u32, t: i32) -> u32 {
        let amount = get_a(src) * (255 - t.clamp(0, 255)) / 255;
        let a = (get_a(dst) + amount).min(255);
        (dst & 0x00ff_ffff) | (a as u32) << 24
    }

    /// Lower the destination alpha by the source alpha, weighted by `t`
    pub fn alpha_sub(dst: u32, src: u32, t: i32) -> u32 {
        let amount = get_a(src) * (255 - t.clamp(0, 255)) / 255;
        let a = (get_a(dst) - amount).max(0);
        (dst & 0x00ff_ffff) | (a as u32) << 24
    }

    pub fn invert(c: u32) -> u32 {
        c ^ 0x00ff_ffff
    }

    /// Branch-free approximate blend for UI chrome. Divides by 256, keeps the
    /// destination alpha; never use it on undo-tracked pixels.
    #[inline]
    pub fn fast(dst: u32, src: u32, t: i32) -> u32 {
        let t = t.clamp(0, 255) as u32;
        let s = 255 - t;

        let rb = (((src & 0x00ff_00ff) * s + (dst & 0x00ff_00ff) * t) >> 8) & 0x00ff_00ff;
        let g = (((src & 0x0000_ff00) * s + (dst & 0x0000_ff00) * t) >> 8) & 0x0000_ff00;

        rb | g | (dst & 0xff00_0000)
    }

    /// Average of a pixel neighborhood, all four channels
    pub fn average(pixels: &[u32]) -> u32 {
        if pixels.is_empty() {
            return 0;
        }

        let (mut r, mut g, mut b, mut a) = (0i64, 0i64, 0i64, 0i64);
        for &c in pixels {
            r += get_r(c) as i64;
            g += get_g(c) as i64;
            b += get_b(c) as i64;
            a += get_a(c) as i64;
        }
        let n = pixels.len() as i64;

        make_rgba((r / n) as i32, (g / n) as i32, (b / n) as i32, (a / n) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_color(rng: &mut StdRng) -> u32 {
        rng.gen()
    }

    #[test]
    fn test_trans_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let c = random_color(&mut rng);
            for t in 0..=255 {
                assert_eq!(Blend::trans(c, c, t), c);
            }
        }
    }

    #[test]
    fn test_trans_extremes() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..500 {
            let dst = random_color(&mut rng);
            let src = random_color(&mut rng);
            // 0 = maximal effect, 255 = no effect
            assert_eq!(Blend::trans(dst, src, 0), src);
            assert_eq!(Blend::trans(dst, src, 255), dst);
        }
    }

    #[test]
    fn test_trans_midpoint() {
        let c = Blend::trans(make_rgb(0, 0, 0), make_rgb(255, 255, 255), 128);
        assert_eq!(get_r(c), 255 - 128);
    }

    #[test]
    fn test_every_mode_is_identity_at_full_transparency() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let dst = random_color(&mut rng);
            let src = random_color(&mut rng);
            for &mode in BlendMode::all() {
                assert_eq!(Blend::current(mode, dst, src, 255), dst, "{:?}", mode);
            }
        }
    }

    #[test]
    fn test_gamma_extremes() {
        let dst = make_rgb(200, 40, 90);
        let src = make_rgb(20, 240, 180);
        assert_eq!(Blend::gamma(dst, src, 255), dst);
        assert_eq!(Blend::gamma(dst, src, 0), src);
        assert_eq!(Blend::gamma(dst, dst, 77), dst);
    }

    #[test]
    fn test_gamma_midtones_brighter() {
        let linear = Blend::trans(make_rgb(255, 0, 0), make_rgb(0, 255, 0), 128);
        let gamma = Blend::gamma(make_rgb(255, 0, 0), make_rgb(0, 255, 0), 128);
        assert!(get_g(gamma) > get_g(linear));
        assert!(get_r(gamma) > get_r(linear));
    }

    #[test]
    fn test_lighten_darken() {
        let dst = make_rgb(100, 200, 50);
        let src = make_rgb(150, 100, 50);
        assert_eq!(Blend::lighten(dst, src, 0), make_rgb(150, 200, 50));
        assert_eq!(Blend::darken(dst, src, 0), make_rgb(100, 100, 50));
    }

    #[test]
    fn test_keep_lum_on_grays() {
        for lum in 0..=255 {
            assert_eq!(Blend::keep_lum(make_rgb(77, 77, 77), lum), make_rgb(lum, lum, lum));
        }
    }

    #[test]
    fn test_colorize_keeps_destination_luminance() {
        let dst = make_rgb(120, 120, 120);
        let src = make_rgb(40, 90, 160);
        let out = Blend::colorize(dst, src, 0);
        assert!((luminance(out) - luminance(dst)).abs() <= 3);
        // Took on the source's blue cast
        assert!(get_b(out) > get_r(out));
    }

    #[test]
    fn test_luminosity_takes_source_luminance() {
        let dst = make_rgb(180, 60, 60);
        let src = make_rgb(30, 30, 30);
        let out = Blend::luminosity(dst, src, 0);
        assert!((luminance(out) - 30).abs() <= 3);
        assert!(get_r(out) > get_g(out));
    }

    #[test]
    fn test_alpha_add_sub() {
        let dst = make_rgba(10, 20, 30, 100);
        let src = make_rgba(0, 0, 0, 255);
        assert_eq!(get_a(Blend::alpha_add(dst, src, 0)), 255);
        assert_eq!(get_a(Blend::alpha_sub(dst, src, 0)), 0);
        assert_eq!(Blend::alpha_add(dst, src, 0) & 0x00ff_ffff, dst & 0x00ff_ffff);
    }

    #[test]
    fn test_fast_extremes() {
        let dst = make_rgba(10, 20, 30, 40);
        let src = make_rgb(250, 240, 230);
        let full = Blend::fast(dst, src, 0);
        assert!((get_r(full) - 250).abs() <= 1);
        assert!((get_b(full) - 230).abs() <= 1);
        assert_eq!(get_a(full), 40);
    }

    #[test]
    fn test_invert() {
        assert_eq!(Blend::invert(make_rgba(0, 255, 10, 7)), make_rgba(255, 0, 245, 7));
    }

    #[test]
    fn test_blend_mode_serde() {
        let json = serde_json::to_string(&BlendMode::AlphaAdd).unwrap_or_default();
        assert_eq!(json, "\"alpha-add\"");
    }
}
