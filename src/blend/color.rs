//! Packed pixel helpers and color-space conversions
//!
//! Pixels are packed `r | g << 8 | b << 16 | a << 24`. Channel math is done
//! in `i32` so intermediate differences can go negative.
//!
//! Hue uses a 0..1536 scale (six sectors of 256) so HSV round trips stay in
//! integer math. The color wheel and hue rotation both depend on this scale.

/// Number of hue steps in a full turn
pub const HUE_RANGE: i32 = 1536;

#[inline]
pub fn make_rgba(r: i32, g: i32, b: i32, a: i32) -> u32 {
    (r as u32 & 0xff) | (g as u32 & 0xff) << 8 | (b as u32 & 0xff) << 16 | (a as u32 & 0xff) << 24
}

#[inline]
pub fn make_rgb(r: i32, g: i32, b: i32) -> u32 {
    make_rgba(r, g, b, 255)
}

#[inline]
pub fn get_r(c: u32) -> i32 {
    (c & 0xff) as i32
}

#[inline]
pub fn get_g(c: u32) -> i32 {
    ((c >> 8) & 0xff) as i32
}

#[inline]
pub fn get_b(c: u32) -> i32 {
    ((c >> 16) & 0xff) as i32
}

#[inline]
pub fn get_a(c: u32) -> i32 {
    (c >> 24) as i32
}

#[inline]
pub fn clamp_channel(v: i32) -> i32 {
    v.clamp(0, 255)
}

/// Integer BT.709 luma; the weights sum to 256 so grays map to themselves.
#[inline]
pub fn luminance(c: u32) -> i32 {
    (54 * get_r(c) + 183 * get_g(c) + 19 * get_b(c)) >> 8
}

/// RGB to HSV with hue in `0..HUE_RANGE`, saturation and value in 0..=255
pub fn rgb_to_hsv(r: i32, g: i32, b: i32) -> (i32, i32, i32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max == 0 { 0 } else { delta * 255 / max };

    if delta == 0 {
        return (0, s, v);
    }

    let h = if r == max {
        (g - b) * 256 / delta
    } else if g == max {
        512 + (b - r) * 256 / delta
    } else {
        1024 + (r - g) * 256 / delta
    };

    (h.rem_euclid(HUE_RANGE), s, v)
}

/// HSV back to RGB; hue wraps, so any integer is accepted
pub fn hsv_to_rgb(h: i32, s: i32, v: i32) -> (i32, i32, i32) {
    let s = clamp_channel(s);
    let v = clamp_channel(v);

    if s == 0 {
        return (v, v, v);
    }

    let h = h.rem_euclid(HUE_RANGE);
    let sector = h >> 8;
    let f = h & 255;

    let p = v * (255 - s) / 255;
    let q = v * (255 - s * f / 255) / 255;
    let t = v * (255 - s * (255 - f) / 255) / 255;

    match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// RGB to YCbCr (BT.709 weights, chroma centered on 128)
pub fn rgb_to_yuv(r: i32, g: i32, b: i32) -> (i32, i32, i32) {
    let y = (54 * r + 183 * g + 19 * b) >> 8;
    let u = 128 + (b - y) * 138 / 256;
    let v = 128 + (r - y) * 163 / 256;
    (y, u, v)
}

/// YCbCr back to RGB, clamped to the displayable range
pub fn yuv_to_rgb(y: i32, u: i32, v: i32) -> (i32, i32, i32) {
    let r = y + (v - 128) * 403 / 256;
    let b = y + (u - 128) * 475 / 256;
    let g = y + (54 * (y - r) + 19 * (y - b)) / 183;
    (clamp_channel(r), clamp_channel(g), clamp_channel(b))
}
