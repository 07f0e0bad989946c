//! Gamma linearization tables
//!
//! `fix` lifts an 8-bit sRGB-ish channel into 16-bit linear light and
//! `unfix` maps it back. Blending in linear light keeps midtones from
//! darkening when two saturated colors mix.

use once_cell::sync::Lazy;

const GAMMA: f64 = 2.2;

static FIX: Lazy<[u16; 256]> = Lazy::new(|| {
    let mut table = [0u16; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = ((i as f64 / 255.0).powf(GAMMA) * 65535.0).round() as u16;
    }
    table
});

static UNFIX: Lazy<Box<[u8]>> = Lazy::new(|| {
    (0..65536u32)
        .map(|i| ((i as f64 / 65535.0).powf(1.0 / GAMMA) * 255.0).round() as u8)
        .collect()
});

/// 8-bit channel to 16-bit linear value
#[inline]
pub fn fix(v: i32) -> i32 {
    FIX[v.clamp(0, 255) as usize] as i32
}

/// 16-bit linear value back to an 8-bit channel
#[inline]
pub fn unfix(v: i32) -> i32 {
    UNFIX[v.clamp(0, 65535) as usize] as i32
}
