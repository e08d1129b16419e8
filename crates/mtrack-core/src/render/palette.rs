use image::Rgb;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub const PALETTE_SIZE: usize = 30;
const SATURATION: f64 = 200.0 / 255.0;

/// Hue wheel of [`PALETTE_SIZE`] evenly spaced colors, shuffled by `seed`.
pub fn object_palette(seed: u64) -> Vec<Rgb<u8>> {
    let mut colors: Vec<Rgb<u8>> = (0..PALETTE_SIZE)
        .map(|i| hsv_to_rgb(i as f64 * 360.0 / PALETTE_SIZE as f64, SATURATION, 1.0))
        .collect();
    let mut rng = StdRng::seed_from_u64(seed);
    colors.shuffle(&mut rng);
    colors
}

/// `h` in degrees, `s` and `v` in `[0, 1]`.
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb<u8> {
    let c = v * s;
    let sector = (h.rem_euclid(360.0)) / 60.0;
    let x = c * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    let to_u8 = |channel: f64| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}
