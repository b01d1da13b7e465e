//! Relevance colormap.

/// Map a value in `[0, 1]` to an RGB color on the jet gradient.
///
/// The gradient runs blue (cold, irrelevant) through green to red (hot,
/// decisive), matching the classic jet colormap: 0.0 maps to dark blue,
/// 0.5 to green, 1.0 to dark red. Out-of-range inputs are clamped.
#[must_use]
pub fn jet(value: f32) -> [u8; 3] {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let r = (1.5 - (4.0 * v - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * v - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * v - 1.0).abs()).clamp(0.0, 1.0);
    [
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ]
}
