// Perceptual volume curve for the UI slider

/// Map a linear slider position in [0, 1] to a gain that sounds evenly
/// spaced: `(10^v - 1) / 9`. Input is clamped.
pub fn logarithmic_volume(linear: f32) -> f32 {
    let v = linear.clamp(0.0, 1.0);
    ((10f32.powf(v) - 1.0) / 9.0).clamp(0.0, 1.0)
}
