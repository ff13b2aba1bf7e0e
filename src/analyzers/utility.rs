/// Rounds to `places` decimal places, halves away from zero.
///
/// Callers keep `places` within `JobConfig::MAX_PRECISION`.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // avoid "-0" in output
    if rounded == 0.0 { 0.0 } else { rounded }
}
