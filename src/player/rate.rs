pub const PLAYBACK_RATES: [f64; 6] = [1.0, 1.25, 1.5, 1.75, 2.0, 0.75];

/// Next rate in the cycle. A rate outside the cycle restarts at 1.0.
#[allow(clippy::float_cmp)]
pub fn next_playback_rate(current: f64) -> f64 {
    let next = PLAYBACK_RATES
        .iter()
        .position(|r| *r == current)
        .map_or(0, |i| (i + 1) % PLAYBACK_RATES.len());
    PLAYBACK_RATES[next]
}

/// Skip target clamped to `[0, duration]`.
pub fn skip_target(current: f64, offset: f64, duration: f64) -> f64 {
    (current + offset).clamp(0.0, duration.max(0.0))
}
