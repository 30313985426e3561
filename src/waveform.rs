// src/waveform.rs
//
// Decorative waveform profile drawn behind the scrub surface.

use std::f64::consts::PI;

/// Bars in the rendered profile.
pub const WAVEFORM_BARS: usize = 144;

/// Bar heights in `[0.18, 1.0]`, a fixed shape that swells toward the
/// middle. It does not depend on the audio.
pub fn waveform_bars(count: usize) -> Vec<f64> {
    let denom = count.saturating_sub(1).max(1) as f64;
    (0..count)
        .map(|i| {
            let t = i as f64 / denom;
            let envelope = (PI * t).sin();
            let wave = (4.8 * PI * t).sin() + 0.6 * (1.6 * PI * t).sin() + 0.1 * (13.0 * PI * t).sin();
            0.18 + (envelope * wave).abs().min(1.0) * 0.82
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_shape() {
        let bars = waveform_bars(WAVEFORM_BARS);
        assert_eq!(bars.len(), 144);
        assert!(bars.iter().all(|&h| (0.18..=1.0).contains(&h)));
        // Envelope pins both ends to the floor.
        assert!((bars[0] - 0.18).abs() < 1e-12);
        assert!((bars[143] - 0.18).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_counts() {
        assert!(waveform_bars(0).is_empty());
        assert_eq!(waveform_bars(1), vec![0.18]);
    }
}
