//! Percent → master-volume attenuation mapping.
//!
//! Endpoint volume APIs take a level in decibels, and a linear dB sweep feels
//! very uneven to the ear.  The table below was measured so that each percent
//! step sounds like roughly the same change in loudness.

/// Attenuation in dB for each percent level `0..=100`.
pub const DECIBEL_TABLE: [f32; 101] = [
    -65.25, -59.0, -54.0, -49.0, -46.0, -43.0, -40.0, -38.0,
    -37.0, -35.0, -33.0, -32.0, -31.0, -30.0, -29.0, -28.0,
    -27.0, -26.0, -25.0, -24.7, -24.0, -23.0, -22.0, -21.8,
    -21.0, -20.7, -20.0, -19.5, -18.9, -18.5, -17.9, -17.4,
    -17.0, -16.5, -16.0, -15.5, -15.1, -14.8, -14.4, -13.95,
    -13.6, -13.3, -12.9, -12.6, -12.2, -11.9, -11.6, -11.3,
    -10.9, -10.6, -10.3, -10.0, -9.75, -9.5, -9.2, -8.95,
    -8.6, -8.5, -8.2, -8.0, -7.7, -7.5, -7.2, -7.0,
    -6.7, -6.5, -6.3, -6.0, -5.8, -5.6, -5.4, -5.2,
    -5.0, -4.8, -4.6, -4.4, -4.2, -4.0, -3.8, -3.6,
    -3.4, -3.2, -3.0, -2.8, -2.6, -2.5, -2.3, -2.1,
    -2.0, -1.8, -1.6, -1.4, -1.3, -1.1, -1.0, -0.8,
    -0.6, -0.5, -0.3, -0.15, 0.0,
];

/// Returns the attenuation for `percent`, clamping anything above 100.
pub fn level_to_decibels(percent: u8) -> f32 {
    DECIBEL_TABLE[usize::from(percent.min(100))]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(level_to_decibels(0), -65.25);
        assert_eq!(level_to_decibels(100), 0.0);
    }

    #[test]
    fn test_levels_above_hundred_clamp() {
        assert_eq!(level_to_decibels(255), 0.0);
    }

    #[test]
    fn test_table_is_monotonic() {
        assert!(DECIBEL_TABLE.windows(2).all(|w| w[0] < w[1]));
    }
}
