//! Panel telemetry: `|`-delimited raw readings from switches and sliders.
//!
//! In panel mode the device streams one line per scan, e.g.
//!
//! ```text
//! 4095|4095|12|2050
//! ```
//!
//! with one field per configured control (switches first, then sliders).
//! Switches idle high (pull-up, around 4095) and read near zero while
//! pressed.  Sliders are potentiometers spanning roughly `5..=4090`.

use thiserror::Error;

/// Field delimiter on the wire.
pub const FIELD_DELIMITER: char = '|';

/// Lowest raw slider reading the hardware produces.
pub const SLIDER_RAW_MIN: u16 = 5;
/// Highest raw slider reading the hardware produces.
pub const SLIDER_RAW_MAX: u16 = 4090;

/// Default reading at or above which a switch counts as released.
pub const DEFAULT_HIGH_THRESHOLD: u16 = 4000;
/// Default reading below which a switch counts as pressed.
pub const DEFAULT_LOW_THRESHOLD: u16 = 100;

/// Errors produced while parsing a telemetry line.
#[derive(Debug, Error, PartialEq)]
pub enum PanelError {
    /// The line does not carry one field per configured control.
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    /// A field is not an unsigned integer.
    #[error("field {index} is not a reading: {value:?}")]
    NotANumber { index: usize, value: String },
}

/// One scan of every control on the panel, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSnapshot {
    readings: Vec<u16>,
}

impl PanelSnapshot {
    /// Parses a trimmed telemetry line.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::FieldCount`] when the number of fields differs
    /// from `expected_fields`, and [`PanelError::NotANumber`] when a field
    /// does not parse as a `u16`.
    pub fn parse(line: &str, expected_fields: usize) -> Result<Self, PanelError> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();
        if fields.len() != expected_fields {
            return Err(PanelError::FieldCount {
                expected: expected_fields,
                actual: fields.len(),
            });
        }

        let readings = fields
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value.parse::<u16>().map_err(|_| PanelError::NotANumber {
                    index,
                    value: (*value).to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { readings })
    }

    /// Raw readings in wire order.
    pub fn readings(&self) -> &[u16] {
        &self.readings
    }

    /// Number of controls in this scan.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Returns `true` if the scan carries no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Detects button-press edges on a set of switch channels.
///
/// A press is reported once when a channel goes from a reading at or above
/// the high threshold to a reading below the low threshold on successive
/// scans.  Holding the button (low followed by low) reports nothing, and
/// readings between the two thresholds never arm or fire an edge.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    high_threshold: u16,
    low_threshold: u16,
    previous: Vec<Option<u16>>,
}

impl EdgeDetector {
    /// Creates a detector for `channels` switches.
    pub fn new(channels: usize, high_threshold: u16, low_threshold: u16) -> Self {
        Self {
            high_threshold,
            low_threshold,
            previous: vec![None; channels],
        }
    }

    /// Creates a detector with the default 4000 / 100 thresholds.
    pub fn with_default_thresholds(channels: usize) -> Self {
        Self::new(channels, DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD)
    }

    /// Feeds one reading for `channel` and reports whether it completed a press edge.
    ///
    /// Channels outside the configured range are ignored.
    pub fn update(&mut self, channel: usize, reading: u16) -> bool {
        let Some(slot) = self.previous.get_mut(channel) else {
            return false;
        };
        let fired = matches!(*slot, Some(prev) if prev >= self.high_threshold)
            && reading < self.low_threshold;
        *slot = Some(reading);
        fired
    }

    /// Forgets all previous readings.  Used when the link is restored, since
    /// the device may have been power-cycled in between.
    pub fn reset(&mut self) {
        self.previous.iter_mut().for_each(|p| *p = None);
    }
}

/// Maps a raw slider reading from `[5, 4090]` linearly onto `[0, 100]`.
///
/// Readings outside the hardware range are clamped first.
pub fn map_slider(raw: u16) -> u8 {
    let clamped = raw.clamp(SLIDER_RAW_MIN, SLIDER_RAW_MAX);
    let span = f32::from(SLIDER_RAW_MAX - SLIDER_RAW_MIN);
    let scaled = f32::from(clamped - SLIDER_RAW_MIN) * 100.0 / span;
    scaled.round() as u8
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Snapshot parsing ──────────────────────────────────────────────────────

    #[test]
    fn test_parse_snapshot_with_expected_field_count() {
        let snap = PanelSnapshot::parse("4095|4095|12|2050", 4).unwrap();
        assert_eq!(snap.readings(), &[4095, 4095, 12, 2050]);
    }

    #[test]
    fn test_parse_snapshot_tolerates_whitespace_around_fields() {
        let snap = PanelSnapshot::parse(" 1 | 2 ", 2).unwrap();
        assert_eq!(snap.readings(), &[1, 2]);
    }

    #[test]
    fn test_parse_snapshot_rejects_wrong_field_count() {
        let result = PanelSnapshot::parse("4095|4095", 3);
        assert_eq!(
            result,
            Err(PanelError::FieldCount {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_parse_snapshot_rejects_non_numeric_field() {
        let result = PanelSnapshot::parse("4095|abc", 2);
        assert!(matches!(result, Err(PanelError::NotANumber { index: 1, .. })));
    }

    // ── Edge detection ────────────────────────────────────────────────────────

    #[test]
    fn test_high_to_low_transition_yields_one_press() {
        // Arrange
        let mut det = EdgeDetector::with_default_thresholds(1);
        det.update(0, 4095);

        // Act
        let fired = det.update(0, 50);

        // Assert
        assert!(fired);
    }

    #[test]
    fn test_low_to_low_yields_no_press() {
        let mut det = EdgeDetector::with_default_thresholds(1);
        det.update(0, 50);
        assert!(!det.update(0, 40));
    }

    #[test]
    fn test_held_button_fires_only_once() {
        let mut det = EdgeDetector::with_default_thresholds(1);
        let fired: Vec<bool> = [4095, 20, 10, 5, 4095, 30]
            .into_iter()
            .map(|r| det.update(0, r))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false, true]);
    }

    #[test]
    fn test_first_reading_never_fires() {
        let mut det = EdgeDetector::with_default_thresholds(1);
        assert!(!det.update(0, 0));
    }

    #[test]
    fn test_midrange_reading_does_not_arm_edge() {
        let mut det = EdgeDetector::with_default_thresholds(1);
        det.update(0, 2000);
        assert!(!det.update(0, 10));
    }

    #[test]
    fn test_channels_are_tracked_independently() {
        let mut det = EdgeDetector::with_default_thresholds(2);
        det.update(0, 4095);
        det.update(1, 50);
        assert!(!det.update(1, 40));
        assert!(det.update(0, 40));
    }

    #[test]
    fn test_out_of_range_channel_is_ignored() {
        let mut det = EdgeDetector::with_default_thresholds(1);
        assert!(!det.update(7, 4095));
    }

    #[test]
    fn test_reset_disarms_pending_edges() {
        let mut det = EdgeDetector::with_default_thresholds(1);
        det.update(0, 4095);
        det.reset();
        assert!(!det.update(0, 10));
    }

    // ── Slider mapping ────────────────────────────────────────────────────────

    #[test]
    fn test_slider_min_maps_to_zero() {
        assert_eq!(map_slider(5), 0);
    }

    #[test]
    fn test_slider_max_maps_to_hundred() {
        assert_eq!(map_slider(4090), 100);
    }

    #[test]
    fn test_slider_midpoint_maps_to_fifty() {
        assert_eq!(map_slider(2047), 50);
    }

    #[test]
    fn test_slider_values_outside_range_are_clamped() {
        assert_eq!(map_slider(0), 0);
        assert_eq!(map_slider(4095), 100);
    }
}
