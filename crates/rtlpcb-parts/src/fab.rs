//! Fab manufacturing limits used for board layout.
//!
//! Two-layer boards only: one copper layer carries vertical traces, the
//! other horizontal, with vias at every direction change.

/// Manufacturing capability limits, all lengths in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FabCapabilities {
    /// Drilled via hole diameter.
    pub via_hole_size: f64,
    /// Via annular ring outer diameter.
    pub via_diameter: f64,
    /// Minimum hole-to-hole clearance.
    pub via_hole_clearance: f64,
    /// Minimum via-to-track clearance.
    pub via_track_clearance: f64,
    /// Minimum trace width.
    pub trace_width: f64,
    /// Minimum trace-to-trace clearance.
    pub trace_clearance: f64,
    /// Copper layer for vertical traces.
    pub layer_vertical: &'static str,
    /// Copper layer for horizontal traces.
    pub layer_horizontal: &'static str,
}

impl FabCapabilities {
    /// JLCPCB standard two-layer process.
    pub const JLCPCB: Self = Self {
        via_hole_size: 0.3,
        via_diameter: 0.6,
        via_hole_clearance: 0.3,
        via_track_clearance: 0.2,
        trace_width: 0.15,
        trace_clearance: 0.15,
        layer_vertical: "F.Cu",
        layer_horizontal: "B.Cu",
    };

    /// Centre-to-centre pitch of adjacent parallel traces.
    #[must_use]
    pub fn min_pitch(&self) -> f64 {
        self.trace_width + self.trace_clearance
    }

    /// Traces that fit side by side through a channel of `width_mm`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn tracks_through(&self, width_mm: f64) -> usize {
        if width_mm < self.trace_width {
            return 0;
        }
        (((width_mm - self.trace_width) / self.min_pitch()).floor() as usize) + 1
    }
}

impl Default for FabCapabilities {
    fn default() -> Self {
        Self::JLCPCB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jlc_pitch() {
        assert!((FabCapabilities::JLCPCB.min_pitch() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn tracks_through_channel() {
        let fab = FabCapabilities::JLCPCB;
        assert_eq!(fab.tracks_through(0.1), 0);
        assert_eq!(fab.tracks_through(0.15), 1);
        // 0.15 + 2 * 0.3 = 0.75
        assert_eq!(fab.tracks_through(0.76), 3);
    }

    #[test]
    fn layers_are_distinct() {
        let fab = FabCapabilities::default();
        assert_ne!(fab.layer_vertical, fab.layer_horizontal);
    }
}
