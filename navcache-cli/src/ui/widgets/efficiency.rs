//! Preload efficiency bands.

use ratatui::style::Color;

/// How well preloading covers the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EfficiencyBand {
    /// 75% and above.
    Good,
    /// 50% to 74%.
    Warning,
    /// Below 50%.
    Poor,
}

impl EfficiencyBand {
    pub fn from_percent(percent: u32) -> Self {
        match percent {
            75.. => EfficiencyBand::Good,
            50..=74 => EfficiencyBand::Warning,
            _ => EfficiencyBand::Poor,
        }
    }

    pub fn color(self) -> Color {
        match self {
            EfficiencyBand::Good => Color::Green,
            EfficiencyBand::Warning => Color::Yellow,
            EfficiencyBand::Poor => Color::Red,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EfficiencyBand::Good => "good",
            EfficiencyBand::Warning => "warning",
            EfficiencyBand::Poor => "poor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(EfficiencyBand::from_percent(100), EfficiencyBand::Good);
        assert_eq!(EfficiencyBand::from_percent(75), EfficiencyBand::Good);
        assert_eq!(EfficiencyBand::from_percent(74), EfficiencyBand::Warning);
        assert_eq!(EfficiencyBand::from_percent(50), EfficiencyBand::Warning);
        assert_eq!(EfficiencyBand::from_percent(49), EfficiencyBand::Poor);
        assert_eq!(EfficiencyBand::from_percent(0), EfficiencyBand::Poor);
    }

    #[test]
    fn test_band_colors() {
        assert_eq!(EfficiencyBand::Good.color(), Color::Green);
        assert_eq!(EfficiencyBand::Poor.color(), Color::Red);
    }

    #[test]
    fn test_band_labels() {
        assert_eq!(EfficiencyBand::from_percent(80).label(), "good");
        assert_eq!(EfficiencyBand::from_percent(60).label(), "warning");
        assert_eq!(EfficiencyBand::from_percent(10).label(), "poor");
    }
}
