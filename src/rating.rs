use ratatui::style::Color;

/// Performance band for a single reaction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Rating {
    Insane,
    Purple,
    Good,
    Average,
    Slow,
    Glacial,
}

impl Rating {
    /// Upper (exclusive) bound in ms for each band, checked top to bottom
    const BANDS: [(u64, Rating); 5] = [
        (150, Rating::Insane),
        (200, Rating::Purple),
        (250, Rating::Good),
        (350, Rating::Average),
        (500, Rating::Slow),
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Insane => "INSANELY FAST",
            Rating::Purple => "PURPLE SECTOR",
            Rating::Good => "GOOD PACE",
            Rating::Average => "AVERAGE",
            Rating::Slow => "SLOW",
            Rating::Glacial => "GLACIAL",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Rating::Insane => Color::LightMagenta,
            Rating::Purple => Color::Red,
            Rating::Good => Color::LightGreen,
            Rating::Average => Color::LightYellow,
            Rating::Slow => Color::Rgb(255, 165, 0),
            Rating::Glacial => Color::Gray,
        }
    }
}

/// Classify a reaction time. First band whose threshold is above `ms` wins.
pub fn rate(ms: u64) -> Rating {
    Rating::BANDS
        .iter()
        .find(|(upper, _)| ms < *upper)
        .map(|(_, rating)| *rating)
        .unwrap_or(Rating::Glacial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_band_boundaries() {
        assert_eq!(rate(149), Rating::Insane);
        assert_eq!(rate(150), Rating::Purple);
        assert_eq!(rate(199), Rating::Purple);
        assert_eq!(rate(200), Rating::Good);
        assert_eq!(rate(249), Rating::Good);
        assert_eq!(rate(250), Rating::Average);
        assert_eq!(rate(349), Rating::Average);
        assert_eq!(rate(350), Rating::Slow);
        assert_eq!(rate(499), Rating::Slow);
        assert_eq!(rate(500), Rating::Glacial);
    }

    #[test]
    fn test_rate_extremes() {
        assert_eq!(rate(0), Rating::Insane);
        assert_eq!(rate(u64::MAX), Rating::Glacial);
    }

    #[test]
    fn test_rate_is_deterministic() {
        for ms in 0..2_000u64 {
            assert_eq!(rate(ms), rate(ms));
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(rate(187).label(), "PURPLE SECTOR");
        assert_eq!(rate(120).label(), "INSANELY FAST");
        assert_eq!(rate(230).label(), "GOOD PACE");
        assert_eq!(rate(300).label(), "AVERAGE");
        assert_eq!(rate(420).label(), "SLOW");
        assert_eq!(rate(900).label(), "GLACIAL");
    }

    #[test]
    fn test_bands_are_monotonic() {
        let mut previous = rate(0);
        let order = [
            Rating::Insane,
            Rating::Purple,
            Rating::Good,
            Rating::Average,
            Rating::Slow,
            Rating::Glacial,
        ];
        for ms in 0..1_000u64 {
            let current = rate(ms);
            let prev_idx = order.iter().position(|r| *r == previous).unwrap();
            let cur_idx = order.iter().position(|r| *r == current).unwrap();
            assert!(cur_idx >= prev_idx, "band went backwards at {ms}ms");
            previous = current;
        }
    }
}
