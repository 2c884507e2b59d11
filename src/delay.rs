use rand::Rng;
use serde::{Deserialize, Serialize};

/// Closed interval of whole milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Fixed delay, mostly useful for deterministic runs
    pub const fn fixed(ms: u64) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }
}

/// Draw a delay uniformly from `range`, both endpoints included.
///
/// Panics if `range.min_ms > range.max_ms`.
pub fn random_delay<R: Rng + ?Sized>(rng: &mut R, range: DelayRange) -> u64 {
    assert!(
        range.is_valid(),
        "invalid delay range {}..={}",
        range.min_ms,
        range.max_ms
    );
    rng.gen_range(range.min_ms..=range.max_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_light_interval_bounds_and_endpoints() {
        let mut rng = StdRng::seed_from_u64(7);
        let range = DelayRange::new(800, 1000);
        let mut saw_min = false;
        let mut saw_max = false;

        for _ in 0..10_000 {
            let d = random_delay(&mut rng, range);
            assert!((800..=1000).contains(&d));
            saw_min |= d == 800;
            saw_max |= d == 1000;
        }

        assert!(saw_min, "800 never drawn");
        assert!(saw_max, "1000 never drawn");
    }

    #[test]
    fn test_lights_out_wait_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let range = DelayRange::new(200, 3200);
        for _ in 0..10_000 {
            let d = random_delay(&mut rng, range);
            assert!((200..=3200).contains(&d));
        }
    }

    #[test]
    fn test_fixed_range() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(random_delay(&mut rng, DelayRange::fixed(600)), 600);
        assert_eq!(random_delay(&mut rng, DelayRange::fixed(0)), 0);
    }

    #[test]
    #[should_panic(expected = "invalid delay range")]
    fn test_inverted_range_panics() {
        let mut rng = StdRng::seed_from_u64(1);
        random_delay(&mut rng, DelayRange::new(1000, 800));
    }

    #[test]
    fn test_is_valid() {
        assert!(DelayRange::new(0, 0).is_valid());
        assert!(DelayRange::new(200, 3200).is_valid());
        assert!(!DelayRange::new(5, 4).is_valid());
    }
}
