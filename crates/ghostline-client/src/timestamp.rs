//! Timestamp decorrelator
//!
//! Breaks timing correlation on message metadata by jittering displayed
//! timestamps inside a bounded window, while guaranteeing that a rendered
//! conversation never appears to go backward in time. Chronological
//! display order is the hard invariant; absolute displayed values are
//! not. When disabled, displayed time equals real time exactly.

use parking_lot::RwLock;
use rand::Rng;

/// Direction of the jitter window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterMode {
    /// Uniform draw from [-window, +window]
    Symmetric,
    /// Uniform draw from [-window, 0]
    ShiftEarlier,
    /// Uniform draw from [0, +window]
    ShiftLater,
}

/// Decorrelation tuning, mutable at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampConfig {
    /// Whether jitter is applied at all
    pub enabled: bool,
    /// Maximum absolute offset in milliseconds
    pub window_ms: u64,
    /// Window direction
    pub mode: JitterMode,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 5 * 60 * 1000, // 5 minutes
            mode: JitterMode::Symmetric,
        }
    }
}

/// Pure transform from real timestamps to display timestamps
pub struct TimestampDecorrelator {
    config: RwLock<TimestampConfig>,
}

impl Default for TimestampDecorrelator {
    fn default() -> Self {
        Self::new(TimestampConfig::default())
    }
}

impl TimestampDecorrelator {
    /// Create a decorrelator with the given configuration
    pub fn new(config: TimestampConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Current configuration
    pub fn config(&self) -> TimestampConfig {
        *self.config.read()
    }

    /// Replace the configuration at runtime
    pub fn set_config(&self, config: TimestampConfig) {
        *self.config.write() = config;
    }

    /// Transform one real timestamp into a display timestamp
    pub fn transform(&self, real_ms: u64) -> u64 {
        self.transform_with(&mut rand::thread_rng(), real_ms)
    }

    /// Transform with a caller-supplied RNG
    pub fn transform_with<R: Rng + ?Sized>(&self, rng: &mut R, real_ms: u64) -> u64 {
        let config = *self.config.read();
        if !config.enabled || config.window_ms == 0 {
            return real_ms;
        }
        let window = config.window_ms as i64;
        let offset = match config.mode {
            JitterMode::Symmetric => rng.gen_range(-window..=window),
            JitterMode::ShiftEarlier => rng.gen_range(-window..=0),
            JitterMode::ShiftLater => rng.gen_range(0..=window),
        };
        real_ms.saturating_add_signed(offset)
    }

    /// Transform `count` display timestamps drawn around one start time,
    /// re-sorted ascending so the sequence never decreases
    pub fn batch_transform(&self, count: usize, start_ms: u64) -> Vec<u64> {
        self.batch_transform_with(&mut rand::thread_rng(), count, start_ms)
    }

    /// `batch_transform` with a caller-supplied RNG
    pub fn batch_transform_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        start_ms: u64,
    ) -> Vec<u64> {
        let mut times: Vec<u64> = (0..count)
            .map(|_| self.transform_with(rng, start_ms))
            .collect();
        times.sort_unstable();
        times
    }

    /// Transform a slice of real timestamps, re-sorted ascending.
    ///
    /// The presentation path pairs these with messages in retention
    /// order, so sorting here is what keeps displayed conversations
    /// monotonic even though each offset is an independent draw.
    pub fn transform_all(&self, real_times: &[u64]) -> Vec<u64> {
        self.transform_all_with(&mut rand::thread_rng(), real_times)
    }

    /// `transform_all` with a caller-supplied RNG
    pub fn transform_all_with<R: Rng + ?Sized>(&self, rng: &mut R, real_times: &[u64]) -> Vec<u64> {
        let mut times: Vec<u64> = real_times
            .iter()
            .map(|&real_ms| self.transform_with(rng, real_ms))
            .collect();
        times.sort_unstable();
        times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn disabled_transform_is_the_identity() {
        let decorrelator = TimestampDecorrelator::new(TimestampConfig {
            enabled: false,
            window_ms: 60_000,
            mode: JitterMode::Symmetric,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for real in [0u64, 1, 1_000_000, u64::MAX] {
            assert_eq!(decorrelator.transform_with(&mut rng, real), real);
        }
    }

    #[test]
    fn offsets_respect_the_mode_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let real = 10_000_000u64;
        let window = 60_000u64;

        let symmetric = TimestampDecorrelator::new(TimestampConfig {
            enabled: true,
            window_ms: window,
            mode: JitterMode::Symmetric,
        });
        let earlier = TimestampDecorrelator::new(TimestampConfig {
            enabled: true,
            window_ms: window,
            mode: JitterMode::ShiftEarlier,
        });
        let later = TimestampDecorrelator::new(TimestampConfig {
            enabled: true,
            window_ms: window,
            mode: JitterMode::ShiftLater,
        });

        for _ in 0..500 {
            let s = symmetric.transform_with(&mut rng, real);
            assert!(s >= real - window && s <= real + window);

            let e = earlier.transform_with(&mut rng, real);
            assert!(e >= real - window && e <= real);

            let l = later.transform_with(&mut rng, real);
            assert!(l >= real && l <= real + window);
        }
    }

    #[test]
    fn runtime_reconfiguration_takes_effect() {
        let decorrelator = TimestampDecorrelator::default();
        assert!(decorrelator.config().enabled);

        decorrelator.set_config(TimestampConfig {
            enabled: false,
            ..TimestampConfig::default()
        });
        assert_eq!(decorrelator.transform(123_456), 123_456);
    }

    #[test]
    fn early_offsets_saturate_at_zero() {
        let decorrelator = TimestampDecorrelator::new(TimestampConfig {
            enabled: true,
            window_ms: 60_000,
            mode: JitterMode::ShiftEarlier,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        // A real time inside the window cannot underflow
        for _ in 0..100 {
            let t = decorrelator.transform_with(&mut rng, 10);
            assert!(t <= 10);
        }
    }

    proptest! {
        #[test]
        fn batch_output_is_non_decreasing(
            count in 0usize..200,
            start_ms in 0u64..2_000_000_000_000,
            window_ms in 0u64..600_000,
            mode_idx in 0u8..3,
            seed in any::<u64>(),
        ) {
            let mode = match mode_idx {
                0 => JitterMode::Symmetric,
                1 => JitterMode::ShiftEarlier,
                _ => JitterMode::ShiftLater,
            };
            let decorrelator = TimestampDecorrelator::new(TimestampConfig {
                enabled: true,
                window_ms,
                mode,
            });
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let times = decorrelator.batch_transform_with(&mut rng, count, start_ms);
            prop_assert_eq!(times.len(), count);
            for pair in times.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }

        #[test]
        fn slice_output_is_non_decreasing(
            real_times in proptest::collection::vec(0u64..2_000_000_000_000, 0..100),
            seed in any::<u64>(),
        ) {
            let decorrelator = TimestampDecorrelator::default();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let times = decorrelator.transform_all_with(&mut rng, &real_times);
            prop_assert_eq!(times.len(), real_times.len());
            for pair in times.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }
}
