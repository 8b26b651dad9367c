//! Probabilistic fault injection shared by client and server.
//!
//! Two independent "1 in N" knobs, both disabled at 0:
//!
//! - `flaky_connection`: [`FaultInjector::should_drop_connection`] fires,
//!   and the caller tears the connection down.
//! - `flaky_data`: [`FaultInjector::corruption_delta`] returns a nonzero
//!   value that the caller adds to a data value.
//!
//! The server corrupts at send time and the client at receive time, each
//! with its own injector, so corruption of one packet compounds across the
//! two sites. Control messages are never touched.

use std::sync::{Mutex, PoisonError};

// ---

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// ---------------------------------------------------------------------------
// FaultConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct FaultConfig {
    // ---
    /// 1-in-N chance per call that the connection is dropped. 0 = never.
    pub flaky_connection: u32,

    /// 1-in-N chance per call that a value is corrupted. 0 = never.
    pub flaky_data: u32,

    /// RNG seed for reproducible fault sequences. `None` = from entropy.
    pub seed: Option<u64>,
}

// ---

impl FaultConfig {
    // ---
    pub fn is_active(&self) -> bool {
        self.flaky_connection != 0 || self.flaky_data != 0
    }
}

// ---------------------------------------------------------------------------
// FaultInjector
// ---------------------------------------------------------------------------

/// Rolls the dice for [`FaultConfig`]. Shared by all handlers on a server
/// (behind an `Arc`), so the RNG sits behind a short-held mutex.
pub struct FaultInjector {
    // ---
    config: FaultConfig,
    rng: Mutex<SmallRng>,
}

// ---

impl FaultInjector {
    // ---
    pub fn new(config: FaultConfig) -> Self {
        // ---
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    // ---

    /// Injector that never fires.
    pub fn disabled() -> Self {
        Self::new(FaultConfig::default())
    }

    // ---

    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    // ---

    /// Draw from `1..=n`.
    fn roll(&self, n: u32) -> u32 {
        // ---
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(1..=n)
    }

    // ---

    /// `true` with probability `1 / flaky_connection`.
    pub fn should_drop_connection(&self) -> bool {
        // ---
        let n = self.config.flaky_connection;
        if n == 0 || self.roll(n) != 1 {
            return false;
        }
        tracing::error!("!!! injecting flaky connection");
        true
    }

    // ---

    /// 0 with probability `(flaky_data - 1) / flaky_data`, otherwise a
    /// nonzero value in `1..=flaky_data`.
    pub fn corruption_delta(&self) -> u32 {
        // ---
        let n = self.config.flaky_data;
        if n == 0 || self.roll(n) != 1 {
            return 0;
        }
        let delta = self.roll(n);
        tracing::error!(delta, "!!! injecting flaky data");
        delta
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use super::{FaultConfig, FaultInjector};

    // ---

    #[test]
    fn disabled_never_fires() {
        // ---
        let faults = FaultInjector::disabled();
        assert!(!faults.config().is_active());
        for _ in 0..1_000 {
            assert!(!faults.should_drop_connection());
            assert_eq!(faults.corruption_delta(), 0);
        }
    }

    // ---

    /// With N = 1 the "1 in N" draw is certain, and the delta is 1.
    #[test]
    fn one_in_one_always_fires() {
        // ---
        let faults = FaultInjector::new(FaultConfig {
            flaky_connection: 1,
            flaky_data: 1,
            seed: Some(7),
        });
        for _ in 0..100 {
            assert!(faults.should_drop_connection());
            assert_eq!(faults.corruption_delta(), 1);
        }
    }

    // ---

    #[test]
    fn knobs_are_independent() {
        // ---
        let faults = FaultInjector::new(FaultConfig {
            flaky_connection: 0,
            flaky_data: 1,
            seed: Some(1),
        });
        assert!(!faults.should_drop_connection());
        assert_eq!(faults.corruption_delta(), 1);
    }

    // ---

    #[test]
    fn same_seed_same_sequence() {
        // ---
        let config = FaultConfig {
            flaky_connection: 3,
            flaky_data: 5,
            seed: Some(0xDEAD_BEEF),
        };
        let a = FaultInjector::new(config);
        let b = FaultInjector::new(config);

        let run = |f: &FaultInjector| -> Vec<(bool, u32)> {
            (0..200)
                .map(|_| (f.should_drop_connection(), f.corruption_delta()))
                .collect()
        };
        assert_eq!(run(&a), run(&b));
    }

    // ---

    /// Deltas are never zero when they fire, and stay within `1..=N`.
    #[test]
    fn deltas_nonzero_and_bounded() {
        // ---
        let faults = FaultInjector::new(FaultConfig {
            flaky_connection: 0,
            flaky_data: 4,
            seed: Some(99),
        });
        let fired: Vec<u32> = (0..2_000)
            .map(|_| faults.corruption_delta())
            .filter(|&d| d != 0)
            .collect();

        assert!(!fired.is_empty(), "1-in-4 over 2000 draws must fire");
        assert!(fired.iter().all(|&d| (1..=4).contains(&d)));
        // Roughly a quarter fire; generous bounds keep this stable.
        assert!(fired.len() > 300 && fired.len() < 700, "fired {}", fired.len());
    }
}
