//! [`PayloadGenerator`] — random values for newly created sessions.

use std::sync::{Mutex, PoisonError};

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

// ---------------------------------------------------------------------------
// PayloadGenerator
// ---------------------------------------------------------------------------

/// Server-wide source of session payloads.
///
/// One RNG for the whole server, so two sessions created from the same seed
/// still get different payloads, while a seeded server is reproducible run
/// to run.
pub struct PayloadGenerator {
    // ---
    rng: Mutex<SmallRng>,
}

// ---

impl PayloadGenerator {
    // ---
    pub fn new(seed: Option<u64>) -> Self {
        // ---
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    // ---

    /// `count` independent, uniformly random 32-bit values.
    pub fn generate(&self, count: u32) -> Vec<u32> {
        // ---
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (0..count).map(|_| rng.next_u32()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
