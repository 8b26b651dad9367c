/// Golden-ratio constant mixed into every step.
const MIX: u32 = 0x9e37_79b9;

/// Seed-then-mix checksum over a payload sequence.
///
/// The seed starts at the sequence length and each value is folded in with
/// `seed ^= v + MIX + (seed << 6) + (seed >> 2)`, all in wrapping 32-bit
/// arithmetic. Sensitive to both order and length; an empty sequence yields 0.
pub fn checksum(values: &[u32]) -> u32 {
    // ---
    let mut seed = values.len() as u32;
    for &v in values {
        seed ^= v
            .wrapping_add(MIX)
            .wrapping_add(seed << 6)
            .wrapping_add(seed >> 2);
    }
    seed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
