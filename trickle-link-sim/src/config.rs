// ---------------------------------------------------------------------------
// LinkSimConfig
// ---------------------------------------------------------------------------

/// Configuration for the in-process link simulator.
///
/// All fields default to a perfect link: no cuts, no refused connects.
#[derive(Debug, Clone, Default)]
pub struct LinkSimConfig {
    // ---
    /// Per-connection cut budgets, in accept order.
    ///
    /// The k-th accepted connection is cut after its server side has
    /// written `cuts[k]` bytes. The write that would cross the budget fails
    /// and the client sees EOF. Connections beyond the list are never cut.
    pub cuts: Vec<usize>,

    /// Number of initial connect attempts refused as if no one were listening.
    pub refused_connects: usize,
}

// ---

impl LinkSimConfig {
    // ---
    /// Perfect link with no impairments.
    pub fn perfect() -> Self {
        Self::default()
    }

    // ---

    /// Cut successive connections after the given server→client byte counts.
    pub fn with_cuts(mut self, cuts: impl IntoIterator<Item = usize>) -> Self {
        // ---
        self.cuts = cuts.into_iter().collect();
        self
    }

    // ---

    /// Refuse the first `n` connect attempts.
    pub fn with_refused_connects(mut self, n: usize) -> Self {
        // ---
        self.refused_connects = n;
        self
    }
}
