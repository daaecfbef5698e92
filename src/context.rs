//! Per-run state: seeded random stream and memoized return array

use crate::error::Result;
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// State owned by one analysis run
///
/// Holds the only random stream used by the engine and the batched return
/// array shared by all estimators of the run. Not meant to be shared across
/// threads; give each concurrent run its own context.
#[derive(Debug, Clone)]
pub struct RunContext {
    seed: u64,
    rng: ChaCha8Rng,
    return_cache: Option<Array2<f64>>,
}

impl RunContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            return_cache: None,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Random stream used for reference curve selection
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Memoized batched returns, if computed in this run
    pub fn cached_returns(&self) -> Option<&Array2<f64>> {
        self.return_cache.as_ref()
    }

    /// Return the memoized batched returns, computing them on first use
    pub fn returns_or_compute<F>(&mut self, compute: F) -> Result<&Array2<f64>>
    where
        F: FnOnce() -> Result<Array2<f64>>,
    {
        let returns = match self.return_cache.take() {
            Some(returns) => returns,
            None => {
                let returns = compute()?;
                log::debug!("Memoized return array of shape {:?}", returns.dim());
                returns
            }
        };
        Ok(self.return_cache.insert(returns))
    }

    /// Drop the memoized returns (the input batch changed)
    pub fn clear_cache(&mut self) {
        self.return_cache = None;
    }

    /// Start a fresh, independent run: clear the cache and rewind the stream
    pub fn reset(&mut self) {
        self.return_cache = None;
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(42)
    }
}
