//! Geometric level generator.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use thiserror::Error;

use crate::{
    config::{Config, ConfigError},
    level_generator::LevelGenerator,
};

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors that can occur when creating a [`Geometric`] level generator.
#[expect(
    clippy::module_name_repetitions,
    reason = "Using 'Error' would be too generic and may cause confusion."
)]
#[non_exhaustive]
pub enum GeometricError {
    /// The maximum number of levels must be non-zero.
    #[error("max must be non-zero.")]
    ZeroMax,
    /// The promotion odds are `1 / denominator`.
    #[error("denominator must be non-zero.")]
    ZeroDenominator,
}

impl From<GeometricError> for ConfigError {
    #[inline]
    fn from(err: GeometricError) -> Self {
        match err {
            GeometricError::ZeroMax => ConfigError::ZeroMaxDepth,
            GeometricError::ZeroDenominator => ConfigError::ZeroDenominator,
        }
    }
}

/// A level generator using a geometric distribution.
///
/// A node present at level `$n$` is promoted to level `$n+1$` by an
/// independent coin flip that succeeds with probability `$1 / d$`, where
/// `$d$` is the configured denominator. The distribution is truncated at the
/// maximum number of levels allowed, so the top level also collects every
/// node that would have climbed higher.
///
/// The generator is seeded explicitly: two generators built with the same
/// seed produce the same sequence of levels.
#[derive(Debug, Clone)]
pub struct Geometric {
    /// The total number of levels that are assumed to exist.
    total: usize,
    /// Promotion happens with probability `1 / denominator`.
    denominator: u32,
    /// The random number generator.
    rng: SmallRng,
}

impl Geometric {
    /// Create a new geometric level generator with `total` number of levels,
    /// promoting a node to the next level with probability
    /// `1 / denominator`.
    ///
    /// # Errors
    ///
    /// `total` and `denominator` must both be non-zero.
    #[inline]
    pub fn new(total: usize, denominator: u32, seed: u64) -> Result<Self, GeometricError> {
        if total == 0 {
            return Err(GeometricError::ZeroMax);
        }
        if denominator == 0 {
            return Err(GeometricError::ZeroDenominator);
        }
        Ok(Geometric {
            total,
            denominator,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Build the generator described by the skip-list fields of `config`.
    ///
    /// # Errors
    ///
    /// See [`Geometric::new`].
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self, GeometricError> {
        Self::new(
            config.max_depth,
            config.level_probability_denominator,
            config.seed,
        )
    }
}

impl LevelGenerator for Geometric {
    #[inline]
    fn total(&self) -> usize {
        self.total
    }

    /// Flip coins until one fails or the top level is reached.
    ///
    /// A denominator of one promotes every node to the top level, which turns
    /// the skip list into a plain linked list.
    #[inline]
    fn level(&mut self) -> usize {
        let mut level = 0;
        while level + 1 < self.total && self.rng.random_ratio(1, self.denominator) {
            level += 1;
        }
        level
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, bail};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{Geometric, GeometricError, LevelGenerator};

    #[test]
    fn invalid_max() {
        assert_eq!(Geometric::new(0, 2, 0).err(), Some(GeometricError::ZeroMax));
    }

    #[test]
    fn invalid_denominator() {
        assert_eq!(
            Geometric::new(1, 0, 0).err(),
            Some(GeometricError::ZeroDenominator)
        );
    }

    #[rstest]
    fn new(#[values(1, 2, 10, 128)] n: usize, #[values(2, 4, 16)] d: u32) -> Result<()> {
        let mut generator = Geometric::new(n, d, 7)?;
        assert_eq!(generator.total(), n);
        for _ in 0..100_000 {
            let level = generator.level();
            assert!((0..n).contains(&level));
        }
        Ok(())
    }

    #[test]
    fn reaches_top_level() -> Result<()> {
        let mut generator = Geometric::new(4, 2, 1)?;
        for _ in 0..1_000_000 {
            if generator.level() == 3 {
                return Ok(());
            }
        }
        bail!("Failed to generate a level-3 node.");
    }

    #[test]
    fn denominator_one_always_promotes() -> Result<()> {
        let mut generator = Geometric::new(5, 1, 3)?;
        for _ in 0..100 {
            assert_eq!(generator.level(), 4);
        }
        Ok(())
    }

    #[test]
    fn seeded() -> Result<()> {
        let mut a = Geometric::new(10, 4, 99)?;
        let mut b = Geometric::new(10, 4, 99)?;
        let left: Vec<_> = (0..1000).map(|_| a.level()).collect();
        let right: Vec<_> = (0..1000).map(|_| b.level()).collect();
        assert_eq!(left, right);
        Ok(())
    }

    #[test]
    fn roughly_geometric() -> Result<()> {
        let mut generator = Geometric::new(10, 4, 5)?;
        let mut counts = [0_usize; 10];
        for _ in 0..400_000 {
            counts[generator.level()] += 1;
        }
        // Level 0 keeps about three quarters of the draws.
        assert!((290_000..310_000).contains(&counts[0]), "{counts:?}");
        assert!((70_000..80_000).contains(&counts[1]), "{counts:?}");
        Ok(())
    }
}
