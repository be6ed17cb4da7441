//! Construction-time configuration shared by every engine.
//!
//! All parameters are fixed when an engine is built. The only field that may
//! change afterwards is the debug flag, and only through the owning instance
//! (see [`OrderedSet::set_debug`][crate::OrderedSet::set_debug]).

use thiserror::Error;

/// Default minimum B-tree fanout.
pub const DEFAULT_BRANCHING_FACTOR: usize = 16;
/// Default cap on the B-tree depth and on the number of skip-list levels.
pub const DEFAULT_MAX_DEPTH: usize = 16;
/// Default skip-list promotion odds (one in four).
pub const DEFAULT_LEVEL_PROBABILITY_DENOMINATOR: u32 = 4;
/// Default seed of the level generator.
pub const DEFAULT_SEED: u64 = 0x1234_abcd;

/// Errors raised when a [`Config`] holds values no engine can work with.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[expect(
    clippy::module_name_repetitions,
    reason = "Using 'Error' would be too generic and may cause confusion."
)]
#[non_exhaustive]
pub enum ConfigError {
    /// A B-tree node must be able to hold at least two entries after a split.
    #[error("branching factor must be at least 2, got {0}.")]
    BranchingFactorTooSmall(usize),
    /// The depth cap must allow at least one level.
    #[error("max depth must be non-zero.")]
    ZeroMaxDepth,
    /// The promotion odds are `1 / denominator`, so zero is meaningless.
    #[error("level probability denominator must be non-zero.")]
    ZeroDenominator,
}

/// Parameters passed to an engine at construction.
///
/// Every engine reads the fields it cares about and ignores the others, so a
/// single `Config` can drive a whole benchmark run.
///
/// ```
/// use ordset_engines::Config;
///
/// let config = Config::default()
///     .with_branching_factor(2)
///     .with_max_depth(10)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Minimum B-tree fanout `r`: non-root nodes hold `r..2r` entries.
    pub branching_factor: usize,
    /// Hard cap on the B-tree depth and on the number of skip-list levels.
    pub max_depth: usize,
    /// A skip-list node is promoted one level up with probability
    /// `1 / level_probability_denominator`.
    pub level_probability_denominator: u32,
    /// Seed of the pseudo-random level generator.
    pub seed: u64,
    /// Emit `tracing` events describing every structural change.
    pub debug: bool,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            max_depth: DEFAULT_MAX_DEPTH,
            level_probability_denominator: DEFAULT_LEVEL_PROBABILITY_DENOMINATOR,
            seed: DEFAULT_SEED,
            debug: false,
        }
    }
}

impl Config {
    /// Set the minimum B-tree fanout.
    #[must_use]
    #[inline]
    pub fn with_branching_factor(mut self, branching_factor: usize) -> Self {
        self.branching_factor = branching_factor;
        self
    }

    /// Set the depth cap.
    #[must_use]
    #[inline]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the skip-list promotion odds.
    #[must_use]
    #[inline]
    pub fn with_level_probability_denominator(mut self, denominator: u32) -> Self {
        self.level_probability_denominator = denominator;
        self
    }

    /// Set the level generator seed.
    #[must_use]
    #[inline]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable verbose tracing.
    #[must_use]
    #[inline]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Check that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_tree()?;
        self.validate_levels()
    }

    /// Check the fields read by the B-tree: the branching factor and the
    /// depth cap.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    #[inline]
    pub fn validate_tree(&self) -> Result<(), ConfigError> {
        if self.branching_factor < 2 {
            return Err(ConfigError::BranchingFactorTooSmall(self.branching_factor));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        Ok(())
    }

    /// Check the fields read by the skip lists: the number of levels and the
    /// promotion odds.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    #[inline]
    pub fn validate_levels(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        if self.level_probability_denominator == 0 {
            return Err(ConfigError::ZeroDenominator);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{Config, ConfigError};

    #[test]
    fn default_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[rstest]
    #[case(Config::default().with_branching_factor(0), ConfigError::BranchingFactorTooSmall(0))]
    #[case(Config::default().with_branching_factor(1), ConfigError::BranchingFactorTooSmall(1))]
    #[case(Config::default().with_max_depth(0), ConfigError::ZeroMaxDepth)]
    #[case(
        Config::default().with_level_probability_denominator(0),
        ConfigError::ZeroDenominator
    )]
    fn invalid(#[case] config: Config, #[case] expected: ConfigError) {
        assert_eq!(config.validate(), Err(expected));
    }

    #[test]
    fn partial_validation() {
        let config = Config::default().with_branching_factor(1);
        assert_eq!(config.validate_levels(), Ok(()));
        assert_eq!(
            config.validate_tree(),
            Err(ConfigError::BranchingFactorTooSmall(1))
        );

        let config = Config::default().with_level_probability_denominator(0);
        assert_eq!(config.validate_tree(), Ok(()));
        assert_eq!(config.validate_levels(), Err(ConfigError::ZeroDenominator));

        let config = Config::default().with_max_depth(0);
        assert_eq!(config.validate_tree(), Err(ConfigError::ZeroMaxDepth));
        assert_eq!(config.validate_levels(), Err(ConfigError::ZeroMaxDepth));
    }

    #[test]
    fn messages() {
        assert_eq!(
            ConfigError::BranchingFactorTooSmall(1).to_string(),
            "branching factor must be at least 2, got 1."
        );
        assert_eq!(ConfigError::ZeroMaxDepth.to_string(), "max depth must be non-zero.");
    }

    #[test]
    fn builder() {
        let config = Config::default()
            .with_branching_factor(3)
            .with_max_depth(7)
            .with_level_probability_denominator(2)
            .with_seed(9)
            .with_debug(true);
        assert_eq!(
            config,
            Config {
                branching_factor: 3,
                max_depth: 7,
                level_probability_denominator: 2,
                seed: 9,
                debug: true,
            }
        );
    }
}
